// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Compiled functions and closures.

use std::rc::Rc;

use super::value::Value;
use crate::compiler::Instructions;

/// A compiled function body, stored in the constant pool.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CompiledFunction {
    /// The function's instruction stream
    pub instructions: Instructions,
    /// Local slots, parameters first
    pub num_locals: usize,
    /// Declared parameter count
    pub num_parameters: usize,
    /// Name for diagnostics
    pub name: Option<String>,
}

impl CompiledFunction {
    /// Wraps a top-level instruction stream as a zero-argument function.
    pub fn main(instructions: Instructions) -> Self {
        Self {
            instructions,
            name: Some("main".to_string()),
            ..Self::default()
        }
    }
}

/// A function plus the values it captured when created.
#[derive(Debug, Clone)]
pub struct Closure {
    /// The shared function body
    pub function: Rc<CompiledFunction>,
    /// Captured values, in compiler-emitted order
    pub free: Vec<Value>,
}

impl Closure {
    /// Creates a closure over `function`.
    pub fn new(function: Rc<CompiledFunction>, free: Vec<Value>) -> Self {
        Self { function, free }
    }
}
