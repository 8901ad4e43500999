// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Call frames.

use std::rc::Rc;

use crate::compiler::Instructions;
use crate::runtime::function::Closure;

/// One active function invocation.
#[derive(Debug, Clone)]
pub struct Frame {
    /// The closure being executed
    pub closure: Rc<Closure>,
    /// Offset of the next instruction to fetch
    pub ip: usize,
    /// Stack slot of the first local
    pub base_pointer: usize,
}

impl Frame {
    /// Creates a frame positioned at the start of `closure`.
    pub fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Self {
            closure,
            ip: 0,
            base_pointer,
        }
    }

    /// The instruction stream of the running function.
    pub fn instructions(&self) -> &Instructions {
        &self.closure.function.instructions
    }
}
