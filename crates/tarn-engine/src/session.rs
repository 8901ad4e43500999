// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Sequential evaluation with persistent state.
//!
//! A [`Session`] threads the global symbol table, constant pool and global
//! store from one unit to the next, so a REPL line can use what earlier
//! lines declared. Sessions are independent of each other and confined to
//! the thread that created them.

use std::mem;

use tracing::{debug, instrument};

use crate::ast::Program;
use crate::compiler::{Compiler, SymbolTable};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::runtime::value::Value;
use crate::vm::{Globals, VM};

/// A compile-and-run session.
pub struct Session {
    config: EngineConfig,
    symbols: SymbolTable,
    constants: Vec<Value>,
    globals: Globals,
}

impl Session {
    /// Creates a session with the default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Creates a session whose VMs are sized by `config`.
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            globals: Globals::new(config.globals_size),
            symbols: SymbolTable::with_builtins(),
            constants: Vec::new(),
            config,
        }
    }

    /// The session's configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The global store as left by the last run.
    pub fn globals(&self) -> &Globals {
        &self.globals
    }

    /// Compiles and runs `program`, returning the value of its last
    /// expression statement.
    ///
    /// A compile error leaves the session unchanged. A runtime error keeps
    /// the declarations and any global writes made before the failure.
    #[instrument(skip_all, fields(statements = program.statements.len()))]
    pub fn eval(&mut self, program: &Program) -> Result<Value> {
        let mut compiler = Compiler::with_state(self.symbols.clone(), self.constants.clone());
        let bytecode = compiler.compile(program)?;
        (self.symbols, self.constants) = compiler.into_state();

        let globals = mem::replace(&mut self.globals, Globals::new(0));
        let mut vm = VM::with_globals(bytecode, globals, &self.config);
        let outcome = vm.run();
        let result = vm.last_popped_stack_elem();
        self.globals = vm.into_globals();
        outcome?;

        debug!(result = %result, "evaluated unit");
        Ok(result)
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
