// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # tarn-engine
//!
//! The compiler and virtual machine for Tarn, a small statically typed
//! scripting language.
//!
//! ## Overview
//!
//! This crate turns a type-checked Tarn AST into bytecode and executes it:
//! - Instruction set, encoder and disassembler
//! - Lexically scoped symbol resolution with closure capture
//! - Single-pass AST to bytecode compiler
//! - Frame-based stack VM with closures, structs, arrays and hashes
//!
//! Lexing, parsing and type checking happen upstream; this crate trusts
//! the tree it is given.
//!
//! ## Quick Start
//!
//! ```rust
//! use tarn_engine::ast::{Expression, InfixOperator, Program, Statement};
//! use tarn_engine::{Session, Value};
//!
//! let mut session = Session::new();
//! let program = Program::new(vec![Statement::expr(Expression::infix(
//!     Expression::int(1),
//!     InfixOperator::Add,
//!     Expression::int(2),
//! ))]);
//! assert_eq!(session.eval(&program).unwrap(), Value::Integer(3));
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod builtins;
pub mod compiler;
pub mod config;
pub mod error;
pub mod runtime;
pub mod session;
pub mod vm;

// Re-exports for convenience
pub use compiler::{Bytecode, Compiler, compile_program};
pub use config::EngineConfig;
pub use error::{CompileError, EncodeError, Error, Result, RuntimeError};
pub use runtime::value::Value;
pub use session::Session;
pub use vm::VM;
