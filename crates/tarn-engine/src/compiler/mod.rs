// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode compiler for Tarn.
//!
//! Transforms AST into bytecode that can be executed by the VM.
//!
//! # Module Structure
//!
//! - `bytecode`: Opcode table, encoder, decoder and disassembler
//! - `symbol_table`: Scope chain for name resolution
//! - `codegen`: Code generation from AST

pub mod bytecode;
pub mod codegen;
pub mod symbol_table;

pub use bytecode::{Bytecode, Definition, Instructions, OpCode, decode, make};
pub use codegen::{Compiler, compile_program};
pub use symbol_table::{Symbol, SymbolScope, SymbolTable};
