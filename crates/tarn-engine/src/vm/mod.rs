// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode virtual machine.
//!
//! ## Structure
//!
//! - `interpreter` - Fetch/dispatch loop and opcode handlers
//! - `frame` - Call frames
//! - `globals` - The global store shared across sequential runs
//! - `comparison` - Equality for `==` and `!=`

mod interpreter;

pub mod comparison;
pub mod frame;
pub mod globals;

#[cfg(test)]
mod tests;

pub use frame::Frame;
pub use globals::Globals;
pub use interpreter::VM;
