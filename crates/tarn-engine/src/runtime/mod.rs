// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tarn runtime object model.
//!
//! Values produced by the compiler into the constant pool and by the VM
//! during execution. There is no collector; compound values are
//! reference-counted and freed when the host drops the last handle.

pub mod function;
pub mod object;
pub mod value;

pub use function::{Closure, CompiledFunction};
pub use object::{HashObject, StructObject};
pub use value::{HashKey, Value};
