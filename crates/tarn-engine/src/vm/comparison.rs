// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Equality for the `==` and `!=` opcodes.

use std::rc::Rc;

use crate::runtime::value::Value;

/// Tarn equality.
///
/// Scalars compare by value. Compound values compare by identity: two
/// arrays with equal contents are different values unless they are the
/// same array. Values of different types are never equal.
pub fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Integer(a), Value::Integer(b)) => a == b,
        (Value::Float(a), Value::Float(b)) => a == b,
        (Value::Str(a), Value::Str(b)) => a == b,
        (Value::Boolean(a), Value::Boolean(b)) => a == b,
        (Value::Null, Value::Null) => true,
        (Value::Array(a), Value::Array(b)) => Rc::ptr_eq(a, b),
        (Value::Hash(a), Value::Hash(b)) => Rc::ptr_eq(a, b),
        (Value::Struct(a), Value::Struct(b)) => Rc::ptr_eq(a, b),
        (Value::StructType(a), Value::StructType(b)) => Rc::ptr_eq(a, b),
        (Value::CompiledFunction(a), Value::CompiledFunction(b)) => Rc::ptr_eq(a, b),
        (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
        (Value::Builtin(a), Value::Builtin(b)) => std::ptr::eq(*a, *b),
        _ => false,
    }
}
