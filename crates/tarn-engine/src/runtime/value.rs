// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Tarn value representation.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use super::function::{Closure, CompiledFunction};
use super::object::{HashObject, StructObject};
use crate::ast::StructType;
use crate::builtins::Builtin;

/// A Tarn runtime value.
///
/// Compound values are reference-counted handles; cloning a `Value` never
/// copies an array, hash or struct. Values are not thread-safe and stay on
/// the thread that created them.
#[derive(Debug, Clone)]
pub enum Value {
    /// 64-bit signed integer
    Integer(i64),
    /// 64-bit float
    Float(f64),
    /// Immutable string
    Str(Rc<str>),
    /// Boolean value
    Boolean(bool),
    /// null
    Null,
    /// Mutable array
    Array(Rc<RefCell<Vec<Value>>>),
    /// Mutable hash
    Hash(Rc<RefCell<HashObject>>),
    /// Compiled function blob from the constant pool
    CompiledFunction(Rc<CompiledFunction>),
    /// Function plus captured values
    Closure(Rc<Closure>),
    /// Host builtin
    Builtin(&'static Builtin),
    /// Struct type descriptor from the constant pool
    StructType(Rc<StructType>),
    /// Struct instance
    Struct(Rc<RefCell<StructObject>>),
}

/// A hashable key derived from a value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    /// Integer key
    Integer(i64),
    /// Boolean key
    Boolean(bool),
    /// String key
    Str(Rc<str>),
}

impl Value {
    /// String value.
    pub fn string(s: &str) -> Self {
        Value::Str(Rc::from(s))
    }

    /// Array value.
    pub fn array(elements: Vec<Value>) -> Self {
        Value::Array(Rc::new(RefCell::new(elements)))
    }

    /// Hash value.
    pub fn hash(hash: HashObject) -> Self {
        Value::Hash(Rc::new(RefCell::new(hash)))
    }

    /// Struct value.
    pub fn structure(object: StructObject) -> Self {
        Value::Struct(Rc::new(RefCell::new(object)))
    }

    /// Only `false` and `null` are falsy.
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Value::Boolean(false) | Value::Null)
    }

    /// The hash key for this value, if it is hashable.
    pub fn hash_key(&self) -> Option<HashKey> {
        match self {
            Value::Integer(n) => Some(HashKey::Integer(*n)),
            Value::Boolean(b) => Some(HashKey::Boolean(*b)),
            Value::Str(s) => Some(HashKey::Str(Rc::clone(s))),
            _ => None,
        }
    }

    /// Returns the type of this value as a string.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Boolean(_) => "bool",
            Value::Null => "null",
            Value::Array(_) => "array",
            Value::Hash(_) => "hash",
            Value::CompiledFunction(_) => "function",
            Value::Closure(_) => "closure",
            Value::Builtin(_) => "builtin",
            Value::StructType(_) => "struct type",
            Value::Struct(_) => "struct",
        }
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

/// Structural equality for host-side inspection and tests.
///
/// The VM's `==` operator does not use this; see
/// [`crate::vm::comparison::values_equal`].
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Integer(a), Value::Integer(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Null, Value::Null) => true,
            (Value::Array(a), Value::Array(b)) => *a.borrow() == *b.borrow(),
            (Value::Hash(a), Value::Hash(b)) => *a.borrow() == *b.borrow(),
            (Value::Struct(a), Value::Struct(b)) => *a.borrow() == *b.borrow(),
            (Value::StructType(a), Value::StructType(b)) => a == b,
            (Value::CompiledFunction(a), Value::CompiledFunction(b)) => a == b,
            (Value::Closure(a), Value::Closure(b)) => Rc::ptr_eq(a, b),
            (Value::Builtin(a), Value::Builtin(b)) => a.name == b.name,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Integer(n)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Float(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Integer(n) => write!(f, "{}", n),
            Value::Float(n) => write!(f, "{}", n),
            Value::Str(s) => write!(f, "{}", s),
            Value::Boolean(b) => write!(f, "{}", b),
            Value::Null => write!(f, "null"),
            Value::Array(elements) => {
                write!(f, "[")?;
                for (i, element) in elements.borrow().iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", element)?;
                }
                write!(f, "]")
            }
            Value::Hash(hash) => write!(f, "{}", hash.borrow()),
            Value::CompiledFunction(func) => match &func.name {
                Some(name) => write!(f, "CompiledFunction[{}]", name),
                None => write!(f, "CompiledFunction[anonymous]"),
            },
            Value::Closure(closure) => match &closure.function.name {
                Some(name) => write!(f, "Closure[{}]", name),
                None => write!(f, "Closure[anonymous]"),
            },
            Value::Builtin(builtin) => write!(f, "builtin function {}", builtin.name),
            Value::StructType(st) => write!(f, "type {}", st.name),
            Value::Struct(object) => write!(f, "{}", object.borrow()),
        }
    }
}
