// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Heap object payloads: hashes and struct instances.

use std::fmt;
use std::rc::Rc;

use rustc_hash::FxHashMap;

use super::value::{HashKey, Value};
use crate::ast::StructType;

/// An insertion-ordered hash.
#[derive(Debug, Clone, Default)]
pub struct HashObject {
    entries: Vec<(Value, Value)>,
    index: FxHashMap<HashKey, usize>,
}

impl HashObject {
    /// Creates an empty hash.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of pairs.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the hash has no pairs.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Inserts or replaces the value for `hash_key`.
    pub fn insert(&mut self, hash_key: HashKey, key: Value, value: Value) {
        match self.index.get(&hash_key) {
            Some(&slot) => self.entries[slot] = (key, value),
            None => {
                self.index.insert(hash_key, self.entries.len());
                self.entries.push((key, value));
            }
        }
    }

    /// Looks up the value stored under `hash_key`.
    pub fn get(&self, hash_key: &HashKey) -> Option<&Value> {
        self.index.get(hash_key).map(|&slot| &self.entries[slot].1)
    }

    /// Pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &(Value, Value)> {
        self.entries.iter()
    }
}

impl PartialEq for HashObject {
    fn eq(&self, other: &Self) -> bool {
        self.len() == other.len()
            && self.index.iter().all(|(hash_key, &slot)| {
                other.get(hash_key) == Some(&self.entries[slot].1)
            })
    }
}

impl fmt::Display for HashObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{")?;
        for (i, (key, value)) in self.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        write!(f, "}}")
    }
}

/// A struct instance. Fields are stored in the type's declared order.
#[derive(Debug, Clone, PartialEq)]
pub struct StructObject {
    /// The struct's type descriptor
    pub ty: Rc<StructType>,
    /// Field values by position
    pub fields: Vec<Value>,
}

impl fmt::Display for StructObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{{", self.ty.name)?;
        for (i, (field, value)) in self.ty.fields.iter().zip(&self.fields).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", field.name, value)?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Type;

    fn key(s: &str) -> (HashKey, Value) {
        let value = Value::string(s);
        (value.hash_key().unwrap(), value)
    }

    #[test]
    fn test_hash_upsert_keeps_position() {
        let mut hash = HashObject::new();
        let (a, a_val) = key("a");
        let (b, b_val) = key("b");
        hash.insert(a.clone(), a_val.clone(), Value::Integer(1));
        hash.insert(b, b_val, Value::Integer(2));
        hash.insert(a.clone(), a_val, Value::Integer(3));

        assert_eq!(hash.len(), 2);
        assert_eq!(hash.get(&a), Some(&Value::Integer(3)));
        assert_eq!(hash.to_string(), "{a: 3, b: 2}");
    }

    #[test]
    fn test_struct_display() {
        let ty = Rc::new(StructType::new("Point", vec![("x", Type::Int), ("y", Type::Int)]));
        let point = StructObject {
            ty,
            fields: vec![Value::Integer(1), Value::Integer(2)],
        };
        assert_eq!(point.to_string(), "Point{x: 1, y: 2}");
    }
}
