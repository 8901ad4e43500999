// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The global store.

use crate::error::RuntimeError;
use crate::runtime::value::Value;

/// Fixed-size storage for global bindings, indexed by 16-bit global index.
///
/// A store outlives any single VM so that sequential units in one session
/// see each other's globals.
#[derive(Debug, Clone)]
pub struct Globals {
    slots: Vec<Value>,
}

impl Globals {
    /// Creates a store of `size` null slots.
    pub fn new(size: usize) -> Self {
        Self {
            slots: vec![Value::Null; size],
        }
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns true if the store has no slots.
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Reads a slot.
    pub fn get(&self, index: usize) -> Result<Value, RuntimeError> {
        self.slots
            .get(index)
            .cloned()
            .ok_or(RuntimeError::GlobalOutOfRange {
                index,
                size: self.slots.len(),
            })
    }

    /// Writes a slot.
    pub fn set(&mut self, index: usize, value: Value) -> Result<(), RuntimeError> {
        let size = self.slots.len();
        let slot = self
            .slots
            .get_mut(index)
            .ok_or(RuntimeError::GlobalOutOfRange { index, size })?;
        *slot = value;
        Ok(())
    }
}

impl Default for Globals {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_GLOBALS_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_set() {
        let mut globals = Globals::new(4);
        assert_eq!(globals.len(), 4);
        assert!(!globals.is_empty());
        assert!(Globals::new(0).is_empty());
        assert_eq!(globals.get(3), Ok(Value::Null));
        globals.set(3, Value::Integer(9)).unwrap();
        assert_eq!(globals.get(3), Ok(Value::Integer(9)));
    }

    #[test]
    fn test_out_of_range() {
        let mut globals = Globals::new(2);
        assert_eq!(
            globals.set(2, Value::Null),
            Err(RuntimeError::GlobalOutOfRange { index: 2, size: 2 })
        );
        assert!(globals.get(5).is_err());
    }
}
