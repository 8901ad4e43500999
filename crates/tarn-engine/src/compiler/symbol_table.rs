// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Symbol tables for variable resolution during compilation.
//!
//! A [`SymbolTable`] holds the bindings of one scope. Scopes are kept in a
//! [`ScopeChain`], an index-addressed stack whose bottom entry is the
//! global table; a child scope never owns its parent.

use rustc_hash::FxHashMap;

use crate::ast::Type;
use crate::builtins::BUILTINS;

/// Storage class of a resolved name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolScope {
    /// Slot in the global store, shared by the whole unit
    Global,
    /// Stack slot relative to the frame's base pointer
    Local,
    /// Value captured by the running closure
    Free,
    /// Host builtin at a fixed index
    Builtin,
    /// The running closure itself, for recursion
    Function,
}

/// A compile-time binding.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    /// Bound name
    pub name: String,
    /// Storage class
    pub scope: SymbolScope,
    /// Index within the storage class
    pub index: usize,
    /// Whether assignment is permitted
    pub mutable: bool,
    /// Declared or inferred static type
    pub ty: Option<Type>,
}

/// The bindings of a single scope.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable {
    store: FxHashMap<String, Symbol>,
    num_definitions: usize,
    global: bool,
    /// Outer symbols captured by this scope, in discovery order. Each entry
    /// is the symbol as the enclosing scope sees it.
    pub free_symbols: Vec<Symbol>,
}

impl SymbolTable {
    /// Creates an empty global table.
    pub fn new_global() -> Self {
        Self {
            global: true,
            ..Self::default()
        }
    }

    /// Creates a global table with every builtin registered at its fixed index.
    pub fn with_builtins() -> Self {
        let mut table = Self::new_global();
        for (index, builtin) in BUILTINS.iter().enumerate() {
            table.define_builtin(index, builtin.name);
        }
        table
    }

    /// Creates an empty function-local table.
    pub fn new_local() -> Self {
        Self::default()
    }

    /// Number of slots allocated by `define`.
    pub fn num_definitions(&self) -> usize {
        self.num_definitions
    }

    /// Allocates the next slot of this scope's storage class.
    pub fn define(&mut self, name: &str, mutable: bool, ty: Option<Type>) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: if self.global {
                SymbolScope::Global
            } else {
                SymbolScope::Local
            },
            index: self.num_definitions,
            mutable,
            ty,
        };
        self.num_definitions += 1;
        self.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    /// Registers a builtin at a fixed index.
    pub fn define_builtin(&mut self, index: usize, name: &str) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Builtin,
            index,
            mutable: false,
            ty: None,
        };
        self.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    /// Binds the name of the function being compiled to itself.
    pub fn define_function_name(&mut self, name: &str, ty: Option<Type>) -> Symbol {
        let symbol = Symbol {
            name: name.to_string(),
            scope: SymbolScope::Function,
            index: 0,
            mutable: false,
            ty,
        };
        self.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    /// Records `original` as captured and binds it as a free symbol here.
    pub fn define_free(&mut self, original: Symbol) -> Symbol {
        let symbol = Symbol {
            name: original.name.clone(),
            scope: SymbolScope::Free,
            index: self.free_symbols.len(),
            mutable: original.mutable,
            ty: original.ty.clone(),
        };
        self.free_symbols.push(original);
        self.store.insert(symbol.name.clone(), symbol.clone());
        symbol
    }

    /// Looks a name up in this scope only.
    pub fn get(&self, name: &str) -> Option<&Symbol> {
        self.store.get(name)
    }
}

/// The result of resolving a name.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    /// The symbol as seen from the requesting scope
    pub symbol: Symbol,
    /// Whether the defining scope is an enclosing one
    pub found_in_outer: bool,
}

/// The stack of scopes active in one compilation.
#[derive(Debug, Clone)]
pub struct ScopeChain {
    tables: Vec<SymbolTable>,
}

impl ScopeChain {
    /// Creates a chain rooted at the given global table.
    pub fn new(global: SymbolTable) -> Self {
        Self {
            tables: vec![global],
        }
    }

    /// Opens a function scope.
    pub fn push(&mut self) {
        self.tables.push(SymbolTable::new_local());
    }

    /// Closes the innermost function scope. The global table is never popped.
    pub fn pop(&mut self) -> Option<SymbolTable> {
        if self.tables.len() > 1 {
            self.tables.pop()
        } else {
            None
        }
    }

    /// Nesting depth; 0 while compiling top-level code.
    pub fn depth(&self) -> usize {
        self.tables.len() - 1
    }

    /// The innermost scope.
    pub fn current(&self) -> &SymbolTable {
        &self.tables[self.tables.len() - 1]
    }

    /// The innermost scope, mutably.
    pub fn current_mut(&mut self) -> &mut SymbolTable {
        let top = self.tables.len() - 1;
        &mut self.tables[top]
    }

    /// Releases the global table.
    pub fn into_global(mut self) -> SymbolTable {
        self.tables.truncate(1);
        self.tables.pop().unwrap_or_else(SymbolTable::with_builtins)
    }

    /// Defines a name in the innermost scope.
    pub fn define(&mut self, name: &str, mutable: bool, ty: Option<Type>) -> Symbol {
        self.current_mut().define(name, mutable, ty)
    }

    /// Finds a name without promoting anything to free. Used for static
    /// type queries.
    pub fn lookup(&self, name: &str) -> Option<&Symbol> {
        self.tables.iter().rev().find_map(|table| table.get(name))
    }

    /// Returns a binding made in the innermost scope that would conflict
    /// with a new declaration of `name`. Captured, builtin and self-name
    /// bindings may be shadowed.
    pub fn conflicting_definition(&self, name: &str) -> Option<&Symbol> {
        self.current().get(name).filter(|symbol| {
            matches!(symbol.scope, SymbolScope::Global | SymbolScope::Local)
        })
    }

    /// Resolves a name from the innermost scope outward.
    ///
    /// A hit in an enclosing function scope is promoted to a free symbol in
    /// every scope between the defining one and the requester, outermost
    /// first, so each intermediate closure captures it in turn.
    pub fn resolve(&mut self, name: &str) -> Option<Resolution> {
        let top = self.tables.len() - 1;
        let (depth, found) = self
            .tables
            .iter()
            .enumerate()
            .rev()
            .find_map(|(depth, table)| table.get(name).map(|symbol| (depth, symbol.clone())))?;

        if depth == top {
            return Some(Resolution {
                symbol: found,
                found_in_outer: false,
            });
        }

        if matches!(found.scope, SymbolScope::Global | SymbolScope::Builtin) {
            return Some(Resolution {
                symbol: found,
                found_in_outer: true,
            });
        }

        let mut symbol = found;
        for table in &mut self.tables[depth + 1..] {
            symbol = table.define_free(symbol);
        }
        Some(Resolution {
            symbol,
            found_in_outer: true,
        })
    }
}
