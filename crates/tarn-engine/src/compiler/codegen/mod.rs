// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Code generation from AST to bytecode.
//!
//! This module contains the `Compiler`, which walks a Tarn [`Program`] once
//! and emits an instruction stream plus constant pool for the VM. Statement
//! and expression lowering live in `statements` and `expressions`; static
//! type queries used for loop checks and field resolution live in `types`.

mod expressions;
mod statements;
mod types;


use std::mem;
use std::rc::Rc;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::debug;

use crate::ast::{Program, Statement, StructType, Type};
use crate::compiler::bytecode::{Bytecode, Instructions, OpCode, make};
use crate::compiler::symbol_table::{ScopeChain, Symbol, SymbolScope, SymbolTable};
use crate::error::CompileError;
use crate::runtime::value::Value;

/// Placeholder operand for jumps that are patched once the target is known.
const JUMP_PLACEHOLDER: usize = 9999;

/// An instruction already written to the current scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EmittedInstruction {
    opcode: OpCode,
    position: usize,
}

/// Per-function emission state.
#[derive(Debug, Default)]
struct CompilationScope {
    instructions: Instructions,
    last: Option<EmittedInstruction>,
    previous: Option<EmittedInstruction>,
    /// Function declarations pre-defined by the block pre-pass and not yet
    /// compiled.
    hoisted: FxHashSet<String>,
}

/// A registered struct type and its constant pool slot.
#[derive(Debug, Clone)]
struct StructEntry {
    ty: Rc<StructType>,
    constant: usize,
}

/// Compiles AST to bytecode.
pub struct Compiler {
    constants: Vec<Value>,
    symbols: ScopeChain,
    scopes: Vec<CompilationScope>,
    structs: FxHashMap<String, StructEntry>,
}

impl Compiler {
    /// Creates a compiler with an empty constant pool and the builtins
    /// registered.
    pub fn new() -> Self {
        Self::with_state(SymbolTable::with_builtins(), Vec::new())
    }

    /// Creates a compiler that continues from a previous unit's global
    /// symbol table and constant pool.
    pub fn with_state(symbols: SymbolTable, constants: Vec<Value>) -> Self {
        let mut structs = FxHashMap::default();
        for (constant, value) in constants.iter().enumerate() {
            if let Value::StructType(ty) = value {
                structs.insert(
                    ty.name.clone(),
                    StructEntry {
                        ty: Rc::clone(ty),
                        constant,
                    },
                );
            }
        }

        Self {
            constants,
            symbols: ScopeChain::new(symbols),
            scopes: vec![CompilationScope::default()],
            structs,
        }
    }

    /// Releases the global symbol table and constant pool for the next unit.
    pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
        (self.symbols.into_global(), self.constants)
    }

    /// Compiles a program.
    ///
    /// Aborts on the first error. The returned bytecode shares the
    /// constant pool accumulated so far, including earlier units.
    ///
    /// After an error the compiler is back at top level and can compile
    /// the next unit. Globals defined and constants added by the failed
    /// unit before the error are kept.
    pub fn compile(&mut self, program: &Program) -> Result<Bytecode, CompileError> {
        debug!(statements = program.statements.len(), "compiling program");

        if let Err(err) = self.compile_statements(&program.statements) {
            debug!(error = %err, depth = self.symbols.depth(), "compile failed");
            self.unwind();
            return Err(err);
        }

        let main = mem::take(self.scope_mut());
        debug!(
            bytes = main.instructions.len(),
            constants = self.constants.len(),
            "compiled program"
        );

        Ok(Bytecode {
            instructions: main.instructions,
            constants: self.constants.clone(),
        })
    }

    fn compile_statements(&mut self, statements: &[Statement]) -> Result<(), CompileError> {
        self.hoist_functions(statements)?;
        for statement in statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    /// Drops every open function scope and the partial top-level stream.
    fn unwind(&mut self) {
        while self.symbols.pop().is_some() {}
        self.scopes.truncate(1);
        *self.scope_mut() = CompilationScope::default();
    }

    // ========================================================================
    // Emission
    // ========================================================================

    fn scope(&self) -> &CompilationScope {
        &self.scopes[self.scopes.len() - 1]
    }

    fn scope_mut(&mut self) -> &mut CompilationScope {
        let top = self.scopes.len() - 1;
        &mut self.scopes[top]
    }

    /// Offset the next emitted instruction will occupy.
    fn current_position(&self) -> usize {
        self.scope().instructions.len()
    }

    /// Encodes and appends an instruction, returning its position.
    fn emit(&mut self, opcode: OpCode, operands: &[usize]) -> Result<usize, CompileError> {
        let instruction = make(opcode, operands)?;
        let scope = self.scope_mut();
        let position = scope.instructions.push(&instruction);
        scope.previous = scope.last;
        scope.last = Some(EmittedInstruction { opcode, position });
        Ok(position)
    }

    fn add_constant(&mut self, value: Value) -> usize {
        self.constants.push(value);
        self.constants.len() - 1
    }

    fn emit_constant(&mut self, value: Value) -> Result<usize, CompileError> {
        let index = self.add_constant(value);
        self.emit(OpCode::Constant, &[index])
    }

    fn last_instruction_is(&self, opcode: OpCode) -> bool {
        self.scope().last.is_some_and(|last| last.opcode == opcode)
    }

    fn remove_last_pop(&mut self) {
        let scope = self.scope_mut();
        if let Some(last) = scope.last {
            scope.instructions.truncate(last.position);
            scope.last = scope.previous;
        }
    }

    fn replace_last_pop_with_return(&mut self) -> Result<(), CompileError> {
        let instruction = make(OpCode::ReturnValue, &[])?;
        let scope = self.scope_mut();
        if let Some(last) = scope.last.as_mut() {
            scope.instructions.replace(last.position, &instruction);
            last.opcode = OpCode::ReturnValue;
        }
        Ok(())
    }

    /// Re-encodes the instruction at `position` with a new operand.
    fn change_operand(&mut self, position: usize, operand: usize) -> Result<(), CompileError> {
        let opcode = OpCode::try_from(self.scope().instructions[position])?;
        let instruction = make(opcode, &[operand])?;
        self.scope_mut().instructions.replace(position, &instruction);
        Ok(())
    }

    /// Emits a jump with a placeholder target.
    fn emit_jump(&mut self, opcode: OpCode) -> Result<usize, CompileError> {
        self.emit(opcode, &[JUMP_PLACEHOLDER])
    }

    /// Points a previously emitted jump at the current position.
    fn patch_jump(&mut self, position: usize) -> Result<(), CompileError> {
        let target = self.current_position();
        self.change_operand(position, target)
    }

    // ========================================================================
    // Scopes
    // ========================================================================

    fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.symbols.push();
    }

    /// Closes the innermost function scope, returning its instructions and
    /// symbol table.
    fn leave_scope(&mut self) -> (Instructions, SymbolTable) {
        let scope = self.scopes.pop().unwrap_or_default();
        let table = self.symbols.pop().unwrap_or_default();
        (scope.instructions, table)
    }

    // ========================================================================
    // Bindings
    // ========================================================================

    /// Emits the load for `symbol` as seen from the current scope.
    ///
    /// A load in the scope that hoisted a function runs before that
    /// function's declaration has stored it, so it is rejected.
    fn load_symbol(&mut self, symbol: &Symbol) -> Result<usize, CompileError> {
        if matches!(symbol.scope, SymbolScope::Global | SymbolScope::Local)
            && self.scope().hoisted.contains(&symbol.name)
        {
            return Err(CompileError::UsedBeforeDeclaration(symbol.name.clone()));
        }

        match symbol.scope {
            SymbolScope::Global if symbol.mutable => self.emit(OpCode::GetGlobal, &[symbol.index]),
            SymbolScope::Global => self.emit(OpCode::GetConstGlobal, &[symbol.index]),
            SymbolScope::Local if symbol.mutable => self.emit(OpCode::GetLocal, &[symbol.index]),
            SymbolScope::Local => self.emit(OpCode::GetConstLocal, &[symbol.index]),
            SymbolScope::Free => self.emit(OpCode::GetFree, &[symbol.index]),
            SymbolScope::Builtin => self.emit(OpCode::GetBuiltin, &[symbol.index]),
            SymbolScope::Function => self.emit(OpCode::CurrentClosure, &[]),
        }
    }

    /// Emits the store that binds the value on top of the stack to `symbol`.
    fn store_symbol(&mut self, symbol: &Symbol) -> Result<usize, CompileError> {
        match (symbol.scope, symbol.mutable) {
            (SymbolScope::Global, true) => self.emit(OpCode::SetGlobal, &[symbol.index]),
            (SymbolScope::Global, false) => self.emit(OpCode::SetConstGlobal, &[symbol.index]),
            (SymbolScope::Local, true) => self.emit(OpCode::SetLocal, &[symbol.index]),
            (SymbolScope::Local, false) => self.emit(OpCode::SetConstLocal, &[symbol.index]),
            _ => Err(CompileError::AssignToCaptured(symbol.name.clone())),
        }
    }

    // ========================================================================
    // Structs and zero values
    // ========================================================================

    /// Registers a struct type, adding its descriptor to the constant pool.
    fn register_struct(&mut self, ty: &Rc<StructType>) -> usize {
        let constant = self.add_constant(Value::StructType(Rc::clone(ty)));
        self.structs.insert(
            ty.name.clone(),
            StructEntry {
                ty: Rc::clone(ty),
                constant,
            },
        );
        constant
    }

    /// The constant slot holding `ty`'s descriptor, registering it if needed.
    fn struct_constant(&mut self, ty: &Rc<StructType>) -> usize {
        match self.structs.get(&ty.name) {
            Some(entry) => entry.constant,
            None => self.register_struct(ty),
        }
    }

    fn lookup_struct(&self, name: &str) -> Option<Rc<StructType>> {
        self.structs.get(name).map(|entry| Rc::clone(&entry.ty))
    }

    /// Pushes the zero value of `ty`; `None` and non-aggregate types push null.
    fn emit_zero_value(&mut self, ty: Option<&Type>) -> Result<usize, CompileError> {
        match ty {
            Some(Type::Int) => self.emit_constant(Value::Integer(0)),
            Some(Type::Float) => self.emit_constant(Value::Float(0.0)),
            Some(Type::Str) => self.emit_constant(Value::string("")),
            Some(Type::Bool) => self.emit(OpCode::False, &[]),
            Some(Type::Array(_)) => self.emit(OpCode::Array, &[0]),
            Some(Type::Hash(_, _)) => self.emit(OpCode::Hash, &[0]),
            Some(Type::Struct(st)) => {
                let st = Rc::clone(st);
                for field in &st.fields {
                    self.emit_zero_value(Some(&field.ty))?;
                }
                let constant = self.struct_constant(&st);
                self.emit(OpCode::Struct, &[constant, st.fields.len()])
            }
            _ => self.emit(OpCode::Null, &[]),
        }
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

/// Compiles a standalone program with a fresh symbol table and constant pool.
pub fn compile_program(program: &Program) -> Result<Bytecode, CompileError> {
    Compiler::new().compile(program)
}
