// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Statement compilation.
//!
//! | Statement | Key Operations | Notes |
//! |-----------|----------------|-------|
//! | `let/const` | `SetGlobal`, `SetConstLocal`, ... | Zero value without initializer |
//! | `x = v` | `SetGlobal`, `SetLocal` | Mutable bindings only |
//! | `a[i] = v` | `SetIndex` | |
//! | `s.f = v` | `SetField` | Field index fixed at compile time |
//! | `for` | `JumpNotTruthy`, `Jump` (back) | Condition must be `bool` |
//! | `return` | `ReturnValue`, `Return` | Rejected at top level |
//!
//! ## For Loop
//!
//! ```text
//! for (condition) { body }
//!
//! Bytecode:
//! start:
//!   [condition bytecode]
//!   JumpNotTruthy -> end
//!   [body bytecode]
//!   Jump -> start
//! end:
//!   Null
//!   Pop
//! ```

use super::Compiler;
use crate::ast::{
    Assignment, Block, Declaration, Expression, FieldAssignment, ForStatement,
    FunctionDeclaration, IndexAssignment, Statement, Type,
};
use crate::compiler::bytecode::OpCode;
use crate::compiler::symbol_table::SymbolScope;
use crate::error::CompileError;

impl Compiler {
    /// Pre-defines every function declaration in `statements` as an
    /// immutable binding so bodies can refer to functions declared later.
    pub(super) fn hoist_functions(&mut self, statements: &[Statement]) -> Result<(), CompileError> {
        for statement in statements {
            if let Statement::Function(decl) = statement {
                let name = decl.symbol_name();
                if self.symbols.conflicting_definition(name).is_some() {
                    return Err(CompileError::Redeclared(name.to_string()));
                }
                self.symbols.define(name, false, Some(decl.function_type()));
                self.scope_mut().hoisted.insert(name.to_string());
            }
        }
        Ok(())
    }

    pub(super) fn compile_statement(&mut self, statement: &Statement) -> Result<(), CompileError> {
        match statement {
            Statement::Expression(expression) => {
                self.compile_expression(expression)?;
                self.emit(OpCode::Pop, &[])?;
            }
            Statement::Declaration(decl) => self.compile_declaration(decl)?,
            Statement::Assignment(assignment) => self.compile_assignment(assignment)?,
            Statement::IndexAssignment(assignment) => self.compile_index_assignment(assignment)?,
            Statement::FieldAssignment(assignment) => self.compile_field_assignment(assignment)?,
            Statement::Return(value) => self.compile_return(value.as_ref())?,
            Statement::For(for_stmt) => self.compile_for(for_stmt)?,
            Statement::Function(decl) => self.compile_function_declaration(decl)?,
            Statement::Struct(ty) => {
                self.register_struct(ty);
            }
            Statement::Block(block) => self.compile_block(block)?,
        }
        Ok(())
    }

    /// Compiles a block in the current scope, after its own hoisting pre-pass.
    pub(super) fn compile_block(&mut self, block: &Block) -> Result<(), CompileError> {
        self.hoist_functions(&block.statements)?;
        for statement in &block.statements {
            self.compile_statement(statement)?;
        }
        Ok(())
    }

    fn compile_declaration(&mut self, decl: &Declaration) -> Result<(), CompileError> {
        if self.symbols.conflicting_definition(&decl.name).is_some() {
            return Err(CompileError::Redeclared(decl.name.clone()));
        }

        let ty = match (&decl.ty, &decl.value) {
            (Some(ty), _) => Some(ty.clone()),
            (None, Some(value)) => self.type_of(value),
            (None, None) => None,
        };

        match &decl.value {
            Some(Expression::Function(literal)) => {
                self.compile_function_literal(literal, Some(&decl.name))?;
            }
            Some(value) => {
                self.compile_expression(value)?;
            }
            None => {
                self.emit_zero_value(decl.ty.as_ref())?;
            }
        }

        let symbol = self.symbols.define(&decl.name, decl.mutable, ty);
        self.store_symbol(&symbol)?;
        Ok(())
    }

    fn compile_assignment(&mut self, assignment: &Assignment) -> Result<(), CompileError> {
        let symbol = self
            .symbols
            .resolve(&assignment.name)
            .ok_or_else(|| CompileError::AssignToUndefined(assignment.name.clone()))?
            .symbol;

        match symbol.scope {
            SymbolScope::Free | SymbolScope::Function => {
                return Err(CompileError::AssignToCaptured(symbol.name));
            }
            SymbolScope::Builtin => return Err(CompileError::AssignToConstant(symbol.name)),
            SymbolScope::Global | SymbolScope::Local if !symbol.mutable => {
                return Err(CompileError::AssignToConstant(symbol.name));
            }
            SymbolScope::Global | SymbolScope::Local => {}
        }

        self.compile_expression(&assignment.value)?;
        self.store_symbol(&symbol)?;
        Ok(())
    }

    fn compile_index_assignment(&mut self, assignment: &IndexAssignment) -> Result<(), CompileError> {
        self.compile_expression(&assignment.left)?;
        self.compile_expression(&assignment.index)?;
        self.compile_expression(&assignment.value)?;
        self.emit(OpCode::SetIndex, &[])?;
        Ok(())
    }

    fn compile_field_assignment(&mut self, assignment: &FieldAssignment) -> Result<(), CompileError> {
        let index = self.resolve_field(
            &assignment.object,
            &assignment.field,
            assignment.struct_type.as_ref(),
        )?;
        self.compile_expression(&assignment.object)?;
        self.compile_expression(&assignment.value)?;
        self.emit(OpCode::SetField, &[index])?;
        Ok(())
    }

    fn compile_return(&mut self, value: Option<&Expression>) -> Result<(), CompileError> {
        if self.symbols.depth() == 0 {
            return Err(CompileError::ReturnOutsideFunction);
        }
        match value {
            Some(value) => {
                self.compile_expression(value)?;
                self.emit(OpCode::ReturnValue, &[])?;
            }
            None => {
                self.emit(OpCode::Return, &[])?;
            }
        }
        Ok(())
    }

    fn compile_for(&mut self, for_stmt: &ForStatement) -> Result<(), CompileError> {
        match self.type_of(&for_stmt.condition) {
            Some(Type::Bool) => {}
            Some(other) => return Err(CompileError::NonBooleanCondition(other.to_string())),
            None => return Err(CompileError::NonBooleanCondition("unknown".to_string())),
        }

        let start = self.current_position();
        self.compile_expression(&for_stmt.condition)?;
        let exit = self.emit_jump(OpCode::JumpNotTruthy)?;

        self.compile_block(&for_stmt.body)?;
        self.emit(OpCode::Jump, &[start])?;

        self.patch_jump(exit)?;
        self.emit(OpCode::Null, &[])?;
        self.emit(OpCode::Pop, &[])?;
        Ok(())
    }

    fn compile_function_declaration(&mut self, decl: &FunctionDeclaration) -> Result<(), CompileError> {
        let name = decl.symbol_name();

        let symbol = if self.scope_mut().hoisted.remove(name) {
            self.symbols.current().get(name).cloned()
        } else {
            None
        };
        let symbol = match symbol {
            Some(symbol) => symbol,
            None => {
                if self.symbols.conflicting_definition(name).is_some() {
                    return Err(CompileError::Redeclared(name.to_string()));
                }
                self.symbols.define(name, false, Some(decl.function_type()))
            }
        };

        self.compile_function(Some(name), &decl.parameters, decl.function_type(), &decl.body)?;
        self.store_symbol(&symbol)?;
        Ok(())
    }
}
