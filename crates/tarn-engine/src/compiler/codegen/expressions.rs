// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Expression compilation. Every expression leaves exactly one value on
//! the operand stack.

use std::mem;
use std::rc::Rc;

use tracing::trace;

use super::Compiler;
use crate::ast::{
    Block, Expression, FunctionLiteral, IfExpression, InfixOperator, Parameter, PrefixOperator,
    StructType, Type,
};
use crate::compiler::bytecode::OpCode;
use crate::error::CompileError;
use crate::runtime::function::CompiledFunction;
use crate::runtime::value::Value;

impl Compiler {
    pub(super) fn compile_expression(&mut self, expression: &Expression) -> Result<(), CompileError> {
        match expression {
            Expression::Integer(value) => {
                self.emit_constant(Value::Integer(*value))?;
            }
            Expression::Float(value) => {
                self.emit_constant(Value::Float(*value))?;
            }
            Expression::Str(value) => {
                self.emit_constant(Value::string(value))?;
            }
            Expression::Boolean(true) => {
                self.emit(OpCode::True, &[])?;
            }
            Expression::Boolean(false) => {
                self.emit(OpCode::False, &[])?;
            }
            Expression::Null => {
                self.emit(OpCode::Null, &[])?;
            }
            Expression::Identifier(name) => {
                let resolution = self
                    .symbols
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedVariable(name.clone()))?;
                self.load_symbol(&resolution.symbol)?;
            }
            Expression::Prefix { operator, right } => {
                self.compile_expression(right)?;
                let opcode = match operator {
                    PrefixOperator::Minus => OpCode::Minus,
                    PrefixOperator::Bang => OpCode::Bang,
                };
                self.emit(opcode, &[])?;
            }
            Expression::Infix {
                left,
                operator,
                right,
            } => self.compile_infix(left, *operator, right)?,
            Expression::If(if_expr) => self.compile_if(if_expr)?,
            Expression::Function(literal) => self.compile_function_literal(literal, None)?,
            Expression::Call {
                function,
                arguments,
                overload,
            } => self.compile_call(function, arguments, overload.as_deref())?,
            Expression::Array(elements) => {
                for element in elements {
                    self.compile_expression(element)?;
                }
                self.emit(OpCode::Array, &[elements.len()])?;
            }
            Expression::Hash(pairs) => {
                for (key, value) in pairs {
                    self.compile_expression(key)?;
                    self.compile_expression(value)?;
                }
                self.emit(OpCode::Hash, &[pairs.len() * 2])?;
            }
            Expression::Index { left, index } => {
                self.compile_expression(left)?;
                self.compile_expression(index)?;
                self.emit(OpCode::Index, &[])?;
            }
            Expression::StructLiteral { type_name, fields } => {
                self.compile_struct_literal(type_name, fields)?;
            }
            Expression::Selector {
                object,
                field,
                struct_type,
            } => {
                let index = self.resolve_field(object, field, struct_type.as_ref())?;
                self.compile_expression(object)?;
                self.emit(OpCode::GetField, &[index])?;
            }
        }
        Ok(())
    }

    fn compile_infix(
        &mut self,
        left: &Expression,
        operator: InfixOperator,
        right: &Expression,
    ) -> Result<(), CompileError> {
        // `a < b` is `b > a`; only the greater-than forms exist as opcodes.
        let (first, second, opcode) = match operator {
            InfixOperator::LessThan => (right, left, OpCode::GreaterThan),
            InfixOperator::LessThanEqual => (right, left, OpCode::GreaterThanOrEqual),
            InfixOperator::Add => (left, right, OpCode::Add),
            InfixOperator::Subtract => (left, right, OpCode::Sub),
            InfixOperator::Multiply => (left, right, OpCode::Mul),
            InfixOperator::Divide => (left, right, OpCode::Div),
            InfixOperator::Equal => (left, right, OpCode::Equal),
            InfixOperator::NotEqual => (left, right, OpCode::NotEqual),
            InfixOperator::GreaterThan => (left, right, OpCode::GreaterThan),
            InfixOperator::GreaterThanEqual => (left, right, OpCode::GreaterThanOrEqual),
            InfixOperator::And => (left, right, OpCode::And),
            InfixOperator::Or => (left, right, OpCode::Or),
        };

        self.compile_expression(first)?;
        self.compile_expression(second)?;
        self.emit(opcode, &[])?;
        Ok(())
    }

    fn compile_if(&mut self, if_expr: &IfExpression) -> Result<(), CompileError> {
        self.compile_expression(&if_expr.condition)?;
        let jump_not_truthy = self.emit_jump(OpCode::JumpNotTruthy)?;

        self.compile_branch(&if_expr.consequence)?;
        let jump = self.emit_jump(OpCode::Jump)?;
        self.patch_jump(jump_not_truthy)?;

        match &if_expr.alternative {
            Some(alternative) => self.compile_branch(alternative)?,
            None => {
                self.emit(OpCode::Null, &[])?;
            }
        }
        self.patch_jump(jump)?;
        Ok(())
    }

    /// Compiles an `if` branch so that it leaves its final value on the stack.
    fn compile_branch(&mut self, block: &Block) -> Result<(), CompileError> {
        self.compile_block(block)?;
        if self.last_instruction_is(OpCode::Pop) {
            self.remove_last_pop();
        } else {
            self.emit(OpCode::Null, &[])?;
        }
        Ok(())
    }

    fn compile_call(
        &mut self,
        function: &Expression,
        arguments: &[Expression],
        overload: Option<&str>,
    ) -> Result<(), CompileError> {
        let callee = match (overload, function) {
            (Some(name), _) => Some(name),
            (None, Expression::Identifier(name)) => Some(name.as_str()),
            (None, _) => None,
        };

        match callee {
            Some(name) => {
                let resolution = self
                    .symbols
                    .resolve(name)
                    .ok_or_else(|| CompileError::UndefinedFunction(name.to_string()))?;
                self.load_symbol(&resolution.symbol)?;
            }
            None => self.compile_expression(function)?,
        }

        for argument in arguments {
            self.compile_expression(argument)?;
        }
        self.emit(OpCode::Call, &[arguments.len()])?;
        Ok(())
    }

    pub(super) fn compile_function_literal(
        &mut self,
        literal: &FunctionLiteral,
        name: Option<&str>,
    ) -> Result<(), CompileError> {
        let name = name.or(literal.name.as_deref());
        self.compile_function(name, &literal.parameters, literal.function_type(), &literal.body)
    }

    /// Compiles a function body in its own scope and emits the closure
    /// that captures its free variables.
    pub(super) fn compile_function(
        &mut self,
        name: Option<&str>,
        parameters: &[Parameter],
        ty: Type,
        body: &Block,
    ) -> Result<(), CompileError> {
        self.enter_scope();

        if let Some(name) = name {
            self.symbols.current_mut().define_function_name(name, Some(ty));
        }
        for parameter in parameters {
            self.symbols.define(&parameter.name, false, Some(parameter.ty.clone()));
        }

        self.compile_block(body)?;

        if self.last_instruction_is(OpCode::Pop) {
            self.replace_last_pop_with_return()?;
        }
        if !self.last_instruction_is(OpCode::ReturnValue) {
            self.emit(OpCode::Return, &[])?;
        }

        let (instructions, mut table) = self.leave_scope();
        let free_symbols = mem::take(&mut table.free_symbols);
        let num_locals = table.num_definitions();

        trace!(
            name = name.unwrap_or("<anonymous>"),
            num_locals,
            free = free_symbols.len(),
            "compiled function"
        );

        for symbol in &free_symbols {
            self.load_symbol(symbol)?;
        }

        let function = CompiledFunction {
            instructions,
            num_locals,
            num_parameters: parameters.len(),
            name: name.map(str::to_string),
        };
        let constant = self.add_constant(Value::CompiledFunction(Rc::new(function)));
        self.emit(OpCode::Closure, &[constant, free_symbols.len()])?;
        Ok(())
    }

    fn compile_struct_literal(
        &mut self,
        type_name: &str,
        fields: &[(String, Expression)],
    ) -> Result<(), CompileError> {
        let ty = self
            .lookup_struct(type_name)
            .ok_or_else(|| CompileError::UnknownStructType(type_name.to_string()))?;

        if let Some((unknown, _)) = fields.iter().find(|(name, _)| ty.field_index(name).is_none()) {
            return Err(CompileError::UnknownField {
                struct_name: ty.name.clone(),
                field: unknown.clone(),
            });
        }

        // Values go on the stack in declared order regardless of source order.
        for field in &ty.fields {
            match fields.iter().find(|(name, _)| *name == field.name) {
                Some((_, value)) => self.compile_expression(value)?,
                None => {
                    self.emit_zero_value(Some(&field.ty))?;
                }
            }
        }

        let constant = self.struct_constant(&ty);
        self.emit(OpCode::Struct, &[constant, ty.fields.len()])?;
        Ok(())
    }

    /// Resolves the positional index of `field` on the struct type of
    /// `object`, preferring the checker's annotation.
    pub(super) fn resolve_field(
        &self,
        object: &Expression,
        field: &str,
        annotated: Option<&Rc<StructType>>,
    ) -> Result<usize, CompileError> {
        let ty = match annotated {
            Some(ty) => Rc::clone(ty),
            None => match self.type_of(object) {
                Some(Type::Struct(ty)) => ty,
                other => {
                    return Err(CompileError::NotAStruct {
                        field: field.to_string(),
                        ty: other.map_or_else(|| "unknown".to_string(), |ty| ty.to_string()),
                    });
                }
            },
        };

        ty.field_index(field).ok_or_else(|| CompileError::UnknownField {
            struct_name: ty.name.clone(),
            field: field.to_string(),
        })
    }
}
