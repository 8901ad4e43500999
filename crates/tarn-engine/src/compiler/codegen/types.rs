// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Static type queries.
//!
//! The checker has already validated the program; these queries recover
//! just enough type information to enforce boolean loop conditions and to
//! resolve struct field offsets when no annotation is attached. `None`
//! means the type could not be determined locally.

use crate::ast::{Expression, PrefixOperator, Statement, Type};
use crate::compiler::symbol_table::SymbolScope;

use super::Compiler;

impl Compiler {
    /// Infers the static type of `expression` without side effects on the
    /// symbol tables.
    pub(super) fn type_of(&self, expression: &Expression) -> Option<Type> {
        match expression {
            Expression::Integer(_) => Some(Type::Int),
            Expression::Float(_) => Some(Type::Float),
            Expression::Str(_) => Some(Type::Str),
            Expression::Boolean(_) => Some(Type::Bool),
            Expression::Null => Some(Type::Null),
            Expression::Identifier(name) => self.symbols.lookup(name)?.ty.clone(),
            Expression::Prefix { operator, right } => match operator {
                PrefixOperator::Bang => Some(Type::Bool),
                PrefixOperator::Minus => self.type_of(right),
            },
            Expression::Infix { left, operator, .. } => {
                if operator.is_boolean() {
                    Some(Type::Bool)
                } else {
                    self.type_of(left)
                }
            }
            Expression::If(if_expr) => match if_expr.consequence.statements.last()? {
                Statement::Expression(last) => self.type_of(last),
                _ => None,
            },
            Expression::Function(literal) => Some(literal.function_type()),
            Expression::Call {
                function,
                arguments,
                overload,
            } => self.call_type(function, arguments, overload.as_deref()),
            Expression::Array(elements) => {
                let element = self.type_of(elements.first()?)?;
                Some(Type::array(element))
            }
            Expression::Hash(pairs) => {
                let (key, value) = pairs.first()?;
                Some(Type::hash(self.type_of(key)?, self.type_of(value)?))
            }
            Expression::Index { left, .. } => match self.type_of(left)? {
                Type::Array(element) => Some(*element),
                Type::Hash(_, value) => Some(*value),
                _ => None,
            },
            Expression::StructLiteral { type_name, .. } => {
                self.lookup_struct(type_name).map(Type::Struct)
            }
            Expression::Selector {
                object,
                field,
                struct_type,
            } => {
                let ty = match struct_type {
                    Some(ty) => ty.clone(),
                    None => match self.type_of(object)? {
                        Type::Struct(ty) => ty,
                        _ => return None,
                    },
                };
                let index = ty.field_index(field)?;
                Some(ty.fields[index].ty.clone())
            }
        }
    }

    fn call_type(
        &self,
        function: &Expression,
        arguments: &[Expression],
        overload: Option<&str>,
    ) -> Option<Type> {
        let callee = match (overload, function) {
            (Some(name), _) => self.symbols.lookup(name)?.clone(),
            (None, Expression::Identifier(name)) => self.symbols.lookup(name)?.clone(),
            (None, other) => {
                return match self.type_of(other)? {
                    Type::Function(func) => func.return_type.map(|ty| *ty),
                    _ => None,
                };
            }
        };

        if callee.scope == SymbolScope::Builtin {
            let argument = arguments.first().and_then(|arg| self.type_of(arg));
            return match callee.name.as_str() {
                "len" => Some(Type::Int),
                "rest" | "push" => argument,
                "first" | "last" => match argument? {
                    Type::Array(element) => Some(*element),
                    _ => None,
                },
                _ => None,
            };
        }

        match callee.ty? {
            Type::Function(func) => func.return_type.map(|ty| *ty),
            _ => None,
        }
    }
}
