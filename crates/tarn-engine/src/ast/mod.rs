// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Abstract Syntax Tree (AST) definitions for Tarn.
//!
//! The node set is closed: the parser produces these structures and the
//! compiler consumes them without further syntax validation. Type
//! information attached by the checker (struct resolution on selectors,
//! overload names on calls) is trusted verbatim.
//!
//! The constructor helpers at the bottom of this module exist for hosts
//! and tests that build trees directly.

mod operator;
mod types;

pub use operator::{InfixOperator, PrefixOperator};
pub use types::{FunctionType, StructField, StructType, Type};

use std::rc::Rc;

/// A complete Tarn program (one top-level compilation unit).
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    /// The statements in the program
    pub statements: Vec<Statement>,
}

impl Program {
    /// Creates a program from its statements.
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

/// A braced sequence of statements.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Block {
    /// The statements in the block
    pub statements: Vec<Statement>,
}

impl Block {
    /// Creates a block from its statements.
    pub fn new(statements: Vec<Statement>) -> Self {
        Self { statements }
    }
}

/// A Tarn statement.
#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    /// `let`/`const` declaration
    Declaration(Declaration),
    /// `name = value`
    Assignment(Assignment),
    /// `left[index] = value`
    IndexAssignment(IndexAssignment),
    /// `object.field = value`
    FieldAssignment(FieldAssignment),
    /// `return` with an optional value
    Return(Option<Expression>),
    /// `for (condition) { ... }`
    For(ForStatement),
    /// Named function declaration
    Function(FunctionDeclaration),
    /// Struct type declaration
    Struct(Rc<StructType>),
    /// Nested block
    Block(Block),
    /// Expression statement
    Expression(Expression),
}

/// A variable declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    /// The declared name
    pub name: String,
    /// `let` (true) or `const` (false)
    pub mutable: bool,
    /// Declared type, if written
    pub ty: Option<Type>,
    /// Initializer; without one the declared type's zero value is used
    pub value: Option<Expression>,
}

/// Assignment to an existing variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Target variable
    pub name: String,
    /// New value
    pub value: Expression,
}

/// Assignment through an index expression.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexAssignment {
    /// The indexed collection
    pub left: Expression,
    /// The index or key
    pub index: Expression,
    /// New value
    pub value: Expression,
}

/// Assignment to a struct field.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldAssignment {
    /// The struct-valued expression
    pub object: Expression,
    /// Field name
    pub field: String,
    /// New value
    pub value: Expression,
    /// Struct type resolved by the checker
    pub struct_type: Option<Rc<StructType>>,
}

/// A condition-only loop.
#[derive(Debug, Clone, PartialEq)]
pub struct ForStatement {
    /// Loop condition, must be statically boolean
    pub condition: Expression,
    /// Loop body
    pub body: Block,
}

/// A named function declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionDeclaration {
    /// Source name
    pub name: String,
    /// Overload-resolved name assigned by the checker
    pub mangled_name: Option<String>,
    /// Parameters in declaration order
    pub parameters: Vec<Parameter>,
    /// Declared return type
    pub return_type: Option<Type>,
    /// Function body
    pub body: Block,
}

impl FunctionDeclaration {
    /// The name this declaration binds.
    pub fn symbol_name(&self) -> &str {
        self.mangled_name.as_deref().unwrap_or(&self.name)
    }

    /// The function type of this declaration.
    pub fn function_type(&self) -> Type {
        Type::function(
            self.parameters.iter().map(|p| p.ty.clone()).collect(),
            self.return_type.clone(),
        )
    }
}

/// A typed function parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter type
    pub ty: Type,
}

impl Parameter {
    /// Creates a parameter.
    pub fn new(name: impl Into<String>, ty: Type) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// A function literal.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionLiteral {
    /// Self-reference name, set when bound by a declaration
    pub name: Option<String>,
    /// Parameters in declaration order
    pub parameters: Vec<Parameter>,
    /// Declared return type
    pub return_type: Option<Type>,
    /// Function body
    pub body: Block,
}

impl FunctionLiteral {
    /// The function type of this literal.
    pub fn function_type(&self) -> Type {
        Type::function(
            self.parameters.iter().map(|p| p.ty.clone()).collect(),
            self.return_type.clone(),
        )
    }
}

/// An `if` expression.
#[derive(Debug, Clone, PartialEq)]
pub struct IfExpression {
    /// Condition
    pub condition: Box<Expression>,
    /// Taken when the condition is truthy
    pub consequence: Block,
    /// Taken otherwise
    pub alternative: Option<Block>,
}

/// A Tarn expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Integer literal
    Integer(i64),
    /// Float literal
    Float(f64),
    /// String literal
    Str(String),
    /// Boolean literal
    Boolean(bool),
    /// `null`
    Null,
    /// Variable reference
    Identifier(String),
    /// Prefix operator application
    Prefix {
        /// The operator
        operator: PrefixOperator,
        /// The operand
        right: Box<Expression>,
    },
    /// Infix operator application
    Infix {
        /// Left operand
        left: Box<Expression>,
        /// The operator
        operator: InfixOperator,
        /// Right operand
        right: Box<Expression>,
    },
    /// Conditional expression
    If(IfExpression),
    /// Function literal
    Function(FunctionLiteral),
    /// Call expression
    Call {
        /// Callee
        function: Box<Expression>,
        /// Arguments in order
        arguments: Vec<Expression>,
        /// Overload name resolved by the checker
        overload: Option<String>,
    },
    /// Array literal
    Array(Vec<Expression>),
    /// Hash literal, pairs in source order
    Hash(Vec<(Expression, Expression)>),
    /// Index read
    Index {
        /// The indexed collection
        left: Box<Expression>,
        /// The index or key
        index: Box<Expression>,
    },
    /// Struct literal, fields in source order
    StructLiteral {
        /// Declared struct type name
        type_name: String,
        /// Field initializers
        fields: Vec<(String, Expression)>,
    },
    /// Field read
    Selector {
        /// The struct-valued expression
        object: Box<Expression>,
        /// Field name
        field: String,
        /// Struct type resolved by the checker
        struct_type: Option<Rc<StructType>>,
    },
}

// ============================================================================
// Constructor helpers
// ============================================================================

impl Expression {
    /// Integer literal.
    pub fn int(value: i64) -> Self {
        Expression::Integer(value)
    }

    /// String literal.
    pub fn string(value: impl Into<String>) -> Self {
        Expression::Str(value.into())
    }

    /// Identifier reference.
    pub fn ident(name: impl Into<String>) -> Self {
        Expression::Identifier(name.into())
    }

    /// Prefix application.
    pub fn prefix(operator: PrefixOperator, right: Expression) -> Self {
        Expression::Prefix {
            operator,
            right: Box::new(right),
        }
    }

    /// Infix application.
    pub fn infix(left: Expression, operator: InfixOperator, right: Expression) -> Self {
        Expression::Infix {
            left: Box::new(left),
            operator,
            right: Box::new(right),
        }
    }

    /// `if` expression.
    pub fn if_else(condition: Expression, consequence: Block, alternative: Option<Block>) -> Self {
        Expression::If(IfExpression {
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    /// Anonymous function literal.
    pub fn function(parameters: Vec<Parameter>, return_type: Option<Type>, body: Block) -> Self {
        Expression::Function(FunctionLiteral {
            name: None,
            parameters,
            return_type,
            body,
        })
    }

    /// Call without an overload annotation.
    pub fn call(function: Expression, arguments: Vec<Expression>) -> Self {
        Expression::Call {
            function: Box::new(function),
            arguments,
            overload: None,
        }
    }

    /// Index read.
    pub fn index(left: Expression, index: Expression) -> Self {
        Expression::Index {
            left: Box::new(left),
            index: Box::new(index),
        }
    }

    /// Field read without a checker annotation.
    pub fn selector(object: Expression, field: impl Into<String>) -> Self {
        Expression::Selector {
            object: Box::new(object),
            field: field.into(),
            struct_type: None,
        }
    }

    /// Struct literal.
    pub fn struct_literal(type_name: impl Into<String>, fields: Vec<(&str, Expression)>) -> Self {
        Expression::StructLiteral {
            type_name: type_name.into(),
            fields: fields
                .into_iter()
                .map(|(name, value)| (name.to_string(), value))
                .collect(),
        }
    }
}

impl Statement {
    /// Expression statement.
    pub fn expr(expression: Expression) -> Self {
        Statement::Expression(expression)
    }

    /// `let name = value`
    pub fn let_(name: impl Into<String>, value: Expression) -> Self {
        Statement::Declaration(Declaration {
            name: name.into(),
            mutable: true,
            ty: None,
            value: Some(value),
        })
    }

    /// `const name = value`
    pub fn const_(name: impl Into<String>, value: Expression) -> Self {
        Statement::Declaration(Declaration {
            name: name.into(),
            mutable: false,
            ty: None,
            value: Some(value),
        })
    }

    /// `let name Type` with no initializer.
    pub fn declare(name: impl Into<String>, ty: Type) -> Self {
        Statement::Declaration(Declaration {
            name: name.into(),
            mutable: true,
            ty: Some(ty),
            value: None,
        })
    }

    /// `name = value`
    pub fn assign(name: impl Into<String>, value: Expression) -> Self {
        Statement::Assignment(Assignment {
            name: name.into(),
            value,
        })
    }

    /// `return value`
    pub fn ret(value: Expression) -> Self {
        Statement::Return(Some(value))
    }

    /// `for (condition) { body }`
    pub fn for_loop(condition: Expression, body: Block) -> Self {
        Statement::For(ForStatement { condition, body })
    }

    /// `func name(params) -> return_type { body }`
    pub fn function(
        name: impl Into<String>,
        parameters: Vec<Parameter>,
        return_type: Option<Type>,
        body: Block,
    ) -> Self {
        Statement::Function(FunctionDeclaration {
            name: name.into(),
            mangled_name: None,
            parameters,
            return_type,
            body,
        })
    }
}
