// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Prefix and infix operators.

use std::fmt;
use std::str::FromStr;

use crate::error::CompileError;

/// Unary prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    /// `-x`
    Minus,
    /// `!x`
    Bang,
}

/// Binary infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    /// `+`
    Add,
    /// `-`
    Subtract,
    /// `*`
    Multiply,
    /// `/`
    Divide,
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanEqual,
    /// `&&`
    And,
    /// `||`
    Or,
}

impl InfixOperator {
    /// Returns true for operators that always produce a boolean.
    pub fn is_boolean(self) -> bool {
        !matches!(
            self,
            InfixOperator::Add
                | InfixOperator::Subtract
                | InfixOperator::Multiply
                | InfixOperator::Divide
        )
    }

    /// The operator's source text.
    pub fn as_str(self) -> &'static str {
        match self {
            InfixOperator::Add => "+",
            InfixOperator::Subtract => "-",
            InfixOperator::Multiply => "*",
            InfixOperator::Divide => "/",
            InfixOperator::Equal => "==",
            InfixOperator::NotEqual => "!=",
            InfixOperator::LessThan => "<",
            InfixOperator::LessThanEqual => "<=",
            InfixOperator::GreaterThan => ">",
            InfixOperator::GreaterThanEqual => ">=",
            InfixOperator::And => "&&",
            InfixOperator::Or => "||",
        }
    }
}

impl PrefixOperator {
    /// The operator's source text.
    pub fn as_str(self) -> &'static str {
        match self {
            PrefixOperator::Minus => "-",
            PrefixOperator::Bang => "!",
        }
    }
}

impl FromStr for InfixOperator {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "+" => InfixOperator::Add,
            "-" => InfixOperator::Subtract,
            "*" => InfixOperator::Multiply,
            "/" => InfixOperator::Divide,
            "==" => InfixOperator::Equal,
            "!=" => InfixOperator::NotEqual,
            "<" => InfixOperator::LessThan,
            "<=" => InfixOperator::LessThanEqual,
            ">" => InfixOperator::GreaterThan,
            ">=" => InfixOperator::GreaterThanEqual,
            "&&" => InfixOperator::And,
            "||" => InfixOperator::Or,
            other => return Err(CompileError::UnknownOperator(other.to_string())),
        })
    }
}

impl FromStr for PrefixOperator {
    type Err = CompileError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "-" => Ok(PrefixOperator::Minus),
            "!" => Ok(PrefixOperator::Bang),
            other => Err(CompileError::UnknownOperator(other.to_string())),
        }
    }
}

impl fmt::Display for InfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for PrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
