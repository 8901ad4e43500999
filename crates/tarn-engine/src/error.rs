// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the Tarn engine.
//!
//! Compilation and execution abort on the first error. VM failures are
//! reported to the host as `RuntimeError`s, never pushed as values.

use thiserror::Error;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur anywhere in the engine
#[derive(Debug, Error)]
pub enum Error {
    /// Compile-time failure
    #[error("compile error: {0}")]
    Compile(#[from] CompileError),

    /// Runtime failure
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// Invalid engine configuration
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Instruction encoding and decoding failures
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EncodeError {
    /// Operand count does not match the opcode definition
    #[error("opcode {opcode} expects {expected} operands, got {actual}")]
    OperandCount {
        /// Opcode name
        opcode: &'static str,
        /// Defined operand count
        expected: usize,
        /// Supplied operand count
        actual: usize,
    },

    /// Operand does not fit its static width
    #[error("operand {operand} of {opcode} does not fit in {width} byte(s)")]
    OperandOverflow {
        /// Opcode name
        opcode: &'static str,
        /// Offending value
        operand: usize,
        /// Width in bytes
        width: usize,
    },

    /// Byte is not a known opcode
    #[error("opcode {0} undefined")]
    UnknownOpcode(u8),

    /// Instruction stream ends inside an instruction
    #[error("truncated instruction at offset {0}")]
    Truncated(usize),
}

/// Compile-time errors
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    /// Identifier not bound in any enclosing scope
    #[error("undefined variable {0}")]
    UndefinedVariable(String),

    /// Called name not bound in any enclosing scope
    #[error("undefined function {0}")]
    UndefinedFunction(String),

    /// Name declared twice in the same scope
    #[error("{0} is already declared in this scope")]
    Redeclared(String),

    /// Hoisted function read before its declaration has run in the same
    /// scope, directly or through a closure capture
    #[error("function {0} is used before its declaration")]
    UsedBeforeDeclaration(String),

    /// Assignment to a `const` binding
    #[error("cannot assign to constant {0}")]
    AssignToConstant(String),

    /// Assignment to a name that was never declared
    #[error("cannot assign to undefined variable {0}")]
    AssignToUndefined(String),

    /// Assignment to a variable captured from an enclosing function
    #[error("cannot assign to captured variable {0}")]
    AssignToCaptured(String),

    /// Operator text the compiler does not know
    #[error("unknown operator: {0}")]
    UnknownOperator(String),

    /// `for` condition not statically boolean
    #[error("for loop condition must be bool, got {0}")]
    NonBooleanCondition(String),

    /// Struct literal names an undeclared type
    #[error("undefined struct type {0}")]
    UnknownStructType(String),

    /// Field not declared on the struct type
    #[error("struct {struct_name} has no field {field}")]
    UnknownField {
        /// Struct type name
        struct_name: String,
        /// Requested field
        field: String,
    },

    /// Field access on an expression whose static type is not a struct
    #[error("cannot access field {field} on non-struct type {ty}")]
    NotAStruct {
        /// Requested field
        field: String,
        /// Static type of the object, or `unknown`
        ty: String,
    },

    /// `return` outside any function body
    #[error("return outside function")]
    ReturnOutsideFunction,

    /// Encoding failed (operand out of range)
    #[error(transparent)]
    Encode(#[from] EncodeError),
}

/// Runtime errors raised by the virtual machine
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// Operand stack capacity exceeded
    #[error("stack overflow")]
    StackOverflow,

    /// Pop from an empty operand stack
    #[error("stack underflow")]
    StackUnderflow,

    /// Frame stack capacity exceeded
    #[error("frame stack overflow (max {0} frames)")]
    FrameOverflow(usize),

    /// Binary operator applied to an unsupported type pair
    #[error("unsupported types for {op}: {left} {right}")]
    UnsupportedOperands {
        /// Operator name
        op: &'static str,
        /// Left operand type
        left: &'static str,
        /// Right operand type
        right: &'static str,
    },

    /// Unary operator applied to an unsupported type
    #[error("unsupported type for {op}: {operand}")]
    UnsupportedOperand {
        /// Operator name
        op: &'static str,
        /// Operand type
        operand: &'static str,
    },

    /// Integer division by zero
    #[error("division by zero")]
    DivisionByZero,

    /// Call target is not a closure or builtin
    #[error("calling non-function: {0}")]
    NotCallable(&'static str),

    /// Closure called with the wrong number of arguments
    #[error("wrong number of arguments: want={expected}, got={actual}")]
    WrongArgumentCount {
        /// Declared parameter count
        expected: usize,
        /// Supplied argument count
        actual: usize,
    },

    /// Value used as a hash key is not hashable
    #[error("unusable as hash key: {0}")]
    UnhashableKey(&'static str),

    /// Index operator applied to an unsupported type pair
    #[error("index operator not supported: {left}[{index}]")]
    IndexNotSupported {
        /// Collection type
        left: &'static str,
        /// Index type
        index: &'static str,
    },

    /// Array write outside `0..=len`
    #[error("index {index} out of bounds for array of length {len}")]
    IndexOutOfBounds {
        /// Requested index
        index: i64,
        /// Current array length
        len: usize,
    },

    /// Field access on a non-struct value
    #[error("field access on non-struct value: {0}")]
    NotAStruct(&'static str),

    /// Closure opcode referencing a constant that is not a function
    #[error("not a function: {0}")]
    NotAFunction(&'static str),

    /// Host builtin reported a failure
    #[error("{name}: {message}")]
    Builtin {
        /// Builtin name
        name: &'static str,
        /// Failure description
        message: String,
    },

    /// Global index beyond the configured store
    #[error("global index {index} exceeds store size {size}")]
    GlobalOutOfRange {
        /// Requested index
        index: usize,
        /// Configured size
        size: usize,
    },

    /// Operand refers to a missing constant, builtin, capture or field
    #[error("invalid operand {operand} for {opcode}")]
    InvalidOperand {
        /// Opcode name
        opcode: &'static str,
        /// Offending operand
        operand: usize,
    },

    /// Malformed instruction stream
    #[error(transparent)]
    Decode(#[from] EncodeError),
}
