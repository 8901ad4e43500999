// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Bytecode definitions.
//!
//! Every instruction is one opcode byte followed by zero to two
//! fixed-width big-endian operands. The width table in
//! [`OpCode::definition`] is the only place operand layout is defined;
//! the compiler, the VM and the disassembler all read it.

use std::fmt;
use std::ops::Deref;

use crate::error::EncodeError;
use crate::runtime::value::Value;

/// A compiled bytecode unit: the top-level instruction stream and the
/// constant pool it indexes into.
#[derive(Debug, Clone, Default)]
pub struct Bytecode {
    /// The instructions
    pub instructions: Instructions,
    /// The constant pool
    pub constants: Vec<Value>,
}

/// Operation codes for the VM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    // Literals
    /// Push constant pool entry `[u16 index]`
    Constant,
    /// Push true
    True,
    /// Push false
    False,
    /// Push null
    Null,

    // Arithmetic
    /// Add top two values
    Add,
    /// Subtract
    Sub,
    /// Multiply
    Mul,
    /// Divide
    Div,

    // Comparison
    /// Equal (==)
    Equal,
    /// Not equal (!=)
    NotEqual,
    /// Greater than; `<` compiles to this with swapped operands
    GreaterThan,
    /// Greater than or equal; `<=` compiles to this with swapped operands
    GreaterThanOrEqual,

    // Logical operations (both operands evaluated)
    /// Logical AND
    And,
    /// Logical OR
    Or,

    // Unary
    /// Negate
    Minus,
    /// Logical NOT
    Bang,

    // Control flow
    /// Unconditional jump to absolute offset `[u16 target]`
    Jump,
    /// Pop and jump if not truthy `[u16 target]`
    JumpNotTruthy,

    // Bindings
    /// Load a mutable global `[u16 index]`
    GetGlobal,
    /// Store a mutable global `[u16 index]`
    SetGlobal,
    /// Load an immutable global `[u16 index]`
    GetConstGlobal,
    /// Initialize an immutable global `[u16 index]`
    SetConstGlobal,
    /// Load a mutable local `[u8 index]`
    GetLocal,
    /// Store a mutable local `[u8 index]`
    SetLocal,
    /// Load an immutable local `[u8 index]`
    GetConstLocal,
    /// Initialize an immutable local `[u8 index]`
    SetConstLocal,
    /// Load a captured value of the running closure `[u8 index]`
    GetFree,
    /// Load a builtin `[u8 index]`
    GetBuiltin,
    /// Load the running closure itself
    CurrentClosure,

    // Collections
    /// Build an array from N popped values `[u16 count]`
    Array,
    /// Build a hash from N popped values (N/2 pairs) `[u16 count]`
    Hash,
    /// Index read
    Index,
    /// Index write
    SetIndex,

    // Calls
    /// Call with argument count `[u8 argc]`
    Call,
    /// Return the popped value
    ReturnValue,
    /// Return null
    Return,

    // Closures
    /// Make a closure from a function constant and N captured values `[u16 constant, u8 count]`
    Closure,

    // Structs
    /// Build a struct from a type descriptor and N fields `[u16 constant, u8 count]`
    Struct,
    /// Read a field by position `[u8 index]`
    GetField,
    /// Write a field by position `[u8 index]`
    SetField,

    // Stack
    /// Discard the top value
    Pop,
}

/// Static layout of one opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Definition {
    /// Mnemonic used by the disassembler
    pub name: &'static str,
    /// Width in bytes of each operand
    pub operand_widths: &'static [usize],
}

impl OpCode {
    /// All opcodes, in discriminant order.
    pub const ALL: [OpCode; 41] = [
        OpCode::Constant,
        OpCode::True,
        OpCode::False,
        OpCode::Null,
        OpCode::Add,
        OpCode::Sub,
        OpCode::Mul,
        OpCode::Div,
        OpCode::Equal,
        OpCode::NotEqual,
        OpCode::GreaterThan,
        OpCode::GreaterThanOrEqual,
        OpCode::And,
        OpCode::Or,
        OpCode::Minus,
        OpCode::Bang,
        OpCode::Jump,
        OpCode::JumpNotTruthy,
        OpCode::GetGlobal,
        OpCode::SetGlobal,
        OpCode::GetConstGlobal,
        OpCode::SetConstGlobal,
        OpCode::GetLocal,
        OpCode::SetLocal,
        OpCode::GetConstLocal,
        OpCode::SetConstLocal,
        OpCode::GetFree,
        OpCode::GetBuiltin,
        OpCode::CurrentClosure,
        OpCode::Array,
        OpCode::Hash,
        OpCode::Index,
        OpCode::SetIndex,
        OpCode::Call,
        OpCode::ReturnValue,
        OpCode::Return,
        OpCode::Closure,
        OpCode::Struct,
        OpCode::GetField,
        OpCode::SetField,
        OpCode::Pop,
    ];

    /// The opcode's name and operand widths.
    pub const fn definition(self) -> Definition {
        const NONE: &[usize] = &[];
        const U8: &[usize] = &[1];
        const U16: &[usize] = &[2];
        const U16_U8: &[usize] = &[2, 1];

        let (name, operand_widths) = match self {
            OpCode::Constant => ("OpConstant", U16),
            OpCode::True => ("OpTrue", NONE),
            OpCode::False => ("OpFalse", NONE),
            OpCode::Null => ("OpNull", NONE),
            OpCode::Add => ("OpAdd", NONE),
            OpCode::Sub => ("OpSub", NONE),
            OpCode::Mul => ("OpMul", NONE),
            OpCode::Div => ("OpDiv", NONE),
            OpCode::Equal => ("OpEqual", NONE),
            OpCode::NotEqual => ("OpNotEqual", NONE),
            OpCode::GreaterThan => ("OpGreaterThan", NONE),
            OpCode::GreaterThanOrEqual => ("OpGreaterThanOrEqual", NONE),
            OpCode::And => ("OpAnd", NONE),
            OpCode::Or => ("OpOr", NONE),
            OpCode::Minus => ("OpMinus", NONE),
            OpCode::Bang => ("OpBang", NONE),
            OpCode::Jump => ("OpJump", U16),
            OpCode::JumpNotTruthy => ("OpJumpNotTruthy", U16),
            OpCode::GetGlobal => ("OpGetGlobal", U16),
            OpCode::SetGlobal => ("OpSetGlobal", U16),
            OpCode::GetConstGlobal => ("OpGetConstGlobal", U16),
            OpCode::SetConstGlobal => ("OpSetConstGlobal", U16),
            OpCode::GetLocal => ("OpGetLocal", U8),
            OpCode::SetLocal => ("OpSetLocal", U8),
            OpCode::GetConstLocal => ("OpGetConstLocal", U8),
            OpCode::SetConstLocal => ("OpSetConstLocal", U8),
            OpCode::GetFree => ("OpGetFree", U8),
            OpCode::GetBuiltin => ("OpGetBuiltin", U8),
            OpCode::CurrentClosure => ("OpCurrentClosure", NONE),
            OpCode::Array => ("OpArray", U16),
            OpCode::Hash => ("OpHash", U16),
            OpCode::Index => ("OpIndex", NONE),
            OpCode::SetIndex => ("OpSetIndex", NONE),
            OpCode::Call => ("OpCall", U8),
            OpCode::ReturnValue => ("OpReturnValue", NONE),
            OpCode::Return => ("OpReturn", NONE),
            OpCode::Closure => ("OpClosure", U16_U8),
            OpCode::Struct => ("OpStruct", U16_U8),
            OpCode::GetField => ("OpGetField", U8),
            OpCode::SetField => ("OpSetField", U8),
            OpCode::Pop => ("OpPop", NONE),
        };
        Definition {
            name,
            operand_widths,
        }
    }

    /// Total encoded length of this opcode's instructions.
    pub fn width(self) -> usize {
        1 + self.definition().operand_widths.iter().sum::<usize>()
    }
}

impl TryFrom<u8> for OpCode {
    type Error = EncodeError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        OpCode::ALL
            .get(byte as usize)
            .copied()
            .ok_or(EncodeError::UnknownOpcode(byte))
    }
}

/// Encode one instruction.
///
/// The operand count must match the opcode definition and every operand
/// must fit its width.
pub fn make(opcode: OpCode, operands: &[usize]) -> Result<Vec<u8>, EncodeError> {
    let def = opcode.definition();
    if operands.len() != def.operand_widths.len() {
        return Err(EncodeError::OperandCount {
            opcode: def.name,
            expected: def.operand_widths.len(),
            actual: operands.len(),
        });
    }

    let mut instruction = Vec::with_capacity(opcode.width());
    instruction.push(opcode as u8);

    for (&operand, &width) in operands.iter().zip(def.operand_widths) {
        match width {
            2 => {
                let value = u16::try_from(operand).map_err(|_| EncodeError::OperandOverflow {
                    opcode: def.name,
                    operand,
                    width,
                })?;
                instruction.extend_from_slice(&value.to_be_bytes());
            }
            _ => {
                let value = u8::try_from(operand).map_err(|_| EncodeError::OperandOverflow {
                    opcode: def.name,
                    operand,
                    width,
                })?;
                instruction.push(value);
            }
        }
    }

    Ok(instruction)
}

/// Decode the operands that follow an opcode.
///
/// `bytes` starts immediately after the opcode byte. Returns the operand
/// values and the number of operand bytes consumed.
pub fn read_operands(def: &Definition, bytes: &[u8]) -> Result<(Vec<usize>, usize), EncodeError> {
    let mut operands = Vec::with_capacity(def.operand_widths.len());
    let mut offset = 0;

    for &width in def.operand_widths {
        let value = match width {
            2 => read_u16(bytes, offset)? as usize,
            _ => read_u8(bytes, offset)? as usize,
        };
        operands.push(value);
        offset += width;
    }

    Ok((operands, offset))
}

/// One decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decoded {
    /// The opcode
    pub opcode: OpCode,
    /// Operand values
    pub operands: Vec<usize>,
    /// Bytes consumed including the opcode byte
    pub width: usize,
}

/// Decode the instruction starting at `offset`.
pub fn decode(instructions: &[u8], offset: usize) -> Result<Decoded, EncodeError> {
    let byte = *instructions
        .get(offset)
        .ok_or(EncodeError::Truncated(offset))?;
    let opcode = OpCode::try_from(byte)?;
    let (operands, read) = read_operands(&opcode.definition(), &instructions[offset + 1..])
        .map_err(|_| EncodeError::Truncated(offset))?;
    Ok(Decoded {
        opcode,
        operands,
        width: 1 + read,
    })
}

/// Read a big-endian `u16` at `offset`.
pub fn read_u16(bytes: &[u8], offset: usize) -> Result<u16, EncodeError> {
    match bytes.get(offset..offset + 2) {
        Some(&[hi, lo]) => Ok(u16::from_be_bytes([hi, lo])),
        _ => Err(EncodeError::Truncated(offset)),
    }
}

/// Read a `u8` at `offset`.
pub fn read_u8(bytes: &[u8], offset: usize) -> Result<u8, EncodeError> {
    bytes
        .get(offset)
        .copied()
        .ok_or(EncodeError::Truncated(offset))
}

// ============================================================================
// Instruction streams
// ============================================================================

/// An encoded instruction stream.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Instructions(Vec<u8>);

impl Instructions {
    /// Creates an empty stream.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an encoded instruction and returns its starting offset.
    pub fn push(&mut self, instruction: &[u8]) -> usize {
        let position = self.0.len();
        self.0.extend_from_slice(instruction);
        position
    }

    /// Overwrites bytes starting at `position` in place.
    pub fn replace(&mut self, position: usize, instruction: &[u8]) {
        self.0[position..position + instruction.len()].copy_from_slice(instruction);
    }

    /// Drops everything from `position` onward.
    pub fn truncate(&mut self, position: usize) {
        self.0.truncate(position);
    }
}

impl Deref for Instructions {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Instructions {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl FromIterator<Vec<u8>> for Instructions {
    fn from_iter<I: IntoIterator<Item = Vec<u8>>>(iter: I) -> Self {
        Self(iter.into_iter().flatten().collect())
    }
}

impl fmt::Display for Instructions {
    /// Disassembles as `NNNN OpName operand...` lines.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut offset = 0;
        while offset < self.0.len() {
            match decode(&self.0, offset) {
                Ok(decoded) => {
                    write!(f, "{:04} {}", offset, decoded.opcode.definition().name)?;
                    for operand in &decoded.operands {
                        write!(f, " {}", operand)?;
                    }
                    writeln!(f)?;
                    offset += decoded.width;
                }
                Err(err) => {
                    writeln!(f, "ERROR: {}", err)?;
                    offset += 1;
                }
            }
        }
        Ok(())
    }
}
