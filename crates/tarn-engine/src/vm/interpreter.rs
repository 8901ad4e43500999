// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! The bytecode interpreter.

use std::rc::Rc;

use tracing::{debug, trace};

use super::comparison::values_equal;
use super::frame::Frame;
use super::globals::Globals;
use crate::builtins::{self, Builtin};
use crate::compiler::bytecode::{Bytecode, OpCode, read_u8, read_u16};
use crate::config::EngineConfig;
use crate::error::RuntimeError;
use crate::runtime::function::{Closure, CompiledFunction};
use crate::runtime::object::{HashObject, StructObject};
use crate::runtime::value::Value;

/// The virtual machine.
///
/// A VM executes one bytecode unit. The operand stack, frame stack and
/// global store are allocated up front at the sizes given by the
/// [`EngineConfig`]; exceeding either stack is an error.
pub struct VM {
    constants: Vec<Value>,
    stack: Vec<Value>,
    /// Next free slot. `stack[sp]` holds the most recently popped value.
    sp: usize,
    globals: Globals,
    frames: Vec<Frame>,
    max_frames: usize,
}

impl VM {
    /// Creates a VM with the default configuration and a fresh global store.
    pub fn new(bytecode: Bytecode) -> Self {
        Self::with_config(bytecode, &EngineConfig::default())
    }

    /// Creates a VM with a fresh global store sized by `config`.
    pub fn with_config(bytecode: Bytecode, config: &EngineConfig) -> Self {
        let globals = Globals::new(config.globals_size);
        Self::with_globals(bytecode, globals, config)
    }

    /// Creates a VM that reads and writes an existing global store.
    pub fn with_globals(bytecode: Bytecode, globals: Globals, config: &EngineConfig) -> Self {
        let main = Rc::new(Closure::new(
            Rc::new(CompiledFunction::main(bytecode.instructions)),
            Vec::new(),
        ));

        let mut frames = Vec::with_capacity(config.max_frames);
        frames.push(Frame::new(main, 0));

        Self {
            constants: bytecode.constants,
            stack: vec![Value::Null; config.stack_size],
            sp: 0,
            globals,
            frames,
            max_frames: config.max_frames,
        }
    }

    /// Releases the global store for the next unit.
    pub fn into_globals(self) -> Globals {
        self.globals
    }

    /// The value left by the last pop; the result of a top-level
    /// expression statement.
    pub fn last_popped_stack_elem(&self) -> Value {
        self.stack.get(self.sp).cloned().unwrap_or(Value::Null)
    }

    /// Runs until the top-level frame reaches the end of its instructions.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        debug!(
            bytes = self.frames.first().map_or(0, |frame| frame.instructions().len()),
            constants = self.constants.len(),
            "running bytecode"
        );

        loop {
            let Some(frame) = self.frames.last_mut() else {
                break;
            };
            let instructions = &frame.closure.function.instructions;
            if frame.ip >= instructions.len() {
                break;
            }

            let opcode = OpCode::try_from(instructions[frame.ip])?;
            frame.ip += 1;

            match opcode {
                OpCode::Constant => {
                    let index = self.read_u16_operand()?;
                    let value = self.constant(opcode, index)?.clone();
                    self.push(value)?;
                }
                OpCode::True => self.push(Value::Boolean(true))?,
                OpCode::False => self.push(Value::Boolean(false))?,
                OpCode::Null => self.push(Value::Null)?,

                OpCode::Add | OpCode::Sub | OpCode::Mul | OpCode::Div => {
                    self.execute_binary_operation(opcode)?;
                }
                OpCode::Equal | OpCode::NotEqual => {
                    let right = self.pop()?;
                    let left = self.pop()?;
                    let equal = values_equal(&left, &right);
                    self.push(Value::Boolean(equal == (opcode == OpCode::Equal)))?;
                }
                OpCode::GreaterThan | OpCode::GreaterThanOrEqual => {
                    self.execute_comparison(opcode)?;
                }
                OpCode::And | OpCode::Or => self.execute_logical_operation(opcode)?,
                OpCode::Minus => {
                    let operand = self.pop()?;
                    let result = match operand {
                        Value::Integer(n) => Value::Integer(n.wrapping_neg()),
                        Value::Float(n) => Value::Float(-n),
                        other => {
                            return Err(RuntimeError::UnsupportedOperand {
                                op: "-",
                                operand: other.type_name(),
                            });
                        }
                    };
                    self.push(result)?;
                }
                OpCode::Bang => {
                    let operand = self.pop()?;
                    self.push(Value::Boolean(!operand.is_truthy()))?;
                }

                OpCode::Jump => {
                    let target = self.read_u16_operand()?;
                    self.frame_mut().ip = target;
                }
                OpCode::JumpNotTruthy => {
                    let target = self.read_u16_operand()?;
                    let condition = self.pop()?;
                    if !condition.is_truthy() {
                        self.frame_mut().ip = target;
                    }
                }

                OpCode::SetGlobal | OpCode::SetConstGlobal => {
                    let index = self.read_u16_operand()?;
                    let value = self.pop()?;
                    self.globals.set(index, value)?;
                }
                OpCode::GetGlobal | OpCode::GetConstGlobal => {
                    let index = self.read_u16_operand()?;
                    let value = self.globals.get(index)?;
                    self.push(value)?;
                }
                OpCode::SetLocal | OpCode::SetConstLocal => {
                    let index = self.read_u8_operand()?;
                    let slot = self.frame().base_pointer + index;
                    let value = self.pop()?;
                    self.stack[slot] = value;
                }
                OpCode::GetLocal | OpCode::GetConstLocal => {
                    let index = self.read_u8_operand()?;
                    let slot = self.frame().base_pointer + index;
                    let value = self.stack[slot].clone();
                    self.push(value)?;
                }
                OpCode::GetFree => {
                    let index = self.read_u8_operand()?;
                    let value = self
                        .frame()
                        .closure
                        .free
                        .get(index)
                        .cloned()
                        .ok_or_else(|| invalid_operand(opcode, index))?;
                    self.push(value)?;
                }
                OpCode::GetBuiltin => {
                    let index = self.read_u8_operand()?;
                    let builtin = builtins::get(index).ok_or_else(|| invalid_operand(opcode, index))?;
                    self.push(Value::Builtin(builtin))?;
                }
                OpCode::CurrentClosure => {
                    let closure = Rc::clone(&self.frame().closure);
                    self.push(Value::Closure(closure))?;
                }

                OpCode::Array => {
                    let count = self.read_u16_operand()?;
                    let elements = self.take_top(count)?;
                    self.push(Value::array(elements))?;
                }
                OpCode::Hash => {
                    let count = self.read_u16_operand()?;
                    let hash = self.build_hash(count)?;
                    self.push(Value::hash(hash))?;
                }
                OpCode::Index => {
                    let index = self.pop()?;
                    let left = self.pop()?;
                    let value = execute_index(&left, &index)?;
                    self.push(value)?;
                }
                OpCode::SetIndex => {
                    let value = self.pop()?;
                    let index = self.pop()?;
                    let left = self.pop()?;
                    execute_set_index(&left, &index, value)?;
                }

                OpCode::Call => {
                    let argc = self.read_u8_operand()?;
                    self.execute_call(argc)?;
                }
                OpCode::ReturnValue => {
                    let value = self.pop()?;
                    self.return_from_frame(value)?;
                }
                OpCode::Return => self.return_from_frame(Value::Null)?,

                OpCode::Closure => {
                    let index = self.read_u16_operand()?;
                    let count = self.read_u8_operand()?;
                    self.push_closure(index, count)?;
                }
                OpCode::Struct => {
                    let index = self.read_u16_operand()?;
                    let count = self.read_u8_operand()?;
                    let ty = match self.constant(opcode, index)? {
                        Value::StructType(ty) => Rc::clone(ty),
                        _ => return Err(invalid_operand(opcode, index)),
                    };
                    let fields = self.take_top(count)?;
                    self.push(Value::structure(StructObject { ty, fields }))?;
                }
                OpCode::GetField => {
                    let index = self.read_u8_operand()?;
                    let object = self.pop()?;
                    let value = match &object {
                        Value::Struct(object) => object
                            .borrow()
                            .fields
                            .get(index)
                            .cloned()
                            .ok_or_else(|| invalid_operand(opcode, index))?,
                        other => return Err(RuntimeError::NotAStruct(other.type_name())),
                    };
                    self.push(value)?;
                }
                OpCode::SetField => {
                    let index = self.read_u8_operand()?;
                    let value = self.pop()?;
                    let object = self.pop()?;
                    match &object {
                        Value::Struct(object) => {
                            let mut object = object.borrow_mut();
                            let slot = object
                                .fields
                                .get_mut(index)
                                .ok_or_else(|| invalid_operand(opcode, index))?;
                            *slot = value;
                        }
                        other => return Err(RuntimeError::NotAStruct(other.type_name())),
                    }
                }

                OpCode::Pop => {
                    self.pop()?;
                }
            }
        }

        debug!(sp = self.sp, "bytecode finished");
        Ok(())
    }

    // ========================================================================
    // Frames and operands
    // ========================================================================

    fn frame(&self) -> &Frame {
        &self.frames[self.frames.len() - 1]
    }

    fn frame_mut(&mut self) -> &mut Frame {
        let top = self.frames.len() - 1;
        &mut self.frames[top]
    }

    fn read_u16_operand(&mut self) -> Result<usize, RuntimeError> {
        let frame = self.frame_mut();
        let value = read_u16(frame.instructions(), frame.ip)?;
        frame.ip += 2;
        Ok(value as usize)
    }

    fn read_u8_operand(&mut self) -> Result<usize, RuntimeError> {
        let frame = self.frame_mut();
        let value = read_u8(frame.instructions(), frame.ip)?;
        frame.ip += 1;
        Ok(value as usize)
    }

    fn constant(&self, opcode: OpCode, index: usize) -> Result<&Value, RuntimeError> {
        self.constants
            .get(index)
            .ok_or_else(|| invalid_operand(opcode, index))
    }

    // ========================================================================
    // Stack
    // ========================================================================

    fn push(&mut self, value: Value) -> Result<(), RuntimeError> {
        let slot = self
            .stack
            .get_mut(self.sp)
            .ok_or(RuntimeError::StackOverflow)?;
        *slot = value;
        self.sp += 1;
        Ok(())
    }

    fn pop(&mut self) -> Result<Value, RuntimeError> {
        if self.sp == 0 {
            return Err(RuntimeError::StackUnderflow);
        }
        self.sp -= 1;
        Ok(self.stack[self.sp].clone())
    }

    /// Removes the top `count` values, returned bottom-first.
    fn take_top(&mut self, count: usize) -> Result<Vec<Value>, RuntimeError> {
        let start = self
            .sp
            .checked_sub(count)
            .ok_or(RuntimeError::StackUnderflow)?;
        let values = self.stack[start..self.sp].to_vec();
        self.sp = start;
        Ok(values)
    }

    // ========================================================================
    // Operators
    // ========================================================================

    fn execute_binary_operation(&mut self, opcode: OpCode) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;

        let result = match (&left, &right) {
            (Value::Integer(l), Value::Integer(r)) => Value::Integer(integer_op(opcode, *l, *r)?),
            (Value::Float(l), Value::Float(r)) => Value::Float(float_op(opcode, *l, *r)),
            (Value::Str(l), Value::Str(r)) if opcode == OpCode::Add => {
                let mut joined = String::with_capacity(l.len() + r.len());
                joined.push_str(l);
                joined.push_str(r);
                Value::Str(Rc::from(joined))
            }
            _ => {
                return Err(RuntimeError::UnsupportedOperands {
                    op: operator_symbol(opcode),
                    left: left.type_name(),
                    right: right.type_name(),
                });
            }
        };

        self.push(result)
    }

    fn execute_comparison(&mut self, opcode: OpCode) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;
        let or_equal = opcode == OpCode::GreaterThanOrEqual;

        let result = match (&left, &right) {
            (Value::Integer(l), Value::Integer(r)) => if or_equal { l >= r } else { l > r },
            (Value::Float(l), Value::Float(r)) => if or_equal { l >= r } else { l > r },
            _ => {
                return Err(RuntimeError::UnsupportedOperands {
                    op: operator_symbol(opcode),
                    left: left.type_name(),
                    right: right.type_name(),
                });
            }
        };

        self.push(Value::Boolean(result))
    }

    fn execute_logical_operation(&mut self, opcode: OpCode) -> Result<(), RuntimeError> {
        let right = self.pop()?;
        let left = self.pop()?;

        match (&left, &right) {
            (Value::Boolean(l), Value::Boolean(r)) => {
                let result = if opcode == OpCode::And { *l && *r } else { *l || *r };
                self.push(Value::Boolean(result))
            }
            _ => Err(RuntimeError::UnsupportedOperands {
                op: operator_symbol(opcode),
                left: left.type_name(),
                right: right.type_name(),
            }),
        }
    }

    fn build_hash(&mut self, count: usize) -> Result<HashObject, RuntimeError> {
        let values = self.take_top(count)?;
        let mut hash = HashObject::new();
        for pair in values.chunks(2) {
            if let [key, value] = pair {
                let hash_key = key
                    .hash_key()
                    .ok_or(RuntimeError::UnhashableKey(key.type_name()))?;
                hash.insert(hash_key, key.clone(), value.clone());
            }
        }
        Ok(hash)
    }

    // ========================================================================
    // Calls
    // ========================================================================

    fn execute_call(&mut self, argc: usize) -> Result<(), RuntimeError> {
        let callee_slot = self
            .sp
            .checked_sub(argc + 1)
            .ok_or(RuntimeError::StackUnderflow)?;

        match self.stack[callee_slot].clone() {
            Value::Closure(closure) => self.call_closure(closure, argc),
            Value::Builtin(builtin) => self.call_builtin(builtin, argc),
            other => Err(RuntimeError::NotCallable(other.type_name())),
        }
    }

    fn call_closure(&mut self, closure: Rc<Closure>, argc: usize) -> Result<(), RuntimeError> {
        let function = &closure.function;
        if argc != function.num_parameters {
            return Err(RuntimeError::WrongArgumentCount {
                expected: function.num_parameters,
                actual: argc,
            });
        }
        if self.frames.len() >= self.max_frames {
            return Err(RuntimeError::FrameOverflow(self.max_frames));
        }

        let base_pointer = self.sp - argc;
        let sp = base_pointer + function.num_locals;
        if sp > self.stack.len() {
            return Err(RuntimeError::StackOverflow);
        }

        trace!(
            function = function.name.as_deref().unwrap_or("<anonymous>"),
            argc,
            depth = self.frames.len(),
            "call"
        );

        // Locals past the arguments start as null, not as whatever an
        // earlier call left in those slots.
        self.stack[self.sp..sp].fill(Value::Null);
        self.frames.push(Frame::new(closure, base_pointer));
        self.sp = sp;
        Ok(())
    }

    fn call_builtin(&mut self, builtin: &'static Builtin, argc: usize) -> Result<(), RuntimeError> {
        let args = &self.stack[self.sp - argc..self.sp];
        let result = (builtin.func)(args).map_err(|message| RuntimeError::Builtin {
            name: builtin.name,
            message,
        })?;

        trace!(builtin = builtin.name, argc, "builtin call");

        self.sp -= argc + 1;
        self.push(result.unwrap_or(Value::Null))
    }

    fn return_from_frame(&mut self, value: Value) -> Result<(), RuntimeError> {
        if let Some(frame) = self.frames.pop() {
            self.sp = frame.base_pointer.saturating_sub(1);
        }
        self.push(value)
    }

    fn push_closure(&mut self, index: usize, count: usize) -> Result<(), RuntimeError> {
        let function = match self.constant(OpCode::Closure, index)? {
            Value::CompiledFunction(function) => Rc::clone(function),
            other => return Err(RuntimeError::NotAFunction(other.type_name())),
        };
        let free = self.take_top(count)?;

        trace!(
            function = function.name.as_deref().unwrap_or("<anonymous>"),
            captured = free.len(),
            "closure"
        );

        self.push(Value::Closure(Rc::new(Closure::new(function, free))))
    }
}

fn invalid_operand(opcode: OpCode, operand: usize) -> RuntimeError {
    RuntimeError::InvalidOperand {
        opcode: opcode.definition().name,
        operand,
    }
}

fn operator_symbol(opcode: OpCode) -> &'static str {
    match opcode {
        OpCode::Add => "+",
        OpCode::Sub => "-",
        OpCode::Mul => "*",
        OpCode::Div => "/",
        OpCode::GreaterThan => ">",
        OpCode::GreaterThanOrEqual => ">=",
        OpCode::And => "&&",
        OpCode::Or => "||",
        other => other.definition().name,
    }
}

/// Integer arithmetic wraps on overflow.
fn integer_op(opcode: OpCode, left: i64, right: i64) -> Result<i64, RuntimeError> {
    Ok(match opcode {
        OpCode::Add => left.wrapping_add(right),
        OpCode::Sub => left.wrapping_sub(right),
        OpCode::Mul => left.wrapping_mul(right),
        _ => {
            if right == 0 {
                return Err(RuntimeError::DivisionByZero);
            }
            left.wrapping_div(right)
        }
    })
}

fn float_op(opcode: OpCode, left: f64, right: f64) -> f64 {
    match opcode {
        OpCode::Add => left + right,
        OpCode::Sub => left - right,
        OpCode::Mul => left * right,
        _ => left / right,
    }
}

/// Out-of-range array reads yield null rather than an error.
fn execute_index(left: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match (left, index) {
        (Value::Array(elements), Value::Integer(i)) => {
            let elements = elements.borrow();
            let value = usize::try_from(*i)
                .ok()
                .and_then(|i| elements.get(i).cloned())
                .unwrap_or(Value::Null);
            Ok(value)
        }
        (Value::Hash(hash), key) => {
            let hash_key = key
                .hash_key()
                .ok_or(RuntimeError::UnhashableKey(key.type_name()))?;
            Ok(hash.borrow().get(&hash_key).cloned().unwrap_or(Value::Null))
        }
        _ => Err(RuntimeError::IndexNotSupported {
            left: left.type_name(),
            index: index.type_name(),
        }),
    }
}

/// Array writes accept `0..=len`; writing at `len` appends. Hash writes upsert.
fn execute_set_index(left: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    match (left, index) {
        (Value::Array(elements), Value::Integer(i)) => {
            let mut elements = elements.borrow_mut();
            let len = elements.len();
            match usize::try_from(*i) {
                Ok(slot) if slot < len => elements[slot] = value,
                Ok(slot) if slot == len => elements.push(value),
                _ => return Err(RuntimeError::IndexOutOfBounds { index: *i, len }),
            }
            Ok(())
        }
        (Value::Hash(hash), key) => {
            let hash_key = key
                .hash_key()
                .ok_or(RuntimeError::UnhashableKey(key.type_name()))?;
            hash.borrow_mut().insert(hash_key, key.clone(), value);
            Ok(())
        }
        _ => Err(RuntimeError::IndexNotSupported {
            left: left.type_name(),
            index: index.type_name(),
        }),
    }
}
