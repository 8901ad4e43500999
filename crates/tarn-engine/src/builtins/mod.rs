// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Host builtin functions.
//!
//! Builtins live at fixed indices shared by the compiler (which registers
//! them in the global symbol table) and the VM (which resolves
//! `OpGetBuiltin` against [`BUILTINS`]).

use crate::runtime::value::Value;

/// Signature of a host builtin. `Ok(None)` pushes null.
pub type BuiltinFn = fn(&[Value]) -> Result<Option<Value>, String>;

/// A named host function.
#[derive(Debug)]
pub struct Builtin {
    /// Name the function is bound to
    pub name: &'static str,
    /// Host implementation
    pub func: BuiltinFn,
}

/// Builtins in index order.
pub static BUILTINS: &[Builtin] = &[
    Builtin { name: "len", func: builtin_len },
    Builtin { name: "puts", func: builtin_puts },
    Builtin { name: "first", func: builtin_first },
    Builtin { name: "last", func: builtin_last },
    Builtin { name: "rest", func: builtin_rest },
    Builtin { name: "push", func: builtin_push },
];

/// Looks up a builtin by index.
pub fn get(index: usize) -> Option<&'static Builtin> {
    BUILTINS.get(index)
}

fn expect_args(args: &[Value], want: usize) -> Result<(), String> {
    if args.len() != want {
        return Err(format!(
            "wrong number of arguments. got={}, want={}",
            args.len(),
            want
        ));
    }
    Ok(())
}

fn array_arg<'a>(args: &'a [Value], name: &str) -> Result<&'a Value, String> {
    match &args[0] {
        array @ Value::Array(_) => Ok(array),
        other => Err(format!(
            "argument to `{}` must be array, got {}",
            name,
            other.type_name()
        )),
    }
}

/// len(x) - length of an array, string or hash
fn builtin_len(args: &[Value]) -> Result<Option<Value>, String> {
    expect_args(args, 1)?;
    let len = match &args[0] {
        Value::Str(s) => s.chars().count(),
        Value::Array(elements) => elements.borrow().len(),
        Value::Hash(hash) => hash.borrow().len(),
        other => {
            return Err(format!(
                "argument to `len` not supported, got {}",
                other.type_name()
            ));
        }
    };
    Ok(Some(Value::Integer(len as i64)))
}

/// puts(...) - prints each argument on its own line
fn builtin_puts(args: &[Value]) -> Result<Option<Value>, String> {
    for arg in args {
        println!("{}", arg);
    }
    Ok(None)
}

/// first(array)
fn builtin_first(args: &[Value]) -> Result<Option<Value>, String> {
    expect_args(args, 1)?;
    match array_arg(args, "first")? {
        Value::Array(elements) => Ok(elements.borrow().first().cloned()),
        _ => Ok(None),
    }
}

/// last(array)
fn builtin_last(args: &[Value]) -> Result<Option<Value>, String> {
    expect_args(args, 1)?;
    match array_arg(args, "last")? {
        Value::Array(elements) => Ok(elements.borrow().last().cloned()),
        _ => Ok(None),
    }
}

/// rest(array) - a new array without the first element
fn builtin_rest(args: &[Value]) -> Result<Option<Value>, String> {
    expect_args(args, 1)?;
    match array_arg(args, "rest")? {
        Value::Array(elements) => {
            let elements = elements.borrow();
            if elements.is_empty() {
                return Ok(None);
            }
            Ok(Some(Value::array(elements[1..].to_vec())))
        }
        _ => Ok(None),
    }
}

/// push(array, value) - a new array with `value` appended
fn builtin_push(args: &[Value]) -> Result<Option<Value>, String> {
    expect_args(args, 2)?;
    match array_arg(args, "push")? {
        Value::Array(elements) => {
            let mut pushed = elements.borrow().clone();
            pushed.push(args[1].clone());
            Ok(Some(Value::array(pushed)))
        }
        _ => Ok(None),
    }
}
