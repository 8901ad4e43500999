// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Static type vocabulary shared by the checker and the compiler.

use std::fmt;
use std::rc::Rc;

/// A static Tarn type.
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// 64-bit signed integer
    Int,
    /// 64-bit float
    Float,
    /// UTF-8 string
    Str,
    /// Boolean
    Bool,
    /// The null type
    Null,
    /// Homogeneous array
    Array(Box<Type>),
    /// Hash from key type to value type
    Hash(Box<Type>, Box<Type>),
    /// Function signature
    Function(FunctionType),
    /// Declared struct type
    Struct(Rc<StructType>),
}

impl Type {
    /// Builds a function type.
    pub fn function(parameters: Vec<Type>, return_type: Option<Type>) -> Self {
        Type::Function(FunctionType {
            parameters,
            return_type: return_type.map(Box::new),
        })
    }

    /// Builds an array type.
    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    /// Builds a hash type.
    pub fn hash(key: Type, value: Type) -> Self {
        Type::Hash(Box::new(key), Box::new(value))
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Float => write!(f, "float"),
            Type::Str => write!(f, "string"),
            Type::Bool => write!(f, "bool"),
            Type::Null => write!(f, "null"),
            Type::Array(element) => write!(f, "[]{}", element),
            Type::Hash(key, value) => write!(f, "map[{}]{}", key, value),
            Type::Function(func) => write!(f, "{}", func),
            Type::Struct(st) => write!(f, "{}", st.name),
        }
    }
}

/// A function signature.
#[derive(Debug, Clone, PartialEq)]
pub struct FunctionType {
    /// Parameter types in order
    pub parameters: Vec<Type>,
    /// Return type, `None` for void
    pub return_type: Option<Box<Type>>,
}

impl fmt::Display for FunctionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "func(")?;
        for (i, param) in self.parameters.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", param)?;
        }
        write!(f, ")")?;
        if let Some(ret) = &self.return_type {
            write!(f, " -> {}", ret)?;
        }
        Ok(())
    }
}

/// A declared struct type. Field order is the storage order.
#[derive(Debug, Clone, PartialEq)]
pub struct StructType {
    /// Type name
    pub name: String,
    /// Fields in declared order
    pub fields: Vec<StructField>,
}

impl StructType {
    /// Creates a struct type from `(name, type)` pairs in declared order.
    pub fn new(name: impl Into<String>, fields: Vec<(&str, Type)>) -> Self {
        Self {
            name: name.into(),
            fields: fields
                .into_iter()
                .map(|(name, ty)| StructField {
                    name: name.to_string(),
                    ty,
                })
                .collect(),
        }
    }

    /// Positional index of a field.
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|field| field.name == name)
    }
}

/// One field of a struct type.
#[derive(Debug, Clone, PartialEq)]
pub struct StructField {
    /// Field name
    pub name: String,
    /// Field type
    pub ty: Type,
}
