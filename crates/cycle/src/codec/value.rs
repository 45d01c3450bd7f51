// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Owned, schema-less values.
//!
//! A `Value` carries no field names: struct members are positional, in
//! declaration order of the type node they are encoded against.

use cycle_schema::ObjectId;

/// An owned value of any type node.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Void,
    Bool(bool),
    U8(u8),
    U16(u16),
    U32(u32),
    U64(u64),
    U128(u128),
    I8(i8),
    I16(i16),
    I32(i32),
    I64(i64),
    I128(i128),
    /// IEEE half precision, raw bits.
    F16(u16),
    F32(f32),
    F64(f64),
    /// IEEE quad precision, raw bits.
    F128(u128),
    Optional(Option<Box<Value>>),
    Array(Vec<Value>),
    List(Vec<Value>),
    Map(Vec<(Value, Value)>),
    String(String),
    Reference(ObjectId),
    Struct(Vec<Value>),
    Tuple(Vec<Value>),
    /// Variant ordinal.
    Enum(usize),
    /// Active field ordinal and its value.
    Union(usize, Box<Value>),
}

macro_rules! impl_scalar {
    ($($variant:ident($type:ty) => $getter:ident;)*) => {
        impl Value {
            $(
                pub fn $getter(&self) -> Option<$type> {
                    match self {
                        Self::$variant(v) => Some(*v),
                        _ => None,
                    }
                }
            )*
        }

        $(
            impl From<$type> for Value {
                fn from(v: $type) -> Self {
                    Self::$variant(v)
                }
            }
        )*
    };
}

impl_scalar! {
    Bool(bool) => as_bool;
    U8(u8) => as_u8;
    U16(u16) => as_u16;
    U32(u32) => as_u32;
    U64(u64) => as_u64;
    U128(u128) => as_u128;
    I8(i8) => as_i8;
    I16(i16) => as_i16;
    I32(i32) => as_i32;
    I64(i64) => as_i64;
    I128(i128) => as_i128;
    F32(f32) => as_f32;
    F64(f64) => as_f64;
    Reference(ObjectId) => as_reference;
}

impl Value {
    pub fn some(value: impl Into<Value>) -> Self {
        Self::Optional(Some(Box::new(value.into())))
    }

    pub fn none() -> Self {
        Self::Optional(None)
    }

    pub fn union(ordinal: usize, value: impl Into<Value>) -> Self {
        Self::Union(ordinal, Box::new(value.into()))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    /// Members of a struct/tuple or elements of an array/list.
    pub fn elements(&self) -> Option<&[Value]> {
        match self {
            Self::Struct(v) | Self::Tuple(v) | Self::Array(v) | Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn elements_mut(&mut self) -> Option<&mut Vec<Value>> {
        match self {
            Self::Struct(v) | Self::Tuple(v) | Self::Array(v) | Self::List(v) => Some(v),
            _ => None,
        }
    }

    pub fn entries(&self) -> Option<&[(Value, Value)]> {
        match self {
            Self::Map(entries) => Some(entries),
            _ => None,
        }
    }

    /// Short kind name, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool(_) => "bool",
            Self::U8(_) => "u8",
            Self::U16(_) => "u16",
            Self::U32(_) => "u32",
            Self::U64(_) => "u64",
            Self::U128(_) => "u128",
            Self::I8(_) => "i8",
            Self::I16(_) => "i16",
            Self::I32(_) => "i32",
            Self::I64(_) => "i64",
            Self::I128(_) => "i128",
            Self::F16(_) => "f16",
            Self::F32(_) => "f32",
            Self::F64(_) => "f64",
            Self::F128(_) => "f128",
            Self::Optional(_) => "optional",
            Self::Array(_) => "array",
            Self::List(_) => "list",
            Self::Map(_) => "map",
            Self::String(_) => "string",
            Self::Reference(_) => "reference",
            Self::Struct(_) => "struct",
            Self::Tuple(_) => "tuple",
            Self::Enum(_) => "enum",
            Self::Union(..) => "union",
        }
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        Self::Optional(v.map(|v| Box::new(v.into())))
    }
}
