// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Type nodes: the schema tree every layout, encoder and view is driven by.

use serde::{Deserialize, Serialize};

use crate::ids::TypeId;

/// Width of an integer type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntWidth {
    #[serde(rename = "8")]
    W8,
    #[serde(rename = "16")]
    W16,
    #[serde(rename = "32")]
    W32,
    #[serde(rename = "64")]
    W64,
    #[serde(rename = "128")]
    W128,
}

impl IntWidth {
    /// Size in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::W8 => 1,
            Self::W16 => 2,
            Self::W32 => 4,
            Self::W64 => 8,
            Self::W128 => 16,
        }
    }

    /// Smallest width able to hold `count` distinct ordinals.
    pub fn for_count(count: usize) -> Self {
        let max = count.saturating_sub(1) as u128;
        if max <= u128::from(u8::MAX) {
            Self::W8
        } else if max <= u128::from(u16::MAX) {
            Self::W16
        } else if max <= u128::from(u32::MAX) {
            Self::W32
        } else if max <= u128::from(u64::MAX) {
            Self::W64
        } else {
            Self::W128
        }
    }
}

/// Width of a floating-point type node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatWidth {
    #[serde(rename = "16")]
    F16,
    #[serde(rename = "32")]
    F32,
    #[serde(rename = "64")]
    F64,
    #[serde(rename = "128")]
    F128,
}

impl FloatWidth {
    /// Size in bytes.
    pub const fn bytes(self) -> usize {
        match self {
            Self::F16 => 2,
            Self::F32 => 4,
            Self::F64 => 8,
            Self::F128 => 16,
        }
    }
}

/// Reference to another object type.
///
/// `scheme == None` means the scheme that declares the reference. The
/// target id is filled in when the owning scheme is registered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scheme: Option<String>,
    pub name: String,
    #[serde(skip)]
    target: Option<TypeId>,
}

impl Reference {
    pub fn new(scheme: Option<String>, name: impl Into<String>) -> Self {
        Self {
            scheme,
            name: name.into(),
            target: None,
        }
    }

    /// Resolved object type, `None` before registration.
    pub fn target(&self) -> Option<TypeId> {
        self.target
    }

    pub(crate) fn bind(&mut self, target: TypeId) {
        self.target = Some(target);
    }
}

/// Named member of a struct or union.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeNode,
}

impl Field {
    pub fn new(name: impl Into<String>, ty: TypeNode) -> Self {
        Self {
            name: name.into(),
            ty,
        }
    }
}

/// One node of a schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TypeNode {
    Void,
    Bool,
    Int {
        signed: bool,
        width: IntWidth,
    },
    Float {
        width: FloatWidth,
    },
    Optional {
        child: Box<TypeNode>,
    },
    Array {
        child: Box<TypeNode>,
        len: usize,
    },
    List {
        child: Box<TypeNode>,
    },
    Map {
        key: Box<TypeNode>,
        value: Box<TypeNode>,
    },
    String,
    Reference(Reference),
    Struct {
        fields: Vec<Field>,
    },
    Tuple {
        fields: Vec<TypeNode>,
    },
    Enum {
        variants: Vec<String>,
    },
    Union {
        fields: Vec<Field>,
        #[serde(default = "default_tagged")]
        tagged: bool,
    },
}

fn default_tagged() -> bool {
    true
}

macro_rules! int_ctor {
    ($($name:ident => $signed:expr, $width:ident;)*) => {
        $(
            pub const fn $name() -> Self {
                Self::Int { signed: $signed, width: IntWidth::$width }
            }
        )*
    };
}

impl TypeNode {
    int_ctor! {
        u8 => false, W8;
        u16 => false, W16;
        u32 => false, W32;
        u64 => false, W64;
        u128 => false, W128;
        i8 => true, W8;
        i16 => true, W16;
        i32 => true, W32;
        i64 => true, W64;
        i128 => true, W128;
    }

    pub const fn f16() -> Self {
        Self::Float {
            width: FloatWidth::F16,
        }
    }

    pub const fn f32() -> Self {
        Self::Float {
            width: FloatWidth::F32,
        }
    }

    pub const fn f64() -> Self {
        Self::Float {
            width: FloatWidth::F64,
        }
    }

    pub const fn f128() -> Self {
        Self::Float {
            width: FloatWidth::F128,
        }
    }

    pub const fn string() -> Self {
        Self::String
    }

    pub fn optional(child: TypeNode) -> Self {
        Self::Optional {
            child: Box::new(child),
        }
    }

    pub fn array(child: TypeNode, len: usize) -> Self {
        Self::Array {
            child: Box::new(child),
            len,
        }
    }

    pub fn list(child: TypeNode) -> Self {
        Self::List {
            child: Box::new(child),
        }
    }

    pub fn map(key: TypeNode, value: TypeNode) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
        }
    }

    /// Reference to an object type of the declaring scheme.
    pub fn reference(name: impl Into<String>) -> Self {
        Self::Reference(Reference::new(None, name))
    }

    /// Reference to an object type of another scheme.
    pub fn scheme_reference(scheme: impl Into<String>, name: impl Into<String>) -> Self {
        Self::Reference(Reference::new(Some(scheme.into()), name))
    }

    /// Struct from `(name, type)` pairs in declaration order.
    pub fn structure<N: Into<String>>(fields: impl IntoIterator<Item = (N, TypeNode)>) -> Self {
        Self::Struct {
            fields: fields
                .into_iter()
                .map(|(name, ty)| Field::new(name, ty))
                .collect(),
        }
    }

    pub fn tuple(fields: impl IntoIterator<Item = TypeNode>) -> Self {
        Self::Tuple {
            fields: fields.into_iter().collect(),
        }
    }

    pub fn enumeration<N: Into<String>>(variants: impl IntoIterator<Item = N>) -> Self {
        Self::Enum {
            variants: variants.into_iter().map(Into::into).collect(),
        }
    }

    /// Tagged union from `(name, type)` pairs.
    pub fn union<N: Into<String>>(fields: impl IntoIterator<Item = (N, TypeNode)>) -> Self {
        Self::Union {
            fields: fields
                .into_iter()
                .map(|(name, ty)| Field::new(name, ty))
                .collect(),
            tagged: true,
        }
    }

    /// Union without a stored discriminant.
    pub fn untagged_union<N: Into<String>>(
        fields: impl IntoIterator<Item = (N, TypeNode)>,
    ) -> Self {
        Self::Union {
            fields: fields
                .into_iter()
                .map(|(name, ty)| Field::new(name, ty))
                .collect(),
            tagged: false,
        }
    }

    /// Short kind name, used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool => "bool",
            Self::Int { signed: true, .. } => "int",
            Self::Int { signed: false, .. } => "uint",
            Self::Float { .. } => "float",
            Self::Optional { .. } => "optional",
            Self::Array { .. } => "array",
            Self::List { .. } => "list",
            Self::Map { .. } => "map",
            Self::String => "string",
            Self::Reference(_) => "reference",
            Self::Struct { .. } => "struct",
            Self::Tuple { .. } => "tuple",
            Self::Enum { .. } => "enum",
            Self::Union { .. } => "union",
        }
    }

    /// Fields if this is a struct or union.
    pub fn fields(&self) -> Option<&[Field]> {
        match self {
            Self::Struct { fields } | Self::Union { fields, .. } => Some(fields),
            _ => None,
        }
    }

    /// Field position by name (struct or union).
    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields()?.iter().position(|f| f.name == name)
    }

    /// Direct children, in declaration order.
    pub fn children(&self) -> Vec<&TypeNode> {
        match self {
            Self::Optional { child } | Self::Array { child, .. } | Self::List { child } => {
                vec![child.as_ref()]
            }
            Self::Map { key, value } => vec![key.as_ref(), value.as_ref()],
            Self::Struct { fields } | Self::Union { fields, .. } => {
                fields.iter().map(|f| &f.ty).collect()
            }
            Self::Tuple { fields } => fields.iter().collect(),
            _ => Vec::new(),
        }
    }

    /// Visit every reference in this tree, mutably.
    pub(crate) fn visit_references_mut<E>(
        &mut self,
        f: &mut impl FnMut(&mut Reference) -> Result<(), E>,
    ) -> Result<(), E> {
        match self {
            Self::Reference(r) => f(r),
            Self::Optional { child } | Self::Array { child, .. } | Self::List { child } => {
                child.visit_references_mut(f)
            }
            Self::Map { key, value } => {
                key.visit_references_mut(f)?;
                value.visit_references_mut(f)
            }
            Self::Struct { fields } | Self::Union { fields, .. } => {
                for field in fields {
                    field.ty.visit_references_mut(f)?;
                }
                Ok(())
            }
            Self::Tuple { fields } => {
                for ty in fields {
                    ty.visit_references_mut(f)?;
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// True when no reference in this tree is left unresolved.
    pub fn is_resolved(&self) -> bool {
        match self {
            Self::Reference(r) => r.target.is_some(),
            other => other.children().into_iter().all(TypeNode::is_resolved),
        }
    }
}
