// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scheme and object definitions, as authored (before registration).

use serde::{Deserialize, Serialize};

use crate::types::TypeNode;

/// Named collection of object types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemeDef {
    pub name: String,
    #[serde(default)]
    pub objects: Vec<ObjectDef>,
}

impl SchemeDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
        }
    }

    /// Append an object definition.
    pub fn object(mut self, object: ObjectDef) -> Self {
        self.objects.push(object);
        self
    }

    pub fn find(&self, name: &str) -> Option<&ObjectDef> {
        self.objects.iter().find(|o| o.name == name)
    }
}

/// Object type with its append-only version history (index 0 is oldest).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectDef {
    pub name: String,
    pub versions: Vec<TypeNode>,
}

impl ObjectDef {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            versions: Vec::new(),
        }
    }

    /// Single-version object.
    pub fn single(name: impl Into<String>, ty: TypeNode) -> Self {
        Self::new(name).version(ty)
    }

    /// Append the next version.
    pub fn version(mut self, ty: TypeNode) -> Self {
        self.versions.push(ty);
        self
    }
}
