// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Field-level versioning.
//!
//! Authors describe an object once, tagging each field with the version it
//! was added in (and optionally removed in). Expansion produces one struct
//! per version, which is what the registry stores.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::definition::ObjectDef;
use crate::error::{Result, SchemaError};
use crate::types::{Field, TypeNode};

/// Versions a field is live in: `added <= v < removed`.
///
/// Version numbers are 1-based; version `n` is stored at index `n - 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldVersion {
    #[serde(default = "first_version")]
    pub added: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub removed: Option<u16>,
}

fn first_version() -> u16 {
    1
}

impl Default for FieldVersion {
    fn default() -> Self {
        Self {
            added: 1,
            removed: None,
        }
    }
}

impl FieldVersion {
    pub fn added(added: u16) -> Self {
        Self {
            added,
            removed: None,
        }
    }

    pub fn range(added: u16, removed: u16) -> Self {
        Self {
            added,
            removed: Some(removed),
        }
    }

    pub fn is_live(&self, version: u16) -> bool {
        self.added <= version && self.removed.map_or(true, |r| version < r)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedField {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: TypeNode,
    #[serde(flatten)]
    pub version: FieldVersion,
}

/// Struct-shaped object whose fields carry version ranges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedObject {
    pub name: String,
    pub fields: Vec<VersionedField>,
}

impl VersionedObject {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Field present since version 1.
    pub fn field(self, name: impl Into<String>, ty: TypeNode) -> Self {
        self.field_in(name, ty, FieldVersion::default())
    }

    pub fn field_in(
        mut self,
        name: impl Into<String>,
        ty: TypeNode,
        version: FieldVersion,
    ) -> Self {
        self.fields.push(VersionedField {
            name: name.into(),
            ty,
            version,
        });
        self
    }

    /// Highest version number mentioned by any field (at least 1).
    pub fn max_version(&self) -> u16 {
        self.fields
            .iter()
            .map(|f| f.version.removed.unwrap_or(0).max(f.version.added))
            .max()
            .unwrap_or(1)
            .max(1)
    }

    /// Expand into one struct per version `1..=max_version()`.
    pub fn into_object_def(self) -> Result<ObjectDef> {
        for field in &self.fields {
            let v = field.version;
            if v.added == 0 || v.removed.is_some_and(|r| r <= v.added) {
                return Err(SchemaError::InvalidVersionRange {
                    field: field.name.clone(),
                    added: v.added,
                    removed: v.removed,
                });
            }
        }

        let max = self.max_version();
        let mut def = ObjectDef::new(self.name.clone());
        for version in 1..=max {
            let mut seen = HashSet::new();
            let mut fields = Vec::new();
            for field in self.fields.iter().filter(|f| f.version.is_live(version)) {
                if !seen.insert(field.name.as_str()) {
                    return Err(SchemaError::DuplicateName {
                        context: format!("{} v{}", self.name, version),
                        name: field.name.clone(),
                    });
                }
                fields.push(Field::new(field.name.clone(), field.ty.clone()));
            }
            def.versions.push(TypeNode::Struct { fields });
        }
        log::trace!("[SCHEMA] expanded {} into {} versions", self.name, max);
        Ok(def)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(ty: &TypeNode) -> Vec<&str> {
        ty.fields()
            .unwrap()
            .iter()
            .map(|f| f.name.as_str())
            .collect()
    }

    #[test]
    fn test_expansion() {
        let def = VersionedObject::new("Button")
            .field("label", TypeNode::string())
            .field_in("icon", TypeNode::u32(), FieldVersion::added(2))
            .field_in("legacy", TypeNode::Bool, FieldVersion::range(1, 3))
            .into_object_def()
            .expect("expand");

        assert_eq!(def.versions.len(), 3);
        assert_eq!(names(&def.versions[0]), ["label", "legacy"]);
        assert_eq!(names(&def.versions[1]), ["label", "icon", "legacy"]);
        assert_eq!(names(&def.versions[2]), ["label", "icon"]);
    }

    #[test]
    fn test_retyped_field() {
        let def = VersionedObject::new("Size")
            .field_in("w", TypeNode::u16(), FieldVersion::range(1, 2))
            .field_in("w", TypeNode::u32(), FieldVersion::added(2))
            .into_object_def()
            .expect("expand");
        assert_eq!(def.versions[0].fields().unwrap()[0].ty, TypeNode::u16());
        assert_eq!(def.versions[1].fields().unwrap()[0].ty, TypeNode::u32());
    }

    #[test]
    fn test_invalid_ranges() {
        let err = VersionedObject::new("X")
            .field_in("a", TypeNode::u8(), FieldVersion::range(2, 2))
            .into_object_def()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidVersionRange { .. }));

        let err = VersionedObject::new("X")
            .field_in("a", TypeNode::u8(), FieldVersion::added(0))
            .into_object_def()
            .unwrap_err();
        assert!(matches!(err, SchemaError::InvalidVersionRange { .. }));

        let err = VersionedObject::new("X")
            .field("a", TypeNode::u8())
            .field_in("a", TypeNode::u16(), FieldVersion::added(2))
            .into_object_def()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateName { .. }));
    }

    #[test]
    fn test_empty_object_has_one_version() {
        let def = VersionedObject::new("Empty").into_object_def().unwrap();
        assert_eq!(def.versions, vec![TypeNode::Struct { fields: vec![] }]);
    }
}
