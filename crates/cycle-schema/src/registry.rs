// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use std::collections::{HashMap, HashSet};

use crate::definition::SchemeDef;
use crate::error::{Result, SchemaError};
use crate::ids::TypeId;
use crate::types::{Reference, TypeNode};

// ---------------------------------------------------------------------------
// ObjectInfo / SchemeInfo
// ---------------------------------------------------------------------------

/// A registered object type and all of its versions.
#[derive(Debug, Clone)]
pub struct ObjectInfo {
    id: TypeId,
    scheme: String,
    name: String,
    /// Version history, index 0 = oldest.
    versions: Vec<TypeNode>,
}

impl ObjectInfo {
    pub fn id(&self) -> TypeId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn scheme_name(&self) -> &str {
        &self.scheme
    }

    pub fn versions(&self) -> &[TypeNode] {
        &self.versions
    }

    pub fn version(&self, version: u16) -> Option<&TypeNode> {
        self.versions.get(usize::from(version))
    }

    /// Index of the newest version.
    pub fn latest_version(&self) -> u16 {
        // registration rejects empty and oversized histories
        (self.versions.len() - 1) as u16
    }

    pub fn latest(&self) -> &TypeNode {
        &self.versions[self.versions.len() - 1]
    }
}

/// A registered scheme.
#[derive(Debug, Clone)]
pub struct SchemeInfo {
    id: u32,
    name: String,
    objects: Vec<ObjectInfo>,
    by_name: HashMap<String, u32>,
}

impl SchemeInfo {
    pub fn id(&self) -> u32 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn objects(&self) -> &[ObjectInfo] {
        &self.objects
    }

    pub fn object(&self, name: &str) -> Option<&ObjectInfo> {
        let idx = *self.by_name.get(name)?;
        self.objects.get(idx as usize)
    }
}

// ---------------------------------------------------------------------------
// ObjectType
// ---------------------------------------------------------------------------

/// A `TypeId` known to exist in a `SchemaSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectType(TypeId);

impl ObjectType {
    pub fn id(self) -> TypeId {
        self.0
    }
}

impl From<ObjectType> for TypeId {
    fn from(t: ObjectType) -> Self {
        t.0
    }
}

// ---------------------------------------------------------------------------
// SchemaSet
// ---------------------------------------------------------------------------

/// Immutable, fully-resolved set of schemes.
#[derive(Debug, Clone, Default)]
pub struct SchemaSet {
    schemes: Vec<SchemeInfo>,
    by_name: HashMap<String, u32>,
}

impl SchemaSet {
    pub fn builder() -> SchemaSetBuilder {
        SchemaSetBuilder::new()
    }

    pub fn scheme_id(&self, name: &str) -> Result<u32> {
        self.by_name
            .get(name)
            .copied()
            .ok_or_else(|| SchemaError::SchemeNotDefined(name.to_string()))
    }

    pub fn scheme(&self, id: u32) -> Result<&SchemeInfo> {
        self.schemes
            .get(id as usize)
            .ok_or_else(|| SchemaError::SchemeNotDefined(id.to_string()))
    }

    /// Schemes in registration order.
    pub fn schemes(&self) -> impl Iterator<Item = &SchemeInfo> {
        self.schemes.iter()
    }

    /// Total number of object types across all schemes.
    pub fn object_count(&self) -> usize {
        self.schemes.iter().map(|s| s.objects.len()).sum()
    }

    pub fn object_type(&self, scheme: &str, object: &str) -> Result<ObjectType> {
        let info = self.scheme(self.scheme_id(scheme)?)?;
        info.object(object)
            .map(|o| ObjectType(o.id))
            .ok_or_else(|| SchemaError::ObjectNotDefined {
                scheme: scheme.to_string(),
                object: object.to_string(),
            })
    }

    /// Check that `id` names a registered object type.
    pub fn validate(&self, id: TypeId) -> Result<ObjectType> {
        self.object_info(id).map(|o| ObjectType(o.id))
    }

    pub fn object_info(&self, id: TypeId) -> Result<&ObjectInfo> {
        self.object_info_by_index(id.scheme, id.name)
    }

    pub fn object_info_by_index(&self, scheme: u32, name: u32) -> Result<&ObjectInfo> {
        let info = self.scheme(scheme)?;
        info.objects
            .get(name as usize)
            .ok_or_else(|| SchemaError::ObjectNotDefined {
                scheme: info.name.clone(),
                object: name.to_string(),
            })
    }

    /// Version `version` of `id`, if both exist.
    pub fn version(&self, id: TypeId, version: u16) -> Option<&TypeNode> {
        self.object_info(id).ok()?.version(version)
    }

    pub fn latest_version(&self, id: TypeId) -> Result<u16> {
        self.object_info(id).map(ObjectInfo::latest_version)
    }

    fn merge(&mut self, def: SchemeDef) -> Result<()> {
        let scheme_id = match self.by_name.get(&def.name) {
            Some(&id) => id,
            None => {
                let id = self.schemes.len() as u32;
                self.schemes.push(SchemeInfo {
                    id,
                    name: def.name.clone(),
                    objects: Vec::new(),
                    by_name: HashMap::new(),
                });
                self.by_name.insert(def.name.clone(), id);
                id
            }
        };
        let scheme = &mut self.schemes[scheme_id as usize];

        for object in def.objects {
            let context = format!("{}::{}", scheme.name, object.name);
            if object.versions.is_empty() {
                return Err(SchemaError::EmptyObject {
                    scheme: scheme.name.clone(),
                    object: object.name,
                });
            }
            if object.versions.len() > usize::from(u16::MAX) {
                return Err(SchemaError::TooManyVersions {
                    object: context,
                    count: object.versions.len(),
                });
            }
            for version in &object.versions {
                check_names(version, &context)?;
            }

            match scheme.by_name.get(&object.name) {
                Some(&idx) => {
                    let existing = &mut scheme.objects[idx as usize];
                    let shared = existing.versions.len().min(object.versions.len());
                    if existing.versions[..shared] != object.versions[..shared] {
                        return Err(SchemaError::ConflictingVersions {
                            scheme: scheme.name.clone(),
                            object: object.name,
                        });
                    }
                    if object.versions.len() > existing.versions.len() {
                        log::debug!(
                            "[SCHEMA] {} extended from {} to {} versions",
                            context,
                            existing.versions.len(),
                            object.versions.len()
                        );
                        existing.versions = object.versions;
                    }
                }
                None => {
                    let idx = scheme.objects.len() as u32;
                    scheme.by_name.insert(object.name.clone(), idx);
                    scheme.objects.push(ObjectInfo {
                        id: TypeId::new(scheme_id, idx),
                        scheme: scheme.name.clone(),
                        name: object.name,
                        versions: object.versions,
                    });
                }
            }
        }
        Ok(())
    }

    /// Bind every reference to its target `TypeId`.
    fn resolve(&mut self) -> Result<()> {
        let SchemaSet { schemes, by_name } = self;
        let objects: Vec<HashMap<String, u32>> =
            schemes.iter().map(|s| s.by_name.clone()).collect();

        for scheme in schemes.iter_mut() {
            let home = scheme.name.clone();
            for object in &mut scheme.objects {
                for version in &mut object.versions {
                    version.visit_references_mut(&mut |r: &mut Reference| -> Result<()> {
                        let target_scheme = r.scheme.as_deref().unwrap_or(&home);
                        let scheme_id = *by_name
                            .get(target_scheme)
                            .ok_or_else(|| SchemaError::SchemeNotDefined(target_scheme.into()))?;
                        let object_id = *objects[scheme_id as usize]
                            .get(&r.name)
                            .ok_or_else(|| SchemaError::ObjectNotDefined {
                                scheme: target_scheme.to_string(),
                                object: r.name.clone(),
                            })?;
                        r.bind(TypeId::new(scheme_id, object_id));
                        Ok(())
                    })?;
                }
            }
        }
        Ok(())
    }
}

/// Reject duplicate field/variant names anywhere in `ty`.
fn check_names(ty: &TypeNode, context: &str) -> Result<()> {
    let names: Option<Vec<&str>> = match ty {
        TypeNode::Struct { fields } | TypeNode::Union { fields, .. } => {
            Some(fields.iter().map(|f| f.name.as_str()).collect())
        }
        TypeNode::Enum { variants } => Some(variants.iter().map(String::as_str).collect()),
        _ => None,
    };
    if let Some(names) = names {
        let mut seen = HashSet::with_capacity(names.len());
        for name in names {
            if !seen.insert(name) {
                return Err(SchemaError::DuplicateName {
                    context: context.to_string(),
                    name: name.to_string(),
                });
            }
        }
    }
    for child in ty.children() {
        check_names(child, context)?;
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// SchemaSetBuilder
// ---------------------------------------------------------------------------

/// Collects scheme definitions, then merges and resolves them.
#[derive(Debug, Default)]
pub struct SchemaSetBuilder {
    defs: Vec<SchemeDef>,
}

impl SchemaSetBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a scheme definition. Repeating a name merges the definitions.
    pub fn scheme(mut self, def: SchemeDef) -> Self {
        self.defs.push(def);
        self
    }

    pub fn build(self) -> Result<SchemaSet> {
        let mut set = SchemaSet::default();
        for def in self.defs {
            set.merge(def)?;
        }
        set.resolve()?;
        log::debug!(
            "[SCHEMA] registered {} schemes, {} object types",
            set.schemes.len(),
            set.object_count()
        );
        Ok(set)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ObjectDef;

    fn point() -> TypeNode {
        TypeNode::structure([("x", TypeNode::i32()), ("y", TypeNode::i32())])
    }

    #[test]
    fn test_ids_follow_registration_order() {
        let set = SchemaSet::builder()
            .scheme(SchemeDef::new("ui").object(ObjectDef::single("Point", point())))
            .scheme(
                SchemeDef::new("app")
                    .object(ObjectDef::single("A", TypeNode::u8()))
                    .object(ObjectDef::single("B", TypeNode::u8())),
            )
            .build()
            .expect("build");

        assert_eq!(set.scheme_id("ui").unwrap(), 0);
        assert_eq!(set.scheme_id("app").unwrap(), 1);
        assert_eq!(set.object_type("app", "B").unwrap().id(), TypeId::new(1, 1));
        assert_eq!(set.object_count(), 3);
    }

    #[test]
    fn test_reference_resolution() {
        let set = SchemaSet::builder()
            .scheme(
                SchemeDef::new("ui")
                    .object(ObjectDef::single(
                        "Node",
                        TypeNode::structure([
                            ("children", TypeNode::list(TypeNode::reference("Node"))),
                            ("style", TypeNode::scheme_reference("style", "Style")),
                        ]),
                    )),
            )
            .scheme(SchemeDef::new("style").object(ObjectDef::single("Style", TypeNode::u32())))
            .build()
            .expect("build");

        let node = set.object_type("ui", "Node").unwrap();
        let ty = set.object_info(node.id()).unwrap().latest();
        assert!(ty.is_resolved());
        let fields = ty.fields().unwrap();
        match &fields[1].ty {
            TypeNode::Reference(r) => assert_eq!(r.target(), Some(TypeId::new(1, 0))),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_undefined_targets() {
        let err = SchemaSet::builder()
            .scheme(SchemeDef::new("ui").object(ObjectDef::single("A", TypeNode::reference("Z"))))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::ObjectNotDefined { ref object, .. } if object == "Z"));

        let err = SchemaSet::builder()
            .scheme(
                SchemeDef::new("ui")
                    .object(ObjectDef::single("A", TypeNode::scheme_reference("gone", "B"))),
            )
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::SchemeNotDefined(ref s) if s == "gone"));
    }

    #[test]
    fn test_merge_prefix_wins_longer() {
        let short = SchemeDef::new("ui").object(ObjectDef::single("P", point()));
        let long = SchemeDef::new("ui").object(
            ObjectDef::new("P")
                .version(point())
                .version(TypeNode::structure([("x", TypeNode::f64())])),
        );
        let set = SchemaSet::builder()
            .scheme(short)
            .scheme(long)
            .build()
            .expect("build");
        let p = set.object_type("ui", "P").unwrap();
        assert_eq!(set.latest_version(p.id()).unwrap(), 1);
        assert_eq!(set.version(p.id(), 0), Some(&point()));
    }

    #[test]
    fn test_merge_conflict() {
        let a = SchemeDef::new("ui").object(ObjectDef::single("P", point()));
        let b = SchemeDef::new("ui").object(ObjectDef::single("P", TypeNode::u8()));
        let err = SchemaSet::builder().scheme(a).scheme(b).build().unwrap_err();
        assert!(matches!(err, SchemaError::ConflictingVersions { .. }));
    }

    #[test]
    fn test_empty_and_duplicate() {
        let err = SchemaSet::builder()
            .scheme(SchemeDef::new("ui").object(ObjectDef::new("Nothing")))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::EmptyObject { .. }));

        let err = SchemaSet::builder()
            .scheme(SchemeDef::new("ui").object(ObjectDef::single(
                "Mode",
                TypeNode::enumeration(["on", "off", "on"]),
            )))
            .build()
            .unwrap_err();
        assert!(matches!(err, SchemaError::DuplicateName { ref name, .. } if name == "on"));
    }

    #[test]
    fn test_unknown_ids() {
        let set = SchemaSet::builder()
            .scheme(SchemeDef::new("ui").object(ObjectDef::single("P", point())))
            .build()
            .expect("build");
        assert!(matches!(
            set.object_info(TypeId::new(4, 0)),
            Err(SchemaError::SchemeNotDefined(_))
        ));
        assert!(matches!(
            set.object_info(TypeId::new(0, 9)),
            Err(SchemaError::ObjectNotDefined { .. })
        ));
        assert!(set.version(TypeId::new(0, 0), 3).is_none());
    }
}
