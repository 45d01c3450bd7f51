// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Scheme definitions stored as JSON files.

use std::fs;
use std::path::Path;

use crate::definition::SchemeDef;
use crate::error::Result;
use crate::registry::SchemaSetBuilder;

/// Read one scheme definition.
pub fn load_scheme_file(path: impl AsRef<Path>) -> Result<SchemeDef> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)?;
    let def: SchemeDef = serde_json::from_str(&text)?;
    log::debug!(
        "[SCHEMA] loaded scheme '{}' ({} objects) from {}",
        def.name,
        def.objects.len(),
        path.display()
    );
    Ok(def)
}

/// Write one scheme definition as pretty-printed JSON, overwriting.
pub fn save_scheme_file(path: impl AsRef<Path>, def: &SchemeDef) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(def)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load every `*.json` file of `dir`, in file-name order.
pub fn load_scheme_dir(dir: impl AsRef<Path>) -> Result<Vec<SchemeDef>> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir.as_ref())? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|e| e == "json") {
            paths.push(path);
        }
    }
    paths.sort();
    paths.iter().map(|p| load_scheme_file(p)).collect()
}

impl SchemaSetBuilder {
    /// Add every scheme file of `dir`.
    pub fn scheme_dir(self, dir: impl AsRef<Path>) -> Result<Self> {
        Ok(load_scheme_dir(dir)?
            .into_iter()
            .fold(self, SchemaSetBuilder::scheme))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ObjectDef;
    use crate::error::SchemaError;
    use crate::types::TypeNode;

    #[test]
    fn test_save_load_roundtrip() {
        let tmp = tempfile::tempdir().expect("tempdir");
        let path = tmp.path().join("nested/ui.json");
        let def = SchemeDef::new("ui").object(ObjectDef::single(
            "Label",
            TypeNode::structure([
                ("text", TypeNode::string()),
                ("color", TypeNode::optional(TypeNode::array(TypeNode::u8(), 4))),
            ]),
        ));

        save_scheme_file(&path, &def).expect("save");
        let loaded = load_scheme_file(&path).expect("load");
        assert_eq!(loaded, def);
    }

    #[test]
    fn test_load_errors() {
        let tmp = tempfile::tempdir().expect("tempdir");
        assert!(matches!(
            load_scheme_file(tmp.path().join("missing.json")),
            Err(SchemaError::Io(_))
        ));

        let bad = tmp.path().join("bad.json");
        fs::write(&bad, "{ \"name\": 3 }").unwrap();
        assert!(matches!(load_scheme_file(&bad), Err(SchemaError::Parse(_))));
    }

    #[test]
    fn test_dir_order_and_filter() {
        let tmp = tempfile::tempdir().expect("tempdir");
        save_scheme_file(tmp.path().join("b.json"), &SchemeDef::new("b")).unwrap();
        save_scheme_file(tmp.path().join("a.json"), &SchemeDef::new("a")).unwrap();
        fs::write(tmp.path().join("notes.txt"), "ignored").unwrap();

        let defs = load_scheme_dir(tmp.path()).expect("dir");
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
    }
}
