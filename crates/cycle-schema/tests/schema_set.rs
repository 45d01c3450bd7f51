// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Schema set assembly from files, versioned objects and code.

#![allow(clippy::unwrap_used)]

use cycle_schema::{
    save_scheme_file, FieldVersion, ObjectDef, SchemaError, SchemaSet, SchemeDef, TypeId,
    TypeNode, VersionedObject,
};

fn widget_scheme() -> SchemeDef {
    let button = VersionedObject::new("Button")
        .field("label", TypeNode::string())
        .field("style", TypeNode::scheme_reference("style", "Style"))
        .field_in("tooltip", TypeNode::optional(TypeNode::string()), FieldVersion::added(2))
        .into_object_def()
        .unwrap();
    SchemeDef::new("widget").object(button).object(ObjectDef::single(
        "Panel",
        TypeNode::structure([("children", TypeNode::list(TypeNode::reference("Button")))]),
    ))
}

fn style_scheme() -> SchemeDef {
    SchemeDef::new("style").object(ObjectDef::single(
        "Style",
        TypeNode::structure([("color", TypeNode::u32()), ("padding", TypeNode::f32())]),
    ))
}

#[test]
fn test_schemes_from_directory() {
    let tmp = tempfile::tempdir().unwrap();
    save_scheme_file(tmp.path().join("10-style.json"), &style_scheme()).unwrap();
    save_scheme_file(tmp.path().join("20-widget.json"), &widget_scheme()).unwrap();

    let set = SchemaSet::builder()
        .scheme_dir(tmp.path())
        .unwrap()
        .build()
        .unwrap();

    assert_eq!(set.scheme_id("style").unwrap(), 0);
    let button = set.object_type("widget", "Button").unwrap();
    assert_eq!(button.id(), TypeId::new(1, 0));
    assert_eq!(set.latest_version(button.id()).unwrap(), 1);
    assert!(set
        .object_info(button.id())
        .unwrap()
        .versions()
        .iter()
        .all(TypeNode::is_resolved));
}

#[test]
fn test_dependency_order_does_not_matter() {
    let set = SchemaSet::builder()
        .scheme(widget_scheme())
        .scheme(style_scheme())
        .build()
        .unwrap();
    assert_eq!(set.scheme_id("widget").unwrap(), 0);
    assert_eq!(set.object_type("style", "Style").unwrap().id(), TypeId::new(1, 0));
}

#[test]
fn test_missing_dependency_fails_at_build() {
    let err = SchemaSet::builder().scheme(widget_scheme()).build().unwrap_err();
    assert!(matches!(err, SchemaError::SchemeNotDefined(ref s) if s == "style"));
}

#[test]
fn test_split_definitions_merge() {
    let extra = SchemeDef::new("widget").object(ObjectDef::single("Spacer", TypeNode::Void));
    let set = SchemaSet::builder()
        .scheme(style_scheme())
        .scheme(widget_scheme())
        .scheme(extra)
        .scheme(widget_scheme())
        .build()
        .unwrap();

    let widget = set.scheme(set.scheme_id("widget").unwrap()).unwrap();
    let names: Vec<_> = widget.objects().iter().map(|o| o.name()).collect();
    assert_eq!(names, ["Button", "Panel", "Spacer"]);
}
