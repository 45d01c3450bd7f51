// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Partial updates: replace the value found at a field path.
//!
//! ```text
//! mutation := usize depth, usize index * depth, body(type_at_path(root, path))
//! ```
//!
//! A path step selects a struct/tuple member, a union field, an array or
//! list element, or (step 0) the payload of an optional.

use cycle_schema::TypeNode;

use super::cursor::{Cursor, OrCorrupt};
use super::value::Value;
use super::view::view;
use super::writer::Writer;
use super::{CodecError, Result};

/// Replacement of the value at `path` within an object.
#[derive(Debug, Clone, PartialEq)]
pub struct Mutation {
    pub path: Vec<usize>,
    pub value: Value,
}

impl Mutation {
    pub fn new(path: impl Into<Vec<usize>>, value: impl Into<Value>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }

    /// Replace the whole object.
    pub fn whole(value: impl Into<Value>) -> Self {
        Self::new(Vec::new(), value)
    }
}

/// Type node reached by following `path` from `root`.
pub fn type_at_path<'t>(root: &'t TypeNode, path: &[usize]) -> Result<&'t TypeNode> {
    let mut ty = root;
    for (depth, &step) in path.iter().enumerate() {
        ty = step_type(ty, step).ok_or_else(|| CodecError::InvalidPath {
            path: path.to_vec(),
            depth,
        })?;
    }
    Ok(ty)
}

fn step_type(ty: &TypeNode, step: usize) -> Option<&TypeNode> {
    match ty {
        TypeNode::Struct { fields } | TypeNode::Union { fields, .. } => {
            fields.get(step).map(|f| &f.ty)
        }
        TypeNode::Tuple { fields } => fields.get(step),
        TypeNode::Array { child, len } if step < *len => Some(child),
        TypeNode::List { child } => Some(child),
        TypeNode::Optional { child } if step == 0 => Some(child),
        _ => None,
    }
}

/// Encode `mutation` against the object type `root`.
pub fn encode_mutation(root: &TypeNode, mutation: &Mutation) -> Result<Vec<u8>> {
    let target = type_at_path(root, &mutation.path)?;
    let mut writer = Writer::new();
    writer.write(
        &TypeNode::list(TypeNode::u64()),
        &Value::List(mutation.path.iter().map(|&i| Value::U64(i as u64)).collect()),
    )?;
    writer.write(target, &mutation.value)?;
    Ok(writer.finish())
}

/// Decode a mutation produced by [`encode_mutation`].
///
/// A path that does not resolve in `root` is an error; malformed bytes
/// panic like any other corrupt object data.
pub fn decode_mutation(root: &TypeNode, bytes: &[u8]) -> Result<Mutation> {
    let mut cursor = Cursor::new(bytes);
    let depth = cursor.read_usize().or_corrupt();
    let mut path = Vec::with_capacity(depth.min(cursor.remaining() / 8));
    for _ in 0..depth {
        path.push(cursor.read_usize().or_corrupt());
    }
    let target = type_at_path(root, &path)?;
    let value = view(target, cursor.rest()).to_value();
    Ok(Mutation { path, value })
}

/// Apply `mutation` to `object`, a value of `root`.
///
/// The path must exist in the current value: list indices in bounds,
/// optionals present. A final union step switches the active field.
pub fn apply_mutation(root: &TypeNode, object: &mut Value, mutation: &Mutation) -> Result<()> {
    let path = &mutation.path;
    let invalid = |depth| CodecError::InvalidPath {
        path: path.clone(),
        depth,
    };

    let target = type_at_path(root, path)?;
    // Validates the replacement before anything is touched.
    Writer::new().write(target, &mutation.value)?;

    let mut slot = object;
    for (depth, &step) in path.iter().enumerate() {
        let last = depth + 1 == path.len();
        slot = match slot {
            Value::Struct(members)
            | Value::Tuple(members)
            | Value::Array(members)
            | Value::List(members) => members.get_mut(step).ok_or_else(|| invalid(depth))?,
            Value::Optional(Some(inner)) if step == 0 => inner.as_mut(),
            Value::Union(ordinal, inner) if last || *ordinal == step => {
                *ordinal = step;
                inner.as_mut()
            }
            _ => return Err(invalid(depth)),
        };
    }
    *slot = mutation.value.clone();
    log::trace!("[CODEC] applied mutation at {:?}", path);
    Ok(())
}
