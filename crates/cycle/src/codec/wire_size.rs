// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

use cycle_schema::TypeNode;

use super::cursor::{corrupt, table_entry, Cursor, OrCorrupt};
use crate::config::{REFERENCE_BYTES, WIRE_USIZE_BYTES};

/// Static wire size of `ty`, or `None` when it depends on the value.
///
/// Optionals, strings, lists and maps are always variable. A union is
/// static only when every field has the same static size.
pub fn wire_size(ty: &TypeNode) -> Option<usize> {
    match ty {
        TypeNode::Void => Some(0),
        TypeNode::Bool => Some(1),
        TypeNode::Int { width, .. } => Some(width.bytes()),
        TypeNode::Float { width } => Some(width.bytes()),
        TypeNode::Reference(_) => Some(REFERENCE_BYTES),
        TypeNode::Enum { .. } => Some(WIRE_USIZE_BYTES),
        TypeNode::Optional { .. } | TypeNode::List { .. } | TypeNode::Map { .. } => None,
        TypeNode::String => None,
        TypeNode::Array { child, len } => wire_size(child)?.checked_mul(*len),
        TypeNode::Struct { fields } => fields
            .iter()
            .try_fold(0usize, |acc, f| acc.checked_add(wire_size(&f.ty)?)),
        TypeNode::Tuple { fields } => fields
            .iter()
            .try_fold(0usize, |acc, ty| acc.checked_add(wire_size(ty)?)),
        TypeNode::Union { fields, .. } => {
            let mut sizes = fields.iter().map(|f| wire_size(&f.ty));
            let first = match sizes.next() {
                Some(size) => size?,
                None => 0,
            };
            for size in sizes {
                if size? != first {
                    return None;
                }
            }
            Some(WIRE_USIZE_BYTES + first)
        }
    }
}

/// Number of bytes the encoded value of `ty` at the start of `bytes` spans.
///
/// Panics when the bytes cannot hold such a value.
pub fn encoded_len(ty: &TypeNode, bytes: &[u8]) -> usize {
    let len = measure(ty, bytes);
    if len > bytes.len() {
        corrupt(format_args!(
            "{} spans {} bytes, only {} available",
            ty.kind_name(),
            len,
            bytes.len()
        ));
    }
    len
}

fn measure(ty: &TypeNode, bytes: &[u8]) -> usize {
    if let Some(size) = wire_size(ty) {
        return size;
    }
    let mut cursor = Cursor::new(bytes);
    match ty {
        TypeNode::Optional { child } => {
            if cursor.read_bool().or_corrupt() {
                1 + encoded_len(child, cursor.rest())
            } else {
                1
            }
        }
        TypeNode::String => WIRE_USIZE_BYTES.saturating_add(cursor.read_usize().or_corrupt()),
        TypeNode::Array { child, len } => {
            let mut offset = 0;
            for _ in 0..*len {
                offset += encoded_len(child, &bytes[offset..]);
            }
            offset
        }
        TypeNode::Struct { fields } => sequential(fields.iter().map(|f| &f.ty), bytes),
        TypeNode::Tuple { fields } => sequential(fields.iter(), bytes),
        TypeNode::Union { fields, .. } => {
            let tag = cursor.read_usize().or_corrupt();
            let field = fields
                .get(tag)
                .unwrap_or_else(|| corrupt(format_args!("union tag {} of {}", tag, fields.len())));
            WIRE_USIZE_BYTES + encoded_len(&field.ty, cursor.rest())
        }
        TypeNode::List { child } => {
            let count = cursor.read_usize().or_corrupt();
            match wire_size(child) {
                Some(size) => WIRE_USIZE_BYTES.saturating_add(checked_product(count, size)),
                None => WIRE_USIZE_BYTES.saturating_add(tabled(cursor.rest(), count)),
            }
        }
        TypeNode::Map { key, value } => {
            let count = cursor.read_usize().or_corrupt();
            match (wire_size(key), wire_size(value)) {
                (Some(k), Some(v)) => {
                    WIRE_USIZE_BYTES.saturating_add(checked_product(count, k.saturating_add(v)))
                }
                (None, None) => {
                    let entries = checked_product(count, 2);
                    WIRE_USIZE_BYTES.saturating_add(tabled(cursor.rest(), entries))
                }
                _ => WIRE_USIZE_BYTES.saturating_add(tabled(cursor.rest(), count)),
            }
        }
        // statically sized kinds returned above
        _ => 0,
    }
}

fn sequential<'t>(types: impl Iterator<Item = &'t TypeNode>, bytes: &[u8]) -> usize {
    types.fold(0, |offset, ty| offset + encoded_len(ty, &bytes[offset..]))
}

/// Table of `entries` cumulative end offsets followed by the payload.
fn tabled(rest: &[u8], entries: usize) -> usize {
    let table = checked_product(entries, WIRE_USIZE_BYTES);
    if entries == 0 {
        return 0;
    }
    table.saturating_add(table_entry(rest, entries - 1))
}

fn checked_product(a: usize, b: usize) -> usize {
    a.checked_mul(b)
        .unwrap_or_else(|| corrupt(format_args!("length {} x {} overflows", a, b)))
}
