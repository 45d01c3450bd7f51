// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native images: values laid out according to a [`LayoutNode`].
//!
//! The image is `layout.size()` bytes of fixed storage followed by a heap.
//! Strings, lists and maps are heads holding the absolute image offset of
//! their wire encoding in the heap, stored as a native-width integer.

use cycle_schema::TypeNode;

use super::cursor::corrupt;
use super::value::Value;
use super::view::view;
use super::writer::encode;
use super::{CodecError, Result};
use crate::config::NATIVE_HANDLE_SIZE;
use crate::layout::LayoutNode;

/// Lay `value` out as a native image of `ty`.
///
/// `layout` must have been computed from `ty`.
pub fn encode_native(ty: &TypeNode, layout: &LayoutNode, value: &Value) -> Result<Vec<u8>> {
    let mut image = NativeImage {
        fixed: vec![0u8; layout.size()],
        heap: Vec::new(),
    };
    image.write(ty, layout, value, 0)?;
    let NativeImage { mut fixed, heap } = image;
    fixed.extend_from_slice(&heap);
    Ok(fixed)
}

/// Rebuild the value stored in a native image.
///
/// Untagged unions keep no discriminant and fail with
/// [`CodecError::UntaggedUnion`]. Panics on a malformed image.
pub fn decode_native(ty: &TypeNode, layout: &LayoutNode, bytes: &[u8]) -> Result<Value> {
    if bytes.len() < layout.size() {
        corrupt(format_args!(
            "native image of {} bytes, layout needs {}",
            bytes.len(),
            layout.size()
        ));
    }
    read(ty, layout, bytes, 0)
}

struct NativeImage {
    fixed: Vec<u8>,
    heap: Vec<u8>,
}

impl NativeImage {
    fn put(&mut self, at: usize, bytes: &[u8]) {
        self.fixed[at..at + bytes.len()].copy_from_slice(bytes);
    }

    fn write(
        &mut self,
        ty: &TypeNode,
        layout: &LayoutNode,
        value: &Value,
        at: usize,
    ) -> Result<()> {
        match (ty, value) {
            (TypeNode::Void, Value::Void) => {}
            // scalar and reference encodings are their little-endian bytes
            (TypeNode::Bool, _)
            | (TypeNode::Int { .. }, _)
            | (TypeNode::Float { .. }, _)
            | (TypeNode::Reference(_), _) => {
                let bytes = encode(ty, value)?;
                self.put(at, &bytes);
            }
            (TypeNode::String, _) | (TypeNode::List { .. }, _) | (TypeNode::Map { .. }, _) => {
                let wire = encode(ty, value)?;
                let offset = self.fixed.len() + self.heap.len();
                self.heap.extend_from_slice(&wire);
                self.put(at, &(offset as u64).to_le_bytes()[..NATIVE_HANDLE_SIZE]);
            }
            (TypeNode::Optional { child }, Value::Optional(inner)) => {
                let payload = child_layout(layout, 0)?;
                let flag = layout.flag_offset().unwrap_or(payload.size());
                match inner {
                    None => self.put(at + flag, &[0]),
                    Some(inner) => {
                        self.write(child, payload, inner, at + payload.offset())?;
                        self.put(at + flag, &[1]);
                    }
                }
            }
            (TypeNode::Array { child, len }, Value::Array(items)) => {
                if items.len() != *len {
                    return Err(CodecError::LengthMismatch {
                        expected: *len,
                        found: items.len(),
                    });
                }
                let element = child_layout(layout, 0)?;
                for (i, item) in items.iter().enumerate() {
                    self.write(child, element, item, at + i * element.size())?;
                }
            }
            (TypeNode::Struct { fields }, Value::Struct(members)) => {
                self.write_members(fields.iter().map(|f| &f.ty), layout, members, at)?;
            }
            (TypeNode::Tuple { fields }, Value::Tuple(members)) => {
                self.write_members(fields.iter(), layout, members, at)?;
            }
            (TypeNode::Enum { variants }, Value::Enum(ordinal)) => {
                check_ordinal("enum", *ordinal, variants.len())?;
                self.put(at, &(*ordinal as u128).to_le_bytes()[..layout.size()]);
            }
            (TypeNode::Union { fields, .. }, Value::Union(ordinal, inner)) => {
                check_ordinal("union", *ordinal, fields.len())?;
                if let Some(tag) = layout.tag() {
                    self.put(at + tag.offset(), &(*ordinal as u128).to_le_bytes()[..tag.size()]);
                }
                let payload = child_layout(layout, *ordinal)?;
                self.write(&fields[*ordinal].ty, payload, inner, at + payload.offset())?;
            }
            (ty, value) => {
                return Err(CodecError::TypeMismatch {
                    expected: ty.kind_name(),
                    found: value.kind_name(),
                })
            }
        }
        Ok(())
    }

    fn write_members<'t>(
        &mut self,
        types: impl ExactSizeIterator<Item = &'t TypeNode>,
        layout: &LayoutNode,
        members: &[Value],
        at: usize,
    ) -> Result<()> {
        if types.len() != members.len() {
            return Err(CodecError::LengthMismatch {
                expected: types.len(),
                found: members.len(),
            });
        }
        for (i, (ty, member)) in types.zip(members).enumerate() {
            let field = child_layout(layout, i)?;
            self.write(ty, field, member, at + field.offset())?;
        }
        Ok(())
    }
}

fn read(ty: &TypeNode, layout: &LayoutNode, bytes: &[u8], at: usize) -> Result<Value> {
    let value = match ty {
        TypeNode::Void => Value::Void,
        TypeNode::Bool | TypeNode::Int { .. } | TypeNode::Float { .. } | TypeNode::Reference(_) => {
            view(ty, field(bytes, at, layout.size())).to_value()
        }
        TypeNode::String | TypeNode::List { .. } | TypeNode::Map { .. } => {
            let offset = read_uint(field(bytes, at, NATIVE_HANDLE_SIZE));
            let heap = usize::try_from(offset)
                .ok()
                .and_then(|offset| bytes.get(offset..))
                .unwrap_or_else(|| corrupt(format_args!("heap offset {} out of image", offset)));
            view(ty, heap).to_value()
        }
        TypeNode::Optional { child } => {
            let payload = child_layout(layout, 0)?;
            let flag = layout.flag_offset().unwrap_or(payload.size());
            match field(bytes, at + flag, 1)[0] {
                0 => Value::Optional(None),
                1 => Value::some(read(child, payload, bytes, at + payload.offset())?),
                other => corrupt(format_args!("optional flag {}", other)),
            }
        }
        TypeNode::Array { child, len } => {
            let element = child_layout(layout, 0)?;
            let items = (0..*len)
                .map(|i| read(child, element, bytes, at + i * element.size()))
                .collect::<Result<Vec<_>>>()?;
            Value::Array(items)
        }
        TypeNode::Struct { fields } => {
            Value::Struct(read_members(fields.iter().map(|f| &f.ty), layout, bytes, at)?)
        }
        TypeNode::Tuple { fields } => Value::Tuple(read_members(fields.iter(), layout, bytes, at)?),
        TypeNode::Enum { variants } => {
            let ordinal = read_ordinal(field(bytes, at, layout.size()), variants.len());
            Value::Enum(ordinal)
        }
        TypeNode::Union { fields, .. } => {
            let tag = layout.tag().ok_or(CodecError::UntaggedUnion)?;
            let ordinal = read_ordinal(field(bytes, at + tag.offset(), tag.size()), fields.len());
            let payload = child_layout(layout, ordinal)?;
            Value::union(ordinal, read(&fields[ordinal].ty, payload, bytes, at + payload.offset())?)
        }
    };
    Ok(value)
}

fn read_members<'t>(
    types: impl Iterator<Item = &'t TypeNode>,
    layout: &LayoutNode,
    bytes: &[u8],
    at: usize,
) -> Result<Vec<Value>> {
    types
        .enumerate()
        .map(|(i, ty)| {
            let member = child_layout(layout, i)?;
            read(ty, member, bytes, at + member.offset())
        })
        .collect()
}

fn field(bytes: &[u8], at: usize, len: usize) -> &[u8] {
    bytes
        .get(at..at + len)
        .unwrap_or_else(|| corrupt(format_args!("field {}..{} past image end", at, at + len)))
}

fn read_uint(bytes: &[u8]) -> u128 {
    let mut buf = [0u8; 16];
    buf[..bytes.len()].copy_from_slice(bytes);
    u128::from_le_bytes(buf)
}

fn read_ordinal(bytes: &[u8], count: usize) -> usize {
    let raw = read_uint(bytes);
    match usize::try_from(raw) {
        Ok(ordinal) if ordinal < count => ordinal,
        _ => corrupt(format_args!("ordinal {} of {}", raw, count)),
    }
}

fn child_layout(layout: &LayoutNode, index: usize) -> Result<&LayoutNode> {
    layout.child(index).ok_or(CodecError::LengthMismatch {
        expected: index + 1,
        found: layout.children().len(),
    })
}

fn check_ordinal(kind: &'static str, ordinal: usize, count: usize) -> Result<()> {
    if ordinal >= count {
        return Err(CodecError::InvalidOrdinal {
            kind,
            ordinal,
            count,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::compute_layout;

    fn round_trip(ty: &TypeNode, value: Value) -> Vec<u8> {
        let layout = compute_layout(ty).unwrap();
        let image = encode_native(ty, &layout, &value).unwrap();
        assert_eq!(decode_native(ty, &layout, &image).unwrap(), value);
        image
    }

    #[test]
    fn test_struct_fields_at_layout_offsets() {
        let ty = TypeNode::structure([("a", TypeNode::u8()), ("b", TypeNode::u32())]);
        let image = round_trip(&ty, Value::Struct(vec![Value::U8(0xAB), Value::U32(0x0102_0304)]));
        assert_eq!(image.len(), 8);
        assert_eq!(&image[0..4], &0x0102_0304u32.to_le_bytes());
        assert_eq!(image[4], 0xAB);
    }

    #[test]
    fn test_string_lives_in_heap() {
        let ty = TypeNode::structure([("n", TypeNode::u16()), ("s", TypeNode::string())]);
        let layout = compute_layout(&ty).unwrap();
        let image = round_trip(&ty, Value::Struct(vec![Value::U16(3), Value::from("xyz")]));
        let head = layout.child(1).unwrap().offset();
        let mut offset = [0u8; 8];
        offset[..NATIVE_HANDLE_SIZE].copy_from_slice(&image[head..head + NATIVE_HANDLE_SIZE]);
        assert_eq!(u64::from_le_bytes(offset) as usize, layout.size());
        assert_eq!(&image[layout.size() + 8..], b"xyz");
    }

    #[test]
    fn test_optional_flag() {
        let ty = TypeNode::optional(TypeNode::u32());
        let image = round_trip(&ty, Value::some(9u32));
        assert_eq!(image[4], 1);
        let image = round_trip(&ty, Value::none());
        assert_eq!(image[4], 0);
    }

    #[test]
    fn test_unions_and_enums() {
        let ty = TypeNode::union([("small", TypeNode::u8()), ("big", TypeNode::u32())]);
        let image = round_trip(&ty, Value::union(1, 77u32));
        assert_eq!(image[4], 1);
        round_trip(&TypeNode::enumeration(["a", "b", "c"]), Value::Enum(2));
        round_trip(
            &TypeNode::array(TypeNode::list(TypeNode::u8()), 2),
            Value::Array(vec![Value::List(vec![Value::U8(1)]), Value::List(vec![])]),
        );
    }

    #[test]
    fn test_untagged_union_cannot_decode() {
        let ty = TypeNode::untagged_union([("a", TypeNode::u16()), ("b", TypeNode::u32())]);
        let layout = compute_layout(&ty).unwrap();
        let image = encode_native(&ty, &layout, &Value::union(0, 5u16)).unwrap();
        assert_eq!(&image[..2], &5u16.to_le_bytes());
        assert!(matches!(
            decode_native(&ty, &layout, &image),
            Err(CodecError::UntaggedUnion)
        ));
    }

    #[test]
    #[should_panic(expected = "corrupt object data")]
    fn test_bad_optional_flag() {
        let ty = TypeNode::optional(TypeNode::u8());
        let layout = compute_layout(&ty).unwrap();
        decode_native(&ty, &layout, &[0, 2]).unwrap();
    }
}
