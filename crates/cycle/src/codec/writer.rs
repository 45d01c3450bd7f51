// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Value -> wire bytes.

use cycle_schema::{FloatWidth, IntWidth, ObjectType, SchemaSet, TypeNode};

use super::cursor::WireWriter;
use super::value::Value;
use super::wire_size::wire_size;
use super::{CodecError, Result};

/// Encoder driven by a type node.
#[derive(Debug, Default)]
pub struct Writer {
    out: WireWriter,
}

impl Writer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Writer whose output starts with an object version prefix.
    pub fn for_version(version: u16) -> Self {
        let mut out = WireWriter::with_capacity(64);
        out.write_u16(version);
        Self { out }
    }

    pub fn position(&self) -> usize {
        self.out.position()
    }

    pub fn finish(self) -> Vec<u8> {
        self.out.into_inner()
    }

    /// Append the encoding of `value` as `ty`.
    pub fn write(&mut self, ty: &TypeNode, value: &Value) -> Result<()> {
        match (ty, value) {
            (TypeNode::Void, Value::Void) => {}
            (TypeNode::Bool, Value::Bool(b)) => self.out.write_u8(u8::from(*b)),
            (TypeNode::Int { signed, width }, v) => self.write_int(*signed, *width, v)?,
            (TypeNode::Float { width }, v) => self.write_float(*width, v)?,
            (TypeNode::Optional { child }, Value::Optional(inner)) => match inner {
                None => self.out.write_u8(0),
                Some(inner) => {
                    self.out.write_u8(1);
                    self.write(child, inner)?;
                }
            },
            (TypeNode::Array { child, len }, Value::Array(items)) => {
                check_len(*len, items.len())?;
                for item in items {
                    self.write(child, item)?;
                }
            }
            (TypeNode::List { child }, Value::List(items)) => self.write_list(child, items)?,
            (TypeNode::Map { key, value }, Value::Map(entries)) => {
                self.write_map(key, value, entries)?;
            }
            (TypeNode::String, Value::String(s)) => self.out.write_blob(s.as_bytes()),
            (TypeNode::Reference(r), Value::Reference(id)) => {
                let target = r
                    .target()
                    .ok_or_else(|| CodecError::UnresolvedReference(r.name.clone()))?;
                if target.scheme != id.scheme {
                    return Err(CodecError::ReferenceScheme {
                        expected: target.scheme,
                        found: id.scheme,
                    });
                }
                self.out.write_u64(id.to_bits());
            }
            (TypeNode::Struct { fields }, Value::Struct(members)) => {
                check_len(fields.len(), members.len())?;
                for (field, member) in fields.iter().zip(members) {
                    self.write(&field.ty, member)?;
                }
            }
            (TypeNode::Tuple { fields }, Value::Tuple(members)) => {
                check_len(fields.len(), members.len())?;
                for (ty, member) in fields.iter().zip(members) {
                    self.write(ty, member)?;
                }
            }
            (TypeNode::Enum { variants }, Value::Enum(ordinal)) => {
                check_ordinal("enum", *ordinal, variants.len())?;
                self.out.write_usize(*ordinal);
            }
            (TypeNode::Union { fields, .. }, Value::Union(ordinal, inner)) => {
                check_ordinal("union", *ordinal, fields.len())?;
                self.out.write_usize(*ordinal);
                self.write(&fields[*ordinal].ty, inner)?;
            }
            (ty, value) => return Err(mismatch(ty, value)),
        }
        Ok(())
    }

    fn write_int(&mut self, signed: bool, width: IntWidth, value: &Value) -> Result<()> {
        match (signed, width, value) {
            (false, IntWidth::W8, Value::U8(v)) => self.out.write_u8(*v),
            (false, IntWidth::W16, Value::U16(v)) => self.out.write_u16(*v),
            (false, IntWidth::W32, Value::U32(v)) => self.out.write_u32(*v),
            (false, IntWidth::W64, Value::U64(v)) => self.out.write_u64(*v),
            (false, IntWidth::W128, Value::U128(v)) => self.out.write_u128(*v),
            (true, IntWidth::W8, Value::I8(v)) => self.out.write_bytes(&v.to_le_bytes()),
            (true, IntWidth::W16, Value::I16(v)) => self.out.write_bytes(&v.to_le_bytes()),
            (true, IntWidth::W32, Value::I32(v)) => self.out.write_bytes(&v.to_le_bytes()),
            (true, IntWidth::W64, Value::I64(v)) => self.out.write_bytes(&v.to_le_bytes()),
            (true, IntWidth::W128, Value::I128(v)) => self.out.write_bytes(&v.to_le_bytes()),
            _ => {
                return Err(CodecError::TypeMismatch {
                    expected: int_name(signed, width),
                    found: value.kind_name(),
                })
            }
        }
        Ok(())
    }

    fn write_float(&mut self, width: FloatWidth, value: &Value) -> Result<()> {
        match (width, value) {
            (FloatWidth::F16, Value::F16(bits)) => self.out.write_u16(*bits),
            (FloatWidth::F32, Value::F32(v)) => self.out.write_u32(v.to_bits()),
            (FloatWidth::F64, Value::F64(v)) => self.out.write_u64(v.to_bits()),
            (FloatWidth::F128, Value::F128(bits)) => self.out.write_u128(*bits),
            _ => {
                return Err(CodecError::TypeMismatch {
                    expected: float_name(width),
                    found: value.kind_name(),
                })
            }
        }
        Ok(())
    }

    fn write_list(&mut self, child: &TypeNode, items: &[Value]) -> Result<()> {
        self.out.write_usize(items.len());
        if wire_size(child).is_some() {
            for item in items {
                self.write(child, item)?;
            }
            return Ok(());
        }
        let table = self.out.reserve_usize_table(items.len());
        let start = self.out.position();
        for (i, item) in items.iter().enumerate() {
            self.write(child, item)?;
            let end = self.out.position() - start;
            self.out.patch_usize(table, i, end);
        }
        Ok(())
    }

    fn write_map(
        &mut self,
        key: &TypeNode,
        value: &TypeNode,
        entries: &[(Value, Value)],
    ) -> Result<()> {
        self.out.write_usize(entries.len());
        match (wire_size(key), wire_size(value)) {
            (Some(_), Some(_)) => {
                for (k, v) in entries {
                    self.write(key, k)?;
                    self.write(value, v)?;
                }
            }
            (None, None) => {
                let table = self.out.reserve_usize_table(entries.len() * 2);
                let start = self.out.position();
                for (i, (k, v)) in entries.iter().enumerate() {
                    self.write(key, k)?;
                    let key_end = self.out.position() - start;
                    self.out.patch_usize(table, 2 * i, key_end);
                    self.write(value, v)?;
                    let value_end = self.out.position() - start;
                    self.out.patch_usize(table, 2 * i + 1, value_end);
                }
            }
            _ => {
                let table = self.out.reserve_usize_table(entries.len());
                let start = self.out.position();
                for (i, (k, v)) in entries.iter().enumerate() {
                    self.write(key, k)?;
                    self.write(value, v)?;
                    let end = self.out.position() - start;
                    self.out.patch_usize(table, i, end);
                }
            }
        }
        Ok(())
    }
}

fn check_len(expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(CodecError::LengthMismatch { expected, found });
    }
    Ok(())
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

fn mismatch(ty: &TypeNode, value: &Value) -> CodecError {
    CodecError::TypeMismatch {
        expected: ty.kind_name(),
        found: value.kind_name(),
    }
}

fn int_name(signed: bool, width: IntWidth) -> &'static str {
    match (signed, width) {
        (false, IntWidth::W8) => "u8",
        (false, IntWidth::W16) => "u16",
        (false, IntWidth::W32) => "u32",
        (false, IntWidth::W64) => "u64",
        (false, IntWidth::W128) => "u128",
        (true, IntWidth::W8) => "i8",
        (true, IntWidth::W16) => "i16",
        (true, IntWidth::W32) => "i32",
        (true, IntWidth::W64) => "i64",
        (true, IntWidth::W128) => "i128",
    }
}

fn float_name(width: FloatWidth) -> &'static str {
    match width {
        FloatWidth::F16 => "f16",
        FloatWidth::F32 => "f32",
        FloatWidth::F64 => "f64",
        FloatWidth::F128 => "f128",
    }
}

/// Encode `value` as `ty`, without a version prefix.
pub fn encode(ty: &TypeNode, value: &Value) -> Result<Vec<u8>> {
    let mut writer = Writer::new();
    writer.write(ty, value)?;
    Ok(writer.finish())
}

/// Encode a full object: version prefix plus the body of that version.
pub fn encode_object(
    schema: &SchemaSet,
    object: ObjectType,
    version: u16,
    value: &Value,
) -> Result<Vec<u8>> {
    let info = schema.object_info(object.id())?;
    let ty = info.version(version).ok_or(CodecError::VersionOutOfRange {
        version,
        count: info.versions().len(),
    })?;
    let mut writer = Writer::for_version(version);
    writer.write(ty, value)?;
    log::trace!(
        "[CODEC] encoded {}::{} v{} ({} bytes)",
        info.scheme_name(),
        info.name(),
        version,
        writer.position()
    );
    Ok(writer.finish())
}

/// Encode a full object at its latest version.
pub fn encode_latest(schema: &SchemaSet, object: ObjectType, value: &Value) -> Result<Vec<u8>> {
    let version = schema.latest_version(object.id())?;
    encode_object(schema, object, version, value)
}
