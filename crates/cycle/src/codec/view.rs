// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Lazy, zero-copy views over wire bytes.
//!
//! A view is a `(type node, byte slice)` pair; nothing is decoded until an
//! accessor asks for it. Navigating into a struct or container yields a new
//! view over the child's exact byte range.

use std::fmt;

use cycle_schema::{
    Field, FloatWidth, IntWidth, ObjectId, ObjectInfo, ObjectType, Reference, SchemaSet, TypeId,
    TypeNode,
};

use super::cursor::{corrupt, table_entry, Cursor, OrCorrupt};
use super::value::Value;
use super::wire_size::{encoded_len, wire_size};
use super::writer::encode;
use super::Result;
use crate::config::{WIRE_USIZE_BYTES, WIRE_VERSION_BYTES};
use crate::index::ObjectIndex;

// ---------------------------------------------------------------------------
// View
// ---------------------------------------------------------------------------

/// Lazy view of one value.
#[derive(Clone, Copy)]
pub struct View<'a> {
    ty: &'a TypeNode,
    bytes: &'a [u8],
    index: Option<&'a ObjectIndex>,
}

impl fmt::Debug for View<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("kind", &self.ty.kind_name())
            .field("bytes", &self.bytes.len())
            .field("bound", &self.index.is_some())
            .finish()
    }
}

/// View `bytes` as a value of `ty`, with no index bound for references.
pub fn view<'a>(ty: &'a TypeNode, bytes: &'a [u8]) -> View<'a> {
    View::new(ty, bytes)
}

macro_rules! int_accessors {
    ($($getter:ident => $signed:expr, $width:ident, $type:ty;)*) => {
        $(
            pub fn $getter(&self) -> Option<$type> {
                match self.ty {
                    TypeNode::Int { signed: $signed, width: IntWidth::$width } => {
                        Some(<$type>::from_le_bytes(self.fixed()))
                    }
                    _ => None,
                }
            }
        )*
    };
}

impl<'a> View<'a> {
    pub fn new(ty: &'a TypeNode, bytes: &'a [u8]) -> Self {
        Self {
            ty,
            bytes,
            index: None,
        }
    }

    pub(crate) fn bound(ty: &'a TypeNode, bytes: &'a [u8], index: Option<&'a ObjectIndex>) -> Self {
        Self { ty, bytes, index }
    }

    fn child(&self, ty: &'a TypeNode, bytes: &'a [u8]) -> View<'a> {
        View {
            ty,
            bytes,
            index: self.index,
        }
    }

    pub fn ty(&self) -> &'a TypeNode {
        self.ty
    }

    /// Exact encoded bytes of this value.
    pub fn encoded(&self) -> &'a [u8] {
        &self.bytes[..encoded_len(self.ty, self.bytes)]
    }

    fn fixed<const N: usize>(&self) -> [u8; N] {
        let mut out = [0u8; N];
        out.copy_from_slice(Cursor::new(self.bytes).read_bytes(N).or_corrupt());
        out
    }

    fn usize_at(&self, offset: usize) -> usize {
        let mut cursor = Cursor::new(self.bytes);
        cursor.read_bytes(offset).or_corrupt();
        cursor.read_usize().or_corrupt()
    }

    fn rest(&self, offset: usize) -> &'a [u8] {
        self.bytes
            .get(offset..)
            .unwrap_or_else(|| {
                corrupt(format_args!("offset {} past {} bytes", offset, self.bytes.len()))
            })
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.ty {
            TypeNode::Bool => Some(Cursor::new(self.bytes).read_bool().or_corrupt()),
            _ => None,
        }
    }

    int_accessors! {
        as_u8 => false, W8, u8;
        as_u16 => false, W16, u16;
        as_u32 => false, W32, u32;
        as_u64 => false, W64, u64;
        as_u128 => false, W128, u128;
        as_i8 => true, W8, i8;
        as_i16 => true, W16, i16;
        as_i32 => true, W32, i32;
        as_i64 => true, W64, i64;
        as_i128 => true, W128, i128;
    }

    /// Raw bits of a 16-bit float.
    pub fn as_f16_bits(&self) -> Option<u16> {
        match self.ty {
            TypeNode::Float {
                width: FloatWidth::F16,
            } => Some(u16::from_le_bytes(self.fixed())),
            _ => None,
        }
    }

    pub fn as_f32(&self) -> Option<f32> {
        match self.ty {
            TypeNode::Float {
                width: FloatWidth::F32,
            } => Some(f32::from_bits(u32::from_le_bytes(self.fixed()))),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self.ty {
            TypeNode::Float {
                width: FloatWidth::F64,
            } => Some(f64::from_bits(u64::from_le_bytes(self.fixed()))),
            _ => None,
        }
    }

    /// Raw bits of a 128-bit float.
    pub fn as_f128_bits(&self) -> Option<u128> {
        match self.ty {
            TypeNode::Float {
                width: FloatWidth::F128,
            } => Some(u128::from_le_bytes(self.fixed())),
            _ => None,
        }
    }

    /// Borrowed string contents.
    pub fn as_str(&self) -> Option<&'a str> {
        match self.ty {
            TypeNode::String => {
                let raw = Cursor::new(self.bytes).read_blob().or_corrupt();
                Some(std::str::from_utf8(raw).unwrap_or_else(|e| corrupt(e)))
            }
            _ => None,
        }
    }

    /// `Some(None)` for an absent optional, `None` if this is not an optional.
    pub fn optional(&self) -> Option<Option<View<'a>>> {
        let TypeNode::Optional { child } = self.ty else {
            return None;
        };
        let mut cursor = Cursor::new(self.bytes);
        if !cursor.read_bool().or_corrupt() {
            return Some(None);
        }
        let rest = cursor.rest();
        let len = encoded_len(child, rest);
        Some(Some(self.child(child, &rest[..len])))
    }

    pub fn list(&self) -> Option<ListView<'a>> {
        match self.ty {
            TypeNode::List { child } => Some(self.list_of(child)),
            _ => None,
        }
    }

    fn list_of(&self, child: &'a TypeNode) -> ListView<'a> {
        let count = self.usize_at(0);
        ListView::new(*self, child, count, self.rest(WIRE_USIZE_BYTES), true)
    }

    /// Fixed array; element access has the same shape as a list.
    pub fn array(&self) -> Option<ListView<'a>> {
        match self.ty {
            TypeNode::Array { child, len } => {
                Some(ListView::new(*self, child, *len, self.bytes, false))
            }
            _ => None,
        }
    }

    pub fn map(&self) -> Option<MapView<'a>> {
        match self.ty {
            TypeNode::Map { key, value } => Some(self.map_of(key, value)),
            _ => None,
        }
    }

    fn map_of(&self, key: &'a TypeNode, value: &'a TypeNode) -> MapView<'a> {
        let count = self.usize_at(0);
        MapView::new(*self, key, value, count, self.rest(WIRE_USIZE_BYTES))
    }

    /// Struct or tuple members.
    pub fn structure(&self) -> Option<StructView<'a>> {
        let members = match self.ty {
            TypeNode::Struct { fields } => Members::Named(fields),
            TypeNode::Tuple { fields } => Members::Positional(fields),
            _ => return None,
        };
        Some(self.members(members))
    }

    fn members(&self, members: Members<'a>) -> StructView<'a> {
        StructView {
            members,
            base: *self,
        }
    }

    /// Struct field by name.
    pub fn field(&self, name: &str) -> Option<View<'a>> {
        let idx = match self.ty {
            TypeNode::Struct { .. } => self.ty.field_index(name)?,
            _ => return None,
        };
        self.structure()?.get(idx)
    }

    /// Struct or tuple member by position.
    pub fn field_at(&self, index: usize) -> Option<View<'a>> {
        self.structure()?.get(index)
    }

    pub fn tuple_element(&self, index: usize) -> Option<View<'a>> {
        match self.ty {
            TypeNode::Tuple { .. } => self.field_at(index),
            _ => None,
        }
    }

    pub fn enum_ordinal(&self) -> Option<usize> {
        let TypeNode::Enum { variants } = self.ty else {
            return None;
        };
        let ordinal = self.usize_at(0);
        if ordinal >= variants.len() {
            corrupt(format_args!("enum ordinal {} of {}", ordinal, variants.len()));
        }
        Some(ordinal)
    }

    pub fn enum_name(&self) -> Option<&'a str> {
        let TypeNode::Enum { variants } = self.ty else {
            return None;
        };
        Some(variants[self.enum_ordinal()?].as_str())
    }

    pub fn union_variant(&self) -> Option<UnionView<'a>> {
        match self.ty {
            TypeNode::Union { fields, .. } => Some(self.union_of(fields)),
            _ => None,
        }
    }

    fn union_of(&self, fields: &'a [Field]) -> UnionView<'a> {
        let tag = self.usize_at(0);
        let field = fields
            .get(tag)
            .unwrap_or_else(|| corrupt(format_args!("union tag {} of {}", tag, fields.len())));
        let rest = self.rest(WIRE_USIZE_BYTES);
        let len = encoded_len(&field.ty, rest);
        UnionView {
            field,
            ordinal: tag,
            value: self.child(&field.ty, &rest[..len]),
        }
    }

    /// Panics for a reference node that was never registered in a
    /// `SchemaSet`, since its target type is unknown.
    pub fn reference(&self) -> Option<RefView<'a>> {
        match self.ty {
            TypeNode::Reference(r) => Some(self.reference_of(r)),
            _ => None,
        }
    }

    fn reference_of(&self, r: &'a Reference) -> RefView<'a> {
        let target = r
            .target()
            .unwrap_or_else(|| {
                panic!("reference to {} was never resolved by a schema set", r.name)
            });
        let bits = u64::from_le_bytes(self.fixed());
        RefView {
            target,
            id: ObjectId::from_bits(target.scheme, bits),
            index: self.index,
        }
    }

    /// Decode one level and dispatch on the kind.
    pub fn kind(&self) -> ViewKind<'a> {
        match self.ty {
            TypeNode::Void => ViewKind::Void,
            TypeNode::Bool => ViewKind::Bool(self.as_bool().unwrap_or_default()),
            TypeNode::Int { .. } | TypeNode::Float { .. } => ViewKind::Number(self.scalar_value()),
            TypeNode::String => ViewKind::String(self.as_str().unwrap_or_default()),
            TypeNode::Optional { .. } => ViewKind::Optional(self.optional().flatten()),
            TypeNode::Array { child, len } => {
                ViewKind::Array(ListView::new(*self, child, *len, self.bytes, false))
            }
            TypeNode::List { child } => ViewKind::List(self.list_of(child)),
            TypeNode::Map { key, value } => ViewKind::Map(self.map_of(key, value)),
            TypeNode::Reference(r) => ViewKind::Reference(self.reference_of(r)),
            TypeNode::Struct { fields } => ViewKind::Struct(self.members(Members::Named(fields))),
            TypeNode::Tuple { fields } => {
                ViewKind::Struct(self.members(Members::Positional(fields)))
            }
            TypeNode::Enum { variants } => {
                let ordinal = self.enum_ordinal().unwrap_or_default();
                ViewKind::Enum {
                    ordinal,
                    name: variants[ordinal].as_str(),
                }
            }
            TypeNode::Union { fields, .. } => ViewKind::Union(self.union_of(fields)),
        }
    }

    fn scalar_value(&self) -> Value {
        match self.ty {
            TypeNode::Int { signed, width } => match (signed, width) {
                (false, IntWidth::W8) => Value::U8(u8::from_le_bytes(self.fixed())),
                (false, IntWidth::W16) => Value::U16(u16::from_le_bytes(self.fixed())),
                (false, IntWidth::W32) => Value::U32(u32::from_le_bytes(self.fixed())),
                (false, IntWidth::W64) => Value::U64(u64::from_le_bytes(self.fixed())),
                (false, IntWidth::W128) => Value::U128(u128::from_le_bytes(self.fixed())),
                (true, IntWidth::W8) => Value::I8(i8::from_le_bytes(self.fixed())),
                (true, IntWidth::W16) => Value::I16(i16::from_le_bytes(self.fixed())),
                (true, IntWidth::W32) => Value::I32(i32::from_le_bytes(self.fixed())),
                (true, IntWidth::W64) => Value::I64(i64::from_le_bytes(self.fixed())),
                (true, IntWidth::W128) => Value::I128(i128::from_le_bytes(self.fixed())),
            },
            TypeNode::Float { width } => match width {
                FloatWidth::F16 => Value::F16(u16::from_le_bytes(self.fixed())),
                FloatWidth::F32 => Value::F32(f32::from_bits(u32::from_le_bytes(self.fixed()))),
                FloatWidth::F64 => Value::F64(f64::from_bits(u64::from_le_bytes(self.fixed()))),
                FloatWidth::F128 => Value::F128(u128::from_le_bytes(self.fixed())),
            },
            _ => Value::Void,
        }
    }

    /// Materialize the whole value.
    pub fn to_value(&self) -> Value {
        match self.kind() {
            ViewKind::Void => Value::Void,
            ViewKind::Bool(b) => Value::Bool(b),
            ViewKind::Number(v) => v,
            ViewKind::String(s) => Value::String(s.to_string()),
            ViewKind::Optional(inner) => Value::Optional(inner.map(|v| Box::new(v.to_value()))),
            ViewKind::Array(list) => Value::Array(list.iter().map(|v| v.to_value()).collect()),
            ViewKind::List(list) => Value::List(list.iter().map(|v| v.to_value()).collect()),
            ViewKind::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.to_value(), v.to_value()))
                    .collect(),
            ),
            ViewKind::Reference(r) => Value::Reference(r.id()),
            ViewKind::Struct(s) => {
                let members = s.iter().map(|(_, v)| v.to_value()).collect();
                match self.ty {
                    TypeNode::Tuple { .. } => Value::Tuple(members),
                    _ => Value::Struct(members),
                }
            }
            ViewKind::Enum { ordinal, .. } => Value::Enum(ordinal),
            ViewKind::Union(u) => Value::Union(u.ordinal(), Box::new(u.value().to_value())),
        }
    }
}

/// One decoded level of a view.
#[derive(Debug, Clone)]
pub enum ViewKind<'a> {
    Void,
    Bool(bool),
    /// Integer or float, as its owned value.
    Number(Value),
    String(&'a str),
    Optional(Option<View<'a>>),
    Array(ListView<'a>),
    List(ListView<'a>),
    Map(MapView<'a>),
    Reference(RefView<'a>),
    /// Struct or tuple.
    Struct(StructView<'a>),
    Enum { ordinal: usize, name: &'a str },
    Union(UnionView<'a>),
}

// ---------------------------------------------------------------------------
// StructView
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Members<'a> {
    Named(&'a [Field]),
    Positional(&'a [TypeNode]),
}

/// Members of a struct or tuple, located on demand.
#[derive(Debug, Clone, Copy)]
pub struct StructView<'a> {
    members: Members<'a>,
    base: View<'a>,
}

impl<'a> StructView<'a> {
    pub fn len(&self) -> usize {
        match self.members {
            Members::Named(fields) => fields.len(),
            Members::Positional(types) => types.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Field name, `None` for tuple members.
    pub fn name(&self, index: usize) -> Option<&'a str> {
        match self.members {
            Members::Named(fields) => fields.get(index).map(|f| f.name.as_str()),
            Members::Positional(_) => None,
        }
    }

    fn member_type(&self, index: usize) -> Option<&'a TypeNode> {
        match self.members {
            Members::Named(fields) => fields.get(index).map(|f| &f.ty),
            Members::Positional(types) => types.get(index),
        }
    }

    /// Member `index`; earlier members are skipped, not decoded.
    pub fn get(&self, index: usize) -> Option<View<'a>> {
        let ty = self.member_type(index)?;
        let bytes = self.base.bytes;
        let mut offset = 0;
        for i in 0..index {
            let prior = self.member_type(i)?;
            offset += encoded_len(prior, &bytes[offset..]);
        }
        let len = encoded_len(ty, &bytes[offset..]);
        Some(self.base.child(ty, &bytes[offset..offset + len]))
    }

    pub fn get_by_name(&self, name: &str) -> Option<View<'a>> {
        match self.members {
            Members::Named(fields) => self.get(fields.iter().position(|f| f.name == name)?),
            Members::Positional(_) => None,
        }
    }

    /// `(name, view)` pairs in declaration order, walking the bytes once.
    pub fn iter(&self) -> impl Iterator<Item = (Option<&'a str>, View<'a>)> + 'a {
        let this = *self;
        let mut offset = 0;
        (0..self.len()).map_while(move |i| {
            let ty = this.member_type(i)?;
            let bytes = this.base.bytes;
            let len = encoded_len(ty, &bytes[offset..]);
            let view = this.base.child(ty, &bytes[offset..offset + len]);
            offset += len;
            Some((this.name(i), view))
        })
    }
}

// ---------------------------------------------------------------------------
// ListView
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum Placement<'a> {
    /// Statically sized elements.
    Stride(usize),
    /// Cumulative end offsets, one per element.
    Table(&'a [u8]),
    /// Variable elements without a table (fixed arrays): walk from the start.
    Scan,
}

/// Elements of a list or fixed array.
#[derive(Debug, Clone, Copy)]
pub struct ListView<'a> {
    elem: &'a TypeNode,
    count: usize,
    placement: Placement<'a>,
    payload: &'a [u8],
    base: View<'a>,
}

impl<'a> ListView<'a> {
    fn new(base: View<'a>, elem: &'a TypeNode, count: usize, rest: &'a [u8], tabled: bool) -> Self {
        let (placement, payload) = match wire_size(elem) {
            Some(size) => (Placement::Stride(size), rest),
            None if tabled => {
                let table_len = count
                    .checked_mul(WIRE_USIZE_BYTES)
                    .filter(|&len| len <= rest.len())
                    .unwrap_or_else(|| corrupt(format_args!("list of {} overruns buffer", count)));
                (Placement::Table(&rest[..table_len]), &rest[table_len..])
            }
            None => (Placement::Scan, rest),
        };
        Self {
            elem,
            count,
            placement,
            payload,
            base,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn element_type(&self) -> &'a TypeNode {
        self.elem
    }

    /// Element `index`, decoded on demand. Panics when out of bounds.
    pub fn get(&self, index: usize) -> View<'a> {
        if index >= self.count {
            corrupt(format_args!("element {} out of bounds ({} elements)", index, self.count));
        }
        let (start, end) = match self.placement {
            Placement::Stride(size) => (index * size, (index + 1) * size),
            Placement::Table(table) => {
                let start = if index == 0 { 0 } else { table_entry(table, index - 1) };
                (start, table_entry(table, index))
            }
            Placement::Scan => {
                let mut start = 0;
                for _ in 0..index {
                    start += encoded_len(self.elem, &self.payload[start..]);
                }
                (start, start + encoded_len(self.elem, &self.payload[start..]))
            }
        };
        self.base.child(self.elem, slice(self.payload, start, end))
    }

    pub fn iter(&self) -> impl Iterator<Item = View<'a>> + 'a {
        let this = *self;
        (0..self.count).map(move |i| this.get(i))
    }
}

fn slice(bytes: &[u8], start: usize, end: usize) -> &[u8] {
    if start > end || end > bytes.len() {
        corrupt(format_args!(
            "element range {}..{} outside {} bytes",
            start,
            end,
            bytes.len()
        ));
    }
    &bytes[start..end]
}

// ---------------------------------------------------------------------------
// MapView
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy)]
enum FixedSide {
    Key(usize),
    Value(usize),
}

#[derive(Debug, Clone, Copy)]
enum EntryPlacement<'a> {
    Packed { key: usize, value: usize },
    /// One end offset per entry; one side is statically sized.
    Entry { table: &'a [u8], fixed: FixedSide },
    /// Two end offsets per entry (key end, value end).
    Pair { table: &'a [u8] },
}

/// Entries of a map, in encoded order.
#[derive(Debug, Clone, Copy)]
pub struct MapView<'a> {
    key_ty: &'a TypeNode,
    value_ty: &'a TypeNode,
    count: usize,
    placement: EntryPlacement<'a>,
    payload: &'a [u8],
    base: View<'a>,
}

impl<'a> MapView<'a> {
    fn new(
        base: View<'a>,
        key_ty: &'a TypeNode,
        value_ty: &'a TypeNode,
        count: usize,
        rest: &'a [u8],
    ) -> Self {
        let split = |per_entry: usize| {
            let table_len = count
                .checked_mul(per_entry * WIRE_USIZE_BYTES)
                .filter(|&len| len <= rest.len())
                .unwrap_or_else(|| corrupt(format_args!("map of {} overruns buffer", count)));
            (&rest[..table_len], &rest[table_len..])
        };
        let (placement, payload) = match (wire_size(key_ty), wire_size(value_ty)) {
            (Some(key), Some(value)) => (EntryPlacement::Packed { key, value }, rest),
            (None, None) => {
                let (table, payload) = split(2);
                (EntryPlacement::Pair { table }, payload)
            }
            (Some(key), None) => {
                let (table, payload) = split(1);
                let fixed = FixedSide::Key(key);
                (EntryPlacement::Entry { table, fixed }, payload)
            }
            (None, Some(value)) => {
                let (table, payload) = split(1);
                let fixed = FixedSide::Value(value);
                (EntryPlacement::Entry { table, fixed }, payload)
            }
        };
        Self {
            key_ty,
            value_ty,
            count,
            placement,
            payload,
            base,
        }
    }

    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Entry `index` as `(key, value)`. Panics when out of bounds.
    pub fn get(&self, index: usize) -> (View<'a>, View<'a>) {
        if index >= self.count {
            corrupt(format_args!("entry {} out of bounds ({} entries)", index, self.count));
        }
        let (key_range, value_range) = match self.placement {
            EntryPlacement::Packed { key, value } => {
                let start = index * (key + value);
                ((start, start + key), (start + key, start + key + value))
            }
            EntryPlacement::Entry { table, fixed } => {
                let start = if index == 0 { 0 } else { table_entry(table, index - 1) };
                let end = table_entry(table, index);
                let split = match fixed {
                    FixedSide::Key(key) => start + key,
                    FixedSide::Value(value) => end.checked_sub(value).unwrap_or_else(|| {
                        corrupt(format_args!("map entry end {} shorter than value", end))
                    }),
                };
                ((start, split), (split, end))
            }
            EntryPlacement::Pair { table } => {
                let start = if index == 0 {
                    0
                } else {
                    table_entry(table, 2 * index - 1)
                };
                let key_end = table_entry(table, 2 * index);
                let value_end = table_entry(table, 2 * index + 1);
                ((start, key_end), (key_end, value_end))
            }
        };
        (
            self.base.child(self.key_ty, slice(self.payload, key_range.0, key_range.1)),
            self.base
                .child(self.value_ty, slice(self.payload, value_range.0, value_range.1)),
        )
    }

    pub fn iter(&self) -> impl Iterator<Item = (View<'a>, View<'a>)> + 'a {
        let this = *self;
        (0..self.count).map(move |i| this.get(i))
    }

    /// Value stored under `key`, compared by encoded bytes.
    pub fn find(&self, key: &Value) -> Option<View<'a>> {
        let probe = encode(self.key_ty, key).ok()?;
        self.iter()
            .find(|(k, _)| k.encoded() == probe.as_slice())
            .map(|(_, v)| v)
    }
}

// ---------------------------------------------------------------------------
// UnionView / RefView / ObjectRef
// ---------------------------------------------------------------------------

/// Active field of a union.
#[derive(Debug, Clone, Copy)]
pub struct UnionView<'a> {
    field: &'a Field,
    ordinal: usize,
    value: View<'a>,
}

impl<'a> UnionView<'a> {
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    pub fn name(&self) -> &'a str {
        &self.field.name
    }

    pub fn value(&self) -> View<'a> {
        self.value
    }
}

/// Reference read out of a view, bound to the index the view came from.
#[derive(Debug, Clone, Copy)]
pub struct RefView<'a> {
    target: TypeId,
    id: ObjectId,
    index: Option<&'a ObjectIndex>,
}

impl<'a> RefView<'a> {
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn target(&self) -> TypeId {
        self.target
    }

    /// Look the target up now; `None` until it has been put.
    pub fn resolve(&self) -> Option<ObjectView<'a>> {
        self.index?.lookup(self.target, self.id)
    }

    /// Index-independent form, resolvable later against any index.
    pub fn detach(&self) -> ObjectRef {
        ObjectRef {
            target: self.target,
            id: self.id,
        }
    }
}

/// Detached reference: just the target type and id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub target: TypeId,
    pub id: ObjectId,
}

impl ObjectRef {
    pub fn resolve<'i>(&self, index: &'i ObjectIndex) -> Option<ObjectView<'i>> {
        index.lookup(self.target, self.id)
    }
}

// ---------------------------------------------------------------------------
// ObjectView
// ---------------------------------------------------------------------------

/// A stored object, seen through the version it was written with.
#[derive(Debug, Clone, Copy)]
pub enum ObjectView<'a> {
    Known { version: u16, view: View<'a> },
    /// Written by a newer schema than this process knows.
    Unknown { version: u16, bytes: &'a [u8] },
}

impl<'a> ObjectView<'a> {
    pub fn version(&self) -> u16 {
        match self {
            Self::Known { version, .. } | Self::Unknown { version, .. } => *version,
        }
    }

    pub fn view(&self) -> Option<View<'a>> {
        match self {
            Self::Known { view, .. } => Some(*view),
            Self::Unknown { .. } => None,
        }
    }

    pub fn is_known(&self) -> bool {
        matches!(self, Self::Known { .. })
    }
}

pub(crate) fn read_info<'a>(
    info: &'a ObjectInfo,
    bytes: &'a [u8],
    index: Option<&'a ObjectIndex>,
) -> ObjectView<'a> {
    let mut cursor = Cursor::new(bytes);
    let version = cursor.read_u16().or_corrupt();
    let body = &bytes[WIRE_VERSION_BYTES..];
    match info.version(version) {
        Some(ty) => ObjectView::Known {
            version,
            view: View::bound(ty, body, index),
        },
        None => {
            log::trace!(
                "[CODEC] {}::{} v{} is newer than the {} known versions",
                info.scheme_name(),
                info.name(),
                version,
                info.versions().len()
            );
            ObjectView::Unknown {
                version,
                bytes: body,
            }
        }
    }
}

/// Read an object written by `encode_object`, with no index bound.
pub fn read_object<'a>(
    schema: &'a SchemaSet,
    object: ObjectType,
    bytes: &'a [u8],
) -> Result<ObjectView<'a>> {
    let info = schema.object_info(object.id())?;
    Ok(read_info(info, bytes, None))
}
