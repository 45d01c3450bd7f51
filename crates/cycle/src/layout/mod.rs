// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Native memory layout of type nodes.
//!
//! A [`LayoutNode`] tree mirrors the [`TypeNode`] tree one-to-one: child `i`
//! of a struct layout is the layout of field `i` in declaration order, with
//! its `offset` reflecting where alignment-descending placement put it.
//!
//! The wire encoding is independent of this; see `codec`.

mod union;

pub use union::{place_union, UnionPlacement};

use std::collections::HashMap;
use std::fmt;

use cycle_schema::{IntWidth, SchemaSet, TypeId, TypeNode};

use crate::config::{NATIVE_HANDLE_ALIGN, NATIVE_HANDLE_SIZE, REFERENCE_ALIGN, REFERENCE_BYTES};

/// Round `value` up to a multiple of `align` (`align >= 1`).
pub(crate) const fn round_up(value: usize, align: usize) -> usize {
    value.div_ceil(align) * align
}

/// Size/alignment/offset plan for one type node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayoutNode {
    size: usize,
    align: usize,
    offset: usize,
    variable: bool,
    children: Vec<LayoutNode>,
    tag: Option<Box<LayoutNode>>,
    flag: Option<usize>,
}

impl LayoutNode {
    fn leaf(size: usize, align: usize) -> Self {
        Self {
            size,
            align,
            offset: 0,
            variable: false,
            children: Vec::new(),
            tag: None,
            flag: None,
        }
    }

    /// Total size, including trailing padding.
    pub fn size(&self) -> usize {
        self.size
    }

    pub fn align(&self) -> usize {
        self.align
    }

    /// Offset within the parent aggregate (0 at the root).
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// True for string/list/map heads, whose contents live out of line.
    pub fn is_variable(&self) -> bool {
        self.variable
    }

    /// Children in declaration order.
    pub fn children(&self) -> &[LayoutNode] {
        &self.children
    }

    pub fn child(&self, index: usize) -> Option<&LayoutNode> {
        self.children.get(index)
    }

    /// Discriminant layout of a tagged union.
    pub fn tag(&self) -> Option<&LayoutNode> {
        self.tag.as_deref()
    }

    /// Offset of an optional's presence flag, relative to the optional.
    pub fn flag_offset(&self) -> Option<usize> {
        self.flag
    }
}

/// Largest size a layout may have; keeps every offset computation in range.
pub const MAX_LAYOUT_SIZE: usize = isize::MAX as usize;

/// Errors of layout computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayoutError {
    /// Native size exceeds [`MAX_LAYOUT_SIZE`].
    TooLarge,
}

impl fmt::Display for LayoutError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LayoutError::TooLarge => {
                write!(f, "native layout larger than {} bytes", MAX_LAYOUT_SIZE)
            }
        }
    }
}

impl std::error::Error for LayoutError {}

/// Result alias for layout computation.
pub type Result<T> = std::result::Result<T, LayoutError>;

fn bounded(size: Option<usize>) -> Result<usize> {
    size.filter(|&s| s <= MAX_LAYOUT_SIZE).ok_or(LayoutError::TooLarge)
}

/// Compute the native layout of `ty`.
pub fn compute_layout(ty: &TypeNode) -> Result<LayoutNode> {
    let node = match ty {
        TypeNode::Void => LayoutNode::leaf(0, 1),
        TypeNode::Bool => LayoutNode::leaf(1, 1),
        TypeNode::Int { width, .. } => LayoutNode::leaf(width.bytes(), width.bytes()),
        TypeNode::Float { width } => LayoutNode::leaf(width.bytes(), width.bytes()),
        TypeNode::String => handle(Vec::new()),
        TypeNode::List { child } => handle(vec![compute_layout(child)?]),
        TypeNode::Map { key, value } => handle(vec![compute_layout(key)?, compute_layout(value)?]),
        TypeNode::Optional { child } => {
            let payload = compute_layout(child)?;
            let size = if payload.size > 0 {
                bounded(Some(round_up(payload.size + 1, payload.align)))?
            } else {
                1
            };
            LayoutNode {
                size,
                align: payload.align,
                offset: 0,
                variable: false,
                flag: Some(payload.size),
                children: vec![payload],
                tag: None,
            }
        }
        TypeNode::Array { child, len } => {
            let element = compute_layout(child)?;
            LayoutNode {
                size: bounded(element.size.checked_mul(*len))?,
                align: element.align,
                offset: 0,
                variable: false,
                children: vec![element],
                tag: None,
                flag: None,
            }
        }
        TypeNode::Reference(_) => LayoutNode::leaf(REFERENCE_BYTES, REFERENCE_ALIGN),
        TypeNode::Struct { fields } => aggregate(
            fields
                .iter()
                .map(|f| compute_layout(&f.ty))
                .collect::<Result<_>>()?,
        )?,
        TypeNode::Tuple { fields } => {
            aggregate(fields.iter().map(compute_layout).collect::<Result<_>>()?)?
        }
        TypeNode::Enum { variants } => {
            let bytes = IntWidth::for_count(variants.len()).bytes();
            LayoutNode::leaf(bytes, bytes)
        }
        TypeNode::Union { fields, tagged } => {
            let mut children = fields
                .iter()
                .map(|f| compute_layout(&f.ty))
                .collect::<Result<Vec<_>>>()?;
            let tag = tagged.then(|| {
                let bytes = IntWidth::for_count(fields.len()).bytes();
                LayoutNode::leaf(bytes, bytes)
            });
            let shapes: Vec<(usize, usize)> = children.iter().map(|c| (c.size, c.align)).collect();
            let placement = place_union(tag.as_ref().map(|t| (t.size, t.align)), &shapes);
            for child in &mut children {
                child.offset = placement.payload_offset;
            }
            let tag = tag.map(|mut t| {
                t.offset = placement.tag_offset.unwrap_or(0);
                Box::new(t)
            });
            LayoutNode {
                size: bounded(Some(placement.size))?,
                align: placement.align,
                offset: 0,
                variable: false,
                children,
                tag,
                flag: None,
            }
        }
    };
    Ok(node)
}

fn handle(children: Vec<LayoutNode>) -> LayoutNode {
    LayoutNode {
        size: NATIVE_HANDLE_SIZE,
        align: NATIVE_HANDLE_ALIGN,
        offset: 0,
        variable: true,
        children,
        tag: None,
        flag: None,
    }
}

/// Place children by descending alignment (stable for ties) and pad the
/// total to the widest alignment.
fn aggregate(mut children: Vec<LayoutNode>) -> Result<LayoutNode> {
    let mut order: Vec<usize> = (0..children.len()).collect();
    order.sort_by(|&a, &b| children[b].align.cmp(&children[a].align));

    let mut offset = 0;
    let mut align = 1;
    for idx in order {
        let child = &mut children[idx];
        offset = round_up(offset, child.align);
        child.offset = offset;
        offset = bounded(offset.checked_add(child.size))?;
        align = align.max(child.align);
    }

    Ok(LayoutNode {
        size: bounded(Some(round_up(offset, align)))?,
        align,
        offset: 0,
        variable: false,
        children,
        tag: None,
        flag: None,
    })
}

// ---------------------------------------------------------------------------
// SchemaLayouts
// ---------------------------------------------------------------------------

/// Layouts of every version of every object type in a schema set.
#[derive(Debug, Clone, Default)]
pub struct SchemaLayouts {
    layouts: HashMap<TypeId, Vec<LayoutNode>>,
}

impl SchemaLayouts {
    pub fn compute(schema: &SchemaSet) -> Result<Self> {
        let mut layouts = HashMap::with_capacity(schema.object_count());
        for scheme in schema.schemes() {
            for object in scheme.objects() {
                let versions = object
                    .versions()
                    .iter()
                    .map(compute_layout)
                    .collect::<Result<Vec<_>>>()
                    .map_err(|e| {
                        log::warn!("[LAYOUT] {}::{}: {}", object.scheme_name(), object.name(), e);
                        e
                    })?;
                layouts.insert(object.id(), versions);
            }
        }
        log::debug!("[LAYOUT] computed layouts for {} object types", layouts.len());
        Ok(Self { layouts })
    }

    pub fn layout(&self, id: TypeId, version: u16) -> Option<&LayoutNode> {
        self.layouts.get(&id)?.get(usize::from(version))
    }

    pub fn latest(&self, id: TypeId) -> Option<&LayoutNode> {
        self.layouts.get(&id)?.last()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cycle_schema::{ObjectDef, SchemeDef};

    fn offsets(node: &LayoutNode) -> Vec<usize> {
        node.children().iter().map(LayoutNode::offset).collect()
    }

    #[test]
    fn test_struct_reordering() {
        let ty = TypeNode::structure([
            ("a", TypeNode::u32()),
            ("b", TypeNode::u8()),
            ("c", TypeNode::u16()),
            ("d", TypeNode::u64()),
        ]);
        let layout = compute_layout(&ty).unwrap();
        assert_eq!(layout.size(), 16);
        assert_eq!(layout.align(), 8);
        assert_eq!(offsets(&layout), [8, 14, 12, 0]);
    }

    #[test]
    fn test_stable_ties() {
        let ty =
            TypeNode::tuple([TypeNode::u16(), TypeNode::u8(), TypeNode::i16(), TypeNode::Bool]);
        let layout = compute_layout(&ty).unwrap();
        assert_eq!(offsets(&layout), [0, 4, 2, 5]);
        assert_eq!(layout.size(), 6);
    }

    #[test]
    fn test_empty_aggregate() {
        let layout = compute_layout(&TypeNode::Struct { fields: vec![] }).unwrap();
        assert_eq!((layout.size(), layout.align()), (0, 1));
    }

    #[test]
    fn test_optional() {
        let layout = compute_layout(&TypeNode::optional(TypeNode::u32())).unwrap();
        assert_eq!((layout.size(), layout.align()), (8, 4));
        assert_eq!(layout.flag_offset(), Some(4));

        let layout = compute_layout(&TypeNode::optional(TypeNode::Void)).unwrap();
        assert_eq!((layout.size(), layout.align()), (1, 1));
        assert_eq!(layout.flag_offset(), Some(0));

        let layout = compute_layout(&TypeNode::optional(TypeNode::u8())).unwrap();
        assert_eq!(layout.size(), 2);
        assert_eq!(layout.flag_offset(), Some(1));
    }

    #[test]
    fn test_containers_are_handles() {
        for ty in [
            TypeNode::string(),
            TypeNode::list(TypeNode::u64()),
            TypeNode::map(TypeNode::string(), TypeNode::u8()),
        ] {
            let layout = compute_layout(&ty).unwrap();
            assert!(layout.is_variable());
            assert_eq!(layout.size(), NATIVE_HANDLE_SIZE);
        }
        let layout = compute_layout(&TypeNode::map(TypeNode::u8(), TypeNode::u32())).unwrap();
        assert_eq!(layout.children().len(), 2);
        assert!(layout.children().iter().all(|c| c.offset() == 0));
    }

    #[test]
    fn test_array_enum_reference() {
        let layout = compute_layout(&TypeNode::array(TypeNode::u16(), 5)).unwrap();
        assert_eq!((layout.size(), layout.align()), (10, 2));

        let variants: Vec<String> = (0..300).map(|i| format!("v{}", i)).collect();
        let layout = compute_layout(&TypeNode::enumeration(variants)).unwrap();
        assert_eq!(layout.size(), 2);
        let layout = compute_layout(&TypeNode::enumeration(["a", "b"])).unwrap();
        assert_eq!(layout.size(), 1);

        let layout = compute_layout(&TypeNode::reference("Self")).unwrap();
        assert_eq!((layout.size(), layout.align()), (8, 8));
    }

    #[test]
    fn test_union_layout() {
        let ty = TypeNode::union([("small", TypeNode::u8()), ("big", TypeNode::u32())]);
        let layout = compute_layout(&ty).unwrap();
        assert_eq!(layout.size(), 8);
        assert_eq!(layout.tag().map(LayoutNode::offset), Some(4));
        assert_eq!(offsets(&layout), [0, 0]);

        let ty = TypeNode::untagged_union([("a", TypeNode::u16()), ("b", TypeNode::f64())]);
        let layout = compute_layout(&ty).unwrap();
        assert!(layout.tag().is_none());
        assert_eq!((layout.size(), layout.align()), (8, 8));
    }

    #[test]
    fn test_schema_layouts() {
        let set = SchemaSet::builder()
            .scheme(SchemeDef::new("ui").object(
                ObjectDef::new("P")
                    .version(TypeNode::structure([("x", TypeNode::u8())]))
                    .version(TypeNode::structure([
                        ("x", TypeNode::u8()),
                        ("y", TypeNode::u64()),
                    ])),
            ))
            .build()
            .unwrap();
        let layouts = SchemaLayouts::compute(&set).unwrap();
        let id = set.object_type("ui", "P").unwrap().id();
        assert_eq!(layouts.layout(id, 0).map(LayoutNode::size), Some(1));
        assert_eq!(layouts.latest(id).map(LayoutNode::size), Some(16));
        assert!(layouts.layout(id, 2).is_none());
    }

    #[test]
    fn test_oversized_layouts_are_rejected() {
        let huge = TypeNode::array(TypeNode::u64(), usize::MAX / 4);
        assert_eq!(compute_layout(&huge), Err(LayoutError::TooLarge));

        let half = TypeNode::array(TypeNode::u8(), MAX_LAYOUT_SIZE / 2 + 1);
        assert!(compute_layout(&half).is_ok());
        let pair = TypeNode::structure([("a", half.clone()), ("b", half)]);
        assert_eq!(compute_layout(&pair), Err(LayoutError::TooLarge));
        assert_eq!(compute_layout(&TypeNode::list(pair)), Err(LayoutError::TooLarge));

        let set = SchemaSet::builder()
            .scheme(SchemeDef::new("big").object(ObjectDef::single(
                "Blob",
                TypeNode::structure([("data", huge)]),
            )))
            .build()
            .unwrap();
        assert_eq!(SchemaLayouts::compute(&set).unwrap_err(), LayoutError::TooLarge);
    }
}
