// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Tag/payload placement for unions.

use super::round_up;

/// Where a union's discriminant and shared payload region land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnionPlacement {
    /// Offset of the discriminant, `None` for untagged unions.
    pub tag_offset: Option<usize>,
    /// Offset shared by every field.
    pub payload_offset: usize,
    pub size: usize,
    pub align: usize,
}

/// Place a union given its discriminant `(size, align)` and the
/// `(size, align)` of each field.
///
/// When the discriminant is at least as aligned as the most aligned field it
/// goes first and the payload follows it. Otherwise the payload goes first
/// and the discriminant follows the payload region padded to the payload
/// alignment, so no field is pushed off its alignment by a narrow tag.
pub fn place_union(tag: Option<(usize, usize)>, fields: &[(usize, usize)]) -> UnionPlacement {
    let payload_size = fields.iter().map(|&(size, _)| size).max().unwrap_or(0);
    let payload_align = fields.iter().map(|&(_, align)| align).max().unwrap_or(1).max(1);

    let Some((tag_size, tag_align)) = tag else {
        return UnionPlacement {
            tag_offset: None,
            payload_offset: 0,
            size: round_up(payload_size, payload_align),
            align: payload_align,
        };
    };

    let align = payload_align.max(tag_align);
    if tag_align >= payload_align {
        let payload_offset = round_up(tag_size, payload_align);
        UnionPlacement {
            tag_offset: Some(0),
            payload_offset,
            size: round_up(payload_offset + payload_size, align),
            align,
        }
    } else {
        let tag_offset = round_up(payload_size, payload_align);
        UnionPlacement {
            tag_offset: Some(tag_offset),
            payload_offset: 0,
            size: round_up(tag_offset + tag_size, align),
            align,
        }
    }
}
