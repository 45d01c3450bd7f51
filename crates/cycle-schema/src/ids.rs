// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Object and type identities.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Scheme/object-type pair a buffer conforms to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TypeId {
    pub scheme: u32,
    pub name: u32,
}

impl TypeId {
    pub const fn new(scheme: u32, name: u32) -> Self {
        Self { scheme, name }
    }
}

impl fmt::Display for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.scheme, self.name)
    }
}

/// Identity of one object instance.
///
/// Only `source` and `name` travel as the 64-bit key; the scheme is implied
/// by the type the object is stored under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ObjectId {
    pub scheme: u32,
    pub source: u32,
    pub name: u32,
}

impl ObjectId {
    pub const fn new(scheme: u32, source: u32, name: u32) -> Self {
        Self {
            scheme,
            source,
            name,
        }
    }

    /// 64-bit key: `source << 32 | name`.
    pub const fn to_bits(self) -> u64 {
        ((self.source as u64) << 32) | self.name as u64
    }

    /// Rebuild an id from its key and the scheme it belongs to.
    pub const fn from_bits(scheme: u32, bits: u64) -> Self {
        Self {
            scheme,
            source: (bits >> 32) as u32,
            name: bits as u32,
        }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{:x}.{:x}", self.scheme, self.source, self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bits_layout() {
        let id = ObjectId::new(3, 0xAABB_CCDD, 0x1122_3344);
        assert_eq!(id.to_bits(), 0xAABB_CCDD_1122_3344);
        assert_eq!(ObjectId::from_bits(3, id.to_bits()), id);
    }

    #[test]
    fn test_scheme_not_in_bits() {
        let a = ObjectId::new(1, 7, 9);
        let b = ObjectId::new(2, 7, 9);
        assert_eq!(a.to_bits(), b.to_bits());
        assert_ne!(a, b);
    }
}
