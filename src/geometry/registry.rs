// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Interning surface registry

use super::surface::{GeometryError, Surface, SurfaceKind};
use crate::region::SignedSurfaceId;
use ahash::AHashMap;

/// Fast lookup key: kind tag plus leading coefficients rounded to 1e-6.
/// Narrows the candidate set before the tolerance comparison; collisions are
/// resolved by the full test, misses at the rounding boundary only cost an
/// extra entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BucketKey {
    tag: u8,
    coeffs: [i64; 4],
}

impl BucketKey {
    fn of(kind: &SurfaceKind) -> Self {
        let mut coeffs = [0i64; 4];
        for (slot, c) in coeffs.iter_mut().zip(kind.leading_coefficients()) {
            *slot = (c / 1e-6).round() as i64;
        }
        Self { tag: kind.tag(), coeffs }
    }
}

/// Interning table mapping numeric ids to surface primitives.
///
/// Registration folds exact duplicates onto the existing id and mirror-image
/// duplicates onto the negated existing id; the table grows monotonically and
/// entries are never removed. Ids start at 1.
#[derive(Debug, Default, Clone)]
pub struct SurfaceRegistry {
    surfaces: Vec<Surface>,
    buckets: AHashMap<BucketKey, Vec<u32>>,
}

impl SurfaceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a primitive, interning duplicates.
    ///
    /// Returns the canonical signed id: positive for a fresh or exact-match
    /// registration, negative when the candidate is the mirror image of an
    /// already-registered surface. Degenerate geometry is rejected with
    /// [`GeometryError::InvalidPrimitive`].
    pub fn register(&mut self, kind: SurfaceKind) -> Result<SignedSurfaceId, GeometryError> {
        let kind = kind.canonicalized()?;
        let key = BucketKey::of(&kind);

        if let Some(bucket) = self.buckets.get(&key) {
            for &id in bucket {
                if self.surface(id).kind.approx_eq(&kind) {
                    return Ok(id as SignedSurfaceId);
                }
            }
            for &id in bucket {
                if self.surface(id).kind.is_mirror_of(&kind) {
                    let signed = -(id as SignedSurfaceId);
                    self.surfaces[(id - 1) as usize].mirror_of = Some(signed);
                    return Ok(signed);
                }
            }
        }

        let id = self.surfaces.len() as u32 + 1;
        self.surfaces.push(Surface {
            id,
            kind,
            mirror_of: None,
        });
        self.buckets.entry(key).or_default().push(id);
        Ok(id as SignedSurfaceId)
    }

    /// Resolve a signed or unsigned id by magnitude.
    pub fn resolve(&self, id: SignedSurfaceId) -> Result<&Surface, GeometryError> {
        let index = id.unsigned_abs() as usize;
        if index == 0 || index > self.surfaces.len() {
            return Err(GeometryError::UnknownSurface(id));
        }
        Ok(&self.surfaces[index - 1])
    }

    /// Number of distinct registered surfaces.
    pub fn len(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surfaces.is_empty()
    }

    /// Registered surfaces in id order.
    pub fn iter(&self) -> impl Iterator<Item = &Surface> {
        self.surfaces.iter()
    }

    fn surface(&self, id: u32) -> &Surface {
        &self.surfaces[(id - 1) as usize]
    }
}
