// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Region expression tree definitions

use crate::geometry::{GeometryError, SurfaceRegistry};
use nalgebra::Point3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Signed reference to one surface; the sign selects the half-space.
pub type SignedSurfaceId = i32;

/// A CSG region as a boolean combination of surface half-spaces.
///
/// `Literal(id)` with `id > 0` denotes the positive side of surface `id`,
/// `id < 0` the negative side. Complement has no node of its own; it is
/// expanded through De Morgan at construction time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegionExpr {
    Literal(SignedSurfaceId),
    Intersection(Box<RegionExpr>, Box<RegionExpr>),
    Union(Box<RegionExpr>, Box<RegionExpr>),
}

impl RegionExpr {
    /// Intersection of two regions
    pub fn and(self, other: RegionExpr) -> RegionExpr {
        RegionExpr::Intersection(Box::new(self), Box::new(other))
    }

    /// Union of two regions
    pub fn or(self, other: RegionExpr) -> RegionExpr {
        RegionExpr::Union(Box::new(self), Box::new(other))
    }

    /// Complement as a new tree: De Morgan swap with every literal sign
    /// flipped. Never fails and leaves `self` untouched.
    pub fn complement(&self) -> RegionExpr {
        match self {
            RegionExpr::Literal(id) => RegionExpr::Literal(-id),
            RegionExpr::Intersection(a, b) => {
                RegionExpr::Union(Box::new(a.complement()), Box::new(b.complement()))
            }
            RegionExpr::Union(a, b) => {
                RegionExpr::Intersection(Box::new(a.complement()), Box::new(b.complement()))
            }
        }
    }

    /// Sorted distinct surface ids referenced by the tree.
    pub fn surface_ids(&self) -> BTreeSet<u32> {
        let mut ids = BTreeSet::new();
        self.collect_ids(&mut ids);
        ids
    }

    fn collect_ids(&self, ids: &mut BTreeSet<u32>) {
        match self {
            RegionExpr::Literal(id) => {
                ids.insert(id.unsigned_abs());
            }
            RegionExpr::Intersection(a, b) | RegionExpr::Union(a, b) => {
                a.collect_ids(ids);
                b.collect_ids(ids);
            }
        }
    }

    /// Point-membership test against registered surfaces.
    ///
    /// Resolves every literal through the registry, evaluates the side test
    /// and folds AND/OR along the tree. O(n) in node count.
    pub fn contains(
        &self,
        point: &Point3<f64>,
        registry: &SurfaceRegistry,
    ) -> Result<bool, GeometryError> {
        match self {
            RegionExpr::Literal(id) => {
                let surface = registry.resolve(*id)?;
                let positive = surface.kind.sense(point);
                Ok(if *id > 0 { positive } else { !positive })
            }
            RegionExpr::Intersection(a, b) => {
                Ok(a.contains(point, registry)? && b.contains(point, registry)?)
            }
            RegionExpr::Union(a, b) => {
                Ok(a.contains(point, registry)? || b.contains(point, registry)?)
            }
        }
    }

    /// Evaluate against a sign assignment instead of real geometry.
    ///
    /// `ids` is the sorted variable set (as produced by [`surface_ids`]);
    /// bit `i` of `signs` gives the truth of the positive side of `ids[i]`.
    /// Every literal in the tree must appear in `ids`; a missing id is a
    /// broken invariant, not recoverable input.
    ///
    /// [`surface_ids`]: RegionExpr::surface_ids
    pub fn eval_assignment(&self, ids: &[u32], signs: u64) -> bool {
        match self {
            RegionExpr::Literal(id) => {
                let idx = ids
                    .binary_search(&id.unsigned_abs())
                    .expect("literal id missing from variable set");
                let positive = (signs >> idx) & 1 == 1;
                if *id > 0 {
                    positive
                } else {
                    !positive
                }
            }
            RegionExpr::Intersection(a, b) => {
                a.eval_assignment(ids, signs) && b.eval_assignment(ids, signs)
            }
            RegionExpr::Union(a, b) => {
                a.eval_assignment(ids, signs) || b.eval_assignment(ids, signs)
            }
        }
    }

    /// Structural equality up to child order within same-operator chains.
    ///
    /// Flattens nested Intersection/Union runs, sorts the operands and
    /// compares. This is a shape check, not semantic equivalence, and never
    /// identity: `1 2` and `2 1` match, `1 2` and `2 : 1 2` do not.
    pub fn same_shape(&self, other: &RegionExpr) -> bool {
        Normalized::from(self) == Normalized::from(other)
    }
}

/// Canonical n-ary form used by [`RegionExpr::same_shape`].
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Normalized {
    Lit(SignedSurfaceId),
    All(Vec<Normalized>),
    Any(Vec<Normalized>),
}

impl Normalized {
    fn from(expr: &RegionExpr) -> Normalized {
        match expr {
            RegionExpr::Literal(id) => Normalized::Lit(*id),
            RegionExpr::Intersection(..) => {
                let mut parts = Vec::new();
                flatten(expr, true, &mut parts);
                parts.sort();
                Normalized::All(parts)
            }
            RegionExpr::Union(..) => {
                let mut parts = Vec::new();
                flatten(expr, false, &mut parts);
                parts.sort();
                Normalized::Any(parts)
            }
        }
    }
}

fn flatten(expr: &RegionExpr, conjunctive: bool, out: &mut Vec<Normalized>) {
    match expr {
        RegionExpr::Intersection(a, b) if conjunctive => {
            flatten(a, true, out);
            flatten(b, true, out);
        }
        RegionExpr::Union(a, b) if !conjunctive => {
            flatten(a, false, out);
            flatten(b, false, out);
        }
        _ => out.push(Normalized::from(expr)),
    }
}

impl fmt::Display for RegionExpr {
    /// Serializes back to the textual grammar: `:` for union, juxtaposition
    /// for intersection, parentheses where precedence demands them.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RegionExpr::Literal(id) => write!(f, "{id}"),
            RegionExpr::Intersection(a, b) => {
                fmt_term(a, f)?;
                write!(f, " ")?;
                fmt_term(b, f)
            }
            RegionExpr::Union(a, b) => write!(f, "{a} : {b}"),
        }
    }
}

fn fmt_term(expr: &RegionExpr, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if matches!(expr, RegionExpr::Union(..)) {
        write!(f, "({expr})")
    } else {
        write!(f, "{expr}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::SurfaceKind;

    fn slab_registry() -> SurfaceRegistry {
        let mut registry = SurfaceRegistry::new();
        registry.register(SurfaceKind::plane_y(0.0)).unwrap();
        registry.register(SurfaceKind::plane_y(1.0)).unwrap();
        registry
    }

    #[test]
    fn test_contains_intersection() {
        let registry = slab_registry();
        let slab = RegionExpr::Literal(1).and(RegionExpr::Literal(-2));

        assert!(slab.contains(&Point3::new(0.0, 0.5, 0.0), &registry).unwrap());
        assert!(!slab.contains(&Point3::new(0.0, 1.5, 0.0), &registry).unwrap());
        assert!(!slab.contains(&Point3::new(0.0, -0.5, 0.0), &registry).unwrap());
    }

    #[test]
    fn test_complement_flips_membership() {
        let registry = slab_registry();
        let slab = RegionExpr::Literal(1).and(RegionExpr::Literal(-2));
        let outside = slab.complement();

        for y in [-0.5, 0.5, 1.5] {
            let p = Point3::new(0.0, y, 0.0);
            assert_ne!(
                slab.contains(&p, &registry).unwrap(),
                outside.contains(&p, &registry).unwrap()
            );
        }
    }

    #[test]
    fn test_complement_is_de_morgan() {
        let expr = RegionExpr::Literal(1).and(RegionExpr::Literal(-2));
        let expected = RegionExpr::Literal(-1).or(RegionExpr::Literal(2));
        assert_eq!(expr.complement(), expected);
    }

    #[test]
    fn test_surface_ids_sorted_distinct() {
        let expr = RegionExpr::Literal(3)
            .and(RegionExpr::Literal(-1))
            .or(RegionExpr::Literal(3));
        let ids: Vec<u32> = expr.surface_ids().into_iter().collect();
        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_eval_assignment() {
        let expr = RegionExpr::Literal(1).and(RegionExpr::Literal(-2));
        let ids = [1u32, 2u32];
        assert!(expr.eval_assignment(&ids, 0b01));
        assert!(!expr.eval_assignment(&ids, 0b11));
        assert!(!expr.eval_assignment(&ids, 0b00));
    }

    #[test]
    fn test_same_shape_ignores_operand_order() {
        let a = RegionExpr::Literal(1).and(RegionExpr::Literal(-2));
        let b = RegionExpr::Literal(-2).and(RegionExpr::Literal(1));
        assert!(a.same_shape(&b));
        assert!(!a.same_shape(&a.complement()));
    }

    #[test]
    fn test_same_shape_flattens_chains() {
        let left = RegionExpr::Literal(1)
            .and(RegionExpr::Literal(2))
            .and(RegionExpr::Literal(3));
        let right = RegionExpr::Literal(3)
            .and(RegionExpr::Literal(1).and(RegionExpr::Literal(2)));
        assert!(left.same_shape(&right));
    }

    #[test]
    fn test_display_parenthesizes_unions() {
        let expr = RegionExpr::Literal(1)
            .or(RegionExpr::Literal(2))
            .and(RegionExpr::Literal(-3));
        assert_eq!(expr.to_string(), "(1 : 2) -3");
    }
}
