// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Model facade: one surface registry plus the named-region table
//!
//! Process-wide state with a two-phase lifecycle: an unbounded build phase
//! (register surfaces and regions, single writer) followed by a read-only
//! query phase (membership, minimization, tracking). Tests construct
//! isolated models instead of going through hidden global lookup.

use crate::geometry::{GeometryError, Surface, SurfaceKind, SurfaceRegistry};
use crate::minimize::{Minimized, MinimizeError, Minimizer};
use crate::region::{parse_region, ParseError, RegionExpr, SignedSurfaceId};
use crate::track::{track, Crossing};
use ahash::AHashMap;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors from model-level operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// Region name collision at registration.
    #[error("region name already registered: {0}")]
    DuplicateName(String),

    /// Region name was never registered.
    #[error("unknown region: {0}")]
    UnknownRegion(String),

    #[error(transparent)]
    Geometry(#[from] GeometryError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Minimize(#[from] MinimizeError),
}

/// A registered region: its tree and a derived outer bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedRegion {
    pub name: String,
    pub expr: RegionExpr,
    /// Intersection of the literals implied by every branch of `expr`;
    /// a superset of the region used to early-reject points while tracking.
    /// `None` when no literal is common to all branches.
    pub envelope: Option<RegionExpr>,
}

/// Main facade over the region-expression engine.
#[derive(Debug, Default, Clone)]
pub struct Model {
    surfaces: SurfaceRegistry,
    regions: Vec<NamedRegion>,
    names: AHashMap<String, usize>,
    minimizer: Minimizer,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry access for direct evaluation against [`RegionExpr`].
    pub fn surfaces(&self) -> &SurfaceRegistry {
        &self.surfaces
    }

    /// Registered regions in registration order.
    pub fn regions(&self) -> impl Iterator<Item = &NamedRegion> {
        self.regions.iter()
    }

    /// Register a surface primitive, interning duplicates and mirrors.
    pub fn register_surface(&mut self, kind: SurfaceKind) -> Result<SignedSurfaceId, ModelError> {
        Ok(self.surfaces.register(kind)?)
    }

    /// Resolve a registered surface by signed or unsigned id.
    pub fn resolve_surface(&self, id: SignedSurfaceId) -> Result<&Surface, ModelError> {
        Ok(self.surfaces.resolve(id)?)
    }

    /// Register a region under a unique name.
    ///
    /// Every literal is resolved eagerly, so stored regions always evaluate
    /// without an unknown-surface failure later.
    pub fn register_region(&mut self, name: &str, expr: RegionExpr) -> Result<(), ModelError> {
        if self.names.contains_key(name) {
            return Err(ModelError::DuplicateName(name.to_string()));
        }
        for id in expr.surface_ids() {
            self.surfaces.resolve(id as SignedSurfaceId)?;
        }
        let envelope = envelope_of(&expr);
        self.names.insert(name.to_string(), self.regions.len());
        self.regions.push(NamedRegion {
            name: name.to_string(),
            expr,
            envelope,
        });
        Ok(())
    }

    /// Parse a textual region expression and register it in one step. The
    /// entry point the component factories use.
    pub fn region_from_text(&mut self, name: &str, source: &str) -> Result<(), ModelError> {
        let expr = parse_region(source)?;
        self.register_region(name, expr)
    }

    pub fn region(&self, name: &str) -> Result<&NamedRegion, ModelError> {
        self.names
            .get(name)
            .map(|&i| &self.regions[i])
            .ok_or_else(|| ModelError::UnknownRegion(name.to_string()))
    }

    /// Point-membership test for a registered region.
    pub fn is_point_in_region(&self, name: &str, point: &Point3<f64>) -> Result<bool, ModelError> {
        let region = self.region(name)?;
        Ok(region.expr.contains(point, &self.surfaces)?)
    }

    /// First registered region containing the point, if any.
    pub fn locate(&self, point: &Point3<f64>) -> Result<Option<&str>, ModelError> {
        for region in &self.regions {
            if region.expr.contains(point, &self.surfaces)? {
                return Ok(Some(&region.name));
            }
        }
        Ok(None)
    }

    /// Minimize a tree against this model's variable ceiling.
    pub fn minimize(&self, expr: &RegionExpr) -> Result<Minimized, ModelError> {
        Ok(self.minimizer.minimize(expr)?)
    }

    /// Canonicalize a stored region in place.
    ///
    /// The stored tree is replaced (and its envelope re-derived) only when
    /// minimization produces a normal tree; a degenerate outcome is returned
    /// to the caller and the stored region is left untouched.
    pub fn minimize_region(&mut self, name: &str) -> Result<Minimized, ModelError> {
        let index = *self
            .names
            .get(name)
            .ok_or_else(|| ModelError::UnknownRegion(name.to_string()))?;
        let minimized = self.minimizer.minimize(&self.regions[index].expr)?;
        if let Minimized::Expr(expr) = &minimized {
            self.regions[index].envelope = envelope_of(expr);
            self.regions[index].expr = expr.clone();
        }
        Ok(minimized)
    }

    /// Track a ray through the named regions, in the given order.
    pub fn track(
        &self,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
        names: &[&str],
    ) -> Result<Vec<Crossing>, ModelError> {
        let mut selected: Vec<&NamedRegion> = Vec::with_capacity(names.len());
        for name in names {
            selected.push(self.region(name)?);
        }
        Ok(track(origin, direction, &selected, &self.surfaces)?)
    }

    /// Track a ray through every registered region.
    pub fn track_all(
        &self,
        origin: &Point3<f64>,
        direction: &Vector3<f64>,
    ) -> Result<Vec<Crossing>, ModelError> {
        let selected: Vec<&NamedRegion> = self.regions.iter().collect();
        Ok(track(origin, direction, &selected, &self.surfaces)?)
    }
}

/// Literals implied by the expression: conjuncts accumulate, union branches
/// keep only what both sides imply. Any point in the region satisfies every
/// returned literal, so their intersection is an outer bound.
fn implied_literals(expr: &RegionExpr) -> BTreeSet<SignedSurfaceId> {
    match expr {
        RegionExpr::Literal(id) => BTreeSet::from([*id]),
        RegionExpr::Intersection(a, b) => {
            let mut ids = implied_literals(a);
            ids.extend(implied_literals(b));
            ids
        }
        RegionExpr::Union(a, b) => implied_literals(a)
            .intersection(&implied_literals(b))
            .copied()
            .collect(),
    }
}

fn envelope_of(expr: &RegionExpr) -> Option<RegionExpr> {
    let mut literals = implied_literals(expr).into_iter();
    let first = RegionExpr::Literal(literals.next()?);
    Some(literals.fold(first, |acc, id| acc.and(RegionExpr::Literal(id))))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slab_model() -> Model {
        let mut model = Model::new();
        model.register_surface(SurfaceKind::plane_y(0.0)).unwrap();
        model.register_surface(SurfaceKind::plane_y(1.0)).unwrap();
        model.region_from_text("slab", "1 -2").unwrap();
        model
    }

    #[test]
    fn test_membership_through_the_facade() {
        let model = slab_model();
        assert!(model
            .is_point_in_region("slab", &Point3::new(0.0, 0.5, 0.0))
            .unwrap());
        assert!(!model
            .is_point_in_region("slab", &Point3::new(0.0, 1.5, 0.0))
            .unwrap());
    }

    #[test]
    fn test_duplicate_name_rejected() {
        let mut model = slab_model();
        let err = model.region_from_text("slab", "1").unwrap_err();
        assert_eq!(err, ModelError::DuplicateName("slab".into()));
    }

    #[test]
    fn test_unknown_region() {
        let model = slab_model();
        assert_eq!(
            model.is_point_in_region("nope", &Point3::origin()),
            Err(ModelError::UnknownRegion("nope".into()))
        );
    }

    #[test]
    fn test_region_with_unregistered_surface_rejected() {
        let mut model = slab_model();
        let err = model.region_from_text("bad", "1 -9").unwrap_err();
        assert_eq!(
            err,
            ModelError::Geometry(GeometryError::UnknownSurface(9))
        );
        assert!(model.region("bad").is_err());
    }

    #[test]
    fn test_locate_picks_first_registration() {
        let mut model = Model::new();
        for y in [0.0, 1.0, 2.0] {
            model.register_surface(SurfaceKind::plane_y(y)).unwrap();
        }
        model.region_from_text("lower", "1 -2").unwrap();
        model.region_from_text("upper", "2 -3").unwrap();

        assert_eq!(
            model.locate(&Point3::new(0.0, 0.5, 0.0)).unwrap(),
            Some("lower")
        );
        assert_eq!(
            model.locate(&Point3::new(0.0, 1.5, 0.0)).unwrap(),
            Some("upper")
        );
        assert_eq!(model.locate(&Point3::new(0.0, 5.0, 0.0)).unwrap(), None);
    }

    #[test]
    fn test_envelope_common_literals_only() {
        let expr = parse_region("1 2 : 1 3").unwrap();
        let envelope = envelope_of(&expr).unwrap();
        assert_eq!(envelope, RegionExpr::Literal(1));

        let unbounded = parse_region("1 : 2").unwrap();
        assert!(envelope_of(&unbounded).is_none());
    }

    #[test]
    fn test_envelope_is_outer_bound() {
        let mut model = Model::new();
        for y in [0.0, 1.0, 2.0] {
            model.register_surface(SurfaceKind::plane_y(y)).unwrap();
        }
        model.region_from_text("split", "1 -2 : 1 2 -3").unwrap();
        let region = model.region("split").unwrap();
        let envelope = region.envelope.as_ref().unwrap();

        for y in [-0.5, 0.5, 1.5, 2.5] {
            let p = Point3::new(0.0, y, 0.0);
            let inside = region.expr.contains(&p, model.surfaces()).unwrap();
            let bounded = envelope.contains(&p, model.surfaces()).unwrap();
            assert!(!inside || bounded, "envelope must contain the region");
        }
    }

    #[test]
    fn test_minimize_region_in_place() {
        let mut model = slab_model();
        model.region_from_text("padded", "1 -2 : 1 2").unwrap();
        let minimized = model.minimize_region("padded").unwrap();
        assert_eq!(minimized, Minimized::Expr(RegionExpr::Literal(1)));
        assert_eq!(model.region("padded").unwrap().expr, RegionExpr::Literal(1));
    }

    #[test]
    fn test_minimize_region_degenerate_left_untouched() {
        let mut model = slab_model();
        model.region_from_text("everything", "1 : -1").unwrap();
        let before = model.region("everything").unwrap().expr.clone();
        assert_eq!(
            model.minimize_region("everything").unwrap(),
            Minimized::Always
        );
        assert_eq!(model.region("everything").unwrap().expr, before);
    }
}
