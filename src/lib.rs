// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Cellgeom region-expression engine
//!
//! Boolean-algebra CSG regions over signed surface ids for Monte Carlo
//! particle-transport geometry: point-in-region evaluation, prime-implicant
//! minimization, an interning surface registry with mirror detection, and
//! straight-line region tracking.
//!
//! Region text grammar: `:` is union (lowest precedence), juxtaposition is
//! intersection, `-` negates one literal, `#( ... )` complements a
//! sub-expression. `-3` and `3` denote opposite half-spaces of surface 3.

pub mod geometry;
pub mod minimize;
pub mod model;
pub mod region;
pub mod track;
pub mod utils;

pub use geometry::{GeometryError, Surface, SurfaceKind, SurfaceRegistry};
pub use minimize::{minimize, Minimized, MinimizeError, Minimizer};
pub use model::{Model, ModelError, NamedRegion};
pub use region::{parse_region, ParseError, RegionExpr, SignedSurfaceId};
pub use track::{track, Crossing};

use anyhow::{Context, Result};

/// Parse a region expression and verify every referenced surface is
/// registered. Main entry point for the component factory layer.
pub fn build_region(source: &str, registry: &SurfaceRegistry) -> Result<RegionExpr> {
    let expr = parse_region(source)
        .with_context(|| format!("failed to parse region expression {source:?}"))?;
    for id in expr.surface_ids() {
        registry
            .resolve(id as SignedSurfaceId)
            .with_context(|| format!("region {source:?} references surface {id}"))?;
    }
    Ok(expr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Point3;

    #[test]
    fn test_build_region() {
        let mut registry = SurfaceRegistry::new();
        registry.register(SurfaceKind::plane_y(0.0)).unwrap();
        registry.register(SurfaceKind::plane_y(1.0)).unwrap();

        let slab = build_region("1 -2", &registry).unwrap();
        assert!(slab
            .contains(&Point3::new(0.0, 0.5, 0.0), &registry)
            .unwrap());

        assert!(build_region("1 -7", &registry).is_err());
        assert!(build_region("1 (", &registry).is_err());
    }
}
