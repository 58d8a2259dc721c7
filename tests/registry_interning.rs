// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Surface interning: duplicates, mirrors, degeneracy

use cellgeom::{GeometryError, SurfaceKind, SurfaceRegistry};
use nalgebra::{Point3, Vector3};

#[test]
fn bit_identical_registration_returns_same_id() {
    let mut registry = SurfaceRegistry::new();
    let kind = SurfaceKind::cylinder_z(1.0, -2.0, 0.5);
    let first = registry.register(kind.clone()).unwrap();
    let second = registry.register(kind).unwrap();
    assert_eq!(first, second);
    assert_eq!(registry.len(), 1);
}

#[test]
fn mirror_plane_returns_negated_id() {
    let mut registry = SurfaceRegistry::new();
    // px 1
    let first = registry.register(SurfaceKind::plane_x(1.0)).unwrap();
    // p -1 0 0 -1, the algebraic mirror of px 1
    let second = registry
        .register(SurfaceKind::plane(Vector3::new(-1.0, 0.0, 0.0), -1.0))
        .unwrap();

    assert_eq!(second, -first);
    assert_eq!(registry.len(), 1, "mirror must not create a new entry");

    // The canonical entry carries the diagnostic back-link.
    assert_eq!(registry.resolve(first).unwrap().mirror_of, Some(-first));
}

#[test]
fn mirror_quadric_returns_negated_id() {
    let mut registry = SurfaceRegistry::new();
    let coeffs = [1.0, 1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, -4.0];
    let negated = coeffs.map(|c| -c);

    let first = registry.register(SurfaceKind::quadric(coeffs)).unwrap();
    let second = registry.register(SurfaceKind::quadric(negated)).unwrap();
    assert_eq!(second, -first);
    assert_eq!(registry.len(), 1);
}

#[test]
fn non_unit_plane_interns_with_its_normalized_form() {
    let mut registry = SurfaceRegistry::new();
    let first = registry.register(SurfaceKind::plane_y(2.0)).unwrap();
    let second = registry
        .register(SurfaceKind::plane(Vector3::new(0.0, 4.0, 0.0), 8.0))
        .unwrap();
    assert_eq!(first, second);
}

#[test]
fn distinct_surfaces_get_distinct_ids() {
    let mut registry = SurfaceRegistry::new();
    let a = registry.register(SurfaceKind::plane_x(0.0)).unwrap();
    let b = registry.register(SurfaceKind::plane_x(1.0)).unwrap();
    let c = registry
        .register(SurfaceKind::sphere(Point3::origin(), 1.0))
        .unwrap();
    assert_eq!((a, b, c), (1, 2, 3));
}

#[test]
fn degenerate_primitives_are_rejected() {
    let mut registry = SurfaceRegistry::new();
    for kind in [
        SurfaceKind::plane(Vector3::zeros(), 1.0),
        SurfaceKind::sphere(Point3::origin(), 0.0),
        SurfaceKind::cylinder(Vector3::zeros(), Point3::origin(), 1.0),
        SurfaceKind::cylinder_z(0.0, 0.0, -2.0),
        SurfaceKind::cone(Point3::origin(), Vector3::new(0.0, 0.0, 1.0), 0.0),
        SurfaceKind::quadric([0.0; 10]),
    ] {
        assert!(matches!(
            registry.register(kind),
            Err(GeometryError::InvalidPrimitive { .. })
        ));
    }
    assert!(registry.is_empty());
}

#[test]
fn resolve_never_registered() {
    let mut registry = SurfaceRegistry::new();
    registry.register(SurfaceKind::plane_z(0.0)).unwrap();
    assert_eq!(
        registry.resolve(2),
        Err(GeometryError::UnknownSurface(2))
    );
    assert_eq!(
        registry.resolve(0),
        Err(GeometryError::UnknownSurface(0))
    );
}
