// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Ray/region tracker - ordered region crossings along a straight line

use crate::geometry::{GeometryError, SurfaceKind, SurfaceRegistry};
use crate::model::NamedRegion;
use crate::utils::math::solve_quadratic;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Roots closer than this to the origin or to each other are discarded or
/// merged; grazing tangents otherwise re-cross the same surface.
pub const DEAD_ZONE: f64 = 1e-8;

/// A maximal sub-segment of the tracked line interior to exactly one region,
/// or to none (open space). Open space is reported, never omitted, so gaps
/// and overlaps in model coverage stay visible to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Crossing {
    /// Owning region, or `None` for open space.
    pub region: Option<String>,
    /// Entry distance along the ray.
    pub enter: f64,
    /// Exit distance; `f64::INFINITY` for the trailing span.
    pub exit: f64,
}

/// Track a ray through the given regions.
///
/// Intersects the ray with every surface any region references, sorts the
/// crossing distances and classifies the midpoint of each segment against
/// the regions in input order; the first region containing a midpoint owns
/// that span. Adjacent spans with the same owner are merged, so the result
/// tiles `[0, inf)` with shared endpoints. O(S log S) in the candidate
/// surface intersections; nothing is cached across calls.
///
/// # Panics
///
/// Panics if `direction` has zero length.
pub fn track(
    origin: &Point3<f64>,
    direction: &Vector3<f64>,
    regions: &[&NamedRegion],
    registry: &SurfaceRegistry,
) -> Result<Vec<Crossing>, GeometryError> {
    let norm = direction.norm();
    assert!(norm > 0.0, "ray direction must be non-zero");
    let dir = direction / norm;

    let mut surface_ids: BTreeSet<u32> = BTreeSet::new();
    for region in regions {
        surface_ids.extend(region.expr.surface_ids());
    }

    let mut hits: Vec<Hit> = Vec::new();
    for &id in &surface_ids {
        let surface = registry.resolve(id as i32)?;
        for t in ray_roots(&surface.kind, origin, &dir) {
            if t >= DEAD_ZONE {
                hits.push(Hit { distance: t, surface: id });
            }
        }
    }
    hits.sort_by(|a, b| a.distance.partial_cmp(&b.distance).unwrap());
    hits.dedup_by(|a, b| (a.distance - b.distance).abs() < DEAD_ZONE);
    log::debug!(
        "tracking {} regions across {} candidate surface hits",
        regions.len(),
        hits.len()
    );

    // Classify one probe point per segment, including the unbounded tail.
    let mut crossings: Vec<Crossing> = Vec::new();
    let mut enter = 0.0;
    for hit in &hits {
        let t = hit.distance;
        let mid = origin + dir * (0.5 * (enter + t));
        let region = owner(&mid, regions, registry)?;
        log::trace!(
            "span ({enter:.6}, {t:.6}) -> {region:?}, bounded by surface {}",
            hit.surface
        );
        push_span(&mut crossings, region, enter, t);
        enter = t;
    }
    let probe = origin + dir * (enter + 1.0);
    push_span(
        &mut crossings,
        owner(&probe, regions, registry)?,
        enter,
        f64::INFINITY,
    );

    Ok(crossings)
}

/// One ray/surface intersection: distance along the ray and the surface
/// crossed there. Transient, consumed within a single `track` call.
#[derive(Debug, Clone, Copy)]
struct Hit {
    distance: f64,
    surface: u32,
}

/// First region containing the point, in input order.
fn owner<'a>(
    point: &Point3<f64>,
    regions: &[&'a NamedRegion],
    registry: &SurfaceRegistry,
) -> Result<Option<&'a str>, GeometryError> {
    for region in regions {
        if let Some(envelope) = &region.envelope {
            if !envelope.contains(point, registry)? {
                continue;
            }
        }
        if region.expr.contains(point, registry)? {
            return Ok(Some(&region.name));
        }
    }
    Ok(None)
}

/// Append a span, merging into the previous one when the owner repeats.
/// Near-duplicate roots otherwise split one physical span in two.
fn push_span(crossings: &mut Vec<Crossing>, region: Option<&str>, enter: f64, exit: f64) {
    if let Some(last) = crossings.last_mut() {
        if last.region.as_deref() == region {
            last.exit = exit;
            return;
        }
    }
    crossings.push(Crossing {
        region: region.map(str::to_owned),
        enter,
        exit,
    });
}

/// Intersection distances of the ray with one surface: 0 or 1 roots for a
/// plane, up to 2 for the quadratic kinds.
fn ray_roots(kind: &SurfaceKind, origin: &Point3<f64>, dir: &Vector3<f64>) -> Vec<f64> {
    match kind {
        SurfaceKind::Plane { normal, offset } => {
            let denom = normal.dot(dir);
            if denom.abs() < 1e-12 {
                return Vec::new();
            }
            vec![(offset - normal.dot(&origin.coords)) / denom]
        }
        SurfaceKind::Sphere { center, radius } => {
            let m = origin - center;
            solve_quadratic(
                1.0,
                2.0 * m.dot(dir),
                m.norm_squared() - radius * radius,
            )
        }
        SurfaceKind::Cylinder { axis, origin: base, radius } => {
            let m = origin - base;
            let md = m - axis * m.dot(axis);
            let dd = dir - axis * dir.dot(axis);
            solve_quadratic(
                dd.norm_squared(),
                2.0 * md.dot(&dd),
                md.norm_squared() - radius * radius,
            )
        }
        SurfaceKind::Cone { apex, axis, tan2 } => {
            let m = origin - apex;
            let s = 1.0 + tan2;
            let da = dir.dot(axis);
            let ma = m.dot(axis);
            solve_quadratic(
                1.0 - s * da * da,
                2.0 * (m.dot(dir) - s * ma * da),
                m.norm_squared() - s * ma * ma,
            )
        }
        SurfaceKind::Quadric { coeffs } => {
            let [a, b, c, d, e, f, g, h, j, _k] = *coeffs;
            let (ox, oy, oz) = (origin.x, origin.y, origin.z);
            let (dx, dy, dz) = (dir.x, dir.y, dir.z);
            let qa = a * dx * dx
                + b * dy * dy
                + c * dz * dz
                + d * dx * dy
                + e * dy * dz
                + f * dz * dx;
            let qb = 2.0 * (a * ox * dx + b * oy * dy + c * oz * dz)
                + d * (ox * dy + oy * dx)
                + e * (oy * dz + oz * dy)
                + f * (oz * dx + ox * dz)
                + g * dx
                + h * dy
                + j * dz;
            let qc = kind.evaluate(origin);
            solve_quadratic(qa, qb, qc)
        }
    }
}
