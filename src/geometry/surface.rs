// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Surface primitives: equations, side tests, duplicate and mirror detection

use crate::region::SignedSurfaceId;
use crate::utils::math::approx_eq;
use nalgebra::{Point3, Vector3};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Absolute tolerance for positions, offsets and radii.
pub const TOL_POSITION: f64 = 1e-8;
/// Absolute tolerance for direction components.
pub const TOL_DIRECTION: f64 = 1e-10;

/// Errors from surface registration and lookup.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// Degenerate geometry at registration; never silently substituted.
    #[error("invalid surface primitive: {reason}")]
    InvalidPrimitive {
        /// What is degenerate about it.
        reason: String,
    },

    /// Id was never registered.
    #[error("unknown surface id {0}")]
    UnknownSurface(SignedSurfaceId),
}

/// A geometric surface primitive.
///
/// Each kind evaluates a signed equation `f(p)`; `f(p) > 0` is the positive
/// side of the surface. For the quadratic kinds the convention puts the
/// enclosed volume on the negative side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SurfaceKind {
    /// `normal . p = offset`
    Plane { normal: Vector3<f64>, offset: f64 },
    /// `|p - center|^2 = radius^2`
    Sphere { center: Point3<f64>, radius: f64 },
    /// Infinite circular cylinder around the line `origin + t*axis`.
    Cylinder {
        axis: Vector3<f64>,
        origin: Point3<f64>,
        radius: f64,
    },
    /// Double cone with apex `apex`, axis `axis` and tan^2 of the half-angle.
    Cone {
        apex: Point3<f64>,
        axis: Vector3<f64>,
        tan2: f64,
    },
    /// General quadric `Ax^2+By^2+Cz^2+Dxy+Eyz+Fzx+Gx+Hy+Jz+K = 0`.
    Quadric { coeffs: [f64; 10] },
}

impl SurfaceKind {
    /// Plane with arbitrary normal; normalized during registration.
    pub fn plane(normal: Vector3<f64>, offset: f64) -> Self {
        Self::Plane { normal, offset }
    }

    /// Plane `x = x0` with normal +X.
    pub fn plane_x(x0: f64) -> Self {
        Self::Plane {
            normal: Vector3::new(1.0, 0.0, 0.0),
            offset: x0,
        }
    }

    /// Plane `y = y0` with normal +Y.
    pub fn plane_y(y0: f64) -> Self {
        Self::Plane {
            normal: Vector3::new(0.0, 1.0, 0.0),
            offset: y0,
        }
    }

    /// Plane `z = z0` with normal +Z.
    pub fn plane_z(z0: f64) -> Self {
        Self::Plane {
            normal: Vector3::new(0.0, 0.0, 1.0),
            offset: z0,
        }
    }

    pub fn sphere(center: Point3<f64>, radius: f64) -> Self {
        Self::Sphere { center, radius }
    }

    pub fn cylinder(axis: Vector3<f64>, origin: Point3<f64>, radius: f64) -> Self {
        Self::Cylinder { axis, origin, radius }
    }

    /// Cylinder along +Z through `(x0, y0)`.
    pub fn cylinder_z(x0: f64, y0: f64, radius: f64) -> Self {
        Self::Cylinder {
            axis: Vector3::new(0.0, 0.0, 1.0),
            origin: Point3::new(x0, y0, 0.0),
            radius,
        }
    }

    pub fn cone(apex: Point3<f64>, axis: Vector3<f64>, tan2: f64) -> Self {
        Self::Cone { apex, axis, tan2 }
    }

    pub fn quadric(coeffs: [f64; 10]) -> Self {
        Self::Quadric { coeffs }
    }

    /// Signed equation value at `point`.
    pub fn evaluate(&self, point: &Point3<f64>) -> f64 {
        match self {
            SurfaceKind::Plane { normal, offset } => normal.dot(&point.coords) - offset,
            SurfaceKind::Sphere { center, radius } => {
                (point - center).norm_squared() - radius * radius
            }
            SurfaceKind::Cylinder { axis, origin, radius } => {
                let d = point - origin;
                let along = d.dot(axis);
                d.norm_squared() - along * along - radius * radius
            }
            SurfaceKind::Cone { apex, axis, tan2 } => {
                let d = point - apex;
                let along = d.dot(axis);
                d.norm_squared() - (1.0 + tan2) * along * along
            }
            SurfaceKind::Quadric { coeffs } => {
                let [a, b, c, d, e, f, g, h, j, k] = *coeffs;
                let (x, y, z) = (point.x, point.y, point.z);
                a * x * x
                    + b * y * y
                    + c * z * z
                    + d * x * y
                    + e * y * z
                    + f * z * x
                    + g * x
                    + h * y
                    + j * z
                    + k
            }
        }
    }

    /// Side test: is `point` on the positive side?
    pub fn sense(&self, point: &Point3<f64>) -> bool {
        self.evaluate(point) > 0.0
    }

    /// Validate and bring to the canonical form used for interning:
    /// unit normals and axes, axis sign fixed, cylinder origin projected to
    /// the axis point nearest the world origin.
    pub fn canonicalized(&self) -> Result<SurfaceKind, GeometryError> {
        match self {
            SurfaceKind::Plane { normal, offset } => {
                let norm = normal.norm();
                if norm < TOL_DIRECTION {
                    return Err(degenerate("plane normal has zero length"));
                }
                Ok(SurfaceKind::Plane {
                    normal: normal / norm,
                    offset: offset / norm,
                })
            }
            SurfaceKind::Sphere { radius, .. } => {
                if *radius <= 0.0 {
                    return Err(degenerate("sphere radius must be positive"));
                }
                Ok(self.clone())
            }
            SurfaceKind::Cylinder { axis, origin, radius } => {
                if *radius <= 0.0 {
                    return Err(degenerate("cylinder radius must be positive"));
                }
                let axis = unit_axis(axis, "cylinder axis has zero length")?;
                let origin = origin - &axis * origin.coords.dot(&axis);
                Ok(SurfaceKind::Cylinder { axis, origin, radius: *radius })
            }
            SurfaceKind::Cone { apex, axis, tan2 } => {
                if *tan2 <= 0.0 {
                    return Err(degenerate("cone tan^2 half-angle must be positive"));
                }
                let axis = unit_axis(axis, "cone axis has zero length")?;
                Ok(SurfaceKind::Cone { apex: *apex, axis, tan2: *tan2 })
            }
            SurfaceKind::Quadric { coeffs } => {
                if coeffs.iter().all(|c| c.abs() < TOL_DIRECTION) {
                    return Err(degenerate("quadric with all-zero coefficients"));
                }
                Ok(self.clone())
            }
        }
    }

    /// Equality within the registry tolerances. Both sides are expected in
    /// canonical form.
    pub fn approx_eq(&self, other: &SurfaceKind) -> bool {
        match (self, other) {
            (
                SurfaceKind::Plane { normal: n1, offset: d1 },
                SurfaceKind::Plane { normal: n2, offset: d2 },
            ) => vec_eq(n1, n2, TOL_DIRECTION) && approx_eq(*d1, *d2, TOL_POSITION),
            (
                SurfaceKind::Sphere { center: c1, radius: r1 },
                SurfaceKind::Sphere { center: c2, radius: r2 },
            ) => point_eq(c1, c2) && approx_eq(*r1, *r2, TOL_POSITION),
            (
                SurfaceKind::Cylinder { axis: a1, origin: o1, radius: r1 },
                SurfaceKind::Cylinder { axis: a2, origin: o2, radius: r2 },
            ) => {
                // Canonical axes may still differ by sign for the same line.
                let axes = vec_eq(a1, a2, TOL_DIRECTION) || vec_eq(&-a1, a2, TOL_DIRECTION);
                axes && point_eq(o1, o2) && approx_eq(*r1, *r2, TOL_POSITION)
            }
            (
                SurfaceKind::Cone { apex: v1, axis: a1, tan2: t1 },
                SurfaceKind::Cone { apex: v2, axis: a2, tan2: t2 },
            ) => {
                let axes = vec_eq(a1, a2, TOL_DIRECTION) || vec_eq(&-a1, a2, TOL_DIRECTION);
                axes && point_eq(v1, v2) && approx_eq(*t1, *t2, TOL_POSITION)
            }
            (SurfaceKind::Quadric { coeffs: q1 }, SurfaceKind::Quadric { coeffs: q2 }) => q1
                .iter()
                .zip(q2.iter())
                .all(|(a, b)| approx_eq(*a, *b, TOL_POSITION)),
            _ => false,
        }
    }

    /// Mirror test: same surface with the inside/outside sense reversed,
    /// i.e. the equation negated. Only planes and general quadrics admit a
    /// mirror; the fixed-form kinds always evaluate positive outside.
    pub fn is_mirror_of(&self, other: &SurfaceKind) -> bool {
        match (self, other) {
            (
                SurfaceKind::Plane { normal: n1, offset: d1 },
                SurfaceKind::Plane { normal: n2, offset: d2 },
            ) => vec_eq(&-n1, n2, TOL_DIRECTION) && approx_eq(-*d1, *d2, TOL_POSITION),
            (SurfaceKind::Quadric { coeffs: q1 }, SurfaceKind::Quadric { coeffs: q2 }) => q1
                .iter()
                .zip(q2.iter())
                .all(|(a, b)| approx_eq(-*a, *b, TOL_POSITION)),
            _ => false,
        }
    }

    pub(crate) fn tag(&self) -> u8 {
        match self {
            SurfaceKind::Plane { .. } => 0,
            SurfaceKind::Sphere { .. } => 1,
            SurfaceKind::Cylinder { .. } => 2,
            SurfaceKind::Cone { .. } => 3,
            SurfaceKind::Quadric { .. } => 4,
        }
    }

    /// Leading coefficients for the registry's fast key. Absolute values so
    /// a mirror candidate lands in the same bucket as its original.
    pub(crate) fn leading_coefficients(&self) -> [f64; 4] {
        match self {
            SurfaceKind::Plane { normal, offset } => {
                [normal.x.abs(), normal.y.abs(), normal.z.abs(), offset.abs()]
            }
            SurfaceKind::Sphere { center, radius } => {
                [center.x.abs(), center.y.abs(), center.z.abs(), *radius]
            }
            SurfaceKind::Cylinder { axis, radius, .. } => {
                [axis.x.abs(), axis.y.abs(), axis.z.abs(), *radius]
            }
            SurfaceKind::Cone { apex, tan2, .. } => {
                [apex.x.abs(), apex.y.abs(), apex.z.abs(), *tan2]
            }
            SurfaceKind::Quadric { coeffs } => {
                [coeffs[0].abs(), coeffs[1].abs(), coeffs[2].abs(), coeffs[9].abs()]
            }
        }
    }
}

fn degenerate(reason: &str) -> GeometryError {
    GeometryError::InvalidPrimitive {
        reason: reason.to_string(),
    }
}

fn unit_axis(axis: &Vector3<f64>, reason: &str) -> Result<Vector3<f64>, GeometryError> {
    let norm = axis.norm();
    if norm < TOL_DIRECTION {
        return Err(degenerate(reason));
    }
    let mut unit = axis / norm;
    // Fix the sign so that +axis and -axis intern identically: first
    // component of meaningful magnitude becomes positive.
    for i in 0..3 {
        if unit[i].abs() > TOL_DIRECTION {
            if unit[i] < 0.0 {
                unit = -unit;
            }
            break;
        }
    }
    Ok(unit)
}

fn vec_eq(a: &Vector3<f64>, b: &Vector3<f64>, tol: f64) -> bool {
    approx_eq(a.x, b.x, tol) && approx_eq(a.y, b.y, tol) && approx_eq(a.z, b.z, tol)
}

fn point_eq(a: &Point3<f64>, b: &Point3<f64>) -> bool {
    approx_eq(a.x, b.x, TOL_POSITION)
        && approx_eq(a.y, b.y, TOL_POSITION)
        && approx_eq(a.z, b.z, TOL_POSITION)
}

/// A registered surface. Owned exclusively by the [`SurfaceRegistry`];
/// immutable after registration except for the `mirror_of` diagnostic.
///
/// [`SurfaceRegistry`]: super::SurfaceRegistry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Surface {
    /// Stable non-zero identity assigned by the registry.
    pub id: u32,
    pub kind: SurfaceKind,
    /// Signed alias this entry answered for when a mirror-image duplicate
    /// was folded into it. Diagnostic only; never consulted for identity.
    pub mirror_of: Option<SignedSurfaceId>,
}
