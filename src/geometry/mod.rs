// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Geometry module - surface primitives and the interning registry

mod registry;
mod surface;

pub use registry::SurfaceRegistry;
pub use surface::{GeometryError, Surface, SurfaceKind, TOL_DIRECTION, TOL_POSITION};
