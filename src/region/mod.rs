// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Region expression module - boolean CSG regions over signed surface ids

mod node;
mod parser;

pub use node::{RegionExpr, SignedSurfaceId};
pub use parser::{parse_region, ParseError};
