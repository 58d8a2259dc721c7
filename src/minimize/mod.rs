// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 Polyframe Inc.

//! Canonicalizer/minimizer - prime-implicant reduction of region trees
//!
//! Enumerates every satisfying sign assignment of a tree, merges the
//! resulting minterms into prime implicants, selects an essential covering
//! subset and rebuilds a minimal-size tree. Exhaustive in the variable
//! count, so a configurable ceiling turns the exponential case into an
//! explicit error instead of a hang.

mod implicant;

pub use implicant::{GrayCodes, Implicant, Trit};

use crate::region::RegionExpr;
use thiserror::Error;

/// Default ceiling on the number of distinct surfaces in a minimized tree.
pub const DEFAULT_VARIABLE_CEILING: usize = 24;

/// Errors from minimization.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MinimizeError {
    /// The tree references more distinct surfaces than the exhaustive pass
    /// can enumerate. Surface the condition as a model-complexity warning.
    #[error("region references {count} surfaces, minimizer ceiling is {limit}")]
    TooManyVariables { count: usize, limit: usize },
}

/// Outcome of minimization. The degenerate regions have no tree form of
/// their own and must stay distinguishable from a normal one.
#[derive(Debug, Clone, PartialEq)]
pub enum Minimized {
    /// No sign assignment satisfies the region (contradiction).
    Never,
    /// Every sign assignment satisfies the region (no constraint).
    Always,
    /// A minimal union-of-intersections tree.
    Expr(RegionExpr),
}

impl Minimized {
    /// The minimized tree, if the region is neither degenerate case.
    pub fn expr(&self) -> Option<&RegionExpr> {
        match self {
            Minimized::Expr(expr) => Some(expr),
            _ => None,
        }
    }
}

/// Prime-implicant minimizer with a configurable variable ceiling.
#[derive(Debug, Clone)]
pub struct Minimizer {
    pub max_variables: usize,
}

impl Default for Minimizer {
    fn default() -> Self {
        Self {
            max_variables: DEFAULT_VARIABLE_CEILING,
        }
    }
}

/// Minimize with the default variable ceiling.
pub fn minimize(expr: &RegionExpr) -> Result<Minimized, MinimizeError> {
    Minimizer::default().minimize(expr)
}

impl Minimizer {
    pub fn new(max_variables: usize) -> Self {
        Self { max_variables }
    }

    /// Reduce `expr` to a minimal union of prime implicants.
    ///
    /// Membership-preserving and idempotent; ties in the covering search are
    /// broken by discovery order, so the result is minimal in the subset
    /// size found, not guaranteed globally minimal.
    pub fn minimize(&self, expr: &RegionExpr) -> Result<Minimized, MinimizeError> {
        let ids: Vec<u32> = expr.surface_ids().into_iter().collect();
        let k = ids.len();
        // u64 assignment masks bound the ceiling as well.
        if k > self.max_variables || k >= 64 {
            return Err(MinimizeError::TooManyVariables {
                count: k,
                limit: self.max_variables.min(63),
            });
        }

        let minterms = enumerate_minterms(expr, &ids);
        log::debug!(
            "minimizing over {} surfaces: {} of {} assignments satisfy",
            k,
            minterms.len(),
            1u64 << k
        );

        if minterms.is_empty() {
            return Ok(Minimized::Never);
        }
        if minterms.len() as u64 == 1u64 << k {
            return Ok(Minimized::Always);
        }

        let primes = prime_implicants(minterms.clone());
        let chosen = select_cover(&primes, &minterms);
        log::trace!(
            "{} prime implicants, {} selected for the cover",
            primes.len(),
            chosen.len()
        );

        Ok(Minimized::Expr(rebuild(&chosen, &ids)))
    }
}

/// All satisfying fully-specified assignments, visited in Gray-code order.
fn enumerate_minterms(expr: &RegionExpr, ids: &[u32]) -> Vec<Implicant> {
    GrayCodes::new(ids.len())
        .filter(|&mask| expr.eval_assignment(ids, mask))
        .map(|mask| Implicant::from_mask(mask, ids.len()))
        .collect()
}

/// Iterative pairwise merging to fixed point. Implicants that survive a
/// round unabsorbed are prime.
fn prime_implicants(minterms: Vec<Implicant>) -> Vec<Implicant> {
    let mut current = minterms;
    current.sort_unstable();
    current.dedup();

    let mut primes: Vec<Implicant> = Vec::new();

    while !current.is_empty() {
        // Group by True-count; merges only happen across adjacent counts.
        let max_ones = current.iter().map(Implicant::ones).max().unwrap_or(0);
        let mut groups: Vec<Vec<usize>> = vec![Vec::new(); max_ones + 1];
        for (i, implicant) in current.iter().enumerate() {
            groups[implicant.ones()].push(i);
        }

        let mut absorbed = vec![false; current.len()];
        let mut next: Vec<Implicant> = Vec::new();

        for pair in groups.windows(2) {
            for &lo in &pair[0] {
                for &hi in &pair[1] {
                    if let Some(merged) = current[lo].merge(&current[hi]) {
                        absorbed[lo] = true;
                        absorbed[hi] = true;
                        next.push(merged);
                    }
                }
            }
        }

        for (i, implicant) in current.into_iter().enumerate() {
            if !absorbed[i] {
                primes.push(implicant);
            }
        }

        next.sort_unstable();
        next.dedup();
        current = next;
    }

    primes.sort_unstable();
    primes.dedup();
    primes
}

/// Essential-implicant selection followed by a bounded search over subset
/// sizes for whatever the essentials leave uncovered. First covering subset
/// found wins.
fn select_cover(primes: &[Implicant], minterms: &[Implicant]) -> Vec<Implicant> {
    let mut remaining: Vec<usize> = (0..minterms.len()).collect();
    let mut available: Vec<usize> = (0..primes.len()).collect();
    let mut chosen: Vec<usize> = Vec::new();

    // Any minterm with a single surviving coverer forces that prime in;
    // removing its covered minterms can force further primes, so iterate.
    loop {
        let mut forced: Vec<usize> = Vec::new();
        for &m in &remaining {
            let mut coverers = available
                .iter()
                .copied()
                .filter(|&p| primes[p].covers(&minterms[m]));
            if let (Some(only), None) = (coverers.next(), coverers.next()) {
                forced.push(only);
            }
        }
        forced.sort_unstable();
        forced.dedup();
        if forced.is_empty() {
            break;
        }

        for &p in &forced {
            chosen.push(p);
            available.retain(|&q| q != p);
            remaining.retain(|&m| !primes[p].covers(&minterms[m]));
        }
        if remaining.is_empty() {
            break;
        }
    }

    if !remaining.is_empty() {
        for size in 1..=available.len() {
            if let Some(combo) = first_cover(primes, minterms, &available, &remaining, size) {
                chosen.extend(combo);
                break;
            }
        }
    }

    let mut selected: Vec<Implicant> = chosen.into_iter().map(|p| primes[p].clone()).collect();
    selected.sort_unstable();
    selected.dedup();
    selected
}

/// First combination of `size` available primes covering every remaining
/// minterm, searched in index order.
fn first_cover(
    primes: &[Implicant],
    minterms: &[Implicant],
    available: &[usize],
    remaining: &[usize],
    size: usize,
) -> Option<Vec<usize>> {
    let mut combo: Vec<usize> = Vec::with_capacity(size);
    search(primes, minterms, available, remaining, size, 0, &mut combo)
}

fn search(
    primes: &[Implicant],
    minterms: &[Implicant],
    available: &[usize],
    remaining: &[usize],
    size: usize,
    start: usize,
    combo: &mut Vec<usize>,
) -> Option<Vec<usize>> {
    if combo.len() == size {
        let covered = remaining.iter().all(|&m| {
            combo
                .iter()
                .any(|&p| primes[p].covers(&minterms[m]))
        });
        return covered.then(|| combo.clone());
    }
    for i in start..available.len() {
        combo.push(available[i]);
        if let Some(found) = search(primes, minterms, available, remaining, size, i + 1, combo) {
            return Some(found);
        }
        combo.pop();
    }
    None
}

/// Rebuild a tree from the selected implicants: per implicant an
/// intersection of signed literals in ascending id order, unioned in the
/// implicants' sorted order so repeated minimization is stable.
fn rebuild(selected: &[Implicant], ids: &[u32]) -> RegionExpr {
    let mut union: Option<RegionExpr> = None;
    for implicant in selected {
        let mut term: Option<RegionExpr> = None;
        for (i, trit) in implicant.trits().iter().enumerate() {
            let literal = match trit {
                Trit::True => RegionExpr::Literal(ids[i] as i32),
                Trit::False => RegionExpr::Literal(-(ids[i] as i32)),
                Trit::DontCare => continue,
            };
            term = Some(match term {
                Some(t) => t.and(literal),
                None => literal,
            });
        }
        // An all-DontCare implicant only arises from a tautology, which
        // was already returned as Always.
        let term = term.expect("unconstrained implicant outside the tautology case");
        union = Some(match union {
            Some(u) => u.or(term),
            None => term,
        });
    }
    union.expect("empty cover outside the contradiction case")
}
