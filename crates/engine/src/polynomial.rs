//! Sparse quadratic polynomial for the external annealing solver.
//!
//! For candidates with per-unit net profit `ev_i - premium_i`, tail risk `t_i`
//! and premium `p_i` the polynomial is
//!
//! ```text
//! E(q) = -Σ (ev_i - p_i) q_i + λ_tail (Σ t_i q_i)² + λ_cash (Σ p_i q_i)²
//! ```
//!
//! expanded into monomials: one linear term per variable, one `q_i²` term per
//! variable and one `q_i q_j` term per kept pair with its coefficient doubled.
//! Above [`FULL_EXPANSION_LIMIT`] candidates only the [`MAX_OFF_DIAGONAL_PAIRS`]
//! strongest tail interactions are kept; this is lossy and reported in
//! [`PolynomialStats`].
//!
//! Coefficients are then scaled so the largest magnitude is at most
//! [`MAX_COEFFICIENT`], and terms below [`PRUNE_THRESHOLD`] are dropped.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use risk_alloc_core::{CandidateTrade, OptimizationRequest, PolynomialStats};

/// Largest coefficient magnitude after normalization.
pub const MAX_COEFFICIENT: f64 = 10.0;

/// Scaled terms smaller than this are dropped.
pub const PRUNE_THRESHOLD: f64 = 1e-4;

/// Candidate count up to which every pair is expanded.
pub const FULL_EXPANSION_LIMIT: usize = 60;

/// Off-diagonal pairs kept above [`FULL_EXPANSION_LIMIT`].
pub const MAX_OFF_DIAGONAL_PAIRS: usize = 1000;

/// One variable raised to a power inside a monomial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableTerm {
    pub index: usize,
    pub power: u32,
}

/// A weighted monomial, in the shape the solver service expects.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Term {
    pub coefficient: f64,
    pub variable_terms: Vec<VariableTerm>,
}

impl Term {
    fn linear(coefficient: f64, i: usize) -> Self {
        Self {
            coefficient,
            variable_terms: vec![VariableTerm { index: i, power: 1 }],
        }
    }

    fn square(coefficient: f64, i: usize) -> Self {
        Self {
            coefficient,
            variable_terms: vec![VariableTerm { index: i, power: 2 }],
        }
    }

    fn pair(coefficient: f64, i: usize, j: usize) -> Self {
        Self {
            coefficient,
            variable_terms: vec![
                VariableTerm { index: i, power: 1 },
                VariableTerm { index: j, power: 1 },
            ],
        }
    }

    /// Value of this monomial at `x`. Out-of-range indices read as zero.
    #[must_use]
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.variable_terms.iter().fold(self.coefficient, |acc, vt| {
            let value = x.get(vt.index).copied().unwrap_or(0.0);
            acc * value.powi(vt.power as i32)
        })
    }
}

/// The per-candidate economics the polynomial is built from.
#[derive(Debug, Clone, PartialEq)]
pub struct PolynomialInput {
    pub id: String,
    pub ev: f64,
    pub premium: f64,
    pub tail_risk: f64,
}

impl From<&CandidateTrade> for PolynomialInput {
    fn from(c: &CandidateTrade) -> Self {
        Self {
            id: c.id.clone(),
            ev: c.ev_per_unit,
            premium: c.premium_per_unit,
            tail_risk: c.tail_risk_contribution,
        }
    }
}

/// Penalty weights for the quadratic terms.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolynomialWeights {
    pub lambda_tail: f64,
    pub lambda_cash: f64,
    /// The cash term is only emitted when a cash budget is configured.
    pub max_cash: Option<f64>,
}

impl PolynomialWeights {
    #[must_use]
    pub fn from_request(request: &OptimizationRequest) -> Self {
        Self {
            lambda_tail: request.parameters().lambda_tail,
            lambda_cash: request.parameters().lambda_cash,
            max_cash: request.constraints().max_cash,
        }
    }

    fn cash_weight(&self) -> f64 {
        if self.max_cash.is_some() {
            self.lambda_cash
        } else {
            0.0
        }
    }
}

/// Normalized polynomial plus the mapping needed to decode solver output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Polynomial {
    pub terms: Vec<Term>,
    /// Candidate id for each variable index.
    pub variables: Vec<String>,
    pub stats: PolynomialStats,
}

impl Polynomial {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    #[must_use]
    pub fn variable_index(&self, id: &str) -> Option<usize> {
        self.variables.iter().position(|v| v == id)
    }

    /// Value of the (scaled) polynomial at `x`.
    #[must_use]
    pub fn evaluate(&self, x: &[f64]) -> f64 {
        self.terms.iter().map(|t| t.evaluate(x)).sum()
    }

    /// Largest coefficient magnitude.
    #[must_use]
    pub fn max_abs_coefficient(&self) -> f64 {
        self.terms
            .iter()
            .map(|t| t.coefficient.abs())
            .fold(0.0, f64::max)
    }
}

/// Builds the polynomial for every candidate in `request`.
#[must_use]
pub fn build_for_request(request: &OptimizationRequest) -> Polynomial {
    let inputs: Vec<PolynomialInput> = request.candidates().iter().map(Into::into).collect();
    build_polynomial(&inputs, PolynomialWeights::from_request(request))
}

/// Expands, normalizes and prunes the quadratic energy.
#[must_use]
pub fn build_polynomial(inputs: &[PolynomialInput], weights: PolynomialWeights) -> Polynomial {
    let n = inputs.len();
    let cash_weight = weights.cash_weight();
    let coupling = |i: usize, j: usize| {
        let (a, b) = (&inputs[i], &inputs[j]);
        weights.lambda_tail * a.tail_risk * b.tail_risk + cash_weight * a.premium * b.premium
    };

    let mut terms = Vec::with_capacity(2 * n);
    for (i, input) in inputs.iter().enumerate() {
        terms.push(Term::linear(-(input.ev - input.premium), i));
    }
    for i in 0..n {
        terms.push(Term::square(coupling(i, i), i));
    }

    let pairs_total = n * n.saturating_sub(1) / 2;
    let pairs = if n <= FULL_EXPANSION_LIMIT {
        all_pairs(n)
    } else {
        strongest_tail_pairs(inputs, MAX_OFF_DIAGONAL_PAIRS)
    };
    for &(i, j) in &pairs {
        terms.push(Term::pair(2.0 * coupling(i, j), i, j));
    }

    let mut stats = PolynomialStats {
        candidate_count: n,
        linear_terms: n,
        diagonal_terms: n,
        off_diagonal_terms: pairs.len(),
        pairs_dropped: pairs_total - pairs.len(),
        approximated: n > FULL_EXPANSION_LIMIT,
        pre_scale_max: 0.0,
        scale_factor: 1.0,
        pruned_terms: 0,
    };

    normalize(&mut terms, &mut stats);

    let before = terms.len();
    terms.retain(|t| t.coefficient.abs() >= PRUNE_THRESHOLD);
    stats.pruned_terms = before - terms.len();

    if stats.approximated {
        warn!(
            candidates = n,
            kept_pairs = stats.off_diagonal_terms,
            dropped_pairs = stats.pairs_dropped,
            "Polynomial interaction terms truncated to strongest tail pairs"
        );
    }
    debug!(
        terms = terms.len(),
        pre_scale_max = stats.pre_scale_max,
        scale = stats.scale_factor,
        pruned = stats.pruned_terms,
        "Polynomial built"
    );

    Polynomial {
        terms,
        variables: inputs.iter().map(|i| i.id.clone()).collect(),
        stats,
    }
}

/// Scales coefficients so the largest magnitude is exactly `MAX_COEFFICIENT`
/// when it was larger, and leaves them untouched otherwise.
fn normalize(terms: &mut [Term], stats: &mut PolynomialStats) {
    let max = terms
        .iter()
        .map(|t| t.coefficient.abs())
        .fold(0.0, f64::max);
    stats.pre_scale_max = max;

    if max > MAX_COEFFICIENT {
        // Divide first so the largest term lands on exactly ±MAX_COEFFICIENT.
        for term in terms.iter_mut() {
            term.coefficient = term.coefficient / max * MAX_COEFFICIENT;
        }
        stats.scale_factor = MAX_COEFFICIENT / max;
    }
}

fn all_pairs(n: usize) -> Vec<(usize, usize)> {
    (0..n)
        .flat_map(|i| ((i + 1)..n).map(move |j| (i, j)))
        .collect()
}

#[derive(Debug, PartialEq)]
struct RankedPair {
    weight: f64,
    i: usize,
    j: usize,
}

impl Eq for RankedPair {}

impl Ord for RankedPair {
    // Heavier first; among equal weights the lower index pair ranks higher.
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| other.i.cmp(&self.i))
            .then_with(|| other.j.cmp(&self.j))
    }
}

impl PartialOrd for RankedPair {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Top `limit` pairs ranked by `|t_i · t_j|`, returned in index order.
fn strongest_tail_pairs(inputs: &[PolynomialInput], limit: usize) -> Vec<(usize, usize)> {
    let n = inputs.len();
    let mut heap: BinaryHeap<Reverse<RankedPair>> = BinaryHeap::with_capacity(limit + 1);

    for i in 0..n {
        for j in (i + 1)..n {
            let weight = (inputs[i].tail_risk * inputs[j].tail_risk).abs();
            heap.push(Reverse(RankedPair { weight, i, j }));
            if heap.len() > limit {
                heap.pop();
            }
        }
    }

    let mut pairs: Vec<(usize, usize)> = heap.into_iter().map(|Reverse(p)| (p.i, p.j)).collect();
    pairs.sort_unstable();
    pairs
}
