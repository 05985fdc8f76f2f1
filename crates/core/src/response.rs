//! Solve results returned to callers.
//!
//! Expected runtime conditions (budget exhaustion, adapter failure) are
//! reported through [`SolveStatus`] and [`Diagnostics`] rather than errors.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::{Allocation, Components, ConstraintName, OptimizationRequest, Side};

/// Outcome of a solve call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SolveStatus {
    Ok,
    /// The solver declined to run, see `diagnostics.reason`.
    Skipped,
    Error,
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ok => write!(f, "ok"),
            Self::Skipped => write!(f, "skipped"),
            Self::Error => write!(f, "error"),
        }
    }
}

/// Which solver produced the allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    Classical,
    External,
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Classical => write!(f, "classical"),
            Self::External => write!(f, "external"),
        }
    }
}

/// A candidate chosen with a non-zero quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedTrade {
    pub id: String,
    pub symbol: String,
    pub side: Side,
    pub quantity: u32,
}

/// Scored exposure of the returned allocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SolveMetrics {
    #[serde(flatten)]
    pub components: Components,
    /// Threshold-breach energy; lower is better.
    pub energy: f64,
    pub feasible: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub violations: BTreeMap<ConstraintName, f64>,
}

/// Shape of the polynomial handed to the external solver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PolynomialStats {
    pub candidate_count: usize,
    pub linear_terms: usize,
    pub diagonal_terms: usize,
    /// Off-diagonal terms generated, before the magnitude prune.
    pub off_diagonal_terms: usize,
    /// Pairs left out by the interaction cap.
    pub pairs_dropped: usize,
    /// True when the interaction cap made the polynomial lossy.
    pub approximated: bool,
    pub pre_scale_max: f64,
    pub scale_factor: f64,
    /// Terms removed for falling under the magnitude floor after scaling.
    pub pruned_terms: usize,
}

/// Structured diagnostics. Every fallback or failure leaves an entry here.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub repair_steps: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub greedy_energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_iterations: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub accepted_swaps: Option<usize>,
    /// Raw-exposure energy of the local-search result.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub search_energy: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated_from: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub truncated_to: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub polynomial: Option<PolynomialStats>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples_evaluated: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feasible_samples: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub external_calls_used: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub adapter: Option<String>,
}

/// Final answer for one request. Not modified after construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OptimizationResponse {
    pub status: SolveStatus,
    pub strategy_used: Strategy,
    pub selected_trades: Vec<SelectedTrade>,
    pub metrics: SolveMetrics,
    pub diagnostics: Diagnostics,
}

impl OptimizationResponse {
    /// Successful response for a scored allocation.
    ///
    /// Trades are listed in request order; ids the request does not know are
    /// dropped.
    #[must_use]
    pub fn ok(
        request: &OptimizationRequest,
        strategy: Strategy,
        allocation: &Allocation,
        metrics: SolveMetrics,
        diagnostics: Diagnostics,
    ) -> Self {
        Self {
            status: SolveStatus::Ok,
            strategy_used: strategy,
            selected_trades: selected_trades(request, allocation),
            metrics,
            diagnostics,
        }
    }

    /// Empty successful response.
    #[must_use]
    pub fn empty(strategy: Strategy, metrics: SolveMetrics, diagnostics: Diagnostics) -> Self {
        Self {
            status: SolveStatus::Ok,
            strategy_used: strategy,
            selected_trades: Vec::new(),
            metrics,
            diagnostics,
        }
    }

    /// Response for a solver that declined to run.
    #[must_use]
    pub fn skipped(
        strategy: Strategy,
        reason: impl Into<String>,
        mut diagnostics: Diagnostics,
    ) -> Self {
        diagnostics.reason = Some(reason.into());
        Self {
            status: SolveStatus::Skipped,
            strategy_used: strategy,
            selected_trades: Vec::new(),
            metrics: SolveMetrics::default(),
            diagnostics,
        }
    }

    /// Response for a failed solve.
    #[must_use]
    pub fn error(
        strategy: Strategy,
        message: impl Into<String>,
        mut diagnostics: Diagnostics,
    ) -> Self {
        diagnostics.reason = Some(message.into());
        Self {
            status: SolveStatus::Error,
            strategy_used: strategy,
            selected_trades: Vec::new(),
            metrics: SolveMetrics::default(),
            diagnostics,
        }
    }

    /// The selected trades as an allocation.
    #[must_use]
    pub fn allocation(&self) -> Allocation {
        self.selected_trades
            .iter()
            .map(|t| (t.id.as_str(), t.quantity))
            .collect()
    }

    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.status == SolveStatus::Ok
    }

    /// Returns the response with diagnostics replaced by `f(diagnostics)`.
    #[must_use]
    pub fn map_diagnostics(mut self, f: impl FnOnce(Diagnostics) -> Diagnostics) -> Self {
        self.diagnostics = f(self.diagnostics);
        self
    }
}

fn selected_trades(request: &OptimizationRequest, allocation: &Allocation) -> Vec<SelectedTrade> {
    request
        .candidates()
        .iter()
        .filter_map(|c| {
            let quantity = allocation.get(&c.id);
            (quantity > 0).then(|| SelectedTrade {
                id: c.id.clone(),
                symbol: c.symbol.clone(),
                side: c.side,
                quantity,
            })
        })
        .collect()
}
