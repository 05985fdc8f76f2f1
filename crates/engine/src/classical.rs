//! Classical fallback: greedy fill plus time-boxed randomized local search.
//!
//! Greedy initialization is deterministic. Local search draws swaps from a
//! `ChaCha8Rng`, so a fixed seed and iteration cap reproduce the same swap
//! sequence. Swap acceptance uses [`ObjectiveVariant::RawExposure`]; the
//! returned allocation is scored by the shared pipeline like any other.

use std::time::{Duration, Instant};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use tracing::{debug, info};

use risk_alloc_core::{
    Allocation, CandidateTrade, ClassicalSettings, Diagnostics, OptimizationRequest,
    OptimizationResponse, Strategy,
};

use crate::objective::{
    check_hard_constraints, compute_components, energy, objective_value, ObjectiveVariant,
};
use crate::repair::postprocess_and_score;

/// Default wall-clock budget for local search.
pub const DEFAULT_SEARCH_BUDGET: Duration = Duration::from_millis(50);

/// Premium floor when ranking by `ev / premium`.
pub const PREMIUM_FLOOR: f64 = 1e-6;

/// Local-search controls.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassicalConfig {
    /// Checked between swap attempts only.
    pub search_budget: Duration,
    pub max_iterations: Option<usize>,
    /// Used when the request has no seed of its own.
    pub seed: Option<u64>,
}

impl Default for ClassicalConfig {
    fn default() -> Self {
        Self {
            search_budget: DEFAULT_SEARCH_BUDGET,
            max_iterations: None,
            seed: None,
        }
    }
}

impl From<&ClassicalSettings> for ClassicalConfig {
    fn from(settings: &ClassicalSettings) -> Self {
        Self {
            search_budget: Duration::from_millis(settings.search_budget_ms),
            max_iterations: settings.max_iterations,
            seed: settings.seed,
        }
    }
}

impl ClassicalConfig {
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = Some(max_iterations);
        self
    }

    #[must_use]
    pub fn with_search_budget(mut self, budget: Duration) -> Self {
        self.search_budget = budget;
        self
    }
}

/// An accepted move: one unit out of `decrement`, one unit into `increment`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Swap {
    pub decrement: String,
    pub increment: String,
}

/// Result of a local search run.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchOutcome {
    pub allocation: Allocation,
    /// Raw-exposure energy of `allocation`.
    pub energy: f64,
    pub iterations: usize,
    pub accepted: Vec<Swap>,
}

/// Fills candidates best `ev / premium` first, each up to the last feasible unit.
///
/// Ties keep request order. Candidates with `qty_max == 0` are never touched.
#[must_use]
pub fn greedy_initialize(request: &OptimizationRequest) -> Allocation {
    let mut order: Vec<&CandidateTrade> = request.candidates().iter().collect();
    order.sort_by(|a, b| {
        b.efficiency(PREMIUM_FLOOR)
            .total_cmp(&a.efficiency(PREMIUM_FLOOR))
    });

    let mut allocation = Allocation::new();
    for candidate in order {
        for qty in 1..=candidate.qty_max {
            allocation.set(candidate.id.clone(), qty);
            let components = compute_components(request, &allocation);
            if !check_hard_constraints(request.constraints(), &components).ok {
                allocation.set(candidate.id.clone(), qty - 1);
                break;
            }
        }
    }
    allocation
}

/// Greedy init followed by randomized swap search.
#[derive(Debug, Clone, Default)]
pub struct ClassicalSolver {
    config: ClassicalConfig,
}

impl ClassicalSolver {
    #[must_use]
    pub fn new(config: ClassicalConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &ClassicalConfig {
        &self.config
    }

    fn rng_for(&self, request: &OptimizationRequest) -> ChaCha8Rng {
        match request.parameters().seed.or(self.config.seed) {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        }
    }

    /// Improves `start` by random feasible swaps until the budget runs out,
    /// the iteration cap is hit, or no swap is possible.
    ///
    /// A swap is accepted only if it is feasible and strictly lowers the
    /// raw-exposure energy.
    pub fn local_search(
        &self,
        request: &OptimizationRequest,
        start: Allocation,
        rng: &mut ChaCha8Rng,
    ) -> SearchOutcome {
        let deadline = Instant::now() + self.config.search_budget;
        let search_energy = |alloc: &Allocation| {
            energy(
                ObjectiveVariant::RawExposure,
                request,
                &compute_components(request, alloc),
            )
        };

        let mut current_energy = search_energy(&start);
        let mut current = start;
        let mut best = current.clone();
        let mut best_energy = current_energy;
        let mut accepted = Vec::new();
        let mut iterations = 0;

        loop {
            if Instant::now() >= deadline {
                break;
            }
            if self.config.max_iterations.is_some_and(|max| iterations >= max) {
                break;
            }

            let active: Vec<&CandidateTrade> = request
                .candidates()
                .iter()
                .filter(|c| current.get(&c.id) > 0)
                .collect();
            let under_cap: Vec<&CandidateTrade> = request
                .candidates()
                .iter()
                .filter(|c| current.get(&c.id) < c.qty_max)
                .collect();
            if active.is_empty() || under_cap.is_empty() {
                break;
            }

            iterations += 1;
            let out = active[rng.gen_range(0..active.len())];
            let into = under_cap[rng.gen_range(0..under_cap.len())];
            if out.id == into.id {
                continue;
            }

            let mut trial = current.clone();
            trial.decrement(&out.id);
            trial.increment(&into.id);

            let components = compute_components(request, &trial);
            if !check_hard_constraints(request.constraints(), &components).ok {
                continue;
            }
            let trial_energy = energy(ObjectiveVariant::RawExposure, request, &components);
            if trial_energy < current_energy {
                current = trial;
                current_energy = trial_energy;
                accepted.push(Swap {
                    decrement: out.id.clone(),
                    increment: into.id.clone(),
                });
                if current_energy < best_energy {
                    best = current.clone();
                    best_energy = current_energy;
                }
            }
        }

        debug!(
            iterations,
            accepted = accepted.len(),
            energy = best_energy,
            "Local search finished"
        );

        SearchOutcome {
            allocation: best,
            energy: best_energy,
            iterations,
            accepted,
        }
    }

    /// Runs the full classical pipeline. Never fails; a stalled or empty
    /// search returns the best allocation found, possibly empty.
    #[must_use]
    pub fn solve(&self, request: &OptimizationRequest) -> OptimizationResponse {
        let started = Instant::now();

        let initial = greedy_initialize(request);
        let greedy_energy = objective_value(request, &compute_components(request, &initial));

        let mut rng = self.rng_for(request);
        let outcome = self.local_search(request, initial, &mut rng);
        let scored = postprocess_and_score(request, &outcome.allocation);

        info!(
            candidates = request.len(),
            selected = scored.allocation.len(),
            energy = scored.energy,
            iterations = outcome.iterations,
            "Classical solve complete"
        );

        let diagnostics = Diagnostics {
            elapsed_ms: Some(started.elapsed().as_millis() as u64),
            repair_steps: Some(scored.repair_steps),
            greedy_energy: Some(greedy_energy),
            search_iterations: Some(outcome.iterations),
            accepted_swaps: Some(outcome.accepted.len()),
            search_energy: Some(outcome.energy),
            ..Diagnostics::default()
        };

        OptimizationResponse::ok(
            request,
            Strategy::Classical,
            &scored.allocation,
            scored.metrics(),
            diagnostics,
        )
    }
}
