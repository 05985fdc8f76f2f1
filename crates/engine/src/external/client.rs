//! Budget-gated external solve.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info, warn};

use risk_alloc_core::{
    CandidateTrade, Diagnostics, ExternalServiceSettings, OptimizationRequest,
    OptimizationResponse, SolveMetrics, Strategy,
};

use super::adapter::{AdapterParams, SolverAdapter};
use super::budget::TrialBudget;
use super::error::{AdapterError, ExternalSolveError};
use crate::classical::PREMIUM_FLOOR;
use crate::polynomial::build_for_request;
use crate::repair::{postprocess_and_score, vector_to_qty_map, ScoredAllocation};

/// Reason reported when the shared call budget is spent.
pub const BUDGET_EXHAUSTED: &str = "trial_budget_exhausted";

/// Limits applied to external calls.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternalClientConfig {
    pub device_type: String,
    pub relaxation_schedule: u32,
    /// Upper bound on a call's timeout outside trial mode.
    pub default_timeout: Duration,
    /// Applies trial limits regardless of the request flag.
    pub force_trial_mode: bool,
    pub trial_max_samples: u32,
    pub trial_max_timeout: Duration,
    /// Trial runs above this many candidates keep only the most efficient ones.
    pub trial_candidate_cap: usize,
}

impl Default for ExternalClientConfig {
    fn default() -> Self {
        Self::from(&ExternalServiceSettings::default())
    }
}

impl From<&ExternalServiceSettings> for ExternalClientConfig {
    fn from(settings: &ExternalServiceSettings) -> Self {
        Self {
            device_type: settings.device_type.clone(),
            relaxation_schedule: settings.relaxation_schedule,
            default_timeout: Duration::from_secs(settings.default_timeout_secs),
            force_trial_mode: settings.force_trial_mode,
            trial_max_samples: settings.trial_max_samples,
            trial_max_timeout: Duration::from_secs(settings.trial_max_timeout_secs),
            trial_candidate_cap: settings.trial_candidate_cap,
        }
    }
}

impl ExternalClientConfig {
    #[must_use]
    pub fn with_force_trial_mode(mut self, force: bool) -> Self {
        self.force_trial_mode = force;
        self
    }

    #[must_use]
    pub fn with_trial_candidate_cap(mut self, cap: usize) -> Self {
        self.trial_candidate_cap = cap;
        self
    }
}

/// Client for the external annealing path.
///
/// The [`TrialBudget`] is injected so that every client in a process can
/// share one counter.
#[derive(Clone)]
pub struct ExternalSolverClient {
    adapter: Arc<dyn SolverAdapter>,
    budget: Arc<TrialBudget>,
    config: ExternalClientConfig,
}

impl std::fmt::Debug for ExternalSolverClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExternalSolverClient")
            .field("adapter", &self.adapter.name())
            .field("calls_used", &self.budget.used())
            .field("config", &self.config)
            .finish()
    }
}

impl ExternalSolverClient {
    pub fn new(
        adapter: Arc<dyn SolverAdapter>,
        budget: Arc<TrialBudget>,
        config: ExternalClientConfig,
    ) -> Self {
        Self {
            adapter,
            budget,
            config,
        }
    }

    #[must_use]
    pub fn budget(&self) -> &Arc<TrialBudget> {
        &self.budget
    }

    #[must_use]
    pub fn config(&self) -> &ExternalClientConfig {
        &self.config
    }

    #[must_use]
    pub fn adapter_name(&self) -> &str {
        self.adapter.name()
    }

    /// Trial limits apply when the request asks for them or config forces them.
    #[must_use]
    pub fn trial_mode(&self, request: &OptimizationRequest) -> bool {
        request.parameters().trial_mode || self.config.force_trial_mode
    }

    fn adapter_params(&self, request: &OptimizationRequest, trial: bool) -> AdapterParams {
        let params = request.parameters();
        let requested = Duration::try_from_secs_f64(params.timeout_seconds)
            .unwrap_or(self.config.default_timeout);

        let (num_samples, timeout) = if trial {
            (
                params.num_samples.min(self.config.trial_max_samples),
                requested.min(self.config.trial_max_timeout),
            )
        } else {
            (params.num_samples, requested.min(self.config.default_timeout))
        };

        AdapterParams {
            device_type: self.config.device_type.clone(),
            num_samples,
            var_min: 0,
            var_max: request
                .candidates()
                .iter()
                .map(|c| i64::from(c.qty_max))
                .max()
                .unwrap_or(0),
            timeout,
            relaxation_schedule: self.config.relaxation_schedule,
        }
    }

    /// Solves `request` through the adapter.
    ///
    /// Budget exhaustion yields a `skipped` response. Adapter failures are
    /// returned unchanged as errors.
    ///
    /// # Errors
    /// Returns [`ExternalSolveError::CandidateLimitExceeded`] when a trial run
    /// exceeds `max_candidates_for_external`, and [`ExternalSolveError::Adapter`]
    /// for any adapter failure, including timeouts and empty sample sets.
    pub async fn solve(
        &self,
        request: &OptimizationRequest,
    ) -> Result<OptimizationResponse, ExternalSolveError> {
        let started = Instant::now();
        let mut diagnostics = Diagnostics {
            adapter: Some(self.adapter.name().to_string()),
            ..Diagnostics::default()
        };

        if request.is_empty() {
            return Ok(OptimizationResponse::empty(
                Strategy::External,
                SolveMetrics::default(),
                diagnostics,
            ));
        }

        let trial = self.trial_mode(request);
        let limit = request.parameters().max_candidates_for_external;
        if trial && request.len() > limit {
            return Err(ExternalSolveError::CandidateLimitExceeded {
                count: request.len(),
                limit,
            });
        }

        let working = if trial && request.len() > self.config.trial_candidate_cap {
            let kept = top_by_efficiency(request.candidates(), self.config.trial_candidate_cap);
            warn!(
                from = request.len(),
                to = kept.len(),
                "Trial mode truncated candidates to top-K by efficiency"
            );
            diagnostics.truncated_from = Some(request.len());
            diagnostics.truncated_to = Some(kept.len());
            request.with_candidates(kept)
        } else {
            request.clone()
        };

        let polynomial = build_for_request(&working);
        diagnostics.polynomial = Some(polynomial.stats.clone());
        if polynomial.is_empty() {
            debug!("Polynomial has no terms, nothing to submit");
            return Ok(OptimizationResponse::empty(
                Strategy::External,
                SolveMetrics::default(),
                diagnostics,
            ));
        }

        let max_calls = request.parameters().max_external_calls;
        let call_number = if trial {
            match self.budget.try_acquire(max_calls) {
                Some(n) => n,
                None => {
                    warn!(
                        used = self.budget.used(),
                        limit = max_calls,
                        "External call budget exhausted"
                    );
                    diagnostics.external_calls_used = Some(self.budget.used());
                    return Ok(OptimizationResponse::skipped(
                        Strategy::External,
                        BUDGET_EXHAUSTED,
                        diagnostics,
                    ));
                }
            }
        } else {
            self.budget.record()
        };
        diagnostics.external_calls_used = Some(call_number);

        let params = self.adapter_params(&working, trial);
        info!(
            adapter = self.adapter.name(),
            variables = polynomial.variables.len(),
            terms = polynomial.terms.len(),
            samples = params.num_samples,
            timeout_ms = params.timeout.as_millis() as u64,
            trial,
            "Submitting polynomial to external solver"
        );

        let sample_set = match tokio::time::timeout(
            params.timeout,
            self.adapter.solve(&polynomial.terms, &params),
        )
        .await
        {
            Ok(result) => result?,
            Err(_) => return Err(AdapterError::Timeout(params.timeout).into()),
        };
        if sample_set.is_empty() {
            return Err(AdapterError::EmptyResult.into());
        }

        let mut best: Option<ScoredAllocation> = None;
        let mut feasible_samples = 0;
        for (i, sample) in sample_set.samples.iter().enumerate() {
            let values: Vec<f64> = sample.iter().map(|&v| v as f64).collect();
            let raw = vector_to_qty_map(&working, &polynomial.variables, &values);
            let scored = postprocess_and_score(request, &raw);
            debug!(
                sample = i,
                energy = scored.energy,
                feasible = scored.feasibility.ok,
                repair_steps = scored.repair_steps,
                "Evaluated solver sample"
            );
            if scored.feasibility.ok {
                feasible_samples += 1;
            }
            if best.as_ref().map_or(true, |b| scored.is_better_than(b)) {
                best = Some(scored);
            }
        }

        let Some(best) = best else {
            return Err(AdapterError::EmptyResult.into());
        };

        diagnostics.samples_evaluated = Some(sample_set.samples.len());
        diagnostics.feasible_samples = Some(feasible_samples);
        diagnostics.repair_steps = Some(best.repair_steps);
        diagnostics.elapsed_ms = Some(started.elapsed().as_millis() as u64);

        info!(
            selected = best.allocation.len(),
            energy = best.energy,
            samples = sample_set.samples.len(),
            "External solve complete"
        );

        Ok(OptimizationResponse::ok(
            request,
            Strategy::External,
            &best.allocation,
            best.metrics(),
            diagnostics,
        ))
    }
}

/// The `k` most efficient candidates, kept in their original order.
fn top_by_efficiency(candidates: &[CandidateTrade], k: usize) -> Vec<CandidateTrade> {
    let mut ranked: Vec<usize> = (0..candidates.len()).collect();
    ranked.sort_by(|&a, &b| {
        candidates[b]
            .efficiency(PREMIUM_FLOOR)
            .total_cmp(&candidates[a].efficiency(PREMIUM_FLOOR))
    });
    ranked.truncate(k);
    ranked.sort_unstable();
    ranked.into_iter().map(|i| candidates[i].clone()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::adapter::SampleSet;
    use crate::polynomial::Term;
    use async_trait::async_trait;
    use risk_alloc_core::{Constraints, Parameters, SolveStatus};
    use std::sync::Mutex;

    /// Returns fixed samples and records what it was asked.
    struct ScriptedAdapter {
        samples: Vec<Vec<i64>>,
        seen: Mutex<Vec<AdapterParams>>,
        variables_seen: Mutex<Vec<usize>>,
    }

    impl ScriptedAdapter {
        fn new(samples: Vec<Vec<i64>>) -> Self {
            Self {
                samples,
                seen: Mutex::new(Vec::new()),
                variables_seen: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl SolverAdapter for ScriptedAdapter {
        async fn solve(
            &self,
            polynomial: &[Term],
            params: &AdapterParams,
        ) -> Result<SampleSet, AdapterError> {
            let max_index = polynomial
                .iter()
                .flat_map(|t| t.variable_terms.iter().map(|v| v.index + 1))
                .max()
                .unwrap_or(0);
            self.variables_seen.lock().unwrap().push(max_index);
            self.seen.lock().unwrap().push(params.clone());
            Ok(SampleSet {
                samples: self.samples.clone(),
                energies: vec![],
            })
        }

        fn name(&self) -> &str {
            "scripted"
        }
    }

    struct FailingAdapter(AdapterError);

    #[async_trait]
    impl SolverAdapter for FailingAdapter {
        async fn solve(&self, _: &[Term], _: &AdapterParams) -> Result<SampleSet, AdapterError> {
            Err(self.0.clone())
        }

        fn name(&self) -> &str {
            "failing"
        }
    }

    fn client(adapter: Arc<dyn SolverAdapter>) -> ExternalSolverClient {
        ExternalSolverClient::new(
            adapter,
            Arc::new(TrialBudget::new()),
            ExternalClientConfig::default(),
        )
    }

    fn two_candidates(parameters: Parameters) -> OptimizationRequest {
        OptimizationRequest::new(
            vec![
                CandidateTrade::new("c1", "SPY", 1, 100.0, 10.0),
                CandidateTrade::new("c2", "SPY", 1, 50.0, 10.0),
            ],
            Constraints::default().with_max_cash(15.0),
            parameters,
        )
        .unwrap()
    }

    fn book(n: usize, parameters: Parameters) -> OptimizationRequest {
        let candidates = (0..n)
            .map(|i| {
                CandidateTrade::new(format!("c{i}"), "SPY", 2, 1.0 + i as f64, 1.0)
                    .with_tail_risk(0.1)
            })
            .collect();
        OptimizationRequest::new(candidates, Constraints::default(), parameters).unwrap()
    }

    #[tokio::test]
    async fn picks_best_feasible_sample() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![vec![0, 1], vec![1, 1], vec![1, 0]]));
        let client = client(adapter.clone());
        let req = two_candidates(Parameters::default());

        let response = client.solve(&req).await.unwrap();

        assert_eq!(response.status, SolveStatus::Ok);
        assert_eq!(response.strategy_used, Strategy::External);
        assert_eq!(response.allocation(), [("c1", 1)].into_iter().collect());
        assert!(response.metrics.feasible);
        assert_eq!(response.diagnostics.samples_evaluated, Some(3));
        assert_eq!(response.diagnostics.feasible_samples, Some(3));
        assert_eq!(response.diagnostics.external_calls_used, Some(1));
        assert_eq!(response.diagnostics.adapter.as_deref(), Some("scripted"));
    }

    #[tokio::test]
    async fn trial_mode_caps_samples_and_timeout() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![vec![1, 0]]));
        let client = client(adapter.clone());
        let req = two_candidates(Parameters::default().with_trial_mode(true));

        client.solve(&req).await.unwrap();

        let seen = adapter.seen.lock().unwrap();
        assert_eq!(seen[0].num_samples, 5);
        assert_eq!(seen[0].timeout, Duration::from_secs(10));
        assert_eq!(seen[0].var_max, 1);
    }

    #[tokio::test]
    async fn non_trial_keeps_requested_samples() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![vec![1, 0]]));
        let client = client(adapter.clone());
        let req = two_candidates(Parameters::default().with_trial_mode(false));

        client.solve(&req).await.unwrap();

        let seen = adapter.seen.lock().unwrap();
        assert_eq!(seen[0].num_samples, 100);
        assert_eq!(seen[0].timeout, Duration::from_secs(60));
    }

    #[tokio::test]
    async fn exhausted_budget_skips_without_calling() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![vec![1, 0]]));
        let client = client(adapter.clone());
        let mut params = Parameters::default().with_trial_mode(true);
        params.max_external_calls = 1;
        let req = two_candidates(params);

        assert_eq!(client.solve(&req).await.unwrap().status, SolveStatus::Ok);
        let second = client.solve(&req).await.unwrap();

        assert_eq!(second.status, SolveStatus::Skipped);
        assert_eq!(second.diagnostics.reason.as_deref(), Some(BUDGET_EXHAUSTED));
        assert_eq!(adapter.seen.lock().unwrap().len(), 1);

        client.budget().reset();
        assert_eq!(client.solve(&req).await.unwrap().status, SolveStatus::Ok);
    }

    #[tokio::test]
    async fn budget_is_not_enforced_outside_trial_mode() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![vec![1, 0]]));
        let client = client(adapter.clone());
        let mut params = Parameters::default().with_trial_mode(false);
        params.max_external_calls = 1;
        let req = two_candidates(params);

        for _ in 0..3 {
            assert_eq!(client.solve(&req).await.unwrap().status, SolveStatus::Ok);
        }
        assert_eq!(client.budget().used(), 3);
    }

    #[tokio::test]
    async fn trial_rejects_too_many_candidates() {
        let client = client(Arc::new(ScriptedAdapter::new(vec![vec![1]])));
        let mut params = Parameters::default().with_trial_mode(true);
        params.max_candidates_for_external = 10;
        let req = book(12, params);

        let err = client.solve(&req).await.unwrap_err();
        assert_eq!(err, ExternalSolveError::CandidateLimitExceeded { count: 12, limit: 10 });
    }

    #[tokio::test]
    async fn trial_truncates_on_a_copy() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![vec![1, 1, 1]]));
        let client = ExternalSolverClient::new(
            adapter.clone(),
            Arc::new(TrialBudget::new()),
            ExternalClientConfig::default().with_trial_candidate_cap(3),
        );
        let req = book(8, Parameters::default().with_trial_mode(true));

        let response = client.solve(&req).await.unwrap();

        assert_eq!(req.len(), 8);
        assert_eq!(response.diagnostics.truncated_from, Some(8));
        assert_eq!(response.diagnostics.truncated_to, Some(3));
        assert_eq!(*adapter.variables_seen.lock().unwrap(), vec![3]);
        let ids: Vec<_> = response.selected_trades.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["c5", "c6", "c7"]);
    }

    #[tokio::test]
    async fn empty_request_short_circuits() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![]));
        let client = client(adapter.clone());
        let req = OptimizationRequest::new(vec![], Constraints::default(), Parameters::default())
            .unwrap();

        let response = client.solve(&req).await.unwrap();

        assert_eq!(response.status, SolveStatus::Ok);
        assert!(response.selected_trades.is_empty());
        assert!(adapter.seen.lock().unwrap().is_empty());
        assert_eq!(client.budget().used(), 0);
    }

    #[tokio::test]
    async fn empty_polynomial_short_circuits() {
        let adapter = Arc::new(ScriptedAdapter::new(vec![vec![1]]));
        let client = client(adapter.clone());
        let req = OptimizationRequest::new(
            vec![CandidateTrade::new("flat", "SPY", 3, 2.0, 2.0)],
            Constraints::default(),
            Parameters::default(),
        )
        .unwrap();

        let response = client.solve(&req).await.unwrap();

        assert_eq!(response.status, SolveStatus::Ok);
        assert!(response.selected_trades.is_empty());
        assert!(adapter.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn adapter_errors_propagate_unchanged() {
        let timeout = AdapterError::Timeout(Duration::from_secs(10));
        let client = client(Arc::new(FailingAdapter(timeout)));
        let req = two_candidates(Parameters::default());

        let err = client.solve(&req).await.unwrap_err();

        assert!(err.is_timeout());
        assert_eq!(
            err,
            ExternalSolveError::Adapter(AdapterError::Timeout(Duration::from_secs(10)))
        );
    }

    #[tokio::test]
    async fn no_samples_is_an_error() {
        let client = client(Arc::new(ScriptedAdapter::new(vec![])));
        let req = two_candidates(Parameters::default());

        let err = client.solve(&req).await.unwrap_err();
        assert_eq!(err, ExternalSolveError::Adapter(AdapterError::EmptyResult));
    }

    #[test]
    fn top_by_efficiency_keeps_request_order() {
        let candidates = vec![
            CandidateTrade::new("a", "SPY", 1, 1.0, 1.0),
            CandidateTrade::new("b", "SPY", 1, 9.0, 1.0),
            CandidateTrade::new("c", "SPY", 1, 5.0, 1.0),
            CandidateTrade::new("d", "SPY", 1, 7.0, 1.0),
        ];
        let kept = top_by_efficiency(&candidates, 2);
        let ids: Vec<_> = kept.iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["b", "d"]);
    }
}
