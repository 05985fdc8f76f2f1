//! Mode dispatch between the classical and external solvers.
//!
//! One attempt per call. In hybrid mode any external failure or budget skip
//! falls back to the classical solver, with the reason recorded in
//! `fallback_reason`.

use std::borrow::Cow;
use std::sync::Arc;

use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use risk_alloc_core::{
    AppConfig, Diagnostics, OptimizationRequest, OptimizationResponse, SolveMode, SolveStatus,
    Strategy,
};

use crate::classical::{ClassicalConfig, ClassicalSolver};
use crate::external::{
    AdapterError, ExternalClientConfig, ExternalSolverClient, HttpAdapterConfig, HttpSolverAdapter,
    TrialBudget,
};

pub const REASON_NOT_CONFIGURED: &str = "external_not_configured";
pub const REASON_CANDIDATE_LIMIT: &str = "candidate_limit_exceeded";
pub const REASON_EXTERNAL_FAILED: &str = "external_solver_failed";

/// Injected configuration flags. The engine never reads the environment.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OrchestratorSettings {
    pub credential_configured: bool,
    /// Runs every request in trial mode.
    pub force_trial_mode: bool,
}

impl From<&AppConfig> for OrchestratorSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            credential_configured: config.external.credential_configured(),
            force_trial_mode: config.external.force_trial_mode,
        }
    }
}

/// Dispatches a request to the classical solver, the external solver, or
/// both in sequence.
#[derive(Debug, Clone)]
pub struct HybridOrchestrator {
    classical: ClassicalSolver,
    external: Option<ExternalSolverClient>,
    settings: OrchestratorSettings,
}

impl HybridOrchestrator {
    pub fn new(
        classical: ClassicalSolver,
        external: Option<ExternalSolverClient>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            classical,
            external,
            settings,
        }
    }

    /// Classical solving only.
    #[must_use]
    pub fn classical_only(classical: ClassicalSolver) -> Self {
        Self::new(classical, None, OrchestratorSettings::default())
    }

    /// Wires the solvers from loaded configuration. The HTTP adapter is only
    /// built when a credential is configured.
    ///
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(config: &AppConfig, budget: Arc<TrialBudget>) -> Result<Self, AdapterError> {
        let classical = ClassicalSolver::new(ClassicalConfig::from(&config.classical));
        let external = match HttpAdapterConfig::from_settings(&config.external) {
            Some(http_config) => {
                let adapter = HttpSolverAdapter::new(http_config)?;
                Some(ExternalSolverClient::new(
                    Arc::new(adapter),
                    budget,
                    ExternalClientConfig::from(&config.external),
                ))
            }
            None => None,
        };

        Ok(Self::new(classical, external, OrchestratorSettings::from(config)))
    }

    #[must_use]
    pub fn settings(&self) -> OrchestratorSettings {
        self.settings
    }

    #[must_use]
    pub fn external(&self) -> Option<&ExternalSolverClient> {
        self.external.as_ref()
    }

    fn external_client(&self) -> Option<&ExternalSolverClient> {
        if self.settings.credential_configured {
            self.external.as_ref()
        } else {
            None
        }
    }

    /// Solves `request` according to its mode. Never fails: every outcome is
    /// a response whose status and diagnostics describe what happened.
    pub async fn solve(&self, request: &OptimizationRequest) -> OptimizationResponse {
        let run_id = Uuid::new_v4().to_string();
        let span = info_span!("solve", run_id = %run_id);

        let response = async {
            let request = self.effective_request(request);
            let mode = request.parameters().mode;
            info!(candidates = request.len(), mode = %mode, "Starting solve");

            let response = match mode {
                SolveMode::ClassicalOnly => self.classical.solve(&request),
                SolveMode::ExternalOnly => self.solve_external_only(&request).await,
                SolveMode::Hybrid => self.solve_hybrid(&request).await,
            };

            info!(
                status = %response.status,
                strategy = %response.strategy_used,
                selected = response.selected_trades.len(),
                "Solve finished"
            );
            response
        }
        .instrument(span)
        .await;

        response.map_diagnostics(|d| Diagnostics {
            run_id: Some(run_id),
            ..d
        })
    }

    fn effective_request<'a>(
        &self,
        request: &'a OptimizationRequest,
    ) -> Cow<'a, OptimizationRequest> {
        if !self.settings.force_trial_mode || request.parameters().trial_mode {
            return Cow::Borrowed(request);
        }
        Cow::Owned(request.with_trial_mode(true))
    }

    async fn solve_external_only(&self, request: &OptimizationRequest) -> OptimizationResponse {
        let Some(client) = self.external_client() else {
            warn!("External-only solve requested without a configured credential");
            return OptimizationResponse::error(
                Strategy::External,
                REASON_NOT_CONFIGURED,
                Diagnostics::default(),
            );
        };

        match client.solve(request).await {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, timeout = err.is_timeout(), "External solve failed");
                let diagnostics = Diagnostics {
                    external_error: Some(err.to_string()),
                    adapter: Some(client.adapter_name().to_string()),
                    ..Diagnostics::default()
                };
                OptimizationResponse::error(Strategy::External, err.to_string(), diagnostics)
            }
        }
    }

    async fn solve_hybrid(&self, request: &OptimizationRequest) -> OptimizationResponse {
        let limit = request.parameters().max_candidates_for_external;

        let fallback = match self.external_client() {
            None => Diagnostics {
                fallback_reason: Some(REASON_NOT_CONFIGURED.to_string()),
                ..Diagnostics::default()
            },
            Some(_) if request.len() > limit => {
                info!(candidates = request.len(), limit, "Too many candidates for external solver");
                Diagnostics {
                    fallback_reason: Some(REASON_CANDIDATE_LIMIT.to_string()),
                    ..Diagnostics::default()
                }
            }
            Some(client) => match client.solve(request).await {
                Ok(response) if response.status == SolveStatus::Skipped => {
                    let reason = response
                        .diagnostics
                        .reason
                        .clone()
                        .unwrap_or_else(|| REASON_EXTERNAL_FAILED.to_string());
                    warn!(reason = %reason, "External solver skipped, falling back to classical");
                    Diagnostics {
                        fallback_reason: Some(reason),
                        external_calls_used: response.diagnostics.external_calls_used,
                        ..Diagnostics::default()
                    }
                }
                Ok(response) => return response,
                Err(err) => {
                    warn!(
                        error = %err,
                        timeout = err.is_timeout(),
                        "External solver failed, falling back to classical"
                    );
                    Diagnostics {
                        fallback_reason: Some(REASON_EXTERNAL_FAILED.to_string()),
                        external_error: Some(err.to_string()),
                        adapter: Some(client.adapter_name().to_string()),
                        ..Diagnostics::default()
                    }
                }
            },
        };

        self.classical.solve(request).map_diagnostics(|d| Diagnostics {
            fallback_reason: fallback.fallback_reason,
            external_error: fallback.external_error,
            external_calls_used: fallback.external_calls_used,
            adapter: fallback.adapter,
            ..d
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{AdapterParams, SampleSet, SolverAdapter, BUDGET_EXHAUSTED};
    use crate::polynomial::Term;
    use async_trait::async_trait;
    use risk_alloc_core::{CandidateTrade, Constraints, Parameters};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct CountingAdapter {
        calls: AtomicUsize,
        outcome: Result<Vec<Vec<i64>>, AdapterError>,
    }

    impl CountingAdapter {
        fn returning(samples: Vec<Vec<i64>>) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome: Ok(samples),
            })
        }

        fn failing(err: AdapterError) -> Arc<Self> {
            Arc::new(Self {
                calls: AtomicUsize::new(0),
                outcome: Err(err),
            })
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl SolverAdapter for CountingAdapter {
        async fn solve(&self, _: &[Term], _: &AdapterParams) -> Result<SampleSet, AdapterError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.outcome.clone().map(|samples| SampleSet {
                samples,
                energies: vec![],
            })
        }

        fn name(&self) -> &str {
            "counting"
        }
    }

    fn orchestrator(adapter: Arc<CountingAdapter>, credential: bool) -> HybridOrchestrator {
        let client = ExternalSolverClient::new(
            adapter,
            Arc::new(TrialBudget::new()),
            ExternalClientConfig::default(),
        );
        HybridOrchestrator::new(
            ClassicalSolver::new(ClassicalConfig::default().with_seed(1)),
            Some(client),
            OrchestratorSettings {
                credential_configured: credential,
                force_trial_mode: false,
            },
        )
    }

    fn request(mode: SolveMode) -> OptimizationRequest {
        OptimizationRequest::new(
            vec![
                CandidateTrade::new("c1", "SPY", 1, 100.0, 10.0),
                CandidateTrade::new("c2", "SPY", 1, 50.0, 10.0),
            ],
            Constraints::default().with_max_cash(15.0),
            Parameters::default().with_mode(mode),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn classical_only_never_calls_external() {
        let adapter = CountingAdapter::returning(vec![vec![1, 0]]);
        let orch = orchestrator(adapter.clone(), true);

        let response = orch.solve(&request(SolveMode::ClassicalOnly)).await;

        assert_eq!(response.strategy_used, Strategy::Classical);
        assert_eq!(adapter.calls(), 0);
        assert!(response.diagnostics.run_id.is_some());
    }

    #[tokio::test]
    async fn hybrid_returns_external_result_when_available() {
        let adapter = CountingAdapter::returning(vec![vec![1, 0]]);
        let orch = orchestrator(adapter.clone(), true);

        let response = orch.solve(&request(SolveMode::Hybrid)).await;

        assert_eq!(response.status, SolveStatus::Ok);
        assert_eq!(response.strategy_used, Strategy::External);
        assert_eq!(adapter.calls(), 1);
        assert!(response.diagnostics.fallback_reason.is_none());
    }

    #[tokio::test]
    async fn hybrid_falls_back_when_external_fails() {
        let adapter = CountingAdapter::failing(AdapterError::Timeout(Duration::from_secs(10)));
        let orch = orchestrator(adapter.clone(), true);

        let response = orch.solve(&request(SolveMode::Hybrid)).await;

        assert_eq!(response.status, SolveStatus::Ok);
        assert_eq!(response.strategy_used, Strategy::Classical);
        assert_eq!(response.diagnostics.fallback_reason.as_deref(), Some(REASON_EXTERNAL_FAILED));
        assert!(response.diagnostics.external_error.as_deref().unwrap().contains("timed out"));
        assert_eq!(response.allocation(), [("c1", 1)].into_iter().collect());
    }

    #[tokio::test]
    async fn hybrid_without_credential_goes_classical() {
        let adapter = CountingAdapter::returning(vec![vec![1, 0]]);
        let orch = orchestrator(adapter.clone(), false);

        let response = orch.solve(&request(SolveMode::Hybrid)).await;

        assert_eq!(response.strategy_used, Strategy::Classical);
        assert_eq!(response.diagnostics.fallback_reason.as_deref(), Some(REASON_NOT_CONFIGURED));
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn hybrid_over_candidate_ceiling_goes_classical() {
        let adapter = CountingAdapter::returning(vec![vec![1, 0]]);
        let orch = orchestrator(adapter.clone(), true);
        let mut params = Parameters::default();
        params.max_candidates_for_external = 1;
        let req = request(SolveMode::Hybrid).with_parameters(params).unwrap();

        let response = orch.solve(&req).await;

        assert_eq!(response.strategy_used, Strategy::Classical);
        assert_eq!(response.diagnostics.fallback_reason.as_deref(), Some(REASON_CANDIDATE_LIMIT));
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn hybrid_falls_back_on_exhausted_budget() {
        let adapter = CountingAdapter::returning(vec![vec![1, 0]]);
        let orch = orchestrator(adapter.clone(), true);
        let mut params = Parameters::default().with_trial_mode(true);
        params.max_external_calls = 1;
        let req = request(SolveMode::Hybrid).with_parameters(params).unwrap();

        let first = orch.solve(&req).await;
        let second = orch.solve(&req).await;

        assert_eq!(first.strategy_used, Strategy::External);
        assert_eq!(second.status, SolveStatus::Ok);
        assert_eq!(second.strategy_used, Strategy::Classical);
        assert_eq!(second.diagnostics.fallback_reason.as_deref(), Some(BUDGET_EXHAUSTED));
        assert_eq!(adapter.calls(), 1);
    }

    #[tokio::test]
    async fn external_only_without_credential_is_error() {
        let adapter = CountingAdapter::returning(vec![vec![1, 0]]);
        let orch = orchestrator(adapter.clone(), false);

        let response = orch.solve(&request(SolveMode::ExternalOnly)).await;

        assert_eq!(response.status, SolveStatus::Error);
        assert_eq!(response.diagnostics.reason.as_deref(), Some(REASON_NOT_CONFIGURED));
        assert_eq!(adapter.calls(), 0);
    }

    #[tokio::test]
    async fn external_only_surfaces_adapter_failure() {
        let adapter = CountingAdapter::failing(AdapterError::JobFailed("diverged".to_string()));
        let orch = orchestrator(adapter, true);

        let response = orch.solve(&request(SolveMode::ExternalOnly)).await;

        assert_eq!(response.status, SolveStatus::Error);
        assert_eq!(response.strategy_used, Strategy::External);
        assert!(response.selected_trades.is_empty());
        assert!(response.diagnostics.external_error.as_deref().unwrap().contains("diverged"));
    }

    #[tokio::test]
    async fn forced_trial_mode_applies_budget() {
        let adapter = CountingAdapter::returning(vec![vec![1, 0]]);
        let client = ExternalSolverClient::new(
            adapter.clone(),
            Arc::new(TrialBudget::new()),
            ExternalClientConfig::default(),
        );
        let orch = HybridOrchestrator::new(
            ClassicalSolver::default(),
            Some(client),
            OrchestratorSettings {
                credential_configured: true,
                force_trial_mode: true,
            },
        );
        let mut params = Parameters::default()
            .with_mode(SolveMode::ExternalOnly)
            .with_trial_mode(false);
        params.max_external_calls = 1;
        let req = request(SolveMode::ExternalOnly).with_parameters(params).unwrap();

        assert_eq!(orch.solve(&req).await.status, SolveStatus::Ok);
        let second = orch.solve(&req).await;

        assert_eq!(second.status, SolveStatus::Skipped);
        assert_eq!(adapter.calls(), 1);
    }

    #[test]
    fn settings_follow_loaded_config() {
        let mut config = AppConfig::default();
        assert!(!OrchestratorSettings::from(&config).credential_configured);

        config.external.api_token = Some("tok".to_string());
        config.external.force_trial_mode = true;
        let settings = OrchestratorSettings::from(&config);
        assert!(settings.credential_configured);
        assert!(settings.force_trial_mode);
    }

    #[test]
    fn from_config_without_token_has_no_external() {
        let orch =
            HybridOrchestrator::from_config(&AppConfig::default(), Arc::new(TrialBudget::new()))
                .unwrap();
        assert!(orch.external().is_none());
    }
}
