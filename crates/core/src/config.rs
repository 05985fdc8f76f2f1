use serde::{Deserialize, Serialize};

/// Top-level configuration for the allocation engine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub classical: ClassicalSettings,
    pub external: ExternalServiceSettings,
}

/// Classical local-search controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassicalSettings {
    /// Wall-clock budget for local search, polled between swap attempts.
    pub search_budget_ms: u64,
    /// Optional hard cap on swap attempts.
    pub max_iterations: Option<usize>,
    /// Default seed when a request does not carry one.
    pub seed: Option<u64>,
}

impl Default for ClassicalSettings {
    fn default() -> Self {
        Self {
            search_budget_ms: 50,
            max_iterations: None,
            seed: None,
        }
    }
}

/// External annealing service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalServiceSettings {
    pub base_url: String,
    /// Bearer token. Absence disables the external path.
    pub api_token: Option<String>,
    pub device_type: String,
    pub relaxation_schedule: u32,
    /// Timeout outside trial mode.
    pub default_timeout_secs: u64,
    pub poll_interval_ms: u64,
    /// Applies trial limits even when a request does not ask for them.
    pub force_trial_mode: bool,
    pub trial_max_samples: u32,
    pub trial_max_timeout_secs: u64,
    /// Candidate count above which trial runs keep only the top-K by efficiency.
    pub trial_candidate_cap: usize,
}

impl Default for ExternalServiceSettings {
    fn default() -> Self {
        Self {
            base_url: "https://api.annealing.example.com".to_string(),
            api_token: None,
            device_type: "dirac-3".to_string(),
            relaxation_schedule: 1,
            default_timeout_secs: 60,
            poll_interval_ms: 500,
            force_trial_mode: false,
            trial_max_samples: 5,
            trial_max_timeout_secs: 10,
            trial_candidate_cap: 20,
        }
    }
}

impl ExternalServiceSettings {
    /// True when a non-blank credential is configured.
    #[must_use]
    pub fn credential_configured(&self) -> bool {
        self.api_token
            .as_deref()
            .is_some_and(|token| !token.trim().is_empty())
    }

    /// Copy safe to print: the token is replaced by a marker.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            api_token: self.api_token.as_ref().map(|_| "<redacted>".to_string()),
            ..self.clone()
        }
    }
}

impl AppConfig {
    /// Copy safe to print.
    #[must_use]
    pub fn redacted(&self) -> Self {
        Self {
            classical: self.classical.clone(),
            external: self.external.redacted(),
        }
    }
}
