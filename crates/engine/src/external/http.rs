//! REST adapter for the hosted annealing service.
//!
//! A solve is a three step job cycle:
//!
//! 1. `POST /v1/jobs` submits the polynomial and returns a job id.
//! 2. `GET /v1/jobs/{id}` is polled until the job completes or fails.
//! 3. `GET /v1/jobs/{id}/result` fetches the samples.
//!
//! The whole cycle is bounded by the per-call timeout in [`AdapterParams`].
//! The service answers either with integer samples or with a single
//! normalized `[0, 1]` solution, which is mapped back onto
//! `[var_min, var_max]`.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use risk_alloc_core::ExternalServiceSettings;

use super::adapter::{AdapterParams, SampleSet, SolverAdapter};
use super::error::AdapterError;
use crate::polynomial::Term;

// =============================================================================
// Configuration
// =============================================================================

/// Connection settings for [`HttpSolverAdapter`].
#[derive(Clone)]
pub struct HttpAdapterConfig {
    pub base_url: String,
    pub api_token: SecretString,
    /// Delay between status polls.
    pub poll_interval: Duration,
    /// Bound on each individual HTTP request.
    pub request_timeout: Duration,
}

impl std::fmt::Debug for HttpAdapterConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpAdapterConfig")
            .field("base_url", &self.base_url)
            .field("poll_interval", &self.poll_interval)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl HttpAdapterConfig {
    pub fn new(base_url: impl Into<String>, api_token: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_token: SecretString::from(api_token.into()),
            poll_interval: Duration::from_millis(500),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Builds the config from loaded settings. `None` when no credential
    /// is configured.
    #[must_use]
    pub fn from_settings(settings: &ExternalServiceSettings) -> Option<Self> {
        if !settings.credential_configured() {
            return None;
        }
        let token = settings.api_token.clone()?;
        Some(
            Self::new(settings.base_url.clone(), token)
                .with_poll_interval(Duration::from_millis(settings.poll_interval_ms)),
        )
    }

    #[must_use]
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

// =============================================================================
// Wire types
// =============================================================================

#[derive(Debug, Serialize)]
struct JobRequest<'a> {
    device_type: &'a str,
    num_samples: u32,
    relaxation_schedule: u32,
    var_min: i64,
    var_max: i64,
    timeout_secs: f64,
    polynomial: &'a [Term],
}

#[derive(Debug, Deserialize)]
struct JobCreated {
    job_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
enum JobState {
    Queued,
    Running,
    Completed,
    Failed,
}

#[derive(Debug, Deserialize)]
struct JobStatus {
    status: JobState,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawJobResult {
    #[serde(default)]
    samples: Option<Vec<Vec<i64>>>,
    #[serde(default)]
    energies: Option<Vec<f64>>,
    /// Normalized single solution, each entry in `[0, 1]`.
    #[serde(default)]
    solution: Option<Vec<f64>>,
    #[serde(default)]
    energy: Option<f64>,
}

impl RawJobResult {
    fn into_sample_set(self, var_min: i64, var_max: i64) -> Result<SampleSet, AdapterError> {
        if let Some(samples) = self.samples.filter(|s| !s.is_empty()) {
            return Ok(SampleSet {
                samples,
                energies: self.energies.unwrap_or_default(),
            });
        }

        match self.solution {
            Some(solution) if !solution.is_empty() => {
                let sample = solution
                    .iter()
                    .map(|&v| denormalize(v, var_min, var_max))
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(SampleSet {
                    samples: vec![sample],
                    energies: self.energy.into_iter().collect(),
                })
            }
            _ => Err(AdapterError::EmptyResult),
        }
    }
}

/// Maps a normalized value onto the integer range `[min, max]`.
fn denormalize(value: f64, min: i64, max: i64) -> Result<i64, AdapterError> {
    if !value.is_finite() {
        return Err(AdapterError::InvalidResponse(format!(
            "non-finite solution value: {value}"
        )));
    }
    let span = (max - min) as f64;
    let scaled = (min as f64 + value.clamp(0.0, 1.0) * span).round() as i64;
    Ok(scaled.clamp(min, max))
}

// =============================================================================
// HttpSolverAdapter
// =============================================================================

/// [`SolverAdapter`] backed by the service's REST job API.
pub struct HttpSolverAdapter {
    config: HttpAdapterConfig,
    http: Client,
}

impl std::fmt::Debug for HttpSolverAdapter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpSolverAdapter")
            .field("base_url", &self.config.base_url)
            .finish_non_exhaustive()
    }
}

impl HttpSolverAdapter {
    /// # Errors
    /// Returns error if the HTTP client cannot be built.
    pub fn new(config: HttpAdapterConfig) -> Result<Self, AdapterError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AdapterError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { config, http })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Rejects job ids that could escape the jobs path.
    fn validate_job_id(id: &str) -> Result<&str, AdapterError> {
        if id.is_empty() || id.len() > 128 {
            return Err(AdapterError::InvalidResponse(format!(
                "invalid job id length: {}",
                id.len()
            )));
        }
        if !id.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(AdapterError::InvalidResponse(format!("invalid job id: {id}")));
        }
        Ok(id)
    }

    async fn get<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T, AdapterError> {
        let url = format!("{}{}", self.config.base_url, path);
        debug!("GET {}", url);

        let response = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .bearer_auth(self.config.api_token.expose_secret())
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn post<T: serde::de::DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, AdapterError> {
        let url = format!("{}{}", self.config.base_url, path);
        let body_json = serde_json::to_string(body)?;
        debug!("POST {} body_len={}", url, body_json.len());

        let response = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .header("Content-Type", "application/json")
            .bearer_auth(self.config.api_token.expose_secret())
            .body(body_json)
            .send()
            .await?;

        Self::handle_response(response).await
    }

    async fn handle_response<T: serde::de::DeserializeOwned>(
        response: reqwest::Response,
    ) -> Result<T, AdapterError> {
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(AdapterError::api(status.as_u16(), text));
        }

        Ok(serde_json::from_str(&text)?)
    }

    async fn submit(
        &self,
        polynomial: &[Term],
        params: &AdapterParams,
    ) -> Result<String, AdapterError> {
        let body = JobRequest {
            device_type: &params.device_type,
            num_samples: params.num_samples,
            relaxation_schedule: params.relaxation_schedule,
            var_min: params.var_min,
            var_max: params.var_max,
            timeout_secs: params.timeout.as_secs_f64(),
            polynomial,
        };
        let created: JobCreated = self.post("/v1/jobs", &body).await?;
        Self::validate_job_id(&created.job_id)?;
        Ok(created.job_id)
    }

    async fn wait_for_completion(&self, job_id: &str) -> Result<(), AdapterError> {
        let path = format!("/v1/jobs/{job_id}");
        loop {
            let status: JobStatus = self.get(&path).await?;
            match status.status {
                JobState::Completed => return Ok(()),
                JobState::Failed => {
                    return Err(AdapterError::JobFailed(
                        status.error.unwrap_or_else(|| "no detail".to_string()),
                    ))
                }
                JobState::Queued | JobState::Running => {
                    tokio::time::sleep(self.config.poll_interval).await;
                }
            }
        }
    }

    async fn run_job(
        &self,
        polynomial: &[Term],
        params: &AdapterParams,
    ) -> Result<SampleSet, AdapterError> {
        let job_id = self.submit(polynomial, params).await?;
        debug!(job_id = %job_id, "Solver job submitted");

        self.wait_for_completion(&job_id).await?;

        let raw: RawJobResult = self.get(&format!("/v1/jobs/{job_id}/result")).await?;
        let samples = raw.into_sample_set(params.var_min, params.var_max)?;
        debug!(job_id = %job_id, samples = samples.samples.len(), "Solver job result fetched");
        Ok(samples)
    }
}

#[async_trait]
impl SolverAdapter for HttpSolverAdapter {
    async fn solve(
        &self,
        polynomial: &[Term],
        params: &AdapterParams,
    ) -> Result<SampleSet, AdapterError> {
        match tokio::time::timeout(params.timeout, self.run_job(polynomial, params)).await {
            Ok(result) => result,
            Err(_) => Err(AdapterError::Timeout(params.timeout)),
        }
    }

    fn name(&self) -> &str {
        "http"
    }
}
