//! Solve CLI command.
//!
//! Runs one request through the hybrid orchestrator and prints the response
//! as JSON on stdout.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use risk_alloc_core::{OptimizationRequest, SolveMode};
use risk_alloc_engine::{HybridOrchestrator, TrialBudget};

use super::{load_config, read_request, to_json};

/// Arguments for the solve command.
#[derive(Args, Debug, Clone)]
pub struct SolveArgs {
    /// JSON request file
    #[arg(short, long)]
    pub request: PathBuf,

    /// Config file path (defaults to config/Optimizer.toml)
    #[arg(short, long)]
    pub config: Option<String>,

    /// Config profile layered over the base file
    #[arg(long, env = "RISK_ALLOC_PROFILE")]
    pub profile: Option<String>,

    /// Overrides the request's solve mode (hybrid, classical_only, external_only)
    #[arg(long)]
    pub mode: Option<SolveMode>,

    /// Seed for the classical local search
    #[arg(long)]
    pub seed: Option<u64>,

    /// Pretty-print the response
    #[arg(long)]
    pub pretty: bool,
}

/// Applies command-line overrides to the request parameters.
fn apply_overrides(request: OptimizationRequest, args: &SolveArgs) -> Result<OptimizationRequest> {
    if args.mode.is_none() && args.seed.is_none() {
        return Ok(request);
    }

    let mut parameters = request.parameters().clone();
    if let Some(mode) = args.mode {
        parameters = parameters.with_mode(mode);
    }
    if let Some(seed) = args.seed {
        parameters = parameters.with_seed(seed);
    }
    Ok(request.with_parameters(parameters)?)
}

/// Runs the solve command.
///
/// # Errors
/// Returns an error if the request or configuration cannot be loaded.
/// Solver failures are reported inside the printed response.
pub async fn run_solve(args: SolveArgs) -> Result<()> {
    let config = load_config(args.config.as_deref(), args.profile.as_deref())?;
    let request = apply_overrides(read_request(&args.request)?, &args)?;

    tracing::info!(
        candidates = request.len(),
        mode = %request.parameters().mode,
        external_configured = config.external.credential_configured(),
        "Loaded optimization request"
    );

    let orchestrator = HybridOrchestrator::from_config(&config, Arc::new(TrialBudget::new()))?;
    let response = orchestrator.solve(&request).await;

    println!("{}", to_json(&response, args.pretty)?);
    Ok(())
}
