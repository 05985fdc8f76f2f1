//! Polynomial CLI command.
//!
//! Prints the normalized polynomial that would be submitted to the external
//! solver, with its construction statistics. No service is contacted.

use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use risk_alloc_engine::build_for_request;

use super::{read_request, to_json};

/// Arguments for the polynomial command.
#[derive(Args, Debug, Clone)]
pub struct PolynomialArgs {
    /// JSON request file
    #[arg(short, long)]
    pub request: PathBuf,

    /// Print only the statistics
    #[arg(long)]
    pub stats_only: bool,

    /// Pretty-print the output
    #[arg(long)]
    pub pretty: bool,
}

/// Runs the polynomial command.
///
/// # Errors
/// Returns an error if the request cannot be loaded.
pub fn run_polynomial(args: PolynomialArgs) -> Result<()> {
    let request = read_request(&args.request)?;
    let polynomial = build_for_request(&request);

    if polynomial.stats.approximated {
        tracing::warn!(
            candidates = polynomial.stats.candidate_count,
            pairs_dropped = polynomial.stats.pairs_dropped,
            "Off-diagonal pairs were truncated"
        );
    }

    let output = if args.stats_only {
        to_json(&polynomial.stats, args.pretty)?
    } else {
        to_json(&polynomial, args.pretty)?
    };
    println!("{output}");
    Ok(())
}
