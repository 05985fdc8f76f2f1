//! External annealing solver path.
//!
//! - [`SolverAdapter`]: the contract with the remote service
//! - [`HttpSolverAdapter`]: REST implementation (submit, poll, fetch)
//! - [`TrialBudget`]: process-wide call counter
//! - [`ExternalSolverClient`]: builds the polynomial, gates on the budget and
//!   scores every returned sample

mod adapter;
mod budget;
mod client;
mod error;
mod http;

pub use adapter::{AdapterParams, SampleSet, SolverAdapter};
pub use budget::TrialBudget;
pub use client::{ExternalClientConfig, ExternalSolverClient, BUDGET_EXHAUSTED};
pub use error::{AdapterError, ExternalSolveError};
pub use http::{HttpAdapterConfig, HttpSolverAdapter};
