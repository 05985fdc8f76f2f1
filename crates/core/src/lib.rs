//! Domain model and configuration for risk-budgeted allocation.
//!
//! Requests are validated once, at construction or deserialization, and are
//! read-only from then on. Responses carry a status enum and structured
//! diagnostics instead of errors for expected runtime conditions.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod response;
pub mod types;

pub use config::{AppConfig, ClassicalSettings, ExternalServiceSettings};
pub use config_loader::ConfigLoader;
pub use error::ValidationError;
pub use response::{
    Diagnostics, OptimizationResponse, PolynomialStats, SelectedTrade, SolveMetrics, SolveStatus,
    Strategy,
};
pub use types::{
    Allocation, CandidateTrade, Components, ConstraintName, Constraints, OptimizationRequest,
    Parameters, Side, SolveMode,
};
