//! Integer allocation engine for risk-budgeted trade selection.
//!
//! Two interchangeable solving strategies share one scoring authority:
//!
//! - [`ClassicalSolver`]: greedy initialization plus time-boxed local search
//! - [`ExternalSolverClient`]: submits a normalized quadratic polynomial to an
//!   annealing service through a [`SolverAdapter`]
//! - [`postprocess_and_score`]: clamps, repairs and scores every allocation
//!   either strategy returns
//!
//! [`HybridOrchestrator`] picks the strategy per request and falls back to
//! the classical solver when the external path is unavailable.
//!
//! # Example
//!
//! ```ignore
//! use risk_alloc_core::{CandidateTrade, Constraints, OptimizationRequest, Parameters, SolveMode};
//! use risk_alloc_engine::{ClassicalSolver, HybridOrchestrator};
//!
//! let request = OptimizationRequest::new(
//!     vec![CandidateTrade::new("c1", "SPX", 2, 120.0, 15.0)],
//!     Constraints::default().with_max_cash(30.0),
//!     Parameters::default().with_mode(SolveMode::ClassicalOnly),
//! )?;
//! let response = HybridOrchestrator::classical_only(ClassicalSolver::default())
//!     .solve(&request)
//!     .await;
//! ```

pub mod classical;
pub mod external;
pub mod objective;
pub mod orchestrator;
pub mod polynomial;
pub mod repair;

pub use classical::{greedy_initialize, ClassicalConfig, ClassicalSolver, SearchOutcome, Swap};
pub use external::{
    AdapterError, AdapterParams, ExternalClientConfig, ExternalSolveError, ExternalSolverClient,
    HttpAdapterConfig, HttpSolverAdapter, SampleSet, SolverAdapter, TrialBudget,
};
pub use objective::{
    check_hard_constraints, compute_components, energy, objective_value, raw_exposure_energy,
    Feasibility, ObjectiveVariant,
};
pub use orchestrator::{HybridOrchestrator, OrchestratorSettings};
pub use polynomial::{
    build_for_request, build_polynomial, Polynomial, PolynomialInput, PolynomialWeights, Term,
    VariableTerm,
};
pub use repair::{greedy_repair, postprocess_and_score, vector_to_qty_map, ScoredAllocation};
