//! Domain types for allocation requests.
//!
//! `OptimizationRequest` is the validation boundary: every numeric field is
//! checked once, either in [`OptimizationRequest::new`] or while deserializing
//! a JSON payload. Solvers downstream only ever see validated requests.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::{ensure_finite, ensure_finite_opt, Result, ValidationError};

/// Direction of a candidate trade.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    #[default]
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Buy => write!(f, "buy"),
            Self::Sell => write!(f, "sell"),
        }
    }
}

/// A trade that may be selected in integer quantities up to `qty_max`.
///
/// All exposure fields are per unit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateTrade {
    pub id: String,
    pub symbol: String,
    #[serde(default)]
    pub side: Side,
    pub qty_max: u32,
    pub ev_per_unit: f64,
    pub premium_per_unit: f64,
    #[serde(default)]
    pub delta: f64,
    #[serde(default)]
    pub gamma: f64,
    #[serde(default)]
    pub vega: f64,
    #[serde(default)]
    pub tail_risk_contribution: f64,
}

impl CandidateTrade {
    /// Creates a candidate with zero greeks and zero tail risk.
    pub fn new(
        id: impl Into<String>,
        symbol: impl Into<String>,
        qty_max: u32,
        ev_per_unit: f64,
        premium_per_unit: f64,
    ) -> Self {
        Self {
            id: id.into(),
            symbol: symbol.into(),
            side: Side::Buy,
            qty_max,
            ev_per_unit,
            premium_per_unit,
            delta: 0.0,
            gamma: 0.0,
            vega: 0.0,
            tail_risk_contribution: 0.0,
        }
    }

    #[must_use]
    pub fn with_side(mut self, side: Side) -> Self {
        self.side = side;
        self
    }

    #[must_use]
    pub fn with_greeks(mut self, delta: f64, gamma: f64, vega: f64) -> Self {
        self.delta = delta;
        self.gamma = gamma;
        self.vega = vega;
        self
    }

    #[must_use]
    pub fn with_tail_risk(mut self, tail_risk_contribution: f64) -> Self {
        self.tail_risk_contribution = tail_risk_contribution;
        self
    }

    /// Profit per unit of premium, with premium floored at `floor`.
    ///
    /// Used for greedy ordering and top-K truncation.
    #[must_use]
    pub fn efficiency(&self, floor: f64) -> f64 {
        self.ev_per_unit / self.premium_per_unit.max(floor)
    }

    /// Checks that the candidate is well formed.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is empty or any numeric field is not finite.
    pub fn validate(&self, position: usize) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::EmptyId { position });
        }
        let field = |name: &str| format!("candidates[{}].{name}", self.id);
        ensure_finite(field("ev_per_unit"), self.ev_per_unit)?;
        ensure_finite(field("premium_per_unit"), self.premium_per_unit)?;
        ensure_finite(field("delta"), self.delta)?;
        ensure_finite(field("gamma"), self.gamma)?;
        ensure_finite(field("vega"), self.vega)?;
        ensure_finite(field("tail_risk_contribution"), self.tail_risk_contribution)?;
        Ok(())
    }
}

/// Hard risk budgets. `None` means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Constraints {
    pub max_cash: Option<f64>,
    pub max_vega: Option<f64>,
    pub max_delta_abs: Option<f64>,
    /// Delta the local search steers toward. Feasibility ignores it.
    pub target_delta: Option<f64>,
    pub max_gamma: Option<f64>,
    pub max_contracts: Option<u64>,
}

impl Constraints {
    #[must_use]
    pub fn unconstrained() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_max_cash(mut self, max_cash: f64) -> Self {
        self.max_cash = Some(max_cash);
        self
    }

    #[must_use]
    pub fn with_max_vega(mut self, max_vega: f64) -> Self {
        self.max_vega = Some(max_vega);
        self
    }

    #[must_use]
    pub fn with_max_delta_abs(mut self, max_delta_abs: f64) -> Self {
        self.max_delta_abs = Some(max_delta_abs);
        self
    }

    #[must_use]
    pub fn with_target_delta(mut self, target_delta: f64) -> Self {
        self.target_delta = Some(target_delta);
        self
    }

    #[must_use]
    pub fn with_max_gamma(mut self, max_gamma: f64) -> Self {
        self.max_gamma = Some(max_gamma);
        self
    }

    #[must_use]
    pub fn with_max_contracts(mut self, max_contracts: u64) -> Self {
        self.max_contracts = Some(max_contracts);
        self
    }

    /// Distance of a delta exposure from the configured target (or zero).
    #[must_use]
    pub fn delta_deviation(&self, delta: f64) -> f64 {
        (delta - self.target_delta.unwrap_or(0.0)).abs()
    }

    /// Budgets must be finite and non-negative, so the empty allocation is
    /// always feasible.
    ///
    /// # Errors
    ///
    /// Returns an error if a bound is not finite or a budget is negative.
    pub fn validate(&self) -> Result<()> {
        for (name, budget) in [
            ("constraints.max_cash", self.max_cash),
            ("constraints.max_vega", self.max_vega),
            ("constraints.max_delta_abs", self.max_delta_abs),
            ("constraints.max_gamma", self.max_gamma),
        ] {
            ensure_finite_opt(name, budget)?;
            if let Some(value) = budget.filter(|v| *v < 0.0) {
                return Err(ValidationError::negative(name, value));
            }
        }
        ensure_finite_opt("constraints.target_delta", self.target_delta)?;
        Ok(())
    }
}

/// Names of the hard constraints, used as violation keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintName {
    Cash,
    Vega,
    Delta,
    Gamma,
    Contracts,
}

impl fmt::Display for ConstraintName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cash => write!(f, "cash"),
            Self::Vega => write!(f, "vega"),
            Self::Delta => write!(f, "delta"),
            Self::Gamma => write!(f, "gamma"),
            Self::Contracts => write!(f, "contracts"),
        }
    }
}

/// Which solving strategy a request asks for.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMode {
    /// External solver first, classical fallback.
    #[default]
    Hybrid,
    ClassicalOnly,
    ExternalOnly,
}

impl fmt::Display for SolveMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Hybrid => write!(f, "hybrid"),
            Self::ClassicalOnly => write!(f, "classical_only"),
            Self::ExternalOnly => write!(f, "external_only"),
        }
    }
}

impl std::str::FromStr for SolveMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "hybrid" => Ok(Self::Hybrid),
            "classical_only" | "classical" => Ok(Self::ClassicalOnly),
            "external_only" | "external" => Ok(Self::ExternalOnly),
            other => Err(format!("unknown solve mode: {other}")),
        }
    }
}

/// Penalty weights and solver controls.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Parameters {
    pub lambda_tail: f64,
    pub lambda_cash: f64,
    pub lambda_vega: f64,
    pub lambda_delta: f64,
    pub lambda_gamma: f64,
    /// Samples requested from the external solver.
    pub num_samples: u32,
    pub mode: SolveMode,
    pub trial_mode: bool,
    /// Hard ceiling on candidates sent to the external solver.
    pub max_candidates_for_external: usize,
    /// Cap on external calls while in trial mode.
    pub max_external_calls: u32,
    pub timeout_seconds: f64,
    /// Seed for the classical local search. `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            lambda_tail: 1.0,
            lambda_cash: 1.0,
            lambda_vega: 1.0,
            lambda_delta: 1.0,
            lambda_gamma: 1.0,
            num_samples: 100,
            mode: SolveMode::Hybrid,
            trial_mode: true,
            max_candidates_for_external: 60,
            max_external_calls: 10,
            timeout_seconds: 60.0,
            seed: None,
        }
    }
}

impl Parameters {
    #[must_use]
    pub fn with_mode(mut self, mode: SolveMode) -> Self {
        self.mode = mode;
        self
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    #[must_use]
    pub fn with_trial_mode(mut self, trial_mode: bool) -> Self {
        self.trial_mode = trial_mode;
        self
    }

    /// # Errors
    ///
    /// Returns an error if a weight is negative or not finite, or a count
    /// or timeout is not strictly positive.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("parameters.lambda_tail", self.lambda_tail),
            ("parameters.lambda_cash", self.lambda_cash),
            ("parameters.lambda_vega", self.lambda_vega),
            ("parameters.lambda_delta", self.lambda_delta),
            ("parameters.lambda_gamma", self.lambda_gamma),
        ] {
            ensure_finite(name, value)?;
            if value < 0.0 {
                return Err(ValidationError::negative(name, value));
            }
        }
        if self.num_samples == 0 {
            return Err(ValidationError::non_positive("parameters.num_samples"));
        }
        if self.max_candidates_for_external == 0 {
            return Err(ValidationError::non_positive(
                "parameters.max_candidates_for_external",
            ));
        }
        if self.max_external_calls == 0 {
            return Err(ValidationError::non_positive("parameters.max_external_calls"));
        }
        ensure_finite("parameters.timeout_seconds", self.timeout_seconds)?;
        if self.timeout_seconds <= 0.0 {
            return Err(ValidationError::non_positive("parameters.timeout_seconds"));
        }
        Ok(())
    }
}

/// Loosely-typed wire form of a request, validated into [`OptimizationRequest`].
#[derive(Debug, Clone, Deserialize)]
struct RawRequest {
    #[serde(default)]
    candidates: Vec<CandidateTrade>,
    #[serde(default)]
    constraints: Constraints,
    #[serde(default)]
    parameters: Parameters,
}

impl TryFrom<RawRequest> for OptimizationRequest {
    type Error = ValidationError;

    fn try_from(raw: RawRequest) -> Result<Self> {
        Self::new(raw.candidates, raw.constraints, raw.parameters)
    }
}

/// A validated allocation problem.
///
/// Fields are private so a request can only exist in validated form. Solvers
/// borrow it immutably; reduced problems are built with
/// [`OptimizationRequest::with_candidates`], which copies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(try_from = "RawRequest")]
pub struct OptimizationRequest {
    candidates: Vec<CandidateTrade>,
    constraints: Constraints,
    parameters: Parameters,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl OptimizationRequest {
    /// Validates and assembles a request.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure found.
    pub fn new(
        candidates: Vec<CandidateTrade>,
        constraints: Constraints,
        parameters: Parameters,
    ) -> Result<Self> {
        constraints.validate()?;
        parameters.validate()?;

        let mut index = HashMap::with_capacity(candidates.len());
        for (position, candidate) in candidates.iter().enumerate() {
            candidate.validate(position)?;
            if index.insert(candidate.id.clone(), position).is_some() {
                return Err(ValidationError::duplicate(&candidate.id));
            }
        }

        Ok(Self {
            candidates,
            constraints,
            parameters,
            index,
        })
    }

    #[must_use]
    pub fn candidates(&self) -> &[CandidateTrade] {
        &self.candidates
    }

    #[must_use]
    pub fn constraints(&self) -> &Constraints {
        &self.constraints
    }

    #[must_use]
    pub fn parameters(&self) -> &Parameters {
        &self.parameters
    }

    /// Looks up a candidate by id.
    #[must_use]
    pub fn candidate(&self, id: &str) -> Option<&CandidateTrade> {
        self.index.get(id).map(|&i| &self.candidates[i])
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Copies this request with a different candidate subset.
    ///
    /// The subset is taken from already-validated candidates, so only the
    /// index is rebuilt.
    #[must_use]
    pub fn with_candidates(&self, candidates: Vec<CandidateTrade>) -> Self {
        let index = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id.clone(), i))
            .collect();
        Self {
            candidates,
            constraints: self.constraints.clone(),
            parameters: self.parameters.clone(),
            index,
        }
    }

    /// Copies this request with only the trial flag changed.
    ///
    /// The flag has no validation rule, so this cannot fail.
    #[must_use]
    pub fn with_trial_mode(&self, trial_mode: bool) -> Self {
        Self {
            candidates: self.candidates.clone(),
            constraints: self.constraints.clone(),
            parameters: self.parameters.clone().with_trial_mode(trial_mode),
            index: self.index.clone(),
        }
    }

    /// Copies this request with different parameters.
    ///
    /// # Errors
    ///
    /// Returns an error if the new parameters are invalid.
    pub fn with_parameters(&self, parameters: Parameters) -> Result<Self> {
        parameters.validate()?;
        Ok(Self {
            candidates: self.candidates.clone(),
            constraints: self.constraints.clone(),
            parameters,
            index: self.index.clone(),
        })
    }
}

/// Integer quantities keyed by candidate id.
///
/// Zero quantities are never stored. Ids unknown to a request are carried
/// but contribute nothing when scored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "BTreeMap<String, u32>")]
pub struct Allocation(BTreeMap<String, u32>);

impl Allocation {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Quantity held for `id`, zero when absent.
    #[must_use]
    pub fn get(&self, id: &str) -> u32 {
        self.0.get(id).copied().unwrap_or(0)
    }

    /// Sets the quantity for `id`; zero removes the entry.
    pub fn set(&mut self, id: impl Into<String>, qty: u32) {
        let id = id.into();
        if qty == 0 {
            self.0.remove(&id);
        } else {
            self.0.insert(id, qty);
        }
    }

    pub fn increment(&mut self, id: &str) {
        *self.0.entry(id.to_string()).or_insert(0) += 1;
    }

    /// Removes one unit. Returns false if nothing was held.
    pub fn decrement(&mut self, id: &str) -> bool {
        match self.0.get_mut(id) {
            Some(qty) if *qty > 1 => {
                *qty -= 1;
                true
            }
            Some(_) => {
                self.0.remove(id);
                true
            }
            None => false,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, u32)> {
        self.0.iter().map(|(id, &qty)| (id.as_str(), qty))
    }

    /// Number of ids with a non-zero quantity.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn total_quantity(&self) -> u64 {
        self.0.values().map(|&q| u64::from(q)).sum()
    }
}

impl FromIterator<(String, u32)> for Allocation {
    fn from_iter<I: IntoIterator<Item = (String, u32)>>(iter: I) -> Self {
        let mut allocation = Self::new();
        for (id, qty) in iter {
            allocation.set(id, qty);
        }
        allocation
    }
}

impl From<BTreeMap<String, u32>> for Allocation {
    fn from(map: BTreeMap<String, u32>) -> Self {
        map.into_iter().collect()
    }
}

impl<'a> FromIterator<(&'a str, u32)> for Allocation {
    fn from_iter<I: IntoIterator<Item = (&'a str, u32)>>(iter: I) -> Self {
        iter.into_iter().map(|(id, q)| (id.to_string(), q)).collect()
    }
}

/// Exposure totals derived from an allocation. Never stored on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Components {
    pub expected_profit: f64,
    pub total_premium: f64,
    /// Square of the summed tail-risk contribution.
    pub tail_risk_value: f64,
    pub delta: f64,
    pub gamma: f64,
    pub vega: f64,
    pub quantity_total: u64,
}

impl Components {
    /// Expected profit net of premium paid.
    #[must_use]
    pub fn net_profit(&self) -> f64 {
        self.expected_profit - self.total_premium
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: &str) -> CandidateTrade {
        CandidateTrade::new(id, "SPY", 3, 10.0, 2.0)
    }

    #[test]
    fn request_rejects_non_finite_candidate_field() {
        let bad = candidate("c1").with_greeks(0.5, f64::NAN, 1.0);
        let err = OptimizationRequest::new(vec![bad], Constraints::default(), Parameters::default())
            .unwrap_err();
        assert!(matches!(
            err,
            ValidationError::NonFinite { ref field, .. } if field.ends_with("gamma")
        ));
    }

    #[test]
    fn request_rejects_duplicate_ids() {
        let err = OptimizationRequest::new(
            vec![candidate("c1"), candidate("c1")],
            Constraints::default(),
            Parameters::default(),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::duplicate("c1"));
    }

    #[test]
    fn request_rejects_empty_id() {
        let err = OptimizationRequest::new(
            vec![candidate("  ")],
            Constraints::default(),
            Parameters::default(),
        )
        .unwrap_err();
        assert_eq!(err, ValidationError::EmptyId { position: 0 });
    }

    #[test]
    fn request_rejects_infinite_constraint() {
        let constraints = Constraints::default().with_max_cash(f64::INFINITY);
        let err = OptimizationRequest::new(vec![], constraints, Parameters::default()).unwrap_err();
        assert_eq!(err.field(), Some("constraints.max_cash"));
    }

    #[test]
    fn parameters_reject_zero_counts_and_timeouts() {
        let mut params = Parameters::default();
        params.num_samples = 0;
        assert!(params.validate().is_err());

        let mut params = Parameters::default();
        params.max_external_calls = 0;
        assert!(params.validate().is_err());

        let mut params = Parameters::default();
        params.timeout_seconds = 0.0;
        assert_eq!(
            params.validate().unwrap_err(),
            ValidationError::non_positive("parameters.timeout_seconds")
        );

        let mut params = Parameters::default();
        params.lambda_tail = -1.0;
        assert!(matches!(
            params.validate().unwrap_err(),
            ValidationError::Negative { .. }
        ));
    }

    #[test]
    fn deserialize_validates_payload() {
        let ok = serde_json::json!({
            "candidates": [
                {
                    "id": "c1",
                    "symbol": "SPY",
                    "qty_max": 2,
                    "ev_per_unit": 5.0,
                    "premium_per_unit": 1.0
                }
            ],
            "constraints": {"max_cash": 10.0},
            "parameters": {"mode": "classical_only"}
        });
        let request: OptimizationRequest = serde_json::from_value(ok).unwrap();
        assert_eq!(request.len(), 1);
        assert_eq!(request.parameters().mode, SolveMode::ClassicalOnly);
        assert_eq!(request.candidate("c1").map(|c| c.qty_max), Some(2));

        let negative_qty = serde_json::json!({
            "candidates": [
                {
                    "id": "c1",
                    "symbol": "SPY",
                    "qty_max": -1,
                    "ev_per_unit": 5.0,
                    "premium_per_unit": 1.0
                }
            ]
        });
        assert!(serde_json::from_value::<OptimizationRequest>(negative_qty).is_err());

        let zero_samples = serde_json::json!({"parameters": {"num_samples": 0}});
        assert!(serde_json::from_value::<OptimizationRequest>(zero_samples).is_err());

        let bad_mode = serde_json::json!({"parameters": {"mode": "quantum"}});
        assert!(serde_json::from_value::<OptimizationRequest>(bad_mode).is_err());
    }

    #[test]
    fn with_candidates_leaves_original_untouched() {
        let request = OptimizationRequest::new(
            vec![candidate("a"), candidate("b"), candidate("c")],
            Constraints::default(),
            Parameters::default(),
        )
        .unwrap();
        let reduced = request.with_candidates(vec![request.candidates()[2].clone()]);

        assert_eq!(request.len(), 3);
        assert_eq!(reduced.len(), 1);
        assert!(reduced.candidate("c").is_some());
        assert!(reduced.candidate("a").is_none());
    }

    #[test]
    fn allocation_never_stores_zero() {
        let mut alloc = Allocation::new();
        alloc.set("a", 2);
        alloc.set("b", 0);
        assert_eq!(alloc.len(), 1);

        assert!(alloc.decrement("a"));
        assert!(alloc.decrement("a"));
        assert!(!alloc.decrement("a"));
        assert!(alloc.is_empty());

        alloc.increment("c");
        alloc.increment("c");
        assert_eq!(alloc.get("c"), 2);
        assert_eq!(alloc.total_quantity(), 2);
    }

    #[test]
    fn constraints_reject_negative_budgets() {
        let cases = [
            ("constraints.max_cash", Constraints::default().with_max_cash(-1.0)),
            ("constraints.max_vega", Constraints::default().with_max_vega(-0.5)),
            ("constraints.max_delta_abs", Constraints::default().with_max_delta_abs(-2.0)),
            ("constraints.max_gamma", Constraints::default().with_max_gamma(-0.1)),
        ];
        for (field, constraints) in cases {
            let err = constraints.validate().unwrap_err();
            assert!(matches!(err, ValidationError::Negative { .. }), "{field}: {err:?}");
            assert_eq!(err.field(), Some(field));
        }

        let zero = Constraints::default()
            .with_max_cash(0.0)
            .with_max_delta_abs(0.0)
            .with_target_delta(-25.0);
        assert!(zero.validate().is_ok());
    }

    #[test]
    fn allocation_deserialize_drops_zero_quantities() {
        let alloc: Allocation = serde_json::from_str(r#"{"a":0,"b":2}"#).unwrap();
        assert_eq!(alloc.len(), 1);
        assert_eq!(alloc.get("a"), 0);
        assert_eq!(alloc.get("b"), 2);
        assert_eq!(serde_json::to_string(&alloc).unwrap(), r#"{"b":2}"#);
    }

    #[test]
    fn with_trial_mode_only_flips_the_flag() {
        let request = OptimizationRequest::new(
            vec![candidate("a")],
            Constraints::default().with_max_cash(5.0),
            Parameters::default().with_seed(9),
        )
        .unwrap();
        let trial = request.with_trial_mode(true);

        assert!(trial.parameters().trial_mode);
        assert!(!request.parameters().trial_mode);
        assert_eq!(trial.parameters().seed, Some(9));
        assert_eq!(trial.constraints(), request.constraints());
        assert!(trial.candidate("a").is_some());
    }

    #[test]
    fn delta_deviation_uses_target() {
        let constraints = Constraints::default().with_target_delta(10.0);
        assert_eq!(constraints.delta_deviation(7.0), 3.0);
        assert_eq!(Constraints::default().delta_deviation(-4.0), 4.0);
    }

    #[test]
    fn solve_mode_parses_aliases() {
        assert_eq!("classical".parse::<SolveMode>(), Ok(SolveMode::ClassicalOnly));
        assert_eq!("external_only".parse::<SolveMode>(), Ok(SolveMode::ExternalOnly));
        assert!("annealing".parse::<SolveMode>().is_err());
    }
}
