//! Exposure totals, feasibility and energy for any allocation.
//!
//! Two energy formulas coexist and gate different decisions:
//!
//! - [`ObjectiveVariant::ThresholdBreach`] penalizes only the amount by which a
//!   configured budget is exceeded. It scores every allocation that leaves the
//!   engine.
//! - [`ObjectiveVariant::RawExposure`] penalizes the square of raw exposure
//!   whether or not a budget is configured. It decides swap acceptance inside
//!   the classical local search.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use risk_alloc_core::{Allocation, Components, ConstraintName, Constraints, OptimizationRequest};

/// Named energy formulas. See the module docs for which one gates what.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectiveVariant {
    /// Squared overage beyond configured budgets. Used for reporting.
    ThresholdBreach,
    /// Unconditional squared exposure. Used for local-search acceptance.
    RawExposure,
}

/// Result of a hard-constraint check.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feasibility {
    pub ok: bool,
    /// Offending value per breached constraint.
    pub violations: BTreeMap<ConstraintName, f64>,
}

/// Sums per-unit exposures over an allocation.
///
/// Ids the request does not know are skipped. The tail term is squared after
/// summation, so it grows quadratically with concentration.
#[must_use]
pub fn compute_components(request: &OptimizationRequest, allocation: &Allocation) -> Components {
    let mut components = Components::default();
    let mut tail_sum = 0.0;

    for (id, qty) in allocation.iter() {
        let Some(candidate) = request.candidate(id) else {
            continue;
        };
        let q = f64::from(qty);
        components.expected_profit += q * candidate.ev_per_unit;
        components.total_premium += q * candidate.premium_per_unit;
        components.delta += q * candidate.delta;
        components.gamma += q * candidate.gamma;
        components.vega += q * candidate.vega;
        components.quantity_total += u64::from(qty);
        tail_sum += q * candidate.tail_risk_contribution;
    }

    components.tail_risk_value = tail_sum * tail_sum;
    components
}

/// Checks only the constraints that are configured.
///
/// Vega, gamma and delta compare absolute exposure; cash and contracts are
/// plain upper bounds. `target_delta` plays no part here.
#[must_use]
pub fn check_hard_constraints(constraints: &Constraints, components: &Components) -> Feasibility {
    let mut violations = BTreeMap::new();

    if let Some(max_cash) = constraints.max_cash {
        if components.total_premium > max_cash {
            violations.insert(ConstraintName::Cash, components.total_premium);
        }
    }
    if let Some(max_vega) = constraints.max_vega {
        if components.vega.abs() > max_vega {
            violations.insert(ConstraintName::Vega, components.vega);
        }
    }
    if let Some(max_delta) = constraints.max_delta_abs {
        if components.delta.abs() > max_delta {
            violations.insert(ConstraintName::Delta, components.delta);
        }
    }
    if let Some(max_gamma) = constraints.max_gamma {
        if components.gamma.abs() > max_gamma {
            violations.insert(ConstraintName::Gamma, components.gamma);
        }
    }
    if let Some(max_contracts) = constraints.max_contracts {
        if components.quantity_total > max_contracts {
            violations.insert(ConstraintName::Contracts, components.quantity_total as f64);
        }
    }

    Feasibility {
        ok: violations.is_empty(),
        violations,
    }
}

/// Reporting energy: negative net profit, tail penalty, and squared overage
/// for every configured budget that is breached.
#[must_use]
pub fn objective_value(request: &OptimizationRequest, components: &Components) -> f64 {
    let p = request.parameters();
    let c = request.constraints();

    let mut energy = -components.net_profit() + p.lambda_tail * components.tail_risk_value;

    if let Some(max_cash) = c.max_cash {
        energy += p.lambda_cash * overage_sq(components.total_premium, max_cash);
    }
    if let Some(max_vega) = c.max_vega {
        energy += p.lambda_vega * overage_sq(components.vega.abs(), max_vega);
    }
    if let Some(max_delta) = c.max_delta_abs {
        energy += p.lambda_delta * overage_sq(components.delta.abs(), max_delta);
    }
    if let Some(max_gamma) = c.max_gamma {
        energy += p.lambda_gamma * overage_sq(components.gamma.abs(), max_gamma);
    }

    energy
}

/// Search energy: negative net profit, tail penalty, and squared raw exposure
/// in premium and each greek, regardless of configured budgets. Delta is
/// measured from `target_delta` when one is set.
#[must_use]
pub fn raw_exposure_energy(request: &OptimizationRequest, components: &Components) -> f64 {
    let p = request.parameters();
    let delta_offset = request.constraints().delta_deviation(components.delta);
    -components.net_profit()
        + p.lambda_tail * components.tail_risk_value
        + p.lambda_cash * components.total_premium.powi(2)
        + p.lambda_vega * components.vega.powi(2)
        + p.lambda_delta * delta_offset.powi(2)
        + p.lambda_gamma * components.gamma.powi(2)
}

/// Dispatches to the named energy formula.
#[must_use]
pub fn energy(
    variant: ObjectiveVariant,
    request: &OptimizationRequest,
    components: &Components,
) -> f64 {
    match variant {
        ObjectiveVariant::ThresholdBreach => objective_value(request, components),
        ObjectiveVariant::RawExposure => raw_exposure_energy(request, components),
    }
}

fn overage_sq(value: f64, limit: f64) -> f64 {
    let over = value - limit;
    if over > 0.0 {
        over * over
    } else {
        0.0
    }
}
