//! Clamp, repair and score. The single scoring authority for every solver.
//!
//! Both solving strategies hand their raw output to [`postprocess_and_score`]
//! so that classical and external results are judged by identical logic.

use tracing::debug;

use risk_alloc_core::{Allocation, Components, OptimizationRequest, SolveMetrics};

use crate::objective::{check_hard_constraints, compute_components, objective_value, Feasibility};

/// Raw values below this are treated as zero before rounding.
pub const SNAP_TO_ZERO: f64 = 0.1;

/// A repaired allocation with its final score.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredAllocation {
    pub allocation: Allocation,
    pub components: Components,
    pub feasibility: Feasibility,
    /// Threshold-breach energy.
    pub energy: f64,
    /// Units removed by greedy repair.
    pub repair_steps: usize,
}

impl ScoredAllocation {
    #[must_use]
    pub fn metrics(&self) -> SolveMetrics {
        SolveMetrics {
            components: self.components,
            energy: self.energy,
            feasible: self.feasibility.ok,
            violations: self.feasibility.violations.clone(),
        }
    }

    /// Ordering key: feasible beats infeasible, then lower energy.
    pub(crate) fn is_better_than(&self, other: &Self) -> bool {
        match (self.feasibility.ok, other.feasibility.ok) {
            (true, false) => true,
            (false, true) => false,
            _ => self.energy < other.energy,
        }
    }
}

/// Decodes a solver vector into quantities.
///
/// `variables[i]` names the candidate behind `values[i]`. Values under
/// [`SNAP_TO_ZERO`] become zero, the rest are rounded and clamped to
/// `qty_max`. Unknown ids and non-finite values are dropped.
#[must_use]
pub fn vector_to_qty_map(
    request: &OptimizationRequest,
    variables: &[String],
    values: &[f64],
) -> Allocation {
    let mut allocation = Allocation::new();
    for (id, &value) in variables.iter().zip(values) {
        let Some(candidate) = request.candidate(id) else {
            continue;
        };
        if !value.is_finite() || value < SNAP_TO_ZERO {
            continue;
        }
        let rounded = value.round().min(f64::from(candidate.qty_max));
        allocation.set(id.clone(), rounded as u32);
    }
    allocation
}

/// Drops unknown ids and clamps quantities to `qty_max`.
#[must_use]
pub fn clamp_allocation(request: &OptimizationRequest, allocation: &Allocation) -> Allocation {
    allocation
        .iter()
        .filter_map(|(id, qty)| {
            request
                .candidate(id)
                .map(|c| (id.to_string(), qty.min(c.qty_max)))
        })
        .collect()
}

/// Profit per unit of premium. Credit legs (premium ≤ 0) rank as most
/// efficient so they are removed last.
#[must_use]
pub fn repair_efficiency(ev_per_unit: f64, premium_per_unit: f64) -> f64 {
    if premium_per_unit <= 0.0 {
        f64::INFINITY
    } else {
        ev_per_unit / premium_per_unit
    }
}

/// Removes one unit at a time from the least efficient active candidate
/// until the allocation is feasible or empty.
///
/// Ties go to the candidate listed first in the request. Returns the
/// repaired allocation and the number of units removed.
#[must_use]
pub fn greedy_repair(
    request: &OptimizationRequest,
    allocation: &Allocation,
) -> (Allocation, usize) {
    let mut current = clamp_allocation(request, allocation);
    let mut steps = 0;

    loop {
        let components = compute_components(request, &current);
        if check_hard_constraints(request.constraints(), &components).ok {
            break;
        }

        let victim = request
            .candidates()
            .iter()
            .filter(|c| current.get(&c.id) > 0)
            .map(|c| (c, repair_efficiency(c.ev_per_unit, c.premium_per_unit)))
            .fold(None, |worst: Option<(&_, f64)>, (c, eff)| match worst {
                Some((_, w)) if w <= eff => worst,
                _ => Some((c, eff)),
            });

        match victim {
            Some((candidate, _)) => {
                current.decrement(&candidate.id);
                steps += 1;
            }
            None => break,
        }
    }

    if steps > 0 {
        debug!(steps, remaining = current.total_quantity(), "Greedy repair removed units");
    }
    (current, steps)
}

/// Clamp → score → check → repair if needed → rescore.
///
/// Every solver calls this before returning.
#[must_use]
pub fn postprocess_and_score(request: &OptimizationRequest, raw: &Allocation) -> ScoredAllocation {
    let clamped = clamp_allocation(request, raw);
    let components = compute_components(request, &clamped);
    let feasibility = check_hard_constraints(request.constraints(), &components);

    let (allocation, repair_steps) = if feasibility.ok {
        (clamped, 0)
    } else {
        greedy_repair(request, &clamped)
    };

    let components = compute_components(request, &allocation);
    let feasibility = check_hard_constraints(request.constraints(), &components);
    let energy = objective_value(request, &components);

    ScoredAllocation {
        allocation,
        components,
        feasibility,
        energy,
        repair_steps,
    }
}
