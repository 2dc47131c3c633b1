//! Subgradient Lagrangian relaxation.
//!
//! A set of "hard" constraints is folded into the objective with one
//! multiplier each, initialized to zero. Every iteration re-solves the
//! remaining LP, reads the subgradient off the incumbent point, and moves
//! the multipliers by a decaying step scaled by the gap between the best
//! primal and dual bounds over the squared subgradient norm. Multipliers of
//! inequality constraints are clamped at zero; equality multipliers are
//! free. The loop stops when the bound gap closes or the iteration cap is
//! reached.

use pivot_core::{ConstraintModel, ModelError, ObjSense, RowOp, SolveStatus, SolverSettings};

use crate::error::{MipError, MipResult};

/// One relaxed constraint, normalized to `a·x <= rhs` or `a·x == rhs`.
#[derive(Debug, Clone)]
pub struct RelaxedConstraint {
    coeffs: Vec<(usize, f64)>,
    equality: bool,
    rhs: f64,
}

impl RelaxedConstraint {
    /// Build from sparse (column, coefficient) pairs; `Ge` rows are negated
    /// into `Le` form.
    pub fn new(coeffs: &[(usize, f64)], op: RowOp, rhs: f64) -> Self {
        let sign = if op == RowOp::Ge { -1.0 } else { 1.0 };
        Self {
            coeffs: coeffs.iter().map(|&(c, v)| (c, v * sign)).collect(),
            equality: op == RowOp::Eq,
            rhs: rhs * sign,
        }
    }

    /// Build from a dense coefficient row.
    pub fn dense(coeffs: &[f64], op: RowOp, rhs: f64) -> Self {
        let sparse: Vec<(usize, f64)> = coeffs
            .iter()
            .enumerate()
            .filter(|(_, v)| **v != 0.0)
            .map(|(j, &v)| (j + 1, v))
            .collect();
        Self::new(&sparse, op, rhs)
    }

    /// Left-hand-side value at `x` (one entry per column, 0-based).
    fn activity(&self, x: &[f64]) -> f64 {
        self.coeffs.iter().map(|&(c, v)| v * x[c - 1]).sum()
    }

    fn violation(&self, x: &[f64]) -> f64 {
        self.activity(x) - self.rhs
    }

    fn satisfied(&self, x: &[f64], tol: f64) -> bool {
        let g = self.violation(x);
        if self.equality {
            g.abs() <= tol
        } else {
            g <= tol
        }
    }
}

/// Settings for the subgradient loop.
#[derive(Debug, Clone)]
pub struct LagrangianSettings {
    /// Iteration cap.
    pub max_iterations: u64,

    /// Relative primal/dual gap at which the loop declares optimality.
    pub gap_tol: f64,

    /// Tolerance for counting a relaxed constraint as satisfied.
    pub feas_tol: f64,

    /// Initial step coefficient (the classical choice is 2).
    pub initial_step: f64,

    /// Decay factor applied to the step coefficient after a stall.
    pub step_decay: f64,

    /// Non-improving iterations tolerated before decaying the step.
    pub stall_limit: u32,

    /// Primal bound estimate used before any feasible point is found, in
    /// the caller's sense.
    pub primal_guess: Option<f64>,

    /// Settings for the inner LP solves.
    pub lp: SolverSettings,
}

impl Default for LagrangianSettings {
    fn default() -> Self {
        Self {
            max_iterations: 100,
            gap_tol: 1e-6,
            feas_tol: 1e-6,
            initial_step: 2.0,
            step_decay: 0.5,
            stall_limit: 3,
            primal_guess: None,
            lp: SolverSettings::default(),
        }
    }
}

/// Terminal status of the relaxation loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LagStatus {
    /// The primal/dual gap closed within tolerance.
    Optimal,

    /// A feasible incumbent was found but the gap stayed open.
    FeasFound,

    /// No iterate satisfied the relaxed constraints.
    NoFeasFound,

    /// The base LP (ignoring relaxed constraints) is infeasible.
    Infeasible,

    /// An inner solve broke down or ran unbounded.
    Failure,
}

/// Result of the relaxation loop.
#[derive(Debug, Clone)]
pub struct LagrangianResult {
    /// Terminal status.
    pub status: LagStatus,

    /// Final multipliers, one per relaxed constraint.
    pub multipliers: Vec<f64>,

    /// Best relaxation bound, in the caller's sense (a lower bound for
    /// minimization, an upper bound for maximization).
    pub dual_bound: f64,

    /// Objective of the best feasible incumbent, in the caller's sense.
    pub primal_bound: f64,

    /// Incumbent variable values (one per column), if any.
    pub best: Option<Vec<f64>>,

    /// Iterations performed.
    pub iterations: u64,
}

/// Run the subgradient loop for `relaxed` over `model`.
///
/// The model itself is not modified; the folded objectives live in a
/// working clone.
pub fn lag_solve(
    model: &ConstraintModel,
    relaxed: &[RelaxedConstraint],
    settings: &LagrangianSettings,
) -> MipResult<LagrangianResult> {
    let columns = model.columns();
    for rc in relaxed {
        for &(c, _) in &rc.coeffs {
            if c < 1 || c > columns {
                return Err(MipError::Model(ModelError::InvalidRange {
                    kind: "column",
                    index: c,
                    lo: 1,
                    hi: columns,
                }));
            }
        }
    }
    if relaxed.is_empty() {
        return Err(MipError::InvalidProblem(
            "no relaxed constraints given".to_string(),
        ));
    }

    let sign = match model.sense() {
        ObjSense::Minimize => 1.0,
        ObjSense::Maximize => -1.0,
    };
    let mut base_min = Vec::with_capacity(columns);
    for c in 1..=columns {
        base_min.push(sign * model.objective_coefficient(c)?);
    }

    let mut work = model.clone();
    let mut lambda = vec![0.0; relaxed.len()];
    let mut mu = settings.initial_step;
    let mut stall = 0u32;
    let mut dual_bound = f64::NEG_INFINITY;
    let mut primal_bound = f64::INFINITY;
    let mut best: Option<Vec<f64>> = None;
    let mut iterations = 0;
    let mut status = LagStatus::NoFeasFound;

    while iterations < settings.max_iterations {
        iterations += 1;

        // Fold the relaxed rows into the objective.
        let mut folded = base_min.clone();
        for (k, rc) in relaxed.iter().enumerate() {
            for &(c, v) in &rc.coeffs {
                folded[c - 1] += lambda[k] * v;
            }
        }
        let in_sense: Vec<f64> = folded.iter().map(|v| sign * v).collect();
        work.set_objective(&in_sense)?;

        let sol = pivot_core::solve(&work, &settings.lp);
        match sol.status {
            SolveStatus::Optimal => {}
            SolveStatus::Infeasible => {
                status = LagStatus::Infeasible;
                break;
            }
            _ => {
                status = LagStatus::Failure;
                break;
            }
        }
        let x = sol.variable_values(&work).to_vec();

        // L(lambda) = folded objective minus the multiplier payments.
        let folded_obj = sign * sol.objective();
        let payments: f64 = relaxed
            .iter()
            .zip(lambda.iter())
            .map(|(rc, l)| l * rc.rhs)
            .sum();
        let lag_value = folded_obj - payments;
        if lag_value > dual_bound + 1e-12 {
            dual_bound = lag_value;
            stall = 0;
        } else {
            stall += 1;
            if stall >= settings.stall_limit {
                mu *= settings.step_decay;
                stall = 0;
            }
        }

        if relaxed.iter().all(|rc| rc.satisfied(&x, settings.feas_tol)) {
            let true_obj: f64 = base_min.iter().zip(x.iter()).map(|(c, v)| c * v).sum();
            if true_obj < primal_bound {
                primal_bound = true_obj;
                best = Some(x.clone());
            }
        }

        if primal_bound.is_finite()
            && primal_bound - dual_bound <= settings.gap_tol * primal_bound.abs().max(1.0)
        {
            status = LagStatus::Optimal;
            break;
        }

        let grad: Vec<f64> = relaxed.iter().map(|rc| rc.violation(&x)).collect();
        let norm: f64 = grad.iter().map(|g| g * g).sum();
        if norm <= 1e-16 {
            // Zero subgradient: the current iterate solves the relaxation
            // exactly.
            if relaxed.iter().all(|rc| rc.satisfied(&x, settings.feas_tol)) {
                status = LagStatus::Optimal;
            }
            break;
        }

        let target = if primal_bound.is_finite() {
            primal_bound
        } else {
            settings
                .primal_guess
                .map(|v| sign * v)
                .unwrap_or(lag_value.abs() + 1.0)
        };
        let step = mu * (target - lag_value).max(settings.gap_tol) / norm;
        for (k, rc) in relaxed.iter().enumerate() {
            lambda[k] += step * grad[k];
            if !rc.equality && lambda[k] < 0.0 {
                lambda[k] = 0.0;
            }
        }
    }

    if status == LagStatus::NoFeasFound && best.is_some() {
        status = LagStatus::FeasFound;
    }
    Ok(LagrangianResult {
        status,
        multipliers: lambda,
        dual_bound: sign * dual_bound,
        primal_bound: sign * primal_bound,
        best,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relaxed_constraint_normalization() {
        let rc = RelaxedConstraint::dense(&[1.0, 1.0], RowOp::Ge, 2.0);
        // Stored as -x - y <= -2.
        assert!((rc.rhs - (-2.0)).abs() < 1e-12);
        assert!(rc.satisfied(&[3.0, 0.0], 1e-9));
        assert!(!rc.satisfied(&[1.0, 0.5], 1e-9));
    }

    #[test]
    fn test_trivially_satisfied_relaxation_closes_gap() {
        // min x on [2, 5]; the relaxed row x <= 10 never binds, so the very
        // first iterate is feasible and the gap closes immediately.
        let mut m = ConstraintModel::new(0, 1);
        m.set_objective(&[1.0]).unwrap();
        m.set_bounds(1, 2.0, 5.0).unwrap();

        let relaxed = vec![RelaxedConstraint::dense(&[1.0], RowOp::Le, 10.0)];
        let res = lag_solve(&m, &relaxed, &LagrangianSettings::default()).unwrap();

        assert_eq!(res.status, LagStatus::Optimal);
        assert!((res.primal_bound - 2.0).abs() < 1e-6);
        assert!((res.dual_bound - 2.0).abs() < 1e-6);
        assert_eq!(res.iterations, 1);
    }

    #[test]
    fn test_bound_sandwich() {
        // min x + y with x, y in [0, 4], relaxing x + y >= 2. The true
        // optimum is 2; the dual bound must stay below it and the incumbent
        // above it.
        let mut m = ConstraintModel::new(0, 2);
        m.set_objective(&[1.0, 1.0]).unwrap();
        m.set_upper(1, 4.0).unwrap();
        m.set_upper(2, 4.0).unwrap();

        let relaxed = vec![RelaxedConstraint::dense(&[1.0, 1.0], RowOp::Ge, 2.0)];
        let res = lag_solve(&m, &relaxed, &LagrangianSettings::default()).unwrap();

        assert!(matches!(res.status, LagStatus::FeasFound | LagStatus::Optimal));
        assert!(res.dual_bound <= 2.0 + 1e-6, "dual bound {}", res.dual_bound);
        assert!(
            res.primal_bound >= 2.0 - 1e-6,
            "primal bound {}",
            res.primal_bound
        );
        let best = res.best.unwrap();
        assert!(best[0] + best[1] >= 2.0 - 1e-6);
        assert!(res.multipliers[0] >= 0.0);
    }

    #[test]
    fn test_infeasible_base() {
        // The base rows alone are contradictory.
        let mut m = ConstraintModel::new(0, 1);
        m.set_objective(&[1.0]).unwrap();
        m.add_constraint(&[1.0], RowOp::Le, 1.0).unwrap();
        m.add_constraint(&[1.0], RowOp::Ge, 2.0).unwrap();

        let relaxed = vec![RelaxedConstraint::dense(&[1.0], RowOp::Le, 10.0)];
        let res = lag_solve(&m, &relaxed, &LagrangianSettings::default()).unwrap();
        assert_eq!(res.status, LagStatus::Infeasible);
    }

    #[test]
    fn test_no_relaxed_rows_rejected() {
        let m = ConstraintModel::new(0, 1);
        assert!(lag_solve(&m, &[], &LagrangianSettings::default()).is_err());
    }

    #[test]
    fn test_column_range_checked() {
        let m = ConstraintModel::new(0, 1);
        let relaxed = vec![RelaxedConstraint::new(&[(5, 1.0)], RowOp::Le, 1.0)];
        assert!(lag_solve(&m, &relaxed, &LagrangianSettings::default()).is_err());
    }
}
