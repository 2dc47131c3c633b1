//! Bounded-variable revised simplex over the eta-file factorization.
//!
//! The driver runs one of two regimes over a [`SolveContext`]:
//!
//! - **primal**, when every basic value starts inside its bounds: Dantzig
//!   pricing, minimum-ratio test, bound flips for entering variables that
//!   reach their own opposite bound first;
//! - **dual**, when the start is infeasible: pick the most violated basic
//!   row, restore it by a sign-restricted ratio test on reduced costs, and
//!   hand over to the primal regime once feasible. Dual feasibility of the
//!   start is arranged by shifting the objective by the most negative cost
//!   (the "extra dual" shift), which is cleared again at handover.
//!
//! A zero pivot triggers one reinversion retry; a second consecutive
//! breakdown terminates with [`SolveStatus::Failure`]. The eta file is also
//! rebuilt every `refactor_interval` pivots. Cancellation and pause are
//! observed between pivots.

mod context;
mod invert;
mod price;

pub use context::{SolveContext, VariableState};

pub(crate) use invert::invert;

use crate::control::{Progress, SolveControl};
use crate::model::{ConstraintModel, ObjSense};
use crate::settings::SolverSettings;
use crate::status::{FailureKind, SolveStatus};

use price::{
    direction, load_column, price_dual, price_primal, ratio_test_primal, select_infeasible_row,
    PrimalRatio,
};

/// Result of one LP solve.
#[derive(Debug, Clone)]
pub struct LpSolution {
    /// Terminal status.
    pub status: SolveStatus,
    /// Failure reason when `status` is [`SolveStatus::Failure`].
    pub failure: Option<FailureKind>,
    /// Solution values over the unified index space, `values[0]` being the
    /// objective in the caller's sense. Empty unless optimal.
    pub values: Vec<f64>,
    /// Dual value per row (`duals[0]` unused). Empty unless optimal.
    pub duals: Vec<f64>,
    /// Pivots performed (bound flips included).
    pub iters: u64,
    /// Refactorizations performed.
    pub inverts: u64,
}

impl LpSolution {
    /// Objective value in the caller's sense; NaN when no solution exists.
    pub fn objective(&self) -> f64 {
        self.values.first().copied().unwrap_or(f64::NAN)
    }

    /// One value per decision variable (columns `1..=columns`).
    pub fn variable_values(&self, model: &ConstraintModel) -> &[f64] {
        if self.values.is_empty() {
            &[]
        } else {
            &self.values[model.rows() + 1..]
        }
    }

    /// One dual value per constraint row.
    pub fn dual_values(&self) -> &[f64] {
        if self.duals.is_empty() {
            &[]
        } else {
            &self.duals[1..]
        }
    }
}

/// Solve `model` from a fresh all-slack context.
pub fn solve(model: &ConstraintModel, settings: &SolverSettings) -> LpSolution {
    let mut ctx = SolveContext::new(model, settings);
    solve_with(model, settings, &mut ctx, &SolveControl::new(), &mut ())
}

/// Solve `model` over an existing context (warm start), observing `control`
/// between pivots and reporting to `progress`.
///
/// The context must have been built against the current model revision and
/// shape; branch-and-bound relies on this to run bound-tightened clones of a
/// parent context against the shared matrix.
pub fn solve_with(
    model: &ConstraintModel,
    settings: &SolverSettings,
    ctx: &mut SolveContext,
    control: &SolveControl,
    progress: &mut dyn Progress,
) -> LpSolution {
    assert_eq!(
        ctx.bas.len(),
        model.rows() + 1,
        "context shape does not match the model"
    );
    assert_eq!(
        ctx.vstate.len(),
        model.sum() + 1,
        "context shape does not match the model"
    );
    assert_eq!(
        ctx.revision,
        model.revision(),
        "model mutated since the context was built"
    );

    let (status, failure) = run(model, settings, ctx, control, progress);
    let mut sol = LpSolution {
        status,
        failure,
        values: Vec::new(),
        duals: Vec::new(),
        iters: ctx.iters,
        inverts: ctx.inverts,
    };
    if status == SolveStatus::Optimal {
        extract(model, ctx, &mut sol);
    }
    progress.finished(status);
    sol
}

fn run(
    model: &ConstraintModel,
    settings: &SolverSettings,
    ctx: &mut SolveContext,
    control: &SolveControl,
    progress: &mut dyn Progress,
) -> (SolveStatus, Option<FailureKind>) {
    let rows = model.rows();
    let sum = model.sum();

    ctx.extra_dual = 0.0;
    if invert(model, settings, ctx).is_err() {
        return (SolveStatus::Failure, Some(FailureKind::SingularBasis));
    }

    let mut primal = ctx.primal_feasible(settings.eps_rhs);
    if !primal {
        let shift = settings
            .extra_dual
            .unwrap_or_else(|| default_extra_dual(model));
        if shift != 0.0 {
            ctx.extra_dual = shift;
            if invert(model, settings, ctx).is_err() {
                return (SolveStatus::Failure, Some(FailureKind::SingularBasis));
            }
        }
        if settings.verbose {
            log::info!("starting dual regime, objective shift {}", ctx.extra_dual);
        }
    }

    let mut drow = vec![0.0; sum + 1];
    let mut prow = vec![0.0; sum + 1];
    let mut pcol = vec![0.0; rows + 1];
    let mut just_inverted = true;

    loop {
        if !control.checkpoint() {
            return (SolveStatus::Canceled, None);
        }
        if ctx.iters >= settings.max_iterations {
            log::warn!("iteration cap {} reached", settings.max_iterations);
            return (SolveStatus::Failure, Some(FailureKind::IterationLimit));
        }

        if primal {
            let colnr = price_primal(model, settings, ctx, &mut drow);
            if colnr == 0 {
                if settings.verbose {
                    log::info!("optimal after {} iterations", ctx.iters);
                }
                return (SolveStatus::Optimal, None);
            }

            load_column(model, ctx.extra_dual, colnr, direction(ctx, colnr), &mut pcol);
            ctx.eta.ftran(&mut pcol);

            match ratio_test_primal(settings, ctx, &pcol) {
                PrimalRatio::Open => {
                    if ctx.span(colnr).is_finite() {
                        bound_flip(ctx, settings, colnr, &pcol);
                        ctx.iters += 1;
                        progress.iteration(ctx.iters);
                    } else {
                        return (SolveStatus::Unbounded, None);
                    }
                }
                PrimalRatio::Blocked { row, theta } => {
                    if theta > ctx.span(colnr) + settings.eps_rhs {
                        bound_flip(ctx, settings, colnr, &pcol);
                        ctx.iters += 1;
                        progress.iteration(ctx.iters);
                    } else if pcol[row].abs() < settings.eps_pivot {
                        match recover(model, settings, ctx, just_inverted) {
                            Ok(()) => just_inverted = true,
                            Err(kind) => return (SolveStatus::Failure, Some(kind)),
                        }
                    } else {
                        let to_lower = pcol[row] > 0.0;
                        pivot(ctx, settings, colnr, row, theta, &pcol, to_lower);
                        ctx.iters += 1;
                        progress.iteration(ctx.iters);
                        just_inverted = false;
                        if ctx.pivots_since_invert >= settings.refactor_interval {
                            if invert(model, settings, ctx).is_err() {
                                return (SolveStatus::Failure, Some(FailureKind::SingularBasis));
                            }
                            just_inverted = true;
                        }
                    }
                }
            }
        } else {
            let row_nr = select_infeasible_row(settings, ctx);
            if row_nr == 0 {
                // Feasible: hand over to the primal regime with the
                // objective shift cleared.
                primal = true;
                if ctx.extra_dual != 0.0 {
                    ctx.extra_dual = 0.0;
                    if invert(model, settings, ctx).is_err() {
                        return (SolveStatus::Failure, Some(FailureKind::SingularBasis));
                    }
                    just_inverted = true;
                }
                continue;
            }

            let colnr = price_dual(model, settings, ctx, row_nr, &mut prow, &mut drow);
            if colnr == 0 {
                return (SolveStatus::Infeasible, None);
            }

            load_column(model, ctx.extra_dual, colnr, direction(ctx, colnr), &mut pcol);
            ctx.eta.ftran(&mut pcol);

            let p = pcol[row_nr];
            if p.abs() < settings.eps_pivot {
                match recover(model, settings, ctx, just_inverted) {
                    Ok(()) => just_inverted = true,
                    Err(kind) => return (SolveStatus::Failure, Some(kind)),
                }
                continue;
            }

            let span_out = ctx.span(ctx.bas[row_nr]);
            let above = ctx.rhs[row_nr] > span_out;
            let mut theta = if above {
                (ctx.rhs[row_nr] - span_out) / p
            } else {
                ctx.rhs[row_nr] / p
            };
            if theta < 0.0 {
                theta = 0.0;
            }

            if theta > ctx.span(colnr) + settings.eps_rhs {
                bound_flip(ctx, settings, colnr, &pcol);
                ctx.iters += 1;
                progress.iteration(ctx.iters);
            } else {
                pivot(ctx, settings, colnr, row_nr, theta, &pcol, !above);
                ctx.iters += 1;
                progress.iteration(ctx.iters);
                just_inverted = false;
                if ctx.pivots_since_invert >= settings.refactor_interval {
                    if invert(model, settings, ctx).is_err() {
                        return (SolveStatus::Failure, Some(FailureKind::SingularBasis));
                    }
                    just_inverted = true;
                }
            }
        }
    }
}

/// Zero-pivot recovery: one reinversion retry, then escalate.
fn recover(
    model: &ConstraintModel,
    settings: &SolverSettings,
    ctx: &mut SolveContext,
    just_inverted: bool,
) -> Result<(), FailureKind> {
    if just_inverted {
        log::warn!("zero pivot directly after refactorization");
        return Err(FailureKind::ZeroPivot);
    }
    log::warn!("zero pivot, refactorizing and retrying");
    invert(model, settings, ctx).map_err(|_| FailureKind::SingularBasis)
}

/// Move a nonbasic index to its opposite bound: the working right-hand side
/// absorbs the span step, no basis change.
fn bound_flip(ctx: &mut SolveContext, settings: &SolverSettings, i: usize, pcol: &[f64]) {
    let u = ctx.span(i);
    debug_assert!(u.is_finite());
    for (r, &p) in pcol.iter().enumerate() {
        let v = ctx.rhs[r] - u * p;
        ctx.rhs[r] = if v.abs() < settings.eps_element { 0.0 } else { v };
    }
    ctx.vstate[i].at_lower = !ctx.vstate[i].at_lower;
}

/// Basis-changing pivot: commit the right-hand-side step, append the eta
/// vector and swap basis membership. Commits atomically with respect to the
/// context arrays; no early return leaves them half-updated.
fn pivot(
    ctx: &mut SolveContext,
    settings: &SolverSettings,
    entering: usize,
    row: usize,
    theta: f64,
    pcol: &[f64],
    leaving_to_lower: bool,
) {
    for (r, &p) in pcol.iter().enumerate() {
        let v = ctx.rhs[r] - theta * p;
        ctx.rhs[r] = if v.abs() < settings.eps_element { 0.0 } else { v };
    }
    let from_upper = !ctx.vstate[entering].at_lower;
    ctx.rhs[row] = if from_upper {
        ctx.span(entering) - theta
    } else {
        theta
    };

    ctx.eta.append(pcol, row);
    if from_upper {
        ctx.eta.negate_last_pivot();
    }

    let leaving = ctx.bas[row];
    ctx.bas[row] = entering;
    ctx.vstate[leaving].basic = false;
    ctx.vstate[leaving].at_lower = leaving_to_lower;
    ctx.vstate[entering].basic = true;
    ctx.vstate[entering].at_lower = true;
    ctx.pivots_since_invert += 1;
}

/// Most negative objective coefficient; the dual regime's default shift.
fn default_extra_dual(model: &ConstraintModel) -> f64 {
    let mut worst = 0.0_f64;
    for c in 1..=model.columns() {
        let mut f = 0.0;
        for e in model.col_slice(c) {
            if e.row == 0 {
                f += e.value;
            }
        }
        if f < worst {
            worst = f;
        }
    }
    worst
}

/// Read the optimal point and duals out of the context, undoing the lower
/// bound shift, active scaling, row flips and the objective sense.
fn extract(model: &ConstraintModel, ctx: &SolveContext, sol: &mut LpSolution) {
    let rows = model.rows();
    let sum = model.sum();
    let pos = ctx.basis_positions();

    let mut values = vec![0.0; sum + 1];
    for i in 1..=sum {
        let vs = ctx.vstate[i];
        let shifted = if vs.basic {
            ctx.rhs[pos[i]]
        } else if vs.at_lower {
            0.0
        } else {
            vs.span()
        };
        let scaled = vs.lower + shifted;
        values[i] = if i <= rows {
            scaled / model.scale_factor(i)
        } else {
            scaled * model.scale_factor(i)
        };
    }

    let mut obj = 0.0;
    for c in 1..=model.columns() {
        for e in model.col_slice(c) {
            if e.row == 0 {
                obj += e.value / model.scale_factor(rows + c) * values[rows + c];
            }
        }
    }
    values[0] = if model.sense() == ObjSense::Maximize {
        -obj
    } else {
        obj
    };

    let mut y = vec![0.0; rows + 1];
    y[0] = 1.0;
    ctx.eta.btran(&mut y);
    let mut duals = vec![0.0; rows + 1];
    for r in 1..=rows {
        let mut d = y[r] * model.scale_factor(r);
        if model.row_flipped(r) {
            d = -d;
        }
        if model.sense() == ObjSense::Minimize {
            d = -d;
        }
        duals[r] = d;
    }

    sol.values = values;
    sol.duals = duals;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RowOp;

    fn maxi(coeffs: &[f64]) -> ConstraintModel {
        let mut m = ConstraintModel::new(0, coeffs.len());
        m.set_objective_sense(ObjSense::Maximize);
        m.set_objective(coeffs).unwrap();
        m
    }

    #[test]
    fn test_two_variable_lp() {
        let mut m = maxi(&[3.0, 2.0]);
        m.add_constraint(&[1.0, 1.0], RowOp::Le, 4.0).unwrap();
        m.add_constraint(&[1.0, 3.0], RowOp::Le, 6.0).unwrap();

        let sol = solve(&m, &SolverSettings::default());
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!((sol.objective() - 12.0).abs() < 1e-6);
        let x = sol.variable_values(&m);
        assert!((x[0] - 4.0).abs() < 1e-6);
        assert!(x[1].abs() < 1e-6);
    }

    #[test]
    fn test_duals_of_binding_row() {
        let mut m = maxi(&[3.0, 2.0]);
        m.add_constraint(&[1.0, 1.0], RowOp::Le, 4.0).unwrap();
        m.add_constraint(&[1.0, 3.0], RowOp::Le, 6.0).unwrap();

        let sol = solve(&m, &SolverSettings::default());
        // Only the first row binds at (4, 0); its shadow price is 3.
        let duals = sol.dual_values();
        assert!((duals[0] - 3.0).abs() < 1e-6);
        assert!(duals[1].abs() < 1e-6);
    }

    #[test]
    fn test_infeasible() {
        let mut m = ConstraintModel::new(0, 1);
        m.set_element(0, 1, 1.0).unwrap();
        m.add_constraint(&[1.0], RowOp::Le, 1.0).unwrap();
        m.add_constraint(&[1.0], RowOp::Ge, 2.0).unwrap();

        let sol = solve(&m, &SolverSettings::default());
        assert_eq!(sol.status, SolveStatus::Infeasible);
        assert!(sol.values.is_empty());
    }

    #[test]
    fn test_unbounded() {
        let mut m = maxi(&[1.0]);
        // x >= 0 with no upper bound and no constraint rows.
        let sol = solve(&m, &SolverSettings::default());
        assert_eq!(sol.status, SolveStatus::Unbounded);
    }

    #[test]
    fn test_equality_starts_dual() {
        // min x + y subject to x + y = 2: infeasible all-slack start, the
        // dual regime must restore feasibility.
        let mut m = ConstraintModel::new(0, 2);
        m.set_objective(&[1.0, 1.0]).unwrap();
        m.add_constraint(&[1.0, 1.0], RowOp::Eq, 2.0).unwrap();

        let sol = solve(&m, &SolverSettings::default());
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!((sol.objective() - 2.0).abs() < 1e-6);
        let x = sol.variable_values(&m);
        assert!((x[0] + x[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_bound_flip_on_two_sided_box() {
        // max x + y with x in [0, 1], y in [0, 2] and a loose row: both
        // variables flip to their upper bounds without entering the basis.
        let mut m = maxi(&[1.0, 1.0]);
        m.add_constraint(&[1.0, 1.0], RowOp::Le, 10.0).unwrap();
        m.set_upper(2, 1.0).unwrap();
        m.set_upper(3, 2.0).unwrap();

        let sol = solve(&m, &SolverSettings::default());
        assert_eq!(sol.status, SolveStatus::Optimal);
        assert!((sol.objective() - 3.0).abs() < 1e-6);
        let x = sol.variable_values(&m);
        assert!((x[0] - 1.0).abs() < 1e-6);
        assert!((x[1] - 2.0).abs() < 1e-6);
    }

    #[test]
    fn test_range_row() {
        // 1 <= x <= 3 expressed as a range row: x <= 3 with slack upper 2.
        let mut m = ConstraintModel::new(0, 1);
        m.set_objective(&[1.0]).unwrap();
        m.add_constraint(&[1.0], RowOp::Le, 3.0).unwrap();
        m.set_upper(1, 2.0).unwrap();

        let sol = solve(&m, &SolverSettings::default());
        assert_eq!(sol.status, SolveStatus::Optimal);
        // Minimizing x drives the slack to its upper bound: x = 1.
        assert!((sol.objective() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_nonzero_lower_bounds() {
        let mut m = ConstraintModel::new(0, 2);
        m.set_objective(&[1.0, 2.0]).unwrap();
        m.add_constraint(&[1.0, 1.0], RowOp::Le, 10.0).unwrap();
        m.set_bounds(2, 1.5, 4.0).unwrap();
        m.set_bounds(3, 2.0, 4.0).unwrap();

        let sol = solve(&m, &SolverSettings::default());
        assert_eq!(sol.status, SolveStatus::Optimal);
        let x = sol.variable_values(&m);
        assert!((x[0] - 1.5).abs() < 1e-6);
        assert!((x[1] - 2.0).abs() < 1e-6);
        assert!((sol.objective() - 5.5).abs() < 1e-6);
    }

    #[test]
    fn test_cancel_before_solve() {
        let mut m = maxi(&[1.0]);
        m.add_constraint(&[1.0], RowOp::Le, 1.0).unwrap();
        let control = SolveControl::new();
        control.cancel();
        let settings = SolverSettings::default();
        let mut ctx = SolveContext::new(&m, &settings);
        let sol = solve_with(&m, &settings, &mut ctx, &control, &mut ());
        assert_eq!(sol.status, SolveStatus::Canceled);
        assert!(sol.values.is_empty());
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let mut m = maxi(&[3.0, 2.0]);
        m.add_constraint(&[1.0, 1.0], RowOp::Le, 4.0).unwrap();
        m.add_constraint(&[1.0, 3.0], RowOp::Le, 6.0).unwrap();

        let a = solve(&m, &SolverSettings::default());
        let b = solve(&m, &SolverSettings::default());
        assert_eq!(a.status, b.status);
        assert_eq!(a.objective(), b.objective());
        assert_eq!(a.iters, b.iters);
    }

    #[test]
    fn test_tight_refactor_interval() {
        // Force a refactorization every pivot; results must not change.
        let mut m = maxi(&[3.0, 2.0, 1.0]);
        m.add_constraint(&[1.0, 1.0, 1.0], RowOp::Le, 10.0).unwrap();
        m.add_constraint(&[2.0, 1.0, 0.0], RowOp::Le, 8.0).unwrap();
        m.add_constraint(&[0.0, 1.0, 2.0], RowOp::Le, 6.0).unwrap();

        let loose = solve(&m, &SolverSettings::default());
        let tight = solve(&m, &SolverSettings::default().with_refactor_interval(1));
        assert_eq!(loose.status, SolveStatus::Optimal);
        assert_eq!(tight.status, SolveStatus::Optimal);
        assert!((loose.objective() - tight.objective()).abs() < 1e-9);
    }
}
