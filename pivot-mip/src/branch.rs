//! Depth-first branch-and-bound over LP relaxations.
//!
//! The search recurses over clones of the solve context (the bound vectors
//! and basis snapshot) while the sparse matrix stays shared in the model.
//! Each node refactorizes and solves its relaxation (warm-started from the
//! parent's basis), prunes against the incumbent, and splits on a
//! fractional integer variable by tightening its upper bound to the floor
//! or its lower bound to the ceiling. A bound that would cross its opposite
//! bound prunes that single child; sibling nodes never see each other's
//! state.

use pivot_core::{
    solve_with, ConstraintModel, LpSolution, Progress, SolveContext, SolveControl, SolveStatus,
    VariableState,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::settings::{BranchOrder, MipSettings};
use crate::solution::{IncumbentTracker, MipSolution};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Floor,
    Ceiling,
}

/// Depth-first branch-and-bound driver.
pub struct BranchAndBound<'a> {
    model: &'a ConstraintModel,
    settings: MipSettings,
    control: SolveControl,
    rng: ChaCha8Rng,
    /// +1 for minimize, -1 for maximize: objectives are compared in
    /// minimize space.
    sign: f64,
    incumbent: IncumbentTracker,
    nodes: u64,
    depth_reached: usize,
    failures: u64,
    total_pivots: u64,
    stop: bool,
    canceled: bool,
}

impl<'a> BranchAndBound<'a> {
    /// New driver over `model`.
    pub fn new(model: &'a ConstraintModel, settings: MipSettings) -> Self {
        let sign = match model.sense() {
            pivot_core::ObjSense::Minimize => 1.0,
            pivot_core::ObjSense::Maximize => -1.0,
        };
        let rng = ChaCha8Rng::seed_from_u64(settings.seed);
        Self {
            model,
            settings,
            control: SolveControl::new(),
            rng,
            sign,
            incumbent: IncumbentTracker::new(),
            nodes: 0,
            depth_reached: 0,
            failures: 0,
            total_pivots: 0,
            stop: false,
            canceled: false,
        }
    }

    /// Attach a cooperative control handle.
    pub fn with_control(mut self, control: SolveControl) -> Self {
        self.control = control;
        self
    }

    /// Run the search.
    pub fn solve(mut self, progress: &mut dyn Progress) -> MipSolution {
        let root_ctx = SolveContext::new(self.model, &self.settings.lp);
        let root_status = self.node(root_ctx, 0, progress);

        let status = if self.canceled {
            SolveStatus::Canceled
        } else if self.incumbent.has() {
            SolveStatus::Optimal
        } else if root_status == SolveStatus::Unbounded {
            SolveStatus::Unbounded
        } else if self.failures > 0 {
            SolveStatus::MilpFail
        } else {
            SolveStatus::Infeasible
        };
        progress.finished(status);

        let objective = self.incumbent.objective();
        let (improved, best) = (self.incumbent.updates(), self.incumbent.into_best());
        MipSolution {
            status,
            best,
            objective,
            nodes: self.nodes,
            depth_reached: self.depth_reached,
            improved,
            failures: self.failures,
        }
    }

    /// Solve one node and recurse into its children. Returns `Optimal` when
    /// the subtree contributed or confirmed an integer-feasible point,
    /// `Infeasible` when it was pruned dry, or the terminal status that cut
    /// it short.
    fn node(
        &mut self,
        mut ctx: SolveContext,
        depth: usize,
        progress: &mut dyn Progress,
    ) -> SolveStatus {
        if !self.control.checkpoint() {
            self.canceled = true;
            return SolveStatus::Canceled;
        }
        if self.stop {
            return SolveStatus::Infeasible;
        }
        if let Some(cap) = self.settings.max_nodes {
            if self.nodes >= cap {
                log::info!("node cap {} reached", cap);
                self.stop = true;
                return SolveStatus::Infeasible;
            }
        }
        self.nodes += 1;
        self.depth_reached = self.depth_reached.max(depth);

        let sol = self.relax(&mut ctx, progress);
        match sol.status {
            SolveStatus::Optimal => {}
            SolveStatus::Canceled => {
                self.canceled = true;
                return SolveStatus::Canceled;
            }
            SolveStatus::Failure => {
                self.failures += 1;
                log::warn!("node {} relaxation failed, pruning", self.nodes);
                return SolveStatus::Failure;
            }
            other => return other,
        }
        self.log_node(depth, &sol);

        let key = self.sign * sol.objective();
        if let Some(bound) = self.settings.objective_bound {
            if key >= self.sign * bound - 1e-9 {
                return SolveStatus::Infeasible;
            }
        }
        if self.incumbent.has() && key >= self.incumbent.key() - 1e-9 {
            return SolveStatus::Infeasible;
        }

        let Some((index, value)) = self.fractional_var(&sol) else {
            // Integer feasible: record iff strictly better.
            if self
                .incumbent
                .update(key, sol.objective(), sol.values.clone())
            {
                progress.message(&format!(
                    "incumbent {} at node {}",
                    sol.objective(),
                    self.nodes
                ));
                if let Some(target) = self.settings.break_at {
                    if key <= self.sign * target + 1e-9 {
                        log::info!("early-stop target {} reached", target);
                        self.stop = true;
                    }
                }
            }
            return SolveStatus::Optimal;
        };

        if let Some(cap) = self.settings.max_depth {
            if depth >= cap {
                log::info!("depth cap {} reached", cap);
                return SolveStatus::Infeasible;
            }
        }

        let order = match self.settings.branch_order {
            BranchOrder::FloorFirst => [Branch::Floor, Branch::Ceiling],
            BranchOrder::CeilingFirst => [Branch::Ceiling, Branch::Floor],
        };
        let mut any_feasible = false;
        for dir in order {
            if self.stop || self.canceled {
                break;
            }
            let mut child = ctx.clone();
            if !tighten(&mut child.vstate[index], dir, value) {
                // The new bound crosses the opposite one: this child alone
                // is infeasible by construction.
                continue;
            }
            match self.node(child, depth + 1, progress) {
                SolveStatus::Canceled => return SolveStatus::Canceled,
                SolveStatus::Optimal => any_feasible = true,
                _ => {}
            }
        }
        if any_feasible {
            SolveStatus::Optimal
        } else {
            SolveStatus::Infeasible
        }
    }

    /// Solve the relaxation for one node, optionally with the
    /// anti-degeneracy perturbation followed by a confirming re-solve from
    /// the exact bounds.
    fn relax(&mut self, ctx: &mut SolveContext, progress: &mut dyn Progress) -> LpSolution {
        let before = ctx.iters;
        let sol = if self.settings.anti_degeneracy {
            let saved: Vec<VariableState> = ctx.vstate.clone();
            self.perturb(ctx);
            let _ = solve_with(self.model, &self.settings.lp, ctx, &self.control, &mut ());
            for (vs, orig) in ctx.vstate.iter_mut().zip(saved.iter()) {
                vs.lower = orig.lower;
                vs.upper = orig.upper;
            }
            solve_with(self.model, &self.settings.lp, ctx, &self.control, &mut ())
        } else {
            solve_with(self.model, &self.settings.lp, ctx, &self.control, &mut ())
        };
        self.total_pivots += ctx.iters - before;
        progress.iteration(self.total_pivots);
        sol
    }

    /// Widen every non-fixed continuous bound by a small random amount.
    fn perturb(&mut self, ctx: &mut SolveContext) {
        let rows = self.model.rows();
        let eps = self.settings.perturb_eps;
        for i in 1..ctx.vstate.len() {
            if i > rows && self.model.is_integer(i - rows).unwrap_or(false) {
                continue;
            }
            let vs = &mut ctx.vstate[i];
            if vs.lower == vs.upper {
                continue;
            }
            vs.lower -= self.rng.gen::<f64>() * eps;
            if vs.upper.is_finite() {
                vs.upper += self.rng.gen::<f64>() * eps;
            }
        }
    }

    /// First (or, in randomized mode, a uniformly random) integer-flagged
    /// column whose value is fractional beyond the tolerance.
    fn fractional_var(&mut self, sol: &LpSolution) -> Option<(usize, f64)> {
        let rows = self.model.rows();
        let tol = self.settings.int_tol;
        let mut candidates = Vec::new();
        for c in 1..=self.model.columns() {
            if !self.model.is_integer(c).unwrap_or(false) {
                continue;
            }
            let v = sol.values[rows + c];
            if (v - v.round()).abs() > tol {
                if !self.settings.randomize_branching {
                    return Some((rows + c, v));
                }
                candidates.push((rows + c, v));
            }
        }
        if candidates.is_empty() {
            None
        } else {
            let pick = self.rng.gen_range(0..candidates.len());
            Some(candidates[pick])
        }
    }

    fn log_node(&self, depth: usize, sol: &LpSolution) {
        if !self.settings.verbose || self.nodes % self.settings.log_freq != 0 {
            return;
        }
        log::info!(
            "node {} depth {} relaxation {:.6e} incumbent {:.6e}",
            self.nodes,
            depth,
            sol.objective(),
            self.incumbent.objective(),
        );
    }
}

/// Apply one branching bound change; false when it crosses the opposite
/// bound.
fn tighten(vs: &mut VariableState, dir: Branch, value: f64) -> bool {
    match dir {
        Branch::Floor => {
            let f = value.floor();
            if f < vs.lower {
                return false;
            }
            vs.upper = vs.upper.min(f);
        }
        Branch::Ceiling => {
            let c = value.ceil();
            if c > vs.upper {
                return false;
            }
            vs.lower = vs.lower.max(c);
        }
    }
    true
}

/// Solve `model` by branch-and-bound with default control and no progress
/// sink.
pub fn solve_milp(model: &ConstraintModel, settings: &MipSettings) -> MipSolution {
    BranchAndBound::new(model, settings.clone()).solve(&mut ())
}
