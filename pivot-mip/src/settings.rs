//! Configuration for branch-and-bound.

use pivot_core::SolverSettings;

/// Which child subproblem is explored first after branching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BranchOrder {
    /// Tighten the upper bound to `floor(value)` first.
    #[default]
    FloorFirst,

    /// Tighten the lower bound to `ceil(value)` first.
    CeilingFirst,
}

/// Branch-and-bound settings.
#[derive(Debug, Clone)]
pub struct MipSettings {
    /// Integrality tolerance: a value within this distance of an integer
    /// counts as integral.
    pub int_tol: f64,

    /// Child exploration order.
    pub branch_order: BranchOrder,

    /// Pick a uniformly random fractional variable instead of the first.
    pub randomize_branching: bool,

    /// Perturb continuous bounds by a small random epsilon before each node
    /// solve, then confirm from the exact bounds.
    pub anti_degeneracy: bool,

    /// Magnitude of the anti-degeneracy perturbation.
    pub perturb_eps: f64,

    /// Seed for the branching/perturbation generator; fixed by default so
    /// repeated runs are reproducible.
    pub seed: u64,

    /// Maximum recursion depth (None = unlimited).
    pub max_depth: Option<usize>,

    /// Maximum nodes to explore (None = unlimited).
    pub max_nodes: Option<u64>,

    /// Only explore nodes whose relaxation beats this objective value.
    pub objective_bound: Option<f64>,

    /// Stop as soon as an incumbent at least this good is found.
    pub break_at: Option<f64>,

    /// Emit progress lines through the `log` facade.
    pub verbose: bool,

    /// Log every N nodes when verbose.
    pub log_freq: u64,

    /// Settings for the node LP solves.
    pub lp: SolverSettings,
}

impl Default for MipSettings {
    fn default() -> Self {
        Self {
            int_tol: 1e-7,
            branch_order: BranchOrder::default(),
            randomize_branching: false,
            anti_degeneracy: false,
            perturb_eps: 1e-5,
            seed: 42,
            max_depth: None,
            max_nodes: None,
            objective_bound: None,
            break_at: None,
            verbose: false,
            log_freq: 100,
            lp: SolverSettings::default(),
        }
    }
}

impl MipSettings {
    /// Settings with verbose output enabled.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            log_freq: 1,
            ..Default::default()
        }
    }

    /// Set the node cap.
    pub fn with_max_nodes(mut self, nodes: u64) -> Self {
        self.max_nodes = Some(nodes);
        self
    }

    /// Set the depth cap.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = Some(depth);
        self
    }

    /// Set the early-stop target.
    pub fn with_break_at(mut self, value: f64) -> Self {
        self.break_at = Some(value);
        self
    }

    /// Set the child exploration order.
    pub fn with_branch_order(mut self, order: BranchOrder) -> Self {
        self.branch_order = order;
        self
    }
}
