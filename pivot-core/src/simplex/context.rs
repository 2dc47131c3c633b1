//! Per-solve working state.

use crate::eta::EtaFile;
use crate::model::ConstraintModel;
use crate::settings::SolverSettings;

/// Working bounds and status of one unified index during a solve.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VariableState {
    /// Working lower bound (scaled units while scaling is active).
    pub lower: f64,
    /// Working upper bound.
    pub upper: f64,
    /// For a nonbasic index: sitting at the lower bound (else the upper).
    pub at_lower: bool,
    /// Whether the index is in the basis.
    pub basic: bool,
}

impl VariableState {
    /// Width of the feasible interval; the shifted upper bound.
    pub fn span(&self) -> f64 {
        self.upper - self.lower
    }
}

/// Transient solve state: working bounds, basis, right-hand side and the
/// eta file.
///
/// A context is owned by one top-level solve. Branch-and-bound clones it at
/// every recursion boundary, so sibling nodes never alias working arrays;
/// carrying a parent's context into a child doubles as a warm start for the
/// child's basis.
#[derive(Debug, Clone)]
pub struct SolveContext {
    /// Per-index working state, `1..=sum` (`[0]` unused).
    pub vstate: Vec<VariableState>,
    /// Basic index per row, `1..=rows` (`[0]` unused).
    pub bas: Vec<usize>,
    /// Working right-hand side over rows `0..=rows`; row 0 tracks the
    /// (shifted) objective.
    pub rhs: Vec<f64>,
    /// Product-form inverse of the current basis.
    pub eta: EtaFile,
    /// Whether the eta file matches the current basis and bounds.
    pub eta_valid: bool,
    /// Objective shift of the dual regime; zero in the primal regime.
    pub extra_dual: f64,
    /// Basis-changing pivots since the last refactorization.
    pub pivots_since_invert: u64,
    /// Total pivots performed by this context.
    pub iters: u64,
    /// Refactorizations performed by this context.
    pub inverts: u64,
    /// Model revision this context was built against.
    pub(crate) revision: u64,
}

impl SolveContext {
    /// Fresh context for `model`: the all-slack basis with every index at
    /// its lower bound.
    pub fn new(model: &ConstraintModel, settings: &SolverSettings) -> Self {
        let rows = model.rows();
        let sum = model.sum();
        let mut vstate = Vec::with_capacity(sum + 1);
        vstate.push(VariableState {
            lower: 0.0,
            upper: 0.0,
            at_lower: true,
            basic: false,
        });
        for i in 1..=sum {
            let b = model.bound_raw(i);
            vstate.push(VariableState {
                lower: b.lower,
                upper: b.upper,
                at_lower: true,
                basic: i <= rows,
            });
        }
        Self {
            vstate,
            bas: (0..=rows).collect(),
            rhs: vec![0.0; rows + 1],
            eta: EtaFile::new(settings.eps_element),
            eta_valid: false,
            extra_dual: 0.0,
            pivots_since_invert: 0,
            iters: 0,
            inverts: 0,
            revision: model.revision(),
        }
    }

    /// Width of index `i`'s feasible interval.
    pub fn span(&self, i: usize) -> f64 {
        self.vstate[i].span()
    }

    /// Whether every basic value lies within its bounds, up to `eps`.
    pub fn primal_feasible(&self, eps: f64) -> bool {
        for r in 1..self.bas.len() {
            let v = self.rhs[r];
            if v < -eps || v > self.span(self.bas[r]) + eps {
                return false;
            }
        }
        true
    }

    /// Map each basic index to its row; 0 for nonbasic indices.
    pub(crate) fn basis_positions(&self) -> Vec<usize> {
        let mut pos = vec![0; self.vstate.len()];
        for r in 1..self.bas.len() {
            pos[self.bas[r]] = r;
        }
        pos
    }
}
