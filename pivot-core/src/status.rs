//! Terminal solve statuses.

use std::fmt;

/// Terminal status of a solve.
///
/// Algorithmic outcomes (infeasible, unbounded) are statuses, not errors:
/// every solve returns exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolveStatus {
    /// Optimal solution found.
    Optimal,

    /// No feasible point exists.
    Infeasible,

    /// The objective improves without bound over the feasible region.
    Unbounded,

    /// Numerical breakdown that survived the single reinversion retry.
    Failure,

    /// Branch-and-bound hit subproblem failures and found no incumbent.
    MilpFail,

    /// Cooperative cancellation was observed at a checkpoint.
    Canceled,
}

impl SolveStatus {
    /// Returns true if solution values were produced.
    pub fn has_solution(&self) -> bool {
        matches!(self, SolveStatus::Optimal)
    }
}

impl fmt::Display for SolveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SolveStatus::Optimal => write!(f, "Optimal"),
            SolveStatus::Infeasible => write!(f, "Infeasible"),
            SolveStatus::Unbounded => write!(f, "Unbounded"),
            SolveStatus::Failure => write!(f, "Failure"),
            SolveStatus::MilpFail => write!(f, "MilpFail"),
            SolveStatus::Canceled => write!(f, "Canceled"),
        }
    }
}

/// Reason attached to [`SolveStatus::Failure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Refactorization found a basis column with no usable pivot row.
    SingularBasis,

    /// A pivot element below the reject threshold survived reinversion.
    ZeroPivot,

    /// The iteration safety cap was reached.
    IterationLimit,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::SingularBasis => write!(f, "singular basis"),
            FailureKind::ZeroPivot => write!(f, "zero pivot"),
            FailureKind::IterationLimit => write!(f, "iteration limit"),
        }
    }
}
