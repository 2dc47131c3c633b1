//! Configuration for the simplex engine.

/// Tolerances and limits for the simplex engine.
///
/// The epsilon defaults are the empirically tuned values of the classical
/// kernel this engine descends from. They interact: `eps_element` governs
/// what is stored and rounded at all, `eps_rhs` what counts as primal
/// feasible, `eps_reduced_cost` what counts as an improving column, and
/// `eps_pivot` which pivot elements the ratio tests will accept.
#[derive(Debug, Clone)]
pub struct SolverSettings {
    /// Values below this magnitude are rounded to exact zero in the matrix,
    /// the eta file and the working right-hand side.
    pub eps_element: f64,

    /// Feasibility tolerance on basic-variable values.
    pub eps_rhs: f64,

    /// Reduced-cost tolerance for pricing: a column only enters when its
    /// reduced cost is below `-eps_reduced_cost`.
    pub eps_reduced_cost: f64,

    /// Reject threshold on pivot magnitudes in the ratio tests and during
    /// refactorization.
    pub eps_pivot: f64,

    /// Basis-changing pivots between full refactorizations.
    pub refactor_interval: u64,

    /// Safety cap on total simplex iterations per solve.
    pub max_iterations: u64,

    /// Override for the dual regime's objective shift. `None` derives it
    /// from the most negative objective coefficient.
    pub extra_dual: Option<f64>,

    /// Emit progress lines through the `log` facade.
    pub verbose: bool,
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            eps_element: 1e-12,
            eps_rhs: 5.01e-7,
            eps_reduced_cost: 1e-9,
            eps_pivot: 2e-7,
            refactor_interval: 50,
            max_iterations: 25_000,
            extra_dual: None,
            verbose: false,
        }
    }
}

impl SolverSettings {
    /// Settings with verbose progress output enabled.
    pub fn verbose() -> Self {
        Self {
            verbose: true,
            ..Default::default()
        }
    }

    /// Set the refactorization interval.
    pub fn with_refactor_interval(mut self, pivots: u64) -> Self {
        self.refactor_interval = pivots;
        self
    }

    /// Set the pivot reject threshold.
    pub fn with_eps_pivot(mut self, eps: f64) -> Self {
        self.eps_pivot = eps;
        self
    }

    /// Set the iteration safety cap.
    pub fn with_max_iterations(mut self, iters: u64) -> Self {
        self.max_iterations = iters;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_sane() {
        let s = SolverSettings::default();
        assert!(s.eps_element < s.eps_pivot);
        assert!(s.eps_reduced_cost < s.eps_rhs);
        assert!(s.refactor_interval > 0);
    }

    #[test]
    fn test_builders() {
        let s = SolverSettings::default()
            .with_refactor_interval(10)
            .with_eps_pivot(1e-6);
        assert_eq!(s.refactor_interval, 10);
        assert_eq!(s.eps_pivot, 1e-6);
    }
}
