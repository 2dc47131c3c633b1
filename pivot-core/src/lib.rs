//! Pivot: a bounded-variable revised-simplex LP kernel
//!
//! This crate implements the hard core of a classical LP engine:
//!
//! - **Model** ([`ConstraintModel`]): sparse column-compressed constraint
//!   storage over one unified index space (objective row, constraint rows,
//!   slacks, structural variables), with incremental mutation.
//! - **Scaling**: reversible geometric row/column rescaling for numerical
//!   conditioning; integer columns are never scaled.
//! - **Basis factorization** ([`EtaFile`]): a product-form inverse rebuilt
//!   from scratch by refactorization and extended by one eta vector per
//!   pivot, with forward (`ftran`) and backward (`btran`) transforms.
//! - **Simplex** ([`solve`], [`solve_with`]): bounded-variable pivoting in a
//!   primal and a dual regime with periodic refactorization, zero-pivot
//!   recovery, bound flips, and cooperative pause/cancel.
//!
//! Integer branching and Lagrangian relaxation live in the companion
//! `pivot-mip` crate.
//!
//! # Example
//!
//! ```ignore
//! use pivot_core::{ConstraintModel, ObjSense, RowOp, SolverSettings, solve};
//!
//! // maximize 3x + 2y  subject to  x + y <= 4,  x + 3y <= 6
//! let mut model = ConstraintModel::new(0, 2);
//! model.set_objective_sense(ObjSense::Maximize);
//! model.set_objective(&[3.0, 2.0])?;
//! model.add_constraint(&[1.0, 1.0], RowOp::Le, 4.0)?;
//! model.add_constraint(&[1.0, 3.0], RowOp::Le, 6.0)?;
//!
//! let solution = solve(&model, &SolverSettings::default());
//! println!("status {}, objective {}", solution.status, solution.objective());
//! for (j, x) in solution.variable_values(&model).iter().enumerate() {
//!     println!("x{} = {}", j + 1, x);
//! }
//! ```
//!
//! # Statuses and errors
//!
//! Malformed mutations fail synchronously with a [`ModelError`]. Solves
//! always return a [`SolveStatus`]: infeasibility and unboundedness are
//! ordinary outcomes, and numerical breakdown surfaces as
//! [`SolveStatus::Failure`] only after one automatic reinversion retry.

#![warn(missing_docs)]

pub mod control;
pub mod eta;
pub mod model;
pub mod settings;
pub mod simplex;
pub mod status;

mod scale;

pub use control::{LogProgress, Progress, SolveControl};
pub use eta::EtaFile;
pub use model::{
    ConstraintModel, MatEntry, ModelError, ModelResult, ObjSense, RowOp, VariableBound,
};
pub use settings::SolverSettings;
pub use simplex::{solve, solve_with, LpSolution, SolveContext, VariableState};
pub use status::{FailureKind, SolveStatus};
