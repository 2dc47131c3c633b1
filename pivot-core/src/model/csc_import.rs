//! Construction collaborators: build a model from CSC or triplet data.
//!
//! The core does no parsing; importers hand over a ready-made matrix and the
//! model is populated through the ordinary mutation operations.

use sprs::CsMatI;

use super::{ConstraintModel, ModelError, ModelResult, ObjSense, RowOp};

impl ConstraintModel {
    /// Build a model from a sparse constraint matrix in CSC (or CSR) format,
    /// one relation and right-hand side per row. Matrix rows/columns are
    /// 0-based as usual for `sprs`; they map to model rows `1..=nrows` and
    /// columns `1..=ncols`.
    pub fn from_csc(
        sense: ObjSense,
        objective: &[f64],
        a: &CsMatI<f64, usize>,
        ops: &[RowOp],
        rhs: &[f64],
    ) -> ModelResult<Self> {
        let (nrows, ncols) = (a.rows(), a.cols());
        if objective.len() != ncols {
            return Err(ModelError::DimensionMismatch {
                expected: ncols,
                got: objective.len(),
            });
        }
        if ops.len() != nrows {
            return Err(ModelError::DimensionMismatch {
                expected: nrows,
                got: ops.len(),
            });
        }
        if rhs.len() != nrows {
            return Err(ModelError::DimensionMismatch {
                expected: nrows,
                got: rhs.len(),
            });
        }

        let mut model = ConstraintModel::new(0, ncols);
        model.set_objective_sense(sense);
        model.set_objective(objective)?;

        let csr = a.to_csr();
        let mut buf = vec![0.0; ncols];
        for (r, row) in csr.outer_iterator().enumerate() {
            buf.fill(0.0);
            for (c, &v) in row.iter() {
                buf[c] = v;
            }
            model.add_constraint(&buf, ops[r], rhs[r])?;
        }
        Ok(model)
    }

    /// Build a model from (row, col, value) triplets with 0-based indices.
    pub fn from_triplets(
        sense: ObjSense,
        objective: &[f64],
        nrows: usize,
        triplets: &[(usize, usize, f64)],
        ops: &[RowOp],
        rhs: &[f64],
    ) -> ModelResult<Self> {
        let ncols = objective.len();
        if ops.len() != nrows {
            return Err(ModelError::DimensionMismatch {
                expected: nrows,
                got: ops.len(),
            });
        }
        if rhs.len() != nrows {
            return Err(ModelError::DimensionMismatch {
                expected: nrows,
                got: rhs.len(),
            });
        }

        let mut dense = vec![vec![0.0; ncols]; nrows];
        for &(r, c, v) in triplets {
            if r >= nrows {
                return Err(ModelError::InvalidRange {
                    kind: "row",
                    index: r,
                    lo: 0,
                    hi: nrows.saturating_sub(1),
                });
            }
            if c >= ncols {
                return Err(ModelError::InvalidRange {
                    kind: "column",
                    index: c,
                    lo: 0,
                    hi: ncols.saturating_sub(1),
                });
            }
            dense[r][c] += v;
        }

        let mut model = ConstraintModel::new(0, ncols);
        model.set_objective_sense(sense);
        model.set_objective(objective)?;
        for (r, coeffs) in dense.iter().enumerate() {
            model.add_constraint(coeffs, ops[r], rhs[r])?;
        }
        Ok(model)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sprs::TriMatI;

    #[test]
    fn test_from_csc() {
        // x + y <= 4; x + 3y >= 6
        let mut tri = TriMatI::<f64, usize>::new((2, 2));
        tri.add_triplet(0, 0, 1.0);
        tri.add_triplet(0, 1, 1.0);
        tri.add_triplet(1, 0, 1.0);
        tri.add_triplet(1, 1, 3.0);
        let a = tri.to_csc();

        let m = ConstraintModel::from_csc(
            ObjSense::Maximize,
            &[3.0, 2.0],
            &a,
            &[RowOp::Le, RowOp::Ge],
            &[4.0, 6.0],
        )
        .unwrap();

        assert_eq!(m.rows(), 2);
        assert_eq!(m.columns(), 2);
        assert_eq!(m.element(1, 2).unwrap(), 1.0);
        assert_eq!(m.element(2, 2).unwrap(), 3.0);
        assert_eq!(m.rhs_value(2).unwrap(), 6.0);
        assert_eq!(m.objective_coefficient(1).unwrap(), 3.0);
        assert!(m.row_flipped(2));
    }

    #[test]
    fn test_from_triplets() {
        let m = ConstraintModel::from_triplets(
            ObjSense::Minimize,
            &[1.0, 1.0],
            1,
            &[(0, 0, 1.0), (0, 1, 1.0)],
            &[RowOp::Eq],
            &[2.0],
        )
        .unwrap();
        assert_eq!(m.rows(), 1);
        assert_eq!(m.bound(1).unwrap().upper, 0.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let tri = TriMatI::<f64, usize>::new((1, 2));
        let a = tri.to_csc();
        let err = ConstraintModel::from_csc(
            ObjSense::Minimize,
            &[1.0],
            &a,
            &[RowOp::Le],
            &[1.0],
        );
        assert!(matches!(err, Err(ModelError::DimensionMismatch { .. })));
    }

    #[test]
    fn test_triplet_index_check() {
        let err = ConstraintModel::from_triplets(
            ObjSense::Minimize,
            &[1.0],
            1,
            &[(0, 5, 1.0)],
            &[RowOp::Le],
            &[1.0],
        );
        assert!(matches!(err, Err(ModelError::InvalidRange { .. })));
    }
}
