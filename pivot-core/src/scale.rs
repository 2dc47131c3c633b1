//! Geometric row/column scaling.
//!
//! `auto_scale` rescales rows and columns of the constraint matrix by the
//! reciprocal geometric mean of each row's (then column's) extreme nonzero
//! magnitudes, improving conditioning without changing the feasible region's
//! combinatorics. The transform is fully reversible and accumulates across
//! repeated calls; integer columns are never scaled since a fractional
//! column factor would break their integrality semantics.
//!
//! Internally: entry (r, j) is stored as `a * R[r] * C[j]`, the right-hand
//! side and slack bounds as row units (`* R[r]`), variable bounds as
//! variable units (`/ C[j]`). Solutions and duals are mapped back at
//! extraction, so scaling is observationally transparent.

use crate::model::ConstraintModel;

impl ConstraintModel {
    /// Apply one pass of geometric row scaling followed by geometric column
    /// scaling. Safe to call repeatedly; the factors accumulate.
    pub fn auto_scale(&mut self) {
        let rows = self.rows();
        let columns = self.columns();
        if self.scale_vec_mut().is_none() {
            *self.scale_vec_mut() = Some(vec![1.0; rows + columns + 1]);
        }

        // Row pass. The objective row keeps factor 1 so reported objective
        // values need no row correction.
        let mut row_min = vec![f64::INFINITY; rows + 1];
        let mut row_max = vec![0.0_f64; rows + 1];
        for (_col, e) in self.storage().iter() {
            if e.row >= 1 {
                let a = e.value.abs();
                row_min[e.row] = row_min[e.row].min(a);
                row_max[e.row] = row_max[e.row].max(a);
            }
        }
        let mut row_change = vec![1.0; rows + 1];
        for r in 1..=rows {
            if row_max[r] > 0.0 {
                row_change[r] = 1.0 / (row_min[r] * row_max[r]).sqrt();
            }
        }
        self.storage_mut().scale_rows(&row_change);
        for r in 1..=rows {
            let f = row_change[r];
            self.rhs_vec_mut()[r] *= f;
            let b = &mut self.bounds_vec_mut()[r];
            b.lower *= f;
            b.upper *= f;
        }

        // Column pass, over the row-scaled entries.
        for col in 1..=columns {
            let index = rows + col;
            if self.bound_raw(index).integer {
                continue;
            }
            let mut lo = f64::INFINITY;
            let mut hi = 0.0_f64;
            for e in self.col_slice(col) {
                let a = e.value.abs();
                lo = lo.min(a);
                hi = hi.max(a);
            }
            if hi == 0.0 {
                continue;
            }
            let f = 1.0 / (lo * hi).sqrt();
            self.storage_mut().scale_col(col, f);
            let b = &mut self.bounds_vec_mut()[index];
            b.lower /= f;
            b.upper /= f;
            if let Some(scale) = self.scale_vec_mut() {
                scale[index] *= f;
            }
        }

        if let Some(scale) = self.scale_vec_mut() {
            for r in 1..=rows {
                scale[r] *= row_change[r];
            }
        }
        self.bump_revision();
    }

    /// Undo every accumulated scale factor, restoring the original matrix,
    /// right-hand sides and bounds.
    pub fn unscale(&mut self) {
        let rows = self.rows();
        let columns = self.columns();
        let Some(scale) = self.scale_vec_mut().take() else {
            return;
        };

        for col in 1..=columns {
            let f = scale[rows + col];
            if f != 1.0 {
                self.storage_mut().scale_col(col, 1.0 / f);
                let b = &mut self.bounds_vec_mut()[rows + col];
                b.lower *= f;
                b.upper *= f;
            }
        }

        let inverse: Vec<f64> = scale[..=rows].iter().map(|f| 1.0 / f).collect();
        self.storage_mut().scale_rows(&inverse);
        for r in 1..=rows {
            let f = scale[r];
            self.rhs_vec_mut()[r] /= f;
            let b = &mut self.bounds_vec_mut()[r];
            b.lower /= f;
            b.upper /= f;
        }
        self.bump_revision();
    }

    /// Undo only the column factors, leaving row scaling in place.
    pub fn unscale_columns(&mut self) {
        let rows = self.rows();
        let columns = self.columns();
        if self.scale_vec_mut().is_none() {
            return;
        }
        for col in 1..=columns {
            let f = self
                .scale_vec_mut()
                .as_ref()
                .map(|s| s[rows + col])
                .unwrap_or(1.0);
            if f != 1.0 {
                self.storage_mut().scale_col(col, 1.0 / f);
                let b = &mut self.bounds_vec_mut()[rows + col];
                b.lower *= f;
                b.upper *= f;
                if let Some(scale) = self.scale_vec_mut() {
                    scale[rows + col] = 1.0;
                }
            }
        }
        self.bump_revision();
    }
}
