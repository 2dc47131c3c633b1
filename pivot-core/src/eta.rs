//! Eta-file (product-form) representation of the basis inverse.
//!
//! The inverse of the current basis is held as a product of elementary
//! matrices, one per pivot. Each eta vector is a sparse column over rows
//! `0..=rows` (row 0 is the objective row); its **last** entry is the pivot
//! row holding the reciprocal of the pivot element, and every off-pivot
//! entry holds `-value / pivot`. With that layout:
//!
//! - [`EtaFile::ftran`] applies the vectors in order, mapping a raw column
//!   into basis-inverse space;
//! - [`EtaFile::btran`] applies them in reverse, mapping a row.
//!
//! Both round residues below the element epsilon to exact zero.

/// Product-form inverse as an ordered list of sparse eta vectors.
#[derive(Debug, Clone)]
pub struct EtaFile {
    rows: Vec<usize>,
    values: Vec<f64>,
    col_end: Vec<usize>,
    eps: f64,
}

impl EtaFile {
    /// Empty eta file rounding below `eps`.
    pub fn new(eps: f64) -> Self {
        Self {
            rows: Vec::new(),
            values: Vec::new(),
            col_end: vec![0],
            eps,
        }
    }

    /// Number of eta vectors.
    pub fn len(&self) -> usize {
        self.col_end.len() - 1
    }

    /// Whether no eta vector is stored (the basis inverse is the identity).
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Discard all eta vectors.
    pub fn clear(&mut self) {
        self.rows.clear();
        self.values.clear();
        self.col_end.truncate(1);
    }

    /// Append one eta vector from a condensed column `pcol` (dense over
    /// `0..=rows`) and its pivot row.
    pub fn append(&mut self, pcol: &[f64], pivot_row: usize) {
        let pivot = pcol[pivot_row];
        for (i, &v) in pcol.iter().enumerate() {
            if i != pivot_row && v.abs() > self.eps {
                self.rows.push(i);
                self.values.push(-v / pivot);
            }
        }
        self.rows.push(pivot_row);
        self.values.push(1.0 / pivot);
        self.col_end.push(self.rows.len());
    }

    /// Append one eta vector from raw (row, value) pairs not containing the
    /// pivot row; used by the triangular passes of refactorization where the
    /// matrix column needs no condensing.
    pub fn append_sparse(&mut self, entries: &[(usize, f64)], pivot_row: usize, pivot: f64) {
        for &(r, v) in entries {
            if v.abs() > self.eps {
                self.rows.push(r);
                self.values.push(-v / pivot);
            }
        }
        self.rows.push(pivot_row);
        self.values.push(1.0 / pivot);
        self.col_end.push(self.rows.len());
    }

    /// Negate the stored pivot entry of the most recent eta vector. Used
    /// when the entering variable came down from its upper bound: the
    /// condensed column was direction-signed, and only the pivot entry of
    /// the true basis column differs in sign.
    pub fn negate_last_pivot(&mut self) {
        let k = *self.col_end.last().unwrap() - 1;
        self.values[k] = -self.values[k];
    }

    /// Transform a column vector into basis-inverse space, applying every
    /// eta vector in order.
    pub fn ftran(&self, v: &mut [f64]) {
        for c in 0..self.len() {
            let start = self.col_end[c];
            let end = self.col_end[c + 1];
            let k = end - 1;
            let r = self.rows[k];
            let theta = v[r];
            if theta != 0.0 {
                for j in start..k {
                    v[self.rows[j]] += theta * self.values[j];
                }
                v[r] = theta * self.values[k];
            }
        }
        for x in v.iter_mut() {
            if x.abs() < self.eps {
                *x = 0.0;
            }
        }
    }

    /// Transform a row vector, applying every eta vector in reverse.
    pub fn btran(&self, v: &mut [f64]) {
        for c in (0..self.len()).rev() {
            let start = self.col_end[c];
            let end = self.col_end[c + 1];
            let mut f = 0.0;
            for j in start..end {
                f += v[self.rows[j]] * self.values[j];
            }
            if f.abs() < self.eps {
                f = 0.0;
            }
            v[self.rows[end - 1]] = f;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-12;

    /// Dense product E_k ... E_1 applied to the unit vectors.
    fn dense_inverse(eta: &EtaFile, n: usize) -> Vec<Vec<f64>> {
        (0..n)
            .map(|i| {
                let mut e = vec![0.0; n];
                e[i] = 1.0;
                eta.ftran(&mut e);
                e
            })
            .collect()
    }

    #[test]
    fn test_empty_is_identity() {
        let eta = EtaFile::new(EPS);
        let mut v = vec![1.0, 2.0, 3.0];
        eta.ftran(&mut v);
        assert_eq!(v, vec![1.0, 2.0, 3.0]);
        eta.btran(&mut v);
        assert_eq!(v, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_single_eta_inverts_column() {
        // Basis column (over rows 1..=2, row 0 objective): a = (0, 2, 4),
        // pivot row 1. E * a must be e_1.
        let mut eta = EtaFile::new(EPS);
        eta.append(&[0.0, 2.0, 4.0], 1);

        let mut a = vec![0.0, 2.0, 4.0];
        eta.ftran(&mut a);
        assert!((a[1] - 1.0).abs() < 1e-12);
        assert!(a[2].abs() < 1e-12);
    }

    #[test]
    fn test_ftran_btran_agree_on_inverse() {
        // Two pivots over a 3-row space (row 0 unused here). ftran applied
        // to unit columns yields B^-1 columns; btran applied to unit rows
        // yields B^-1 rows. The two reconstructions must agree.
        let mut eta = EtaFile::new(EPS);
        eta.append(&[0.0, 2.0, 1.0], 1);
        let mut second = vec![0.0, 1.0, 3.0];
        eta.ftran(&mut second);
        eta.append(&second, 2);

        let n = 3;
        let by_cols = dense_inverse(&eta, n);
        for i in 0..n {
            let mut row = vec![0.0; n];
            row[i] = 1.0;
            eta.btran(&mut row);
            for j in 0..n {
                // by_cols[j][i] is entry (i, j) of the inverse.
                assert!(
                    (row[j] - by_cols[j][i]).abs() < 1e-9,
                    "mismatch at ({}, {})",
                    i,
                    j
                );
            }
        }
    }

    #[test]
    fn test_append_sparse_matches_append() {
        let mut a = EtaFile::new(EPS);
        a.append(&[0.5, 4.0, -1.0], 1);

        let mut b = EtaFile::new(EPS);
        b.append_sparse(&[(0, 0.5), (2, -1.0)], 1, 4.0);

        let mut va = vec![0.2, 1.0, -0.7];
        let mut vb = va.clone();
        a.ftran(&mut va);
        b.ftran(&mut vb);
        for (x, y) in va.iter().zip(vb.iter()) {
            assert!((x - y).abs() < 1e-12);
        }
    }

    #[test]
    fn test_clear() {
        let mut eta = EtaFile::new(EPS);
        eta.append(&[0.0, 2.0], 1);
        assert_eq!(eta.len(), 1);
        eta.clear();
        assert!(eta.is_empty());
        let mut v = vec![5.0, 7.0];
        eta.ftran(&mut v);
        assert_eq!(v, vec![5.0, 7.0]);
    }

    #[test]
    fn test_tiny_residues_rounded() {
        let mut eta = EtaFile::new(1e-9);
        eta.append(&[0.0, 1.0, 1e-12], 1);
        let mut v = vec![0.0, 1.0, 0.0];
        eta.ftran(&mut v);
        assert_eq!(v[2], 0.0);
    }
}
