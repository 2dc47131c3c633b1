//! Basis refactorization: rebuild the eta file and working right-hand side
//! from scratch.
//!
//! The elimination runs in four stages. Rows holding exactly one free basic
//! column are eliminated first, straight from the raw matrix column (a
//! singleton row guarantees every other free column is zero there, so no
//! condensing is needed). Columns with exactly one free row are reserved on
//! a substitution list. Whatever remains is eliminated generally: condense
//! the column through the eta file built so far, pick the largest usable
//! pivot among free rows, and append. The substitution list is then replayed
//! in reverse, which keeps each deferred raw column untouched by the eta
//! vectors appended before it. Finally the working right-hand side is
//! rounded below the element epsilon.

use crate::model::ConstraintModel;
use crate::settings::SolverSettings;

use super::context::SolveContext;
use super::price::load_column;

/// Refactorization found a basis column with no usable pivot row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SingularBasis;

/// Rebuild `ctx.eta`, `ctx.rhs` and the row assignment in `ctx.bas` for the
/// current basis.
pub(crate) fn invert(
    model: &ConstraintModel,
    settings: &SolverSettings,
    ctx: &mut SolveContext,
) -> Result<(), SingularBasis> {
    let rows = model.rows();
    let columns = model.columns();

    ctx.eta.clear();
    ctx.eta_valid = false;
    ctx.pivots_since_invert = 0;
    ctx.inverts += 1;

    init_rhs(model, ctx);

    // Free rows need a structural pivot; rows covered by a basic slack are
    // identity columns and need none. Canonicalize slack positions while
    // rebuilding the row assignment.
    let mut frow = vec![false; rows + 1];
    let mut fcol = vec![false; columns + 1];
    for r in 1..=rows {
        frow[r] = true;
    }
    let mut newbas = vec![0usize; rows + 1];
    for r in 1..=rows {
        let b = ctx.bas[r];
        if b > rows {
            fcol[b - rows] = true;
        } else {
            frow[b] = false;
            newbas[b] = b;
        }
    }
    ctx.bas = newbas;

    // rownum[r]: free basic columns with a nonzero in free row r.
    let mut rownum = vec![0usize; rows + 1];
    for c in 1..=columns {
        if fcol[c] {
            for e in model.col_slice(c) {
                if e.row >= 1 && frow[e.row] {
                    rownum[e.row] += 1;
                }
            }
        }
    }

    // Stage 1: singleton rows, round-robin until a full sweep finds none.
    if rows > 0 {
        let mut r = 0;
        let mut sweep = 0;
        while sweep < rows {
            r = r % rows + 1;
            sweep += 1;
            if frow[r] && rownum[r] == 1 {
                if let Some(c) = single_column_in_row(model, &fcol, r, columns) {
                    minor_iteration(model, settings, ctx, c, r)?;
                    frow[r] = false;
                    fcol[c] = false;
                    for e in model.col_slice(c) {
                        if e.row >= 1 && frow[e.row] {
                            rownum[e.row] -= 1;
                        }
                    }
                    sweep = 0;
                }
            }
        }
    }

    // colnum[c]: free rows containing a nonzero of free column c.
    let mut colnum = vec![0usize; columns + 1];
    for c in 1..=columns {
        if fcol[c] {
            colnum[c] = model
                .col_slice(c)
                .iter()
                .filter(|e| e.row >= 1 && frow[e.row])
                .count();
        }
    }

    // Stage 2: singleton columns go on the substitution list; their pivot
    // row is reserved immediately.
    let mut deferred: Vec<(usize, usize)> = Vec::new();
    if columns > 0 {
        let mut c = 0;
        let mut sweep = 0;
        while sweep < columns {
            c = c % columns + 1;
            sweep += 1;
            if fcol[c] && colnum[c] == 1 {
                let hit = model
                    .col_slice(c)
                    .iter()
                    .find(|e| e.row >= 1 && frow[e.row])
                    .map(|e| e.row);
                if let Some(r) = hit {
                    deferred.push((c, r));
                    fcol[c] = false;
                    frow[r] = false;
                    for c2 in 1..=columns {
                        if fcol[c2] && has_entry(model, c2, r) {
                            colnum[c2] -= 1;
                        }
                    }
                    sweep = 0;
                }
            }
        }
    }

    // Stage 3: general elimination of everything still free.
    let mut pcol = vec![0.0; rows + 1];
    for c in 1..=columns {
        if !fcol[c] {
            continue;
        }
        fcol[c] = false;
        load_column(model, ctx.extra_dual, rows + c, 1.0, &mut pcol);
        ctx.eta.ftran(&mut pcol);

        let mut best = 0;
        let mut mag = settings.eps_pivot;
        for r in 1..=rows {
            if frow[r] && pcol[r].abs() > mag {
                mag = pcol[r].abs();
                best = r;
            }
        }
        if best == 0 {
            return Err(SingularBasis);
        }

        let theta = ctx.rhs[best] / pcol[best];
        for i in 0..=rows {
            ctx.rhs[i] -= theta * pcol[i];
        }
        ctx.rhs[best] = theta;
        ctx.eta.append(&pcol, best);
        ctx.bas[best] = rows + c;
        frow[best] = false;
    }

    // Stage 4: replay the substitution list in reverse.
    for &(c, r) in deferred.iter().rev() {
        minor_iteration(model, settings, ctx, c, r)?;
    }

    for v in ctx.rhs.iter_mut() {
        if v.abs() < settings.eps_element {
            *v = 0.0;
        }
    }
    debug_assert!(ctx.bas[1..].iter().all(|&b| b != 0), "unassigned basic row");
    ctx.eta_valid = true;
    Ok(())
}

/// Rebuild the working right-hand side: the original row values shifted by
/// every lower bound, minus the span contribution of each nonbasic index
/// sitting at its upper bound.
fn init_rhs(model: &ConstraintModel, ctx: &mut SolveContext) {
    let rows = model.rows();
    let sum = model.sum();
    ctx.rhs[0] = 0.0;
    for r in 1..=rows {
        ctx.rhs[r] = model.rhs_raw(r);
    }
    for i in 1..=sum {
        let vs = ctx.vstate[i];
        let mut shift = 0.0;
        if vs.lower != 0.0 {
            shift += vs.lower;
        }
        if !vs.basic && !vs.at_lower && vs.span().is_finite() {
            shift += vs.span();
        }
        if shift != 0.0 {
            if i <= rows {
                ctx.rhs[i] -= shift;
            } else {
                for e in model.col_slice(i - rows) {
                    ctx.rhs[e.row] -= shift * e.value;
                }
            }
        }
    }
}

/// One lightweight Gauss-Jordan step from the raw matrix column: appends an
/// eta vector, updates the working right-hand side and claims the pivot row.
fn minor_iteration(
    model: &ConstraintModel,
    settings: &SolverSettings,
    ctx: &mut SolveContext,
    col: usize,
    row_nr: usize,
) -> Result<(), SingularBasis> {
    let rows = model.rows();
    let mut entries: Vec<(usize, f64)> = Vec::new();
    let mut obj = -ctx.extra_dual;
    let mut pivot = 0.0;
    for e in model.col_slice(col) {
        if e.row == 0 {
            obj += e.value;
        } else if e.row == row_nr {
            pivot = e.value;
        } else {
            entries.push((e.row, e.value));
        }
    }
    if pivot.abs() < settings.eps_pivot {
        return Err(SingularBasis);
    }
    if obj != 0.0 {
        entries.push((0, obj));
    }

    let theta = ctx.rhs[row_nr] / pivot;
    for &(r, v) in &entries {
        ctx.rhs[r] -= theta * v;
    }
    ctx.rhs[row_nr] = theta;
    ctx.eta.append_sparse(&entries, row_nr, pivot);
    ctx.bas[row_nr] = rows + col;
    Ok(())
}

fn single_column_in_row(
    model: &ConstraintModel,
    fcol: &[bool],
    row: usize,
    columns: usize,
) -> Option<usize> {
    (1..=columns).find(|&c| fcol[c] && has_entry(model, c, row))
}

fn has_entry(model: &ConstraintModel, col: usize, row: usize) -> bool {
    model
        .col_slice(col)
        .binary_search_by_key(&row, |e| e.row)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ConstraintModel, RowOp};
    use crate::simplex::context::SolveContext;

    fn fixture() -> (ConstraintModel, SolverSettings) {
        // 3 rows, 3 columns with a mixed sparsity pattern.
        let mut m = ConstraintModel::new(0, 3);
        m.set_element(0, 1, 1.0).unwrap();
        m.add_constraint(&[2.0, 1.0, 0.0], RowOp::Le, 4.0).unwrap();
        m.add_constraint(&[1.0, 3.0, 1.0], RowOp::Le, 6.0).unwrap();
        m.add_constraint(&[0.0, 1.0, 2.0], RowOp::Le, 8.0).unwrap();
        (m, SolverSettings::default())
    }

    /// ftran of each basic column must yield the matching unit vector.
    fn assert_basis_identity(model: &ConstraintModel, ctx: &SolveContext) {
        let rows = model.rows();
        let mut v = vec![0.0; rows + 1];
        for r in 1..=rows {
            load_column(model, ctx.extra_dual, ctx.bas[r], 1.0, &mut v);
            ctx.eta.ftran(&mut v);
            for i in 1..=rows {
                let expect = if i == r { 1.0 } else { 0.0 };
                assert!(
                    (v[i] - expect).abs() < 1e-9,
                    "column of row {} maps to {:?}",
                    r,
                    v
                );
            }
        }
    }

    #[test]
    fn test_invert_all_slack_basis() {
        let (m, s) = fixture();
        let mut ctx = SolveContext::new(&m, &s);
        invert(&m, &s, &mut ctx).unwrap();
        assert!(ctx.eta.is_empty());
        assert_eq!(&ctx.rhs[1..], &[4.0, 6.0, 8.0]);
        assert!(ctx.eta_valid);
    }

    #[test]
    fn test_invert_structural_basis() {
        let (m, s) = fixture();
        let mut ctx = SolveContext::new(&m, &s);
        // Basis {x1, x2, x3}: mark slacks out, variables in.
        for i in 1..=3 {
            ctx.vstate[i].basic = false;
            ctx.vstate[i].at_lower = true;
            ctx.vstate[3 + i].basic = true;
        }
        ctx.bas = vec![0, 4, 5, 6];
        invert(&m, &s, &mut ctx).unwrap();
        assert_eq!(ctx.eta.len(), 3);
        assert_basis_identity(&m, &ctx);

        // B x = b must hold for the rebuilt rhs.
        let pos = ctx.basis_positions();
        let x1 = ctx.rhs[pos[4]];
        let x2 = ctx.rhs[pos[5]];
        let x3 = ctx.rhs[pos[6]];
        assert!((2.0 * x1 + x2 - 4.0).abs() < 1e-9);
        assert!((x1 + 3.0 * x2 + x3 - 6.0).abs() < 1e-9);
        assert!((x2 + 2.0 * x3 - 8.0).abs() < 1e-9);
    }

    #[test]
    fn test_invert_mixed_basis() {
        let (m, s) = fixture();
        let mut ctx = SolveContext::new(&m, &s);
        // Basis {s1, x2, x3}.
        ctx.vstate[2].basic = false;
        ctx.vstate[3].basic = false;
        ctx.vstate[5].basic = true;
        ctx.vstate[6].basic = true;
        ctx.bas = vec![0, 1, 5, 6];
        invert(&m, &s, &mut ctx).unwrap();
        assert_basis_identity(&m, &ctx);
    }

    #[test]
    fn test_singular_basis_detected() {
        let mut m = ConstraintModel::new(0, 2);
        m.add_constraint(&[1.0, 2.0], RowOp::Le, 1.0).unwrap();
        m.add_constraint(&[2.0, 4.0], RowOp::Le, 2.0).unwrap();
        let s = SolverSettings::default();
        let mut ctx = SolveContext::new(&m, &s);
        // Both variables basic: the 2x2 basis submatrix is rank 1.
        for i in 1..=2 {
            ctx.vstate[i].basic = false;
            ctx.vstate[2 + i].basic = true;
        }
        ctx.bas = vec![0, 3, 4];
        assert_eq!(invert(&m, &s, &mut ctx), Err(SingularBasis));
    }

    #[test]
    fn test_rhs_accounts_for_bounds() {
        let (m, s) = fixture();
        let mut m = m;
        m.set_bounds(4, 1.0, 3.0).unwrap();
        let mut ctx = SolveContext::new(&m, &s);
        // x1 nonbasic at its upper bound: rhs shifts by lower + span.
        ctx.vstate[4].at_lower = false;
        invert(&m, &s, &mut ctx).unwrap();
        // Row 1: 4 - 3 * 2 = -2; row 2: 6 - 3 * 1 = 3.
        assert!((ctx.rhs[1] - (-2.0)).abs() < 1e-9);
        assert!((ctx.rhs[2] - 3.0).abs() < 1e-9);
    }
}
