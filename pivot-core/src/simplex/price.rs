//! Pricing and ratio tests for both simplex regimes.

use crate::model::ConstraintModel;
use crate::settings::SolverSettings;

use super::context::SolveContext;

/// Load the (direction-signed) raw column of unified index `varnr` into
/// `pcol`, dense over rows `0..=rows`. Slacks are identity columns; for
/// structural columns the dual regime's objective shift is folded into
/// row 0. The caller condenses with `ftran` where needed.
pub(super) fn load_column(
    model: &ConstraintModel,
    extra_dual: f64,
    varnr: usize,
    direction: f64,
    pcol: &mut [f64],
) {
    pcol.fill(0.0);
    let rows = model.rows();
    if varnr > rows {
        let col = varnr - rows;
        for e in model.col_slice(col) {
            pcol[e.row] = e.value * direction;
        }
        pcol[0] -= extra_dual * direction;
    } else {
        pcol[varnr] = direction;
    }
}

/// Direction sign of a nonbasic index: `+1` when rising from its lower
/// bound, `-1` when falling from its upper bound.
pub(super) fn direction(ctx: &SolveContext, i: usize) -> f64 {
    if ctx.vstate[i].at_lower {
        1.0
    } else {
        -1.0
    }
}

/// Dantzig pricing for the primal regime: one btran of the unit objective
/// row, expanded over the nonbasic columns, with the sign reversed for
/// indices sitting at their upper bound. Returns the entering index, or 0
/// when no reduced cost improves (ties broken by first found).
pub(super) fn price_primal(
    model: &ConstraintModel,
    settings: &SolverSettings,
    ctx: &SolveContext,
    drow: &mut [f64],
) -> usize {
    let rows = model.rows();
    let sum = model.sum();

    drow.fill(0.0);
    drow[0] = 1.0;
    ctx.eta.btran(&mut drow[..=rows]);

    for c in 1..=model.columns() {
        let varnr = rows + c;
        let vs = ctx.vstate[varnr];
        if vs.basic || vs.span() <= 0.0 {
            continue;
        }
        let mut d = -ctx.extra_dual;
        for e in model.col_slice(c) {
            d += drow[e.row] * e.value;
        }
        if d.abs() < settings.eps_reduced_cost {
            d = 0.0;
        }
        drow[varnr] = d;
    }

    let mut best = -settings.eps_reduced_cost;
    let mut col = 0;
    for i in 1..=sum {
        let vs = ctx.vstate[i];
        if vs.basic || vs.span() <= 0.0 {
            continue;
        }
        let d = if vs.at_lower { drow[i] } else { -drow[i] };
        if d < best {
            best = d;
            col = i;
        }
    }
    col
}

/// Outcome of the primal ratio test.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) enum PrimalRatio {
    /// A basic variable blocks after `theta` along the entering direction.
    Blocked { row: usize, theta: f64 },
    /// No basic variable blocks; the entering variable runs to its own
    /// opposite bound, or to infinity.
    Open,
}

/// Minimum-ratio test over the condensed entering column. Pivots below the
/// reject threshold are skipped; if that leaves no blocking row the test is
/// repeated accepting any nonzero pivot, with an instability warning.
pub(super) fn ratio_test_primal(
    settings: &SolverSettings,
    ctx: &SolveContext,
    pcol: &[f64],
) -> PrimalRatio {
    let rows = pcol.len() - 1;
    let mut row = 0;
    let mut theta = f64::INFINITY;

    for pass in 0..2 {
        let reject = if pass == 0 { settings.eps_pivot } else { 0.0 };
        for r in 1..=rows {
            let p = pcol[r];
            if p == 0.0 || p.abs() <= reject {
                continue;
            }
            let quot = if p > 0.0 {
                ctx.rhs[r] / p
            } else {
                let u = ctx.span(ctx.bas[r]);
                if u.is_infinite() {
                    continue;
                }
                (ctx.rhs[r] - u) / p
            };
            if quot < theta {
                theta = quot;
                row = r;
            }
        }
        if row != 0 {
            if pass == 1 {
                log::warn!("ratio test fell back to a pivot below the reject threshold");
            }
            break;
        }
    }

    if row == 0 {
        return PrimalRatio::Open;
    }
    if theta < 0.0 {
        if theta < -settings.eps_rhs {
            log::warn!("negative ratio {} clamped to zero", theta);
        }
        theta = 0.0;
    }
    PrimalRatio::Blocked { row, theta }
}

/// Pick the basic row whose value lies furthest outside `[0, span]`.
/// Returns 0 when every basic value is feasible.
pub(super) fn select_infeasible_row(settings: &SolverSettings, ctx: &SolveContext) -> usize {
    let mut worst = -settings.eps_rhs;
    let mut row = 0;
    for r in 1..ctx.bas.len() {
        let v = ctx.rhs[r];
        let u = ctx.span(ctx.bas[r]);
        let t = if v < 0.0 {
            v
        } else if v > u {
            u - v
        } else {
            0.0
        };
        if t < worst {
            worst = t;
            row = r;
        }
    }
    row
}

/// Dual pricing for the violated row `row_nr`: two btran products (the unit
/// objective row and the unit row of the violation), expanded over the
/// nonbasic columns, then a ratio test on reduced costs restricted to
/// columns whose tableau entry has the sign that moves the violation back
/// into range. Returns the entering index, or 0 when none is eligible (the
/// problem is infeasible).
pub(super) fn price_dual(
    model: &ConstraintModel,
    settings: &SolverSettings,
    ctx: &SolveContext,
    row_nr: usize,
    prow: &mut [f64],
    drow: &mut [f64],
) -> usize {
    let rows = model.rows();
    let sum = model.sum();

    drow.fill(0.0);
    prow.fill(0.0);
    drow[0] = 1.0;
    prow[row_nr] = 1.0;
    ctx.eta.btran(&mut drow[..=rows]);
    ctx.eta.btran(&mut prow[..=rows]);

    for c in 1..=model.columns() {
        let varnr = rows + c;
        let vs = ctx.vstate[varnr];
        if vs.basic || vs.span() <= 0.0 {
            continue;
        }
        let mut d = -ctx.extra_dual;
        let mut w = 0.0;
        for e in model.col_slice(c) {
            d += drow[e.row] * e.value;
            w += prow[e.row] * e.value;
        }
        if d.abs() < settings.eps_reduced_cost {
            d = 0.0;
        }
        if w.abs() < settings.eps_element {
            w = 0.0;
        }
        drow[varnr] = d;
        prow[varnr] = w;
    }

    let g = if ctx.rhs[row_nr] > ctx.span(ctx.bas[row_nr]) {
        -1.0
    } else {
        1.0
    };

    let mut theta = f64::INFINITY;
    let mut col = 0;
    for i in 1..=sum {
        let vs = ctx.vstate[i];
        if vs.basic || vs.span() <= 0.0 {
            continue;
        }
        let w = if vs.at_lower {
            g * prow[i]
        } else {
            -g * prow[i]
        };
        if w < -settings.eps_pivot {
            let d = if vs.at_lower { drow[i] } else { -drow[i] };
            let quot = -d / w;
            if quot < theta {
                theta = quot;
                col = i;
            }
        }
    }
    col
}
