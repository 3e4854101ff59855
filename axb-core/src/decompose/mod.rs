//! Direct decompositions: LU, Cholesky, QR.
//!
//! Each factorization is computed once and reused by a separate solve
//! step (forward/backward substitution), optionally followed by
//! iterative refinement: re-substitute against the residual and
//! accumulate the correction until the residual-squared change drops
//! below tolerance or the iteration cap is hit.
//!
//! A factorization is valid only for the exact matrix it was derived
//! from; nothing tracks invalidation on the caller's behalf.

pub mod cholesky;
pub mod lu;
pub mod qr;

use axb_linalg::scalar::TINY;
use axb_linalg::{dense, Real, SparseMatrix};
use tracing::debug;

/// Iterative refinement of a direct solve for a square dense system.
///
/// `substitute` applies the factorization's substitution step to an
/// arbitrary right-hand side.
pub(crate) fn refine_dense<S>(
    a: &[Real],
    n: usize,
    b: &[Real],
    x0: Option<&[Real]>,
    max_iter: usize,
    tol: Real,
    substitute: S,
) -> Vec<Real>
where
    S: Fn(&[Real]) -> Vec<Real>,
{
    assert_eq!(a.len(), n * n);
    assert_eq!(b.len(), n);
    let mut x = match x0 {
        Some(v) => v.to_vec(),
        None => substitute(b),
    };
    let mut prev_r2 = Real::MAX;
    for iter in 0..max_iter {
        let r = dense::residual(a, n, &x, b);
        let r2 = dense::dot(&r, &r);
        if r2 <= tol || (prev_r2 - r2).abs() <= tol {
            debug!(iterations = iter, residual_sq = r2, "refinement converged");
            break;
        }
        prev_r2 = r2;
        let d = substitute(&r);
        for i in 0..n {
            x[i] += d[i];
        }
    }
    x
}

/// Forward substitution L * y = b against a sparse lower-triangular
/// factor. With `unit_diag` the diagonal is taken as 1 and never read.
pub fn sparse_forward_substitute(l: &SparseMatrix, b: &[Real], unit_diag: bool) -> Vec<Real> {
    let n = b.len();
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        let mut diag = if unit_diag { 1.0 } else { 0.0 };
        if let Some(row) = l.row(i) {
            for (j, v) in row.iter() {
                if j < i {
                    sum -= v * y[j];
                } else if j == i && !unit_diag {
                    diag = v;
                }
            }
        }
        y[i] = if diag.abs() < TINY { sum } else { sum / diag };
    }
    y
}

/// Backward substitution U * x = b against a sparse upper-triangular
/// factor.
pub fn sparse_back_substitute(u: &SparseMatrix, b: &[Real], unit_diag: bool) -> Vec<Real> {
    let n = b.len();
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = b[i];
        let mut diag = if unit_diag { 1.0 } else { 0.0 };
        if let Some(row) = u.row(i) {
            for (j, v) in row.iter() {
                if j > i {
                    sum -= v * x[j];
                } else if j == i && !unit_diag {
                    diag = v;
                }
            }
        }
        x[i] = if diag.abs() < TINY { sum } else { sum / diag };
    }
    x
}
