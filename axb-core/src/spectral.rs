//! Dominant eigenvalue and condition number.

use tracing::warn;

use axb_linalg::scalar::TINY;
use axb_linalg::{dense, Real, SparseMatrix};

use crate::error::LinalgError;
use crate::svd::{jacobi_svd, sparse_jacobi_svd};

/// Dominant eigenvalue by power iteration over a matrix-vector closure.
///
/// Applies the operator to an all-ones start vector, renormalizes by
/// the largest-magnitude component, and iterates until that component
/// settles within `eps` or `max_iter` is hit. Converges to the
/// eigenvalue of largest magnitude only.
pub fn dominant_eigenvalue<F>(mat_vec: F, n: usize, eps: Real, max_iter: usize) -> Real
where
    F: Fn(&[Real]) -> Vec<Real>,
{
    let mut x = vec![1.0; n];
    let mut lambda = 0.0;

    for iter in 0..max_iter {
        let y = mat_vec(&x);
        let mut next = y[0];
        for &v in y.iter().skip(1) {
            if v.abs() > next.abs() {
                next = v;
            }
        }
        if next.abs() < TINY {
            return 0.0;
        }
        x = y.iter().map(|v| v / next).collect();
        if (next - lambda).abs() < eps {
            return next;
        }
        lambda = next;
        if iter + 1 == max_iter {
            warn!(max_iter, lambda, "power iteration hit its iteration cap");
        }
    }
    lambda
}

/// Power iteration on a dense `n x n` matrix.
pub fn dominant_eigenvalue_dense(a: &[Real], n: usize, eps: Real, max_iter: usize) -> Real {
    assert_eq!(a.len(), n * n);
    dominant_eigenvalue(|x| dense::mat_vec(a, n, n, x), n, eps, max_iter)
}

/// Power iteration on a sparse `n x n` matrix.
pub fn dominant_eigenvalue_sparse(a: &SparseMatrix, n: usize, eps: Real, max_iter: usize) -> Real {
    dominant_eigenvalue(|x| a.mat_vec(x, n), n, eps, max_iter)
}

fn condition_from_sigmas(sigmas: &[Real]) -> Result<Real, LinalgError> {
    if sigmas.len() < 2 {
        return Err(LinalgError::RankDeficient { rank: sigmas.len() });
    }
    // descending order: first over last
    Ok(sigmas[0] / sigmas[sigmas.len() - 1])
}

/// Condition number of a dense `m x n` matrix: the ratio of its largest
/// to smallest non-negligible singular value.
pub fn condition_number_dense(
    a: &[Real],
    m: usize,
    n: usize,
    eps: Real,
    itermax: usize,
) -> Result<Real, LinalgError> {
    let sigmas: Vec<Real> = jacobi_svd(a, m, n, eps, itermax)
        .iter()
        .map(|t| t.sigma)
        .collect();
    condition_from_sigmas(&sigmas)
}

/// Condition number of a sparse `m x n` matrix.
pub fn condition_number_sparse(
    a: &SparseMatrix,
    m: usize,
    n: usize,
    eps: Real,
    itermax: usize,
) -> Result<Real, LinalgError> {
    let sigmas: Vec<Real> = sparse_jacobi_svd(a, m, n, eps, itermax)
        .iter()
        .map(|t| t.sigma)
        .collect();
    condition_from_sigmas(&sigmas)
}
