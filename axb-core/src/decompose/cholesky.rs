#![allow(clippy::needless_range_loop)]
//! Cholesky decomposition for symmetric positive definite matrices.
//!
//! Symmetry is the caller's contract and not re-verified; positive
//! definiteness is caught through the pivot check.

use axb_linalg::scalar::TINY;
use axb_linalg::{dense, Real, SparseMatrix};

use crate::decompose::{refine_dense, sparse_back_substitute, sparse_forward_substitute};
use crate::error::LinalgError;

/// Dense Cholesky factor L with A = L * L'.
pub struct CholeskyDecomp {
    l: Vec<Real>,
    n: usize,
}

impl CholeskyDecomp {
    pub fn new(a: &[Real], n: usize) -> Result<Self, LinalgError> {
        assert_eq!(a.len(), n * n);
        let mut l = vec![0.0; n * n];

        for j in 0..n {
            let mut sum = 0.0;
            for k in 0..j {
                let ljk = dense::get(&l, n, n, j, k);
                sum += ljk * ljk;
            }
            let pivot = dense::get(a, n, n, j, j) - sum;
            if pivot <= 0.0 {
                return Err(LinalgError::NotPositiveDefinite { row: j, pivot });
            }
            let ljj = pivot.sqrt();
            dense::set(&mut l, n, n, j, j, ljj);

            for i in (j + 1)..n {
                let mut sum = 0.0;
                for k in 0..j {
                    sum += dense::get(&l, n, n, i, k) * dense::get(&l, n, n, j, k);
                }
                dense::set(&mut l, n, n, i, j, (dense::get(a, n, n, i, j) - sum) / ljj);
            }
        }

        Ok(Self { l, n })
    }

    /// The lower-triangular factor.
    pub fn factor(&self) -> &[Real] {
        &self.l
    }

    /// Solve L * L' * x = b.
    pub fn solve(&self, b: &[Real]) -> Vec<Real> {
        assert_eq!(b.len(), self.n);
        let y = dense::forward_substitute(&self.l, self.n, b, false);
        let lt = dense::transpose(&self.l, self.n, self.n);
        dense::back_substitute(&lt, self.n, &y, false)
    }

    /// Substitution plus iterative refinement against the original
    /// matrix.
    pub fn solve_refined(
        &self,
        a: &[Real],
        b: &[Real],
        x0: Option<&[Real]>,
        max_iter: usize,
        tol: Real,
    ) -> Vec<Real> {
        refine_dense(a, self.n, b, x0, max_iter, tol, |rhs| self.solve(rhs))
    }

    /// Inverse of the original matrix, column by column.
    pub fn inverse(&self) -> Vec<Real> {
        let n = self.n;
        let mut inv = vec![0.0; n * n];
        for j in 0..n {
            let mut e = vec![0.0; n];
            e[j] = 1.0;
            let col = self.solve(&e);
            for i in 0..n {
                dense::set(&mut inv, n, n, i, j, col[i]);
            }
        }
        inv
    }
}

/// Sparse Cholesky factor with fill-in allowed.
pub struct SparseCholesky {
    pub lower: SparseMatrix,
    upper: SparseMatrix,
    n: usize,
}

impl SparseCholesky {
    pub fn new(a: &SparseMatrix, n: usize) -> Result<Self, LinalgError> {
        let mut lower = SparseMatrix::new();

        for j in 0..n {
            let lj = lower.row(j).cloned().unwrap_or_default();
            let pivot = a.get(j, j) - lj.dot(&lj);
            if pivot <= 0.0 {
                return Err(LinalgError::NotPositiveDefinite { row: j, pivot });
            }
            let ljj = pivot.sqrt();
            lower.insert(j, j, ljj);

            for i in (j + 1)..n {
                // rows i and j of L hold only columns < j here, so the
                // merge dot is exactly the partial sum the update needs
                let li = lower.row(i).cloned().unwrap_or_default();
                let s = a.get(i, j) - li.dot(&lj);
                if s != 0.0 {
                    lower.insert(i, j, s / ljj);
                }
            }
        }

        let upper = lower.transpose();
        Ok(Self { lower, upper, n })
    }

    pub fn solve(&self, b: &[Real]) -> Vec<Real> {
        assert_eq!(b.len(), self.n);
        let y = sparse_forward_substitute(&self.lower, b, false);
        sparse_back_substitute(&self.upper, &y, false)
    }

    pub fn solve_refined(
        &self,
        a: &SparseMatrix,
        b: &[Real],
        x0: Option<&[Real]>,
        max_iter: usize,
        tol: Real,
    ) -> Vec<Real> {
        let n = self.n;
        let mut x = match x0 {
            Some(v) => v.to_vec(),
            None => self.solve(b),
        };
        let mut prev_r2 = Real::MAX;
        for _ in 0..max_iter {
            let ax = a.mat_vec(&x, n);
            let r: Vec<Real> = b.iter().zip(ax.iter()).map(|(bi, ai)| bi - ai).collect();
            let r2 = dense::dot(&r, &r);
            if r2 <= tol || (prev_r2 - r2).abs() <= tol {
                break;
            }
            prev_r2 = r2;
            let d = self.solve(&r);
            for i in 0..n {
                x[i] += d[i];
            }
        }
        x
    }
}
