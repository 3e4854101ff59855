#![allow(clippy::needless_range_loop)]
//! LU decomposition.
//!
//! Dense path: Crout's method with partial pivoting and implicit row
//! scaling; a zero pivot after scaling signals a singular or
//! near-singular matrix. Sparse path: Doolittle elimination over the
//! sparse container with fill-in allowed and no pivoting.

use axb_linalg::scalar::TINY;
use axb_linalg::{dense, Real, SparseMatrix, SparseVector};

use crate::decompose::{refine_dense, sparse_back_substitute, sparse_forward_substitute};
use crate::error::LinalgError;

/// Dense LU factorization: packed L\U with a row permutation.
///
/// L is unit lower-triangular (its diagonal is implicit), U occupies the
/// diagonal and above.
pub struct LuDecomp {
    lu: Vec<Real>,
    perm: Vec<usize>,
    sign: Real,
    n: usize,
}

impl LuDecomp {
    /// Factor a square matrix with Crout's method, partial pivoting, and
    /// implicit row scaling.
    pub fn new(a: &[Real], n: usize) -> Result<Self, LinalgError> {
        assert_eq!(a.len(), n * n);
        let mut lu = a.to_vec();
        let mut perm = vec![0usize; n];
        let mut sign: Real = 1.0;

        // Implicit scaling: reciprocal of each row's largest magnitude.
        let mut scales = vec![0.0; n];
        for i in 0..n {
            let mut big: Real = 0.0;
            for j in 0..n {
                big = big.max(dense::get(&lu, n, n, i, j).abs());
            }
            if big < TINY {
                return Err(LinalgError::SingularMatrix { row: i });
            }
            scales[i] = 1.0 / big;
        }

        for j in 0..n {
            for i in 0..j {
                let mut sum = dense::get(&lu, n, n, i, j);
                for k in 0..i {
                    sum -= dense::get(&lu, n, n, i, k) * dense::get(&lu, n, n, k, j);
                }
                dense::set(&mut lu, n, n, i, j, sum);
            }

            // Scaled pivot search over the column's remainder.
            let mut big: Real = 0.0;
            let mut imax = j;
            for i in j..n {
                let mut sum = dense::get(&lu, n, n, i, j);
                for k in 0..j {
                    sum -= dense::get(&lu, n, n, i, k) * dense::get(&lu, n, n, k, j);
                }
                dense::set(&mut lu, n, n, i, j, sum);
                let candidate = scales[i] * sum.abs();
                if candidate >= big {
                    big = candidate;
                    imax = i;
                }
            }

            if imax != j {
                for k in 0..n {
                    let tmp = dense::get(&lu, n, n, imax, k);
                    let val = dense::get(&lu, n, n, j, k);
                    dense::set(&mut lu, n, n, imax, k, val);
                    dense::set(&mut lu, n, n, j, k, tmp);
                }
                scales.swap(imax, j);
                sign = -sign;
            }
            perm[j] = imax;

            let pivot = dense::get(&lu, n, n, j, j);
            if pivot.abs() < TINY {
                return Err(LinalgError::SingularMatrix { row: j });
            }
            if j + 1 < n {
                let inv = 1.0 / pivot;
                for i in (j + 1)..n {
                    let v = dense::get(&lu, n, n, i, j) * inv;
                    dense::set(&mut lu, n, n, i, j, v);
                }
            }
        }

        Ok(Self { lu, perm, sign, n })
    }

    /// Solve A * x = b by permuted forward then backward substitution.
    pub fn solve(&self, b: &[Real]) -> Vec<Real> {
        let n = self.n;
        assert_eq!(b.len(), n);
        let mut x = b.to_vec();

        // Forward pass, unscrambling the permutation as it goes.
        let mut first_nonzero: Option<usize> = None;
        for i in 0..n {
            let ip = self.perm[i];
            let mut sum = x[ip];
            x[ip] = x[i];
            if let Some(start) = first_nonzero {
                for j in start..i {
                    sum -= dense::get(&self.lu, n, n, i, j) * x[j];
                }
            } else if sum != 0.0 {
                first_nonzero = Some(i);
            }
            x[i] = sum;
        }

        for i in (0..n).rev() {
            let mut sum = x[i];
            for j in (i + 1)..n {
                sum -= dense::get(&self.lu, n, n, i, j) * x[j];
            }
            x[i] = sum / dense::get(&self.lu, n, n, i, i);
        }
        x
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

    /// Determinant from the factorization: parity times the product of
    /// the pivots.
    pub fn determinant(&self) -> Real {
        let mut det = self.sign;
        for i in 0..self.n {
            det *= dense::get(&self.lu, self.n, self.n, i, i);
        }
        det
    }
}

/// Sparse LU factorization: unit lower and upper factors with fill-in
/// allowed, no pivoting. Callers supply matrices whose natural row order
/// keeps pivots non-zero.
pub struct SparseLu {
    pub lower: SparseMatrix,
    pub upper: SparseMatrix,
    n: usize,
}

impl SparseLu {
    pub fn new(a: &SparseMatrix, n: usize) -> Result<Self, LinalgError> {
        let mut lower = SparseMatrix::new();
        let mut upper = SparseMatrix::new();

        for i in 0..n {
            let mut w = a.row(i).cloned().unwrap_or_default();

            // Eliminate sub-diagonal entries in ascending column order;
            // each elimination can only introduce columns to the right.
            loop {
                let target = w.iter().take_while(|&(k, _)| k < i).find(|&(_, v)| v != 0.0);
                let Some((k, wk)) = target else { break };
                let ukk = upper.get(k, k);
                if ukk.abs() < TINY {
                    return Err(LinalgError::SingularMatrix { row: k });
                }
                let factor = wk / ukk;
                let uk = upper.row(k).cloned().unwrap_or_default();
                w = SparseVector::scaled_sum(&w, 1.0, &uk, -factor);
                // exact hole where the elimination targeted
                w.insert(k, 0.0);
                lower.insert(i, k, factor);
            }

            w.clean();
            if w.get(i).abs() < TINY {
                return Err(LinalgError::SingularMatrix { row: i });
            }
            upper.set_row(i, w);
            lower.insert(i, i, 1.0);
        }

        Ok(Self { lower, upper, n })
    }

    pub fn solve(&self, b: &[Real]) -> Vec<Real> {
        assert_eq!(b.len(), self.n);
        let y = sparse_forward_substitute(&self.lower, b, false);
        sparse_back_substitute(&self.upper, &y, false)
    }

    /// Substitution plus iterative refinement against the original
    /// matrix.
    pub fn solve_refined(
        &self,
        a: &SparseMatrix,
        b: &[Real],
        x0: Option<&[Real]>,
        max_iter: usize,
        tol: Real,
    ) -> Vec<Real> {
        let n = self.n;
        assert_eq!(b.len(), n);
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
