#![allow(clippy::needless_range_loop)]
//! QR decomposition.
//!
//! Three interchangeable dense algorithms: classical Gram-Schmidt
//! (simplest, numerically weakest), Householder reflections (stable,
//! used internally by the SVD), and Givens rotations (stable,
//! sparsity-preserving). The sparse path uses Givens rotations over
//! sparse rows and compacts the structural zeros they leave behind.

use axb_linalg::scalar::TINY;
use axb_linalg::{dense, Real, SparseMatrix, SparseVector};

use crate::decompose::{refine_dense, sparse_back_substitute};
use crate::error::LinalgError;

/// Which algorithm computes the factorization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QrMethod {
    GramSchmidt,
    Householder,
    Givens,
}

/// Givens coefficients (c, s) zeroing `b` against `a`.
///
/// A near-zero pair falls back to the identity rotation rather than
/// raising an error.
pub fn givens_coeffs(a: Real, b: Real) -> (Real, Real) {
    let h = a.hypot(b);
    if h < TINY {
        (1.0, 0.0)
    } else {
        (a / h, b / h)
    }
}

/// Dense QR factors with A = Q * R.
///
/// Gram-Schmidt yields the thin factorization (Q is m x n, R is n x n);
/// Householder and Givens yield the full one (Q is m x m, R is m x n).
pub struct QrDecomp {
    pub q: Vec<Real>,
    pub r: Vec<Real>,
    m: usize,
    n: usize,
    q_cols: usize,
}

impl QrDecomp {
    pub fn new(a: &[Real], m: usize, n: usize, method: QrMethod) -> Result<Self, LinalgError> {
        assert_eq!(a.len(), m * n);
        match method {
            QrMethod::GramSchmidt => Self::gram_schmidt(a, m, n),
            QrMethod::Householder => Ok(Self::householder(a, m, n)),
            QrMethod::Givens => Ok(Self::givens(a, m, n)),
        }
    }

    /// Factor the transpose of `a` (an m x n buffer) instead of `a`.
    pub fn new_transposed(
        a: &[Real],
        m: usize,
        n: usize,
        method: QrMethod,
    ) -> Result<Self, LinalgError> {
        let at = dense::transpose(a, m, n);
        Self::new(&at, n, m, method)
    }

    /// Shape of Q.
    pub fn q_shape(&self) -> (usize, usize) {
        (self.m, self.q_cols)
    }

    /// Shape of R.
    pub fn r_shape(&self) -> (usize, usize) {
        (self.q_cols, self.n)
    }

    fn gram_schmidt(a: &[Real], m: usize, n: usize) -> Result<Self, LinalgError> {
        assert!(m >= n);
        let mut q = vec![0.0; m * n];
        let mut r = vec![0.0; n * n];

        let mut cols: Vec<Vec<Real>> = (0..n)
            .map(|j| (0..m).map(|i| dense::get(a, m, n, i, j)).collect())
            .collect();

        for j in 0..n {
            for i in 0..j {
                let q_col: Vec<Real> = (0..m).map(|k| dense::get(&q, m, n, k, i)).collect();
                let rij = dense::dot(&q_col, &cols[j]);
                dense::set(&mut r, n, n, i, j, rij);
                for k in 0..m {
                    cols[j][k] -= rij * q_col[k];
                }
            }
            let norm = dense::norm2(&cols[j]);
            if norm < 1e-14 {
                return Err(LinalgError::SingularMatrix { row: j });
            }
            dense::set(&mut r, n, n, j, j, norm);
            for k in 0..m {
                dense::set(&mut q, m, n, k, j, cols[j][k] / norm);
            }
        }

        Ok(Self { q, r, m, n, q_cols: n })
    }

    fn householder(a: &[Real], m: usize, n: usize) -> Self {
        let mut r = a.to_vec();
        let mut q = dense::identity(m);

        for k in 0..n.min(m.saturating_sub(1)) {
            let mut normx = 0.0;
            for i in k..m {
                let v = dense::get(&r, m, n, i, k);
                normx += v * v;
            }
            let normx = normx.sqrt();
            if normx < TINY {
                continue;
            }

            let rkk = dense::get(&r, m, n, k, k);
            let alpha = if rkk >= 0.0 { -normx } else { normx };
            let mut v = vec![0.0; m];
            for i in k..m {
                v[i] = dense::get(&r, m, n, i, k);
            }
            v[k] -= alpha;
            let vtv = dense::dot(&v, &v);
            if vtv < TINY {
                continue;
            }
            let beta = 2.0 / vtv;

            // R <- (I - beta v v') R
            for j in k..n {
                let mut s = 0.0;
                for i in k..m {
                    s += v[i] * dense::get(&r, m, n, i, j);
                }
                let bs = beta * s;
                for i in k..m {
                    let val = dense::get(&r, m, n, i, j) - bs * v[i];
                    dense::set(&mut r, m, n, i, j, val);
                }
            }
            // Q <- Q (I - beta v v')
            for i in 0..m {
                let mut s = 0.0;
                for l in k..m {
                    s += dense::get(&q, m, m, i, l) * v[l];
                }
                let bs = beta * s;
                for l in k..m {
                    let val = dense::get(&q, m, m, i, l) - bs * v[l];
                    dense::set(&mut q, m, m, i, l, val);
                }
            }
        }

        Self { q, r, m, n, q_cols: m }
    }

    fn givens(a: &[Real], m: usize, n: usize) -> Self {
        let mut r = a.to_vec();
        let mut qt = dense::identity(m);

        for j in 0..n {
            for i in (j + 1)..m {
                let rij = dense::get(&r, m, n, i, j);
                if rij == 0.0 {
                    continue;
                }
                let (c, s) = givens_coeffs(dense::get(&r, m, n, j, j), rij);
                for col in 0..n {
                    let rj = dense::get(&r, m, n, j, col);
                    let ri = dense::get(&r, m, n, i, col);
                    dense::set(&mut r, m, n, j, col, c * rj + s * ri);
                    dense::set(&mut r, m, n, i, col, -s * rj + c * ri);
                }
                dense::set(&mut r, m, n, i, j, 0.0);
                for col in 0..m {
                    let qj = dense::get(&qt, m, m, j, col);
                    let qi = dense::get(&qt, m, m, i, col);
                    dense::set(&mut qt, m, m, j, col, c * qj + s * qi);
                    dense::set(&mut qt, m, m, i, col, -s * qj + c * qi);
                }
            }
        }

        let q = dense::transpose(&qt, m, m);
        Self { q, r, m, n, q_cols: m }
    }

    /// Solve R * x = Q' * b (exact for square systems, least squares
    /// otherwise).
    pub fn solve(&self, b: &[Real]) -> Vec<Real> {
        assert_eq!(b.len(), self.m);
        let qtb = dense::mat_vec_t(&self.q, self.m, self.q_cols, b);

        let (rm, rn) = self.r_shape();
        let mut x = vec![0.0; rn];
        for i in (0..rn).rev() {
            let mut sum = qtb[i];
            for j in (i + 1)..rn {
                sum -= dense::get(&self.r, rm, rn, i, j) * x[j];
            }
            x[i] = sum / dense::get(&self.r, rm, rn, i, i);
        }
        x
    }

    /// Substitution plus iterative refinement (square systems).
    pub fn solve_refined(
        &self,
        a: &[Real],
        b: &[Real],
        x0: Option<&[Real]>,
        max_iter: usize,
        tol: Real,
    ) -> Vec<Real> {
        assert_eq!(self.m, self.n);
        refine_dense(a, self.n, b, x0, max_iter, tol, |rhs| self.solve(rhs))
    }
}

/// Sparse QR via Givens rotations.
pub struct SparseQr {
    pub q: SparseMatrix,
    pub r: SparseMatrix,
    m: usize,
    n: usize,
}

impl SparseQr {
    pub fn new(a: &SparseMatrix, m: usize, n: usize) -> Self {
        let mut r = a.clone();
        let mut qt = SparseMatrix::identity(m);

        for j in 0..n.min(m) {
            for i in (j + 1)..m {
                let rij = r.get(i, j);
                if rij == 0.0 {
                    continue;
                }
                let (c, s) = givens_coeffs(r.get(j, j), rij);

                let row_j = r.row(j).cloned().unwrap_or_default();
                let row_i = r.row(i).cloned().unwrap_or_default();
                let new_j = SparseVector::scaled_sum(&row_j, c, &row_i, s);
                let mut new_i = SparseVector::scaled_sum(&row_j, -s, &row_i, c);
                // explicit hole at the entry this rotation zeroed
                new_i.insert(j, 0.0);
                r.set_row(j, new_j);
                r.set_row(i, new_i);

                let qt_j = qt.row(j).cloned().unwrap_or_default();
                let qt_i = qt.row(i).cloned().unwrap_or_default();
                qt.set_row(j, SparseVector::scaled_sum(&qt_j, c, &qt_i, s));
                qt.set_row(i, SparseVector::scaled_sum(&qt_j, -s, &qt_i, c));
            }
        }

        // drop the structural zeros the rotation sequence left behind
        r.clean();
        qt.clean();

        Self {
            q: qt.transpose(),
            r,
            m,
            n,
        }
    }

    /// Solve R * x = Q' * b for a square system.
    pub fn solve(&self, b: &[Real]) -> Vec<Real> {
        assert_eq!(self.m, self.n);
        assert_eq!(b.len(), self.m);
        let qtb = self.q.transpose().mat_vec(b, self.m);
        sparse_back_substitute(&self.r, &qtb, false)
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

#[cfg(test)]
mod tests {
    use super::*;

    fn build(rows: &[&[Real]]) -> (Vec<Real>, usize, usize) {
        let m = rows.len();
        let n = rows[0].len();
        let mut a = vec![0.0; m * n];
        for i in 0..m {
            for j in 0..n {
                dense::set(&mut a, m, n, i, j, rows[i][j]);
            }
        }
        (a, m, n)
    }

    fn check_round_trip(a: &[Real], m: usize, n: usize, method: QrMethod, eps: Real) {
        let qr = QrDecomp::new(a, m, n, method).unwrap();
        let (qm, qn) = qr.q_shape();
        let (rm, rn) = qr.r_shape();

        // Q'Q = I
        let qtq = dense::mat_mul(&dense::transpose(&qr.q, qm, qn), &qr.q, qn, qm, qn);
        for i in 0..qn {
            for j in 0..qn {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!(
                    (dense::get(&qtq, qn, qn, i, j) - expected).abs() < eps,
                    "{:?}: Q'Q[{},{}] = {}",
                    method,
                    i,
                    j,
                    dense::get(&qtq, qn, qn, i, j)
                );
            }
        }

        // Q R = A
        let prod = dense::mat_mul(&qr.q, &qr.r, qm, qn, rn);
        assert_eq!(rm, qn);
        for i in 0..m {
            for j in 0..n {
                assert!(
                    (dense::get(&prod, m, n, i, j) - dense::get(a, m, n, i, j)).abs() < eps,
                    "{:?}: QR[{},{}] = {} vs {}",
                    method,
                    i,
                    j,
                    dense::get(&prod, m, n, i, j),
                    dense::get(a, m, n, i, j)
                );
            }
        }
    }

    #[test]
    fn test_round_trip_all_methods() {
        let (a, m, n) = build(&[
            &[2.0, -1.0, 3.0],
            &[4.0, 1.0, 0.0],
            &[-2.0, 5.0, 1.0],
            &[1.0, 2.0, 2.0],
        ]);
        check_round_trip(&a, m, n, QrMethod::GramSchmidt, 1e-8);
        check_round_trip(&a, m, n, QrMethod::Householder, 1e-10);
        check_round_trip(&a, m, n, QrMethod::Givens, 1e-10);
    }

    #[test]
    fn test_qr_solve_square() {
        let (a, m, n) = build(&[&[2.0, 1.0], &[1.0, 3.0]]);
        let b = vec![3.0, 5.0];
        for method in [QrMethod::GramSchmidt, QrMethod::Householder, QrMethod::Givens] {
            let qr = QrDecomp::new(&a, m, n, method).unwrap();
            let x = qr.solve(&b);
            let ax = dense::mat_vec(&a, m, n, &x);
            for i in 0..m {
                assert!((ax[i] - b[i]).abs() < 1e-10, "{:?}", method);
            }
        }
    }

    #[test]
    fn test_qr_least_squares() {
        // overdetermined: minimize ||Ax - b|| satisfies A'Ax = A'b
        let (a, m, n) = build(&[&[1.0, 1.0], &[1.0, 2.0], &[1.0, 3.0]]);
        let b = vec![1.0, 2.0, 2.0];
        let qr = QrDecomp::new(&a, m, n, QrMethod::Householder).unwrap();
        let x = qr.solve(&b);
        let ata = dense::mat_mul(&dense::transpose(&a, m, n), &a, n, m, n);
        let atb = dense::mat_vec_t(&a, m, n, &b);
        let atax = dense::mat_vec(&ata, n, n, &x);
        for i in 0..n {
            assert!((atax[i] - atb[i]).abs() < 1e-10);
        }
    }

    #[test]
    fn test_new_transposed() {
        let (a, m, n) = build(&[&[1.0, 2.0, 3.0], &[4.0, 5.0, 6.0]]);
        let qr = QrDecomp::new_transposed(&a, m, n, QrMethod::Householder).unwrap();
        let (qm, qn) = qr.q_shape();
        let (_, rn) = qr.r_shape();
        let prod = dense::mat_mul(&qr.q, &qr.r, qm, qn, rn);
        let at = dense::transpose(&a, m, n);
        for k in 0..at.len() {
            assert!((prod[k] - at[k]).abs() < 1e-10);
        }
    }

    #[test]
    fn test_givens_fallback_identity() {
        let (c, s) = givens_coeffs(0.0, 0.0);
        assert_eq!((c, s), (1.0, 0.0));
    }

    #[test]
    fn test_sparse_qr_round_trip() {
        let a = SparseMatrix::from_triplets(
            &[0, 0, 1, 1, 2, 2],
            &[0, 2, 0, 1, 1, 2],
            &[2.0, 1.0, -1.0, 3.0, 4.0, 1.0],
        );
        let qr = SparseQr::new(&a, 3, 3);

        // Q R = A
        let prod = qr.q.mat_mul(&qr.r);
        for i in 0..3 {
            for j in 0..3 {
                assert!(
                    (prod.get(i, j) - a.get(i, j)).abs() < 1e-10,
                    "QR[{},{}] = {} vs {}",
                    i,
                    j,
                    prod.get(i, j),
                    a.get(i, j)
                );
            }
        }
        // Q'Q = I
        let qtq = qr.q.transpose().mat_mul(&qr.q);
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((qtq.get(i, j) - expected).abs() < 1e-10);
            }
        }
        // rotations left no stored zeros behind
        let mut cleaned = qr.r.clone();
        cleaned.clean();
        assert_eq!(cleaned.nnz(), qr.r.nnz());
    }

    #[test]
    fn test_sparse_qr_solve() {
        let a = SparseMatrix::from_triplets(
            &[0, 0, 1, 1, 2, 2],
            &[0, 2, 0, 1, 1, 2],
            &[2.0, 1.0, -1.0, 3.0, 4.0, 1.0],
        );
        let b = vec![3.0, 2.0, 5.0];
        let qr = SparseQr::new(&a, 3, 3);
        let x = qr.solve(&b);
        let ax = a.mat_vec(&x, 3);
        for i in 0..3 {
            assert!((ax[i] - b[i]).abs() < 1e-10, "ax[{}]={}", i, ax[i]);
        }
    }
}
