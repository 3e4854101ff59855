#![allow(clippy::needless_range_loop)]
//! Restarted GMRES for general (non-symmetric) systems.
//!
//! Builds an orthonormal Krylov basis with modified Gram-Schmidt up to
//! the restart interval, reduces the upper-Hessenberg matrix to
//! triangular form with incremental Givens rotations, solves the small
//! least-squares system by back-substitution, and restarts from the
//! updated iterate. Right-preconditioned: the correction is assembled
//! from the preconditioned basis vectors.

use axb_linalg::{dense, Real, SparseMatrix};
use tracing::{debug, warn};

use crate::decompose::qr::givens_coeffs;
use crate::iterative::{scaled_tolerance, SolveReport};
use crate::precond::Preconditioner;

/// Restarted GMRES solver.
pub struct GmresSolver {
    /// Convergence tolerance, scaled against ||b||.
    pub tol: Real,
    /// Total iteration cap across restarts.
    pub max_iter: usize,
    /// Krylov basis size before restarting.
    pub restart: usize,
}

impl Default for GmresSolver {
    fn default() -> Self {
        Self {
            tol: 1e-10,
            max_iter: 500,
            restart: 30,
        }
    }
}

impl GmresSolver {
    pub fn new(tol: Real, max_iter: usize, restart: usize) -> Self {
        assert!(restart > 0);
        Self {
            tol,
            max_iter,
            restart,
        }
    }

    /// Solve A * x = b with A supplied as a matrix-vector closure.
    ///
    /// Failing to converge is recoverable: the best current iterate is
    /// still returned, with `converged: false` and a warning.
    pub fn solve<F>(
        &self,
        mat_vec: F,
        precond: Option<&Preconditioner>,
        b: &[Real],
        x0: Option<&[Real]>,
    ) -> SolveReport
    where
        F: Fn(&[Real]) -> Vec<Real>,
    {
        let n = b.len();
        let mut x: Vec<Real> = match x0 {
            Some(v) => v.to_vec(),
            None => vec![0.0; n],
        };

        let b_norm = dense::norm2(b);
        let tol_abs = scaled_tolerance(self.tol, b_norm);
        let m = self.restart;
        let mut total_iterations = 0;

        for _cycle in 0..(self.max_iter / m + 1) {
            let ax = mat_vec(&x);
            let r: Vec<Real> = b.iter().zip(ax.iter()).map(|(bi, ai)| bi - ai).collect();
            let beta = dense::norm2(&r);

            // Early exit covers both the initial guess and each restart.
            if beta < tol_abs {
                return SolveReport {
                    x,
                    iterations: total_iterations,
                    residual: beta,
                    converged: true,
                };
            }

            let v0: Vec<Real> = r.iter().map(|ri| ri / beta).collect();
            let mut basis: Vec<Vec<Real>> = vec![v0];
            // Preconditioned basis vectors, kept for the solution update.
            let mut z_basis: Vec<Vec<Real>> = Vec::with_capacity(m);
            // Hessenberg columns after the rotations applied so far.
            let mut h: Vec<Vec<Real>> = Vec::with_capacity(m);
            let mut cs: Vec<Real> = Vec::with_capacity(m);
            let mut sn: Vec<Real> = Vec::with_capacity(m);
            let mut g: Vec<Real> = vec![beta];

            let mut j = 0;
            while j < m && total_iterations < self.max_iter {
                total_iterations += 1;

                let z = match precond {
                    Some(p) => p.apply(&basis[j]),
                    None => basis[j].clone(),
                };
                let mut w = mat_vec(&z);
                z_basis.push(z);

                // Modified Gram-Schmidt against the basis so far.
                let mut h_col: Vec<Real> = Vec::with_capacity(j + 2);
                for i in 0..=j {
                    let hij = dense::dot(&w, &basis[i]);
                    h_col.push(hij);
                    for k in 0..n {
                        w[k] -= hij * basis[i][k];
                    }
                }
                let h_next = dense::norm2(&w);
                h_col.push(h_next);

                // Previous rotations, then a new one zeroing the
                // sub-diagonal entry.
                for i in 0..j {
                    let tmp = cs[i] * h_col[i] + sn[i] * h_col[i + 1];
                    h_col[i + 1] = -sn[i] * h_col[i] + cs[i] * h_col[i + 1];
                    h_col[i] = tmp;
                }
                let (c, s) = givens_coeffs(h_col[j], h_col[j + 1]);
                h_col[j] = c * h_col[j] + s * h_col[j + 1];
                h_col[j + 1] = 0.0;
                cs.push(c);
                sn.push(s);

                let g_j = g[j];
                g.push(-s * g_j);
                g[j] = c * g_j;
                h.push(h_col);

                let res_norm = g[j + 1].abs();
                let lucky_breakdown = h_next < 1e-14;
                if res_norm < tol_abs || lucky_breakdown {
                    let y = solve_triangular(&h, &g[..=j]);
                    accumulate(&mut x, &z_basis, &y);
                    debug!(
                        iterations = total_iterations,
                        residual = res_norm,
                        "gmres converged"
                    );
                    return SolveReport {
                        x,
                        iterations: total_iterations,
                        residual: res_norm,
                        converged: true,
                    };
                }

                basis.push(w.iter().map(|wi| wi / h_next).collect());
                j += 1;
            }

            if !h.is_empty() {
                let y = solve_triangular(&h, &g[..j]);
                accumulate(&mut x, &z_basis, &y);
            }

            if total_iterations >= self.max_iter {
                break;
            }
        }

        let ax = mat_vec(&x);
        let r: Vec<Real> = b.iter().zip(ax.iter()).map(|(bi, ai)| bi - ai).collect();
        let residual = dense::norm2(&r);
        let converged = residual < tol_abs;
        if !converged {
            warn!(
                max_iter = self.max_iter,
                residual,
                "gmres hit the iteration cap; returning the best iterate"
            );
        }
        SolveReport {
            x,
            iterations: total_iterations,
            residual,
            converged,
        }
    }

    /// Solve with a dense square matrix.
    pub fn solve_dense(
        &self,
        a: &[Real],
        n: usize,
        b: &[Real],
        x0: Option<&[Real]>,
        precond: Option<&Preconditioner>,
    ) -> SolveReport {
        assert_eq!(a.len(), n * n);
        assert_eq!(b.len(), n);
        self.solve(|v| dense::mat_vec(a, n, n, v), precond, b, x0)
    }

    /// Solve with a sparse matrix.
    pub fn solve_sparse(
        &self,
        a: &SparseMatrix,
        b: &[Real],
        x0: Option<&[Real]>,
        precond: Option<&Preconditioner>,
    ) -> SolveReport {
        let n = b.len();
        self.solve(|v| a.mat_vec(v, n), precond, b, x0)
    }
}

/// Back-substitution on the rotated Hessenberg columns.
fn solve_triangular(h: &[Vec<Real>], g: &[Real]) -> Vec<Real> {
    let m = g.len();
    let mut y = vec![0.0; m];
    for i in (0..m).rev() {
        let mut sum = g[i];
        for j in (i + 1)..m {
            sum -= h[j][i] * y[j];
        }
        if h[i][i].abs() > 1e-15 {
            y[i] = sum / h[i][i];
        }
    }
    y
}

/// x += Z * y over the stored preconditioned basis.
fn accumulate(x: &mut [Real], z_basis: &[Vec<Real>], y: &[Real]) {
    for (zj, &yj) in z_basis.iter().zip(y.iter()) {
        if yj == 0.0 {
            continue;
        }
        for k in 0..x.len() {
            x[k] += yj * zj[k];
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precond::PrecondKind;

    fn dense_from_rows(rows: &[&[Real]]) -> (Vec<Real>, usize) {
        let n = rows.len();
        let mut a = vec![0.0; n * n];
        for i in 0..n {
            for j in 0..n {
                dense::set(&mut a, n, n, i, j, rows[i][j]);
            }
        }
        (a, n)
    }

    #[test]
    fn test_gmres_nonsymmetric() {
        let (a, n) = dense_from_rows(&[
            &[3.0, 1.0, 0.0],
            &[-1.0, 4.0, 2.0],
            &[0.0, 1.0, 5.0],
        ]);
        let b = vec![1.0, 2.0, 3.0];
        let result = GmresSolver::new(1e-12, 200, 10).solve_dense(&a, n, &b, None, None);
        assert!(result.converged, "residual {}", result.residual);
        let ax = dense::mat_vec(&a, n, n, &result.x);
        for i in 0..n {
            assert!((ax[i] - b[i]).abs() < 1e-8);
        }
    }

    #[test]
    fn test_gmres_restart_path() {
        // restart interval far below n forces the outer loop to cycle
        let n = 8;
        let mut a = vec![0.0; n * n];
        for i in 0..n {
            dense::set(&mut a, n, n, i, i, (i + 2) as Real);
            if i + 1 < n {
                dense::set(&mut a, n, n, i, i + 1, 1.0);
            }
        }
        let b = vec![1.0; n];
        let result = GmresSolver::new(1e-12, 500, 3).solve_dense(&a, n, &b, None, None);
        assert!(result.converged);
        let ax = dense::mat_vec(&a, n, n, &result.x);
        for i in 0..n {
            assert!((ax[i] - b[i]).abs() < 1e-8);
        }
    }

    #[test]
    fn test_gmres_early_exit() {
        let a = dense::identity(3);
        let b = vec![2.0, 2.0, 2.0];
        let result =
            GmresSolver::default().solve_dense(&a, 3, &b, Some(&[2.0, 2.0, 2.0]), None);
        assert!(result.converged);
        assert_eq!(result.iterations, 0);
        assert_eq!(result.x, vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_gmres_cap_returns_best_iterate() {
        let (a, n) = dense_from_rows(&[
            &[3.0, 1.0, 0.0],
            &[-1.0, 4.0, 2.0],
            &[0.0, 1.0, 5.0],
        ]);
        let b = vec![1.0, 2.0, 3.0];
        let result = GmresSolver::new(1e-14, 1, 1).solve_dense(&a, n, &b, None, None);
        assert!(!result.converged);
        assert_eq!(result.x.len(), n);
        assert!(result.residual.is_finite());
    }

    #[test]
    fn test_gmres_ilu_preconditioned_sparse() {
        let a = SparseMatrix::from_triplets(
            &[0, 0, 1, 1, 1, 2, 2],
            &[0, 1, 0, 1, 2, 1, 2],
            &[4.0, -1.0, -1.0, 4.0, -1.0, -1.0, 4.0],
        );
        let b = vec![1.0, 5.0, 0.0];
        let p = Preconditioner::build(&a, PrecondKind::Ilu0, 3).unwrap();
        let result = GmresSolver::new(1e-12, 100, 10).solve_sparse(&a, &b, None, Some(&p));
        assert!(result.converged);
        let ax = a.mat_vec(&result.x, 3);
        for i in 0..3 {
            assert!((ax[i] - b[i]).abs() < 1e-8);
        }
    }
}
