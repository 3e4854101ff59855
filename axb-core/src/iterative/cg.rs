#![allow(clippy::needless_range_loop)]
//! Conjugate Gradient for symmetric positive definite systems.
//!
//! Optionally preconditioned: with a preconditioner P the direction is
//! formed from z = P^{-1} r each iteration; without one, z = r.
//! Symmetry and positive definiteness are the caller's contract.

use axb_linalg::scalar::TINY;
use axb_linalg::{dense, Real, SparseMatrix};
use tracing::{debug, warn};

use crate::iterative::{scaled_tolerance, SolveReport};
use crate::precond::Preconditioner;

/// Conjugate Gradient solver.
pub struct CgSolver {
    /// Convergence tolerance, scaled against ||b||.
    pub tol: Real,
    /// Maximum number of iterations.
    pub max_iter: usize,
}

impl Default for CgSolver {
    fn default() -> Self {
        Self {
            tol: 1e-10,
            max_iter: 500,
        }
    }
}

impl CgSolver {
    pub fn new(tol: Real, max_iter: usize) -> Self {
        Self { tol, max_iter }
    }

    /// Solve A * x = b with A supplied as a matrix-vector closure.
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

        let ax = mat_vec(&x);
        let mut r: Vec<Real> = b.iter().zip(ax.iter()).map(|(bi, ai)| bi - ai).collect();

        let tol_abs = scaled_tolerance(self.tol, dense::norm2(b));

        // Early exit: the initial guess may already be good enough.
        let r_norm = dense::norm2(&r);
        if r_norm < tol_abs {
            return SolveReport {
                x,
                iterations: 0,
                residual: r_norm,
                converged: true,
            };
        }

        let mut z = match precond {
            Some(p) => p.apply(&r),
            None => r.clone(),
        };
        let mut p_dir = z.clone();
        let mut rz = dense::dot(&r, &z);

        for iter in 0..self.max_iter {
            let r_norm = dense::norm2(&r);
            if r_norm < tol_abs {
                debug!(iterations = iter, residual = r_norm, "cg converged");
                return SolveReport {
                    x,
                    iterations: iter,
                    residual: r_norm,
                    converged: true,
                };
            }

            let ap = mat_vec(&p_dir);
            let pap = dense::dot(&p_dir, &ap);
            if pap.abs() < TINY {
                warn!(iterations = iter, residual = r_norm, "cg breakdown: p'Ap vanished");
                return SolveReport {
                    x,
                    iterations: iter,
                    residual: r_norm,
                    converged: false,
                };
            }
            let alpha = rz / pap;

            for i in 0..n {
                x[i] += alpha * p_dir[i];
            }
            for i in 0..n {
                r[i] -= alpha * ap[i];
            }

            z = match precond {
                Some(p) => p.apply(&r),
                None => r.clone(),
            };
            let rz_new = dense::dot(&r, &z);
            let beta = rz_new / rz;
            rz = rz_new;

            for i in 0..n {
                p_dir[i] = z[i] + beta * p_dir[i];
            }
        }

        let r_norm = dense::norm2(&r);
        let converged = r_norm < tol_abs;
        if !converged {
            warn!(
                max_iter = self.max_iter,
                residual = r_norm,
                "cg hit the iteration cap without converging"
            );
        }
        SolveReport {
            x,
            iterations: self.max_iter,
            residual: r_norm,
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
