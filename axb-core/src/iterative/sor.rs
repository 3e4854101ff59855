#![allow(clippy::needless_range_loop)]
//! Successive Over-Relaxation.
//!
//! Each sweep recomputes every unknown from the others' most recent
//! values (Gauss-Seidel ordering within the sweep), blended by the
//! relaxation parameter omega. Convergence depends on the matrix class
//! and the chosen omega; no convergence-class check is performed —
//! callers pick omega and the caps.

use axb_linalg::scalar::TINY;
use axb_linalg::{dense, Real, SparseMatrix};
use tracing::{debug, warn};

use crate::iterative::{scaled_tolerance, SolveReport};

/// Successive Over-Relaxation solver.
pub struct SorSolver {
    /// Relaxation parameter; 1.0 degenerates to Gauss-Seidel.
    pub omega: Real,
    /// Convergence tolerance, scaled against ||b||.
    pub tol: Real,
    /// Maximum number of sweeps.
    pub max_iter: usize,
}

impl Default for SorSolver {
    fn default() -> Self {
        Self {
            omega: 1.0,
            tol: 1e-10,
            max_iter: 1000,
        }
    }
}

impl SorSolver {
    pub fn new(omega: Real, tol: Real, max_iter: usize) -> Self {
        Self {
            omega,
            tol,
            max_iter,
        }
    }

    /// Solve with a dense square matrix.
    pub fn solve_dense(
        &self,
        a: &[Real],
        n: usize,
        b: &[Real],
        x0: Option<&[Real]>,
    ) -> SolveReport {
        assert_eq!(a.len(), n * n);
        assert_eq!(b.len(), n);

        let mut x: Vec<Real> = match x0 {
            Some(v) => v.to_vec(),
            None => vec![0.0; n],
        };
        let tol_abs = scaled_tolerance(self.tol, dense::norm2(b));

        let residual_norm = |x: &[Real]| dense::norm2(&dense::residual(a, n, x, b));

        let r_norm = residual_norm(&x);
        if r_norm < tol_abs {
            return SolveReport {
                x,
                iterations: 0,
                residual: r_norm,
                converged: true,
            };
        }

        for sweep in 1..=self.max_iter {
            for i in 0..n {
                let aii = dense::get(a, n, n, i, i);
                if aii.abs() < TINY {
                    continue;
                }
                let mut sigma = 0.0;
                for j in 0..n {
                    if j != i {
                        sigma += dense::get(a, n, n, i, j) * x[j];
                    }
                }
                x[i] = (1.0 - self.omega) * x[i] + self.omega * (b[i] - sigma) / aii;
            }

            let r_norm = residual_norm(&x);
            if r_norm < tol_abs {
                debug!(sweeps = sweep, residual = r_norm, "sor converged");
                return SolveReport {
                    x,
                    iterations: sweep,
                    residual: r_norm,
                    converged: true,
                };
            }
        }

        let r_norm = residual_norm(&x);
        warn!(
            max_iter = self.max_iter,
            residual = r_norm,
            "sor hit the sweep cap without converging"
        );
        SolveReport {
            x,
            iterations: self.max_iter,
            residual: r_norm,
            converged: false,
        }
    }

    /// Solve with a sparse matrix; unknowns whose row is absent keep
    /// their current value.
    pub fn solve_sparse(&self, a: &SparseMatrix, b: &[Real], x0: Option<&[Real]>) -> SolveReport {
        let n = b.len();
        let mut x: Vec<Real> = match x0 {
            Some(v) => v.to_vec(),
            None => vec![0.0; n],
        };
        let tol_abs = scaled_tolerance(self.tol, dense::norm2(b));

        let residual_norm = |x: &[Real]| {
            let ax = a.mat_vec(x, n);
            dense::norm2(
                &b.iter()
                    .zip(ax.iter())
                    .map(|(bi, ai)| bi - ai)
                    .collect::<Vec<Real>>(),
            )
        };

        let r_norm = residual_norm(&x);
        if r_norm < tol_abs {
            return SolveReport {
                x,
                iterations: 0,
                residual: r_norm,
                converged: true,
            };
        }

        for sweep in 1..=self.max_iter {
            for i in 0..n {
                let Some(row) = a.row(i) else { continue };
                let aii = row.get(i);
                if aii.abs() < TINY {
                    continue;
                }
                let mut sigma = 0.0;
                for (j, v) in row.iter() {
                    if j != i {
                        sigma += v * x[j];
                    }
                }
                x[i] = (1.0 - self.omega) * x[i] + self.omega * (b[i] - sigma) / aii;
            }

            let r_norm = residual_norm(&x);
            if r_norm < tol_abs {
                debug!(sweeps = sweep, residual = r_norm, "sor converged");
                return SolveReport {
                    x,
                    iterations: sweep,
                    residual: r_norm,
                    converged: true,
                };
            }
        }

        let r_norm = residual_norm(&x);
        warn!(
            max_iter = self.max_iter,
            residual = r_norm,
            "sor hit the sweep cap without converging"
        );
        SolveReport {
            x,
            iterations: self.max_iter,
            residual: r_norm,
            converged: false,
        }
    }
}
