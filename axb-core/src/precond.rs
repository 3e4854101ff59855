#![allow(clippy::needless_range_loop)]
//! Preconditioners for the iterative solvers (sparse only).
//!
//! Each preconditioner is derived once from the system matrix and
//! reused across solves. The solvers never match on the concrete kind:
//! everything goes through the single `apply` dispatch, which solves
//! P * z = r for the approximation P the preconditioner embodies.

use axb_linalg::scalar::TINY;
use axb_linalg::{Real, SparseMatrix};

use crate::decompose::{sparse_back_substitute, sparse_forward_substitute};
use crate::error::LinalgError;

/// Which preconditioner algorithm to derive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrecondKind {
    /// Reciprocal diagonal.
    Jacobi,
    /// Zero fill-in incomplete Cholesky (SPD matrices).
    IncompleteCholesky,
    /// Zero fill-in incomplete LU.
    Ilu0,
}

/// A preconditioner derived from a sparse system matrix.
pub enum Preconditioner {
    Jacobi { inv_diag: Vec<Real> },
    IncompleteCholesky { l: SparseMatrix, lt: SparseMatrix },
    Ilu0 { l: SparseMatrix, u: SparseMatrix },
}

impl Preconditioner {
    /// Derive a preconditioner of the given kind from `a` (n x n).
    pub fn build(a: &SparseMatrix, kind: PrecondKind, n: usize) -> Result<Self, LinalgError> {
        match kind {
            PrecondKind::Jacobi => Ok(Self::jacobi(a, n)),
            PrecondKind::IncompleteCholesky => Self::incomplete_cholesky(a, n),
            PrecondKind::Ilu0 => Self::ilu0(a, n),
        }
    }

    fn jacobi(a: &SparseMatrix, n: usize) -> Self {
        let inv_diag = a
            .diag(n)
            .into_iter()
            .map(|d| if d.abs() > TINY { 1.0 / d } else { 1.0 })
            .collect();
        Self::Jacobi { inv_diag }
    }

    /// Incomplete Cholesky: the standard decomposition with fill-in
    /// restricted to positions already non-zero in `a`.
    fn incomplete_cholesky(a: &SparseMatrix, n: usize) -> Result<Self, LinalgError> {
        let at = a.transpose();
        let mut l = SparseMatrix::new();

        for j in 0..n {
            let lj = l.row(j).cloned().unwrap_or_default();
            let pivot = a.get(j, j) - lj.dot(&lj);
            if pivot <= 0.0 {
                return Err(LinalgError::NotPositiveDefinite { row: j, pivot });
            }
            let ljj = pivot.sqrt();
            l.insert(j, j, ljj);

            // column j of a = row j of its transpose: the sparsity
            // pattern the factor is allowed to touch
            if let Some(col_j) = at.row(j) {
                for (i, aij) in col_j.iter() {
                    if i <= j || aij == 0.0 {
                        continue;
                    }
                    let li = l.row(i).cloned().unwrap_or_default();
                    let s = aij - li.dot(&lj);
                    l.insert(i, j, s / ljj);
                }
            }
        }

        let lt = l.transpose();
        Ok(Self::IncompleteCholesky { l, lt })
    }

    /// ILU(0): Doolittle elimination updating only positions already
    /// non-zero in `a`.
    fn ilu0(a: &SparseMatrix, n: usize) -> Result<Self, LinalgError> {
        let mut m = a.clone();

        for i in 1..n {
            let sub_cols: Vec<usize> = match m.row(i) {
                Some(row) => row.iter().filter(|&(j, _)| j < i).map(|(j, _)| j).collect(),
                None => continue,
            };
            for k in sub_cols {
                let akk = m.get(k, k);
                if akk.abs() < TINY {
                    return Err(LinalgError::SingularMatrix { row: k });
                }
                let factor = m.get(i, k) / akk;
                m.insert(i, k, factor);
                if factor == 0.0 {
                    continue;
                }
                let upper_k: Vec<(usize, Real)> = m
                    .row(k)
                    .map(|row| row.iter().filter(|&(j, _)| j > k).collect())
                    .unwrap_or_default();
                for (j, ukj) in upper_k {
                    let existing = m.get(i, j);
                    // zero fill-in: only touch stored positions
                    if existing != 0.0 {
                        m.insert(i, j, existing - factor * ukj);
                    }
                }
            }
        }

        let mut l = SparseMatrix::identity(n);
        let mut u = SparseMatrix::new();
        for (i, row) in m.iter_rows() {
            for (j, v) in row.iter() {
                if j < i {
                    l.insert(i, j, v);
                } else {
                    u.insert(i, j, v);
                }
            }
        }
        Ok(Self::Ilu0 { l, u })
    }

    /// Solve P * z = r.
    pub fn apply(&self, r: &[Real]) -> Vec<Real> {
        match self {
            Self::Jacobi { inv_diag } => {
                assert_eq!(r.len(), inv_diag.len());
                r.iter().zip(inv_diag.iter()).map(|(ri, di)| ri * di).collect()
            }
            Self::IncompleteCholesky { l, lt } => {
                // both factors: z = (L L^t)^-1 r keeps the operator SPD
                let y = sparse_forward_substitute(l, r, false);
                sparse_back_substitute(lt, &y, false)
            }
            Self::Ilu0 { l, u } => {
                let y = sparse_forward_substitute(l, r, false);
                sparse_back_substitute(u, &y, false)
            }
        }
    }
}
