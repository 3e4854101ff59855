#![allow(clippy::needless_range_loop)]
//! Singular value decomposition and SVD-based least squares.
//!
//! The workhorse is a one-sided (Hestenes) Jacobi SVD that orthogonalizes
//! the columns of the input through plane rotations; it exists for both
//! representations. A slower alternating QR/LQ iteration is kept as a
//! dense-only cross-check. Negligible singular values are dropped, so a
//! rank-deficient input yields fewer triples than `min(m, n)`.

use tracing::warn;

use axb_linalg::scalar::TINY;
use axb_linalg::{dense, Real, SparseMatrix, SparseVector};

use crate::decompose::qr::{QrDecomp, QrMethod};

/// One (singular value, left vector, right vector) triple.
///
/// `axis` is the column index of the working matrix the triple came
/// from, before sorting by descending singular value.
#[derive(Debug, Clone)]
pub struct SvdTriple {
    pub sigma: Real,
    pub u: Vec<Real>,
    pub v: Vec<Real>,
    pub axis: usize,
}

/// Sparse counterpart of [`SvdTriple`].
#[derive(Debug, Clone)]
pub struct SparseSvdTriple {
    pub sigma: Real,
    pub u: SparseVector,
    pub v: SparseVector,
    pub axis: usize,
}

/// Jacobi rotation coefficients (c, s) orthogonalizing a column pair
/// with squared norms `alpha`, `beta` and inner product `gamma`.
fn jacobi_coeffs(alpha: Real, beta: Real, gamma: Real) -> (Real, Real) {
    let zeta = (beta - alpha) / (2.0 * gamma);
    let t = zeta.signum() / (zeta.abs() + (1.0 + zeta * zeta).sqrt());
    let c = 1.0 / (1.0 + t * t).sqrt();
    (c, c * t)
}

fn sort_descending<T, F: Fn(&T) -> Real>(triples: &mut [T], sigma: F) {
    triples.sort_unstable_by(|a, b| {
        sigma(b)
            .partial_cmp(&sigma(a))
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}

/// One-sided Jacobi SVD of a dense `m x n` matrix.
///
/// The input is pre-scaled by the reciprocal of its largest-magnitude
/// entry and the scale multiplied back into the recovered singular
/// values. Returns at most `min(m, n)` triples in descending order;
/// columns whose scaled norm falls below `eps` are dropped, so the
/// number of triples is the numerical rank.
pub fn jacobi_svd(a: &[Real], m: usize, n: usize, eps: Real, itermax: usize) -> Vec<SvdTriple> {
    assert_eq!(a.len(), m * n);
    let amax = a.iter().fold(0.0 as Real, |acc, x| acc.max(x.abs()));
    if amax < TINY {
        return Vec::new();
    }

    // w[j] is column j of a / amax; rotations accumulate into vacc
    let mut w: Vec<Vec<Real>> = (0..n)
        .map(|j| (0..m).map(|i| dense::get(a, m, n, i, j) / amax).collect())
        .collect();
    let mut vacc: Vec<Vec<Real>> = (0..n)
        .map(|j| {
            let mut row = vec![0.0; n];
            row[j] = 1.0;
            row
        })
        .collect();

    let mut converged = false;
    for _ in 0..itermax {
        let mut rotated = false;
        for p in 0..n {
            for q in (p + 1)..n {
                let alpha = dense::dot(&w[p], &w[p]);
                let beta = dense::dot(&w[q], &w[q]);
                let gamma = dense::dot(&w[p], &w[q]);
                if gamma.abs() <= eps * (alpha * beta).sqrt().max(TINY) {
                    continue;
                }
                rotated = true;
                let (c, s) = jacobi_coeffs(alpha, beta, gamma);
                for i in 0..m {
                    let wp = w[p][i];
                    let wq = w[q][i];
                    w[p][i] = c * wp - s * wq;
                    w[q][i] = s * wp + c * wq;
                }
                for i in 0..n {
                    let vp = vacc[p][i];
                    let vq = vacc[q][i];
                    vacc[p][i] = c * vp - s * vq;
                    vacc[q][i] = s * vp + c * vq;
                }
            }
        }
        if !rotated {
            converged = true;
            break;
        }
    }
    if !converged {
        warn!(itermax, "jacobi svd hit its sweep cap before all column pairs orthogonalized");
    }

    let mut triples = Vec::new();
    for j in 0..n {
        let norm = dense::norm2(&w[j]);
        if norm <= eps {
            continue;
        }
        let u = w[j].iter().map(|x| x / norm).collect();
        triples.push(SvdTriple {
            sigma: norm * amax,
            u,
            v: std::mem::take(&mut vacc[j]),
            axis: j,
        });
    }
    sort_descending(&mut triples, |t| t.sigma);
    triples
}

/// One-sided Jacobi SVD of a sparse `m x n` matrix.
pub fn sparse_jacobi_svd(
    a: &SparseMatrix,
    m: usize,
    n: usize,
    eps: Real,
    itermax: usize,
) -> Vec<SparseSvdTriple> {
    if let Some((i, _)) = a.iter_rows().last() {
        assert!(i < m, "stored row {} outside {} x {}", i, m, n);
    }
    let amax = a
        .iter_rows()
        .flat_map(|(_, row)| row.iter())
        .fold(0.0 as Real, |acc, (_, x)| acc.max(x.abs()));
    if amax < TINY {
        return Vec::new();
    }

    let at = a.transpose();
    let mut w: Vec<SparseVector> = (0..n)
        .map(|j| {
            let mut col = at.row(j).cloned().unwrap_or_default();
            col.scale(1.0 / amax);
            col
        })
        .collect();
    let mut vacc: Vec<SparseVector> = (0..n)
        .map(|j| {
            let mut e = SparseVector::new();
            e.insert(j, 1.0);
            e
        })
        .collect();

    let mut converged = false;
    for _ in 0..itermax {
        let mut rotated = false;
        for p in 0..n {
            for q in (p + 1)..n {
                let alpha = w[p].dot(&w[p]);
                let beta = w[q].dot(&w[q]);
                let gamma = w[p].dot(&w[q]);
                if gamma.abs() <= eps * (alpha * beta).sqrt().max(TINY) {
                    continue;
                }
                rotated = true;
                let (c, s) = jacobi_coeffs(alpha, beta, gamma);
                let wp = SparseVector::scaled_sum(&w[p], c, &w[q], -s);
                let wq = SparseVector::scaled_sum(&w[p], s, &w[q], c);
                w[p] = wp;
                w[q] = wq;
                let vp = SparseVector::scaled_sum(&vacc[p], c, &vacc[q], -s);
                let vq = SparseVector::scaled_sum(&vacc[p], s, &vacc[q], c);
                vacc[p] = vp;
                vacc[q] = vq;
            }
        }
        if !rotated {
            converged = true;
            break;
        }
    }
    if !converged {
        warn!(itermax, "sparse jacobi svd hit its sweep cap before all column pairs orthogonalized");
    }

    let mut triples = Vec::new();
    for j in 0..n {
        let norm = w[j].norm2();
        if norm <= eps {
            continue;
        }
        let mut u = std::mem::take(&mut w[j]);
        u.scale(1.0 / norm);
        u.clean();
        let mut v = std::mem::take(&mut vacc[j]);
        v.clean();
        triples.push(SparseSvdTriple {
            sigma: norm * amax,
            u,
            v,
            axis: j,
        });
    }
    sort_descending(&mut triples, |t| t.sigma);
    triples
}

/// Frobenius norm of the off-diagonal part of an `m x n` buffer.
fn off_diagonal_norm(s: &[Real], m: usize, n: usize) -> Real {
    let mut sum = 0.0;
    for i in 0..m {
        for j in 0..n {
            if i != j {
                let v = dense::get(s, m, n, i, j);
                sum += v * v;
            }
        }
    }
    sum.sqrt()
}

/// SVD by alternating QR and LQ factorization (dense only).
///
/// Each pass Householder-QR-decomposes the working matrix and then its
/// transpose, accumulating the orthogonal factors into U and V; the
/// working matrix converges toward a diagonal. The first pass may move
/// mass below the diagonal and transiently raise the off-diagonal norm,
/// so an increase only stops the iteration once at least one pass has
/// completed, and the best state seen is what gets extracted.
/// Markedly slower than [`jacobi_svd`]; useful as an independent
/// cross-check.
pub fn qr_lq_svd(a: &[Real], m: usize, n: usize, eps: Real, itermax: usize) -> Vec<SvdTriple> {
    assert_eq!(a.len(), m * n);
    let amax = a.iter().fold(0.0 as Real, |acc, x| acc.max(x.abs()));
    if amax < TINY {
        return Vec::new();
    }

    let mut u = dense::identity(m);
    let mut v = dense::identity(n);
    let mut s = a.to_vec();
    let mut err = off_diagonal_norm(&s, m, n);
    let mut best_err = Real::MAX;
    let mut best: Option<(Vec<Real>, Vec<Real>, Vec<Real>)> = None;

    for pass in 0..itermax {
        if err <= eps * amax {
            break;
        }

        // Householder factorization never fails; the Err arm belongs to
        // Gram-Schmidt only.
        let Ok(qr) = QrDecomp::new(&s, m, n, QrMethod::Householder) else {
            break;
        };
        u = dense::mat_mul(&u, &qr.q, m, m, m);
        let st = dense::transpose(&qr.r, m, n);
        let Ok(lq) = QrDecomp::new(&st, n, m, QrMethod::Householder) else {
            break;
        };
        v = dense::mat_mul(&v, &lq.q, n, n, n);
        s = dense::transpose(&lq.r, n, m);

        let next_err = off_diagonal_norm(&s, m, n);
        if next_err < best_err {
            best_err = next_err;
            best = Some((u.clone(), v.clone(), s.clone()));
        }
        // the un-iterated input is never a usable state, so the first
        // pass is always taken; later increases signal stagnation
        if pass > 0 && next_err > err {
            break;
        }
        err = next_err;
    }
    if let Some((bu, bv, bs)) = best {
        u = bu;
        v = bv;
        s = bs;
    }

    let mut triples = Vec::new();
    for j in 0..m.min(n) {
        let mut sigma = dense::get(&s, m, n, j, j);
        let mut flip = 1.0;
        if sigma < 0.0 {
            sigma = -sigma;
            flip = -1.0;
        }
        if sigma <= eps * amax {
            continue;
        }
        let uj = (0..m).map(|i| flip * dense::get(&u, m, m, i, j)).collect();
        let vj = (0..n).map(|i| dense::get(&v, n, n, i, j)).collect();
        triples.push(SvdTriple {
            sigma,
            u: uj,
            v: vj,
            axis: j,
        });
    }
    sort_descending(&mut triples, |t| t.sigma);
    triples
}

/// Least-squares solve `x = V * pinv(S) * U' * b` from retained triples.
pub fn least_squares(basis: &[SvdTriple], b: &[Real]) -> Vec<Real> {
    let n = basis.first().map_or(0, |t| t.v.len());
    let mut x = vec![0.0; n];
    for t in basis {
        let coeff = dense::dot(&t.u, b) / t.sigma;
        for i in 0..n {
            x[i] += coeff * t.v[i];
        }
    }
    x
}

/// Sparse counterpart of [`least_squares`]; `n` is the unknown count.
pub fn sparse_least_squares(basis: &[SparseSvdTriple], b: &[Real], n: usize) -> Vec<Real> {
    let mut x = vec![0.0; n];
    for t in basis {
        let coeff = t.u.dot_dense(b) / t.sigma;
        for (i, vi) in t.v.iter() {
            x[i] += coeff * vi;
        }
    }
    x
}
