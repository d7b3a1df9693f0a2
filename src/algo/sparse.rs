//! Compressed sparse row matrices and Krylov solvers.
//!
//! Cross-field diffusion produces symmetric positive definite systems that
//! plain conjugate gradient handles. The constrained potential systems carry
//! Lagrange multiplier rows and are symmetric indefinite, sometimes with
//! redundant constraints; those go through CGNR, conjugate gradient on the
//! normal equations, which converges to a least-squares solution.

use nalgebra::DVector;

use crate::error::{LayoutError, Result};

/// Compressed Sparse Row (CSR) matrix.
#[derive(Debug, Clone)]
pub struct CsrMatrix {
    rows: usize,
    cols: usize,
    /// `row_ptr[i]..row_ptr[i + 1]` indexes the entries of row `i`.
    row_ptr: Vec<usize>,
    col_idx: Vec<usize>,
    values: Vec<f64>,
}

impl CsrMatrix {
    /// Create a CSR matrix from `(row, col, value)` triplets.
    ///
    /// Duplicate entries at the same position are summed.
    pub fn from_triplets(rows: usize, cols: usize, mut triplets: Vec<(usize, usize, f64)>) -> Self {
        triplets.sort_unstable_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

        let mut row_ptr = vec![0usize; rows + 1];
        let mut col_idx: Vec<usize> = Vec::with_capacity(triplets.len());
        let mut values: Vec<f64> = Vec::with_capacity(triplets.len());
        let mut last: Option<(usize, usize)> = None;

        for (row, col, val) in triplets {
            debug_assert!(row < rows && col < cols, "triplet ({}, {}) out of bounds", row, col);
            if last == Some((row, col)) {
                if let Some(acc) = values.last_mut() {
                    *acc += val;
                }
                continue;
            }
            col_idx.push(col);
            values.push(val);
            row_ptr[row + 1] += 1;
            last = Some((row, col));
        }
        for r in 0..rows {
            row_ptr[r + 1] += row_ptr[r];
        }

        Self {
            rows,
            cols,
            row_ptr,
            col_idx,
            values,
        }
    }

    /// Get the number of rows.
    #[inline]
    pub fn nrows(&self) -> usize {
        self.rows
    }

    /// Get the number of columns.
    #[inline]
    pub fn ncols(&self) -> usize {
        self.cols
    }

    /// Get the number of stored entries.
    #[inline]
    pub fn nnz(&self) -> usize {
        self.values.len()
    }

    /// Iterate over the `(col, value)` entries of a row.
    pub fn row(&self, i: usize) -> impl Iterator<Item = (usize, f64)> + '_ {
        let range = self.row_ptr[i]..self.row_ptr[i + 1];
        self.col_idx[range.clone()].iter().copied().zip(self.values[range].iter().copied())
    }

    /// Diagonal entries (zero where none is stored).
    pub fn diagonal(&self) -> DVector<f64> {
        DVector::from_iterator(
            self.rows,
            (0..self.rows).map(|i| self.row(i).filter(|&(c, _)| c == i).map(|(_, v)| v).sum()),
        )
    }

    /// Multiply matrix by vector: `y = A * x`.
    pub fn mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        assert_eq!(x.len(), self.cols, "Vector dimension mismatch");
        DVector::from_iterator(self.rows, (0..self.rows).map(|i| self.row(i).map(|(c, v)| v * x[c]).sum()))
    }

    /// Multiply the transpose by a vector: `y = A^T * x`.
    pub fn tr_mul_vec(&self, x: &DVector<f64>) -> DVector<f64> {
        assert_eq!(x.len(), self.rows, "Vector dimension mismatch");
        let mut y = DVector::zeros(self.cols);
        for i in 0..self.rows {
            let xi = x[i];
            if xi != 0.0 {
                for (c, v) in self.row(i) {
                    y[c] += v * xi;
                }
            }
        }
        y
    }
}

/// Solve `A x = b` for symmetric positive definite `A` by conjugate gradient.
///
/// Converges when the residual norm relative to `|b|` drops below `tolerance`.
pub fn conjugate_gradient(
    a: &CsrMatrix,
    b: &DVector<f64>,
    x0: Option<&DVector<f64>>,
    max_iter: usize,
    tolerance: f64,
) -> Result<DVector<f64>> {
    let n = b.len();
    assert_eq!(a.nrows(), n, "Matrix-vector dimension mismatch");
    assert_eq!(a.ncols(), n, "Matrix must be square");

    let mut x = x0.cloned().unwrap_or_else(|| DVector::zeros(n));
    let b_norm = b.norm();
    if b_norm < 1e-15 {
        return Ok(DVector::zeros(n));
    }

    let mut r = b - a.mul_vec(&x);
    let mut r_norm_sq = r.dot(&r);
    if r_norm_sq.sqrt() / b_norm < tolerance {
        return Ok(x);
    }
    let mut p = r.clone();

    for _ in 0..max_iter {
        let ap = a.mul_vec(&p);
        let p_ap = p.dot(&ap);
        if p_ap <= 1e-300 {
            // Lost positive definiteness.
            break;
        }
        let alpha = r_norm_sq / p_ap;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &ap, 1.0);

        let new_r_norm_sq = r.dot(&r);
        if new_r_norm_sq.sqrt() / b_norm < tolerance {
            return Ok(x);
        }
        p = &r + (new_r_norm_sq / r_norm_sq) * &p;
        r_norm_sq = new_r_norm_sq;
    }

    Err(LayoutError::ConvergenceFailed { iterations: max_iter })
}

/// Least-squares solve of `A x = b` by conjugate gradient on `A^T A x = A^T b`.
///
/// Works for any `A`, including singular and indefinite ones. Converges when
/// the normal-equation residual relative to `|A^T b|` drops below `tolerance`.
/// Use [`cgnr_best_effort`] to keep the last iterate when it does not.
pub fn cgnr(
    a: &CsrMatrix,
    b: &DVector<f64>,
    x0: Option<&DVector<f64>>,
    max_iter: usize,
    tolerance: f64,
) -> Result<DVector<f64>> {
    let (x, converged) = cgnr_best_effort(a, b, x0, max_iter, tolerance);
    if converged {
        Ok(x)
    } else {
        Err(LayoutError::ConvergenceFailed { iterations: max_iter })
    }
}

/// CGNR returning the last iterate and whether it converged.
pub fn cgnr_best_effort(
    a: &CsrMatrix,
    b: &DVector<f64>,
    x0: Option<&DVector<f64>>,
    max_iter: usize,
    tolerance: f64,
) -> (DVector<f64>, bool) {
    let n = a.ncols();
    let mut x = x0.cloned().unwrap_or_else(|| DVector::zeros(n));

    let mut r = b - a.mul_vec(&x);
    let mut z = a.tr_mul_vec(&r);
    let atb_norm = a.tr_mul_vec(b).norm();
    if atb_norm < 1e-15 {
        return (DVector::zeros(n), true);
    }

    let mut z_norm_sq = z.dot(&z);
    if z_norm_sq.sqrt() / atb_norm < tolerance {
        return (x, true);
    }
    let mut p = z.clone();

    for _ in 0..max_iter {
        let w = a.mul_vec(&p);
        let w_norm_sq = w.dot(&w);
        if w_norm_sq <= 1e-300 {
            break;
        }
        let alpha = z_norm_sq / w_norm_sq;
        x.axpy(alpha, &p, 1.0);
        r.axpy(-alpha, &w, 1.0);
        z = a.tr_mul_vec(&r);

        let new_z_norm_sq = z.dot(&z);
        if new_z_norm_sq.sqrt() / atb_norm < tolerance {
            return (x, true);
        }
        p = &z + (new_z_norm_sq / z_norm_sq) * &p;
        z_norm_sq = new_z_norm_sq;
    }

    (x, false)
}
