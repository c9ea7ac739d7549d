//! CPU reference for batched matrix multiplication.
//!
//! Computes `C[b] = A[b] · B[b]` for every batch `b`, all matrices flat and
//! row-major:
//!
//! * `A` is `batch × m × k`,
//! * `B` is `batch × k × n`,
//! * `C` is `batch × m × n`,
//!
//! with element `(b, r, c)` of a `rows × cols` batch stored at
//! [`ix3d`]`(b, r, c, rows, cols)`.
//!
//! ## Execution model
//! The `batch · m` output rows are write-disjoint, so they are distributed
//! over the rayon pool one row per task. Each row is accumulated as a sequence
//! of scaled-row additions (`C[b][i][..] += A[b][i][kk] · B[b][kk][..]`)
//! processed in 8-lane chunks, which the compiler turns into packed
//! multiply-adds. Any `n` is accepted; a tail shorter than 8 lanes is handled
//! element by element.

use rayon::prelude::*;

use crate::engine::error::{OracleError, OracleResult};
use crate::engine::types::{ix3d, MatrixParams};

/// Vector width of the inner accumulation.
const LANES: usize = 8;

/// Multiplies every batch of `a` by the matching batch of `b`.
///
/// ## Errors
/// [`OracleError::ShapeMismatch`] if `a` or `b` does not hold exactly the
/// number of elements `params` implies.
pub fn matmul(a: &[f32], b: &[f32], params: &MatrixParams) -> OracleResult<Vec<f32>> {
    check_len("a", params.a_len(), a.len())?;
    check_len("b", params.b_len(), b.len())?;

    let (m, k, n) = (params.m as usize, params.k as usize, params.n as usize);
    let mut c = vec![0.0f32; params.c_len()];
    if c.is_empty() {
        return Ok(c);
    }

    c.par_chunks_mut(n).enumerate().for_each(|(row, c_row)| {
        let (batch, i) = (row / m, row % m);
        for kk in 0..k {
            let a_val = a[ix3d(batch, i, kk, m, k)];
            let start = ix3d(batch, kk, 0, k, n);
            axpy(a_val, &b[start..start + n], c_row);
        }
    });

    Ok(c)
}

/// `y += alpha · x`, eight lanes at a time.
#[inline]
fn axpy(alpha: f32, x: &[f32], y: &mut [f32]) {
    let mut y_chunks = y.chunks_exact_mut(LANES);
    let mut x_chunks = x.chunks_exact(LANES);

    for (yc, xc) in (&mut y_chunks).zip(&mut x_chunks) {
        for lane in 0..LANES {
            yc[lane] = alpha.mul_add(xc[lane], yc[lane]);
        }
    }

    for (yv, xv) in y_chunks.into_remainder().iter_mut().zip(x_chunks.remainder()) {
        *yv = alpha.mul_add(*xv, *yv);
    }
}

fn check_len(buffer: &'static str, expected: usize, actual: usize) -> OracleResult<()> {
    if expected != actual {
        return Err(OracleError::ShapeMismatch { buffer, expected, actual });
    }
    Ok(())
}
