//! Fixed-length normalisation of `[timepoints, regions]` series.
//!
//! `fix_length` — keep the earliest `T` timepoints, or right-pad with
//! all-zero timepoints up to `T`.  Zero rows stand for "no signal"; no
//! imputation is attempted.
use ndarray::{s, Array2, ArrayView2};

/// Pad or truncate `data` ([T_in, R]) to exactly `target_len` rows.
///
/// Rows `0..min(T_in, target_len)` are copied unchanged; any remaining rows
/// are zero.  The region count is preserved.  Total and idempotent.
pub fn fix_length(data: ArrayView2<'_, f32>, target_len: usize) -> Array2<f32> {
    let (n_t, n_r) = data.dim();
    let keep = n_t.min(target_len);

    let mut out = Array2::<f32>::zeros((target_len, n_r));
    out.slice_mut(s![..keep, ..])
       .assign(&data.slice(s![..keep, ..]));
    out
}
