//! Scalar baseline and the `d == 768` unrolled fast path.

/// Sum of squared elements, computed without any unrolling or SIMD.
#[inline]
pub fn squared_sum_scalar(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum()
}

/// Dot product computed without any unrolling or SIMD. Every faster path in
/// this module is checked against this one — if a faster path and this
/// disagree by more than a small relative error, the faster path is wrong.
#[inline]
pub fn dot_scalar(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Dot product fully unrolled with a step of 4, specialized for the common
/// `d == 768` embedding width. Four independent accumulators break the
/// serial add-dependency chain a naive loop would have, letting the CPU
/// issue more than one multiply-add per cycle. Used whenever a SIMD path is
/// unavailable or not selected for this platform; falls back to
/// [`dot_scalar`] for any other dimension.
#[inline]
pub fn dot_unrolled_768(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    debug_assert_eq!(a.len(), 768);

    let mut acc0 = 0.0f32;
    let mut acc1 = 0.0f32;
    let mut acc2 = 0.0f32;
    let mut acc3 = 0.0f32;

    let mut i = 0;
    while i < 768 {
        acc0 += a[i] * b[i];
        acc1 += a[i + 1] * b[i + 1];
        acc2 += a[i + 2] * b[i + 2];
        acc3 += a[i + 3] * b[i + 3];
        i += 4;
    }

    acc0 + acc1 + acc2 + acc3
}
