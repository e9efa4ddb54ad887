//! Similarity kernel: magnitude and cosine similarity over equal-length
//! `f32` slices.
//!
//! Three tiers, selected in this order:
//! 1. A SIMD path (AVX2/SSE4.1 on x86, NEON on aarch64) when hardware
//!    acceleration is available and `d >= lane_count`.
//! 2. A fully unrolled scalar fast path for the common `d == 768` embedding
//!    width, used whenever no SIMD path was selected.
//! 3. The plain scalar baseline for everything else.

mod scalar;
mod simd;

pub use simd::{hardware_accel_available, lane_count};

fn dot(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let d = a.len();

    if d == 0 {
        return 0.0;
    }

    if simd::hardware_accel_available() && d >= simd::lane_count() {
        return simd::dot_simd(a, b);
    }

    if d == 768 {
        return scalar::dot_unrolled_768(a, b);
    }

    scalar::dot_scalar(a, b)
}

/// `sqrt(sum(v[i]^2))`. Returns exactly `0.0` for an all-zero input.
#[inline]
pub fn magnitude(v: &[f32]) -> f32 {
    dot(v, v).max(0.0).sqrt()
}

/// Cosine similarity given precomputed magnitudes, avoiding recomputation
/// when `s_mag` is already known (the store's stored-vector case).
///
/// Returns `0.0` if `s_mag == 0.0` rather than dividing by zero — a
/// zero-magnitude stored vector carries no direction and can never be a
/// genuine nearest match.
#[inline]
pub fn cosine(q: &[f32], q_mag: f32, s: &[f32], s_mag: f32) -> f32 {
    if s_mag == 0.0 {
        return 0.0;
    }
    dot(q, s) / (q_mag * s_mag)
}

/// Cosine similarity between two raw vectors, computing both magnitudes.
/// Used by the segmenter, which has no cached magnitudes to reuse.
#[inline]
pub fn cosine_vectors(a: &[f32], b: &[f32]) -> f32 {
    cosine(a, magnitude(a), b, magnitude(b))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn magnitude_of_zero_vector_is_zero() {
        assert_eq!(magnitude(&[0.0; 16]), 0.0);
    }

    #[test]
    fn magnitude_of_unit_vector_is_one() {
        let mut v = vec![0.0f32; 768];
        v[3] = 1.0;
        assert!((magnitude(&v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v: Vec<f32> = (0..768).map(|i| (i as f32 * 0.003).sin() + 2.0).collect();
        let mag = magnitude(&v);
        let sim = cosine(&v, mag, &v, mag);
        assert!((sim - 1.0).abs() < 1e-5);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        let a = [1.0f32, 0.0, 0.0, 0.0];
        let b = [0.0f32, 1.0, 0.0, 0.0];
        let sim = cosine(&a, magnitude(&a), &b, magnitude(&b));
        assert!(sim.abs() < 1e-6);
    }

    #[test]
    fn cosine_with_zero_magnitude_stored_vector_is_zero() {
        let q = [1.0f32, 2.0, 3.0];
        let s = [0.0f32, 0.0, 0.0];
        assert_eq!(cosine(&q, magnitude(&q), &s, magnitude(&s)), 0.0);
    }

    #[test]
    fn cosine_is_bounded() {
        let a: Vec<f32> = (0..100).map(|i| ((i * 7) % 13) as f32 - 6.0).collect();
        let b: Vec<f32> = (0..100).map(|i| ((i * 3) % 11) as f32 - 5.0).collect();
        let sim = cosine(&a, magnitude(&a), &b, magnitude(&b));
        assert!((-1.0 - 1e-5..=1.0 + 1e-5).contains(&sim));
    }
}
