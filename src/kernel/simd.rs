//! Runtime-dispatched SIMD dot product.
//!
//! Mirrors the dispatch shape of `paraphym_simd`'s
//! `similarity::simd::best_available()`: detect CPU features once, cache the
//! result, and fold dot products over lane-width chunks with a scalar tail
//! for the remainder.

use std::sync::OnceLock;

use super::scalar::dot_scalar;

/// Which SIMD path this process will use, detected once per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CpuFeatures {
    Scalar,
    #[cfg(target_arch = "aarch64")]
    Neon,
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    Sse41,
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    Avx2,
}

impl CpuFeatures {
    /// Lane width in `f32` elements for this feature level.
    fn lane_count(self) -> usize {
        match self {
            CpuFeatures::Scalar => 1,
            #[cfg(target_arch = "aarch64")]
            CpuFeatures::Neon => 4,
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            CpuFeatures::Sse41 => 4,
            #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
            CpuFeatures::Avx2 => 8,
        }
    }
}

fn detect() -> CpuFeatures {
    #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
    {
        if is_x86_feature_detected!("avx2") {
            return CpuFeatures::Avx2;
        }
        if is_x86_feature_detected!("sse4.1") {
            return CpuFeatures::Sse41;
        }
    }

    #[cfg(target_arch = "aarch64")]
    {
        if std::arch::is_aarch64_feature_detected!("neon") {
            return CpuFeatures::Neon;
        }
    }

    CpuFeatures::Scalar
}

fn cpu_features() -> CpuFeatures {
    static FEATURES: OnceLock<CpuFeatures> = OnceLock::new();
    *FEATURES.get_or_init(detect)
}

/// True if a hardware-accelerated path is available at all on this process.
pub fn hardware_accel_available() -> bool {
    cpu_features() != CpuFeatures::Scalar
}

/// The lane width (in `f32`s) of whichever SIMD path is active, or `1` if
/// none is available.
pub fn lane_count() -> usize {
    cpu_features().lane_count()
}

/// Dot product using the best available SIMD path for vectors of length
/// `d`, falling back to the portable `wide`-based lane fold when no
/// hardware feature is detected, and to the plain scalar loop for `d`
/// narrower than one lane.
#[inline]
pub fn dot_simd(a: &[f32], b: &[f32]) -> f32 {
    debug_assert_eq!(a.len(), b.len());
    let features = cpu_features();
    let d = a.len();

    if d < features.lane_count() {
        return dot_scalar(a, b);
    }

    match features {
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        CpuFeatures::Avx2 => unsafe { dot_avx2(a, b) },
        #[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
        CpuFeatures::Sse41 => unsafe { dot_sse41(a, b) },
        #[cfg(target_arch = "aarch64")]
        CpuFeatures::Neon => unsafe { dot_neon(a, b) },
        CpuFeatures::Scalar => dot_portable(a, b),
    }
}

/// Portable lane-folded dot product using the `wide` crate's 8-wide `f32`
/// vector type. Used on platforms with none of the hardware paths below,
/// so the "fold over lane-width chunks, scalar tail" contract still holds
/// even without real intrinsics.
fn dot_portable(a: &[f32], b: &[f32]) -> f32 {
    use wide::f32x8;

    let chunks_a = a.chunks_exact(8);
    let tail_a = chunks_a.remainder();
    let chunks_b = b.chunks_exact(8);
    let tail_b = chunks_b.remainder();

    let mut acc = f32x8::ZERO;
    for (ca, cb) in chunks_a.zip(chunks_b) {
        let va = f32x8::new(ca.try_into().unwrap());
        let vb = f32x8::new(cb.try_into().unwrap());
        acc += va * vb;
    }

    acc.reduce_add() + dot_scalar(tail_a, tail_b)
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "avx2")]
unsafe fn dot_avx2(a: &[f32], b: &[f32]) -> f32 {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::*;

    let len = a.len();
    let chunks = len / 8;
    let mut acc = _mm256_setzero_ps();

    for i in 0..chunks {
        let offset = i * 8;
        let va = _mm256_loadu_ps(a.as_ptr().add(offset));
        let vb = _mm256_loadu_ps(b.as_ptr().add(offset));
        acc = _mm256_add_ps(acc, _mm256_mul_ps(va, vb));
    }

    let hi = _mm256_extractf128_ps(acc, 1);
    let lo = _mm256_castps256_ps128(acc);
    let sum128 = _mm_add_ps(hi, lo);
    let sum64 = _mm_hadd_ps(sum128, sum128);
    let sum32 = _mm_hadd_ps(sum64, sum64);
    let mut total = _mm_cvtss_f32(sum32);

    let remainder_start = chunks * 8;
    total += dot_scalar(&a[remainder_start..], &b[remainder_start..]);
    total
}

#[cfg(any(target_arch = "x86", target_arch = "x86_64"))]
#[target_feature(enable = "sse4.1")]
unsafe fn dot_sse41(a: &[f32], b: &[f32]) -> f32 {
    #[cfg(target_arch = "x86")]
    use std::arch::x86::*;
    #[cfg(target_arch = "x86_64")]
    use std::arch::x86_64::*;

    let len = a.len();
    let chunks = len / 4;
    let mut acc = _mm_setzero_ps();

    for i in 0..chunks {
        let offset = i * 4;
        let va = _mm_loadu_ps(a.as_ptr().add(offset));
        let vb = _mm_loadu_ps(b.as_ptr().add(offset));
        acc = _mm_add_ps(acc, _mm_mul_ps(va, vb));
    }

    let sum64 = _mm_hadd_ps(acc, acc);
    let sum32 = _mm_hadd_ps(sum64, sum64);
    let mut total = _mm_cvtss_f32(sum32);

    let remainder_start = chunks * 4;
    total += dot_scalar(&a[remainder_start..], &b[remainder_start..]);
    total
}

#[cfg(target_arch = "aarch64")]
#[target_feature(enable = "neon")]
unsafe fn dot_neon(a: &[f32], b: &[f32]) -> f32 {
    use std::arch::aarch64::*;

    let len = a.len();
    let chunks = len / 4;
    let mut acc = vdupq_n_f32(0.0);

    for i in 0..chunks {
        let offset = i * 4;
        let va = vld1q_f32(a.as_ptr().add(offset));
        let vb = vld1q_f32(b.as_ptr().add(offset));
        acc = vfmaq_f32(acc, va, vb);
    }

    let mut total = vaddvq_f32(acc);

    let remainder_start = chunks * 4;
    total += dot_scalar(&a[remainder_start..], &b[remainder_start..]);
    total
}
