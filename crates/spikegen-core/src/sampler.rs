// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Spike-count samplers.
//!
//! Three mutually exclusive algorithms, selected by rate classification:
//!
//! - slow sources draw an exact exponential inter-spike interval
//!   ([`exp_interval`] / [`slow_time_to_spike`]),
//! - fast sources draw an exact Poisson count by multiplicative inversion
//!   ([`fast_poisson`]),
//! - faster sources (large lambda) trade exactness for bounded cost with a
//!   Gaussian approximation ([`faster_gaussian`]).

use crate::fixed::{Accum, UFract};
use crate::rng::SpikeSourceRng;

/// Scale factor letting inter-spike intervals carry sub-tick fractional
/// precision as plain integers. `time_to_spike_ticks` values are compared
/// against this constant once per tick.
pub const ISI_SCALE_FACTOR: u32 = 1000;

/// Draw a unit-mean exponential variate via the rejection scheme over
/// uniform pairs.
///
/// The outer draw `u0` becomes the fractional part once an inner retry pair
/// breaks the descending run; each fully rejected round contributes +1.0.
pub fn exp_interval(rng: &mut SpikeSourceRng) -> Accum {
    let mut a = Accum::ZERO;

    loop {
        let mut u = rng.next_u32();
        let u0 = u;

        loop {
            let ustar = rng.next_u32();
            if u < ustar {
                return a + Accum::from_ufract(UFract::from_raw(u0));
            }

            u = rng.next_u32();
            if u >= ustar {
                break;
            }
        }

        a = a + Accum::ONE;
    }
}

/// Ticks until the next spike of a slow source, scaled by
/// [`ISI_SCALE_FACTOR`].
///
/// The exponential variate is rounded to the scale-factor grid first and
/// only then multiplied by the mean interval, so fractional precision
/// accumulates across ticks without floating drift.
pub fn slow_time_to_spike(rng: &mut SpikeSourceRng, mean_isi_ticks: u32) -> u32 {
    let scaled = exp_interval(rng).mul_int(ISI_SCALE_FACTOR).round_to_u32();
    scaled.wrapping_mul(mean_isi_ticks)
}

/// Exact Poisson count for a fast source: multiply a running u0.32 product
/// by fresh uniforms until it drops to `exp(-lambda)` or below; the draw is
/// the number of multiplications minus one.
///
/// A raw-zero `exp_minus_lambda` means the rate underflowed; the source is
/// effectively silent this tick and the draw short-circuits to 0.
pub fn fast_poisson(rng: &mut SpikeSourceRng, exp_minus_lambda: UFract) -> u32 {
    if exp_minus_lambda.raw() == 0 {
        return 0;
    }

    let mut p = UFract::MAX;
    let mut k = 0u32;
    loop {
        k += 1;
        p = p.mul_uniform(rng.next_u32());
        if p.raw() <= exp_minus_lambda.raw() {
            return k - 1;
        }
    }
}

/// Gaussian-approximated count for a faster source:
/// `round((norminv(U) * 0.5 + sqrt(lambda))^2)`.
pub fn faster_gaussian(rng: &mut SpikeSourceRng, sqrt_lambda: Accum) -> u32 {
    let u = rng.next_u32();
    let x = norminv_urt(u).mul(Accum::HALF) + sqrt_lambda;
    x.mul(x).round_to_u32()
}

/// Inverse standard-normal CDF of a uniform `u32`, mapped through the
/// midpoint rule `p = (u + 0.5) / 2^32` and quantized to `Accum`.
pub fn norminv_urt(u: u32) -> Accum {
    let p = (u as f64 + 0.5) / 4_294_967_296.0;
    Accum::from_f64(norminv(p))
}

/// Rational approximation to the inverse normal CDF (Acklam's algorithm,
/// relative error below 1.15e-9 over the open unit interval).
fn norminv(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969683028665376e+01,
        2.209460984245205e+02,
        -2.759285104469687e+02,
        1.383577518672690e+02,
        -3.066479806614716e+01,
        2.506628277459239e+00,
    ];
    const B: [f64; 5] = [
        -5.447609879822406e+01,
        1.615858368580409e+02,
        -1.556989798598866e+02,
        6.680131188771972e+01,
        -1.328068155288572e+01,
    ];
    const C: [f64; 6] = [
        -7.784894002430293e-03,
        -3.223964580411365e-01,
        -2.400758277161838e+00,
        -2.549732539343734e+00,
        4.374664141464968e+00,
        2.938163982698783e+00,
    ];
    const D: [f64; 4] = [
        7.784695709041462e-03,
        3.224671290700398e-01,
        2.445134137142996e+00,
        3.754408661907416e+00,
    ];
    const P_LOW: f64 = 0.02425;

    if p < P_LOW {
        let q = (-2.0 * p.ln()).sqrt();
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        let q = (-2.0 * (1.0 - p).ln()).sqrt();
        -((((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0))
    }
}
