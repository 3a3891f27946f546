// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-point wrapper types.
//!
//! `UFract` is an unsigned 0.32 fraction in `[0, 1)`; `Accum` is a signed
//! 16.15 value. Both round to nearest at their fractional bit position and
//! saturate on overflow. `f64` appears only transiently when quantizing the
//! result of a transcendental (exp, sqrt, inverse normal CDF) back onto the
//! fixed-point grid; no float is ever part of persisted state.

use core::ops::{Add, Sub};

/// Unsigned 0.32 fixed-point fraction (raw `u32`, one ULP = 2^-32).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct UFract(u32);

impl UFract {
    pub const ZERO: UFract = UFract(0);
    /// Largest representable value, one ULP below 1.0. Saturation target for
    /// `from_f64(1.0)` and the seed of the multiplicative Poisson product.
    pub const MAX: UFract = UFract(u32::MAX);

    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        UFract(raw)
    }

    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Quantize, rounding to nearest at bit 32 and saturating into `[0, 1)`.
    pub fn from_f64(value: f64) -> Self {
        if value <= 0.0 {
            return UFract::ZERO;
        }
        let scaled = (value * 4_294_967_296.0).round();
        if scaled >= u32::MAX as f64 {
            UFract::MAX
        } else {
            UFract(scaled as u32)
        }
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 4_294_967_296.0
    }

    /// u0.32 x u0.32 multiply, truncating at bit 32. The second operand is a
    /// raw uniform draw interpreted as a fraction in `[0, 1)`.
    #[inline]
    pub fn mul_uniform(self, uniform: u32) -> UFract {
        UFract(((self.0 as u64 * uniform as u64) >> 32) as u32)
    }
}

/// Signed 16.15 fixed-point value (raw `i32`, one ULP = 2^-15).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct Accum(i32);

impl Accum {
    pub const FRAC_BITS: u32 = 15;

    pub const ZERO: Accum = Accum(0);
    pub const ONE: Accum = Accum(1 << 15);
    pub const HALF: Accum = Accum(1 << 14);

    /// Wrap a raw bit pattern. This is the wire format of externally
    /// injected rate values.
    #[inline]
    pub const fn from_raw(raw: i32) -> Self {
        Accum(raw)
    }

    #[inline]
    pub const fn to_raw(self) -> i32 {
        self.0
    }

    /// Quantize, rounding to nearest at bit 15 and saturating.
    pub fn from_f64(value: f64) -> Self {
        let scaled = (value * 32_768.0).round();
        if scaled >= i32::MAX as f64 {
            Accum(i32::MAX)
        } else if scaled <= i32::MIN as f64 {
            Accum(i32::MIN)
        } else {
            Accum(scaled as i32)
        }
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / 32_768.0
    }

    /// Widen a u0.32 fraction, rounding to nearest at bit 15.
    #[inline]
    pub fn from_ufract(fract: UFract) -> Self {
        Accum((((fract.raw() as u64) + (1 << 16)) >> 17) as i32)
    }

    /// s16.15 x s16.15 multiply, rounding to nearest at bit 15, saturating.
    #[inline]
    pub fn mul(self, rhs: Accum) -> Accum {
        Accum(clamp_raw((self.0 as i64 * rhs.0 as i64 + (1 << 14)) >> 15))
    }

    /// Multiply by an integer scale factor, saturating.
    #[inline]
    pub fn mul_int(self, factor: u32) -> Accum {
        Accum(clamp_raw(self.0 as i64 * factor as i64))
    }

    /// s16.15 x u0.32 multiply, rounding to nearest at bit 32, saturating.
    /// Used for `rate_hz * seconds_per_tick`.
    #[inline]
    pub fn mul_ufract(self, rhs: UFract) -> Accum {
        Accum(clamp_raw(
            (self.0 as i64 * rhs.raw() as i64 + (1 << 31)) >> 32,
        ))
    }

    /// Round to the nearest integer and drop the sign (negative values clamp
    /// to 0). This is the rounding applied when a sampled value becomes a
    /// tick count.
    #[inline]
    pub fn round_to_u32(self) -> u32 {
        if self.0 <= 0 {
            0
        } else {
            (self.0 as u32 + (1 << 14)) >> 15
        }
    }
}

#[inline]
fn clamp_raw(raw: i64) -> i32 {
    raw.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

impl Add for Accum {
    type Output = Accum;

    #[inline]
    fn add(self, rhs: Accum) -> Accum {
        Accum(clamp_raw(self.0 as i64 + rhs.0 as i64))
    }
}

impl Sub for Accum {
    type Output = Accum;

    #[inline]
    fn sub(self, rhs: Accum) -> Accum {
        Accum(clamp_raw(self.0 as i64 - rhs.0 as i64))
    }
}
