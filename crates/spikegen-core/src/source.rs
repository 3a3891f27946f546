// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-source live state and rate classification.

use crate::fixed::{Accum, UFract};
use crate::rng::SpikeSourceRng;
use crate::sampler::slow_time_to_spike;

/// Rate-per-tick thresholds dividing the three sampling algorithms.
///
/// Below `slow` a source draws exact exponential intervals; between `slow`
/// and `fast` it draws exact Poisson counts; at `fast` and above it uses the
/// Gaussian approximation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateCutoffs {
    pub slow: Accum,
    pub fast: Accum,
}

/// The live descriptor of one spike source: its activation window, its
/// classification, and the derived sampling parameters for that
/// classification.
///
/// This is both the mutable per-tick projection of the currently active
/// rate regime and the 8-word wire format of one regime descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpikeSourceState {
    /// First tick (inclusive) of the active regime.
    pub start_ticks: u32,
    /// End tick (exclusive) of the active regime.
    pub end_ticks: u32,
    /// Tick at which the next regime should be loaded.
    pub next_ticks: u32,
    /// Fast (Poisson/Gaussian count per tick) vs slow (exponential interval).
    pub is_fast_source: bool,
    /// exp(-lambda), fast sources below the Gaussian cutoff.
    pub exp_minus_lambda: UFract,
    /// sqrt(lambda), nonzero only for Gaussian-approximated fast sources.
    pub sqrt_lambda: Accum,
    /// Mean inter-spike interval in ticks; 0 disables a slow source.
    pub mean_isi_ticks: u32,
    /// Ticks until the next spike, scaled by `ISI_SCALE_FACTOR`. Carries
    /// fractional remainder across ticks for slow sources.
    pub time_to_spike_ticks: u32,
}

impl SpikeSourceState {
    /// Whether `time` falls inside the `[start_ticks, end_ticks)` window.
    #[inline]
    pub fn is_active(&self, time: u32) -> bool {
        time >= self.start_ticks && time < self.end_ticks
    }

    /// Classify a new target rate (already converted to expected events per
    /// tick) and derive the sampling parameters for that classification.
    ///
    /// Used both at load time and for externally injected rate updates.
    pub fn set_rate_per_tick(
        &mut self,
        rate_per_tick: Accum,
        cutoffs: RateCutoffs,
        rng: &mut SpikeSourceRng,
    ) {
        if rate_per_tick >= cutoffs.slow {
            self.is_fast_source = true;
            if rate_per_tick >= cutoffs.fast {
                self.sqrt_lambda = Accum::from_f64(rate_per_tick.to_f64().sqrt());
            } else {
                self.exp_minus_lambda = UFract::from_f64((-rate_per_tick.to_f64()).exp());
                self.sqrt_lambda = Accum::ZERO;
            }
        } else if rate_per_tick == Accum::ZERO {
            // A zero mean interval keeps the slow path silent until the rate
            // changes again.
            self.is_fast_source = false;
            self.mean_isi_ticks = 0;
            self.time_to_spike_ticks = 0;
        } else {
            self.is_fast_source = false;
            self.mean_isi_ticks = mean_isi_from_rate(rate_per_tick);
            self.time_to_spike_ticks = slow_time_to_spike(rng, self.mean_isi_ticks);
        }
    }
}

/// Mean inter-spike interval in ticks, rounded to nearest.
fn mean_isi_from_rate(rate_per_tick: Accum) -> u32 {
    let isi = (1.0 / rate_per_tick.to_f64()).round();
    if isi <= 0.0 {
        0
    } else if isi >= u32::MAX as f64 {
        u32::MAX
    } else {
        isi as u32
    }
}
