// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # spikegen-core
//!
//! Platform-agnostic numerics for the stochastic spike-source engine:
//!
//! - [`fixed`] - explicit fixed-point wrapper types ([`UFract`], [`Accum`])
//!   with stated rounding positions; cutoff and scaling behavior is part of
//!   the engine's observable contract, so state is never stored as floats.
//! - [`rng`] - the seeded 4-word combined generator driving all sampling.
//! - [`sampler`] - the three spike-count algorithms: exact exponential
//!   inter-spike intervals (slow sources), multiplicative-inversion Poisson
//!   (fast sources), and a Gaussian approximation (faster sources).
//! - [`source`] - the per-source live descriptor and rate classification.
//!
//! No I/O, no logging, no allocation in the sampling paths.

pub mod fixed;
pub mod rng;
pub mod sampler;
pub mod source;

pub use fixed::{Accum, UFract};
pub use rng::{RngSeed, SpikeSourceRng};
pub use sampler::ISI_SCALE_FACTOR;
pub use source::{RateCutoffs, SpikeSourceState};
