// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # spikegen - stochastic spike-source engine
//!
//! A per-tick event-generation core for a neuromorphic node: a population of
//! independent stochastic point processes ("spike sources") sampled once per
//! fixed timer tick, with each spike either transmitted as a timestamped
//! packet or accumulated as a weighted synaptic contribution.
//!
//! ## Quick start
//!
//! ```toml
//! [dependencies]
//! spikegen = "0.1"
//! ```
//!
//! ```rust,no_run
//! use spikegen::{EngineOutputs, RegionImages, RunPlan, SpikeSourceEngine, TickOutcome};
//!
//! # fn load_regions() -> RegionImages { RegionImages::default() }
//! let regions = load_regions(); // shared-memory images from the host
//! let mut engine = SpikeSourceEngine::load(
//!     regions,
//!     RunPlan { simulation_ticks: Some(10_000), timer_period_us: 1_000 },
//!     EngineOutputs::default(),
//! )?;
//!
//! let mut timer_count = 0;
//! loop {
//!     if engine.tick(timer_count)? == TickOutcome::Suspended {
//!         break; // host reads engine.regions() back out, may resume later
//!     }
//!     timer_count += 1;
//! }
//! # Ok::<(), spikegen::EngineError>(())
//! ```
//!
//! ## Feature flags
//! - **`engine`** (default): the tick-driven engine. Without it only the
//!   platform-agnostic numerics (`spikegen-core`) are compiled.
//!
//! ## Layering
//! ```text
//! spikegen-core    fixed-point types, RNG, spike-count samplers
//!       |
//! spikegen-engine  region codec, regime schedule, tick state machine,
//!       |          recording buffer, checkpointing
//! spikegen         this umbrella crate
//! ```

pub use spikegen_core::{
    fixed, rng, sampler, source, Accum, RateCutoffs, RngSeed, SpikeSourceRng, SpikeSourceState,
    UFract, ISI_SCALE_FACTOR,
};

#[cfg(feature = "engine")]
pub use spikegen_engine::{
    engine, output, rate_update, recording, regime, regions, EngineError, EngineOutputs,
    PopulationConfig, RateUpdate, RateUpdateQueue, RegimeSchedule, RegionImages,
    SpikeFrame, SpikeRecorder, SpikeRecordingBuffer, SpikeSourceEngine, SpikeTransmitter,
    SynapticTransferConfig, SynapticWriter, RunPlan, TickOutcome,
};
