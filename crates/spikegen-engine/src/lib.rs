// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # spikegen-engine
//!
//! The tick-driven execution engine of a spike-source node. One engine
//! instance owns a population of stochastic spike sources and, once per
//! timer tick, decides how many events each source emits and routes them to
//! the configured outputs.
//!
//! ## Structure
//! - [`regions`] - fixed-layout codec for the shared-memory images the node
//!   is configured from (and checkpointed back into).
//! - [`regime`] - per-source time-windowed rate schedules with a
//!   forward-only cursor.
//! - [`recording`] - the growable bitmap-of-counts frame flushed once per
//!   tick.
//! - [`rate_update`] - the cross-thread queue carrying externally injected
//!   rate changes, drained between ticks.
//! - [`output`] - the seams to the transmission, recording-persistence, and
//!   synaptic-transfer collaborators.
//! - [`engine`] - the per-tick state machine tying it all together.
//!
//! ## Concurrency model
//! Strictly single-writer: everything except [`rate_update::RateUpdateQueue`]
//! is touched only from the tick path. The queue replaces the original
//! platform's interrupt-priority exclusion with explicit message passing;
//! updates land at the start of the next tick.

pub mod engine;
pub mod error;
pub mod output;
pub mod rate_update;
pub mod recording;
pub mod regime;
pub mod regions;

pub use engine::{EngineOutputs, RunPlan, SpikeSourceEngine, TickOutcome};
pub use error::EngineError;
pub use output::{SpikeFrame, SpikeRecorder, SpikeTransmitter, SynapticWriter};
pub use rate_update::{RateUpdate, RateUpdateQueue};
pub use recording::SpikeRecordingBuffer;
pub use regime::RegimeSchedule;
pub use regions::{PopulationConfig, RegionImages, SynapticTransferConfig};
