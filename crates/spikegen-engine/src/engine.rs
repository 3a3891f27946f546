// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! The tick-driven spike-source engine.
//!
//! One [`SpikeSourceEngine`] owns every piece of live state for a
//! sub-population of stochastic spike sources: configuration, the RNG, the
//! regime schedule, the recording buffer, and the synaptic accumulator. The
//! host drives it with one [`SpikeSourceEngine::tick`] call per timer
//! period; the entire tick body must fit inside that period, and overruns
//! are counted (provenance) rather than treated as fatal.

use std::time::{Duration, Instant};

use spikegen_core::sampler::{self, ISI_SCALE_FACTOR};
use spikegen_core::{Accum, RateCutoffs, SpikeSourceRng, SpikeSourceState};
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::output::{SpikeRecorder, SpikeTransmitter, SynapticWriter};
use crate::rate_update::RateUpdateQueue;
use crate::recording::SpikeRecordingBuffer;
use crate::regime::RegimeSchedule;
use crate::regions::{PopulationConfig, RegionImages, SynapticTransferConfig};

/// How long the engine runs and at what cadence.
#[derive(Debug, Clone, Copy)]
pub struct RunPlan {
    /// Tick horizon; `None` means an infinite run (never suspends on its
    /// own).
    pub simulation_ticks: Option<u32>,
    /// Timer period in microseconds; the per-tick real-time budget.
    pub timer_period_us: u32,
}

/// The external collaborators spikes are routed to. Any of them may be
/// absent: no transmitter means no fabric emission, no recorder disables
/// recording entirely, no synaptic writer drops the per-tick transfer.
#[derive(Default)]
pub struct EngineOutputs {
    pub transmitter: Option<Box<dyn SpikeTransmitter>>,
    pub recorder: Option<Box<dyn SpikeRecorder>>,
    pub synaptic_writer: Option<Box<dyn SynapticWriter>>,
}

/// What a single timer invocation did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Sources were processed normally.
    Processed,
    /// The tick horizon was reached: state was checkpointed, recording
    /// finalized, and the tick counter rolled back so the same tick is
    /// delivered again after resume. No source was processed.
    Suspended,
}

pub struct SpikeSourceEngine {
    config: PopulationConfig,
    rng: SpikeSourceRng,
    /// Live per-source state, the mutable projection of each source's
    /// currently active regime. Indexed by local source id.
    sources: Vec<SpikeSourceState>,
    schedule: RegimeSchedule,
    recording: SpikeRecordingBuffer,
    synaptic: Option<SynapticTransferConfig>,
    /// Per-tick weighted event counts, present when synaptic injection is
    /// configured. Zeroed at the start of every processed tick.
    accumulator: Option<Vec<u16>>,
    rate_updates: RateUpdateQueue,
    transmitter: Option<Box<dyn SpikeTransmitter>>,
    recorder: Option<Box<dyn SpikeRecorder>>,
    synaptic_writer: Option<Box<dyn SynapticWriter>>,
    regions: RegionImages,
    /// Current tick; starts at `u32::MAX` so the first processed tick is 0.
    time: u32,
    horizon: Option<u32>,
    timer_period: Duration,
    budget_overruns: u32,
}

impl SpikeSourceEngine {
    /// Construct an engine from the shared-memory images. Loading is the
    /// restore-from-initial-state path: the same code runs again on
    /// [`resume`](Self::resume).
    pub fn load(
        regions: RegionImages,
        plan: RunPlan,
        outputs: EngineOutputs,
    ) -> Result<Self, EngineError> {
        let config = PopulationConfig::decode(&regions.config)?;
        info!(
            n_sources = config.n_sources,
            first_source_id = config.first_source_id,
            key = format_args!("{:#010x}", config.key),
            mask = format_args!("{:#010x}", config.set_rate_source_id_mask),
            "read population configuration"
        );

        let schedule = RegimeSchedule::decode(&regions.rates, config.n_sources)?;
        let synaptic = SynapticTransferConfig::decode(&regions.synaptic, config.n_sources)?;
        let accumulator = synaptic
            .as_ref()
            .filter(|s| s.is_enabled())
            .map(|s| vec![0u16; (s.size_in_bytes / 2) as usize]);
        let recording = SpikeRecordingBuffer::new(
            config.n_sources,
            config.max_spikes_per_tick,
            outputs.recorder.is_some(),
        )?;

        let mut engine = Self {
            rng: SpikeSourceRng::from_seed(config.seed),
            config,
            sources: Vec::new(),
            schedule,
            recording,
            synaptic,
            accumulator,
            rate_updates: RateUpdateQueue::new(),
            transmitter: outputs.transmitter,
            recorder: outputs.recorder,
            synaptic_writer: outputs.synaptic_writer,
            regions,
            time: u32::MAX,
            horizon: plan.simulation_ticks,
            timer_period: Duration::from_micros(plan.timer_period_us as u64),
            budget_overruns: 0,
        };
        engine.restore_sources();
        info!("initialization completed");
        Ok(engine)
    }

    /// Copy every source's active regime into its live state. Slow sources
    /// persisted with a zero time-to-spike get a fresh draw so they do not
    /// stall (a zero mean interval stays silent by design).
    fn restore_sources(&mut self) {
        self.sources.clear();
        for id in 0..self.schedule.n_sources() {
            let mut live = *self.schedule.active(id);
            if !live.is_fast_source && live.mean_isi_ticks != 0 && live.time_to_spike_ticks == 0 {
                live.time_to_spike_ticks =
                    sampler::slow_time_to_spike(&mut self.rng, live.mean_isi_ticks);
            }
            self.sources.push(live);
        }
    }

    /// Re-read configuration and schedules from the region images after a
    /// pause, adopting a fresh run plan (the host extends the horizon here;
    /// resuming with the old one just suspends again on the next tick).
    /// Idempotent; the tick counter is untouched, so the tick that triggered
    /// the suspend is delivered again.
    pub fn resume(&mut self, plan: RunPlan) -> Result<(), EngineError> {
        self.recording.reset();
        self.config = PopulationConfig::decode(&self.regions.config)?;
        self.rng = SpikeSourceRng::from_seed(self.config.seed);
        self.schedule = RegimeSchedule::decode(&self.regions.rates, self.config.n_sources)?;
        self.restore_sources();
        self.horizon = plan.simulation_ticks;
        self.timer_period = Duration::from_micros(plan.timer_period_us as u64);
        info!(
            time = self.time,
            horizon = self.horizon,
            "resumed spike source node"
        );
        Ok(())
    }

    /// Persist the configuration (with the evolved RNG words) and every
    /// source's live state back into the region images, in source-id order.
    /// One pass captures both the seed and the slow-sampler fractional
    /// remainders.
    pub fn checkpoint_save(&mut self) -> Result<(), EngineError> {
        debug!("storing population state");
        self.config.seed = self.rng.seed();
        self.config.encode(&mut self.regions.config)?;
        for id in 0..self.sources.len() {
            self.schedule.store_live(id, &self.sources[id]);
        }
        self.schedule.encode_into(&mut self.regions.rates)?;
        info!("population state stored");
        Ok(())
    }

    /// Process one timer tick.
    ///
    /// `timer_count` is the host's invocation counter, forwarded to the
    /// transmission facility for slot timing.
    pub fn tick(&mut self, timer_count: u32) -> Result<TickOutcome, EngineError> {
        let started = Instant::now();

        self.time = self.time.wrapping_add(1);
        debug!(time = self.time, "timer tick");

        if self.horizon_reached() {
            self.checkpoint_save()?;
            if let Some(recorder) = self.recorder.as_deref_mut() {
                self.recording.flush(self.time, recorder);
                recorder.finalize();
            }
            // Roll back so the next wake delivers this tick again.
            self.time = self.time.wrapping_sub(1);
            info!(
                budget_overruns = self.budget_overruns,
                "tick horizon reached; ready to suspend"
            );
            return Ok(TickOutcome::Suspended);
        }

        // Externally injected rate changes land between ticks, never
        // mid-population.
        self.apply_rate_updates();

        if let Some(acc) = self.accumulator.as_mut() {
            acc.fill(0);
        }
        if let Some(tx) = self.transmitter.as_deref_mut() {
            tx.reset_phase();
        }

        for id in 0..self.sources.len() {
            let count = self.sample_source(id);
            if count > 0 {
                self.recording.mark(id as u32, count)?;
                self.route_spikes(id, count, timer_count);
            }
            // Strictly after sampling: a regime loaded now first applies on
            // the next tick.
            let time = self.time;
            self.schedule
                .advance_if_due(id, time, &mut self.sources[id], &mut self.rng);
        }

        if let (Some(acc), Some(writer)) =
            (self.accumulator.as_ref(), self.synaptic_writer.as_deref_mut())
        {
            writer.transfer(acc);
        }
        if let Some(recorder) = self.recorder.as_deref_mut() {
            self.recording.flush(self.time, recorder);
        }

        let elapsed = started.elapsed();
        if elapsed > self.timer_period {
            self.budget_overruns += 1;
            warn!(
                time = self.time,
                elapsed_us = elapsed.as_micros() as u64,
                period_us = self.timer_period.as_micros() as u64,
                "tick exceeded its real-time budget"
            );
        }
        Ok(TickOutcome::Processed)
    }

    /// Spike count for one source this tick: 0 outside its activation
    /// window, otherwise the classification's sampler.
    fn sample_source(&mut self, id: usize) -> u32 {
        let time = self.time;
        let source = &mut self.sources[id];

        if source.is_fast_source {
            if !source.is_active(time) {
                return 0;
            }
            if source.sqrt_lambda > Accum::ZERO {
                sampler::faster_gaussian(&mut self.rng, source.sqrt_lambda)
            } else {
                sampler::fast_poisson(&mut self.rng, source.exp_minus_lambda)
            }
        } else {
            if !source.is_active(time) || source.mean_isi_ticks == 0 {
                return 0;
            }
            let mut count = 0u32;
            // One event per crossing of the scale factor; the redraw may
            // stay below it when the mean interval is under one tick.
            while source.time_to_spike_ticks < ISI_SCALE_FACTOR {
                count += 1;
                source.time_to_spike_ticks = source.time_to_spike_ticks.wrapping_add(
                    sampler::slow_time_to_spike(&mut self.rng, source.mean_isi_ticks),
                );
            }
            // Subtract one tick, carrying the remainder's precision forward.
            source.time_to_spike_ticks -= ISI_SCALE_FACTOR;
            count
        }
    }

    /// Route a nonzero count: one packet when transmission is configured,
    /// otherwise a weighted contribution into the synaptic accumulator.
    fn route_spikes(&mut self, id: usize, count: u32, timer_count: u32) {
        if self.config.has_key {
            if let Some(tx) = self.transmitter.as_deref_mut() {
                tx.send(self.config.key | id as u32, count, timer_count);
            }
        } else if let (Some(synaptic), Some(acc)) =
            (self.synaptic.as_ref(), self.accumulator.as_mut())
        {
            if synaptic.is_enabled() {
                let slot = synaptic.offset as usize + id;
                let weight = synaptic.weights[id];
                acc[slot] = acc[slot].wrapping_add(weight.wrapping_mul(count as u16));
            }
        }
    }

    fn apply_rate_updates(&mut self) {
        if self.rate_updates.is_empty() {
            return;
        }
        for update in self.rate_updates.drain_all() {
            let source_id = update.key & self.config.set_rate_source_id_mask;
            self.set_source_rate(source_id, Accum::from_raw(update.payload as i32));
        }
    }

    /// Reclassify one source for a new target rate in Hz. Ids outside this
    /// sub-population are silently ignored.
    pub fn set_source_rate(&mut self, source_id: u32, rate_hz: Accum) {
        let first = self.config.first_source_id;
        if source_id < first || source_id - first >= self.config.n_sources {
            return;
        }
        let sub_id = (source_id - first) as usize;
        let rate_per_tick = rate_hz.mul_ufract(self.config.seconds_per_tick);
        debug!(
            source_id,
            sub_id,
            rate_hz = rate_hz.to_f64(),
            rate_per_tick = rate_per_tick.to_f64(),
            "setting source rate"
        );
        let cutoffs = RateCutoffs {
            slow: self.config.slow_rate_per_tick_cutoff,
            fast: self.config.fast_rate_per_tick_cutoff,
        };
        self.sources[sub_id].set_rate_per_tick(rate_per_tick, cutoffs, &mut self.rng);
    }

    fn horizon_reached(&self) -> bool {
        match self.horizon {
            Some(ticks) => self.time >= ticks,
            None => false,
        }
    }

    /// A clonable handle for producers injecting rate updates from other
    /// threads.
    pub fn rate_update_queue(&self) -> RateUpdateQueue {
        self.rate_updates.clone()
    }

    /// Current tick (`u32::MAX` before the first tick).
    pub fn time(&self) -> u32 {
        self.time
    }

    /// Provenance: how many ticks exceeded the real-time budget.
    pub fn budget_overruns(&self) -> u32 {
        self.budget_overruns
    }

    pub fn config(&self) -> &PopulationConfig {
        &self.config
    }

    pub fn source(&self, id: usize) -> &SpikeSourceState {
        &self.sources[id]
    }

    /// The region images, including any checkpointed-back state. This is
    /// what the host reads out after a suspend.
    pub fn regions(&self) -> &RegionImages {
        &self.regions
    }
}
