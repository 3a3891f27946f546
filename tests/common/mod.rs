// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Shared fixtures for the end-to-end tests: region-image builders and
//! collecting output sinks.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use spikegen::{
    Accum, PopulationConfig, RngSeed, SpikeFrame, SpikeRecorder, SpikeSourceState,
    SpikeTransmitter, UFract,
};

pub fn default_config(n_sources: u32) -> PopulationConfig {
    PopulationConfig {
        has_key: true,
        key: 0x0002_0000,
        set_rate_source_id_mask: 0xFFFF,
        seconds_per_tick: UFract::from_f64(0.001),
        ticks_per_second: 1000,
        slow_rate_per_tick_cutoff: Accum::from_f64(0.01),
        fast_rate_per_tick_cutoff: Accum::from_f64(10.0),
        first_source_id: 0,
        n_sources,
        max_spikes_per_tick: 1,
        seed: RngSeed {
            x: 123_456_789,
            y: 362_436_069,
            z: 521_288_629,
            c: 7_654_321,
        },
    }
}

pub fn encode_config(config: &PopulationConfig) -> Vec<u8> {
    let mut bytes = vec![0u8; 15 * 4];
    config.encode(&mut bytes).unwrap();
    bytes
}

/// Rates region with a single regime per source, cursor at 0.
pub fn encode_single_regime_rates(sources: &[SpikeSourceState]) -> Vec<u8> {
    let mut bytes = Vec::new();
    for state in sources {
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&0u32.to_le_bytes());
        push_source_state(&mut bytes, state);
    }
    bytes
}

pub fn push_source_state(bytes: &mut Vec<u8>, state: &SpikeSourceState) {
    bytes.extend_from_slice(&state.start_ticks.to_le_bytes());
    bytes.extend_from_slice(&state.end_ticks.to_le_bytes());
    bytes.extend_from_slice(&state.next_ticks.to_le_bytes());
    bytes.extend_from_slice(&(state.is_fast_source as u32).to_le_bytes());
    bytes.extend_from_slice(&state.exp_minus_lambda.raw().to_le_bytes());
    bytes.extend_from_slice(&(state.sqrt_lambda.to_raw() as u32).to_le_bytes());
    bytes.extend_from_slice(&state.mean_isi_ticks.to_le_bytes());
    bytes.extend_from_slice(&state.time_to_spike_ticks.to_le_bytes());
}

/// Always-active slow source with the given mean inter-spike interval.
pub fn slow_source(mean_isi_ticks: u32) -> SpikeSourceState {
    SpikeSourceState {
        start_ticks: 0,
        end_ticks: u32::MAX,
        next_ticks: u32::MAX,
        is_fast_source: false,
        mean_isi_ticks,
        ..Default::default()
    }
}

/// Always-active fast source drawing exact Poisson counts.
pub fn fast_source(lambda: f64) -> SpikeSourceState {
    SpikeSourceState {
        start_ticks: 0,
        end_ticks: u32::MAX,
        next_ticks: u32::MAX,
        is_fast_source: true,
        exp_minus_lambda: UFract::from_f64((-lambda).exp()),
        ..Default::default()
    }
}

/// Always-active fast source using the Gaussian approximation.
pub fn gaussian_source(lambda: f64) -> SpikeSourceState {
    SpikeSourceState {
        start_ticks: 0,
        end_ticks: u32::MAX,
        next_ticks: u32::MAX,
        is_fast_source: true,
        sqrt_lambda: Accum::from_f64(lambda.sqrt()),
        ..Default::default()
    }
}

/// Transmitter sink capturing every `(key, count, tick)` packet.
pub struct CollectingTransmitter {
    pub sent: Arc<Mutex<Vec<(u32, u32, u32)>>>,
}

impl CollectingTransmitter {
    pub fn new() -> (Self, Arc<Mutex<Vec<(u32, u32, u32)>>>) {
        let sent = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                sent: Arc::clone(&sent),
            },
            sent,
        )
    }
}

impl SpikeTransmitter for CollectingTransmitter {
    fn send(&mut self, key: u32, count: u32, tick: u32) {
        self.sent.lock().unwrap().push((key, count, tick));
    }
}

/// One recorded frame, detached from the engine's buffer.
#[derive(Debug, Clone)]
pub struct OwnedFrame {
    pub time: u32,
    pub n_layers: u32,
    pub words_per_layer: usize,
    pub layers: Vec<u32>,
}

impl OwnedFrame {
    /// Total events in the frame: each bit in layer `n` stands for the
    /// (n+1)-th event of that source, so summing set bits over all layers
    /// yields the exact event count.
    pub fn total_events(&self) -> u64 {
        self.layers.iter().map(|w| w.count_ones() as u64).sum()
    }
}

/// Recorder sink capturing every flushed frame.
pub struct CollectingRecorder {
    pub frames: Arc<Mutex<Vec<OwnedFrame>>>,
    pub finalized: Arc<Mutex<bool>>,
}

impl CollectingRecorder {
    pub fn new() -> (Self, Arc<Mutex<Vec<OwnedFrame>>>, Arc<Mutex<bool>>) {
        let frames = Arc::new(Mutex::new(Vec::new()));
        let finalized = Arc::new(Mutex::new(false));
        (
            Self {
                frames: Arc::clone(&frames),
                finalized: Arc::clone(&finalized),
            },
            frames,
            finalized,
        )
    }
}

impl SpikeRecorder for CollectingRecorder {
    fn record(&mut self, frame: SpikeFrame<'_>) {
        self.frames.lock().unwrap().push(OwnedFrame {
            time: frame.time,
            n_layers: frame.n_layers,
            words_per_layer: frame.words_per_layer,
            layers: frame.layers.to_vec(),
        });
    }

    fn finalize(&mut self) {
        *self.finalized.lock().unwrap() = true;
    }
}
