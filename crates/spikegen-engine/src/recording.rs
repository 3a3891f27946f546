// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Spike-recording buffer manager.
//!
//! A growable bitmap-of-counts frame: one fixed-width bitmap layer per
//! concurrent spike count, one bit per source. Capacity only grows for the
//! lifetime of a run, amortizing reallocation against roughly stable peak
//! counts per tick; flushing clears the layers without shrinking.

use tracing::debug;

use crate::error::EngineError;
use crate::output::{SpikeFrame, SpikeRecorder};

/// Words needed for one bit per source.
fn bit_field_words(n_sources: u32) -> usize {
    (n_sources as usize + 31) / 32
}

#[derive(Debug, Clone)]
pub struct SpikeRecordingBuffer {
    enabled: bool,
    words_per_layer: usize,
    layers_allocated: usize,
    /// Highest count marked since the last flush.
    layers_used: usize,
    bits: Vec<u32>,
}

impl SpikeRecordingBuffer {
    /// `max_spikes_hint` pre-sizes the layer stack so the common case never
    /// reallocates mid-run.
    pub fn new(n_sources: u32, max_spikes_hint: u32, enabled: bool) -> Result<Self, EngineError> {
        let mut buffer = Self {
            enabled,
            words_per_layer: bit_field_words(n_sources),
            layers_allocated: 0,
            layers_used: 0,
            bits: Vec::new(),
        };
        if enabled && max_spikes_hint > 0 {
            buffer.grow(max_spikes_hint as usize)?;
        }
        Ok(buffer)
    }

    pub fn layers_allocated(&self) -> usize {
        self.layers_allocated
    }

    /// Reallocate to `layers` layers: zero-filled new region, old contents
    /// preserved. Never shrinks.
    fn grow(&mut self, layers: usize) -> Result<(), EngineError> {
        let words = layers * self.words_per_layer;
        let mut next = Vec::new();
        next.try_reserve_exact(words)
            .map_err(|_| EngineError::AllocationFailed { bytes: words * 4 })?;
        next.extend_from_slice(&self.bits);
        next.resize(words, 0);
        self.bits = next;
        debug!(
            from = self.layers_allocated,
            to = layers,
            "expanded spike recording buffer"
        );
        self.layers_allocated = layers;
        Ok(())
    }

    /// Record that `source_id` emitted `count` events this tick: sets bit
    /// `source_id` in layers `0..count`, growing the stack on demand.
    pub fn mark(&mut self, source_id: u32, count: u32) -> Result<(), EngineError> {
        if !self.enabled || count == 0 {
            return Ok(());
        }
        if self.layers_allocated < count as usize {
            self.grow(count as usize)?;
        }
        if self.layers_used < count as usize {
            self.layers_used = count as usize;
        }
        let word = source_id as usize / 32;
        let bit = 1u32 << (source_id % 32);
        for layer in 0..count as usize {
            self.bits[layer * self.words_per_layer + word] |= bit;
        }
        Ok(())
    }

    /// Hand the frame for `time` to the recorder if anything was marked,
    /// then clear all layers (capacity kept).
    pub fn flush(&mut self, time: u32, recorder: &mut dyn SpikeRecorder) {
        if !self.enabled || self.layers_used == 0 {
            return;
        }
        let used_words = self.layers_used * self.words_per_layer;
        recorder.record(SpikeFrame {
            time,
            n_layers: self.layers_used as u32,
            layers: &self.bits[..used_words],
            words_per_layer: self.words_per_layer,
        });
        self.reset();
    }

    /// Clear all layers and the used-layer count without shrinking capacity.
    pub fn reset(&mut self) {
        self.layers_used = 0;
        self.bits.fill(0);
    }
}
