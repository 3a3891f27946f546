// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Output seams to the node's external collaborators.
//!
//! The time-slotted packet fabric, the recording persistence mechanism, and
//! the asynchronous synaptic-transfer machinery all live outside this crate;
//! the engine only needs their call contracts. Trait objects are handed to
//! the engine at load time and driven from the tick path.

/// One recorded tick: timestamp plus a stack of fixed-width bitmaps. Bit
/// `i` set in layer `n` means source `i` emitted at least `n + 1` events
/// this tick.
#[derive(Debug, Clone, Copy)]
pub struct SpikeFrame<'a> {
    pub time: u32,
    pub n_layers: u32,
    /// `n_layers` concatenated bitmaps of `words_per_layer` words each.
    pub layers: &'a [u32],
    pub words_per_layer: usize,
}

impl SpikeFrame<'_> {
    /// Whether `source_id` reached at least `count` events in this frame.
    pub fn is_set(&self, source_id: u32, count: u32) -> bool {
        if count == 0 || count > self.n_layers {
            return false;
        }
        let layer = &self.layers[(count as usize - 1) * self.words_per_layer..];
        layer[source_id as usize / 32] & (1 << (source_id % 32)) != 0
    }
}

/// The time-slotted transmission facility: one packet per nonzero-count
/// source per tick, payload carrying the count. Emission ordering within
/// the tick is the facility's business.
pub trait SpikeTransmitter: Send {
    fn send(&mut self, key: u32, count: u32, tick: u32);

    /// Called once at the start of every processed tick, before any `send`.
    fn reset_phase(&mut self) {}
}

/// The recording persistence facility consuming one frame per tick.
pub trait SpikeRecorder: Send {
    fn record(&mut self, frame: SpikeFrame<'_>);

    /// Called once when the tick horizon is reached, before suspending.
    fn finalize(&mut self) {}
}

/// The asynchronous transfer mechanism receiving the per-tick synaptic
/// accumulator after sampling completes.
pub trait SynapticWriter: Send {
    fn transfer(&mut self, accumulator: &[u16]);
}
