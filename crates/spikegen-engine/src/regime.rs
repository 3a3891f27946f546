// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-source rate-regime schedules.
//!
//! Each source owns an ordered sequence of time-windowed rate descriptors
//! plus a cursor. The cursor only moves forward, a regime is loaded at most
//! once per activation, and exhausting a sequence leaves its last regime
//! active indefinitely.

use spikegen_core::{sampler, SpikeSourceRng, SpikeSourceState};
use tracing::debug;

use crate::error::EngineError;
use crate::regions::{read_source_state, write_source_state, RegionReader, RegionWriter};

/// All sources' regime sequences, decoded once from the rates region.
#[derive(Debug, Clone)]
pub struct RegimeSchedule {
    sequences: Vec<SourceSequence>,
}

#[derive(Debug, Clone)]
struct SourceSequence {
    regimes: Vec<SpikeSourceState>,
    cursor: usize,
}

impl RegimeSchedule {
    /// Decode the self-describing per-source sequences; they are laid out
    /// back to back, so base offsets fall out of one sequential read.
    pub fn decode(bytes: &[u8], n_sources: u32) -> Result<Self, EngineError> {
        let mut r = RegionReader::new("rate-schedule", bytes);
        let mut sequences = Vec::with_capacity(n_sources as usize);

        for source_id in 0..n_sources {
            let n_rates = r.read_u32()?;
            let cursor = r.read_u32()? as usize;
            if n_rates == 0 {
                return Err(EngineError::MalformedRegion {
                    region: "rate-schedule",
                    reason: format!("source {source_id} has an empty regime sequence"),
                });
            }
            if cursor >= n_rates as usize {
                return Err(EngineError::MalformedRegion {
                    region: "rate-schedule",
                    reason: format!(
                        "source {source_id} cursor {cursor} out of range (n_rates {n_rates})"
                    ),
                });
            }

            let mut regimes = Vec::with_capacity(n_rates as usize);
            for _ in 0..n_rates {
                regimes.push(read_source_state(&mut r)?);
            }
            // Windows must be in time order and non-overlapping.
            for pair in regimes.windows(2) {
                if pair[1].start_ticks < pair[0].end_ticks {
                    return Err(EngineError::MalformedRegion {
                        region: "rate-schedule",
                        reason: format!(
                            "source {source_id} regime windows overlap or run backwards"
                        ),
                    });
                }
            }
            sequences.push(SourceSequence { regimes, cursor });
        }

        Ok(Self { sequences })
    }

    /// Write every sequence (counts, cursors, descriptors) back into the
    /// rates image in the layout it was decoded from.
    pub fn encode_into(&self, bytes: &mut [u8]) -> Result<(), EngineError> {
        let mut w = RegionWriter::new("rate-schedule", bytes);
        for seq in &self.sequences {
            w.write_u32(seq.regimes.len() as u32)?;
            w.write_u32(seq.cursor as u32)?;
            for regime in &seq.regimes {
                write_source_state(&mut w, regime)?;
            }
        }
        Ok(())
    }

    pub fn n_sources(&self) -> usize {
        self.sequences.len()
    }

    /// The regime the cursor currently points at.
    pub fn active(&self, source_id: usize) -> &SpikeSourceState {
        let seq = &self.sequences[source_id];
        &seq.regimes[seq.cursor]
    }

    pub fn cursor(&self, source_id: usize) -> usize {
        self.sequences[source_id].cursor
    }

    /// Persist a source's live state into its active regime slot
    /// (checkpoint write-back path).
    pub fn store_live(&mut self, source_id: usize, live: &SpikeSourceState) {
        let seq = &mut self.sequences[source_id];
        seq.regimes[seq.cursor] = *live;
    }

    /// Advance the cursor when the next regime is due at `time + 1`, copying
    /// the newly loaded regime into `live`. A slow regime persisted with a
    /// zero time-to-spike gets a fresh draw so the source does not stall.
    ///
    /// Returns whether an advancement happened. Called strictly after the
    /// source's sampling for the current tick, so a newly loaded regime
    /// never affects the tick that triggered its load.
    pub fn advance_if_due(
        &mut self,
        source_id: usize,
        time: u32,
        live: &mut SpikeSourceState,
        rng: &mut SpikeSourceRng,
    ) -> bool {
        if time.wrapping_add(1) < live.next_ticks {
            return false;
        }
        let seq = &mut self.sequences[source_id];
        if seq.cursor + 1 >= seq.regimes.len() {
            // Sequence exhausted: the last regime stays active.
            return false;
        }

        seq.cursor += 1;
        *live = seq.regimes[seq.cursor];
        if !live.is_fast_source && live.mean_isi_ticks != 0 && live.time_to_spike_ticks == 0 {
            live.time_to_spike_ticks = sampler::slow_time_to_spike(rng, live.mean_isi_ticks);
        }
        debug!(source_id, time, cursor = seq.cursor, "moved to next rate");
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use spikegen_core::RngSeed;

    fn encode_sequences(sequences: &[(u32, Vec<SpikeSourceState>)]) -> Vec<u8> {
        let mut bytes = Vec::new();
        for (cursor, regimes) in sequences {
            bytes.extend_from_slice(&(regimes.len() as u32).to_le_bytes());
            bytes.extend_from_slice(&cursor.to_le_bytes());
            for regime in regimes {
                let mut buf = vec![0u8; 32];
                write_source_state(&mut RegionWriter::new("rate-schedule", &mut buf), regime)
                    .unwrap();
                bytes.extend_from_slice(&buf);
            }
        }
        bytes
    }

    fn regime(start: u32, end: u32, next: u32) -> SpikeSourceState {
        SpikeSourceState {
            start_ticks: start,
            end_ticks: end,
            next_ticks: next,
            is_fast_source: true,
            ..Default::default()
        }
    }

    fn rng() -> SpikeSourceRng {
        SpikeSourceRng::from_seed(RngSeed {
            x: 9,
            y: 8,
            z: 7,
            c: 6,
        })
    }

    #[test]
    fn decode_walks_sequences_back_to_back() {
        let bytes = encode_sequences(&[
            (0, vec![regime(0, 10, 10), regime(10, 20, u32::MAX)]),
            (0, vec![regime(0, u32::MAX, u32::MAX)]),
        ]);
        let schedule = RegimeSchedule::decode(&bytes, 2).unwrap();
        assert_eq!(schedule.n_sources(), 2);
        assert_eq!(schedule.active(0).end_ticks, 10);
        assert_eq!(schedule.active(1).end_ticks, u32::MAX);
    }

    #[test]
    fn decode_rejects_out_of_range_cursor() {
        let bytes = encode_sequences(&[(3, vec![regime(0, 10, 10)])]);
        let err = RegimeSchedule::decode(&bytes, 1).unwrap_err();
        assert!(matches!(err, EngineError::MalformedRegion { .. }));
    }

    #[test]
    fn decode_rejects_overlapping_windows() {
        // Second window starts before the first one ends.
        let bytes = encode_sequences(&[(0, vec![regime(0, 15, 10), regime(10, 20, u32::MAX)])]);
        let err = RegimeSchedule::decode(&bytes, 1).unwrap_err();
        assert!(matches!(err, EngineError::MalformedRegion { .. }));

        // Windows in reverse time order are rejected the same way.
        let bytes = encode_sequences(&[(0, vec![regime(20, 30, 10), regime(0, 10, u32::MAX)])]);
        let err = RegimeSchedule::decode(&bytes, 1).unwrap_err();
        assert!(matches!(err, EngineError::MalformedRegion { .. }));
    }

    #[test]
    fn advance_only_when_due_and_cursor_is_monotonic() {
        let bytes = encode_sequences(&[(
            0,
            vec![regime(0, 10, 10), regime(10, 20, 20), regime(20, 30, u32::MAX)],
        )]);
        let mut schedule = RegimeSchedule::decode(&bytes, 1).unwrap();
        let mut live = *schedule.active(0);
        let mut r = rng();

        assert!(!schedule.advance_if_due(0, 5, &mut live, &mut r));
        assert_eq!(schedule.cursor(0), 0);

        assert!(schedule.advance_if_due(0, 9, &mut live, &mut r));
        assert_eq!(schedule.cursor(0), 1);
        assert_eq!(live.start_ticks, 10);

        assert!(schedule.advance_if_due(0, 19, &mut live, &mut r));
        assert_eq!(schedule.cursor(0), 2);
    }

    #[test]
    fn exhausted_sequence_keeps_last_regime() {
        let bytes = encode_sequences(&[(0, vec![regime(0, 10, 10), regime(10, 20, 20)])]);
        let mut schedule = RegimeSchedule::decode(&bytes, 1).unwrap();
        let mut live = *schedule.active(0);
        let mut r = rng();

        assert!(schedule.advance_if_due(0, 9, &mut live, &mut r));
        let before = live;
        // Due again, but nothing left to load.
        assert!(!schedule.advance_if_due(0, 19, &mut live, &mut r));
        assert!(!schedule.advance_if_due(0, 100, &mut live, &mut r));
        assert_eq!(live, before);
        assert_eq!(schedule.cursor(0), 1);
    }

    #[test]
    fn advancing_into_a_slow_regime_draws_a_time_to_spike() {
        let slow = SpikeSourceState {
            start_ticks: 10,
            end_ticks: 100,
            next_ticks: u32::MAX,
            is_fast_source: false,
            mean_isi_ticks: 10,
            time_to_spike_ticks: 0,
            ..Default::default()
        };
        let bytes = encode_sequences(&[(0, vec![regime(0, 10, 10), slow])]);
        let mut schedule = RegimeSchedule::decode(&bytes, 1).unwrap();
        let mut live = *schedule.active(0);
        let mut r = rng();

        assert!(schedule.advance_if_due(0, 9, &mut live, &mut r));
        assert!(!live.is_fast_source);
        assert!(live.time_to_spike_ticks > 0, "slow source must not stall");
    }

    #[test]
    fn encode_reflects_updated_cursor_and_live_state() {
        let bytes = encode_sequences(&[(0, vec![regime(0, 10, 10), regime(10, 20, u32::MAX)])]);
        let mut schedule = RegimeSchedule::decode(&bytes, 1).unwrap();
        let mut live = *schedule.active(0);
        let mut r = rng();
        schedule.advance_if_due(0, 9, &mut live, &mut r);
        live.time_to_spike_ticks = 777;
        schedule.store_live(0, &live);

        let mut out = vec![0u8; bytes.len()];
        schedule.encode_into(&mut out).unwrap();
        let reloaded = RegimeSchedule::decode(&out, 1).unwrap();
        assert_eq!(reloaded.cursor(0), 1);
        assert_eq!(reloaded.active(0).time_to_spike_ticks, 777);
    }
}
