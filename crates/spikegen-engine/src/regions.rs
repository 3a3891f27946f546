// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Fixed-layout codec for the node's shared-memory regions.
//!
//! All three regions are little-endian word streams with no framing beyond
//! the layouts below; the engine re-reads them in full at load/resume and
//! writes them back byte-identically (bar evolved state) at checkpoint time.
//!
//! - population configuration: 15 words,
//! - rate schedules: per source `n_rates`, `cursor`, then `n_rates` inline
//!   8-word source descriptors,
//! - synaptic transfer: 3 header words, then one u16 weight per source.

use byteorder::{ByteOrder, LittleEndian};
use spikegen_core::{Accum, RngSeed, SpikeSourceState, UFract};

use crate::error::EngineError;

/// Owned images of the shared-memory regions the engine was loaded from.
/// Checkpoint save writes evolved state back into these; the host reads
/// them out after suspend.
#[derive(Debug, Clone, Default)]
pub struct RegionImages {
    pub config: Vec<u8>,
    pub rates: Vec<u8>,
    pub synaptic: Vec<u8>,
}

/// Immutable-per-run population configuration (15 words on the wire).
///
/// The seed words keep evolving via the RNG while the engine runs, so the
/// stored copy is stale except immediately after checkpoint write-back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PopulationConfig {
    /// Whether spikes are transmitted to the fabric at all.
    pub has_key: bool,
    /// Base transmission key; the source id is OR-ed in per packet.
    pub key: u32,
    /// Mask extracting the target source id from a rate-update key.
    pub set_rate_source_id_mask: u32,
    /// Tick duration in seconds (u0.32).
    pub seconds_per_tick: UFract,
    pub ticks_per_second: u32,
    /// Rate-per-tick border between slow and fast sources.
    pub slow_rate_per_tick_cutoff: Accum,
    /// Rate-per-tick border between fast and Gaussian-approximated sources.
    pub fast_rate_per_tick_cutoff: Accum,
    /// Id of the first source relative to the population as a whole.
    pub first_source_id: u32,
    pub n_sources: u32,
    /// Expected peak spikes per tick; initial recording-buffer capacity.
    pub max_spikes_per_tick: u32,
    pub seed: RngSeed,
}

#[cfg(test)]
pub(crate) const CONFIG_BYTES: usize = 15 * 4;
#[cfg(test)]
pub(crate) const SOURCE_STATE_WORDS: usize = 8;

impl PopulationConfig {
    pub fn decode(bytes: &[u8]) -> Result<Self, EngineError> {
        let mut r = RegionReader::new("population-config", bytes);
        let config = PopulationConfig {
            has_key: r.read_u32()? != 0,
            key: r.read_u32()?,
            set_rate_source_id_mask: r.read_u32()?,
            seconds_per_tick: UFract::from_raw(r.read_u32()?),
            ticks_per_second: r.read_u32()?,
            slow_rate_per_tick_cutoff: Accum::from_raw(r.read_u32()? as i32),
            fast_rate_per_tick_cutoff: Accum::from_raw(r.read_u32()? as i32),
            first_source_id: r.read_u32()?,
            n_sources: r.read_u32()?,
            max_spikes_per_tick: r.read_u32()?,
            seed: RngSeed {
                x: r.read_u32()?,
                y: r.read_u32()?,
                z: r.read_u32()?,
                c: r.read_u32()?,
            },
        };
        Ok(config)
    }

    pub fn encode(&self, bytes: &mut [u8]) -> Result<(), EngineError> {
        let mut w = RegionWriter::new("population-config", bytes);
        w.write_u32(self.has_key as u32)?;
        w.write_u32(self.key)?;
        w.write_u32(self.set_rate_source_id_mask)?;
        w.write_u32(self.seconds_per_tick.raw())?;
        w.write_u32(self.ticks_per_second)?;
        w.write_u32(self.slow_rate_per_tick_cutoff.to_raw() as u32)?;
        w.write_u32(self.fast_rate_per_tick_cutoff.to_raw() as u32)?;
        w.write_u32(self.first_source_id)?;
        w.write_u32(self.n_sources)?;
        w.write_u32(self.max_spikes_per_tick)?;
        w.write_u32(self.seed.x)?;
        w.write_u32(self.seed.y)?;
        w.write_u32(self.seed.z)?;
        w.write_u32(self.seed.c)?;
        Ok(())
    }
}

/// Synaptic-transfer descriptor: where (and whether) per-tick weighted
/// counts are shipped, plus the per-source weight table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynapticTransferConfig {
    /// Whether a transfer target is configured at all.
    pub has_target: bool,
    /// Size of the transfer buffer in bytes (u16 elements x 2).
    pub size_in_bytes: u32,
    /// Element offset of this population's first slot in the buffer.
    pub offset: u32,
    /// Weight accumulated per event, one entry per source.
    pub weights: Vec<u16>,
}

impl SynapticTransferConfig {
    /// Decode the transfer region; an empty region means synaptic injection
    /// is not configured for this node.
    pub fn decode(bytes: &[u8], n_sources: u32) -> Result<Option<Self>, EngineError> {
        if bytes.is_empty() {
            return Ok(None);
        }

        let mut r = RegionReader::new("synaptic-transfer", bytes);
        let has_target = r.read_u32()? != 0;
        let size_in_bytes = r.read_u32()?;
        let offset = r.read_u32()?;
        let mut weights = Vec::with_capacity(n_sources as usize);
        for _ in 0..n_sources {
            weights.push(r.read_u16()?);
        }

        let config = SynapticTransferConfig {
            has_target,
            size_in_bytes,
            offset,
            weights,
        };
        if config.is_enabled() {
            let elements = (size_in_bytes / 2) as u64;
            let needed = offset as u64 + n_sources as u64;
            if needed > elements {
                return Err(EngineError::MalformedRegion {
                    region: "synaptic-transfer",
                    reason: format!(
                        "offset {offset} + {n_sources} sources exceeds {elements} buffer elements"
                    ),
                });
            }
        }
        Ok(Some(config))
    }

    /// Whether per-tick accumulation and transfer should happen at all.
    pub fn is_enabled(&self) -> bool {
        self.has_target && self.size_in_bytes != 0
    }
}

pub(crate) fn read_source_state(r: &mut RegionReader<'_>) -> Result<SpikeSourceState, EngineError> {
    Ok(SpikeSourceState {
        start_ticks: r.read_u32()?,
        end_ticks: r.read_u32()?,
        next_ticks: r.read_u32()?,
        is_fast_source: r.read_u32()? != 0,
        exp_minus_lambda: UFract::from_raw(r.read_u32()?),
        sqrt_lambda: Accum::from_raw(r.read_u32()? as i32),
        mean_isi_ticks: r.read_u32()?,
        time_to_spike_ticks: r.read_u32()?,
    })
}

pub(crate) fn write_source_state(
    w: &mut RegionWriter<'_>,
    state: &SpikeSourceState,
) -> Result<(), EngineError> {
    w.write_u32(state.start_ticks)?;
    w.write_u32(state.end_ticks)?;
    w.write_u32(state.next_ticks)?;
    w.write_u32(state.is_fast_source as u32)?;
    w.write_u32(state.exp_minus_lambda.raw())?;
    w.write_u32(state.sqrt_lambda.to_raw() as u32)?;
    w.write_u32(state.mean_isi_ticks)?;
    w.write_u32(state.time_to_spike_ticks)?;
    Ok(())
}

/// Little-endian word cursor over a region image.
pub(crate) struct RegionReader<'a> {
    region: &'static str,
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> RegionReader<'a> {
    pub(crate) fn new(region: &'static str, bytes: &'a [u8]) -> Self {
        Self {
            region,
            bytes,
            pos: 0,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], EngineError> {
        let end = self.pos + n;
        if end > self.bytes.len() {
            return Err(EngineError::RegionTooShort {
                region: self.region,
                needed: end,
                available: self.bytes.len(),
            });
        }
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn read_u32(&mut self) -> Result<u32, EngineError> {
        let b = self.take(4)?;
        Ok(LittleEndian::read_u32(b))
    }

    pub(crate) fn read_u16(&mut self) -> Result<u16, EngineError> {
        let b = self.take(2)?;
        Ok(LittleEndian::read_u16(b))
    }
}

/// Little-endian word cursor writing back into a region image.
pub(crate) struct RegionWriter<'a> {
    region: &'static str,
    bytes: &'a mut [u8],
    pos: usize,
}

impl<'a> RegionWriter<'a> {
    pub(crate) fn new(region: &'static str, bytes: &'a mut [u8]) -> Self {
        Self {
            region,
            bytes,
            pos: 0,
        }
    }

    pub(crate) fn write_u32(&mut self, value: u32) -> Result<(), EngineError> {
        let end = self.pos + 4;
        if end > self.bytes.len() {
            return Err(EngineError::RegionTooShort {
                region: self.region,
                needed: end,
                available: self.bytes.len(),
            });
        }
        LittleEndian::write_u32(&mut self.bytes[self.pos..end], value);
        self.pos = end;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_config() -> PopulationConfig {
        PopulationConfig {
            has_key: true,
            key: 0x0001_0000,
            set_rate_source_id_mask: 0xFF,
            seconds_per_tick: UFract::from_f64(0.001),
            ticks_per_second: 1000,
            slow_rate_per_tick_cutoff: Accum::from_f64(0.01),
            fast_rate_per_tick_cutoff: Accum::from_f64(10.0),
            first_source_id: 0,
            n_sources: 4,
            max_spikes_per_tick: 1,
            seed: RngSeed {
                x: 1,
                y: 2,
                z: 3,
                c: 4,
            },
        }
    }

    #[test]
    fn config_round_trips_byte_identically() {
        let config = sample_config();
        let mut bytes = vec![0u8; CONFIG_BYTES];
        config.encode(&mut bytes).unwrap();
        let decoded = PopulationConfig::decode(&bytes).unwrap();
        assert_eq!(decoded, config);

        let mut again = vec![0u8; CONFIG_BYTES];
        decoded.encode(&mut again).unwrap();
        assert_eq!(bytes, again);
    }

    #[test]
    fn truncated_config_is_an_error() {
        let err = PopulationConfig::decode(&[0u8; 10]).unwrap_err();
        assert!(matches!(err, EngineError::RegionTooShort { .. }));
    }

    #[test]
    fn source_state_round_trips() {
        let state = SpikeSourceState {
            start_ticks: 5,
            end_ticks: 500,
            next_ticks: 200,
            is_fast_source: true,
            exp_minus_lambda: UFract::from_f64(0.2),
            sqrt_lambda: Accum::from_f64(3.5),
            mean_isi_ticks: 0,
            time_to_spike_ticks: 0,
        };
        let mut bytes = vec![0u8; SOURCE_STATE_WORDS * 4];
        write_source_state(&mut RegionWriter::new("rates", &mut bytes), &state).unwrap();
        let decoded = read_source_state(&mut RegionReader::new("rates", &bytes)).unwrap();
        assert_eq!(decoded, state);
    }

    #[test]
    fn empty_synaptic_region_means_not_configured() {
        assert!(SynapticTransferConfig::decode(&[], 4).unwrap().is_none());
    }

    #[test]
    fn synaptic_region_with_overflowing_offset_is_malformed() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes()); // has_target
        bytes.extend_from_slice(&8u32.to_le_bytes()); // 4 elements
        bytes.extend_from_slice(&2u32.to_le_bytes()); // offset 2 + 4 sources > 4
        for w in [1u16, 2, 3, 4] {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        let err = SynapticTransferConfig::decode(&bytes, 4).unwrap_err();
        assert!(matches!(err, EngineError::MalformedRegion { .. }));
    }

    #[test]
    fn synaptic_region_decodes_weights() {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&1u32.to_le_bytes());
        bytes.extend_from_slice(&16u32.to_le_bytes()); // 8 elements
        bytes.extend_from_slice(&2u32.to_le_bytes());
        for w in [10u16, 20, 30, 40] {
            bytes.extend_from_slice(&w.to_le_bytes());
        }
        let config = SynapticTransferConfig::decode(&bytes, 4).unwrap().unwrap();
        assert!(config.is_enabled());
        assert_eq!(config.offset, 2);
        assert_eq!(config.weights, vec![10, 20, 30, 40]);
    }
}
