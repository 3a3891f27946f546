// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Deterministic random-number core.
//!
//! A 4-word combined generator: a linear-congruential word (x), a shift-xor
//! word (y), and a multiply-with-carry pair (z, c), summed into one 32-bit
//! uniform per draw. All sampling in the engine flows through a single
//! instance on the tick-processing path; replaying a seed and call count
//! reproduces the identical sequence.

/// The 4-word seed. Also the wire layout inside the population
/// configuration region, so the evolved state survives checkpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RngSeed {
    pub x: u32,
    pub y: u32,
    pub z: u32,
    pub c: u32,
}

/// Combined pseudo-random generator producing 32-bit uniforms.
///
/// Not reentrant-safe; owned exclusively by the engine and advanced only
/// from the single tick-processing path.
#[derive(Debug, Clone)]
pub struct SpikeSourceRng {
    x: u32,
    y: u32,
    z: u32,
    c: u32,
}

impl SpikeSourceRng {
    pub fn from_seed(seed: RngSeed) -> Self {
        Self {
            x: seed.x,
            y: seed.y,
            z: seed.z,
            c: seed.c,
        }
    }

    /// Snapshot the current 4-word state for checkpoint write-back.
    pub fn seed(&self) -> RngSeed {
        RngSeed {
            x: self.x,
            y: self.y,
            z: self.z,
            c: self.c,
        }
    }

    /// Advance all three component generators and return their combination.
    #[inline]
    pub fn next_u32(&mut self) -> u32 {
        self.x = self.x.wrapping_mul(314_527_869).wrapping_add(1_234_567);

        self.y ^= self.y << 5;
        self.y ^= self.y >> 7;
        self.y ^= self.y << 22;

        let t = 4_294_584_393u64
            .wrapping_mul(self.z as u64)
            .wrapping_add(self.c as u64);
        self.c = (t >> 32) as u32;
        self.z = t as u32;

        self.x.wrapping_add(self.y).wrapping_add(self.z)
    }
}
