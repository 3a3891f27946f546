// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Engine error taxonomy.
//!
//! Only two kinds of failure are unrecoverable: a malformed/truncated
//! configuration image before ticking begins, and an allocation failure
//! while growing the recording buffer. Everything else (zero rates, regime
//! exhaustion, out-of-range rate-update targets, budget overruns) is defined
//! behavior inside normal control flow and never surfaces as an error.

#[derive(Debug, Clone, thiserror::Error)]
pub enum EngineError {
    #[error("{region} region truncated: need {needed} bytes, have {available}")]
    RegionTooShort {
        region: &'static str,
        needed: usize,
        available: usize,
    },

    #[error("{region} region malformed: {reason}")]
    MalformedRegion {
        region: &'static str,
        reason: String,
    },

    #[error("recording buffer growth failed: could not obtain {bytes} bytes")]
    AllocationFailed { bytes: usize },
}
