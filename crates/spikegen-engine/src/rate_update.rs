// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

/*!
Asynchronous rate-update queue for spike sources.

Externally injected rate changes are pushed here from any thread and applied
by the engine at the start of the next tick. This replaces the original
platform's interrupt-priority serialization with an explicit single-consumer
hand-off: the tick path is the only writer of source state, ever.
*/

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// A single rate-update event as it arrives off the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateUpdate {
    /// Routing key; the target source id is `key & set_rate_source_id_mask`.
    pub key: u32,
    /// Raw s16.15 rate in Hz.
    pub payload: u32,
}

/// Thread-safe queue for rate updates.
///
/// - Producer side: pushes updates (non-blocking, just a mutex on the queue)
/// - Engine side: drains all pending updates between ticks
pub struct RateUpdateQueue {
    queue: Arc<Mutex<VecDeque<RateUpdate>>>,
}

impl RateUpdateQueue {
    pub fn new() -> Self {
        Self {
            queue: Arc::new(Mutex::new(VecDeque::with_capacity(16))),
        }
    }

    /// Push a rate update (non-blocking, called from any thread).
    pub fn push(&self, update: RateUpdate) {
        self.queue.lock().unwrap().push_back(update);
    }

    /// Drain all pending updates (called from the tick path between ticks).
    pub fn drain_all(&self) -> Vec<RateUpdate> {
        self.queue.lock().unwrap().drain(..).collect()
    }

    /// Number of rate updates waiting for the next tick.
    pub fn len(&self) -> usize {
        self.queue.lock().unwrap().len()
    }

    /// Whether any rate updates are pending. The tick path checks this
    /// before taking the drain path at all.
    pub fn is_empty(&self) -> bool {
        self.queue.lock().unwrap().is_empty()
    }
}

impl Default for RateUpdateQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for RateUpdateQueue {
    fn clone(&self) -> Self {
        Self {
            queue: Arc::clone(&self.queue),
        }
    }
}
