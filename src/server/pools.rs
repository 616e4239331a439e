// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Bounded read/write I/O gates.
//!
//! The split mirrors the two worker pools of the design: a slow client
//! stuck on writes cannot starve reads for everyone else, because write
//! work and read work draw from separate permit sets. Saturation is a
//! reject, not a wait; the affected connection closes to shed load
//! instead of queuing unboundedly.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::warn;

use crate::cfg::config::RuntimeConfig;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("{pool} pool saturated")]
pub struct PoolSaturated {
    pub pool: &'static str,
}

/// One bounded pool. A task must hold a permit for the whole unit of
/// work (decode→route→enqueue on the read side, one queue drain on the
/// write side).
pub struct PoolGate {
    name: &'static str,
    sem: Arc<Semaphore>,
}

impl PoolGate {
    fn new(name: &'static str, capacity: usize) -> Self {
        Self { name, sem: Arc::new(Semaphore::new(capacity)) }
    }

    pub fn admit(&self) -> Result<OwnedSemaphorePermit, PoolSaturated> {
        match Arc::clone(&self.sem).try_acquire_owned() {
            Ok(permit) => Ok(permit),
            Err(_) => {
                warn!(pool = self.name, "worker pool saturated, shedding load");
                Err(PoolSaturated { pool: self.name })
            },
        }
    }
}

pub struct IoPools {
    pub read: PoolGate,
    pub write: PoolGate,
}

impl IoPools {
    pub fn new(runtime: &RuntimeConfig) -> Self {
        Self {
            read: PoolGate::new("read", runtime.read_workers),
            write: PoolGate::new("write", runtime.write_workers),
        }
    }
}
