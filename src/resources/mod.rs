//! Heap pressure checks and collection passes.

use log::{info, warn};

use crate::{clock::elapsed_ms, types::ResourceSnapshot};

pub trait HeapProbe {
    fn sample(&self) -> ResourceSnapshot;

    /// Returns cached or fragmented memory to the allocator, if the platform
    /// can. The default allocator frees eagerly, so this may be a no-op.
    fn reclaim(&mut self);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pressure {
    Ok(ResourceSnapshot),
    LowMemory(ResourceSnapshot),
}

impl Pressure {
    pub const fn snapshot(self) -> ResourceSnapshot {
        match self {
            Self::Ok(snapshot) | Self::LowMemory(snapshot) => snapshot,
        }
    }

    pub const fn is_low(self) -> bool {
        matches!(self, Self::LowMemory(_))
    }
}

pub struct ResourceMonitor<H> {
    heap: H,
    min_free_bytes: usize,
    collect_interval_ms: u64,
    last_collect_ms: u64,
    collections: u32,
}

impl<H: HeapProbe> ResourceMonitor<H> {
    pub fn new(heap: H, min_free_bytes: usize, collect_interval_ms: u64, now_ms: u64) -> Self {
        Self {
            heap,
            min_free_bytes,
            collect_interval_ms,
            last_collect_ms: now_ms,
            collections: 0,
        }
    }

    pub fn snapshot(&self) -> ResourceSnapshot {
        self.heap.sample()
    }

    pub fn check_pressure(&self) -> Pressure {
        let snapshot = self.heap.sample();
        if snapshot.free_bytes < self.min_free_bytes {
            warn!(
                "mem: low free={} min={}",
                snapshot.free_bytes, self.min_free_bytes
            );
            Pressure::LowMemory(snapshot)
        } else {
            Pressure::Ok(snapshot)
        }
    }

    pub fn collect(&mut self, now_ms: u64) -> ResourceSnapshot {
        let before = self.heap.sample();
        self.heap.reclaim();
        let after = self.heap.sample();
        self.last_collect_ms = now_ms;
        self.collections = self.collections.saturating_add(1);
        info!(
            "mem: collect free_before={} free_after={} allocated={}",
            before.free_bytes, after.free_bytes, after.allocated_bytes
        );
        after
    }

    /// Collects once the interval since the last pass has strictly elapsed.
    pub fn maybe_periodic_collect(&mut self, now_ms: u64) -> bool {
        if elapsed_ms(now_ms, self.last_collect_ms) > self.collect_interval_ms {
            self.collect(now_ms);
            true
        } else {
            false
        }
    }

    pub fn collections(&self) -> u32 {
        self.collections
    }

    pub fn last_collect_ms(&self) -> u64 {
        self.last_collect_ms
    }
}
