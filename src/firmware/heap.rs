use log::info;

use crate::{resources::HeapProbe, types::ResourceSnapshot};

/// Internal DRAM heap; esp-radio needs a share of it.
pub const HEAP_BYTES: usize = 96 * 1024;

/// Probe over the global `esp_alloc` heap.
///
/// The allocator frees eagerly, so a collection pass only records the
/// high-water mark and reports it.
#[derive(Debug, Default)]
pub struct EspHeap {
    peak_used_bytes: usize,
}

impl EspHeap {
    pub const fn new() -> Self {
        Self { peak_used_bytes: 0 }
    }

    pub fn peak_used_bytes(&self) -> usize {
        self.peak_used_bytes
    }
}

impl HeapProbe for EspHeap {
    fn sample(&self) -> ResourceSnapshot {
        ResourceSnapshot {
            free_bytes: esp_alloc::HEAP.free(),
            allocated_bytes: esp_alloc::HEAP.used(),
        }
    }

    fn reclaim(&mut self) {
        let used = esp_alloc::HEAP.used();
        if used > self.peak_used_bytes {
            self.peak_used_bytes = used;
        }
        info!(
            "heap: free={} used={} peak={}",
            esp_alloc::HEAP.free(),
            used,
            self.peak_used_bytes
        );
    }
}
