//! Heap accounting for the JavaScript runtime.
//!
//! Objects are reclaimed by reference counting, so the heap does not own memory. It keeps a
//! running estimate of what scripts have allocated and refuses allocations past the limit.

use crate::runner::ds::error::JErrorType;

/// Estimated footprint of an object header with its property tables.
pub const OBJECT_HEADER_BYTES: usize = 64;
/// Estimated footprint of one property slot.
pub const PROPERTY_SLOT_BYTES: usize = 32;

/// Configuration for the heap manager.
#[derive(Debug, Clone, PartialEq)]
pub struct HeapConfig {
    /// Maximum heap size in bytes. None means unlimited.
    pub max_bytes: Option<usize>,
}

impl HeapConfig {
    /// Create a new heap configuration with no memory limit.
    pub fn unlimited() -> Self {
        HeapConfig { max_bytes: None }
    }

    /// Create a new heap configuration with a memory limit.
    pub fn with_limit(max_bytes: usize) -> Self {
        HeapConfig {
            max_bytes: Some(max_bytes),
        }
    }
}

impl Default for HeapConfig {
    fn default() -> Self {
        Self::unlimited()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HeapStats {
    pub objects: usize,
    pub bytes: usize,
}

#[derive(Debug)]
pub struct Heap {
    config: HeapConfig,
    stats: HeapStats,
}

impl Heap {
    pub fn new(config: HeapConfig) -> Self {
        Heap {
            config,
            stats: HeapStats::default(),
        }
    }

    /// Accounts for a new object with room for `slots` properties.
    ///
    /// Fails with `RangeError("Out of memory")` once the configured limit would be exceeded.
    pub fn allocate_object(&mut self, slots: usize) -> Result<(), JErrorType> {
        let bytes = OBJECT_HEADER_BYTES + slots * PROPERTY_SLOT_BYTES;
        if !self.can_allocate(bytes) {
            log::debug!(
                "heap limit reached: {} + {} > {:?}",
                self.stats.bytes,
                bytes,
                self.config.max_bytes
            );
            return Err(JErrorType::RangeError("Out of memory".to_string()));
        }
        self.stats.bytes += bytes;
        self.stats.objects += 1;
        Ok(())
    }

    pub fn can_allocate(&self, bytes: usize) -> bool {
        match self.config.max_bytes {
            Some(max_bytes) => self.stats.bytes + bytes <= max_bytes,
            None => true,
        }
    }

    pub fn stats(&self) -> HeapStats {
        self.stats
    }

    pub fn available_bytes(&self) -> Option<usize> {
        self.config
            .max_bytes
            .map(|max| max.saturating_sub(self.stats.bytes))
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new(HeapConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_unlimited() {
        let mut heap = Heap::new(HeapConfig::unlimited());
        for _ in 0..1000 {
            assert!(heap.allocate_object(8).is_ok());
        }
        assert_eq!(heap.stats().objects, 1000);
        assert_eq!(heap.available_bytes(), None);
    }

    #[test]
    fn test_heap_limited() {
        let one = OBJECT_HEADER_BYTES + 2 * PROPERTY_SLOT_BYTES;
        let mut heap = Heap::new(HeapConfig::with_limit(one * 2));
        assert!(heap.allocate_object(2).is_ok());
        assert!(heap.allocate_object(2).is_ok());
        assert_eq!(heap.available_bytes(), Some(0));

        let result = heap.allocate_object(0);
        assert_eq!(
            result,
            Err(JErrorType::RangeError("Out of memory".to_string()))
        );
        assert_eq!(heap.stats().objects, 2);
    }
}
