//! # Recognized Device Registry
//!
//! Counts recognized turntables per vendor/product pair, remembering the order
//! in which each pair was first discovered. Several identical turntables can be
//! connected at once; DirectInput tells them apart by a per-pair instance index.

use indexmap::IndexMap;

use super::identity::ProductKey;

/// Insertion-ordered instance counts of recognized devices.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceRegistry {
    devices: IndexMap<ProductKey, u32>,
}

impl DeviceRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one more instance of `key` and returns its instance index.
    pub fn record(&mut self, key: ProductKey) -> u32 {
        let count = self.devices.entry(key).or_insert(0);
        *count += 1;
        *count - 1
    }

    /// Number of recorded instances of `key`.
    #[must_use]
    pub fn count(&self, key: &ProductKey) -> u32 {
        self.devices.get(key).copied().unwrap_or(0)
    }

    /// Number of distinct vendor/product pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Total number of recorded device instances.
    #[must_use]
    pub fn total_instances(&self) -> u32 {
        self.devices.values().sum()
    }

    /// Iterates `(key, count)` pairs in first-discovered order.
    pub fn iter(&self) -> impl Iterator<Item = (ProductKey, u32)> + '_ {
        self.devices.iter().map(|(key, count)| (*key, *count))
    }
}

impl<'a> IntoIterator for &'a DeviceRegistry {
    type Item = (ProductKey, u32);
    type IntoIter = Box<dyn Iterator<Item = (ProductKey, u32)> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
