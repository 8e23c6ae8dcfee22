//! Per-function launch attributes.
//!
//! These are set on a device function once, before launching it, by the
//! backend that owns the function (see `gridlaunch-cuda`'s
//! `CudaDriver::apply_attributes`).

use crate::config::SharedMemorySize;

/// How a multiprocessor splits on-chip memory between L1 cache and shared
/// memory while running a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CachePreference {
    /// Let the driver decide.
    #[default]
    NoPreference,
    /// Equal L1 and shared memory.
    EqualL1AndShared,
    /// Larger shared memory, smaller L1.
    PreferShared,
    /// Larger L1, smaller shared memory.
    PreferL1,
}

/// Width of a shared-memory bank while running a function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SharedMemoryBankSize {
    /// The device's current setting.
    #[default]
    DeviceDefault,
    /// Four-byte banks.
    FourBytes,
    /// Eight-byte banks.
    EightBytes,
}

/// Attributes to apply to a device function before launching it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FunctionAttributes {
    /// Cache/shared-memory split, if one should be requested.
    pub cache_preference: Option<CachePreference>,
    /// Opt-in ceiling for dynamic shared memory, if above the default.
    pub max_dynamic_shared_memory: Option<SharedMemorySize>,
    /// Shared-memory bank width, if one should be requested.
    pub shared_memory_bank_size: Option<SharedMemoryBankSize>,
}

impl FunctionAttributes {
    /// No attributes.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests a cache preference.
    #[must_use]
    pub fn with_cache_preference(mut self, preference: CachePreference) -> Self {
        self.cache_preference = Some(preference);
        self
    }

    /// Opts in to a larger dynamic shared-memory allocation.
    #[must_use]
    pub fn with_max_dynamic_shared_memory(mut self, bytes: SharedMemorySize) -> Self {
        self.max_dynamic_shared_memory = Some(bytes);
        self
    }

    /// Requests a shared-memory bank width.
    #[must_use]
    pub fn with_shared_memory_bank_size(mut self, bank_size: SharedMemoryBankSize) -> Self {
        self.shared_memory_bank_size = Some(bank_size);
        self
    }

    /// True when nothing is requested.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cache_preference.is_none()
            && self.max_dynamic_shared_memory.is_none()
            && self.shared_memory_bank_size.is_none()
    }

    /// Overlays the attributes set in `other` onto these.
    #[must_use]
    pub fn merged_with(self, other: &FunctionAttributes) -> Self {
        Self {
            cache_preference: other.cache_preference.or(self.cache_preference),
            max_dynamic_shared_memory: other
                .max_dynamic_shared_memory
                .or(self.max_dynamic_shared_memory),
            shared_memory_bank_size: other
                .shared_memory_bank_size
                .or(self.shared_memory_bank_size),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_function_attributes_builder() {
        assert!(FunctionAttributes::new().is_empty());
        let attrs = FunctionAttributes::new()
            .with_cache_preference(CachePreference::PreferShared)
            .with_max_dynamic_shared_memory(96 * 1024);
        assert!(!attrs.is_empty());
        assert_eq!(attrs.cache_preference, Some(CachePreference::PreferShared));
        assert_eq!(attrs.max_dynamic_shared_memory, Some(96 * 1024));
        assert_eq!(attrs.shared_memory_bank_size, None);

        let banked = FunctionAttributes::new()
            .with_shared_memory_bank_size(SharedMemoryBankSize::EightBytes);
        assert!(!banked.is_empty());
        assert_eq!(SharedMemoryBankSize::default(), SharedMemoryBankSize::DeviceDefault);
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let first = FunctionAttributes::new()
            .with_cache_preference(CachePreference::PreferL1)
            .with_max_dynamic_shared_memory(64 * 1024);
        let second = FunctionAttributes::new().with_max_dynamic_shared_memory(80 * 1024);

        let merged = first.merged_with(&second);
        assert_eq!(merged.cache_preference, Some(CachePreference::PreferL1));
        assert_eq!(merged.max_dynamic_shared_memory, Some(80 * 1024));
        assert_eq!(merged.shared_memory_bank_size, None);
    }
}
