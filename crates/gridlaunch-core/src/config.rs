//! Launch configuration: grid shape, block shape and dynamic shared memory.
//!
//! A [`LaunchConfig`] replaces the loose positional `(grid, block, shared,
//! stream)` argument list of a raw launch with one value whose fields are
//! named. It is not validated against any device: limits such as threads per
//! block differ between devices, so they are checked by the backend when the
//! launch is enqueued and surface as a launch failure.
//!
//! # Example
//!
//! ```
//! use gridlaunch_core::config::LaunchConfig;
//! use gridlaunch_core::dims::Dimensions;
//!
//! let config = LaunchConfig::builder()
//!     .grid(Dimensions::linear(256))
//!     .block(Dimensions::linear(128))
//!     .shared_memory(4096)
//!     .build();
//!
//! assert_eq!(config.total_threads(), 256 * 128);
//! ```

use crate::dims::{BlockDimensions, Dimensions, GridDimensions};

/// Size of a dynamic shared-memory region, in bytes.
pub type SharedMemorySize = u32;

/// Number of elements each thread processes in a serialized launch.
pub type SerializationFactor = u16;

/// Grid shape, block shape and dynamic shared-memory size of one launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LaunchConfig {
    /// Grid dimensions, in blocks.
    pub grid: GridDimensions,
    /// Block dimensions, in threads.
    pub block: BlockDimensions,
    /// Dynamic shared memory per block, in bytes.
    pub dynamic_shared_memory: SharedMemorySize,
}

impl LaunchConfig {
    /// Creates a configuration with no dynamic shared memory.
    #[must_use]
    pub fn new(grid: impl Into<GridDimensions>, block: impl Into<BlockDimensions>) -> Self {
        Self {
            grid: grid.into(),
            block: block.into(),
            dynamic_shared_memory: 0,
        }
    }

    /// Returns a builder with every field set by name.
    #[must_use]
    pub fn builder() -> LaunchConfigBuilder {
        LaunchConfigBuilder::default()
    }

    /// One-dimensional configuration covering `element_count` threads,
    /// rounding the grid up to whole blocks.
    #[must_use]
    pub fn for_elements(element_count: u64, block_size: u32) -> Self {
        Self::for_elements_serialized(element_count, block_size, 1)
    }

    /// One-dimensional configuration where each thread covers
    /// `serialization_factor` elements.
    ///
    /// With factor `s`, `ceil(n / s)` threads are needed, rounded up to a
    /// whole number of blocks. A zero block size or factor yields an empty
    /// configuration.
    ///
    /// The block count saturates at `u32::MAX`. Past that point the
    /// configuration covers fewer elements than requested; compare
    /// [`LaunchConfig::total_threads`] against the element count when the
    /// input may be that large.
    #[must_use]
    pub fn for_elements_serialized(
        element_count: u64,
        block_size: u32,
        serialization_factor: SerializationFactor,
    ) -> Self {
        if block_size == 0 || serialization_factor == 0 {
            return Self::new(0u32, block_size);
        }
        let threads = element_count.div_ceil(u64::from(serialization_factor));
        let blocks = threads.div_ceil(u64::from(block_size));
        let blocks = u32::try_from(blocks).unwrap_or(u32::MAX);
        Self::new(blocks, block_size)
    }

    /// Returns a copy with the given dynamic shared-memory size.
    #[must_use]
    pub fn with_shared_memory(mut self, bytes: SharedMemorySize) -> Self {
        self.dynamic_shared_memory = bytes;
        self
    }

    /// Total threads launched: grid volume times block volume.
    #[must_use]
    pub fn total_threads(&self) -> u64 {
        self.grid.volume().saturating_mul(self.block.volume())
    }

    /// True if the grid or the block is empty, i.e. the launch does no work.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.grid.is_empty() || self.block.is_empty()
    }
}

/// Builds a configuration from grid, block and shared-memory size.
#[must_use]
pub fn make_launch_config(
    grid: impl Into<GridDimensions>,
    block: impl Into<BlockDimensions>,
    dynamic_shared_memory: SharedMemorySize,
) -> LaunchConfig {
    LaunchConfig::new(grid, block).with_shared_memory(dynamic_shared_memory)
}

/// Builder for [`LaunchConfig`].
///
/// Grid and block default to `(1, 1, 1)`, shared memory to zero.
#[derive(Debug, Clone, Default)]
pub struct LaunchConfigBuilder {
    grid: Dimensions,
    block: Dimensions,
    dynamic_shared_memory: SharedMemorySize,
}

impl LaunchConfigBuilder {
    /// Sets the grid dimensions.
    #[must_use]
    pub fn grid(mut self, grid: impl Into<GridDimensions>) -> Self {
        self.grid = grid.into();
        self
    }

    /// Sets the block dimensions.
    #[must_use]
    pub fn block(mut self, block: impl Into<BlockDimensions>) -> Self {
        self.block = block.into();
        self
    }

    /// Sets the dynamic shared-memory size in bytes.
    #[must_use]
    pub fn shared_memory(mut self, bytes: SharedMemorySize) -> Self {
        self.dynamic_shared_memory = bytes;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> LaunchConfig {
        LaunchConfig {
            grid: self.grid,
            block: self.block,
            dynamic_shared_memory: self.dynamic_shared_memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_new_defaults_shared_memory_to_zero() {
        let config = LaunchConfig::new(256u32, 128u32);
        assert_eq!(config.grid, Dimensions::linear(256));
        assert_eq!(config.block, Dimensions::linear(128));
        assert_eq!(config.dynamic_shared_memory, 0);
    }

    #[test]
    fn test_equality_is_structural() {
        let a = make_launch_config((16u32, 16u32), (8u32, 8u32), 1024);
        let b = make_launch_config((16u32, 16u32), (8u32, 8u32), 1024);
        assert_eq!(a, b);
        assert_ne!(a, b.with_shared_memory(2048));
        assert_ne!(a, make_launch_config((16u32, 16u32), (8u32, 4u32), 1024));
    }

    #[test]
    fn test_builder_matches_positional() {
        let built = LaunchConfig::builder()
            .block((32u32, 8u32))
            .shared_memory(512)
            .grid(64u32)
            .build();
        assert_eq!(built, make_launch_config(64u32, (32u32, 8u32), 512));
    }

    #[test]
    fn test_builder_defaults() {
        let config = LaunchConfig::builder().build();
        assert_eq!(config, LaunchConfig::new(1u32, 1u32));
    }

    #[test]
    fn test_no_validation_at_construction() {
        let config =
            LaunchConfig::new(0u32, (4096u32, 4096u32, 4096u32)).with_shared_memory(u32::MAX);
        assert!(config.is_empty());
        assert_eq!(config.dynamic_shared_memory, u32::MAX);
    }

    #[test]
    fn test_for_elements_rounds_up() {
        let config = LaunchConfig::for_elements(1000, 256);
        assert_eq!(config.grid, Dimensions::linear(4));
        assert_eq!(config.block, Dimensions::linear(256));
        assert_eq!(LaunchConfig::for_elements(1024, 256).grid.x, 4);
    }

    #[test]
    fn test_for_elements_serialized() {
        // 1000 elements, 4 per thread -> 250 threads -> 2 blocks of 128.
        let config = LaunchConfig::for_elements_serialized(1000, 128, 4);
        assert_eq!(config.grid.x, 2);
        assert!(config.total_threads() * 4 >= 1000);
    }

    #[test]
    fn test_for_elements_degenerate_inputs() {
        assert!(LaunchConfig::for_elements(1000, 0).is_empty());
        assert!(LaunchConfig::for_elements_serialized(1000, 128, 0).is_empty());
        assert!(LaunchConfig::for_elements(0, 128).is_empty());
    }

    #[test]
    fn test_for_elements_saturates_grid() {
        let config = LaunchConfig::for_elements(u64::MAX, 1);
        assert_eq!(config.grid, Dimensions::linear(u32::MAX));
        assert!(config.total_threads() < u64::MAX);

        let fits = LaunchConfig::for_elements(u64::from(u32::MAX) * 2, 2);
        assert_eq!(fits.grid.x, u32::MAX);
        assert_eq!(fits.total_threads(), u64::from(u32::MAX) * 2);
    }

    #[test]
    fn test_total_threads() {
        let config = LaunchConfig::new((16u32, 16u32), (8u32, 8u32, 4u32));
        assert_eq!(config.total_threads(), 256 * 256);
    }

    proptest! {
        #[test]
        fn prop_for_elements_covers_all(n in 1u64..10_000_000, block in 1u32..=1024) {
            let config = LaunchConfig::for_elements(n, block);
            prop_assert!(config.total_threads() >= n);
            prop_assert!(config.total_threads() < n + u64::from(block));
        }
    }
}
