//! Per-device launch limits.
//!
//! [`LaunchConfig`] is deliberately context-free, so nothing checks it when it
//! is built. Backends that need to reject oversized launches themselves (the
//! in-process [`RecordingBackend`](crate::host::RecordingBackend)) do it
//! here, against the limits of the device they stand for.

use crate::capability::ComputeCapability;
use crate::config::{LaunchConfig, SharedMemorySize};
use crate::dims::Dimensions;
use crate::error::LimitViolation;

/// Hardware limits a launch configuration must respect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceLimits {
    /// Maximum threads in one block (block volume).
    pub max_threads_per_block: u32,
    /// Maximum block extent per axis.
    pub max_block_dimensions: Dimensions,
    /// Maximum grid extent per axis.
    pub max_grid_dimensions: Dimensions,
    /// Maximum dynamic shared memory per block without opt-in, in bytes.
    pub max_shared_memory_per_block: SharedMemorySize,
    /// Maximum dynamic shared memory a function can opt in to, in bytes.
    pub max_shared_memory_per_block_optin: SharedMemorySize,
    /// Threads per warp.
    pub warp_size: u32,
}

impl Default for DeviceLimits {
    fn default() -> Self {
        Self {
            max_threads_per_block: 1024,
            max_block_dimensions: Dimensions::new(1024, 1024, 64),
            max_grid_dimensions: Dimensions::new(i32::MAX as u32, 65535, 65535),
            max_shared_memory_per_block: 64 * 1024,
            max_shared_memory_per_block_optin: 64 * 1024,
            warp_size: 32,
        }
    }
}

impl DeviceLimits {
    /// Limits for a device of the given compute capability.
    ///
    /// Generations older than 3.0 had smaller grids and blocks; unknown
    /// generations keep the default shared-memory ceilings. A capability
    /// outside [`ComputeCapability::is_known_release`] gets the defaults:
    /// x.0 releases are accepted here although `is_valid` rejects them.
    #[must_use]
    pub fn for_capability(capability: ComputeCapability) -> Self {
        let mut limits = Self::default();
        if !capability.is_known_release() {
            return limits;
        }
        if capability.major < 2 {
            limits.max_threads_per_block = 512;
            limits.max_block_dimensions = Dimensions::new(512, 512, 64);
        }
        if capability.major < 3 {
            limits.max_grid_dimensions = Dimensions::new(65535, 65535, 65535);
        }
        if let Some(shared) = capability.max_shared_memory_per_block() {
            limits.max_shared_memory_per_block = shared;
        }
        if let Some(shared) = capability.max_shared_memory_per_block_optin() {
            limits.max_shared_memory_per_block_optin = shared;
        }
        if let Some(warp_size) = capability.warp_size() {
            limits.warp_size = warp_size;
        }
        limits
    }

    /// Returns a builder starting from the default limits.
    #[must_use]
    pub fn builder() -> DeviceLimitsBuilder {
        DeviceLimitsBuilder::default()
    }

    /// Checks a configuration against these limits.
    ///
    /// An empty grid or block is rejected, as the hardware does. Dynamic
    /// shared memory is held to the ceiling without opt-in.
    pub fn check(&self, config: &LaunchConfig) -> Result<(), LimitViolation> {
        self.check_with_opt_in(config, None)
    }

    /// Checks whether a function may opt in to `bytes` of dynamic shared memory.
    pub fn check_opt_in(&self, bytes: SharedMemorySize) -> Result<(), LimitViolation> {
        if bytes > self.max_shared_memory_per_block_optin {
            return Err(LimitViolation::SharedMemoryOptIn {
                requested: bytes,
                limit: self.max_shared_memory_per_block_optin,
            });
        }
        Ok(())
    }

    /// Like [`DeviceLimits::check`], for a function whose maximum dynamic
    /// shared size was set to `opt_in`.
    pub fn check_with_opt_in(
        &self,
        config: &LaunchConfig,
        opt_in: Option<SharedMemorySize>,
    ) -> Result<(), LimitViolation> {
        if config.grid.is_empty() {
            return Err(LimitViolation::EmptyGrid { grid: config.grid });
        }
        if config.block.is_empty() {
            return Err(LimitViolation::EmptyBlock { block: config.block });
        }

        check_axes(config.block, self.max_block_dimensions).map_err(|(axis, requested, limit)| {
            LimitViolation::BlockDimension {
                axis,
                requested,
                limit,
            }
        })?;

        let threads = config.block.volume();
        if threads > u64::from(self.max_threads_per_block) {
            return Err(LimitViolation::ThreadsPerBlock {
                requested: threads,
                limit: self.max_threads_per_block,
            });
        }

        check_axes(config.grid, self.max_grid_dimensions).map_err(|(axis, requested, limit)| {
            LimitViolation::GridDimension {
                axis,
                requested,
                limit,
            }
        })?;

        let ceiling = opt_in.unwrap_or(self.max_shared_memory_per_block);
        if config.dynamic_shared_memory > ceiling {
            return Err(LimitViolation::SharedMemory {
                requested: config.dynamic_shared_memory,
                limit: ceiling,
            });
        }

        Ok(())
    }
}

fn check_axes(requested: Dimensions, limit: Dimensions) -> Result<(), (char, u32, u32)> {
    for (axis, value, max) in [
        ('x', requested.x, limit.x),
        ('y', requested.y, limit.y),
        ('z', requested.z, limit.z),
    ] {
        if value > max {
            return Err((axis, value, max));
        }
    }
    Ok(())
}

/// Builder for [`DeviceLimits`].
#[derive(Debug, Default)]
pub struct DeviceLimitsBuilder {
    limits: DeviceLimits,
}

impl DeviceLimitsBuilder {
    /// Starts from the preset for a compute capability.
    #[must_use]
    pub fn for_capability(capability: ComputeCapability) -> Self {
        Self {
            limits: DeviceLimits::for_capability(capability),
        }
    }

    /// Sets the maximum threads per block.
    #[must_use]
    pub fn with_max_threads_per_block(mut self, threads: u32) -> Self {
        self.limits.max_threads_per_block = threads;
        self
    }

    /// Sets the maximum block extent per axis.
    #[must_use]
    pub fn with_max_block_dimensions(mut self, dims: impl Into<Dimensions>) -> Self {
        self.limits.max_block_dimensions = dims.into();
        self
    }

    /// Sets the maximum grid extent per axis.
    #[must_use]
    pub fn with_max_grid_dimensions(mut self, dims: impl Into<Dimensions>) -> Self {
        self.limits.max_grid_dimensions = dims.into();
        self
    }

    /// Sets the dynamic shared-memory ceiling without opt-in, in bytes.
    ///
    /// The opt-in ceiling is raised to match if it was lower.
    #[must_use]
    pub fn with_max_shared_memory(mut self, bytes: SharedMemorySize) -> Self {
        self.limits.max_shared_memory_per_block = bytes;
        self.limits.max_shared_memory_per_block_optin =
            self.limits.max_shared_memory_per_block_optin.max(bytes);
        self
    }

    /// Sets the opt-in dynamic shared-memory ceiling, in bytes.
    #[must_use]
    pub fn with_max_shared_memory_optin(mut self, bytes: SharedMemorySize) -> Self {
        self.limits.max_shared_memory_per_block_optin = bytes;
        self
    }

    /// Sets the warp size.
    #[must_use]
    pub fn with_warp_size(mut self, warp_size: u32) -> Self {
        self.limits.warp_size = warp_size;
        self
    }

    /// Builds the limits.
    #[must_use]
    pub fn build(self) -> DeviceLimits {
        self.limits
    }
}
