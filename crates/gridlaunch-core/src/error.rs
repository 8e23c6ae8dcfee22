//! Error types.
//!
//! The dispatcher has no error type of its own: a backend's error is handed
//! back to the caller as-is. These types belong to the in-process backend and
//! to [`DeviceLimits`](crate::limits::DeviceLimits).

use crate::config::SharedMemorySize;
use crate::dims::{BlockDimensions, GridDimensions};
use crate::kernel::RawFunction;
use crate::stream::StreamId;

/// A launch configuration that exceeds a device limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum LimitViolation {
    /// The grid has a zero component.
    #[error("grid {grid} is empty")]
    EmptyGrid {
        /// The requested grid.
        grid: GridDimensions,
    },

    /// The block has a zero component.
    #[error("block {block} is empty")]
    EmptyBlock {
        /// The requested block.
        block: BlockDimensions,
    },

    /// One block axis is too large.
    #[error("block dimension {axis} = {requested} exceeds limit {limit}")]
    BlockDimension {
        /// Offending axis.
        axis: char,
        /// Requested extent.
        requested: u32,
        /// Device limit.
        limit: u32,
    },

    /// The block has too many threads in total.
    #[error("{requested} threads per block exceeds limit {limit}")]
    ThreadsPerBlock {
        /// Requested block volume.
        requested: u64,
        /// Device limit.
        limit: u32,
    },

    /// One grid axis is too large.
    #[error("grid dimension {axis} = {requested} exceeds limit {limit}")]
    GridDimension {
        /// Offending axis.
        axis: char,
        /// Requested extent.
        requested: u32,
        /// Device limit.
        limit: u32,
    },

    /// Too much dynamic shared memory.
    #[error("{requested} bytes of dynamic shared memory exceeds limit {limit}")]
    SharedMemory {
        /// Requested bytes.
        requested: SharedMemorySize,
        /// Device limit.
        limit: SharedMemorySize,
    },

    /// A function asked to opt in to more dynamic shared memory than the
    /// device allows.
    #[error("opt-in of {requested} bytes of dynamic shared memory exceeds limit {limit}")]
    SharedMemoryOptIn {
        /// Requested bytes.
        requested: SharedMemorySize,
        /// Device limit.
        limit: SharedMemorySize,
    },
}

/// Status reported by the in-process backend when it refuses a launch.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HostLaunchError {
    /// The configuration does not fit the device.
    #[error("invalid launch configuration: {0}")]
    InvalidConfiguration(#[from] LimitViolation),

    /// The function was never registered with this backend.
    #[error("unknown device function {0:?}")]
    InvalidHandle(RawFunction),

    /// The stream was never created on this backend.
    #[error("unknown stream {0}")]
    InvalidStream(StreamId),
}

/// Result type for the in-process backend.
pub type HostResult<T> = std::result::Result<T, HostLaunchError>;
