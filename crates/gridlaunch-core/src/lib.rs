//! # gridlaunch core
//!
//! Typed kernel launches for a GPU command-queue execution model.
//!
//! This crate holds everything that does not need a device toolchain: the
//! launch value types, kernel handles, argument packing and the dispatcher.
//! The device side plugs in through [`LaunchBackend`](dispatch::LaunchBackend);
//! `gridlaunch-cuda` provides the CUDA driver implementation, and
//! [`RecordingBackend`](host::RecordingBackend) an in-process one.
//!
//! ## Core Abstractions
//!
//! - [`Dimensions`](dims::Dimensions) - grid and block extents
//! - [`ComputeCapability`](capability::ComputeCapability) - device feature level
//! - [`LaunchConfig`](config::LaunchConfig) - grid, block and shared memory as one value
//! - [`KernelHandle`](kernel::KernelHandle) / [`TypedKernel`](kernel::TypedKernel) - device function references
//! - [`launch`](dispatch::launch) / [`launch_handle`](dispatch::launch_handle) - enqueue a kernel on a stream
//!
//! ## Example
//!
//! ```
//! use gridlaunch_core::prelude::*;
//!
//! let backend = RecordingBackend::default();
//! let handle = backend.register_kernel("fill");
//!
//! // A library only has the untyped handle; the caller knows the signature.
//! let config = LaunchConfig::for_elements(10_000, 256);
//! let out = DevicePtr::<u32>::from_addr(0x8000_0000);
//! unsafe {
//!     launch_handle_on_default(&backend, handle, &config, (out, 7u32, 10_000u32)).unwrap();
//! }
//! assert_eq!(backend.commands(StreamId::DEFAULT)[0].config, config);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_op_in_unsafe_fn)]

pub mod attributes;
pub mod capability;
pub mod config;
pub mod dims;
pub mod dispatch;
pub mod error;
pub mod host;
pub mod kernel;
pub mod limits;
pub mod stream;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::attributes::{CachePreference, FunctionAttributes, SharedMemoryBankSize};
    pub use crate::capability::ComputeCapability;
    pub use crate::config::{
        make_launch_config, LaunchConfig, LaunchConfigBuilder, SerializationFactor,
        SharedMemorySize,
    };
    pub use crate::dims::{BlockDimensions, Dimensions, GridDimensions};
    pub use crate::dispatch::{
        launch, launch_handle, launch_handle_on_default, launch_on_default, LaunchBackend,
    };
    pub use crate::error::{HostLaunchError, LimitViolation};
    pub use crate::host::{LaunchRecord, RecordingBackend};
    pub use crate::kernel::{
        DevicePtr, KernelArg, KernelArgs, KernelFunction, KernelHandle, PackedArgs, RawFunction,
        TypedKernel,
    };
    pub use crate::limits::{DeviceLimits, DeviceLimitsBuilder};
    pub use crate::stream::{StreamId, StreamPriority, Synchronicity, DEFAULT_PRIORITY};
}

pub use capability::ComputeCapability;
pub use config::LaunchConfig;
pub use dims::Dimensions;
pub use dispatch::{launch, launch_handle, launch_handle_on_default, launch_on_default, LaunchBackend};
pub use kernel::{KernelHandle, TypedKernel};
pub use stream::StreamId;
