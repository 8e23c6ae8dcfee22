//! CUDA backend for gridlaunch.
//!
//! Implements [`LaunchBackend`](gridlaunch_core::dispatch::LaunchBackend) on
//! top of the CUDA driver API through cudarc.
//!
//! # Features
//!
//! - `cuda`: links the driver. Without it only the availability queries and
//!   stubs are compiled.
//!
//! # Typed and untyped kernels
//!
//! Kernels compiled by nvcc together with the crate ([`BuiltinKernels`]) have
//! known signatures and launch with [`launch`](gridlaunch_core::launch).
//! Kernels loaded at runtime from PTX ([`PtxModule`]) are plain
//! [`KernelHandle`](gridlaunch_core::KernelHandle)s and launch with the
//! unsafe [`launch_handle`](gridlaunch_core::launch_handle). When nvcc was
//! missing at build time the builtin kernels are unavailable, but handle
//! launches work the same.
//!
//! # Example
//!
//! ```ignore
//! use gridlaunch_core::prelude::*;
//! use gridlaunch_cuda::{BuiltinKernels, CudaDevice, CudaDriver};
//!
//! let device = CudaDevice::new(0)?;
//! let driver = CudaDriver::new(&device);
//! let kernels = BuiltinKernels::load(&device)?;
//!
//! let config = LaunchConfig::for_elements(1 << 20, 256);
//! launch_on_default(&driver, kernels.fill_u32(), &config, (out, 7, 1 << 20))?;
//! driver.synchronize()?;
//! ```

#![warn(missing_docs)]

#[allow(dead_code)]
pub(crate) mod build_info {
    include!(concat!(env!("OUT_DIR"), "/builtin_kernels.rs"));
}

pub mod error;

#[cfg(feature = "cuda")]
pub mod builtin;
#[cfg(feature = "cuda")]
mod device;
#[cfg(feature = "cuda")]
pub mod driver;
#[cfg(feature = "cuda")]
pub mod module;

#[cfg(feature = "cuda")]
pub use builtin::{BuiltinKernels, FillU32Args, SaxpyArgs};
#[cfg(feature = "cuda")]
pub use device::CudaDevice;
#[cfg(feature = "cuda")]
pub use driver::CudaDriver;
#[cfg(feature = "cuda")]
pub use module::PtxModule;

pub use error::{CudaError, Result};

// Placeholders when the driver is not linked
#[cfg(not(feature = "cuda"))]
mod stub {
    use crate::error::{CudaError, Result};

    /// Stub device when the `cuda` feature is disabled.
    #[derive(Debug)]
    pub struct CudaDevice;

    impl CudaDevice {
        /// Always fails without the `cuda` feature.
        pub fn new(_ordinal: usize) -> Result<Self> {
            Err(CudaError::BackendUnavailable(
                "CUDA feature not enabled".to_string(),
            ))
        }
    }
}

#[cfg(not(feature = "cuda"))]
pub use stub::CudaDevice;

/// Whether nvcc compiled the builtin kernels for this build.
pub fn has_device_compiler() -> bool {
    build_info::HAS_DEVICE_COMPILER
}

/// How the builtin kernels were built, or why they were not.
pub fn device_compiler_message() -> &'static str {
    build_info::DEVICE_COMPILER_MESSAGE
}

/// Check if CUDA is available at runtime.
///
/// False when the `cuda` feature is off, the driver library is missing, or
/// there are no devices.
pub fn is_cuda_available() -> bool {
    cuda_device_count() > 0
}

/// Number of CUDA devices, or 0 when CUDA is unavailable.
pub fn cuda_device_count() -> usize {
    #[cfg(feature = "cuda")]
    {
        // cudarc panics if the driver library cannot be loaded
        std::panic::catch_unwind(|| {
            cudarc::driver::CudaContext::device_count()
                .map(|c| c.max(0) as usize)
                .unwrap_or(0)
        })
        .unwrap_or(0)
    }
    #[cfg(not(feature = "cuda"))]
    {
        0
    }
}

/// Compile CUDA C source to PTX with NVRTC.
#[cfg(feature = "cuda")]
pub fn compile_ptx(cuda_source: &str) -> Result<String> {
    let ptx = cudarc::nvrtc::compile_ptx(cuda_source)
        .map_err(|e| CudaError::Compilation(e.to_string()))?;
    Ok(ptx.to_src().to_string())
}

/// Stub: compilation needs the `cuda` feature.
#[cfg(not(feature = "cuda"))]
pub fn compile_ptx(_cuda_source: &str) -> Result<String> {
    Err(CudaError::BackendUnavailable(
        "CUDA feature not enabled".to_string(),
    ))
}

/// Identifier of a cudarc stream, for use with the dispatch functions.
#[cfg(feature = "cuda")]
pub fn stream_id(stream: &cudarc::driver::CudaStream) -> gridlaunch_core::StreamId {
    gridlaunch_core::StreamId::from_raw(stream.cu_stream() as *mut std::ffi::c_void)
}
