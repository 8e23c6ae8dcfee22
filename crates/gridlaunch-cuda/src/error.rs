//! Errors from module loading and device setup.
//!
//! Launch failures are not wrapped here: [`CudaDriver`](crate::CudaDriver)
//! returns the driver's `DriverError` unchanged.

/// Errors from the CUDA backend outside of the launch path.
#[derive(Debug, thiserror::Error)]
pub enum CudaError {
    /// A driver call failed.
    #[cfg(feature = "cuda")]
    #[error("CUDA driver error: {0}")]
    Driver(#[from] cudarc::driver::DriverError),

    /// NVRTC rejected the source.
    #[error("NVRTC compilation failed: {0}")]
    Compilation(String),

    /// PTX text could not be passed to the driver.
    #[error("invalid PTX: {0}")]
    InvalidPtx(String),

    /// The module has no function of this name.
    #[error("kernel '{name}' not found in module")]
    FunctionNotFound {
        /// Requested symbol.
        name: String,
    },

    /// Typed builtin kernels need nvcc at build time.
    #[error("device compiler unavailable: {0}")]
    DeviceCompilerUnavailable(String),

    /// The crate was built without the `cuda` feature.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
}

/// Result type for the CUDA backend.
pub type Result<T> = std::result::Result<T, CudaError>;
