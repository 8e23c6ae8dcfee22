//! Kernels compiled by nvcc at build time.
//!
//! Their host-side signatures are known statically, so they come out as
//! [`TypedKernel`]s and launch through the checked path. Builds without nvcc
//! still have this type, but [`BuiltinKernels::load`] fails; kernels loaded
//! at runtime go through [`PtxModule`] and handle launches instead.

use gridlaunch_core::kernel::{DevicePtr, TypedKernel};

use crate::device::CudaDevice;
use crate::error::Result;
use crate::module::PtxModule;

/// `gridlaunch_fill_u32(out, value, count)`.
pub type FillU32Args = (DevicePtr<u32>, u32, u32);

/// `gridlaunch_saxpy(a, x, y, count)` computing `y = a * x + y`.
pub type SaxpyArgs = (f32, DevicePtr<f32>, DevicePtr<f32>, u32);

/// The bundled kernels, loaded into one device context.
#[derive(Debug)]
pub struct BuiltinKernels {
    _module: PtxModule,
    fill_u32: TypedKernel<FillU32Args>,
    saxpy: TypedKernel<SaxpyArgs>,
}

impl BuiltinKernels {
    /// Loads the embedded PTX into `device`.
    #[cfg(has_nvcc)]
    pub fn load(device: &CudaDevice) -> Result<Self> {
        let module = PtxModule::load(device, crate::build_info::BUILTIN_KERNEL_PTX)?;
        // SAFETY: the argument tuples mirror the extern "C" declarations in
        // builtin_kernels.cu.
        let fill_u32 = unsafe { module.typed_function::<FillU32Args>("gridlaunch_fill_u32")? };
        let saxpy = unsafe { module.typed_function::<SaxpyArgs>("gridlaunch_saxpy")? };

        tracing::info!(
            device = device.ordinal(),
            message = crate::build_info::DEVICE_COMPILER_MESSAGE,
            "Loaded builtin kernels"
        );

        Ok(Self {
            _module: module,
            fill_u32,
            saxpy,
        })
    }

    /// Always fails: this build had no device compiler.
    #[cfg(not(has_nvcc))]
    pub fn load(device: &CudaDevice) -> Result<Self> {
        tracing::warn!(
            device = device.ordinal(),
            reason = crate::build_info::DEVICE_COMPILER_MESSAGE,
            "Builtin kernels requested without a device compiler"
        );
        Err(crate::error::CudaError::DeviceCompilerUnavailable(
            crate::build_info::DEVICE_COMPILER_MESSAGE.to_string(),
        ))
    }

    /// Fills `count` words at `out` with `value`.
    pub fn fill_u32(&self) -> &TypedKernel<FillU32Args> {
        &self.fill_u32
    }

    /// Single-precision `y = a * x + y`.
    pub fn saxpy(&self) -> &TypedKernel<SaxpyArgs> {
        &self.saxpy
    }
}
