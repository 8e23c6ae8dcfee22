//! PTX modules loaded through the driver API.
//!
//! Functions are resolved with `cuModuleGetFunction` and handed out as
//! [`KernelHandle`]s, so the raw `CUfunction` never has to be pried out of a
//! cudarc `CudaFunction`.

use std::ffi::{c_void, CString};
use std::ptr;
use std::sync::Arc;

use cudarc::driver::result::DriverError;
use cudarc::driver::sys as cuda_sys;
use cudarc::driver::CudaContext;

use gridlaunch_core::kernel::{KernelArgs, KernelHandle, RawFunction, TypedKernel};

use crate::device::CudaDevice;
use crate::error::{CudaError, Result};

/// Converts a driver status into a `Result`.
pub(crate) fn check(result: cuda_sys::CUresult) -> std::result::Result<(), DriverError> {
    if result == cuda_sys::CUresult::CUDA_SUCCESS {
        Ok(())
    } else {
        Err(DriverError(result))
    }
}

/// A loaded PTX module. Handles resolved from it stay valid until it drops.
pub struct PtxModule {
    module: cuda_sys::CUmodule,
    context: Arc<CudaContext>,
}

// SAFETY: a CUmodule may be used from any thread once its context is bound.
unsafe impl Send for PtxModule {}
unsafe impl Sync for PtxModule {}

impl PtxModule {
    /// Loads `ptx` into `device`'s context.
    pub fn load(device: &CudaDevice, ptx: &str) -> Result<Self> {
        device.bind_to_thread()?;

        let ptx_cstring = CString::new(ptx.strip_suffix('\0').unwrap_or(ptx))
            .map_err(|e| CudaError::InvalidPtx(format!("contains null byte: {}", e)))?;

        let mut module: cuda_sys::CUmodule = ptr::null_mut();
        // SAFETY: the context is current and the image is null-terminated.
        check(unsafe {
            cuda_sys::cuModuleLoadData(&mut module, ptx_cstring.as_ptr() as *const c_void)
        })?;

        tracing::debug!(device = device.ordinal(), bytes = ptx.len(), "Loaded PTX module");

        Ok(Self {
            module,
            context: Arc::clone(device.context()),
        })
    }

    /// Resolves `name` to a kernel handle.
    pub fn function(&self, name: &str) -> Result<KernelHandle> {
        let name_cstring = CString::new(name).map_err(|_| CudaError::FunctionNotFound {
            name: name.to_string(),
        })?;

        let mut func: cuda_sys::CUfunction = ptr::null_mut();
        // SAFETY: `self.module` is loaded until drop.
        let status =
            unsafe { cuda_sys::cuModuleGetFunction(&mut func, self.module, name_cstring.as_ptr()) };
        if status == cuda_sys::CUresult::CUDA_ERROR_NOT_FOUND {
            return Err(CudaError::FunctionNotFound {
                name: name.to_string(),
            });
        }
        check(status)?;

        RawFunction::from_ptr(func as *mut c_void)
            .map(KernelHandle::from_raw)
            .ok_or_else(|| CudaError::FunctionNotFound {
                name: name.to_string(),
            })
    }

    /// Resolves `name` and tags it with the parameter list `A`.
    ///
    /// # Safety
    ///
    /// `A` must match the device function's parameters exactly.
    pub unsafe fn typed_function<A: KernelArgs>(&self, name: &str) -> Result<TypedKernel<A>> {
        let handle = self.function(name)?;
        // SAFETY: forwarded to the caller.
        Ok(unsafe { handle.assume_signature() })
    }
}

impl Drop for PtxModule {
    fn drop(&mut self) {
        if self.context.bind_to_thread().is_err() {
            return;
        }
        // SAFETY: the module was loaded by `load` and is unloaded once.
        let _ = unsafe { cuda_sys::cuModuleUnload(self.module) };
    }
}

impl std::fmt::Debug for PtxModule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PtxModule")
            .field("module", &self.module)
            .finish_non_exhaustive()
    }
}
