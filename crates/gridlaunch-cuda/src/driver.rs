//! The CUDA enqueue primitive.

use std::sync::Arc;

use cudarc::driver::result::{self as cuda_result, DriverError};
use cudarc::driver::sys as cuda_sys;
use cudarc::driver::CudaContext;

use gridlaunch_core::attributes::{CachePreference, FunctionAttributes, SharedMemoryBankSize};
use gridlaunch_core::config::LaunchConfig;
use gridlaunch_core::dispatch::LaunchBackend;
use gridlaunch_core::kernel::{KernelHandle, PackedArgs, RawFunction};
use gridlaunch_core::stream::StreamId;

use crate::device::CudaDevice;
use crate::module::check;

/// Launches kernels with `cuLaunchKernel` in one device context.
///
/// Launch statuses are returned as the driver reported them.
#[derive(Clone)]
pub struct CudaDriver {
    context: Arc<CudaContext>,
    ordinal: usize,
}

impl CudaDriver {
    /// Creates a driver bound to `device`.
    pub fn new(device: &CudaDevice) -> Self {
        Self {
            context: Arc::clone(device.context()),
            ordinal: device.ordinal(),
        }
    }

    /// Device ordinal this driver launches on.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Sets per-function attributes ahead of launching `kernel`.
    pub fn apply_attributes(
        &self,
        kernel: KernelHandle,
        attributes: &FunctionAttributes,
    ) -> Result<(), DriverError> {
        if attributes.is_empty() {
            return Ok(());
        }
        self.context.bind_to_thread()?;
        let func = kernel.raw().as_ptr() as cuda_sys::CUfunction;

        if let Some(preference) = attributes.cache_preference {
            // SAFETY: `func` belongs to a module loaded in this context.
            check(unsafe { cuda_sys::cuFuncSetCacheConfig(func, cache_config(preference)) })?;
        }
        if let Some(bytes) = attributes.max_dynamic_shared_memory {
            // SAFETY: as above.
            check(unsafe {
                cuda_sys::cuFuncSetAttribute(
                    func,
                    cuda_sys::CUfunction_attribute::CU_FUNC_ATTRIBUTE_MAX_DYNAMIC_SHARED_SIZE_BYTES,
                    bytes as i32,
                )
            })?;
        }
        if let Some(bank_size) = attributes.shared_memory_bank_size {
            // SAFETY: as above.
            check(unsafe { cuda_sys::cuFuncSetSharedMemConfig(func, shared_config(bank_size)) })?;
        }

        tracing::debug!(
            function = ?kernel.raw(),
            cache = ?attributes.cache_preference,
            max_dynamic_shared = ?attributes.max_dynamic_shared_memory,
            bank_size = ?attributes.shared_memory_bank_size,
            "Applied function attributes"
        );
        Ok(())
    }

    /// Blocks until all work in the context has finished.
    pub fn synchronize(&self) -> Result<(), DriverError> {
        self.context.bind_to_thread()?;
        // SAFETY: the context is current.
        check(unsafe { cuda_sys::cuCtxSynchronize() })
    }
}

impl LaunchBackend for CudaDriver {
    type Error = DriverError;

    unsafe fn enqueue(
        &self,
        function: RawFunction,
        config: &LaunchConfig,
        stream: StreamId,
        args: &mut PackedArgs<'_>,
    ) -> Result<(), DriverError> {
        self.context.bind_to_thread()?;
        // SAFETY: the caller guarantees `args` matches `function`'s parameters;
        // `stream` is a live stream of this context or one of the defaults.
        unsafe {
            cuda_result::launch_kernel(
                function.as_ptr() as cuda_sys::CUfunction,
                config.grid.as_tuple(),
                config.block.as_tuple(),
                config.dynamic_shared_memory,
                stream.as_raw() as cuda_sys::CUstream,
                args.as_mut_ptrs(),
            )
        }
    }
}

impl std::fmt::Debug for CudaDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaDriver")
            .field("ordinal", &self.ordinal)
            .finish()
    }
}

fn cache_config(preference: CachePreference) -> cuda_sys::CUfunc_cache {
    match preference {
        CachePreference::NoPreference => cuda_sys::CUfunc_cache::CU_FUNC_CACHE_PREFER_NONE,
        CachePreference::EqualL1AndShared => cuda_sys::CUfunc_cache::CU_FUNC_CACHE_PREFER_EQUAL,
        CachePreference::PreferShared => cuda_sys::CUfunc_cache::CU_FUNC_CACHE_PREFER_SHARED,
        CachePreference::PreferL1 => cuda_sys::CUfunc_cache::CU_FUNC_CACHE_PREFER_L1,
    }
}

fn shared_config(bank_size: SharedMemoryBankSize) -> cuda_sys::CUsharedconfig {
    match bank_size {
        SharedMemoryBankSize::DeviceDefault => {
            cuda_sys::CUsharedconfig::CU_SHARED_MEM_CONFIG_DEFAULT_BANK_SIZE
        }
        SharedMemoryBankSize::FourBytes => {
            cuda_sys::CUsharedconfig::CU_SHARED_MEM_CONFIG_FOUR_BYTE_BANK_SIZE
        }
        SharedMemoryBankSize::EightBytes => {
            cuda_sys::CUsharedconfig::CU_SHARED_MEM_CONFIG_EIGHT_BYTE_BANK_SIZE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_preference_mapping() {
        assert_eq!(
            cache_config(CachePreference::default()),
            cuda_sys::CUfunc_cache::CU_FUNC_CACHE_PREFER_NONE
        );
        assert_eq!(
            cache_config(CachePreference::PreferShared),
            cuda_sys::CUfunc_cache::CU_FUNC_CACHE_PREFER_SHARED
        );
        assert_eq!(
            cache_config(CachePreference::PreferL1),
            cuda_sys::CUfunc_cache::CU_FUNC_CACHE_PREFER_L1
        );
        assert_eq!(
            cache_config(CachePreference::EqualL1AndShared),
            cuda_sys::CUfunc_cache::CU_FUNC_CACHE_PREFER_EQUAL
        );
    }

    #[test]
    fn test_bank_size_mapping() {
        assert_eq!(
            shared_config(SharedMemoryBankSize::default()),
            cuda_sys::CUsharedconfig::CU_SHARED_MEM_CONFIG_DEFAULT_BANK_SIZE
        );
        assert_eq!(
            shared_config(SharedMemoryBankSize::FourBytes),
            cuda_sys::CUsharedconfig::CU_SHARED_MEM_CONFIG_FOUR_BYTE_BANK_SIZE
        );
        assert_eq!(
            shared_config(SharedMemoryBankSize::EightBytes),
            cuda_sys::CUsharedconfig::CU_SHARED_MEM_CONFIG_EIGHT_BYTE_BANK_SIZE
        );
    }
}
