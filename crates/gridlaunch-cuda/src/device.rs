//! CUDA device context.

use std::sync::Arc;

use cudarc::driver::sys::CUdevice_attribute;
use cudarc::driver::CudaContext;

use gridlaunch_core::capability::ComputeCapability;
use gridlaunch_core::dims::Dimensions;
use gridlaunch_core::limits::DeviceLimits;

use crate::error::Result;

/// A CUDA device and its primary context.
#[derive(Clone)]
pub struct CudaDevice {
    context: Arc<CudaContext>,
    ordinal: usize,
    name: String,
    compute_capability: ComputeCapability,
}

impl CudaDevice {
    /// Opens device `ordinal`.
    pub fn new(ordinal: usize) -> Result<Self> {
        let context = CudaContext::new(ordinal)?;
        let name = context.name()?;
        let (major, minor) = context.compute_capability()?;
        let compute_capability = ComputeCapability::new(major as u32, minor as u32);

        tracing::info!(
            ordinal,
            name = %name,
            compute_capability = %compute_capability,
            "Opened CUDA device"
        );

        Ok(Self {
            context,
            ordinal,
            name,
            compute_capability,
        })
    }

    /// Device ordinal.
    pub fn ordinal(&self) -> usize {
        self.ordinal
    }

    /// Device name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Compute capability.
    pub fn compute_capability(&self) -> ComputeCapability {
        self.compute_capability
    }

    /// The underlying cudarc context.
    pub fn context(&self) -> &Arc<CudaContext> {
        &self.context
    }

    /// Makes this device's context current on the calling thread.
    pub fn bind_to_thread(&self) -> Result<()> {
        self.context.bind_to_thread()?;
        Ok(())
    }

    /// Launch limits as reported by the driver.
    pub fn limits(&self) -> Result<DeviceLimits> {
        let attr = |attribute| -> Result<u32> { Ok(self.context.attribute(attribute)? as u32) };

        Ok(DeviceLimits::builder()
            .with_max_threads_per_block(attr(
                CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAX_THREADS_PER_BLOCK,
            )?)
            .with_max_block_dimensions(Dimensions::new(
                attr(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAX_BLOCK_DIM_X)?,
                attr(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAX_BLOCK_DIM_Y)?,
                attr(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAX_BLOCK_DIM_Z)?,
            ))
            .with_max_grid_dimensions(Dimensions::new(
                attr(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAX_GRID_DIM_X)?,
                attr(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAX_GRID_DIM_Y)?,
                attr(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAX_GRID_DIM_Z)?,
            ))
            .with_max_shared_memory(attr(
                CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAX_SHARED_MEMORY_PER_BLOCK,
            )?)
            .with_max_shared_memory_optin(attr(
                CUdevice_attribute::CU_DEVICE_ATTRIBUTE_MAX_SHARED_MEMORY_PER_BLOCK_OPTIN,
            )?)
            .with_warp_size(attr(CUdevice_attribute::CU_DEVICE_ATTRIBUTE_WARP_SIZE)?)
            .build())
    }
}

impl std::fmt::Debug for CudaDevice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CudaDevice")
            .field("ordinal", &self.ordinal)
            .field("name", &self.name)
            .field("compute_capability", &self.compute_capability)
            .finish()
    }
}
