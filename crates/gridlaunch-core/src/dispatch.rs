//! Launch dispatch.
//!
//! Two entry points put a kernel launch on a queue:
//!
//! - [`launch`]: the kernel is a [`KernelFunction`] whose parameter list is a
//!   type, so the argument tuple is checked by the compiler.
//! - [`launch_handle`]: the kernel is an untyped [`KernelHandle`]; the
//!   argument types given at the call site are taken to be the kernel's
//!   signature. This is `unsafe` because nothing can verify that.
//!
//! [`launch_on_default`] and [`launch_handle_on_default`] do the same on
//! [`StreamId::DEFAULT`].
//!
//! Every call makes exactly one [`LaunchBackend::enqueue`] call and returns
//! once the command is recorded. The kernel runs later, asynchronously.
//! There are no retries, and configurations are not adjusted: a rejection
//! from the backend is returned unchanged.
//!
//! # Example
//!
//! ```
//! use gridlaunch_core::prelude::*;
//!
//! let backend = RecordingBackend::default();
//! let scale = backend.register_typed::<(DevicePtr<f32>, f32, u32)>("scale");
//!
//! let config = LaunchConfig::new(Dimensions::linear(256), Dimensions::linear(128));
//! let data = DevicePtr::<f32>::from_addr(0x7000_0000);
//! launch_on_default(&backend, &scale, &config, (data, 2.0, 32768)).unwrap();
//!
//! assert_eq!(backend.commands(StreamId::DEFAULT).len(), 1);
//! ```

use crate::config::LaunchConfig;
use crate::kernel::{KernelArgs, KernelFunction, KernelHandle, PackedArgs, RawFunction};
use crate::stream::StreamId;

/// The low-level enqueue primitive of a device backend.
pub trait LaunchBackend {
    /// Status reported when the device refuses a launch.
    type Error: std::error::Error;

    /// Appends one launch of `function` to `stream`.
    ///
    /// Returns as soon as the command is recorded. Commands enqueued on one
    /// stream from one thread run in enqueue order.
    ///
    /// # Safety
    ///
    /// `args` must match the parameter list of `function`.
    unsafe fn enqueue(
        &self,
        function: RawFunction,
        config: &LaunchConfig,
        stream: StreamId,
        args: &mut PackedArgs<'_>,
    ) -> Result<(), Self::Error>;
}

impl<B: LaunchBackend + ?Sized> LaunchBackend for &B {
    type Error = B::Error;

    unsafe fn enqueue(
        &self,
        function: RawFunction,
        config: &LaunchConfig,
        stream: StreamId,
        args: &mut PackedArgs<'_>,
    ) -> Result<(), Self::Error> {
        // SAFETY: forwarded to the caller.
        unsafe { (**self).enqueue(function, config, stream, args) }
    }
}

/// Enqueues `kernel` on `stream` with arguments checked against its
/// parameter list at compile time.
pub fn launch<B, K>(
    backend: &B,
    kernel: &K,
    config: &LaunchConfig,
    stream: StreamId,
    args: K::Args,
) -> Result<(), B::Error>
where
    B: LaunchBackend + ?Sized,
    K: KernelFunction + ?Sized,
{
    // SAFETY: `K::Args` is the kernel's declared parameter list.
    unsafe { submit(backend, kernel.raw_function(), config, stream, args) }
}

/// [`launch`] on the default stream.
pub fn launch_on_default<B, K>(
    backend: &B,
    kernel: &K,
    config: &LaunchConfig,
    args: K::Args,
) -> Result<(), B::Error>
where
    B: LaunchBackend + ?Sized,
    K: KernelFunction + ?Sized,
{
    launch(backend, kernel, config, StreamId::DEFAULT, args)
}

/// Enqueues the kernel behind an untyped handle, taking `A` as its signature.
///
/// This is how code that cannot name the kernel's type launches it: the
/// handle travels without a signature and the call site supplies one.
///
/// # Safety
///
/// `A` must be exactly the parameter list of the device function behind
/// `handle`. The handle carries no signature and the device does not check
/// arguments, so a mismatch is not reported; the kernel reads garbage or
/// faults.
pub unsafe fn launch_handle<B, A>(
    backend: &B,
    handle: KernelHandle,
    config: &LaunchConfig,
    stream: StreamId,
    args: A,
) -> Result<(), B::Error>
where
    B: LaunchBackend + ?Sized,
    A: KernelArgs,
{
    // SAFETY: forwarded to the caller.
    unsafe { submit(backend, handle.raw(), config, stream, args) }
}

/// [`launch_handle`] on the default stream.
///
/// # Safety
///
/// Same contract as [`launch_handle`].
pub unsafe fn launch_handle_on_default<B, A>(
    backend: &B,
    handle: KernelHandle,
    config: &LaunchConfig,
    args: A,
) -> Result<(), B::Error>
where
    B: LaunchBackend + ?Sized,
    A: KernelArgs,
{
    // SAFETY: forwarded to the caller.
    unsafe { launch_handle(backend, handle, config, StreamId::DEFAULT, args) }
}

/// # Safety
///
/// `args` must match the parameter list of `function`.
unsafe fn submit<B, A>(
    backend: &B,
    function: RawFunction,
    config: &LaunchConfig,
    stream: StreamId,
    mut args: A,
) -> Result<(), B::Error>
where
    B: LaunchBackend + ?Sized,
    A: KernelArgs,
{
    let mut packed = args.pack();

    tracing::trace!(
        function = ?function,
        grid = %config.grid,
        block = %config.block,
        dimensionality = config.grid.dimensionality().max(config.block.dimensionality()),
        shared_mem = config.dynamic_shared_memory,
        args = packed.len(),
        stream = %stream,
        "enqueue kernel launch"
    );

    // SAFETY: forwarded to the caller.
    let result = unsafe { backend.enqueue(function, config, stream, &mut packed) };
    if let Err(ref error) = result {
        tracing::debug!(function = ?function, stream = %stream, error = %error, "kernel launch rejected");
    }
    result
}
