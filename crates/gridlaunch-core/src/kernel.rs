//! Kernel handles and typed kernel arguments.
//!
//! A device function is referenced in two ways:
//!
//! - [`KernelHandle`]: an opaque, copyable reference with no signature. Code
//!   that cannot name the kernel's parameter list (a library, or a caller that
//!   resolved the kernel by name at runtime) carries this.
//! - [`TypedKernel<A>`]: the same reference tagged with the parameter-list type
//!   `A`. Launching one checks the argument tuple against `A` at compile time.
//!
//! Turning a `KernelHandle` back into a `TypedKernel<A>` is `unsafe`: the
//! device function's real signature cannot be inspected at runtime, so the
//! caller vouches for it.

use std::ffi::c_void;
use std::fmt;
use std::marker::PhantomData;
use std::ptr::NonNull;

/// Raw reference to a device function resident in the current context.
///
/// For the CUDA backend this is a `CUfunction`. It does not own the code;
/// it stays valid while the module it came from stays loaded.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawFunction(NonNull<c_void>);

// SAFETY: a device function reference is an immutable identifier; the driver
// accepts it from any host thread.
unsafe impl Send for RawFunction {}
unsafe impl Sync for RawFunction {}

impl RawFunction {
    /// Wraps a native function pointer. Returns `None` for null.
    #[must_use]
    pub fn from_ptr(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(Self)
    }

    /// Returns the native function pointer.
    #[must_use]
    pub fn as_ptr(self) -> *mut c_void {
        self.0.as_ptr()
    }

    /// Returns the pointer value as an integer.
    #[must_use]
    pub fn addr(self) -> usize {
        self.0.as_ptr() as usize
    }
}

impl fmt::Debug for RawFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RawFunction({:p})", self.0)
    }
}

/// Opaque, copyable reference to a compiled device function.
///
/// Obtained from whatever resolved the symbol (a loaded module, a registry).
/// It says nothing about the function's parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct KernelHandle {
    raw: RawFunction,
}

impl KernelHandle {
    /// Wraps an already-resolved device function.
    #[must_use]
    pub const fn from_raw(raw: RawFunction) -> Self {
        Self { raw }
    }

    /// Returns the underlying device function reference.
    #[must_use]
    pub const fn raw(&self) -> RawFunction {
        self.raw
    }

    /// Tags this handle with the parameter list `A`.
    ///
    /// # Safety
    ///
    /// `A` must match the device function's parameter list exactly: same
    /// count, same order, same size and representation per argument. Nothing
    /// checks this; a mismatch makes every launch through the result undefined
    /// behavior on the device.
    #[must_use]
    pub const unsafe fn assume_signature<A: KernelArgs>(self) -> TypedKernel<A> {
        TypedKernel {
            handle: self,
            _signature: PhantomData,
        }
    }
}

impl From<RawFunction> for KernelHandle {
    fn from(raw: RawFunction) -> Self {
        Self::from_raw(raw)
    }
}

/// A kernel handle whose parameter list is known to be `A`.
pub struct TypedKernel<A> {
    handle: KernelHandle,
    _signature: PhantomData<fn(A)>,
}

impl<A: KernelArgs> TypedKernel<A> {
    /// Tags `handle` with the parameter list `A`.
    ///
    /// # Safety
    ///
    /// Same contract as [`KernelHandle::assume_signature`].
    #[must_use]
    pub const unsafe fn from_handle(handle: KernelHandle) -> Self {
        // SAFETY: forwarded to the caller.
        unsafe { handle.assume_signature() }
    }

    /// Drops the signature, keeping the reference.
    #[must_use]
    pub const fn handle(&self) -> KernelHandle {
        self.handle
    }
}

impl<A> Clone for TypedKernel<A> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<A> Copy for TypedKernel<A> {}

impl<A> PartialEq for TypedKernel<A> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle
    }
}

impl<A> Eq for TypedKernel<A> {}

impl<A> fmt::Debug for TypedKernel<A> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedKernel")
            .field("raw", &self.handle.raw())
            .field("signature", &std::any::type_name::<A>())
            .finish()
    }
}

impl<A> From<TypedKernel<A>> for KernelHandle {
    fn from(kernel: TypedKernel<A>) -> Self {
        kernel.handle
    }
}

/// A launchable kernel symbol with a statically known parameter list.
///
/// ```compile_fail
/// use gridlaunch_core::prelude::*;
///
/// let backend = RecordingBackend::default();
/// let not_a_kernel = 42u32;
/// let config = LaunchConfig::new(1u32, 1u32);
/// launch_on_default(&backend, &not_a_kernel, &config, ());
/// ```
#[diagnostic::on_unimplemented(
    message = "`{Self}` is not a kernel function",
    label = "expected a kernel symbol, found a plain value",
    note = "launch a `TypedKernel<Args>`, or use `launch_handle` with a `KernelHandle`"
)]
pub trait KernelFunction {
    /// The kernel's parameter list as a tuple.
    type Args: KernelArgs;

    /// The device function to enqueue.
    fn raw_function(&self) -> RawFunction;
}

impl<A: KernelArgs> KernelFunction for TypedKernel<A> {
    type Args = A;

    fn raw_function(&self) -> RawFunction {
        self.handle.raw()
    }
}

impl<K: KernelFunction + ?Sized> KernelFunction for &K {
    type Args = K::Args;

    fn raw_function(&self) -> RawFunction {
        (**self).raw_function()
    }
}

/// Typed device address of an array of `T`.
#[repr(transparent)]
pub struct DevicePtr<T> {
    addr: u64,
    _marker: PhantomData<*mut T>,
}

// SAFETY: a device address is plain data on the host side.
unsafe impl<T> Send for DevicePtr<T> {}
unsafe impl<T> Sync for DevicePtr<T> {}

impl<T> DevicePtr<T> {
    /// Wraps a device address.
    #[must_use]
    pub const fn from_addr(addr: u64) -> Self {
        Self {
            addr,
            _marker: PhantomData,
        }
    }

    /// The null device address.
    #[must_use]
    pub const fn null() -> Self {
        Self::from_addr(0)
    }

    /// Returns the device address.
    #[must_use]
    pub const fn addr(self) -> u64 {
        self.addr
    }

    /// True for the null address.
    #[must_use]
    pub const fn is_null(self) -> bool {
        self.addr == 0
    }

    /// Address `elements` items further along.
    ///
    /// Wraps around the 64-bit address space, as device pointer arithmetic
    /// does; the result is only meaningful inside one allocation.
    #[must_use]
    pub const fn offset(self, elements: u64) -> Self {
        let bytes = elements.wrapping_mul(std::mem::size_of::<T>() as u64);
        Self::from_addr(self.addr.wrapping_add(bytes))
    }
}

impl<T> Clone for DevicePtr<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for DevicePtr<T> {}

impl<T> PartialEq for DevicePtr<T> {
    fn eq(&self, other: &Self) -> bool {
        self.addr == other.addr
    }
}

impl<T> Eq for DevicePtr<T> {}

impl<T> fmt::Debug for DevicePtr<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DevicePtr<{}>({:#x})", std::any::type_name::<T>(), self.addr)
    }
}

/// A value that can be passed to a kernel by copying its bytes.
///
/// # Safety
///
/// The type must be plain old data with no padding, laid out as the device
/// code expects the corresponding parameter.
pub unsafe trait KernelArg: Copy {}

macro_rules! impl_kernel_arg {
    ($($ty:ty),* $(,)?) => {
        $(
            // SAFETY: primitive with no padding and a C-compatible layout.
            unsafe impl KernelArg for $ty {}
        )*
    };
}

impl_kernel_arg!(u8, i8, u16, i16, u32, i32, u64, i64, usize, isize, f32, f64);

// SAFETY: `repr(transparent)` over `u64`.
unsafe impl<T> KernelArg for DevicePtr<T> {}

/// Argument pointers for one launch, in parameter order.
///
/// Each entry points at an argument owned by the tuple this was packed from,
/// so the pack cannot outlive it. This is the `void**` array the driver
/// copies parameters out of.
pub struct PackedArgs<'a> {
    pointers: Vec<*mut c_void>,
    sizes: Vec<usize>,
    _args: PhantomData<&'a mut ()>,
}

impl<'a> PackedArgs<'a> {
    fn with_capacity(capacity: usize) -> Self {
        Self {
            pointers: Vec::with_capacity(capacity),
            sizes: Vec::with_capacity(capacity),
            _args: PhantomData,
        }
    }

    fn push<T: KernelArg>(&mut self, arg: &'a mut T) {
        self.pointers.push(arg as *mut T as *mut c_void);
        self.sizes.push(std::mem::size_of::<T>());
    }

    /// Number of arguments.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pointers.len()
    }

    /// True when the kernel takes no arguments.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pointers.is_empty()
    }

    /// Size in bytes of each argument.
    #[must_use]
    pub fn sizes(&self) -> &[usize] {
        &self.sizes
    }

    /// The pointer array handed to the enqueue primitive.
    pub fn as_mut_ptrs(&mut self) -> &mut [*mut c_void] {
        &mut self.pointers
    }

    /// Bytes of the argument at `index`.
    #[must_use]
    pub fn bytes(&self, index: usize) -> Option<&[u8]> {
        let ptr = *self.pointers.get(index)?;
        let len = self.sizes[index];
        // SAFETY: `ptr` points at a live `KernelArg` of `len` bytes borrowed
        // for `'a`, and `KernelArg` types have no padding.
        Some(unsafe { std::slice::from_raw_parts(ptr as *const u8, len) })
    }
}

impl fmt::Debug for PackedArgs<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PackedArgs")
            .field("sizes", &self.sizes)
            .finish()
    }
}

/// A kernel's full argument list, as a tuple of [`KernelArg`]s.
pub trait KernelArgs {
    /// Number of parameters.
    const ARITY: usize;

    /// Builds the pointer array for a launch.
    fn pack(&mut self) -> PackedArgs<'_>;
}

macro_rules! count_args {
    () => { 0usize };
    ($head:ident $($tail:ident)*) => { 1usize + count_args!($($tail)*) };
}

macro_rules! impl_kernel_args {
    ($($name:ident . $idx:tt),*) => {
        impl<$($name: KernelArg),*> KernelArgs for ($($name,)*) {
            const ARITY: usize = count_args!($($name)*);

            #[allow(unused_mut)]
            fn pack(&mut self) -> PackedArgs<'_> {
                let mut packed = PackedArgs::with_capacity(Self::ARITY);
                $( packed.push(&mut self.$idx); )*
                packed
            }
        }
    };
}

impl_kernel_args!();
impl_kernel_args!(A.0);
impl_kernel_args!(A.0, B.1);
impl_kernel_args!(A.0, B.1, C.2);
impl_kernel_args!(A.0, B.1, C.2, D.3);
impl_kernel_args!(A.0, B.1, C.2, D.3, E.4);
impl_kernel_args!(A.0, B.1, C.2, D.3, E.4, F.5);
impl_kernel_args!(A.0, B.1, C.2, D.3, E.4, F.5, G.6);
impl_kernel_args!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7);
impl_kernel_args!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8);
impl_kernel_args!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9);
impl_kernel_args!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9, K.10);
impl_kernel_args!(A.0, B.1, C.2, D.3, E.4, F.5, G.6, H.7, I.8, J.9, K.10, L.11);

#[cfg(test)]
mod tests {
    use super::*;

    fn fake_raw(addr: usize) -> RawFunction {
        RawFunction::from_ptr(addr as *mut c_void).unwrap()
    }

    #[test]
    fn test_raw_function_rejects_null() {
        assert!(RawFunction::from_ptr(std::ptr::null_mut()).is_none());
        assert_eq!(fake_raw(0x40).addr(), 0x40);
    }

    #[test]
    fn test_handle_exposes_raw_reference() {
        let raw = fake_raw(0x1000);
        let handle = KernelHandle::from_raw(raw);
        let copy = handle;
        assert_eq!(handle.raw(), raw);
        assert_eq!(copy, handle);
    }

    #[test]
    fn test_typed_kernel_erases_to_same_handle() {
        let handle = KernelHandle::from_raw(fake_raw(0x2000));
        let typed = unsafe { handle.assume_signature::<(DevicePtr<f32>, u32)>() };
        assert_eq!(typed.handle(), handle);
        assert_eq!(typed.raw_function(), handle.raw());
        assert_eq!(KernelHandle::from(typed), handle);
    }

    #[test]
    fn test_typed_kernel_debug_names_signature() {
        let typed = unsafe { TypedKernel::<(u32,)>::from_handle(fake_raw(0x10).into()) };
        assert!(format!("{:?}", typed).contains("u32"));
    }

    #[test]
    fn test_pack_preserves_order_and_values() {
        let mut args = (7u32, -3i64, 2.5f32, DevicePtr::<f32>::from_addr(0xabc0));
        let packed = args.pack();
        assert_eq!(packed.len(), 4);
        assert_eq!(packed.sizes(), &[4, 8, 4, 8]);
        assert_eq!(packed.bytes(0).unwrap(), &7u32.to_ne_bytes());
        assert_eq!(packed.bytes(1).unwrap(), &(-3i64).to_ne_bytes());
        assert_eq!(packed.bytes(2).unwrap(), &2.5f32.to_ne_bytes());
        assert_eq!(packed.bytes(3).unwrap(), &0xabc0u64.to_ne_bytes());
        assert!(packed.bytes(4).is_none());
    }

    #[test]
    fn test_pack_pointers_address_tuple_fields() {
        let mut args = (1u64, 2u64);
        let expected = [&args.0 as *const u64 as usize, &args.1 as *const u64 as usize];
        let mut packed = args.pack();
        let ptrs = packed.as_mut_ptrs();
        assert_eq!(ptrs[0] as usize, expected[0]);
        assert_eq!(ptrs[1] as usize, expected[1]);
    }

    #[test]
    fn test_empty_argument_list() {
        let mut args = ();
        assert!(args.pack().is_empty());
        assert_eq!(<() as KernelArgs>::ARITY, 0);
        assert_eq!(<(u8, u8, u8) as KernelArgs>::ARITY, 3);
    }

    #[test]
    fn test_device_ptr() {
        let ptr = DevicePtr::<f64>::from_addr(0x1000);
        assert_eq!(ptr.offset(4).addr(), 0x1000 + 32);
        assert!(DevicePtr::<u8>::null().is_null());
        assert_eq!(std::mem::size_of::<DevicePtr<f64>>(), 8);
    }

    #[test]
    fn test_device_ptr_offset_wraps() {
        let top = DevicePtr::<u32>::from_addr(u64::MAX - 3);
        assert_eq!(top.offset(1).addr(), 0);
        assert_eq!(DevicePtr::<u64>::from_addr(8).offset(u64::MAX).addr(), 0);
    }
}
