//! In-process recording backend.
//!
//! [`RecordingBackend`] stands in for a device. It owns a registry of named
//! device functions and a set of streams, checks each launch against its
//! [`DeviceLimits`] the way the hardware would, and appends accepted launches
//! to a per-stream command list instead of running anything. It is what the
//! dispatcher is tested against, and what host-only builds launch on.
//!
//! Launches get the shared-memory ceiling without opt-in unless the function
//! was given a larger one with [`RecordingBackend::apply_attributes`].

use std::collections::{HashMap, HashSet};
use std::ffi::c_void;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use parking_lot::{Mutex, RwLock};

use crate::attributes::FunctionAttributes;
use crate::config::LaunchConfig;
use crate::dispatch::LaunchBackend;
use crate::error::{HostLaunchError, HostResult};
use crate::kernel::{KernelArg, KernelArgs, KernelHandle, PackedArgs, RawFunction, TypedKernel};
use crate::limits::DeviceLimits;
use crate::stream::StreamId;

const FUNCTION_BASE: usize = 0x1000;
const FUNCTION_STRIDE: usize = 0x10;
const STREAM_BASE: usize = 0x10_0000;
const STREAM_STRIDE: usize = 0x100;

/// One accepted launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchRecord {
    /// Position among all launches accepted by the backend.
    pub sequence: u64,
    /// The launched function.
    pub function: RawFunction,
    /// Name the function was registered under.
    pub kernel: String,
    /// Configuration as received.
    pub config: LaunchConfig,
    /// Target stream.
    pub stream: StreamId,
    /// Copied bytes of each argument, in parameter order.
    pub arguments: Vec<Vec<u8>>,
}

impl LaunchRecord {
    /// Reads argument `index` back as a `T`.
    ///
    /// Returns `None` if there is no such argument or its size differs from
    /// `T`'s.
    #[must_use]
    pub fn argument<T: KernelArg>(&self, index: usize) -> Option<T> {
        let bytes = self.arguments.get(index)?;
        if bytes.len() != std::mem::size_of::<T>() {
            return None;
        }
        // SAFETY: length checked, `KernelArg` types are plain old data, and
        // the read does not assume alignment.
        Some(unsafe { std::ptr::read_unaligned(bytes.as_ptr() as *const T) })
    }
}

#[derive(Debug, Default)]
struct CommandLog {
    by_stream: HashMap<StreamId, Vec<LaunchRecord>>,
    next_sequence: u64,
}

/// A [`LaunchBackend`] that validates and records launches without running
/// them.
pub struct RecordingBackend {
    limits: DeviceLimits,
    kernels: RwLock<HashMap<RawFunction, String>>,
    attributes: RwLock<HashMap<RawFunction, FunctionAttributes>>,
    streams: RwLock<HashSet<StreamId>>,
    log: Mutex<CommandLog>,
    next_function: AtomicUsize,
    next_stream: AtomicUsize,
    attempts: AtomicU64,
}

impl RecordingBackend {
    /// Creates a backend enforcing `limits`.
    #[must_use]
    pub fn new(limits: DeviceLimits) -> Self {
        let streams = [StreamId::DEFAULT, StreamId::LEGACY, StreamId::PER_THREAD]
            .into_iter()
            .collect();
        Self {
            limits,
            kernels: RwLock::new(HashMap::new()),
            attributes: RwLock::new(HashMap::new()),
            streams: RwLock::new(streams),
            log: Mutex::new(CommandLog::default()),
            next_function: AtomicUsize::new(0),
            next_stream: AtomicUsize::new(0),
            attempts: AtomicU64::new(0),
        }
    }

    /// Limits this backend enforces.
    pub fn limits(&self) -> &DeviceLimits {
        &self.limits
    }

    /// Registers a device function and returns an untyped handle to it.
    pub fn register_kernel(&self, name: impl Into<String>) -> KernelHandle {
        let index = self.next_function.fetch_add(1, Ordering::Relaxed);
        let addr = FUNCTION_BASE + index * FUNCTION_STRIDE;
        let raw = RawFunction::from_ptr(addr as *mut c_void)
            .unwrap_or_else(|| unreachable!("function addresses start above zero"));
        let name = name.into();
        tracing::debug!(kernel = %name, function = ?raw, "registered host kernel");
        self.kernels.write().insert(raw, name);
        KernelHandle::from_raw(raw)
    }

    /// Registers a device function whose parameter list is `A`.
    pub fn register_typed<A: KernelArgs>(&self, name: impl Into<String>) -> TypedKernel<A> {
        let handle = self.register_kernel(name);
        // SAFETY: host functions have no device code; the signature declared
        // at registration is the function's signature.
        unsafe { handle.assume_signature() }
    }

    /// Creates a new stream.
    pub fn create_stream(&self) -> StreamId {
        let index = self.next_stream.fetch_add(1, Ordering::Relaxed);
        let stream = StreamId::from_addr(STREAM_BASE + index * STREAM_STRIDE);
        self.streams.write().insert(stream);
        tracing::debug!(stream = %stream, "created host stream");
        stream
    }

    /// Name a function was registered under.
    pub fn kernel_name(&self, function: RawFunction) -> Option<String> {
        self.kernels.read().get(&function).cloned()
    }

    /// Sets per-function attributes ahead of launching `kernel`.
    ///
    /// Fields left unset keep their previous value. An opt-in above the
    /// device's opt-in ceiling is refused and changes nothing.
    pub fn apply_attributes(
        &self,
        kernel: KernelHandle,
        attributes: &FunctionAttributes,
    ) -> HostResult<()> {
        let function = kernel.raw();
        if !self.kernels.read().contains_key(&function) {
            return Err(HostLaunchError::InvalidHandle(function));
        }
        if let Some(bytes) = attributes.max_dynamic_shared_memory {
            self.limits.check_opt_in(bytes)?;
        }

        let mut table = self.attributes.write();
        let current = table.get(&function).copied().unwrap_or_default();
        table.insert(function, current.merged_with(attributes));
        tracing::debug!(
            function = ?function,
            max_dynamic_shared = ?attributes.max_dynamic_shared_memory,
            "applied host function attributes"
        );
        Ok(())
    }

    /// Attributes applied to `function` so far.
    pub fn function_attributes(&self, function: RawFunction) -> FunctionAttributes {
        self.attributes
            .read()
            .get(&function)
            .copied()
            .unwrap_or_default()
    }

    /// Launches accepted on `stream`, in enqueue order.
    pub fn commands(&self, stream: StreamId) -> Vec<LaunchRecord> {
        self.log
            .lock()
            .by_stream
            .get(&stream)
            .cloned()
            .unwrap_or_default()
    }

    /// Every accepted launch, ordered by sequence number.
    pub fn all_commands(&self) -> Vec<LaunchRecord> {
        let mut all: Vec<LaunchRecord> = self
            .log
            .lock()
            .by_stream
            .values()
            .flatten()
            .cloned()
            .collect();
        all.sort_by_key(|record| record.sequence);
        all
    }

    /// Number of `enqueue` calls, accepted or not.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::Relaxed)
    }

    /// Forgets recorded launches and resets the attempt counter.
    pub fn clear(&self) {
        let mut log = self.log.lock();
        log.by_stream.clear();
        log.next_sequence = 0;
        self.attempts.store(0, Ordering::Relaxed);
    }

    fn validate(
        &self,
        function: RawFunction,
        config: &LaunchConfig,
        stream: StreamId,
    ) -> HostResult<String> {
        let kernel = self
            .kernels
            .read()
            .get(&function)
            .cloned()
            .ok_or(HostLaunchError::InvalidHandle(function))?;
        if !self.streams.read().contains(&stream) {
            return Err(HostLaunchError::InvalidStream(stream));
        }
        let opt_in = self.function_attributes(function).max_dynamic_shared_memory;
        self.limits.check_with_opt_in(config, opt_in)?;
        Ok(kernel)
    }
}

impl Default for RecordingBackend {
    fn default() -> Self {
        Self::new(DeviceLimits::default())
    }
}

impl LaunchBackend for RecordingBackend {
    type Error = HostLaunchError;

    unsafe fn enqueue(
        &self,
        function: RawFunction,
        config: &LaunchConfig,
        stream: StreamId,
        args: &mut PackedArgs<'_>,
    ) -> HostResult<()> {
        self.attempts.fetch_add(1, Ordering::Relaxed);
        let kernel = self.validate(function, config, stream)?;

        let arguments = args
            .sizes()
            .iter()
            .enumerate()
            .map(|(index, &size)| {
                args.bytes(index)
                    .map_or_else(|| vec![0; size], <[u8]>::to_vec)
            })
            .collect();

        let mut log = self.log.lock();
        let sequence = log.next_sequence;
        log.next_sequence += 1;
        log.by_stream.entry(stream).or_default().push(LaunchRecord {
            sequence,
            function,
            kernel,
            config: *config,
            stream,
            arguments,
        });
        Ok(())
    }
}
