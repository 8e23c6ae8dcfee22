//! Queue (stream) identifiers.
//!
//! Streams are created and destroyed elsewhere; this module only names them.
//! A [`StreamId`] is the raw native handle value, passed through untouched to
//! the enqueue primitive.

use std::ffi::c_void;
use std::fmt;

/// Opaque identifier of a device command queue.
///
/// Copying a `StreamId` does not duplicate the stream. The identifier may be
/// shared between host threads; ordering across threads on one stream is the
/// device's concern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(usize);

impl StreamId {
    /// The default stream (the null handle).
    pub const DEFAULT: StreamId = StreamId(0);

    /// The legacy default stream, which synchronizes with all blocking streams.
    pub const LEGACY: StreamId = StreamId(0x1);

    /// The per-thread default stream.
    pub const PER_THREAD: StreamId = StreamId(0x2);

    /// Wraps a native stream handle.
    #[must_use]
    pub fn from_raw(raw: *mut c_void) -> Self {
        Self(raw as usize)
    }

    /// Wraps a native stream handle given as an integer.
    #[must_use]
    pub const fn from_addr(addr: usize) -> Self {
        Self(addr)
    }

    /// Returns the native stream handle.
    #[must_use]
    pub fn as_raw(self) -> *mut c_void {
        self.0 as *mut c_void
    }

    /// Returns the native stream handle as an integer.
    #[must_use]
    pub const fn addr(self) -> usize {
        self.0
    }

    /// True for [`StreamId::DEFAULT`].
    #[must_use]
    pub const fn is_default(self) -> bool {
        self.0 == Self::DEFAULT.0
    }
}

impl Default for StreamId {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::DEFAULT => f.write_str("default"),
            Self::LEGACY => f.write_str("legacy"),
            Self::PER_THREAD => f.write_str("per-thread"),
            Self(addr) => write!(f, "{:#x}", addr),
        }
    }
}

/// Stream scheduling priority. Lower values mean higher priority.
pub type StreamPriority = i32;

/// Priority streams are created with unless asked otherwise.
pub const DEFAULT_PRIORITY: StreamPriority = 0;

/// Whether an operation returns before or after the device finishes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Synchronicity {
    /// Return as soon as the command is recorded.
    #[default]
    Asynchronous,
    /// Return once the command has completed.
    Synchronous,
}
