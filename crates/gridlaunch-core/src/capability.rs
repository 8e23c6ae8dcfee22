//! Device compute capability (versioned feature level).

use std::fmt;

use crate::config::SharedMemorySize;

/// A device's compute capability, `major.minor`.
///
/// Ordering is lexicographic on `(major, minor)` and is defined for every
/// value, including invalid ones. Code that gates features on the capability
/// must check [`ComputeCapability::is_valid`] itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComputeCapability {
    /// Major version.
    pub major: u32,
    /// Minor version.
    pub minor: u32,
}

impl ComputeCapability {
    /// Exclusive upper bound for both components of a valid capability.
    pub const INVALID_BOUND: u32 = 9999;

    /// Creates a capability from its components.
    #[must_use]
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }

    /// Decodes the compact `major * 10 + minor` form.
    ///
    /// Only minor versions 0 through 9 can be represented; see
    /// [`ComputeCapability::try_combined_number`].
    #[must_use]
    pub const fn from_combined_number(combined: u32) -> Self {
        Self::new(combined / 10, combined % 10)
    }

    /// Encodes as `major * 10 + minor`.
    ///
    /// The encoding is ambiguous once `minor >= 10` (e.g. `7.10` and `8.0`
    /// both map to 80). Use [`ComputeCapability::try_combined_number`] when
    /// the input is not known to be in range.
    #[must_use]
    pub const fn as_combined_number(&self) -> u32 {
        self.major * 10 + self.minor
    }

    /// Encodes as `major * 10 + minor`, or `None` if the minor version does
    /// not fit in one decimal digit.
    #[must_use]
    pub fn try_combined_number(&self) -> Option<u32> {
        if self.minor >= 10 {
            return None;
        }
        self.major.checked_mul(10)?.checked_add(self.minor)
    }

    /// Both components lie strictly between zero and [`Self::INVALID_BOUND`].
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.major > 0
            && self.major < Self::INVALID_BOUND
            && self.minor > 0
            && self.minor < Self::INVALID_BOUND
    }

    /// Marketing name of the architecture generation, if known.
    #[must_use]
    pub fn architecture_name(&self) -> Option<&'static str> {
        let name = match (self.major, self.minor) {
            (1, _) => "Tesla",
            (2, _) => "Fermi",
            (3, _) => "Kepler",
            (5, _) => "Maxwell",
            (6, _) => "Pascal",
            (7, minor) if minor >= 5 => "Turing",
            (7, _) => "Volta",
            (8, 9) => "Ada",
            (8, _) => "Ampere",
            (9, _) => "Hopper",
            (10, _) | (12, _) => "Blackwell",
            _ => return None,
        };
        Some(name)
    }

    /// Both components are in range, allowing a zero minor version.
    ///
    /// Real devices ship as 7.0, 8.0 and 9.0, which [`Self::is_valid`]
    /// rejects. Per-generation presets use this check instead.
    #[must_use]
    pub const fn is_known_release(&self) -> bool {
        self.major > 0 && self.major < Self::INVALID_BOUND && self.minor < Self::INVALID_BOUND
    }

    /// Warp schedulers per multiprocessor, i.e. warps issued per cycle.
    #[must_use]
    pub fn max_warp_schedulings_per_processor_cycle(&self) -> Option<u32> {
        let schedulers = match (self.major, self.minor) {
            (1, _) => 1,
            (2, _) => 2,
            (6, 0) => 2,
            (3, _) | (5, _) | (6, _) | (7, _) | (8, _) | (9, _) | (10, _) | (12, _) => 4,
            _ => return None,
        };
        Some(schedulers)
    }

    /// Warps that can be resident on one multiprocessor at once.
    #[must_use]
    pub fn max_resident_warps_per_processor(&self) -> Option<u32> {
        let warps = match (self.major, self.minor) {
            (1, 0) | (1, 1) => 24,
            (1, _) => 32,
            (2, _) => 48,
            (3, _) | (5, _) | (6, _) => 64,
            (7, 5) => 32,
            (7, _) => 64,
            (8, 0) => 64,
            (8, _) => 48,
            (9, 0) | (10, 0) => 64,
            (12, 0) => 48,
            _ => return None,
        };
        Some(warps)
    }

    /// Threads a multiprocessor executes concurrently (its core count).
    #[must_use]
    pub fn max_in_flight_threads_per_processor(&self) -> Option<u32> {
        let threads = match (self.major, self.minor) {
            (1, _) => 8,
            (2, 0) => 32,
            (2, _) => 48,
            (3, _) => 192,
            (5, _) => 128,
            (6, 0) => 64,
            (6, _) => 128,
            (7, _) => 64,
            (8, 0) => 64,
            (8, _) | (9, 0) | (10, 0) | (12, 0) => 128,
            _ => return None,
        };
        Some(threads)
    }

    /// Threads per warp.
    #[must_use]
    pub fn warp_size(&self) -> Option<u32> {
        self.architecture_name().map(|_| 32)
    }

    /// Dynamic shared memory a block may use without opting in, in bytes.
    ///
    /// This is what a launch gets unless the function's maximum dynamic
    /// shared size attribute was raised first.
    #[must_use]
    pub fn max_shared_memory_per_block(&self) -> Option<SharedMemorySize> {
        const KIB: SharedMemorySize = 1024;
        self.architecture_name()?;
        let kib = if self.major == 1 { 16 } else { 48 };
        Some(kib * KIB)
    }

    /// Largest dynamic shared memory a block can opt in to, in bytes.
    ///
    /// Before 7.0 this equals [`Self::max_shared_memory_per_block`].
    #[must_use]
    pub fn max_shared_memory_per_block_optin(&self) -> Option<SharedMemorySize> {
        const KIB: SharedMemorySize = 1024;
        let kib = match (self.major, self.minor) {
            (7, 0) | (7, 2) => 96,
            (7, 5) => 64,
            (8, 0) | (8, 7) => 163,
            (8, 6) | (8, 9) => 99,
            (9, 0) | (10, 0) => 227,
            (12, 0) => 99,
            (7.., _) => return None,
            _ => return self.max_shared_memory_per_block(),
        };
        Some(kib * KIB)
    }
}

impl From<(u32, u32)> for ComputeCapability {
    fn from((major, minor): (u32, u32)) -> Self {
        Self::new(major, minor)
    }
}

impl fmt::Display for ComputeCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}
