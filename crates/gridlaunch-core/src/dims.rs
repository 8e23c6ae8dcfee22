//! Three-component extents for grids and blocks.

use std::fmt;

/// A 3D extent: the shape of a grid of blocks or of a block of threads.
///
/// Components are not bounded here. Hardware limits depend on the device and
/// are enforced by the backend when a launch is enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Dimensions {
    /// Extent along x.
    pub x: u32,
    /// Extent along y.
    pub y: u32,
    /// Extent along z.
    pub z: u32,
}

/// Shape of a grid, in blocks.
pub type GridDimensions = Dimensions;

/// Shape of a block, in threads.
pub type BlockDimensions = Dimensions;

impl Dimensions {
    /// Creates an extent from its three components.
    #[must_use]
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }

    /// Creates a one-dimensional extent `(x, 1, 1)`.
    #[must_use]
    pub const fn linear(x: u32) -> Self {
        Self::new(x, 1, 1)
    }

    /// Creates a two-dimensional extent `(x, y, 1)`.
    #[must_use]
    pub const fn planar(x: u32, y: u32) -> Self {
        Self::new(x, y, 1)
    }

    /// Returns true if any component is zero.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.x == 0 || self.y == 0 || self.z == 0
    }

    /// Product of the three components, computed in 64 bits.
    #[must_use]
    pub const fn volume(&self) -> u64 {
        self.x as u64 * self.y as u64 * self.z as u64
    }

    /// Number of components strictly greater than one (0 to 3).
    #[must_use]
    pub const fn dimensionality(&self) -> u8 {
        (self.x > 1) as u8 + (self.y > 1) as u8 + (self.z > 1) as u8
    }

    /// Returns the components as a tuple, the shape the driver API expects.
    #[must_use]
    pub const fn as_tuple(&self) -> (u32, u32, u32) {
        (self.x, self.y, self.z)
    }
}

impl Default for Dimensions {
    fn default() -> Self {
        Self::new(1, 1, 1)
    }
}

impl From<u32> for Dimensions {
    fn from(x: u32) -> Self {
        Self::linear(x)
    }
}

impl From<(u32, u32)> for Dimensions {
    fn from((x, y): (u32, u32)) -> Self {
        Self::planar(x, y)
    }
}

impl From<(u32, u32, u32)> for Dimensions {
    fn from((x, y, z): (u32, u32, u32)) -> Self {
        Self::new(x, y, z)
    }
}

impl From<Dimensions> for (u32, u32, u32) {
    fn from(dims: Dimensions) -> Self {
        dims.as_tuple()
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_dimensionality_examples() {
        assert_eq!(Dimensions::new(256, 1, 1).dimensionality(), 1);
        assert_eq!(Dimensions::new(16, 16, 1).dimensionality(), 2);
        assert_eq!(Dimensions::new(8, 8, 8).dimensionality(), 3);
        assert_eq!(Dimensions::new(1, 1, 1).dimensionality(), 0);
        assert_eq!(Dimensions::new(1, 4, 1).dimensionality(), 1);
    }

    #[test]
    fn test_is_empty() {
        assert!(Dimensions::new(0, 1, 1).is_empty());
        assert!(Dimensions::new(4, 0, 4).is_empty());
        assert!(Dimensions::new(4, 4, 0).is_empty());
        assert!(!Dimensions::new(4, 4, 4).is_empty());
    }

    #[test]
    fn test_volume_does_not_overflow() {
        let dims = Dimensions::new(u32::MAX, u32::MAX, 1);
        assert_eq!(dims.volume(), u32::MAX as u64 * u32::MAX as u64);
        assert_eq!(Dimensions::new(65536, 65536, 2).volume(), 1 << 33);
    }

    #[test]
    fn test_conversions() {
        assert_eq!(Dimensions::from(128), Dimensions::new(128, 1, 1));
        assert_eq!(Dimensions::from((16, 8)), Dimensions::new(16, 8, 1));
        assert_eq!(Dimensions::from((2, 3, 4)), Dimensions::new(2, 3, 4));
        let tuple: (u32, u32, u32) = Dimensions::new(5, 6, 7).into();
        assert_eq!(tuple, (5, 6, 7));
        assert_eq!(Dimensions::default(), Dimensions::new(1, 1, 1));
    }

    #[test]
    fn test_display() {
        assert_eq!(Dimensions::new(256, 1, 1).to_string(), "(256, 1, 1)");
    }

    proptest! {
        #[test]
        fn prop_is_empty_iff_zero_component(x in 0u32..4, y in 0u32..4, z in 0u32..4) {
            let dims = Dimensions::new(x, y, z);
            prop_assert_eq!(dims.is_empty(), x == 0 || y == 0 || z == 0);
        }

        #[test]
        fn prop_volume_is_exact_product(x in 0u32..=65536, y in 0u32..=65536, z in 0u32..=65536) {
            let dims = Dimensions::new(x, y, z);
            prop_assert_eq!(dims.volume(), x as u64 * y as u64 * z as u64);
        }

        #[test]
        fn prop_dimensionality_counts_axes_above_one(x in 0u32..8, y in 0u32..8, z in 0u32..8) {
            let expected = [x, y, z].iter().filter(|&&c| c > 1).count() as u8;
            prop_assert_eq!(Dimensions::new(x, y, z).dimensionality(), expected);
        }

        #[test]
        fn prop_equality_is_componentwise(a in any::<(u32, u32, u32)>(), b in any::<(u32, u32, u32)>()) {
            prop_assert_eq!(Dimensions::from(a) == Dimensions::from(b), a == b);
        }
    }
}
