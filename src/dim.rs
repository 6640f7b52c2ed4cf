use std::fmt;

/// An `(x, y, z)` extent or position: grid size, block index, block size
/// or thread index, on every backend.
///
/// Components are 1-based where they denote positions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Dim3 {
    pub x: u64,
    pub y: u64,
    pub z: u64,
}

impl Dim3 {
    /// The single-thread block: `(1, 1, 1)`.
    pub const ONE: Dim3 = Dim3 { x: 1, y: 1, z: 1 };

    pub const fn new(x: u64, y: u64, z: u64) -> Self {
        Self { x, y, z }
    }

    /// Build from up to three components; missing ones default to 1.
    pub fn from_slice(components: &[u64]) -> Self {
        let get = |i: usize| components.get(i).copied().unwrap_or(1);
        Self::new(get(0), get(1), get(2))
    }

    pub fn to_array(self) -> [u64; 3] {
        [self.x, self.y, self.z]
    }

    /// Components as slice indices, saturating where `usize` is narrower.
    pub fn to_usize(self) -> [usize; 3] {
        self.to_array().map(|c| usize::try_from(c).unwrap_or(usize::MAX))
    }

    /// Product of the components, saturating at `u64::MAX`.
    pub fn volume(self) -> u64 {
        self.x.saturating_mul(self.y).saturating_mul(self.z)
    }
}

impl Default for Dim3 {
    fn default() -> Self {
        Dim3::ONE
    }
}

impl From<[u64; 3]> for Dim3 {
    fn from([x, y, z]: [u64; 3]) -> Self {
        Dim3::new(x, y, z)
    }
}

impl fmt::Display for Dim3 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_pads_with_one() {
        assert_eq!(Dim3::from_slice(&[5]), Dim3::new(5, 1, 1));
        assert_eq!(Dim3::from_slice(&[5, 2]), Dim3::new(5, 2, 1));
        assert_eq!(Dim3::from_slice(&[]), Dim3::ONE);
    }

    #[test]
    fn test_display_and_volume() {
        let d = Dim3::new(4, 3, 2);
        assert_eq!(d.to_string(), "(4, 3, 2)");
        assert_eq!(d.volume(), 24);
        assert_eq!(Dim3::new(u64::MAX, 2, 1).volume(), u64::MAX);
        assert_eq!(Dim3::new(u64::MAX, 2, 0).volume(), 0);
        assert_eq!(d.to_usize(), [4usize, 3, 2]);
        assert_eq!(Dim3::default(), Dim3::ONE);
    }
}
