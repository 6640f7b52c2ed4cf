//! Index-space bookkeeping for the CPU backends.
//!
//! A kernel invocation on the CPU iterates over up to three contiguous
//! integer ranges. Each outer iteration is one block holding exactly one
//! thread, so block indices and the grid size are derived from the
//! ranges and the current index, never the reverse.

use std::fmt;

use crate::dim::Dim3;
use crate::error::{ResolveError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    pub const ALL: [Axis; 3] = [Axis::X, Axis::Y, Axis::Z];

    pub fn position(self) -> usize {
        match self {
            Axis::X => 0,
            Axis::Y => 1,
            Axis::Z => 2,
        }
    }

    pub fn letter(self) -> char {
        match self {
            Axis::X => 'x',
            Axis::Y => 'y',
            Axis::Z => 'z',
        }
    }

    /// Loop variable holding the current index in emitted CPU code.
    pub fn index_var(self) -> String {
        format!("__i{}", self.letter())
    }

    /// Bookkeeping variable holding the first element of the range.
    pub fn first_var(self) -> String {
        format!("__first_{}", self.letter())
    }

    /// Bookkeeping variable holding the range length.
    pub fn len_var(self) -> String {
        format!("__len_{}", self.letter())
    }
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.letter())
    }
}

/// A contiguous inclusive integer interval `first..=first + len - 1`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct IndexRange {
    pub first: i64,
    pub len: u64,
}

impl IndexRange {
    pub const fn new(first: i64, len: u64) -> Self {
        Self { first, len }
    }

    /// `first..=last`; empty when `last < first`.
    ///
    /// The full `i64::MIN..=i64::MAX` span has 2^64 elements, one more
    /// than `len` can hold; its length saturates at `u64::MAX`.
    pub fn inclusive(first: i64, last: i64) -> Self {
        let len = if last < first {
            0
        } else {
            last.abs_diff(first).saturating_add(1)
        };
        Self { first, len }
    }

    /// Last element, saturating at `i64::MAX`. For an empty range this is
    /// `first - 1`, saturating at `i64::MIN`.
    pub fn last(&self) -> i64 {
        match self.len.checked_sub(1) {
            Some(offset) => self.first.saturating_add_unsigned(offset),
            None => self.first.saturating_sub(1),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn contains(&self, index: i64) -> bool {
        index >= self.first && index.abs_diff(self.first) < self.len
    }

    /// 1-based position of `index` in the range, if it lies inside.
    pub fn position(&self, index: i64) -> Option<u64> {
        self.contains(index).then(|| index.abs_diff(self.first) + 1)
    }
}

impl Default for IndexRange {
    /// The range of an unused dimension: a single element at 1.
    fn default() -> Self {
        Self { first: 1, len: 1 }
    }
}

impl fmt::Display for IndexRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.first, self.last())
    }
}

/// The per-iteration index produced by the outer parallel loop.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct CurrentIndex {
    pub x: i64,
    pub y: i64,
    pub z: i64,
}

impl CurrentIndex {
    pub const fn new(x: i64, y: i64, z: i64) -> Self {
        Self { x, y, z }
    }

    pub fn get(&self, axis: Axis) -> i64 {
        match axis {
            Axis::X => self.x,
            Axis::Y => self.y,
            Axis::Z => self.z,
        }
    }
}

/// The ranges of one kernel invocation, one per logical dimension.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct IndexSpace {
    ranges: [IndexRange; 3],
}

impl IndexSpace {
    pub fn new(x: IndexRange, y: IndexRange, z: IndexRange) -> Self {
        Self { ranges: [x, y, z] }
    }

    /// Record 1 to 3 ranges; unused dimensions get a length-1 range.
    pub fn from_ranges(ranges: &[IndexRange]) -> Result<Self> {
        if ranges.len() > 3 {
            return Err(ResolveError::TooManyDimensions {
                found: ranges.len(),
            });
        }
        let mut space = IndexSpace::default();
        for (slot, range) in space.ranges.iter_mut().zip(ranges) {
            *slot = *range;
        }
        Ok(space)
    }

    /// Shorthand for a space of `1..=n` ranges, the usual array-sized launch.
    pub fn from_lengths(lengths: &[u64]) -> Result<Self> {
        let ranges: Vec<IndexRange> = lengths.iter().map(|&n| IndexRange::new(1, n)).collect();
        Self::from_ranges(&ranges)
    }

    pub fn range(&self, axis: Axis) -> IndexRange {
        self.ranges[axis.position()]
    }

    pub fn lengths(&self) -> Dim3 {
        Dim3::new(self.ranges[0].len, self.ranges[1].len, self.ranges[2].len)
    }

    pub fn firsts(&self) -> [i64; 3] {
        [
            self.ranges[0].first,
            self.ranges[1].first,
            self.ranges[2].first,
        ]
    }

    /// Total number of outer iterations, saturating at `u64::MAX`.
    pub fn volume(&self) -> u64 {
        self.lengths().volume()
    }

    /// The `linear`-th index in iteration order, x varying fastest.
    pub fn index_at(&self, linear: u64) -> CurrentIndex {
        let [nx, ny, _] = self.lengths().to_array().map(|n| n.max(1));
        let [fx, fy, fz] = self.firsts();
        let ix = linear % nx;
        let iy = (linear / nx) % ny;
        let iz = linear / nx.saturating_mul(ny);
        CurrentIndex::new(
            fx.saturating_add_unsigned(ix),
            fy.saturating_add_unsigned(iy),
            fz.saturating_add_unsigned(iz),
        )
    }

    /// Every index of the space in iteration order.
    pub fn indices(&self) -> impl Iterator<Item = CurrentIndex> + '_ {
        (0..self.volume()).map(move |linear| self.index_at(linear))
    }

    pub fn contains(&self, index: &CurrentIndex) -> bool {
        Axis::ALL
            .iter()
            .all(|&axis| self.range(axis).contains(index.get(axis)))
    }

    /// Number of blocks in the emulated grid.
    pub fn grid_dim(&self) -> Dim3 {
        self.lengths()
    }

    /// 1-based block index of `index`: `index[d] - first[d] + 1`.
    pub fn block_idx(&self, index: &CurrentIndex) -> Result<Dim3> {
        let mut out = [1u64; 3];
        for axis in Axis::ALL {
            let range = self.range(axis);
            let i = index.get(axis);
            out[axis.position()] = range
                .position(i)
                .ok_or(ResolveError::IndexOutOfRange {
                    axis,
                    index: i,
                    range,
                })?;
        }
        Ok(Dim3::from(out))
    }

    /// Block index of an index already known to lie in the space.
    pub(crate) fn block_idx_in(&self, index: &CurrentIndex) -> Dim3 {
        let [x, y, z] = Axis::ALL
            .map(|axis| index.get(axis).abs_diff(self.range(axis).first).saturating_add(1));
        Dim3::new(x, y, z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_dimension_scenario() {
        let space = IndexSpace::from_ranges(&[IndexRange::inclusive(3, 7)]).unwrap();
        assert_eq!(space.range(Axis::X).len, 5);
        assert_eq!(space.grid_dim(), Dim3::new(5, 1, 1));
        assert_eq!(
            space.block_idx(&CurrentIndex::new(5, 1, 1)).unwrap(),
            Dim3::new(3, 1, 1)
        );
    }

    #[test]
    fn test_block_idx_formula_over_ranges() {
        for first in [-4i64, 0, 1, 3, 100] {
            for len in [1u64, 2, 7] {
                let range = IndexRange::new(first, len);
                let space = IndexSpace::from_ranges(&[range, range]).unwrap();
                for i in first..first + len as i64 {
                    let idx = space.block_idx(&CurrentIndex::new(i, first, 1)).unwrap();
                    assert_eq!(idx.x as i64, i - first + 1);
                    assert!(idx.x >= 1);
                    assert_eq!(idx.y, 1);
                }
            }
        }
    }

    #[test]
    fn test_unused_dimensions_have_length_one() {
        let space = IndexSpace::from_lengths(&[8, 4]).unwrap();
        assert_eq!(space.grid_dim(), Dim3::new(8, 4, 1));
        assert_eq!(space.range(Axis::Z), IndexRange::default());
        assert_eq!(IndexSpace::default().grid_dim(), Dim3::ONE);
    }

    #[test]
    fn test_too_many_dimensions() {
        let r = IndexRange::new(1, 2);
        assert_eq!(
            IndexSpace::from_ranges(&[r, r, r, r]),
            Err(ResolveError::TooManyDimensions { found: 4 })
        );
    }

    #[test]
    fn test_out_of_range_index() {
        let space = IndexSpace::from_ranges(&[IndexRange::inclusive(3, 7)]).unwrap();
        let err = space.block_idx(&CurrentIndex::new(8, 1, 1)).unwrap_err();
        assert_eq!(
            err,
            ResolveError::IndexOutOfRange {
                axis: Axis::X,
                index: 8,
                range: IndexRange::new(3, 5),
            }
        );
        assert_eq!(
            err.to_string(),
            "index 8 on axis x lies outside range 3..=7"
        );
    }

    #[test]
    fn test_indices_cover_space_x_fastest() {
        let space =
            IndexSpace::from_ranges(&[IndexRange::new(0, 2), IndexRange::new(10, 2)]).unwrap();
        let all: Vec<_> = space.indices().collect();
        assert_eq!(
            all,
            vec![
                CurrentIndex::new(0, 10, 1),
                CurrentIndex::new(1, 10, 1),
                CurrentIndex::new(0, 11, 1),
                CurrentIndex::new(1, 11, 1),
            ]
        );
        assert!(all.iter().all(|i| space.contains(i)));
    }

    #[test]
    fn test_ranges_at_integer_limits() {
        let top = IndexRange::inclusive(i64::MAX - 1, i64::MAX);
        assert_eq!(top.len, 2);
        assert_eq!(top.last(), i64::MAX);
        assert!(top.contains(i64::MAX));
        let space = IndexSpace::from_ranges(&[top]).unwrap();
        assert_eq!(
            space.block_idx(&CurrentIndex::new(i64::MAX, 1, 1)).unwrap(),
            Dim3::new(2, 1, 1)
        );
        assert_eq!(space.index_at(1), CurrentIndex::new(i64::MAX, 1, 1));

        let bottom = IndexRange::new(i64::MIN, 3);
        assert_eq!(bottom.last(), i64::MIN + 2);
        assert!(!bottom.contains(i64::MIN + 3));
        assert_eq!(bottom.position(i64::MIN), Some(1));
        assert_eq!(IndexRange::new(i64::MIN, 0).last(), i64::MIN);

        let wide = IndexRange::inclusive(-1, i64::MAX);
        assert_eq!(wide.len, i64::MAX as u64 + 2);
        assert_eq!(wide.last(), i64::MAX);
        assert_eq!(wide.position(i64::MAX), Some(i64::MAX as u64 + 2));
        assert_eq!(wide.to_string(), format!("-1..={}", i64::MAX));

        let full = IndexRange::inclusive(i64::MIN, i64::MAX);
        assert_eq!(full.len, u64::MAX);
        assert!(full.contains(0));
        assert_eq!(full.position(i64::MIN), Some(1));
    }

    #[test]
    fn test_volume_saturates() {
        let r = IndexRange::new(0, u64::MAX);
        let space = IndexSpace::from_ranges(&[r, r]).unwrap();
        assert_eq!(space.volume(), u64::MAX);
        let space = IndexSpace::from_ranges(&[r, IndexRange::new(0, 0)]).unwrap();
        assert_eq!(space.volume(), 0);
    }

    #[test]
    fn test_empty_range() {
        let range = IndexRange::inclusive(5, 4);
        assert!(range.is_empty());
        assert!(!range.contains(5));
        let space = IndexSpace::from_ranges(&[range]).unwrap();
        assert_eq!(space.volume(), 0);
        assert_eq!(space.indices().count(), 0);
    }
}
