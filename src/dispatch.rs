//! CPU parallel dispatch over an index space.
//!
//! These are the runtime counterparts of [`ParallelConstruct`]: emitted
//! CPU kernels call `par_for_each` or `batched_for_each` on their index
//! space. Iterations share nothing, so they go straight to rayon.

use rayon::prelude::*;
use tracing::trace;

use crate::emit::ParallelConstruct;
use crate::index_space::{CurrentIndex, IndexSpace};

/// Outer indices handled per batch by the vectorized backend.
pub const LANE_WIDTH: u64 = 8;

impl IndexSpace {
    /// Visit every index in order on the calling thread.
    pub fn for_each<F>(&self, f: F)
    where
        F: FnMut(CurrentIndex),
    {
        self.indices().for_each(f);
    }

    /// One thread-pool task per outer index.
    pub fn par_for_each<F>(&self, f: F)
    where
        F: Fn(CurrentIndex) + Sync + Send,
    {
        (0..self.volume())
            .into_par_iter()
            .for_each(|linear| f(self.index_at(linear)));
    }

    /// Fixed-width batches of [`LANE_WIDTH`] consecutive indices, each
    /// batch run as one task.
    pub fn batched_for_each<F>(&self, f: F)
    where
        F: Fn(CurrentIndex) + Sync + Send,
    {
        let volume = self.volume();
        (0..volume.div_ceil(LANE_WIDTH))
            .into_par_iter()
            .for_each(|batch| {
                let start = batch * LANE_WIDTH;
                let end = start.saturating_add(LANE_WIDTH).min(volume);
                for linear in start..end {
                    f(self.index_at(linear));
                }
            });
    }
}

impl ParallelConstruct {
    /// Run `f` over `space` with this construct. The empty construct
    /// runs nothing: on GPU backends the launch supplies the iterations.
    pub fn run<F>(self, space: &IndexSpace, f: F)
    where
        F: Fn(CurrentIndex) + Sync + Send,
    {
        trace!(construct = ?self, volume = space.volume(), "dispatch");
        match self {
            ParallelConstruct::Threaded => space.par_for_each(f),
            ParallelConstruct::Batched => space.batched_for_each(f),
            ParallelConstruct::Empty => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index_space::IndexRange;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    fn collect(construct: ParallelConstruct, space: &IndexSpace) -> Vec<CurrentIndex> {
        let seen = Mutex::new(Vec::new());
        construct.run(space, |i| seen.lock().unwrap().push(i));
        let mut seen = seen.into_inner().unwrap();
        seen.sort_by_key(|i| (i.z, i.y, i.x));
        seen
    }

    #[test]
    fn test_every_index_visited_once() {
        let space =
            IndexSpace::from_ranges(&[IndexRange::new(3, 5), IndexRange::new(-1, 3)]).unwrap();
        let expected: Vec<_> = space.indices().collect();
        assert_eq!(collect(ParallelConstruct::Threaded, &space), expected);
        assert_eq!(collect(ParallelConstruct::Batched, &space), expected);
    }

    #[test]
    fn test_batches_cover_partial_tail() {
        // 8 + 8 + 4 lanes.
        let space = IndexSpace::from_lengths(&[20]).unwrap();
        let count = AtomicU64::new(0);
        space.batched_for_each(|_| {
            count.fetch_add(1, Ordering::Relaxed);
        });
        assert_eq!(count.into_inner(), 20);
    }

    #[test]
    fn test_empty_construct_runs_nothing() {
        let space = IndexSpace::from_lengths(&[4, 4]).unwrap();
        assert!(collect(ParallelConstruct::Empty, &space).is_empty());
    }

    #[test]
    fn test_sequential_order() {
        let space = IndexSpace::from_lengths(&[2, 2]).unwrap();
        let mut seen = Vec::new();
        space.for_each(|i| seen.push((i.x, i.y)));
        assert_eq!(seen, vec![(1, 1), (2, 1), (1, 2), (2, 2)]);
    }
}
