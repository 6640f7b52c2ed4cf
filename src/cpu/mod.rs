//! CPU kernel emulation.
//!
//! A launch runs one closure per outer index of an [`IndexSpace`]. Each
//! call sees a [`BlockContext`] answering the same queries the GPU
//! primitives answer: one block per index, one thread per block.
//!
//! Blocks run concurrently on the rayon pool, so the kernel is `Fn +
//! Sync` and cannot hold `&mut` borrows of its outputs. Write results
//! through something shared: atomics, a slice of `Mutex`es, or a value
//! returned per block and collected afterwards. Each block owns the
//! element at its own block index, so such writes never contend.

use std::fmt::{self, Write as _};

use tracing::debug;

use crate::backend::Backend;
use crate::dim::Dim3;
use crate::emit::ParallelConstruct;
use crate::error::{ResolveError, Result};
use crate::index_space::{CurrentIndex, IndexSpace};
use crate::shared::SharedBuffer;

/// What a kernel body can ask about its position in the emulated grid.
#[derive(Clone, Copy, Debug)]
pub struct BlockContext<'a> {
    space: &'a IndexSpace,
    index: CurrentIndex,
    block_idx: Dim3,
}

impl<'a> BlockContext<'a> {
    pub fn new(space: &'a IndexSpace, index: CurrentIndex) -> Result<Self> {
        let block_idx = space.block_idx(&index)?;
        Ok(Self {
            space,
            index,
            block_idx,
        })
    }

    fn within(space: &'a IndexSpace, index: CurrentIndex) -> Self {
        Self {
            space,
            index,
            block_idx: space.block_idx_in(&index),
        }
    }

    /// The raw outer index, in the caller's own coordinates.
    pub fn index(&self) -> CurrentIndex {
        self.index
    }

    pub fn grid_dim(&self) -> Dim3 {
        self.space.grid_dim()
    }

    pub fn block_idx(&self) -> Dim3 {
        self.block_idx
    }

    pub fn block_dim(&self) -> Dim3 {
        Dim3::ONE
    }

    pub fn thread_idx(&self) -> Dim3 {
        Dim3::ONE
    }

    /// Only one thread per block, so there is nothing to wait for.
    pub fn sync_threads(&self) {}

    /// A fresh zeroed scratch buffer, private to this iteration.
    pub fn shared_mem<T, const N: usize>(&self, shape: [usize; N]) -> SharedBuffer<T>
    where
        T: Default + Clone,
    {
        SharedBuffer::zeroed(shape)
    }
}

/// Run `kernel` once per index of `space` with the backend's dispatch
/// construct. GPU backends cannot be emulated here.
pub fn launch<F>(backend: Backend, space: &IndexSpace, kernel: F) -> Result<()>
where
    F: Fn(&BlockContext<'_>) + Sync + Send,
{
    if backend.is_gpu() {
        return Err(ResolveError::UnsupportedFeature {
            backend,
            primitive: "cpu launch".to_string(),
        });
    }
    let construct = ParallelConstruct::for_backend(backend);
    debug!(%backend, grid = %space.grid_dim(), "launching cpu kernel");
    construct.run(space, |index| kernel(&BlockContext::within(space, index)));
    Ok(())
}

/// Backing for [`show!`](crate::show): one `expr = value` line per argument.
#[doc(hidden)]
pub fn format_show(values: &[(&str, &dyn fmt::Debug)]) -> String {
    let mut out = String::new();
    for (expr, value) in values {
        // Writing to a String cannot fail.
        let _ = writeln!(out, "{} = {:?}", expr, value);
    }
    out
}

/// Backing for [`print_line!`](crate::print_line): arguments concatenated
/// with no separator.
#[doc(hidden)]
pub fn format_line(values: &[&dyn fmt::Display]) -> String {
    let mut out = String::new();
    for value in values {
        let _ = write!(out, "{}", value);
    }
    out
}

/// Print each argument's source text and debug value on its own line.
#[macro_export]
macro_rules! show {
    ($($value:expr),* $(,)?) => {
        ::std::print!(
            "{}",
            $crate::cpu::format_show(&[$((::std::stringify!($value), &$value as &dyn ::std::fmt::Debug)),*])
        )
    };
}

/// Print the arguments' display forms back to back, then a newline.
#[macro_export]
macro_rules! print_line {
    ($($value:expr),* $(,)?) => {
        ::std::println!(
            "{}",
            $crate::cpu::format_line(&[$(&$value as &dyn ::std::fmt::Display),*])
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::index_space::IndexRange;
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::Mutex;

    #[test]
    fn test_launch_covers_every_block() {
        let space =
            IndexSpace::from_ranges(&[IndexRange::inclusive(3, 7), IndexRange::new(0, 2)]).unwrap();
        for backend in [Backend::Threads, Backend::Simd] {
            let seen = Mutex::new(Vec::new());
            launch(backend, &space, |ctx| {
                assert_eq!(ctx.grid_dim(), Dim3::new(5, 2, 1));
                assert_eq!(ctx.block_dim(), Dim3::ONE);
                assert_eq!(ctx.thread_idx(), Dim3::ONE);
                seen.lock().unwrap().push(ctx.block_idx().to_array());
            })
            .unwrap();
            let mut seen = seen.into_inner().unwrap();
            seen.sort();
            let mut expected = Vec::new();
            for x in 1..=5 {
                for y in 1..=2 {
                    expected.push([x, y, 1]);
                }
            }
            assert_eq!(seen, expected);
        }
    }

    #[test]
    fn test_launch_on_gpu_backend_fails() {
        let space = IndexSpace::from_lengths(&[4]).unwrap();
        let calls = AtomicU64::new(0);
        let err = launch(Backend::Cuda, &space, |_| {
            calls.fetch_add(1, Ordering::Relaxed);
        })
        .unwrap_err();
        assert_eq!(
            err.to_string(),
            "primitive 'cpu launch' is not supported on backend 'cuda'"
        );
        assert_eq!(calls.into_inner(), 0);
    }

    #[test]
    fn test_shared_mem_is_fresh_per_iteration() {
        let space = IndexSpace::from_lengths(&[64]).unwrap();
        let dirty = AtomicU64::new(0);
        launch(Backend::Threads, &space, |ctx| {
            let mut scratch = ctx.shared_mem::<u64, 1>([4]);
            if scratch.as_slice().iter().any(|&v| v != 0) {
                dirty.fetch_add(1, Ordering::Relaxed);
            }
            ctx.sync_threads();
            scratch.as_mut_slice().fill(ctx.block_idx().x);
        })
        .unwrap();
        assert_eq!(dirty.into_inner(), 0);
    }

    #[test]
    fn test_diffusion_step_writes_through_shared_outputs() {
        let n = 6;
        let t: Vec<f64> = (0..n).map(|i| (i * i) as f64).collect();
        let t2: Vec<Mutex<f64>> = t.iter().map(|&v| Mutex::new(v)).collect();
        let dt = 0.1;
        let space = IndexSpace::from_lengths(&[n as u64]).unwrap();
        launch(Backend::Simd, &space, |ctx| {
            let [b, _, _] = ctx.block_idx().to_usize();
            let [d, _, _] = ctx.block_dim().to_usize();
            let [th, _, _] = ctx.thread_idx().to_usize();
            let i = (b - 1) * d + th;
            let mut tile = ctx.shared_mem::<f64, 1>([d]);
            tile[[th - 1]] = t[i - 1];
            ctx.sync_threads();
            if i > 1 && i < n {
                let c = tile[[th - 1]];
                *t2[i - 1].lock().unwrap() = c + dt * (t[i - 2] - 2.0 * c + t[i]);
            }
        })
        .unwrap();
        let t2: Vec<f64> = t2.into_iter().map(|m| m.into_inner().unwrap()).collect();
        // Second difference of i^2 is 2 everywhere inside the rod.
        for i in 1..n - 1 {
            assert!((t2[i] - (t[i] + 0.2)).abs() < 1e-12);
        }
        assert_eq!(t2[0], t[0]);
        assert_eq!(t2[n - 1], t[n - 1]);
    }

    #[test]
    fn test_context_at_integer_limits() {
        let top = IndexRange::inclusive(i64::MAX - 1, i64::MAX);
        let space = IndexSpace::from_ranges(&[top]).unwrap();
        let ctx = BlockContext::new(&space, CurrentIndex::new(i64::MAX, 1, 1)).unwrap();
        assert_eq!(ctx.block_idx(), Dim3::new(2, 1, 1));
        let seen = Mutex::new(Vec::new());
        launch(Backend::Threads, &space, |ctx| {
            seen.lock().unwrap().push(ctx.index().x);
        })
        .unwrap();
        let mut seen = seen.into_inner().unwrap();
        seen.sort();
        assert_eq!(seen, vec![i64::MAX - 1, i64::MAX]);
    }

    #[test]
    fn test_context_rejects_index_outside_space() {
        let space = IndexSpace::from_ranges(&[IndexRange::inclusive(3, 7)]).unwrap();
        assert!(BlockContext::new(&space, CurrentIndex::new(2, 1, 1)).is_err());
        let ctx = BlockContext::new(&space, CurrentIndex::new(5, 1, 1)).unwrap();
        assert_eq!(ctx.block_idx(), Dim3::new(3, 1, 1));
        assert_eq!(ctx.index(), CurrentIndex::new(5, 1, 1));
    }

    #[test]
    fn test_output_formatting() {
        let n = 3;
        let values: [(&str, &dyn fmt::Debug); 2] = [("n", &n), ("\"a\"", &"a")];
        assert_eq!(format_show(&values), "n = 3\n\"a\" = \"a\"\n");
        assert_eq!(format_line(&[&"block ", &2, &" of ", &4.5]), "block 2 of 4.5");
        assert_eq!(format_line(&[]), "");
    }

    #[test]
    fn test_macros_expand() {
        let x = 1u8;
        crate::show!(x, x + 1);
        crate::print_line!("x is ", x);
        crate::print_line!();
    }
}
