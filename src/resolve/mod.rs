//! Primitive resolution: rewrite each abstract primitive into the form
//! the active backend needs.
//!
//! There is one method per primitive, each matching on the closed
//! [`Backend`] set. The GPU arms name the native runtime's own query,
//! barrier, allocator or print facility; the CPU arms come from
//! [`cpu`], which emulates one-thread blocks over the index space.

mod cpu;
mod native;

use tracing::trace;

use crate::backend::Backend;
use crate::emit::{Expr, ParallelConstruct};
use crate::error::{ResolveError, Result};
use crate::primitive::Primitive;
use crate::registry::BackendRegistry;
use crate::shared::SharedMemRequest;

/// Resolves primitives for one backend.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Resolver {
    backend: Backend,
}

impl Resolver {
    pub fn new(backend: Backend) -> Self {
        Self { backend }
    }

    /// Look the calling context up in the registry.
    pub fn for_context(registry: &BackendRegistry, context: &str) -> Result<Self> {
        registry.resolve(context).map(Self::new)
    }

    pub fn backend(&self) -> Backend {
        self.backend
    }

    pub fn grid_dim(&self) -> Expr {
        match self.backend {
            Backend::Cuda | Backend::Rocm => native::query(self.backend, Primitive::GridDim),
            Backend::Threads | Backend::Simd => cpu::grid_dim(),
        }
    }

    pub fn block_idx(&self) -> Expr {
        match self.backend {
            Backend::Cuda | Backend::Rocm => native::query(self.backend, Primitive::BlockIdx),
            Backend::Threads | Backend::Simd => cpu::block_idx(),
        }
    }

    pub fn block_dim(&self) -> Expr {
        match self.backend {
            Backend::Cuda | Backend::Rocm => native::query(self.backend, Primitive::BlockDim),
            Backend::Threads | Backend::Simd => cpu::single_thread(),
        }
    }

    pub fn thread_idx(&self) -> Expr {
        match self.backend {
            Backend::Cuda | Backend::Rocm => native::query(self.backend, Primitive::ThreadIdx),
            Backend::Threads | Backend::Simd => cpu::single_thread(),
        }
    }

    /// Block barrier. A no-op on the CPU, where a block has one thread.
    pub fn sync_threads(&self) -> Expr {
        match self.backend {
            Backend::Cuda | Backend::Rocm => native::barrier(self.backend),
            Backend::Threads | Backend::Simd => Expr::Noop,
        }
    }

    pub fn shared_mem(&self, request: &SharedMemRequest) -> Expr {
        request.realize(self.backend)
    }

    pub fn show(&self, args: Vec<Expr>) -> Result<Expr> {
        match self.backend {
            Backend::Cuda => Ok(Expr::macro_call("cuda::show", args)),
            Backend::Rocm => Err(ResolveError::UnsupportedFeature {
                backend: self.backend,
                primitive: Primitive::Show.name().to_string(),
            }),
            Backend::Threads | Backend::Simd => Ok(Expr::macro_call("parakern::show", args)),
        }
    }

    pub fn print_line(&self, args: Vec<Expr>) -> Expr {
        match self.backend {
            Backend::Cuda => Expr::macro_call("cuda::println", args),
            Backend::Rocm => Expr::macro_call("rocm::println", args),
            Backend::Threads | Backend::Simd => Expr::macro_call("parakern::print_line", args),
        }
    }

    /// The parallel-iteration construct wrapping kernel bodies.
    pub fn dispatch(&self) -> ParallelConstruct {
        ParallelConstruct::for_backend(self.backend)
    }

    /// Resolve `primitive` applied to call-site `args`, checking arity.
    pub fn resolve(&self, primitive: Primitive, args: Vec<Expr>) -> Result<Expr> {
        primitive.check_arity(args.len())?;
        let expr = match primitive {
            Primitive::GridDim => self.grid_dim(),
            Primitive::BlockIdx => self.block_idx(),
            Primitive::BlockDim => self.block_dim(),
            Primitive::ThreadIdx => self.thread_idx(),
            Primitive::SyncThreads => self.sync_threads(),
            Primitive::SharedMem => self.shared_mem(&SharedMemRequest::from_args(args)?),
            Primitive::Show => self.show(args)?,
            Primitive::PrintLine => self.print_line(args),
        };
        trace!(backend = %self.backend, %primitive, realization = %expr, "resolved primitive");
        Ok(expr)
    }
}
