//! Names of the native GPU runtime entry points.

use crate::backend::Backend;
use crate::emit::Expr;
use crate::primitive::Primitive;

fn namespace(backend: Backend) -> &'static str {
    match backend {
        Backend::Cuda => "cuda",
        Backend::Rocm => "rocm",
        Backend::Threads | Backend::Simd => "parakern",
    }
}

/// Native grid/block/thread query, e.g. `cuda::block_idx()`.
pub(super) fn query(backend: Backend, primitive: Primitive) -> Expr {
    Expr::call(format!("{}::{}", namespace(backend), primitive.name()), vec![])
}

/// Native block barrier.
pub(super) fn barrier(backend: Backend) -> Expr {
    let name = match backend {
        Backend::Rocm => "sync_workgroup",
        _ => "sync_threads",
    };
    Expr::call(format!("{}::{}", namespace(backend), name), vec![])
}
