//! CPU emulation formulas.
//!
//! Each outer iteration is a block of exactly one thread. The grid is
//! the index space itself, block indices are 1-based offsets into the
//! ranges, and block size and thread index are always `(1, 1, 1)`.
//! Variable names refer to the bookkeeping emitted around the kernel
//! body by the specializer.

use crate::emit::Expr;
use crate::index_space::Axis;

/// `Dim3::new(__len_x, __len_y, __len_z)`.
pub(super) fn grid_dim() -> Expr {
    let [x, y, z] = Axis::ALL.map(|axis| Expr::var(axis.len_var()));
    Expr::dim3(x, y, z)
}

/// Component `d` is `(__i<d> - __first_<d> + 1) as u64`.
pub(super) fn block_idx() -> Expr {
    let [x, y, z] = Axis::ALL.map(|axis| {
        Expr::cast(
            Expr::add(
                Expr::sub(Expr::var(axis.index_var()), Expr::var(axis.first_var())),
                Expr::Int(1),
            ),
            "u64",
        )
    });
    Expr::dim3(x, y, z)
}

/// Block size and thread index of a one-thread block.
pub(super) fn single_thread() -> Expr {
    Expr::dim3(Expr::Int(1), Expr::Int(1), Expr::Int(1))
}
