//! Realization IR: what a resolved primitive turns into.
//!
//! Resolution never executes anything. It produces an [`Expr`] that the
//! specializer renders into the backend-concrete kernel text, the same
//! way a lowering pass emits target instructions.

use std::fmt;

use crate::backend::Backend;


#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinOp {
    Add,
    Sub,
}

impl BinOp {
    fn symbol(self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Expr {
    /// `path(args)`, a call into a native runtime.
    Call { path: String, args: Vec<Expr> },
    /// `path!(args)`, a native formatted-output facility.
    Macro { path: String, args: Vec<Expr> },
    /// `Dim3::new(x, y, z)`.
    Dim3(Box<[Expr; 3]>),
    /// `[a, b, ...]`, a fixed shape.
    Array(Vec<Expr>),
    Var(String),
    Int(i64),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `(expr) as ty`.
    Cast { expr: Box<Expr>, ty: &'static str },
    /// Kernel-author text passed through unchanged.
    Raw(String),
    /// The empty statement.
    Noop,
}

impl Expr {
    pub fn call(path: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Call {
            path: path.into(),
            args,
        }
    }

    pub fn macro_call(path: impl Into<String>, args: Vec<Expr>) -> Self {
        Expr::Macro {
            path: path.into(),
            args,
        }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var(name.into())
    }

    pub fn raw(text: impl Into<String>) -> Self {
        Expr::Raw(text.into())
    }

    pub fn dim3(x: Expr, y: Expr, z: Expr) -> Self {
        Expr::Dim3(Box::new([x, y, z]))
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op: BinOp::Add,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Self {
        Expr::Binary {
            op: BinOp::Sub,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn cast(expr: Expr, ty: &'static str) -> Self {
        Expr::Cast {
            expr: Box::new(expr),
            ty,
        }
    }

    pub fn is_noop(&self) -> bool {
        matches!(self, Expr::Noop)
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, items: &[Expr]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Call { path, args } => {
                write!(f, "{}(", path)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Macro { path, args } => {
                write!(f, "{}!(", path)?;
                write_list(f, args)?;
                f.write_str(")")
            }
            Expr::Dim3(parts) => {
                f.write_str("Dim3::new(")?;
                write_list(f, parts.as_slice())?;
                f.write_str(")")
            }
            Expr::Array(items) => {
                f.write_str("[")?;
                write_list(f, items)?;
                f.write_str("]")
            }
            Expr::Var(name) => f.write_str(name),
            Expr::Int(n) => write!(f, "{}", n),
            Expr::Binary { op, lhs, rhs } => {
                // Left-associative: only a compound right operand needs parens.
                write!(f, "{} {} ", lhs, op.symbol())?;
                if matches!(**rhs, Expr::Binary { .. }) {
                    write!(f, "({})", rhs)
                } else {
                    write!(f, "{}", rhs)
                }
            }
            Expr::Cast { expr, ty } => write!(f, "({}) as {}", expr, ty),
            Expr::Raw(text) => f.write_str(text),
            Expr::Noop => f.write_str("()"),
        }
    }
}

/// The native parallel-iteration construct wrapping a kernel body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ParallelConstruct {
    /// One thread-pool task per outer index.
    Threaded,
    /// Outer indices processed in fixed-width lane batches.
    Batched,
    /// Parallelism comes from the GPU launch; nothing is emitted.
    Empty,
}

impl ParallelConstruct {
    pub fn for_backend(backend: Backend) -> Self {
        match backend {
            Backend::Threads => ParallelConstruct::Threaded,
            Backend::Simd => ParallelConstruct::Batched,
            Backend::Cuda | Backend::Rocm => ParallelConstruct::Empty,
        }
    }

    /// Method called on the index space to iterate it, if any.
    pub fn method(self) -> Option<&'static str> {
        match self {
            ParallelConstruct::Threaded => Some("par_for_each"),
            ParallelConstruct::Batched => Some("batched_for_each"),
            ParallelConstruct::Empty => None,
        }
    }
}
