//! The abstract primitive call surface seen by kernel authors.

use std::fmt;

use crate::error::{ResolveError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Primitive {
    GridDim,
    BlockIdx,
    BlockDim,
    ThreadIdx,
    SyncThreads,
    SharedMem,
    Show,
    PrintLine,
}

/// Accepted argument counts of a primitive.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    Between(usize, usize),
    Any,
}

impl Arity {
    pub fn accepts(self, n: usize) -> bool {
        match self {
            Arity::Exactly(k) => n == k,
            Arity::Between(lo, hi) => (lo..=hi).contains(&n),
            Arity::Any => true,
        }
    }

    fn describe(self) -> &'static str {
        match self {
            Arity::Exactly(0) => "no",
            Arity::Between(2, 3) => "2 or 3",
            Arity::Exactly(_) | Arity::Between(..) | Arity::Any => "any number of",
        }
    }
}

impl Primitive {
    pub const ALL: [Primitive; 8] = [
        Primitive::GridDim,
        Primitive::BlockIdx,
        Primitive::BlockDim,
        Primitive::ThreadIdx,
        Primitive::SyncThreads,
        Primitive::SharedMem,
        Primitive::Show,
        Primitive::PrintLine,
    ];

    /// Name as written after `@` at a call site.
    pub fn name(self) -> &'static str {
        match self {
            Primitive::GridDim => "grid_dim",
            Primitive::BlockIdx => "block_idx",
            Primitive::BlockDim => "block_dim",
            Primitive::ThreadIdx => "thread_idx",
            Primitive::SyncThreads => "sync_threads",
            Primitive::SharedMem => "shared_mem",
            Primitive::Show => "show",
            Primitive::PrintLine => "println",
        }
    }

    pub fn from_name(name: &str) -> Result<Self> {
        Primitive::ALL
            .into_iter()
            .find(|p| p.name() == name)
            .ok_or_else(|| ResolveError::UnknownPrimitive {
                name: name.to_string(),
            })
    }

    pub fn arity(self) -> Arity {
        match self {
            Primitive::GridDim
            | Primitive::BlockIdx
            | Primitive::BlockDim
            | Primitive::ThreadIdx
            | Primitive::SyncThreads => Arity::Exactly(0),
            Primitive::SharedMem => Arity::Between(2, 3),
            Primitive::Show | Primitive::PrintLine => Arity::Any,
        }
    }

    pub fn check_arity(self, found: usize) -> Result<()> {
        let arity = self.arity();
        if arity.accepts(found) {
            Ok(())
        } else {
            Err(ResolveError::ArgumentCount {
                primitive: self,
                expected: arity.describe(),
                found,
            })
        }
    }

    /// Whether the primitive is only meaningful inside a kernel body.
    pub fn requires_kernel(self) -> bool {
        !matches!(self, Primitive::Show | Primitive::PrintLine)
    }

    pub fn usage(self) -> &'static str {
        match self {
            Primitive::GridDim => "@grid_dim()",
            Primitive::BlockIdx => "@block_idx()",
            Primitive::BlockDim => "@block_dim()",
            Primitive::ThreadIdx => "@thread_idx()",
            Primitive::SyncThreads => "@sync_threads()",
            Primitive::SharedMem => "@shared_mem(T, (dims...)[, offset_bytes])",
            Primitive::Show => "@show(values...)",
            Primitive::PrintLine => "@println(values...)",
        }
    }
}

impl fmt::Display for Primitive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for p in Primitive::ALL {
            assert_eq!(Primitive::from_name(p.name()), Ok(p));
        }
        assert_eq!(
            Primitive::from_name("warp_size"),
            Err(ResolveError::UnknownPrimitive {
                name: "warp_size".to_string()
            })
        );
    }

    #[test]
    fn test_shared_mem_arity_boundaries() {
        assert!(Primitive::SharedMem.check_arity(1).is_err());
        assert!(Primitive::SharedMem.check_arity(2).is_ok());
        assert!(Primitive::SharedMem.check_arity(3).is_ok());
        assert!(Primitive::SharedMem.check_arity(4).is_err());
    }

    #[test]
    fn test_queries_take_no_arguments() {
        for p in [
            Primitive::GridDim,
            Primitive::BlockIdx,
            Primitive::BlockDim,
            Primitive::ThreadIdx,
            Primitive::SyncThreads,
        ] {
            assert!(p.check_arity(0).is_ok());
            assert_eq!(
                p.check_arity(1),
                Err(ResolveError::ArgumentCount {
                    primitive: p,
                    expected: "no",
                    found: 1
                })
            );
        }
        assert!(Primitive::Show.check_arity(7).is_ok());
        assert!(Primitive::PrintLine.check_arity(0).is_ok());
    }
}
