//! Specialization errors.
//!
//! Every error is raised while resolving primitives, before any kernel
//! runs. None are retried: a kernel either specializes completely
//! against one backend or not at all.

use crate::backend::Backend;
use crate::diagnostic::Diagnostic;
use crate::index_space::{Axis, IndexRange};
use crate::primitive::Primitive;
use crate::span::Span;

pub type Result<T> = std::result::Result<T, ResolveError>;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ResolveError {
    /// No backend was ever bound to the calling context.
    #[error("no backend initialized for context '{context}'")]
    NotInitialized { context: String },

    /// The backend identity is not one of the known backends.
    #[error("unsupported backend '{identity}'")]
    UnsupportedBackend { identity: String },

    /// The backend is valid but does not implement the primitive.
    #[error("primitive '{primitive}' is not supported on backend '{backend}'")]
    UnsupportedFeature { backend: Backend, primitive: String },

    #[error("primitive '{primitive}' expects {expected} argument(s), found {found}")]
    ArgumentCount {
        primitive: Primitive,
        expected: &'static str,
        found: usize,
    },

    #[error("unknown primitive '@{name}'")]
    UnknownPrimitive { name: String },

    /// An index-dependent primitive was used outside a `@kernel` body.
    #[error("primitive '{primitive}' used outside a kernel body")]
    OutsideKernel { primitive: Primitive },

    #[error("context '{context}' is already bound to backend '{bound}', cannot rebind to '{requested}'")]
    AlreadyBound {
        context: String,
        bound: Backend,
        requested: Backend,
    },

    #[error("index space has {found} dimensions, at most 3 are supported")]
    TooManyDimensions { found: usize },

    #[error("index {index} on axis {axis} lies outside range {range}")]
    IndexOutOfRange {
        axis: Axis,
        index: i64,
        range: IndexRange,
    },
}

impl ResolveError {
    /// Attach a source location and explanatory notes.
    pub fn into_diagnostic(self, span: Span) -> Diagnostic {
        let diag = Diagnostic::error(self.to_string(), span);
        match self {
            ResolveError::NotInitialized { .. } => diag.with_help(
                "bind a backend with --backend or a [project]/[contexts] entry in parakern.toml"
                    .to_string(),
            ),
            ResolveError::UnsupportedBackend { .. } => diag.with_note(format!(
                "known backends: {}",
                Backend::ALL
                    .iter()
                    .map(|b| b.name())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            ResolveError::ArgumentCount { primitive, .. } => {
                diag.with_help(format!("usage: {}", primitive.usage()))
            }
            ResolveError::UnknownPrimitive { .. } => diag.with_note(format!(
                "known primitives: {}",
                Primitive::ALL
                    .iter()
                    .map(|p| format!("@{}", p.name()))
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            ResolveError::OutsideKernel { .. } => {
                diag.with_help("move the call inside a `@kernel fn` body".to_string())
            }
            ResolveError::UnsupportedFeature { .. }
            | ResolveError::AlreadyBound { .. }
            | ResolveError::TooManyDimensions { .. }
            | ResolveError::IndexOutOfRange { .. } => diag,
        }
    }
}
