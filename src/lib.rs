pub mod backend;
pub mod cpu;
pub mod diagnostic;
pub mod dim;
pub mod dispatch;
pub mod emit;
pub mod error;
pub mod index_space;
pub mod lexeme;
pub mod lexer;
pub mod log;
pub mod primitive;
pub mod project;
pub mod registry;
pub mod resolve;
pub mod shared;
pub mod span;
pub mod specialize;

use std::path::Path;

pub use backend::Backend;
pub use diagnostic::Diagnostic;
pub use dim::Dim3;
pub use error::{ResolveError, Result};
pub use index_space::{CurrentIndex, IndexRange, IndexSpace};
pub use primitive::Primitive;
pub use registry::BackendRegistry;
pub use resolve::Resolver;
pub use specialize::{ResolvedSite, Specialized};

use diagnostic::render_diagnostics;

/// Everything CPU-specialized kernels refer to by bare name.
pub mod prelude {
    pub use crate::cpu::BlockContext;
    pub use crate::dim::Dim3;
    pub use crate::index_space::{CurrentIndex, IndexRange, IndexSpace};
    pub use crate::shared::SharedBuffer;
    pub use crate::{print_line, show};
}

/// Specialize a source string for the backend bound to `context`,
/// rendering any diagnostics to stderr.
pub fn specialize(
    source: &str,
    filename: &str,
    context: &str,
    registry: &BackendRegistry,
) -> std::result::Result<Specialized, Vec<Diagnostic>> {
    specialize::specialize_source(source, context, registry).map_err(|errors| {
        render_diagnostics(&errors, filename, source);
        errors
    })
}

/// Check that `source` specializes for `backend` without keeping the output.
pub fn check(
    source: &str,
    filename: &str,
    backend: Backend,
) -> std::result::Result<(), Vec<Diagnostic>> {
    let context = context_from_path(Path::new(filename));
    let registry = BackendRegistry::with_binding(&context, backend);
    specialize(source, filename, &context, &registry).map(|_| ())
}

/// The calling context of a source file: its file stem.
pub fn context_from_path(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "main".to_string())
}
