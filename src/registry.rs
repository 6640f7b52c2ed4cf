//! Backend registry: which backend each calling context specializes for.
//!
//! The registry is an explicit value built during initialization and
//! then shared read-only with every specialization. A context is bound
//! at most once; after that its backend never changes.

use std::collections::BTreeMap;

use tracing::debug;

use crate::backend::Backend;
use crate::error::{ResolveError, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BackendRegistry {
    bindings: BTreeMap<String, Backend>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with a single bound context.
    pub fn with_binding(context: &str, backend: Backend) -> Self {
        let mut registry = Self::new();
        registry.bindings.insert(context.to_string(), backend);
        registry
    }

    /// Bind `context` to `backend`. Re-binding to the same backend is a
    /// no-op; re-binding to a different one is an error.
    pub fn bind(&mut self, context: &str, backend: Backend) -> Result<()> {
        match self.bindings.get(context) {
            Some(&bound) if bound == backend => Ok(()),
            Some(&bound) => Err(ResolveError::AlreadyBound {
                context: context.to_string(),
                bound,
                requested: backend,
            }),
            None => {
                debug!(context, %backend, "bound backend");
                self.bindings.insert(context.to_string(), backend);
                Ok(())
            }
        }
    }

    pub fn resolve(&self, context: &str) -> Result<Backend> {
        self.bindings
            .get(context)
            .copied()
            .ok_or_else(|| ResolveError::NotInitialized {
                context: context.to_string(),
            })
    }

    pub fn is_bound(&self, context: &str) -> bool {
        self.bindings.contains_key(context)
    }

    /// Bound contexts in name order.
    pub fn contexts(&self) -> impl Iterator<Item = (&str, Backend)> {
        self.bindings.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_unbound_context() {
        let registry = BackendRegistry::new();
        assert_eq!(
            registry.resolve("stencil"),
            Err(ResolveError::NotInitialized {
                context: "stencil".to_string()
            })
        );
    }

    #[test]
    fn test_bind_and_resolve() {
        let mut registry = BackendRegistry::new();
        registry.bind("stencil", Backend::Cuda).unwrap();
        registry.bind("reduce", Backend::Threads).unwrap();
        assert_eq!(registry.resolve("stencil"), Ok(Backend::Cuda));
        assert_eq!(registry.resolve("reduce"), Ok(Backend::Threads));
        assert_eq!(
            registry.contexts().collect::<Vec<_>>(),
            vec![("reduce", Backend::Threads), ("stencil", Backend::Cuda)]
        );
    }

    #[test]
    fn test_binding_is_immutable() {
        let mut registry = BackendRegistry::with_binding("stencil", Backend::Simd);
        assert!(registry.bind("stencil", Backend::Simd).is_ok());
        assert_eq!(
            registry.bind("stencil", Backend::Rocm),
            Err(ResolveError::AlreadyBound {
                context: "stencil".to_string(),
                bound: Backend::Simd,
                requested: Backend::Rocm,
            })
        );
        assert_eq!(registry.resolve("stencil"), Ok(Backend::Simd));
        assert_eq!(registry.len(), 1);
    }
}
