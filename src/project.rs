use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::backend::Backend;
use crate::diagnostic::Diagnostic;
use crate::registry::BackendRegistry;
use crate::span::Span;

pub const MANIFEST: &str = "parakern.toml";

const DEFAULT_ENTRY: &str = "main.pk";

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct Manifest {
    project: ProjectSection,
    #[serde(default)]
    contexts: BTreeMap<String, Backend>,
}

#[derive(Deserialize)]
#[serde(deny_unknown_fields)]
struct ProjectSection {
    name: String,
    #[serde(default)]
    version: String,
    entry: Option<String>,
    backend: Option<Backend>,
}

/// Project configuration from parakern.toml.
#[derive(Clone, Debug, PartialEq)]
pub struct Project {
    pub name: String,
    pub version: String,
    pub entry: PathBuf,
    pub root_dir: PathBuf,
    /// Backend for the project's own context, if configured.
    pub backend: Option<Backend>,
    /// Extra context bindings from `[contexts]`.
    pub contexts: BTreeMap<String, Backend>,
}

impl Project {
    /// Load a project from a parakern.toml file.
    pub fn load(toml_path: &Path) -> Result<Project, Diagnostic> {
        let content = std::fs::read_to_string(toml_path).map_err(|e| {
            Diagnostic::error(
                format!("cannot read '{}': {}", toml_path.display(), e),
                Span::dummy(),
            )
        })?;
        let root_dir = toml_path
            .parent()
            .unwrap_or(Path::new("."))
            .to_path_buf();
        Self::parse(&content, root_dir, toml_path)
    }

    fn parse(content: &str, root_dir: PathBuf, toml_path: &Path) -> Result<Project, Diagnostic> {
        // Backend names are parsed during deserialization, so an unknown
        // identity arrives here as a toml error spanning the bad value.
        let manifest: Manifest = toml::from_str(content).map_err(|e| {
            let span = e
                .span()
                .map_or(Span::dummy(), |r| Span::new(0, r.start as u32, r.end as u32));
            Diagnostic::error(
                format!("invalid '{}': {}", toml_path.display(), e.message().trim_end()),
                span,
            )
        })?;
        let section = manifest.project;

        if section.name.trim().is_empty() {
            return Err(Diagnostic::error(
                format!("missing 'name' in {}", MANIFEST),
                Span::dummy(),
            ));
        }

        let entry = section.entry.unwrap_or_else(|| DEFAULT_ENTRY.to_string());

        Ok(Project {
            name: section.name,
            version: section.version,
            entry: root_dir.join(entry),
            root_dir,
            backend: section.backend,
            contexts: manifest.contexts,
        })
    }

    /// Find a parakern.toml in the given directory or its ancestors.
    pub fn find(start_dir: &Path) -> Option<PathBuf> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(MANIFEST);
            if candidate.exists() {
                return Some(candidate);
            }
            if !dir.pop() {
                return None;
            }
        }
    }

    /// Contexts the project backend is bound to: the project name and the
    /// entry file's stem.
    pub fn default_contexts(&self) -> Vec<String> {
        let mut names = vec![self.name.clone()];
        let stem = crate::context_from_path(&self.entry);
        if stem != self.name {
            names.push(stem);
        }
        names
    }

    /// Build the registry this project describes. `override_backend`
    /// replaces the `[project] backend` entry.
    pub fn registry(&self, override_backend: Option<Backend>) -> Result<BackendRegistry, Diagnostic> {
        let mut registry = BackendRegistry::new();
        if let Some(backend) = override_backend.or(self.backend) {
            for context in self.default_contexts() {
                registry
                    .bind(&context, backend)
                    .map_err(|e| e.into_diagnostic(Span::dummy()))?;
            }
        }
        for (context, &backend) in &self.contexts {
            registry
                .bind(context, backend)
                .map_err(|e| e.into_diagnostic(Span::dummy()))?;
        }
        Ok(registry)
    }
}
