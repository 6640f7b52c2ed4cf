pub mod backends;
pub mod check;
pub mod specialize;

use std::path::{Path, PathBuf};
use std::process;

use parakern::project::{Project, MANIFEST};
use parakern::{Backend, BackendRegistry};

/// Resolved input: source file and optional project.
pub struct ResolvedInput {
    pub source_path: PathBuf,
    pub project: Option<Project>,
}

fn load_project(toml_path: &Path) -> Project {
    match Project::load(toml_path) {
        Ok(p) => p,
        Err(e) => {
            eprintln!("{}", e);
            process::exit(1);
        }
    }
}

/// Resolve an input path (kernel file or project directory) to a source
/// file and the project around it, if any.
pub fn resolve_input(input: &Path) -> ResolvedInput {
    if input.is_dir() {
        let toml_path = input.join(MANIFEST);
        if !toml_path.exists() {
            eprintln!("error: no {} found in '{}'", MANIFEST, input.display());
            process::exit(1);
        }
        let project = load_project(&toml_path);
        ResolvedInput {
            source_path: project.entry.clone(),
            project: Some(project),
        }
    } else if input.is_file() {
        let project = Project::find(input.parent().unwrap_or(Path::new(".")))
            .map(|toml_path| load_project(&toml_path));
        ResolvedInput {
            source_path: input.to_path_buf(),
            project,
        }
    } else {
        eprintln!(
            "error: '{}' is neither a kernel file nor a project directory",
            input.display()
        );
        process::exit(1);
    }
}

pub fn read_source(path: &Path) -> String {
    match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: cannot read '{}': {}", path.display(), e);
            process::exit(1);
        }
    }
}

/// Pick the calling context and build the registry that binds it.
///
/// The context defaults to the source file's stem. A `--backend` on the
/// command line overrides the project's own backend and also binds the
/// chosen context when the project leaves it unbound.
pub fn resolve_registry(
    ri: &ResolvedInput,
    backend: Option<Backend>,
    context: Option<String>,
) -> (BackendRegistry, String) {
    let context = context.unwrap_or_else(|| parakern::context_from_path(&ri.source_path));
    let mut registry = match &ri.project {
        Some(project) => match project.registry(backend) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("{}", e);
                process::exit(1);
            }
        },
        None => BackendRegistry::new(),
    };
    if let Some(backend) = backend {
        if !registry.is_bound(&context) {
            if let Err(e) = registry.bind(&context, backend) {
                eprintln!("error: {}", e);
                process::exit(1);
            }
        }
    }
    (registry, context)
}

/// 1-based line and column of a byte offset.
pub fn line_col(source: &str, offset: usize) -> (usize, usize) {
    let before = &source[..offset.min(source.len())];
    let line = before.matches('\n').count() + 1;
    let col = before.len() - before.rfind('\n').map_or(0, |i| i + 1) + 1;
    (line, col)
}
