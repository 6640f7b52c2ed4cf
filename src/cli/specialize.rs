use std::path::PathBuf;
use std::process;

use clap::Args;

use parakern::Backend;

use super::{line_col, read_source, resolve_input, resolve_registry};

#[derive(Args)]
pub struct SpecializeArgs {
    /// Input kernel file or directory with parakern.toml
    pub input: PathBuf,
    /// Backend to bind (threads, simd, cuda, rocm)
    #[arg(long)]
    pub backend: Option<Backend>,
    /// Calling context to look up (default: the source file's stem)
    #[arg(long)]
    pub context: Option<String>,
    /// Write the specialized source here instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,
    /// List every resolved call site
    #[arg(long)]
    pub sites: bool,
    /// Print the content hash of the output
    #[arg(long)]
    pub fingerprint: bool,
}

pub fn cmd_specialize(args: SpecializeArgs) {
    let SpecializeArgs {
        input,
        backend,
        context,
        output,
        sites,
        fingerprint,
    } = args;
    let ri = resolve_input(&input);
    let source = read_source(&ri.source_path);
    let (registry, context) = resolve_registry(&ri, backend, context);
    let filename = ri.source_path.to_string_lossy();

    let spec = match parakern::specialize(&source, &filename, &context, &registry) {
        Ok(s) => s,
        Err(_) => process::exit(1),
    };

    match &output {
        Some(path) => {
            if let Err(e) = std::fs::write(path, &spec.text) {
                eprintln!("error: cannot write '{}': {}", path.display(), e);
                process::exit(1);
            }
            eprintln!(
                "Specialized {} for {} -> {}",
                ri.source_path.display(),
                spec.backend,
                path.display()
            );
        }
        None => print!("{}", spec.text),
    }

    if sites {
        for site in &spec.sites {
            let (line, col) = line_col(&source, site.span.start as usize);
            eprintln!(
                "  {}:{}  @{} -> {}{}",
                line,
                col,
                site.primitive,
                site.realization,
                site.kernel
                    .as_deref()
                    .map(|k| format!("  (in {})", k))
                    .unwrap_or_default()
            );
        }
    }

    if fingerprint {
        eprintln!("fingerprint: {}", spec.fingerprint());
    }
}
