use std::path::PathBuf;
use std::process;

use clap::Args;

use parakern::Backend;

use super::{read_source, resolve_input, resolve_registry};

#[derive(Args)]
pub struct CheckArgs {
    /// Input kernel file or directory with parakern.toml
    pub input: PathBuf,
    /// Backend to check against
    #[arg(long, conflicts_with = "all")]
    pub backend: Option<Backend>,
    /// Check against every known backend
    #[arg(long)]
    pub all: bool,
}

pub fn cmd_check(args: CheckArgs) {
    let CheckArgs {
        input,
        backend,
        all,
    } = args;
    let ri = resolve_input(&input);
    let source = read_source(&ri.source_path);
    let filename = ri.source_path.to_string_lossy();

    if all {
        let mut failed = 0;
        for backend in Backend::ALL {
            match parakern::check(&source, &filename, backend) {
                Ok(()) => eprintln!("OK: {} ({})", input.display(), backend),
                Err(_) => {
                    eprintln!("FAILED: {} ({})", input.display(), backend);
                    failed += 1;
                }
            }
        }
        if failed > 0 {
            process::exit(1);
        }
        return;
    }

    let (registry, context) = resolve_registry(&ri, backend, None);
    match parakern::specialize(&source, &filename, &context, &registry) {
        Ok(spec) => eprintln!("OK: {} ({})", input.display(), spec.backend),
        Err(_) => process::exit(1),
    }
}
