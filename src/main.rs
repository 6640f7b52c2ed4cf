mod cli;

use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "parakern",
    version,
    about = "Specialize portable data-parallel kernels for GPU and CPU backends"
)]
struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Rewrite primitive call sites and kernels for one backend
    Specialize(cli::specialize::SpecializeArgs),
    /// Check that a kernel source specializes without errors
    Check(cli::check::CheckArgs),
    /// List the known backends
    Backends,
}

fn main() {
    let cli = Cli::parse();
    parakern::log::init(cli.verbose);

    match cli.command {
        Command::Specialize(args) => cli::specialize::cmd_specialize(args),
        Command::Check(args) => cli::check::cmd_check(args),
        Command::Backends => cli::backends::cmd_backends(),
    }
}
