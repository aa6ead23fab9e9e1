use clap::Parser;
use fundlens::cli::{Cli, run};
use fundlens::logging::init_logging;

fn main() -> std::process::ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    run(cli)
}
