use clap::Parser;
use pendtag::cli::{Cli, run};
use pendtag::logging::init_logging;

fn main() -> std::process::ExitCode {
    init_logging();
    run(Cli::parse())
}
