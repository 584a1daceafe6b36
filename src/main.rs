use clap::Parser;
use trendsniper::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
