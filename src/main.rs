use clap::Parser;
use wealthledger::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
