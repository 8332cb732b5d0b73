use clap::Parser;
use stockchat::cli::{run, Cli};

fn main() -> std::process::ExitCode {
    run(Cli::parse())
}
