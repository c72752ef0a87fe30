/// Tokstat - Token cost auditing for LLM-generated JSON.
use clap::Parser;
use tokstat::cli::Cli;

fn main() {
    let cli = Cli::parse();

    if let Err(e) = cli.run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
