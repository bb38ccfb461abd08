//! statline command-line harness.

mod cli;

use clap::Parser;

#[tokio::main]
async fn main() {
    // A missing .env is normal; anything else is worth knowing about.
    if let Err(e) = dotenvy::dotenv() {
        if !e.not_found() {
            eprintln!("Warning: failed to load .env: {}", e);
        }
    }

    let args = cli::Cli::parse();
    cli::init_logging(args.json);

    if let Err(e) = cli::run(args).await {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}
