use clap::Parser;

mod cmd;
mod config;
mod error;
mod stages;

use config::{Cli, Commands};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run(args) => match cmd::run::run(args).await {
            Ok(true) => {}
            Ok(false) => std::process::exit(1),
            Err(e) => {
                tracing::error!(error = %e, "suite run failed");
                eprintln!("Error: {e}");
                std::process::exit(1);
            }
        },
        Commands::Stages => cmd::stages::list(),
    }
}
