use clap::{Parser, Subcommand};

mod commands;

use commands::{PolynomialArgs, ShowConfigArgs, SolveArgs};

#[derive(Parser)]
#[command(name = "risk-alloc")]
#[command(about = "Risk-budgeted integer allocation optimizer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Solve an allocation request and print the response
    Solve(SolveArgs),
    /// Print the normalized solver polynomial for a request
    Polynomial(PolynomialArgs),
    /// Print the effective configuration
    ShowConfig(ShowConfigArgs),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr so stdout stays machine-readable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Solve(args) => commands::run_solve(args).await?,
        Commands::Polynomial(args) => commands::run_polynomial(args)?,
        Commands::ShowConfig(args) => commands::run_show_config(args)?,
    }

    Ok(())
}
