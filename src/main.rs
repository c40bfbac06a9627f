use clap::Parser;
use poc_harness::cli::{self, Commands};
use poc_harness::cli::batch::BatchCommand;
use poc_harness::models::RunMode;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = cli::Cli::parse();

    if cli.no_color {
        console::set_colors_enabled(false);
        console::set_colors_enabled_stderr(false);
    }

    let log_level = match (cli.quiet, cli.verbose) {
        (true, 0) => "warn",
        (_, 0) => "info",
        (_, 1) => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_ansi(!cli.no_color)
        .with_writer(std::io::stderr)
        .init();

    let quiet = cli.quiet;
    let result = match cli.command {
        Commands::Run(args) => cli::batch::handle_batch(args, BatchCommand::All, quiet).await,
        Commands::Exec(args) => cli::batch::handle_batch(args, BatchCommand::Single(RunMode::Exploratory), quiet).await,
        Commands::Verify(args) => cli::batch::handle_batch(args, BatchCommand::Single(RunMode::Verification), quiet).await,
        Commands::Dedup(args) => cli::dedup::handle_dedup(args).await,
        Commands::Probe(args) => cli::probe::handle_probe(args).await,
        Commands::Status(args) => cli::status::handle_status(args).await,
        Commands::Logs(args) => cli::logs::handle_logs(args).await,
        Commands::Validate(args) => cli::validate::handle_validate(args).await,
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}
