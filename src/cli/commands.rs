use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "poc-harness", version, about = "PoC execution and crash-triage harness for router firmware")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Increase log verbosity (repeat for more)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress progress output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Exploratory batch, then re-verification of the archive, then dedup
    Run(TargetArgs),
    /// Run the exploratory batch over the PoC directory
    Exec(TargetArgs),
    /// Re-run archived findings with the verification budget
    Verify(TargetArgs),
    /// Collapse archived findings to one script per endpoint parameter
    Dedup(TargetArgs),
    /// Probe the side-channel resource once
    Probe(TargetArgs),
    /// Show cursors and batch sizes for a product
    Status(StatusArgs),
    /// Show the workflow log for a product
    Logs(LogsArgs),
    /// Validate a configuration file
    Validate(ValidateArgs),
}

#[derive(Args, Clone, Debug, Default)]
pub struct TargetArgs {
    /// YAML configuration file
    #[arg(short, long)]
    pub config: Option<String>,

    /// Product directory holding POC/ and progress.txt
    #[arg(short, long)]
    pub base_dir: Option<String>,

    /// PoC directory (default <base-dir>/POC)
    #[arg(long)]
    pub poc_dir: Option<String>,

    /// Success archive (default <poc-dir>/success)
    #[arg(long)]
    pub archive_dir: Option<String>,

    /// Interpreter used to run each PoC
    #[arg(long)]
    pub interpreter: Option<String>,

    /// Attempts per script in exploratory mode
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub exploratory_attempts: Option<u32>,

    /// Attempts per script in verification mode
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub verification_attempts: Option<u32>,

    /// URL of the side-channel resource written by injected commands
    #[arg(long)]
    pub side_channel_url: Option<String>,

    /// Body the side-channel resource holds when injection succeeded
    #[arg(long)]
    pub marker: Option<String>,

    /// Skip the warm-up pause before each batch
    #[arg(long)]
    pub no_warmup: bool,
}

#[derive(Args, Clone, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Args, Clone, Debug)]
pub struct LogsArgs {
    /// Product directory
    #[arg(short, long, default_value = ".")]
    pub base_dir: String,

    /// Follow log output
    #[arg(short, long)]
    pub follow: bool,

    /// Number of lines to show
    #[arg(short, long, default_value = "100")]
    pub lines: usize,
}

#[derive(Args, Clone, Debug)]
pub struct ValidateArgs {
    /// Config file to validate
    pub config: String,
}
