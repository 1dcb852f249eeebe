use clap::Parser;

/// Streams validator events to standard output until interrupted.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to a TOML configuration file.
    /// If not provided, default values will be used.
    #[arg(short, long)]
    pub config: Option<String>,
}
