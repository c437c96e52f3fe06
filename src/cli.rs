use crate::timestamp::LogTimeZone;
use crate::ui::OutputFormat;
use clap::Parser;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "kube-logline")]
#[command(about = "Render container log lines with aligned timestamps and pod/container columns")]
pub struct Cli {
    /// Log sources as [pod[/container]=]path, '-' reads stdin (default: stdin)
    pub sources: Vec<String>,

    /// Show the timestamp column
    #[arg(short = 't', long)]
    pub timestamps: bool,

    /// Timezone for timestamps (UTC, Local, an offset like +02:00 or an IANA name like Europe/Paris)
    #[arg(short = 'z', long)]
    pub timezone: Option<LogTimeZone>,

    /// Output format (default: ansi on a terminal, plain otherwise)
    #[arg(short = 'o', long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Paint every pod with this color instead of the palette
    #[arg(long)]
    pub paint: Option<String>,

    /// Log stream capacity, 0 for unbounded
    #[arg(short = 'b', long)]
    pub buffer_size: Option<usize>,

    /// YAML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short = 'v', long)]
    pub verbose: bool,
}
