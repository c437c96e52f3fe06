use crate::cli::Cli;
use crate::timestamp::LogTimeZone;
use crate::ui::OutputFormat;
use crate::utils::DEFAULT_PALETTE;
use anyhow::Context;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_BUFFER_SIZE: usize = 100;

/// Settings read from the optional YAML file. Every field may be omitted.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub timestamps: bool,
    pub timezone: Option<LogTimeZone>,
    pub output: Option<OutputFormat>,
    pub buffer_size: Option<usize>,
    pub palette: Vec<String>,
}

impl Config {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&raw).with_context(|| format!("Invalid config file {}", path.display()))
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }
}

/// Effective settings: command line over config file over defaults.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub show_time: bool,
    pub timezone: Option<LogTimeZone>,
    pub output: OutputFormat,
    /// `None` means unbounded.
    pub buffer_size: Option<usize>,
    pub palette: Vec<String>,
}

impl Settings {
    pub fn resolve(cli: &Cli, config: Config, is_terminal: bool) -> Self {
        let output = cli.output.or(config.output).unwrap_or(if is_terminal {
            OutputFormat::Ansi
        } else {
            OutputFormat::Plain
        });

        let buffer_size = match cli
            .buffer_size
            .or(config.buffer_size)
            .unwrap_or(DEFAULT_BUFFER_SIZE)
        {
            0 => None,
            n => Some(n),
        };

        let palette = if let Some(paint) = &cli.paint {
            vec![paint.clone()]
        } else if !config.palette.is_empty() {
            config.palette
        } else {
            DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
        };

        Self {
            show_time: cli.timestamps || config.timestamps,
            timezone: cli.timezone.or(config.timezone),
            output,
            buffer_size,
            palette,
        }
    }
}
