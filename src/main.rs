
use anyhow::Context;
use clap::Parser;
use std::io::{IsTerminal, Write};
use tracing::{debug, info};

use kube_logline::cli::Cli;
use kube_logline::config::{Config, Settings};
use kube_logline::source::{SourceSpec, spawn_tail_task};
use kube_logline::ui::write_line;
use kube_logline::utils::{get_paint, single_container_pods};
use kube_logline::{LogEntry, LogEvent, LogReceiver, log_stream};

/// Paint used for entries read from an error stream.
const ERROR_PAINT: &str = "red";

/// Counters reported once the stream is drained.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct Summary {
    lines: usize,
    errors: usize,
    substreams_done: usize,
    /// Sum of `LogEntry::size()` over everything rendered.
    accounted_bytes: usize,
}

impl Summary {
    fn record(&mut self, entry: &LogEntry) {
        self.lines += 1;
        self.accounted_bytes += entry.size();
        if entry.is_error {
            self.errors += 1;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    let settings = Settings::resolve(&cli, config, std::io::stdout().is_terminal());
    debug!("Effective settings: {:?}", settings);

    let sources = parse_sources(&cli.sources)?;
    let single = single_container_pods(
        sources
            .iter()
            .map(|s| (s.pod.as_str(), s.container.as_str())),
    );

    let (log_tx, log_rx) = log_stream(settings.buffer_size);
    let handles: Vec<_> = sources
        .iter()
        .map(|spec| spawn_tail_task(spec.clone(), single.contains(&spec.pod), log_tx.clone()))
        .collect();
    // Only producers hold senders from here on.
    drop(log_tx);

    let mut stdout = std::io::stdout();
    tokio::select! {
        summary = print_logs(log_rx, sources.len(), &settings, &mut stdout) => {
            let summary = summary?;
            info!(
                "Rendered {} lines ({} errors) from {} sources, ~{} bytes",
                summary.lines, summary.errors, summary.substreams_done, summary.accounted_bytes
            );
        }
        _ = tokio::signal::ctrl_c() => {
            debug!("Interrupted, stopping {} tail tasks", handles.len());
            for handle in &handles {
                handle.abort();
            }
        }
    }
    stdout.flush()?;
    Ok(())
}

fn parse_sources(raw: &[String]) -> anyhow::Result<Vec<SourceSpec>> {
    if raw.is_empty() {
        return Ok(vec![SourceSpec {
            pod: String::new(),
            container: String::new(),
            path: None,
        }]);
    }
    let sources = raw
        .iter()
        .map(|s| {
            s.parse::<SourceSpec>()
                .with_context(|| format!("Failed to parse source '{}'", s))
        })
        .collect::<anyhow::Result<Vec<_>>>()?;
    if sources.iter().filter(|s| s.is_stdin()).count() > 1 {
        anyhow::bail!("stdin can only be used by one source");
    }
    Ok(sources)
}

/// Renders events until every substream has ended or the stream closes.
async fn print_logs<W: Write>(
    mut log_rx: LogReceiver,
    substreams: usize,
    settings: &Settings,
    out: &mut W,
) -> anyhow::Result<Summary> {
    let mut summary = Summary::default();
    let mut buf = Vec::new();

    while summary.substreams_done < substreams {
        let Some(event) = log_rx.recv().await else {
            debug!("Log stream closed before all sources finished");
            break;
        };
        match event {
            LogEvent::Eof => {
                summary.substreams_done += 1;
                debug!(
                    "Source finished, {} of {} done",
                    summary.substreams_done, substreams
                );
            }
            LogEvent::Line(entry) => {
                let paint = if entry.is_error {
                    ERROR_PAINT
                } else {
                    get_paint(entry.id(), &settings.palette)
                };
                buf.clear();
                let message_start = entry.render_split(
                    paint,
                    settings.show_time,
                    settings.timezone.as_ref(),
                    &mut buf,
                );
                write_line(out, &buf, message_start, settings.output)?;
                summary.record(&entry);
            }
        }
    }

    log_rx.close();
    Ok(summary)
}
