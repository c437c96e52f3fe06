use crate::stream::LogSender;
use crate::types::{LogEntry, LogEvent};
use std::fmt;
use std::io::BufRead;
use std::path::PathBuf;
use std::str::FromStr;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;
use tokio::task::AbortHandle;
use tracing::{debug, info, warn};

/// One tailed input: `[pod[/container]=]path`, with `-` for stdin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSpec {
    pub pod: String,
    pub container: String,
    /// `None` reads stdin.
    pub path: Option<PathBuf>,
}

impl FromStr for SourceSpec {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (label, path) = match s.split_once('=') {
            Some((label, path)) => (label, path),
            None => ("", s),
        };
        if path.is_empty() {
            anyhow::bail!("Missing path in source '{}'", s);
        }
        let (pod, container) = label.split_once('/').unwrap_or((label, ""));
        if pod.is_empty() && !container.is_empty() {
            anyhow::bail!("Missing pod name in source '{}'", s);
        }
        Ok(Self {
            pod: pod.to_string(),
            container: container.to_string(),
            path: (path != "-").then(|| PathBuf::from(path)),
        })
    }
}

impl fmt::Display for SourceSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let path = self
            .path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<stdin>".to_string());
        if self.pod.is_empty() {
            write!(f, "{}", path)
        } else {
            write!(f, "{}/{} ({})", self.pod, self.container, path)
        }
    }
}

impl SourceSpec {
    pub fn is_stdin(&self) -> bool {
        self.path.is_none()
    }

    fn entry(&self, payload: impl Into<Vec<u8>>, single_container: bool) -> LogEntry {
        LogEntry::new(payload)
            .with_pod(&self.pod)
            .with_container(&self.container)
            .single_container(single_container)
    }

    async fn open(&self) -> std::io::Result<Lines> {
        match &self.path {
            Some(path) => Ok(Lines::File(BufReader::new(
                tokio::fs::File::open(path).await?,
            ))),
            None => Lines::from_blocking(std::io::BufReader::new(std::io::stdin())),
        }
    }
}

/// Lines buffered between the stdin thread and its tail task.
const BLOCKING_LINE_BUFFER: usize = 64;

/// Raw lines of one source, terminators included.
///
/// Blocking readers such as stdin run on a plain thread, outside the runtime's
/// blocking pool, so runtime shutdown never waits on a pending read.
enum Lines {
    File(BufReader<tokio::fs::File>),
    Blocking(mpsc::Receiver<std::io::Result<Vec<u8>>>),
}

impl Lines {
    fn from_blocking<R: BufRead + Send + 'static>(mut reader: R) -> std::io::Result<Self> {
        let (tx, rx) = mpsc::channel(BLOCKING_LINE_BUFFER);
        std::thread::Builder::new()
            .name("stdin-reader".into())
            .spawn(move || {
                loop {
                    let mut line = Vec::new();
                    let read = match reader.read_until(b'\n', &mut line) {
                        Ok(0) => break,
                        Ok(_) => Ok(line),
                        Err(e) => Err(e),
                    };
                    let failed = read.is_err();
                    if tx.blocking_send(read).is_err() || failed {
                        break;
                    }
                }
            })?;
        Ok(Lines::Blocking(rx))
    }

    /// Next line, or `None` at end of input.
    async fn next_line(&mut self) -> std::io::Result<Option<Vec<u8>>> {
        match self {
            Lines::File(reader) => {
                let mut line = Vec::new();
                match reader.read_until(b'\n', &mut line).await? {
                    0 => Ok(None),
                    _ => Ok(Some(line)),
                }
            }
            Lines::Blocking(rx) => rx.recv().await.transpose(),
        }
    }
}

/// Strips the line terminator (`\n` or `\r\n`).
fn trim_newline(line: &mut Vec<u8>) {
    if line.last() == Some(&b'\n') {
        line.pop();
        if line.last() == Some(&b'\r') {
            line.pop();
        }
    }
}

/// Reads `spec` line by line onto `tx`, then sends the end-of-substream marker.
pub fn spawn_tail_task(spec: SourceSpec, single_container: bool, tx: LogSender) -> AbortHandle {
    let handle = tokio::spawn(async move {
        info!("Starting to tail {}", spec);
        let lines = spec.open().await;
        if tail_lines(&spec, single_container, lines, &tx).await.is_err() {
            debug!("Log stream closed, stopping tail of {}", spec);
        }
    });
    handle.abort_handle()
}

async fn tail_lines(
    spec: &SourceSpec,
    single_container: bool,
    lines: std::io::Result<Lines>,
    tx: &LogSender,
) -> Result<(), SendError<LogEvent>> {
    let mut lines = match lines {
        Ok(lines) => lines,
        Err(e) => {
            warn!("Failed to open {}: {}", spec, e);
            let msg = format!("failed to open {}: {}", spec, e);
            tx.send(spec.entry(msg, single_container).error(true)).await?;
            return tx.send_eof().await;
        }
    };

    let mut count = 0usize;
    loop {
        match lines.next_line().await {
            Ok(None) => break,
            Ok(Some(mut line)) => {
                trim_newline(&mut line);
                tx.send(spec.entry(line, single_container)).await?;
                count += 1;
            }
            Err(e) => {
                warn!("Error reading log line from {}: {}", spec, e);
                let msg = format!("error reading {}: {}", spec, e);
                tx.send(spec.entry(msg, single_container).error(true)).await?;
                break;
            }
        }
    }

    info!("Finished tailing {} after {} lines", spec, count);
    tx.send_eof().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::log_stream;

    #[test]
    fn test_parse_source_spec() {
        let spec: SourceSpec = "web/nginx=/var/log/nginx.log".parse().unwrap();
        assert_eq!(spec.pod, "web");
        assert_eq!(spec.container, "nginx");
        assert_eq!(spec.path, Some(PathBuf::from("/var/log/nginx.log")));

        let spec: SourceSpec = "web=-".parse().unwrap();
        assert_eq!(spec.pod, "web");
        assert_eq!(spec.container, "");
        assert!(spec.is_stdin());

        let spec: SourceSpec = "app.log".parse().unwrap();
        assert_eq!(spec.pod, "");
        assert_eq!(spec.path, Some(PathBuf::from("app.log")));

        assert!("web=".parse::<SourceSpec>().is_err());
        assert!("/nginx=app.log".parse::<SourceSpec>().is_err());
    }

    #[test]
    fn test_trim_newline() {
        let mut line = b"hello\r\n".to_vec();
        trim_newline(&mut line);
        assert_eq!(line, b"hello");

        let mut line = b"no newline".to_vec();
        trim_newline(&mut line);
        assert_eq!(line, b"no newline");
    }

    #[tokio::test]
    async fn test_tail_file_then_eof() {
        let path = std::env::temp_dir().join(format!("kube-logline-{}.log", std::process::id()));
        tokio::fs::write(&path, b"2023-01-01T00:00:00Z first\r\nsecond\n\nlast")
            .await
            .unwrap();

        let spec = SourceSpec {
            pod: "web".to_string(),
            container: "nginx".to_string(),
            path: Some(path.clone()),
        };
        let (tx, mut rx) = log_stream(None);
        spawn_tail_task(spec, true, tx);

        let mut payloads = Vec::new();
        loop {
            match rx.recv().await.unwrap() {
                LogEvent::Line(entry) => {
                    assert_eq!(entry.id(), "web");
                    assert!(entry.single_container);
                    assert!(!entry.is_error);
                    payloads.push(String::from_utf8(entry.payload().to_vec()).unwrap());
                }
                LogEvent::Eof => break,
            }
        }
        tokio::fs::remove_file(&path).await.unwrap();

        assert_eq!(
            payloads,
            vec!["2023-01-01T00:00:00Z first", "second", "", "last"]
        );
        assert_eq!(rx.recv().await, None);
    }

    #[tokio::test]
    async fn test_missing_file_sends_error_entry() {
        let spec: SourceSpec = "web/app=/nonexistent/kube-logline.log".parse().unwrap();
        let (tx, mut rx) = log_stream(Some(4));
        spawn_tail_task(spec, false, tx);

        let event = rx.recv().await.unwrap();
        let entry = event.entry().unwrap();
        assert!(entry.is_error);
        assert!(String::from_utf8_lossy(entry.payload()).starts_with("failed to open"));
        assert_eq!(rx.recv().await, Some(LogEvent::Eof));
    }

    #[tokio::test]
    async fn test_blocking_reader_lines() {
        let spec: SourceSpec = "web=-".parse().unwrap();
        let reader = std::io::Cursor::new(b"one\n2023-01-01T00:00:00Z two\r\nthree".to_vec());
        let (tx, mut rx) = log_stream(None);
        tail_lines(&spec, true, Lines::from_blocking(reader), &tx)
            .await
            .unwrap();
        drop(tx);

        let mut payloads = Vec::new();
        while let Some(event) = rx.recv().await {
            match event {
                LogEvent::Line(entry) => payloads.push(entry.payload().to_vec()),
                LogEvent::Eof => payloads.push(b"<eof>".to_vec()),
            }
        }
        assert_eq!(
            payloads,
            vec![
                b"one".to_vec(),
                b"2023-01-01T00:00:00Z two".to_vec(),
                b"three".to_vec(),
                b"<eof>".to_vec(),
            ]
        );
    }

    /// A reader whose first read never returns, like stdin fed by an idle pipe.
    struct Stalled;

    impl std::io::Read for Stalled {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            loop {
                std::thread::park();
            }
        }
    }

    #[test]
    fn test_abort_does_not_wait_for_stalled_reader() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (tx, mut rx) = log_stream(None);
        let handle = runtime.block_on(async {
            let task = tokio::spawn(async move {
                let spec: SourceSpec = "idle=-".parse().unwrap();
                let lines = Lines::from_blocking(std::io::BufReader::new(Stalled));
                let _ = tail_lines(&spec, false, lines, &tx).await;
            });
            task.abort_handle()
        });

        handle.abort();
        assert_eq!(runtime.block_on(rx.recv()), None);

        let started = std::time::Instant::now();
        runtime.shutdown_timeout(std::time::Duration::from_secs(5));
        assert!(started.elapsed() < std::time::Duration::from_secs(5));
    }
}
