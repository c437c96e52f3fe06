use crate::types::{LogEntry, LogEvent};
use futures::Stream;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::SendError;
use tokio_stream::wrappers::{ReceiverStream, UnboundedReceiverStream};

/// Creates a log stream. `Some(n)` with `n > 0` bounds the channel, anything
/// else makes it unbounded.
pub fn log_stream(capacity: Option<usize>) -> (LogSender, LogReceiver) {
    match capacity {
        Some(n) if n > 0 => {
            let (tx, rx) = mpsc::channel(n);
            (LogSender::Bounded(tx), LogReceiver::Bounded(rx))
        }
        _ => {
            let (tx, rx) = mpsc::unbounded_channel();
            (LogSender::Unbounded(tx), LogReceiver::Unbounded(rx))
        }
    }
}

/// Producer half. Clone it once per tailed source.
#[derive(Debug, Clone)]
pub enum LogSender {
    Bounded(mpsc::Sender<LogEvent>),
    Unbounded(mpsc::UnboundedSender<LogEvent>),
}

impl LogSender {
    /// Waits for capacity on a bounded stream. Fails only once the receiver is gone.
    pub async fn send_event(&self, event: LogEvent) -> Result<(), SendError<LogEvent>> {
        match self {
            LogSender::Bounded(tx) => tx.send(event).await,
            LogSender::Unbounded(tx) => tx.send(event),
        }
    }

    pub async fn send(&self, entry: LogEntry) -> Result<(), SendError<LogEvent>> {
        self.send_event(LogEvent::Line(entry)).await
    }

    /// Marks the end of this sender's substream without closing the stream.
    pub async fn send_eof(&self) -> Result<(), SendError<LogEvent>> {
        self.send_event(LogEvent::Eof).await
    }

    pub fn is_closed(&self) -> bool {
        match self {
            LogSender::Bounded(tx) => tx.is_closed(),
            LogSender::Unbounded(tx) => tx.is_closed(),
        }
    }
}

/// Consumer half.
#[derive(Debug)]
pub enum LogReceiver {
    Bounded(mpsc::Receiver<LogEvent>),
    Unbounded(mpsc::UnboundedReceiver<LogEvent>),
}

impl LogReceiver {
    /// `None` once the stream is closed and drained; `Some(LogEvent::Eof)`
    /// only ends one producer's substream.
    pub async fn recv(&mut self) -> Option<LogEvent> {
        match self {
            LogReceiver::Bounded(rx) => rx.recv().await,
            LogReceiver::Unbounded(rx) => rx.recv().await,
        }
    }

    /// Stops accepting new events. Already queued events are still delivered.
    pub fn close(&mut self) {
        match self {
            LogReceiver::Bounded(rx) => rx.close(),
            LogReceiver::Unbounded(rx) => rx.close(),
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = LogEvent> + Unpin {
        match self {
            LogReceiver::Bounded(rx) => futures::future::Either::Left(ReceiverStream::new(rx)),
            LogReceiver::Unbounded(rx) => {
                futures::future::Either::Right(UnboundedReceiverStream::new(rx))
            }
        }
    }
}
