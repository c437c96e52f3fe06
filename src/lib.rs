//! Rendering of streamed container log lines.
//!
//! A [`types::LogEntry`] holds one raw line and the pod/container it came
//! from. Producers push entries onto a [`stream::log_stream`], the consumer
//! renders each one into `[color::attrs]` markup with an aligned timestamp
//! column, and [`ui`] turns that markup into terminal output.

pub mod cli;
pub mod config;
pub mod source;
pub mod stream;
pub mod timestamp;
pub mod types;
pub mod ui;
pub mod utils;

pub use stream::{LogReceiver, LogSender, log_stream};
pub use timestamp::{LogTimeZone, convert_time_zone};
pub use types::{LogEntry, LogEvent};
