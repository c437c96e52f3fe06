use crate::timestamp::{LogTimeZone, parse_timestamp};
use chrono::{DateTime, FixedOffset};
use std::borrow::Cow;

/// Width reserved for the timestamp column.
///
/// Padding is measured on the raw token, not on the converted one, so a short
/// raw token reformatted into a zone keeps its raw-length padding and the
/// column grows by the difference.
const TIMESTAMP_COLUMN_WIDTH: usize = 30;

/// A single container log line.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogEntry {
    pub pod: String,
    pub container: String,
    /// The owning pod runs exactly one container; its name column is hidden.
    pub single_container: bool,
    /// The line came from an error stream rather than stdout.
    pub is_error: bool,
    payload: Vec<u8>,
}

impl LogEntry {
    pub fn new(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: payload.into(),
            ..Default::default()
        }
    }

    pub fn from_string(s: &str) -> Self {
        Self::new(s.as_bytes())
    }

    pub fn with_pod(mut self, pod: impl Into<String>) -> Self {
        self.pod = pod.into();
        self
    }

    pub fn with_container(mut self, container: impl Into<String>) -> Self {
        self.container = container.into();
        self
    }

    pub fn single_container(mut self, single: bool) -> Self {
        self.single_container = single;
        self
    }

    pub fn error(mut self, is_error: bool) -> Self {
        self.is_error = is_error;
        self
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// Grouping key: the pod name, or the container name for pod-less entries.
    pub fn id(&self) -> &str {
        if !self.pod.is_empty() {
            &self.pod
        } else {
            &self.container
        }
    }

    /// Leading token of the payload up to the first space, empty if there is no space.
    pub fn timestamp(&self) -> &[u8] {
        match self.space_index() {
            Some(idx) => &self.payload[..idx],
            None => &[],
        }
    }

    pub fn timestamp_str(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.timestamp())
    }

    /// The payload without a leading timestamp token, as `render` emits it last.
    pub fn message(&self) -> &[u8] {
        match self.timestamp_end() {
            Some((idx, _)) => &self.payload[idx + 1..],
            None => &self.payload,
        }
    }

    pub fn info(&self) -> String {
        format!("{}::{}", self.pod, self.container)
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    /// Approximate memory footprint used for buffer accounting.
    pub fn size(&self) -> usize {
        100 + self.payload.len() + self.pod.len() + self.container.len()
    }

    fn space_index(&self) -> Option<usize> {
        self.payload.iter().position(|b| *b == b' ')
    }

    /// Index of the space ending a leading RFC 3339 timestamp, if there is one.
    fn timestamp_end(&self) -> Option<(usize, DateTime<FixedOffset>)> {
        let idx = self.space_index().filter(|idx| *idx > 0)?;
        let token = std::str::from_utf8(&self.payload[..idx]).ok()?;
        parse_timestamp(token).map(|dt| (idx, dt))
    }

    /// Appends the markup for this line to `out`.
    ///
    /// Columns: optional timestamp (padded to a fixed width), pod in `paint`,
    /// container in bold `paint`, then the message. The leading token counts
    /// as a timestamp only if it parses as one; otherwise the whole payload is
    /// the message.
    pub fn render(
        &self,
        paint: &str,
        show_time: bool,
        tz: Option<&LogTimeZone>,
        out: &mut Vec<u8>,
    ) {
        let stamp = self.timestamp_end();

        if show_time && let Some((idx, dt)) = &stamp {
            out.extend_from_slice(b"[gray::b]");
            match tz {
                Some(tz) => out.extend_from_slice(tz.format(dt).as_bytes()),
                None => out.extend_from_slice(&self.payload[..*idx]),
            }
            out.push(b' ');
            let pad = TIMESTAMP_COLUMN_WIDTH.saturating_sub(*idx);
            out.resize(out.len() + pad, b' ');
            out.extend_from_slice(b"[-::-]");
        }

        if !self.pod.is_empty() {
            out.extend_from_slice(format!("[{}::]{}", paint, self.pod).as_bytes());
        }

        if !self.single_container && !self.container.is_empty() {
            if !self.pod.is_empty() {
                out.push(b' ');
            }
            out.extend_from_slice(
                format!("[{}::b]{}[-::-] ", paint, self.container).as_bytes(),
            );
        } else if !self.pod.is_empty() {
            out.extend_from_slice(b"[-::] ");
        }

        match stamp {
            Some((idx, _)) => out.extend_from_slice(&self.payload[idx + 1..]),
            None => out.extend_from_slice(&self.payload),
        }
    }

    /// Like `render`, but returns where the message starts in `out`.
    ///
    /// Everything before that offset is markup written by this entry; the
    /// message after it is payload text and must not be decoded as markup.
    pub fn render_split(
        &self,
        paint: &str,
        show_time: bool,
        tz: Option<&LogTimeZone>,
        out: &mut Vec<u8>,
    ) -> usize {
        self.render(paint, show_time, tz, out);
        out.len() - self.message().len()
    }

    pub fn render_to_string(
        &self,
        paint: &str,
        show_time: bool,
        tz: Option<&LogTimeZone>,
    ) -> String {
        let mut out = Vec::with_capacity(self.size());
        self.render(paint, show_time, tz, &mut out);
        String::from_utf8_lossy(&out).into_owned()
    }
}

impl From<&str> for LogEntry {
    fn from(s: &str) -> Self {
        Self::from_string(s)
    }
}

impl From<String> for LogEntry {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<Vec<u8>> for LogEntry {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(bytes)
    }
}

/// What travels on a log stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    Line(LogEntry),
    /// One producer finished; the stream itself stays open.
    Eof,
}

impl LogEvent {
    pub fn is_eof(&self) -> bool {
        matches!(self, LogEvent::Eof)
    }

    pub fn entry(&self) -> Option<&LogEntry> {
        match self {
            LogEvent::Line(entry) => Some(entry),
            LogEvent::Eof => None,
        }
    }

    pub fn id(&self) -> &str {
        self.entry().map(LogEntry::id).unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.entry().is_none_or(LogEntry::is_empty)
    }
}

impl From<LogEntry> for LogEvent {
    fn from(entry: LogEntry) -> Self {
        LogEvent::Line(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(payload: &str) -> LogEntry {
        LogEntry::from_string(payload)
            .with_pod("p1")
            .with_container("c1")
    }

    #[test]
    fn test_id_prefers_pod() {
        assert_eq!(entry("x").id(), "p1");
        assert_eq!(LogEntry::new("x").with_container("c1").id(), "c1");
        assert_eq!(LogEntry::new("x").id(), "");
    }

    #[test]
    fn test_timestamp_token() {
        let e = entry("2023-01-01T00:00:00Z hello world");
        assert_eq!(e.timestamp(), b"2023-01-01T00:00:00Z");
        assert_eq!(e.timestamp_str(), "2023-01-01T00:00:00Z");
        assert_eq!(entry("nospace").timestamp(), b"");
        assert_eq!(entry(" leading").timestamp(), b"");
    }

    #[test]
    fn test_info_and_size() {
        assert_eq!(entry("abc").info(), "p1::c1");
        assert_eq!(LogEntry::new("").info(), "::");
        assert_eq!(entry("abc").size(), 100 + 3 + 2 + 2);
    }

    #[test]
    fn test_empty_payload() {
        let e = entry("");
        assert!(e.is_empty());
        assert_eq!(e.size(), 100 + 2 + 2);
        assert_eq!(e.render_to_string("blue", true, None), "[blue::]p1 [blue::b]c1[-::-] ");
    }

    #[test]
    fn test_render_full_columns() {
        let e = entry("2023-01-01T00:00:00.000000000Z hello");
        assert_eq!(
            e.render_to_string("blue", true, None),
            "[gray::b]2023-01-01T00:00:00.000000000Z [-::-][blue::]p1 [blue::b]c1[-::-] hello"
        );
    }

    #[test]
    fn test_render_pads_short_timestamp() {
        let e = LogEntry::new("2023-01-01T00:00:00Z hi");
        let out = e.render_to_string("blue", true, None);
        let pad = " ".repeat(1 + 30 - 20);
        assert_eq!(out, format!("[gray::b]2023-01-01T00:00:00Z{}[-::-]hi", pad));
    }

    #[test]
    fn test_render_converts_timezone() {
        let tz: LogTimeZone = "+01:00".parse().unwrap();
        let e = LogEntry::new("2023-01-01T00:00:00Z hi");
        let out = e.render_to_string("blue", true, Some(&tz));
        assert!(out.starts_with("[gray::b]2023-01-01T01:00:00.000000000+01:00 "));
        assert!(out.ends_with("[-::-]hi"));
    }

    #[test]
    fn test_render_pads_on_raw_token_length() {
        let tz: LogTimeZone = "+01:00".parse().unwrap();
        let e = LogEntry::new("2023-01-01T00:00:00Z hi");
        let out = e.render_to_string("blue", true, Some(&tz));
        let pad = " ".repeat(1 + 30 - 20);
        assert_eq!(
            out,
            format!("[gray::b]2023-01-01T01:00:00.000000000+01:00{}[-::-]hi", pad)
        );
    }

    #[test]
    fn test_message_and_split() {
        let e = entry("2023-01-01T00:00:00Z [-] removed [red] flag");
        assert_eq!(e.message(), b"[-] removed [red] flag");
        let mut out = Vec::new();
        let start = e.render_split("blue", true, None, &mut out);
        assert_eq!(&out[start..], b"[-] removed [red] flag");
        assert!(out[..start].ends_with(b"[blue::b]c1[-::-] "));

        let e = LogEntry::new("[red] no timestamp");
        assert_eq!(e.message(), b"[red] no timestamp");
        out.clear();
        assert_eq!(e.render_split("blue", true, None, &mut out), 0);
    }

    #[test]
    fn test_render_hides_time_when_not_requested() {
        let e = entry("2023-01-01T00:00:00Z hello");
        assert_eq!(
            e.render_to_string("red", false, None),
            "[red::]p1 [red::b]c1[-::-] hello"
        );
    }

    #[test]
    fn test_render_single_container() {
        let e = entry("2023-01-01T00:00:00.000000000Z hello").single_container(true);
        assert_eq!(
            e.render_to_string("blue", false, None),
            "[blue::]p1[-::] hello"
        );
    }

    #[test]
    fn test_render_container_only() {
        let e = LogEntry::new("2023-01-01T00:00:00Z msg").with_container("c1");
        assert_eq!(e.render_to_string("blue", false, None), "[blue::b]c1[-::-] msg");
    }

    #[test]
    fn test_render_without_space_is_verbatim() {
        let e = LogEntry::new("single-token").with_pod("p1").single_container(true);
        assert_eq!(e.render_to_string("blue", true, None), "[blue::]p1[-::] single-token");
    }

    #[test]
    fn test_render_leading_space_is_verbatim() {
        let e = LogEntry::new(" indented line");
        assert_eq!(e.render_to_string("blue", true, None), " indented line");
    }

    #[test]
    fn test_render_non_timestamp_token_is_message() {
        let e = LogEntry::new("INFO server started").with_pod("p1").single_container(true);
        assert_eq!(
            e.render_to_string("blue", true, None),
            "[blue::]p1[-::] INFO server started"
        );
        assert_eq!(e.timestamp(), b"INFO");
    }

    #[test]
    fn test_render_appends_to_buffer() {
        let e = LogEntry::new("2023-01-01T00:00:00Z b");
        let mut out = b"prefix|".to_vec();
        e.render("blue", false, None, &mut out);
        assert_eq!(out, b"prefix|b");
    }

    #[test]
    fn test_render_keeps_invalid_utf8() {
        let mut payload = b"2023-01-01T00:00:00Z ".to_vec();
        payload.extend_from_slice(&[0xff, 0xfe]);
        let e = LogEntry::new(payload);
        let mut out = Vec::new();
        e.render("blue", false, None, &mut out);
        assert_eq!(out, vec![0xff, 0xfe]);

        let e = LogEntry::new(vec![0xff, b' ', b'x']);
        out.clear();
        e.render("blue", true, None, &mut out);
        assert_eq!(out, vec![0xff, b' ', b'x']);
    }

    #[test]
    fn test_eof_event() {
        assert!(LogEvent::Eof.is_empty());
        assert_eq!(LogEvent::Eof.id(), "");
        assert!(LogEvent::Eof.is_eof());
        assert!(LogEvent::Eof.entry().is_none());

        let empty_line = LogEvent::from(LogEntry::new(""));
        assert!(empty_line.is_empty());
        assert!(!empty_line.is_eof());
        assert_ne!(empty_line, LogEvent::Eof);
    }
}
