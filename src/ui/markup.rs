//! Decoder for the `[fg:bg:attrs]text` markup produced by `LogEntry::render`.
//!
//! Each tag field is either empty (keep the current value), `-` (reset to the
//! terminal default) or a value. Colors are anything `ratatui` can parse from
//! a name or `#rrggbb`; attributes are single letters. Bracketed text that is
//! not a valid tag stays in the line as literal text.

use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use regex::Regex;
use std::str::FromStr;
use std::sync::OnceLock;

fn tag_regex() -> &'static Regex {
    static TAG: OnceLock<Regex> = OnceLock::new();
    TAG.get_or_init(|| {
        Regex::new(concat!(
            r"\[([A-Za-z#-][A-Za-z0-9]*|)",
            r"(?::([A-Za-z#-][A-Za-z0-9]*|)",
            r"(?::([bdilrsu-]*))?)?\]",
        ))
        .expect("tag pattern is valid")
    })
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct TagState {
    fg: Option<Color>,
    bg: Option<Color>,
    modifiers: Modifier,
}

impl TagState {
    fn style(&self) -> Style {
        let mut style = Style::default().add_modifier(self.modifiers);
        if let Some(fg) = self.fg {
            style = style.fg(fg);
        }
        if let Some(bg) = self.bg {
            style = style.bg(bg);
        }
        style
    }

    /// Applies a tag to the state, or returns `None` if it is not a tag.
    fn apply(&self, fg: &str, bg: Option<&str>, attrs: Option<&str>) -> Option<TagState> {
        if fg.is_empty() && bg.is_none() {
            return None;
        }
        let mut next = *self;
        next.fg = parse_color_field(fg, self.fg)?;
        if let Some(bg) = bg {
            next.bg = parse_color_field(bg, self.bg)?;
        }
        if let Some(attrs) = attrs
            && !attrs.is_empty()
        {
            next.modifiers = attrs
                .chars()
                .filter_map(modifier_for)
                .fold(Modifier::empty(), |acc, m| acc | m);
        }
        Some(next)
    }
}

fn parse_color_field(field: &str, current: Option<Color>) -> Option<Option<Color>> {
    match field {
        "" => Some(current),
        "-" => Some(None),
        name => Color::from_str(name).ok().map(Some),
    }
}

fn modifier_for(c: char) -> Option<Modifier> {
    match c {
        'b' => Some(Modifier::BOLD),
        'd' => Some(Modifier::DIM),
        'i' => Some(Modifier::ITALIC),
        'u' => Some(Modifier::UNDERLINED),
        'l' => Some(Modifier::SLOW_BLINK),
        'r' => Some(Modifier::REVERSED),
        's' => Some(Modifier::CROSSED_OUT),
        _ => None,
    }
}

/// Decodes one line of markup into styled spans.
pub fn parse_markup(text: &str) -> Line<'static> {
    let mut spans = Vec::new();
    let mut state = TagState::default();
    let mut pending = String::new();
    let mut last_end = 0;

    for caps in tag_regex().captures_iter(text) {
        let Some(whole) = caps.get(0) else {
            continue;
        };
        let fg = caps.get(1).map_or("", |m| m.as_str());
        let bg = caps.get(2).map(|m| m.as_str());
        let attrs = caps.get(3).map(|m| m.as_str());

        let Some(next) = state.apply(fg, bg, attrs) else {
            continue;
        };

        pending.push_str(&text[last_end..whole.start()]);
        last_end = whole.end();
        if next != state {
            if !pending.is_empty() {
                spans.push(Span::styled(std::mem::take(&mut pending), state.style()));
            }
            state = next;
        }
    }

    pending.push_str(&text[last_end..]);
    if !pending.is_empty() {
        spans.push(Span::styled(pending, state.style()));
    }
    Line::from(spans)
}

/// The text of a markup line with all tags removed.
pub fn strip_markup(text: &str) -> String {
    parse_markup(text)
        .spans
        .iter()
        .map(|span| span.content.as_ref())
        .collect()
}
