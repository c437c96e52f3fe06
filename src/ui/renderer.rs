use crate::ui::markup::{parse_markup, strip_markup};
use crossterm::queue;
use crossterm::style::{
    Attribute, Attributes, Color as TermColor, ContentStyle, Print, PrintStyledContent,
    StyledContent,
};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Line;
use serde::Deserialize;
use std::io::Write;

/// How rendered lines reach the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Raw `[color::attrs]` markup.
    Markup,
    /// Markup decoded into terminal colors.
    Ansi,
    /// Markup stripped.
    Plain,
}

/// Writes one rendered line, terminated by a newline.
///
/// Only `markup[..message_start]` is decoded; the message after it is payload
/// text and is written as is, so bracketed text in a log line survives.
pub fn write_line<W: Write>(
    out: &mut W,
    markup: &[u8],
    message_start: usize,
    format: OutputFormat,
) -> std::io::Result<()> {
    let (prefix, message) = markup.split_at(message_start.min(markup.len()));
    match format {
        OutputFormat::Markup => {
            out.write_all(markup)?;
            out.write_all(b"\n")
        }
        OutputFormat::Plain => {
            let text = strip_markup(&String::from_utf8_lossy(prefix));
            out.write_all(text.as_bytes())?;
            out.write_all(message)?;
            out.write_all(b"\n")
        }
        OutputFormat::Ansi => {
            let line = parse_markup(&String::from_utf8_lossy(prefix));
            write_styled(out, &line)?;
            queue!(out, Print(String::from_utf8_lossy(message)), Print('\n'))
        }
    }
}

fn write_styled<W: Write>(out: &mut W, line: &Line<'_>) -> std::io::Result<()> {
    for span in &line.spans {
        let content = StyledContent::new(content_style(span.style), span.content.as_ref());
        queue!(out, PrintStyledContent(content))?;
    }
    Ok(())
}

fn content_style(style: Style) -> ContentStyle {
    let mut attributes = Attributes::default();
    for (modifier, attribute) in [
        (Modifier::BOLD, Attribute::Bold),
        (Modifier::DIM, Attribute::Dim),
        (Modifier::ITALIC, Attribute::Italic),
        (Modifier::UNDERLINED, Attribute::Underlined),
        (Modifier::SLOW_BLINK, Attribute::SlowBlink),
        (Modifier::REVERSED, Attribute::Reverse),
        (Modifier::CROSSED_OUT, Attribute::CrossedOut),
    ] {
        if style.add_modifier.contains(modifier) {
            attributes.set(attribute);
        }
    }
    ContentStyle {
        foreground_color: style.fg.map(convert_color),
        background_color: style.bg.map(convert_color),
        underline_color: None,
        attributes,
    }
}

fn convert_color(color: Color) -> TermColor {
    match color {
        Color::Reset => TermColor::Reset,
        Color::Black => TermColor::Black,
        Color::Red => TermColor::DarkRed,
        Color::Green => TermColor::DarkGreen,
        Color::Yellow => TermColor::DarkYellow,
        Color::Blue => TermColor::DarkBlue,
        Color::Magenta => TermColor::DarkMagenta,
        Color::Cyan => TermColor::DarkCyan,
        Color::Gray => TermColor::Grey,
        Color::DarkGray => TermColor::DarkGrey,
        Color::LightRed => TermColor::Red,
        Color::LightGreen => TermColor::Green,
        Color::LightYellow => TermColor::Yellow,
        Color::LightBlue => TermColor::Blue,
        Color::LightMagenta => TermColor::Magenta,
        Color::LightCyan => TermColor::Cyan,
        Color::White => TermColor::White,
        Color::Indexed(i) => TermColor::AnsiValue(i),
        Color::Rgb(r, g, b) => TermColor::Rgb { r, g, b },
    }
}
