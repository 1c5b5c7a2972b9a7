//! Bordered console blocks.
//!
//! ```text
//! ================ Agent (step=1) ================
//! body text, printed verbatim
//! ===============================================
//! ```

use crossterm::style::{Color, Stylize, style};

/// Visual width the top border aims for.
const TARGET_WIDTH: usize = 40;

/// Minimum `=` run on each side of the title.
const MIN_PADDING: usize = 4;

/// Build the top border for `title`.
pub fn border_line(title: &str) -> String {
    let title_len = title.chars().count();
    let total_padding = TARGET_WIDTH.saturating_sub(title_len).max(MIN_PADDING * 2);
    let padding = "=".repeat(total_padding / 2);
    let extra = if title_len % 2 == 1 { "=" } else { "" };
    format!("{padding} {title} {padding}{extra}")
}

/// Map a color name to a terminal color. Unknown names yield `None`.
pub fn parse_color(name: &str) -> Option<Color> {
    let color = match name.trim().to_ascii_lowercase().as_str() {
        "black" => Color::Black,
        "red" => Color::Red,
        "green" => Color::Green,
        "yellow" => Color::Yellow,
        "blue" => Color::Blue,
        "magenta" => Color::Magenta,
        "cyan" => Color::Cyan,
        "white" => Color::White,
        "gray" | "grey" => Color::Grey,
        "dark_red" => Color::DarkRed,
        "dark_green" => Color::DarkGreen,
        "dark_yellow" => Color::DarkYellow,
        "dark_blue" => Color::DarkBlue,
        "dark_magenta" => Color::DarkMagenta,
        "dark_cyan" => Color::DarkCyan,
        "dark_gray" | "dark_grey" => Color::DarkGrey,
        _ => return None,
    };
    Some(color)
}

/// Render a titled block: top border, `text` verbatim, closing border of the
/// same byte length as the top one. With a known `color`, borders and body
/// are wrapped in that color's escape codes.
pub fn render_box(title: &str, text: &str, color: Option<&str>) -> String {
    let top = border_line(title);
    let bottom = "=".repeat(top.len());
    let plain = format!("{top}\n{text}\n{bottom}");
    match color.and_then(parse_color) {
        Some(color) => style(plain).with(color).to_string(),
        None => plain,
    }
}

/// Cut `text` to `limit` characters, appending `...(truncated)` when cut.
pub fn truncate(text: &str, limit: usize) -> String {
    match text.char_indices().nth(limit) {
        Some((at, _)) => format!("{}...(truncated)", &text[..at]),
        None => text.to_string(),
    }
}

/// Print a titled block to stdout.
pub fn print_box(title: &str, text: &str, color: Option<&str>) {
    println!("{}", render_box(title, text, color));
}
