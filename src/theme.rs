//! Display styles for the pager.
//!
//! Styles are `ratatui` styles used as overlays: a style with unset fields
//! leaves the underlying cell attributes alone when patched over them.

use ratatui::style::{Color, Modifier, Style};

#[derive(Debug, Clone)]
pub struct Theme {
    /// Base style for body rows.
    pub body: Style,
    /// Overlay for frozen header rows.
    pub header: Style,
    /// Overlay for the line-number gutter.
    pub line_number: Style,
    /// Overlay for search matches.
    pub search_highlight: Style,
    /// Overlay for the column under the column cursor.
    pub column_highlight: Style,
    /// Overlay for marked lines (leftmost columns).
    pub mark_line: Style,
    /// Overlay for section delimiter rows and pinned section headers.
    pub section_line: Style,
    /// Overlay for the jump-target row.
    pub jump_target_line: Style,
    /// Overlay for odd body rows when alternate-row shading is on.
    pub alternate: Style,
    /// Rotating palette for rainbow column shading.
    pub column_rainbow: Vec<Style>,
    /// Rotating palette for multi-word highlighting.
    pub multi_color_highlight: Vec<Style>,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            body: Style::default(),
            header: Style::default().add_modifier(Modifier::BOLD),
            line_number: Style::default().fg(Color::DarkGray),
            search_highlight: Style::default().add_modifier(Modifier::REVERSED),
            column_highlight: Style::default().add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
            mark_line: Style::default().bg(Color::Blue),
            section_line: Style::default().add_modifier(Modifier::BOLD).fg(Color::Cyan),
            jump_target_line: Style::default().add_modifier(Modifier::UNDERLINED),
            alternate: Style::default().bg(Color::Indexed(236)),
            column_rainbow: vec![
                Style::default().fg(Color::White),
                Style::default().fg(Color::Red),
                Style::default().fg(Color::Green),
                Style::default().fg(Color::Yellow),
                Style::default().fg(Color::Blue),
                Style::default().fg(Color::Magenta),
                Style::default().fg(Color::Cyan),
            ],
            multi_color_highlight: vec![
                Style::default().fg(Color::Red),
                Style::default().fg(Color::Green),
                Style::default().fg(Color::Yellow),
                Style::default().fg(Color::Blue),
                Style::default().fg(Color::Magenta),
                Style::default().fg(Color::Cyan),
                Style::default().fg(Color::White),
            ],
        }
    }
}

/// Patch `overlay` over `base`, keeping base attributes the overlay leaves
/// unset.
pub fn apply_style(base: Style, overlay: Style) -> Style {
    base.patch(overlay)
}
