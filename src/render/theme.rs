use ratatui::style::{Color, Modifier, Style};

/// Styles applied while mapping tokens to lines.
#[derive(Debug, Clone)]
pub struct RenderTheme {
    pub text: Style,
    pub heading: Style,
    pub code: Style,
    pub code_block: Style,
    pub link: Style,
    pub quote_marker: Style,
    pub list_marker: Style,
    pub table_border: Style,
    pub rule: Style,
    pub custom: Style,
    pub streaming_indicator: Style,
}

impl Default for RenderTheme {
    fn default() -> Self {
        Self::dark()
    }
}

impl RenderTheme {
    pub fn dark() -> Self {
        Self {
            text: Style::default().fg(Color::White),
            heading: Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
            code: Style::default().fg(Color::Yellow),
            code_block: Style::default().fg(Color::Gray),
            link: Style::default()
                .fg(Color::Blue)
                .add_modifier(Modifier::UNDERLINED),
            quote_marker: Style::default().fg(Color::DarkGray),
            list_marker: Style::default().fg(Color::Cyan),
            table_border: Style::default().fg(Color::DarkGray),
            rule: Style::default().fg(Color::DarkGray),
            custom: Style::default().fg(Color::Magenta),
            streaming_indicator: Style::default().fg(Color::White),
        }
    }

    /// No colors or modifiers; for output that is not a terminal.
    pub fn plain() -> Self {
        let style = Style::default();
        Self {
            text: style,
            heading: style,
            code: style,
            code_block: style,
            link: style,
            quote_marker: style,
            list_marker: style,
            table_border: style,
            rule: style,
            custom: style,
            streaming_indicator: style,
        }
    }
}
