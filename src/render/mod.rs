//! Token lists to styled terminal lines.
//!
//! [`Renderer::render`] walks the token tree once and produces ratatui
//! [`Line`]s. Callers can replace the built-in rendering of any token type
//! through a [`RenderMap`]; raw HTML is dropped unless the map says
//! otherwise. When any token is still incomplete, a streaming indicator is
//! appended to the last line.

mod table;
mod theme;

use std::collections::HashMap;
use std::fmt;

use ratatui::style::{Modifier, Style};
use ratatui::text::{Line, Span};
use unicode_width::UnicodeWidthStr;

use crate::markdown::{CustomToken, ExtensionSet, Token, TokenKind, TokenTag};

pub use theme::RenderTheme;

pub const DEFAULT_INDICATOR: &str = "▌";
const RULE_WIDTH: usize = 32;
const TAB_WIDTH: usize = 4;

/// Replacement renderer for one token type. Inline tokens splice the first
/// returned line into the line being built.
pub type OverrideFn = fn(&Token, &RenderTheme) -> Vec<Line<'static>>;

#[derive(Clone, Copy)]
enum Rule {
    Drop,
    Custom(OverrideFn),
}

/// Per-token-type rendering overrides. Tags without an entry use the
/// built-in rendering.
#[derive(Clone)]
pub struct RenderMap {
    rules: HashMap<TokenTag, Rule>,
}

impl Default for RenderMap {
    fn default() -> Self {
        Self::empty().drop_tag(TokenTag::Html)
    }
}

impl fmt::Debug for RenderMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut dropped: Vec<_> = self
            .rules
            .iter()
            .filter(|(_, rule)| matches!(rule, Rule::Drop))
            .map(|(tag, _)| *tag)
            .collect();
        dropped.sort_by_key(|tag| format!("{tag:?}"));
        f.debug_struct("RenderMap")
            .field("dropped", &dropped)
            .field("overrides", &(self.rules.len() - dropped.len()))
            .finish()
    }
}

impl RenderMap {
    /// The default map: built-in rendering with HTML dropped.
    pub fn new() -> Self {
        Self::default()
    }

    /// Built-in rendering for every tag, HTML included.
    pub fn empty() -> Self {
        Self {
            rules: HashMap::new(),
        }
    }

    pub fn set(mut self, tag: TokenTag, render: OverrideFn) -> Self {
        self.rules.insert(tag, Rule::Custom(render));
        self
    }

    pub fn drop_tag(mut self, tag: TokenTag) -> Self {
        self.rules.insert(tag, Rule::Drop);
        self
    }

    /// Return `tag` to its built-in rendering.
    pub fn reset(mut self, tag: TokenTag) -> Self {
        self.rules.remove(&tag);
        self
    }

    pub fn is_dropped(&self, tag: TokenTag) -> bool {
        matches!(self.rules.get(&tag), Some(Rule::Drop))
    }

    fn apply(&self, token: &Token, theme: &RenderTheme) -> Option<Vec<Line<'static>>> {
        match self.rules.get(&token.tag())? {
            Rule::Drop => Some(Vec::new()),
            Rule::Custom(render) => Some(render(token, theme)),
        }
    }
}

/// Accumulates spans into lines for inline content.
#[derive(Default)]
struct LineBuilder {
    lines: Vec<Line<'static>>,
    current: Vec<Span<'static>>,
}

impl LineBuilder {
    fn push(&mut self, span: Span<'static>) {
        if !span.content.is_empty() {
            self.current.push(span);
        }
    }

    fn push_text(&mut self, text: &str, style: Style) {
        for (idx, part) in text.split('\n').enumerate() {
            if idx > 0 {
                self.break_line();
            }
            self.push(Span::styled(part.to_string(), style));
        }
    }

    fn break_line(&mut self) {
        let spans = std::mem::take(&mut self.current);
        self.lines.push(Line::from(spans));
    }

    fn splice(&mut self, lines: Vec<Line<'static>>) {
        for (idx, line) in lines.into_iter().enumerate() {
            if idx > 0 {
                self.break_line();
            }
            self.current.extend(line.spans);
        }
    }

    fn finish(mut self) -> Vec<Line<'static>> {
        if !self.current.is_empty() {
            self.break_line();
        }
        self.lines
    }
}

#[derive(Debug, Clone)]
pub struct Renderer {
    map: RenderMap,
    theme: RenderTheme,
    extensions: ExtensionSet,
    indicator: Option<String>,
}

impl Default for Renderer {
    fn default() -> Self {
        Self::new()
    }
}

impl Renderer {
    pub fn new() -> Self {
        Self {
            map: RenderMap::default(),
            theme: RenderTheme::default(),
            extensions: ExtensionSet::new(),
            indicator: Some(DEFAULT_INDICATOR.to_string()),
        }
    }

    pub fn with_map(mut self, map: RenderMap) -> Self {
        self.map = map;
        self
    }

    pub fn with_theme(mut self, theme: RenderTheme) -> Self {
        self.theme = theme;
        self
    }

    /// Extensions whose renderers are used for custom tokens.
    pub fn with_extensions(mut self, extensions: ExtensionSet) -> Self {
        self.extensions = extensions;
        self
    }

    pub fn with_indicator(mut self, indicator: Option<String>) -> Self {
        self.indicator = indicator;
        self
    }

    pub fn theme(&self) -> &RenderTheme {
        &self.theme
    }

    pub fn render(&self, tokens: &[Token]) -> Vec<Line<'static>> {
        let mut lines = self.blocks(tokens, false);

        let streaming = tokens.iter().any(|token| token.count_incomplete() > 0);
        if let (true, Some(indicator)) = (streaming, &self.indicator) {
            let span = Span::styled(indicator.clone(), self.theme.streaming_indicator);
            match lines.last_mut() {
                Some(line) => line.spans.push(span),
                None => lines.push(Line::from(span)),
            }
        }
        lines
    }

    /// Render a run of sibling tokens. Consecutive inline tokens share
    /// lines; blocks are separated by a blank line unless `tight`.
    fn blocks(&self, tokens: &[Token], tight: bool) -> Vec<Line<'static>> {
        let mut out = Vec::new();
        let mut i = 0;

        while i < tokens.len() {
            let chunk = if tokens[i].kind.is_block() {
                i += 1;
                self.block(&tokens[i - 1])
            } else {
                let start = i;
                while i < tokens.len() && !tokens[i].kind.is_block() {
                    i += 1;
                }
                self.inline_lines(&tokens[start..i], self.theme.text)
            };

            if chunk.is_empty() {
                continue;
            }
            if !out.is_empty() && !tight {
                out.push(Line::default());
            }
            out.extend(chunk);
        }
        out
    }

    fn block(&self, token: &Token) -> Vec<Line<'static>> {
        if let Some(lines) = self.map.apply(token, &self.theme) {
            return lines;
        }

        match &token.kind {
            TokenKind::Heading { .. } => self.inline_lines(&token.children, self.theme.heading),
            TokenKind::Paragraph => self.inline_lines(&token.children, self.theme.text),
            TokenKind::CodeBlock { text, .. } => code_lines(text, self.theme.code_block),
            TokenKind::BlockQuote => {
                let marker = Span::styled("│ ", self.theme.quote_marker);
                self.blocks(&token.children, false)
                    .into_iter()
                    .map(|mut line| {
                        line.spans.insert(0, marker.clone());
                        line
                    })
                    .collect()
            }
            TokenKind::List { start } => self.list(token, *start),
            TokenKind::ListItem { .. } => self.list_item(token, "- ".to_string()),
            TokenKind::Table { alignments } => table::render(self, token, alignments),
            TokenKind::ThematicBreak => vec![Line::from(Span::styled(
                "─".repeat(RULE_WIDTH),
                self.theme.rule,
            ))],
            TokenKind::Html { raw } => raw
                .trim_end_matches('\n')
                .split('\n')
                .map(|line| Line::from(Span::styled(line.to_string(), self.theme.text)))
                .collect(),
            TokenKind::FootnoteDefinition { label } => hang(
                self.blocks(&token.children, true),
                vec![Span::styled(format!("[^{label}]: "), self.theme.list_marker)],
            ),
            TokenKind::Custom(custom) => self.custom_lines(custom),
            _ => self.blocks(&token.children, true),
        }
    }

    fn list(&self, token: &Token, start: Option<u64>) -> Vec<Line<'static>> {
        let loose = token.children.iter().any(|item| {
            item.children
                .iter()
                .any(|child| child.tag() == TokenTag::Paragraph)
        });

        let mut out = Vec::new();
        for (idx, item) in token.children.iter().enumerate() {
            let lines = match self.map.apply(item, &self.theme) {
                Some(lines) => lines,
                None => {
                    let marker = match start {
                        Some(first) => format!("{}. ", first.saturating_add(idx as u64)),
                        None => "- ".to_string(),
                    };
                    self.list_item(item, marker)
                }
            };
            if lines.is_empty() {
                continue;
            }
            if loose && !out.is_empty() {
                out.push(Line::default());
            }
            out.extend(lines);
        }
        out
    }

    fn list_item(&self, item: &Token, marker: String) -> Vec<Line<'static>> {
        let mut lead = vec![Span::styled(marker, self.theme.list_marker)];
        if let TokenKind::ListItem {
            checked: Some(checked),
        } = item.kind
        {
            let box_text = if checked { "[x] " } else { "[ ] " };
            lead.push(Span::styled(box_text, self.theme.list_marker));
        }
        let tight = !item
            .children
            .iter()
            .any(|child| child.tag() == TokenTag::Paragraph);
        hang(self.blocks(&item.children, tight), lead)
    }

    fn inline_lines(&self, tokens: &[Token], style: Style) -> Vec<Line<'static>> {
        let mut out = LineBuilder::default();
        for token in tokens {
            self.inline(token, style, &mut out);
        }
        out.finish()
    }

    fn inline_children(&self, token: &Token, style: Style, out: &mut LineBuilder) {
        for child in &token.children {
            self.inline(child, style, out);
        }
    }

    fn inline(&self, token: &Token, style: Style, out: &mut LineBuilder) {
        if let Some(lines) = self.map.apply(token, &self.theme) {
            out.splice(lines);
            return;
        }

        match &token.kind {
            TokenKind::Text { text } => out.push_text(text, style),
            TokenKind::Code { text } => {
                out.push(Span::styled(text.clone(), style.patch(self.theme.code)))
            }
            TokenKind::Emphasis => {
                self.inline_children(token, style.add_modifier(Modifier::ITALIC), out)
            }
            TokenKind::Strong => {
                self.inline_children(token, style.add_modifier(Modifier::BOLD), out)
            }
            TokenKind::Strikethrough => {
                self.inline_children(token, style.add_modifier(Modifier::CROSSED_OUT), out)
            }
            TokenKind::Link { .. } => {
                self.inline_children(token, style.patch(self.theme.link), out)
            }
            TokenKind::Image { src, .. } => {
                let alt = token.plain_text();
                let label = if alt.is_empty() { src.as_str() } else { alt.as_str() };
                out.push(Span::styled(
                    format!("[image: {label}]"),
                    style.patch(self.theme.link),
                ));
            }
            TokenKind::FootnoteReference { label } => out.push(Span::styled(
                format!("[^{label}]"),
                style.patch(self.theme.list_marker),
            )),
            TokenKind::SoftBreak | TokenKind::HardBreak => out.break_line(),
            TokenKind::Html { raw } => out.push_text(raw, style),
            TokenKind::Custom(custom) => out.splice(self.custom_lines(custom)),
            _ => out.splice(self.block(token)),
        }
    }

    fn custom_lines(&self, custom: &CustomToken) -> Vec<Line<'static>> {
        let mut out = LineBuilder::default();
        match self.extensions.renderer_for(custom.name) {
            Some(render) => {
                for span in render(custom) {
                    out.push_text(&span.content, span.style);
                }
            }
            None => out.push_text(custom.raw.trim_end_matches('\n'), self.theme.custom),
        }
        out.finish()
    }
}

fn detab(line: &str) -> String {
    line.replace('\t', &" ".repeat(TAB_WIDTH))
}

fn code_lines(text: &str, style: Style) -> Vec<Line<'static>> {
    if text.is_empty() {
        return Vec::new();
    }
    text.trim_end_matches('\n')
        .split('\n')
        .map(|line| Line::from(Span::styled(detab(line), style)))
        .collect()
}

/// Put `lead` in front of the first line and indent the rest to match.
fn hang(lines: Vec<Line<'static>>, lead: Vec<Span<'static>>) -> Vec<Line<'static>> {
    let width: usize = lead.iter().map(|span| span.content.width()).sum();
    let indent = " ".repeat(width);

    if lines.is_empty() {
        return vec![Line::from(lead)];
    }

    let mut lead = Some(lead);
    lines
        .into_iter()
        .map(|mut line| {
            match lead.take() {
                Some(mut spans) => {
                    spans.append(&mut line.spans);
                    line.spans = spans;
                }
                None if !line.spans.is_empty() => line.spans.insert(0, Span::raw(indent.clone())),
                None => {}
            }
            line
        })
        .collect()
}

/// Concatenated content of a rendered line, without styling.
pub fn line_text(line: &Line<'_>) -> String {
    line.spans.iter().map(|span| span.content.as_ref()).collect()
}
