use pulldown_cmark::{CodeBlockKind, Event, Options, Tag};
use tracing::{debug, trace};

use crate::markdown::extension::{CustomToken, ExtensionLevel, ExtensionSet};
use crate::markdown::fence::{FenceLine, FenceTracker};
use crate::markdown::repair::{repair_tail, Repaired};
use crate::markdown::token::{Token, TokenKind};

/// Marks the spot where an inline extension token was lifted out of the
/// text; the following private-use char encodes its index.
const SENTINEL: char = '\u{FFFC}';
const INDEX_BASE: u32 = 0xF0000;
const INDEX_LIMIT: u32 = 0xFFFFD;

fn index_char(index: usize) -> Option<char> {
    let code = INDEX_BASE.checked_add(u32::try_from(index).ok()?)?;
    if code > INDEX_LIMIT {
        return None;
    }
    char::from_u32(code)
}

fn char_index(c: char) -> Option<usize> {
    let code = c as u32;
    (INDEX_BASE..=INDEX_LIMIT)
        .contains(&code)
        .then(|| (code - INDEX_BASE) as usize)
}

#[derive(Debug, Clone)]
struct Lifted {
    token: CustomToken,
    complete: bool,
}

/// What a sentinel pair in the prepared text stands for.
#[derive(Debug, Clone)]
enum Placeholder {
    Extension(Lifted),
    /// A sentinel char that was already part of the input.
    Literal,
}

impl Placeholder {
    fn raw(&self) -> &str {
        match self {
            Placeholder::Extension(lifted) => &lifted.token.raw,
            Placeholder::Literal => SENTINEL_STR,
        }
    }
}

const SENTINEL_STR: &str = "\u{FFFC}";

/// Copy `text`, turning every sentinel char already in it into a literal
/// placeholder so the tokenizer never sees a bare one.
fn push_escaped(out: &mut String, text: &str, placeholders: &mut Vec<Placeholder>) {
    let mut rest = text;
    while let Some(pos) = rest.find(SENTINEL) {
        out.push_str(&rest[..pos]);
        match index_char(placeholders.len()) {
            Some(marker) => {
                out.push(SENTINEL);
                out.push(marker);
                placeholders.push(Placeholder::Literal);
            }
            None => out.push(char::REPLACEMENT_CHARACTER),
        }
        rest = &rest[pos + SENTINEL.len_utf8()..];
    }
    out.push_str(rest);
}

/// Follows the blocks whose lines are never offered to block extensions:
/// fenced code and raw HTML.
#[derive(Debug, Default)]
struct OpaqueBlocks {
    fence: FenceTracker,
    html: Option<HtmlEnd>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum HtmlEnd {
    BlankLine,
    Marker(&'static str),
}

impl OpaqueBlocks {
    fn is_open(&self) -> bool {
        self.fence.is_open() || self.html.is_some()
    }

    fn feed(&mut self, line: &str) {
        if let Some(end) = self.html {
            let closed = match end {
                HtmlEnd::BlankLine => line.trim().is_empty(),
                HtmlEnd::Marker(marker) => line.to_ascii_lowercase().contains(marker),
            };
            if closed {
                self.html = None;
            }
            return;
        }
        if self.fence.feed(line) == FenceLine::Outside {
            self.html = html_block_start(line);
        }
    }
}

const RAW_HTML_TAGS: &[(&str, &str)] = &[
    ("pre", "</pre>"),
    ("script", "</script>"),
    ("style", "</style>"),
    ("textarea", "</textarea>"),
];

/// Recognize the first line of a raw HTML block and how it ends. Blocks that
/// end on their first line return `None`.
fn html_block_start(line: &str) -> Option<HtmlEnd> {
    let trimmed = line.trim_start_matches(' ');
    if line.len() - trimmed.len() > 3 {
        return None;
    }
    let lower = trimmed.strip_prefix('<')?.to_ascii_lowercase();

    let until = |marker: &'static str, skip: usize| {
        (!lower[skip..].contains(marker)).then_some(HtmlEnd::Marker(marker))
    };
    if lower.starts_with("!--") {
        return until("-->", 3);
    }
    if lower.starts_with('?') {
        return until("?>", 1);
    }
    if lower.starts_with("![cdata[") {
        return until("]]>", 8);
    }
    if lower.starts_with('!') {
        return until(">", 1);
    }
    for (tag, closing) in RAW_HTML_TAGS {
        if let Some(after) = lower.strip_prefix(*tag) {
            if after.is_empty() || after.starts_with([' ', '\t', '>', '\n', '\r']) {
                return until(*closing, tag.len());
            }
        }
    }

    let name = lower.strip_prefix('/').unwrap_or(&lower);
    if !name.starts_with(|c: char| c.is_ascii_alphabetic()) {
        return None;
    }
    let after = name.trim_start_matches(|c: char| c.is_ascii_alphanumeric() || c == '-');
    if after.is_empty() || after.starts_with([' ', '\t', '>', '/', '\n', '\r']) {
        Some(HtmlEnd::BlankLine)
    } else {
        None
    }
}

/// Four columns of indentation make an indented code line.
fn is_indented_code(line: &str) -> bool {
    let mut columns = 0;
    for c in line.chars() {
        match c {
            ' ' => columns += 1,
            '\t' => columns += 4 - columns % 4,
            _ => break,
        }
        if columns >= 4 {
            return true;
        }
    }
    false
}

enum Segment<'a> {
    Markdown(&'a str),
    Custom(Lifted),
}

/// Tolerant markdown parser.
///
/// Parsing is stateless: every call recomputes the token list from the
/// buffer it is given, so the result depends only on the buffer's content.
#[derive(Debug, Clone)]
pub struct Parser {
    extensions: ExtensionSet,
    options: Options,
}

impl Default for Parser {
    fn default() -> Self {
        Self::new()
    }
}

impl Parser {
    pub fn new() -> Self {
        Self::with_extensions(ExtensionSet::new())
    }

    pub fn with_extensions(extensions: ExtensionSet) -> Self {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_FOOTNOTES);
        Self {
            extensions,
            options,
        }
    }

    pub fn extensions(&self) -> &ExtensionSet {
        &self.extensions
    }

    /// Parse a buffer that may still grow. Syntax left open at the end is
    /// closed and the affected tokens are marked incomplete.
    pub fn parse(&self, buffer: &str) -> Vec<Token> {
        self.parse_with(buffer, true)
    }

    /// Parse a buffer that will not grow any further.
    pub fn parse_final(&self, buffer: &str) -> Vec<Token> {
        self.parse_with(buffer, false)
    }

    fn parse_with(&self, buffer: &str, tolerant: bool) -> Vec<Token> {
        let segments = self.split_blocks(buffer, tolerant);
        let last = segments.len().saturating_sub(1);
        let mut tokens = Vec::new();

        for (index, segment) in segments.into_iter().enumerate() {
            match segment {
                Segment::Markdown(text) => {
                    let repair = tolerant && index == last;
                    tokens.extend(self.parse_markdown(text, repair));
                }
                Segment::Custom(lifted) => tokens.push(lifted.into_token()),
            }
        }

        trace!(
            len = buffer.len(),
            tokens = tokens.len(),
            tolerant,
            "Parsed buffer"
        );
        tokens
    }

    /// Cut the buffer at block extension claims. Claims are only offered at
    /// line starts outside fenced code, raw HTML and indented code. Once the
    /// buffer is final, a claim that never found its closing line is dropped
    /// and the text stays markdown.
    fn split_blocks<'a>(&self, buffer: &'a str, tolerant: bool) -> Vec<Segment<'a>> {
        if !self.extensions.has_level(ExtensionLevel::Block) {
            return vec![Segment::Markdown(buffer)];
        }

        let mut segments = Vec::new();
        let mut opaque = OpaqueBlocks::default();
        let mut segment_start = 0;
        let mut pos = 0;

        while pos < buffer.len() {
            let rest = &buffer[pos..];
            let line_len = rest.find('\n').map(|nl| nl + 1).unwrap_or(rest.len());
            let line = &rest[..line_len];

            if !opaque.is_open() && !is_indented_code(line) {
                if let Some((token, complete)) =
                    self.extensions.claim(ExtensionLevel::Block, rest)
                {
                    if complete || tolerant {
                        if pos > segment_start {
                            segments.push(Segment::Markdown(&buffer[segment_start..pos]));
                        }
                        pos += token.raw.len();
                        segment_start = pos;
                        segments.push(Segment::Custom(Lifted { token, complete }));
                        continue;
                    }
                    debug!(extension = %token.name, "Unclosed block left as markdown");
                }
            }

            opaque.feed(line);
            pos += line_len;
        }

        if segment_start < buffer.len() || segments.is_empty() {
            segments.push(Segment::Markdown(&buffer[segment_start..]));
        }
        segments
    }

    fn parse_markdown(&self, text: &str, repair: bool) -> Vec<Token> {
        let (prepared, placeholders) = self.lift_inline(text);
        let Repaired { source, boundary } = if repair {
            repair_tail(&prepared)
        } else {
            Repaired::untouched(&prepared)
        };

        let mut builder = TreeBuilder::new(boundary);
        let events = pulldown_cmark::Parser::new_ext(&source, self.options).into_offset_iter();
        for (event, range) in events {
            builder.event(event, range.end);
        }
        let tokens = builder.finish();

        if placeholders.is_empty() {
            tokens
        } else {
            restore_lifted(tokens, &placeholders)
        }
    }

    /// Replace inline extension claims with sentinels so the markdown
    /// tokenizer treats them as opaque text.
    fn lift_inline(&self, text: &str) -> (String, Vec<Placeholder>) {
        if !self.extensions.has_level(ExtensionLevel::Inline) {
            return (text.to_string(), Vec::new());
        }

        let mut out = String::with_capacity(text.len());
        let mut placeholders = Vec::new();
        let mut fence = FenceTracker::default();

        for line in text.split_inclusive('\n') {
            if fence.feed(line) != FenceLine::Outside {
                push_escaped(&mut out, line, &mut placeholders);
                continue;
            }
            self.lift_line(line, &mut out, &mut placeholders);
        }
        (out, placeholders)
    }

    fn lift_line(&self, line: &str, out: &mut String, placeholders: &mut Vec<Placeholder>) {
        let bytes = line.as_bytes();
        let mut i = 0;

        while i < line.len() {
            let verbatim_end = match bytes[i] {
                b'\\' => {
                    let skip = line[i + 1..].chars().next().map_or(0, char::len_utf8);
                    Some(i + 1 + skip)
                }
                b'`' => {
                    let run = bytes[i..].iter().take_while(|b| **b == b'`').count();
                    let closing = "`".repeat(run);
                    Some(
                        line[i + run..]
                            .find(closing.as_str())
                            .map(|pos| i + run + pos + run)
                            .unwrap_or(line.len()),
                    )
                }
                b']' if bytes.get(i + 1) == Some(&b'(') => Some(
                    line[i..]
                        .find(')')
                        .map(|pos| i + pos + 1)
                        .unwrap_or(line.len()),
                ),
                _ => None,
            };
            if let Some(end) = verbatim_end {
                push_escaped(out, &line[i..end], placeholders);
                i = end;
                continue;
            }

            let rest = &line[i..];
            if let Some((token, complete)) = self.extensions.claim(ExtensionLevel::Inline, rest) {
                if let Some(marker) = index_char(placeholders.len()) {
                    i += token.raw.len();
                    out.push(SENTINEL);
                    out.push(marker);
                    placeholders.push(Placeholder::Extension(Lifted { token, complete }));
                    continue;
                }
            }

            let len = rest.chars().next().map_or(1, char::len_utf8);
            push_escaped(out, &rest[..len], placeholders);
            i += len;
        }
    }
}

impl Lifted {
    fn into_token(self) -> Token {
        Token {
            kind: TokenKind::Custom(self.token),
            children: Vec::new(),
            complete: self.complete,
        }
    }
}

/// Put lifted extension tokens back where their sentinels ended up, and
/// restore the raw text wherever a sentinel landed in a string field.
fn restore_lifted(tokens: Vec<Token>, placeholders: &[Placeholder]) -> Vec<Token> {
    let mut out = Vec::with_capacity(tokens.len());
    for mut token in tokens {
        match &mut token.kind {
            TokenKind::Text { text } if text.contains(SENTINEL) => {
                split_text(text, token.complete, placeholders, &mut out);
                continue;
            }
            TokenKind::Text { .. } => {}
            TokenKind::Code { text } | TokenKind::CodeBlock { text, .. } => {
                *text = restore_raw(text, placeholders)
            }
            TokenKind::Html { raw } => *raw = restore_raw(raw, placeholders),
            TokenKind::Link { href, title } => {
                *href = restore_raw(href, placeholders);
                *title = restore_raw(title, placeholders);
            }
            TokenKind::Image { src, title } => {
                *src = restore_raw(src, placeholders);
                *title = restore_raw(title, placeholders);
            }
            _ => {}
        }
        token.children = restore_lifted(std::mem::take(&mut token.children), placeholders);
        out.push(token);
    }
    out
}

fn placeholder_at(placeholders: &[Placeholder], marker: Option<char>) -> Option<&Placeholder> {
    marker
        .and_then(char_index)
        .and_then(|index| placeholders.get(index))
}

fn split_text(text: &str, complete: bool, placeholders: &[Placeholder], out: &mut Vec<Token>) {
    let mut plain = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == SENTINEL {
            match placeholder_at(placeholders, chars.peek().copied()) {
                Some(Placeholder::Extension(item)) => {
                    chars.next();
                    if !plain.is_empty() {
                        out.push(Token::text(std::mem::take(&mut plain)).complete_if(complete));
                    }
                    let mut token = item.clone().into_token();
                    token.complete &= complete;
                    out.push(token);
                    continue;
                }
                Some(Placeholder::Literal) => {
                    chars.next();
                }
                None => {}
            }
        }
        plain.push(c);
    }
    if !plain.is_empty() {
        out.push(Token::text(plain).complete_if(complete));
    }
}

fn restore_raw(text: &str, placeholders: &[Placeholder]) -> String {
    if !text.contains(SENTINEL) {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        if c == SENTINEL {
            if let Some(item) = placeholder_at(placeholders, chars.peek().copied()) {
                chars.next();
                out.push_str(item.raw());
                continue;
            }
        }
        out.push(c);
    }
    out
}

impl Token {
    fn complete_if(mut self, complete: bool) -> Self {
        self.complete = complete;
        self
    }
}

struct Frame {
    kind: TokenKind,
    complete: bool,
    children: Vec<Token>,
    /// Containers with no token of their own; children go to the parent.
    transparent: bool,
}

/// Folds pulldown-cmark events into a token tree.
struct TreeBuilder {
    boundary: usize,
    stack: Vec<Frame>,
    root: Vec<Token>,
}

impl TreeBuilder {
    fn new(boundary: usize) -> Self {
        Self {
            boundary,
            stack: Vec::new(),
            root: Vec::new(),
        }
    }

    fn siblings(&mut self) -> &mut Vec<Token> {
        match self.stack.last_mut() {
            Some(frame) => &mut frame.children,
            None => &mut self.root,
        }
    }

    fn push_leaf(&mut self, kind: TokenKind, end: usize) {
        let complete = end <= self.boundary;
        let siblings = self.siblings();

        if let TokenKind::Text { text } = &kind {
            if let Some(Token {
                kind: TokenKind::Text { text: previous },
                complete: previous_complete,
                ..
            }) = siblings.last_mut()
            {
                previous.push_str(text);
                *previous_complete &= complete;
                return;
            }
        }

        let mut token = Token::new(kind);
        token.complete = complete;
        siblings.push(token);
    }

    fn start(&mut self, tag: Tag<'_>, end: usize) {
        let mut transparent = false;
        let kind = match tag {
            Tag::Paragraph => TokenKind::Paragraph,
            Tag::Heading { level, .. } => TokenKind::Heading { level: level as u8 },
            Tag::BlockQuote(_) => TokenKind::BlockQuote,
            Tag::CodeBlock(kind) => TokenKind::CodeBlock {
                lang: match kind {
                    CodeBlockKind::Fenced(info) => info
                        .split_whitespace()
                        .next()
                        .map(str::to_string),
                    CodeBlockKind::Indented => None,
                },
                text: String::new(),
            },
            Tag::HtmlBlock => TokenKind::Html { raw: String::new() },
            Tag::List(start) => TokenKind::List { start },
            Tag::Item => TokenKind::ListItem { checked: None },
            Tag::FootnoteDefinition(label) => TokenKind::FootnoteDefinition {
                label: label.to_string(),
            },
            Tag::Table(alignments) => TokenKind::Table {
                alignments: alignments.into_iter().map(Into::into).collect(),
            },
            Tag::TableHead => TokenKind::TableHead,
            Tag::TableRow => TokenKind::TableRow,
            Tag::TableCell => TokenKind::TableCell,
            Tag::Emphasis => TokenKind::Emphasis,
            Tag::Strong => TokenKind::Strong,
            Tag::Strikethrough => TokenKind::Strikethrough,
            Tag::Link {
                dest_url, title, ..
            } => TokenKind::Link {
                href: dest_url.to_string(),
                title: title.to_string(),
            },
            Tag::Image {
                dest_url, title, ..
            } => TokenKind::Image {
                src: dest_url.to_string(),
                title: title.to_string(),
            },
            _ => {
                transparent = true;
                TokenKind::Paragraph
            }
        };

        self.stack.push(Frame {
            kind,
            complete: end <= self.boundary,
            children: Vec::new(),
            transparent,
        });
    }

    fn end(&mut self) {
        let Some(frame) = self.stack.pop() else {
            return;
        };

        if frame.transparent {
            let children = frame.children;
            self.siblings().extend(children);
            return;
        }

        let mut token = Token {
            kind: frame.kind,
            children: frame.children,
            complete: frame.complete,
        };

        match &mut token.kind {
            TokenKind::CodeBlock { text, .. } | TokenKind::Html { raw: text } => {
                for child in token.children.drain(..) {
                    if let TokenKind::Text { text: part } | TokenKind::Html { raw: part } =
                        child.kind
                    {
                        text.push_str(&part);
                    }
                }
            }
            _ => {}
        }

        self.siblings().push(token);
    }

    fn event(&mut self, event: Event<'_>, end: usize) {
        match event {
            Event::Start(tag) => self.start(tag, end),
            Event::End(_) => self.end(),
            Event::Text(text) => self.push_leaf(
                TokenKind::Text {
                    text: text.to_string(),
                },
                end,
            ),
            Event::Code(text) => self.push_leaf(
                TokenKind::Code {
                    text: text.to_string(),
                },
                end,
            ),
            Event::Html(html) | Event::InlineHtml(html) => self.push_leaf(
                TokenKind::Html {
                    raw: html.to_string(),
                },
                end,
            ),
            Event::InlineMath(text) | Event::DisplayMath(text) => self.push_leaf(
                TokenKind::Text {
                    text: text.to_string(),
                },
                end,
            ),
            Event::FootnoteReference(label) => self.push_leaf(
                TokenKind::FootnoteReference {
                    label: label.to_string(),
                },
                end,
            ),
            Event::SoftBreak => self.push_leaf(TokenKind::SoftBreak, end),
            Event::HardBreak => self.push_leaf(TokenKind::HardBreak, end),
            Event::Rule => self.push_leaf(TokenKind::ThematicBreak, end),
            Event::TaskListMarker(checked) => {
                if let Some(frame) = self
                    .stack
                    .iter_mut()
                    .rev()
                    .find(|frame| matches!(frame.kind, TokenKind::ListItem { .. }))
                {
                    frame.kind = TokenKind::ListItem {
                        checked: Some(checked),
                    };
                }
            }
        }
    }

    fn finish(mut self) -> Vec<Token> {
        while !self.stack.is_empty() {
            self.end();
        }
        self.root
    }
}
