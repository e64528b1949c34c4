use serde::Serialize;

use crate::markdown::extension::CustomToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Align {
    None,
    Left,
    Center,
    Right,
}

impl From<pulldown_cmark::Alignment> for Align {
    fn from(value: pulldown_cmark::Alignment) -> Self {
        match value {
            pulldown_cmark::Alignment::None => Align::None,
            pulldown_cmark::Alignment::Left => Align::Left,
            pulldown_cmark::Alignment::Center => Align::Center,
            pulldown_cmark::Alignment::Right => Align::Right,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TokenKind {
    Heading { level: u8 },
    Paragraph,
    CodeBlock { lang: Option<String>, text: String },
    BlockQuote,
    List { start: Option<u64> },
    ListItem { checked: Option<bool> },
    Table { alignments: Vec<Align> },
    TableHead,
    TableRow,
    TableCell,
    ThematicBreak,
    Html { raw: String },
    FootnoteDefinition { label: String },
    Text { text: String },
    Code { text: String },
    Emphasis,
    Strong,
    Strikethrough,
    Link { href: String, title: String },
    Image { src: String, title: String },
    FootnoteReference { label: String },
    SoftBreak,
    HardBreak,
    Custom(CustomToken),
}

/// Fieldless mirror of [`TokenKind`], used as the key for render overrides.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenTag {
    Heading,
    Paragraph,
    CodeBlock,
    BlockQuote,
    List,
    ListItem,
    Table,
    TableHead,
    TableRow,
    TableCell,
    ThematicBreak,
    Html,
    FootnoteDefinition,
    Text,
    Code,
    Emphasis,
    Strong,
    Strikethrough,
    Link,
    Image,
    FootnoteReference,
    SoftBreak,
    HardBreak,
    Custom,
}

impl TokenKind {
    pub fn tag(&self) -> TokenTag {
        match self {
            TokenKind::Heading { .. } => TokenTag::Heading,
            TokenKind::Paragraph => TokenTag::Paragraph,
            TokenKind::CodeBlock { .. } => TokenTag::CodeBlock,
            TokenKind::BlockQuote => TokenTag::BlockQuote,
            TokenKind::List { .. } => TokenTag::List,
            TokenKind::ListItem { .. } => TokenTag::ListItem,
            TokenKind::Table { .. } => TokenTag::Table,
            TokenKind::TableHead => TokenTag::TableHead,
            TokenKind::TableRow => TokenTag::TableRow,
            TokenKind::TableCell => TokenTag::TableCell,
            TokenKind::ThematicBreak => TokenTag::ThematicBreak,
            TokenKind::Html { .. } => TokenTag::Html,
            TokenKind::FootnoteDefinition { .. } => TokenTag::FootnoteDefinition,
            TokenKind::Text { .. } => TokenTag::Text,
            TokenKind::Code { .. } => TokenTag::Code,
            TokenKind::Emphasis => TokenTag::Emphasis,
            TokenKind::Strong => TokenTag::Strong,
            TokenKind::Strikethrough => TokenTag::Strikethrough,
            TokenKind::Link { .. } => TokenTag::Link,
            TokenKind::Image { .. } => TokenTag::Image,
            TokenKind::FootnoteReference { .. } => TokenTag::FootnoteReference,
            TokenKind::SoftBreak => TokenTag::SoftBreak,
            TokenKind::HardBreak => TokenTag::HardBreak,
            TokenKind::Custom(_) => TokenTag::Custom,
        }
    }

    pub fn is_block(&self) -> bool {
        match self {
            TokenKind::Custom(custom) => custom.level.is_block(),
            other => matches!(
                other.tag(),
                TokenTag::Heading
                    | TokenTag::Paragraph
                    | TokenTag::CodeBlock
                    | TokenTag::BlockQuote
                    | TokenTag::List
                    | TokenTag::ListItem
                    | TokenTag::Table
                    | TokenTag::TableHead
                    | TokenTag::TableRow
                    | TokenTag::TableCell
                    | TokenTag::ThematicBreak
                    | TokenTag::Html
                    | TokenTag::FootnoteDefinition
            ),
        }
    }
}

/// A parsed unit of structure.
///
/// `complete` is false when the closing syntax of this token (or of a token
/// nested inside it) has not arrived yet and was supplied by the parser.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Token {
    #[serde(flatten)]
    pub kind: TokenKind,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Token>,
    pub complete: bool,
}

impl Token {
    pub fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            children: Vec::new(),
            complete: true,
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(TokenKind::Text { text: text.into() })
    }

    pub fn with_children(mut self, children: Vec<Token>) -> Self {
        self.children = children;
        self
    }

    pub fn incomplete(mut self) -> Self {
        self.complete = false;
        self
    }

    pub fn tag(&self) -> TokenTag {
        self.kind.tag()
    }

    /// Plain text of this token and its descendants.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        match &self.kind {
            TokenKind::Text { text } | TokenKind::Code { text } => out.push_str(text),
            TokenKind::CodeBlock { text, .. } => out.push_str(text),
            TokenKind::Custom(custom) => out.push_str(&custom.content),
            TokenKind::SoftBreak | TokenKind::HardBreak => out.push('\n'),
            _ => {}
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    /// Depth-first search for the first token with `tag`.
    pub fn find(&self, tag: TokenTag) -> Option<&Token> {
        if self.tag() == tag {
            return Some(self);
        }
        self.children.iter().find_map(|child| child.find(tag))
    }

    pub fn count_incomplete(&self) -> usize {
        let own = usize::from(!self.complete);
        own + self
            .children
            .iter()
            .map(Token::count_incomplete)
            .sum::<usize>()
    }
}

/// Search a token list depth-first.
pub fn find_tag(tokens: &[Token], tag: TokenTag) -> Option<&Token> {
    tokens.iter().find_map(|token| token.find(tag))
}
