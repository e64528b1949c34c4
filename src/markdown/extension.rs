//! Caller-supplied syntax handlers.
//!
//! An [`Extension`] is a tagged pair of plain function pointers: a tokenizer
//! that looks at the remaining unparsed slice and either declines or claims a
//! prefix, and an optional renderer for the token it produces. The list is
//! fixed when the parser is built. At each candidate position extensions are
//! tried in registration order and the first claim wins; built-in markdown
//! handling only sees what every extension declined.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};

use ratatui::text::Span;
use serde::Serialize;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtensionLevel {
    /// Offered the rest of the document at each line start outside code
    /// fences.
    Block,
    /// Offered the rest of the current line at each position in prose.
    Inline,
}

impl ExtensionLevel {
    pub fn is_block(self) -> bool {
        self == ExtensionLevel::Block
    }
}

/// A prefix claimed by a tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claim {
    /// Bytes consumed from the offered slice. Must be non-zero and land on a
    /// char boundary.
    pub len: usize,
    pub content: String,
    pub info: Option<String>,
    /// False when the construct's closing syntax has not arrived yet.
    pub complete: bool,
}

impl Claim {
    pub fn new(len: usize, content: impl Into<String>) -> Self {
        Self {
            len,
            content: content.into(),
            info: None,
            complete: true,
        }
    }

    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = Some(info.into());
        self
    }

    pub fn incomplete(mut self) -> Self {
        self.complete = false;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CustomToken {
    /// Name of the extension that produced this token.
    pub name: &'static str,
    pub level: ExtensionLevel,
    /// The exact source text that was claimed.
    pub raw: String,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub info: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionError(pub String);

impl ExtensionError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

impl fmt::Display for ExtensionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for ExtensionError {}

pub type TokenizeFn = fn(&str) -> Result<Option<Claim>, ExtensionError>;
pub type RenderFn = fn(&CustomToken) -> Vec<Span<'static>>;

#[derive(Clone, Copy)]
pub struct Extension {
    pub name: &'static str,
    pub level: ExtensionLevel,
    /// Characters that may start a match. Empty means every position is
    /// offered.
    pub triggers: &'static [char],
    pub tokenize: TokenizeFn,
    pub render: Option<RenderFn>,
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("name", &self.name)
            .field("level", &self.level)
            .field("triggers", &self.triggers)
            .field("render", &self.render.is_some())
            .finish()
    }
}

impl Extension {
    pub const fn block(name: &'static str, tokenize: TokenizeFn) -> Self {
        Self {
            name,
            level: ExtensionLevel::Block,
            triggers: &[],
            tokenize,
            render: None,
        }
    }

    pub const fn inline(name: &'static str, tokenize: TokenizeFn) -> Self {
        Self {
            name,
            level: ExtensionLevel::Inline,
            triggers: &[],
            tokenize,
            render: None,
        }
    }

    pub const fn with_triggers(mut self, triggers: &'static [char]) -> Self {
        self.triggers = triggers;
        self
    }

    pub const fn with_renderer(mut self, render: RenderFn) -> Self {
        self.render = Some(render);
        self
    }

    fn wants(&self, level: ExtensionLevel, first: Option<char>) -> bool {
        if self.level != level {
            return false;
        }
        match first {
            Some(c) => self.triggers.is_empty() || self.triggers.contains(&c),
            None => false,
        }
    }
}

/// Ordered extension list, fixed for the lifetime of a parser.
#[derive(Debug, Clone, Default)]
pub struct ExtensionSet {
    extensions: Vec<Extension>,
}

impl ExtensionSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, extension: Extension) -> Self {
        self.extensions.push(extension);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Extension> {
        self.extensions.iter()
    }

    pub fn has_level(&self, level: ExtensionLevel) -> bool {
        self.extensions.iter().any(|ext| ext.level == level)
    }

    pub fn renderer_for(&self, name: &str) -> Option<RenderFn> {
        self.extensions
            .iter()
            .find(|ext| ext.name == name)
            .and_then(|ext| ext.render)
    }

    /// Offer `rest` to each extension of `level` in order. Errors, panics and
    /// malformed claims discard that extension's match at this position only.
    pub fn claim(&self, level: ExtensionLevel, rest: &str) -> Option<(CustomToken, bool)> {
        let first = rest.chars().next();
        for ext in self.extensions.iter().filter(|ext| ext.wants(level, first)) {
            let tokenize = ext.tokenize;
            let outcome = panic::catch_unwind(AssertUnwindSafe(|| tokenize(rest)));
            let claim = match outcome {
                Ok(Ok(Some(claim))) => claim,
                Ok(Ok(None)) => continue,
                Ok(Err(err)) => {
                    warn!(extension = ext.name, error = %err, "Extension tokenizer failed");
                    continue;
                }
                Err(_) => {
                    warn!(extension = ext.name, "Extension tokenizer panicked");
                    continue;
                }
            };

            if claim.len == 0 || claim.len > rest.len() || !rest.is_char_boundary(claim.len) {
                warn!(
                    extension = ext.name,
                    len = claim.len,
                    available = rest.len(),
                    "Extension claimed an invalid length"
                );
                continue;
            }

            let token = CustomToken {
                name: ext.name,
                level,
                raw: rest[..claim.len].to_string(),
                content: claim.content,
                info: claim.info,
            };
            return Some((token, claim.complete));
        }
        None
    }
}

fn line_len(text: &str) -> usize {
    text.find('\n').map(|pos| pos + 1).unwrap_or(text.len())
}

fn tokenize_inline_math(rest: &str) -> Result<Option<Claim>, ExtensionError> {
    let Some(body) = rest.strip_prefix('$') else {
        return Ok(None);
    };
    if body.starts_with('$') || body.starts_with(char::is_whitespace) {
        return Ok(None);
    }

    let mut escaped = false;
    for (idx, c) in body.char_indices() {
        match c {
            '\n' => return Ok(None),
            '\\' if !escaped => {
                escaped = true;
                continue;
            }
            '$' if !escaped => {
                let inner = &body[..idx];
                if inner.is_empty() || inner.ends_with(char::is_whitespace) {
                    return Ok(None);
                }
                return Ok(Some(Claim::new(idx + 2, inner)));
            }
            _ => {}
        }
        escaped = false;
    }
    Ok(None)
}

fn tokenize_block_math(rest: &str) -> Result<Option<Claim>, ExtensionError> {
    let first_len = line_len(rest);
    let first = rest[..first_len].trim();
    let Some(after_open) = first.strip_prefix("$$") else {
        return Ok(None);
    };

    // Single-line form: `$$ x $$`.
    if let Some(inner) = after_open.strip_suffix("$$") {
        if !inner.trim().is_empty() {
            return Ok(Some(Claim::new(first_len, inner.trim())));
        }
    }
    if !after_open.trim().is_empty() {
        return Ok(None);
    }

    let mut offset = first_len;
    while offset < rest.len() {
        let len = line_len(&rest[offset..]);
        let line = &rest[offset..offset + len];
        if line.trim() == "$$" {
            let content = rest[first_len..offset].trim_end_matches('\n');
            return Ok(Some(Claim::new(offset + len, content)));
        }
        offset += len;
    }

    let content = rest[first_len..].trim_end_matches('\n');
    Ok(Some(Claim::new(rest.len(), content).incomplete()))
}

fn tokenize_directive(rest: &str) -> Result<Option<Claim>, ExtensionError> {
    let first_len = line_len(rest);
    let first = rest[..first_len].trim_end();
    let Some(name) = first.strip_prefix(":::") else {
        return Ok(None);
    };
    let name = name.trim();
    if name.is_empty() || name.starts_with(':') {
        return Ok(None);
    }
    if name.contains(char::is_whitespace) {
        return Err(ExtensionError::new(format!(
            "directive name must be a single word: {name:?}"
        )));
    }

    let mut offset = first_len;
    while offset < rest.len() {
        let len = line_len(&rest[offset..]);
        if rest[offset..offset + len].trim() == ":::" {
            let content = rest[first_len..offset].trim_end_matches('\n');
            return Ok(Some(Claim::new(offset + len, content).with_info(name)));
        }
        offset += len;
    }

    let content = rest[first_len..].trim_end_matches('\n');
    Ok(Some(
        Claim::new(rest.len(), content).with_info(name).incomplete(),
    ))
}

/// `$…$` on a single line, not starting or ending with whitespace.
pub fn inline_math() -> Extension {
    Extension::inline("inline_math", tokenize_inline_math).with_triggers(&['$'])
}

/// `$$` … `$$` blocks, or `$$ … $$` on one line.
pub fn block_math() -> Extension {
    Extension::block("block_math", tokenize_block_math)
}

/// `:::name` … `:::` container blocks; the name is kept as the token's info.
pub fn directive() -> Extension {
    Extension::block("directive", tokenize_directive)
}

pub const BUILTIN_NAMES: &[&str] = &["inline_math", "block_math", "directive"];

/// Look up a built-in extension by the name its tokens carry.
pub fn builtin(name: &str) -> Option<Extension> {
    match name {
        "inline_math" => Some(inline_math()),
        "block_math" => Some(block_math()),
        "directive" => Some(directive()),
        _ => None,
    }
}
