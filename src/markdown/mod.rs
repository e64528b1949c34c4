//! Tolerant markdown tokenizing for buffers that are still growing.
//!
//! [`Parser::parse`] re-parses the whole buffer on every call; nothing is
//! patched incrementally. Trailing syntax that has not been closed yet is
//! closed for the tokenizer and the affected tokens come back with
//! `complete == false`. Nothing in here returns an error: unrecognized input
//! degrades to text.

pub mod extension;
mod fence;
mod parser;
mod repair;
pub mod token;

#[cfg(test)]
mod tests;

pub use extension::{
    block_math, builtin, directive, inline_math, Claim, CustomToken, Extension, ExtensionError,
    ExtensionLevel, ExtensionSet, RenderFn, TokenizeFn,
};
pub use parser::Parser;
pub use token::{find_tag, Align, Token, TokenKind, TokenTag};
