//! Streamark turns a streaming chat completion into markdown that can be
//! rendered while it is still arriving.
//!
//! The crate is organized as a pipeline of small layers:
//! - [`stream`] accumulates transport chunks into a monotonic buffer and
//!   notifies observers with owned snapshots, gated on session liveness.
//! - [`markdown`] re-parses the whole buffer on every update, repairing
//!   unterminated trailing syntax and marking the affected tokens incomplete.
//!   Callers can register ordered block and inline extensions.
//! - [`render`] maps tokens to ratatui lines, with per-tag overrides.
//! - [`reveal`] plays a "typing" effect over finished text on a tokio timer.
//! - [`core`] holds the chat state: messages, the conversation container,
//!   the HTTP client and the parse pipeline, plus configuration.
//! - [`api`] defines the OpenAI-compatible wire payloads.
//!
//! The binary entrypoint (`src/main.rs`) routes through [`crate::cli::main`].

pub mod api;
pub mod cli;
pub mod core;
pub mod markdown;
pub mod render;
pub mod reveal;
pub mod stream;
pub mod utils;
