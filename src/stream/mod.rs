//! Streaming buffer accumulation.
//!
//! A [`ChunkSource`] produces raw payloads; [`StreamAccumulator`] decodes
//! them, appends to a monotonic [`StreamBuffer`] and hands observers owned
//! snapshots. Cancellation is authoritative on the accumulator side: after
//! an abort no late callback can mutate the buffer or notify anyone.

pub mod accumulator;
pub mod buffer;
pub mod decode;
pub mod error;
pub mod source;
pub mod sse;

pub use accumulator::{
    AbortHandle, SessionId, SessionState, SourceEvent, StreamAccumulator, StreamObserver,
    StreamUpdate,
};
pub use buffer::StreamBuffer;
pub use decode::{format_api_error, Decoded, PayloadDecoder};
pub use error::StreamError;
pub use source::{forward, pump, spawn_source, ChunkSource, ScriptedSource, SseChunkSource};
pub use sse::{SseDecoder, SseEvent};
