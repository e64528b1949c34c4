use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::stream::BoxStream;
use futures_util::{Stream, StreamExt};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::stream::accumulator::{SessionId, SessionState, SourceEvent, StreamAccumulator};
use crate::stream::decode::format_api_error;
use crate::stream::error::StreamError;
use crate::stream::sse::SseDecoder;

/// Anything that produces discrete payloads over time and ends in done
/// (`None`) or an error.
#[async_trait]
pub trait ChunkSource: Send {
    async fn next_chunk(&mut self) -> Option<Result<String, StreamError>>;

    /// Stop producing. Advisory for the transport: the accumulator gates
    /// notifications on its own liveness token regardless.
    fn abort(&mut self);
}

#[derive(Debug, Clone)]
pub enum Scripted {
    Chunk(String),
    Fail(StreamError),
}

/// In-memory source replaying a fixed script, optionally with a delay before
/// each item.
#[derive(Debug, Default)]
pub struct ScriptedSource {
    items: VecDeque<Scripted>,
    delay: Option<Duration>,
    aborted: bool,
}

impl ScriptedSource {
    pub fn new<I, S>(chunks: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            items: chunks
                .into_iter()
                .map(|chunk| Scripted::Chunk(chunk.into()))
                .collect(),
            delay: None,
            aborted: false,
        }
    }

    /// Split `text` into pieces of at most `chunk_chars` characters.
    pub fn from_text(text: &str, chunk_chars: usize) -> Self {
        let chunk_chars = chunk_chars.max(1);
        let chars: Vec<char> = text.chars().collect();
        Self::new(
            chars
                .chunks(chunk_chars)
                .map(|piece| piece.iter().collect::<String>()),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn then_fail(mut self, error: StreamError) -> Self {
        self.items.push_back(Scripted::Fail(error));
        self
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted
    }
}

#[async_trait]
impl ChunkSource for ScriptedSource {
    async fn next_chunk(&mut self) -> Option<Result<String, StreamError>> {
        if self.aborted {
            return None;
        }
        let item = self.items.pop_front()?;
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        Some(match item {
            Scripted::Chunk(text) => Ok(text),
            Scripted::Fail(error) => Err(error),
        })
    }

    fn abort(&mut self) {
        self.aborted = true;
        self.items.clear();
    }
}

/// Server-sent events over any byte stream, yielding each event's `data`.
pub struct SseChunkSource {
    body: BoxStream<'static, Result<Vec<u8>, String>>,
    decoder: SseDecoder,
    ready: VecDeque<Result<String, StreamError>>,
    finished: bool,
    aborted: bool,
}

impl SseChunkSource {
    pub fn new<S, B, E>(body: S) -> Self
    where
        S: Stream<Item = Result<B, E>> + Send + 'static,
        B: AsRef<[u8]>,
        E: std::fmt::Display,
    {
        let body = body
            .map(|item| item.map(|bytes| bytes.as_ref().to_vec()).map_err(|e| e.to_string()))
            .boxed();
        Self {
            body,
            decoder: SseDecoder::new(),
            ready: VecDeque::new(),
            finished: false,
            aborted: false,
        }
    }

    fn queue_events(&mut self, events: Vec<crate::stream::sse::SseEvent>) {
        for event in events {
            if event.is_error() {
                self.ready
                    .push_back(Err(StreamError::Api(format_api_error(&event.data))));
            } else {
                self.ready.push_back(Ok(event.data));
            }
        }
    }
}

#[async_trait]
impl ChunkSource for SseChunkSource {
    async fn next_chunk(&mut self) -> Option<Result<String, StreamError>> {
        loop {
            if self.aborted {
                return None;
            }
            if let Some(item) = self.ready.pop_front() {
                return Some(item);
            }
            if self.finished {
                return None;
            }
            match self.body.next().await {
                Some(Ok(bytes)) => {
                    let events = self.decoder.push(&bytes);
                    self.queue_events(events);
                }
                Some(Err(err)) => {
                    self.finished = true;
                    return Some(Err(StreamError::Transport(err)));
                }
                None => {
                    self.finished = true;
                    let tail = self.decoder.finish().into_iter().collect();
                    self.queue_events(tail);
                }
            }
        }
    }

    fn abort(&mut self) {
        self.aborted = true;
        self.ready.clear();
    }
}

/// Drive `source` into `accumulator` until the session ends or is aborted.
pub async fn pump<S>(source: &mut S, accumulator: &mut StreamAccumulator) -> SessionState
where
    S: ChunkSource + ?Sized,
{
    let liveness = accumulator.liveness();
    loop {
        let next = tokio::select! {
            biased;
            _ = liveness.cancelled() => {
                source.abort();
                return accumulator.state();
            }
            next = source.next_chunk() => next,
        };

        let state = match next {
            Some(Ok(raw)) => accumulator.on_chunk(&raw),
            Some(Err(error)) => {
                accumulator.on_error(error);
                accumulator.state()
            }
            None => {
                accumulator.on_done();
                accumulator.state()
            }
        };

        if state.is_terminal() {
            if state == SessionState::Aborted {
                source.abort();
            }
            return state;
        }
    }
}

/// Run `source` on its own task, forwarding raw events tagged with `session`.
/// The receiving side applies them with
/// [`StreamAccumulator::handle_event`], which drops stale sessions.
pub fn spawn_source<S>(
    mut source: S,
    session: SessionId,
    cancel: CancellationToken,
    tx: mpsc::UnboundedSender<(SourceEvent, SessionId)>,
) -> tokio::task::JoinHandle<()>
where
    S: ChunkSource + 'static,
{
    tokio::spawn(async move { forward(&mut source, session, &cancel, &tx).await })
}

/// Forward every event of `source` into `tx` until it ends, the receiver
/// goes away or `cancel` fires.
pub async fn forward<S>(
    source: &mut S,
    session: SessionId,
    cancel: &CancellationToken,
    tx: &mpsc::UnboundedSender<(SourceEvent, SessionId)>,
) where
    S: ChunkSource + ?Sized,
{
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                source.abort();
                debug!(session = session.0, "Source task cancelled");
                return;
            }
            next = source.next_chunk() => next,
        };
        let (event, last) = match next {
            Some(Ok(raw)) => (SourceEvent::Chunk(raw), false),
            Some(Err(error)) => (SourceEvent::Error(error), true),
            None => (SourceEvent::Done, true),
        };
        if tx.send((event, session)).is_err() || last {
            return;
        }
    }
}
