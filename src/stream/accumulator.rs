use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::stream::buffer::StreamBuffer;
use crate::stream::decode::{Decoded, PayloadDecoder};
use crate::stream::error::StreamError;

/// Identifies one streaming session. Events tagged with an older id are
/// stale and dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SessionId(pub u64);

/// Notification delivered to observers. Every variant carries an owned
/// snapshot of the buffer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamUpdate {
    Chunk { snapshot: Arc<str> },
    Done { snapshot: Arc<str> },
    Error { error: StreamError, snapshot: Arc<str> },
}

impl StreamUpdate {
    pub fn snapshot(&self) -> &Arc<str> {
        match self {
            StreamUpdate::Chunk { snapshot }
            | StreamUpdate::Done { snapshot }
            | StreamUpdate::Error { snapshot, .. } => snapshot,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, StreamUpdate::Chunk { .. })
    }
}

/// Raw event produced by a transport, before payload decoding.
#[derive(Debug, Clone, PartialEq)]
pub enum SourceEvent {
    Chunk(String),
    Done,
    Error(StreamError),
}

pub trait StreamObserver: Send {
    fn notify(&mut self, session: SessionId, update: &StreamUpdate);
}

impl StreamObserver for mpsc::UnboundedSender<(StreamUpdate, SessionId)> {
    fn notify(&mut self, session: SessionId, update: &StreamUpdate) {
        let _ = self.send((update.clone(), session));
    }
}

impl<F> StreamObserver for F
where
    F: FnMut(SessionId, &StreamUpdate) + Send,
{
    fn notify(&mut self, session: SessionId, update: &StreamUpdate) {
        self(session, update)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Streaming,
    Done,
    Failed,
    Aborted,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        self != SessionState::Streaming
    }
}

/// Cancels a session from outside the task that owns the accumulator.
#[derive(Debug, Clone)]
pub struct AbortHandle {
    session: SessionId,
    token: CancellationToken,
}

impl AbortHandle {
    pub fn abort(&self) {
        if !self.token.is_cancelled() {
            debug!(session = self.session.0, "Stream aborted");
        }
        self.token.cancel();
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn is_aborted(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Turns transport chunks into a monotonic text buffer and notifies
/// observers.
///
/// Every entry point checks the liveness token first: once [`abort`] has been
/// called, late callbacks from the transport neither touch the buffer nor
/// reach an observer.
///
/// [`abort`]: StreamAccumulator::abort
pub struct StreamAccumulator {
    session: SessionId,
    buffer: StreamBuffer,
    state: SessionState,
    liveness: CancellationToken,
    decoder: PayloadDecoder,
    observers: Vec<Box<dyn StreamObserver>>,
}

impl StreamAccumulator {
    pub fn new(decoder: PayloadDecoder) -> Self {
        Self {
            session: SessionId(1),
            buffer: StreamBuffer::new(),
            state: SessionState::Streaming,
            liveness: CancellationToken::new(),
            decoder,
            observers: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, observer: impl StreamObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    pub fn session(&self) -> SessionId {
        self.session
    }

    pub fn state(&self) -> SessionState {
        if self.state == SessionState::Streaming && self.liveness.is_cancelled() {
            return SessionState::Aborted;
        }
        self.state
    }

    pub fn buffer(&self) -> &str {
        self.buffer.as_str()
    }

    pub fn abort_handle(&self) -> AbortHandle {
        AbortHandle {
            session: self.session,
            token: self.liveness.clone(),
        }
    }

    /// Token observed by transports so they can stop reading early.
    pub fn liveness(&self) -> CancellationToken {
        self.liveness.clone()
    }

    /// Start a new session: fresh id, empty buffer, new liveness token. Any
    /// handle to the previous session keeps pointing at the old token.
    pub fn reset(&mut self) -> SessionId {
        self.liveness.cancel();
        self.session = SessionId(self.session.0 + 1);
        self.buffer.reset();
        self.state = SessionState::Streaming;
        self.liveness = CancellationToken::new();
        self.session
    }

    fn is_live(&self) -> bool {
        self.state == SessionState::Streaming && !self.liveness.is_cancelled()
    }

    /// Decode one raw chunk and append its text. Returns the state after the
    /// chunk, which is terminal when the payload ended the stream.
    pub fn on_chunk(&mut self, raw: &str) -> SessionState {
        if !self.is_live() {
            debug!(
                session = self.session.0,
                len = raw.len(),
                "Dropping chunk for inactive session"
            );
            return self.state();
        }

        match self.decoder.decode(raw) {
            Decoded::Text(text) => {
                self.buffer.push_str(&text);
                let update = StreamUpdate::Chunk {
                    snapshot: self.buffer.snapshot(),
                };
                self.broadcast(&update);
            }
            Decoded::Skip => {}
            Decoded::Done => self.on_done(),
            Decoded::Error(message) => self.on_error(StreamError::Api(message)),
        }
        self.state()
    }

    pub fn on_done(&mut self) {
        if !self.is_live() {
            return;
        }
        self.state = SessionState::Done;
        debug!(
            session = self.session.0,
            len = self.buffer.len(),
            "Stream completed"
        );
        let update = StreamUpdate::Done {
            snapshot: self.buffer.snapshot(),
        };
        self.broadcast(&update);
    }

    pub fn on_error(&mut self, error: StreamError) {
        if !self.is_live() {
            return;
        }
        self.state = SessionState::Failed;
        debug!(session = self.session.0, error = %error, "Stream failed");
        let update = StreamUpdate::Error {
            error,
            snapshot: self.buffer.snapshot(),
        };
        self.broadcast(&update);
    }

    pub fn abort(&mut self) {
        self.abort_handle().abort();
    }

    /// Apply an event that travelled through a channel. Events from another
    /// session are ignored.
    pub fn handle_event(&mut self, session: SessionId, event: SourceEvent) -> SessionState {
        if session != self.session {
            debug!(
                current = self.session.0,
                stale = session.0,
                "Ignoring event from stale session"
            );
            return self.state();
        }
        match event {
            SourceEvent::Chunk(raw) => return self.on_chunk(&raw),
            SourceEvent::Done => self.on_done(),
            SourceEvent::Error(error) => self.on_error(error),
        }
        self.state()
    }

    fn broadcast(&mut self, update: &StreamUpdate) {
        let session = self.session;
        for observer in &mut self.observers {
            observer.notify(session, update);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    type Log = Arc<Mutex<Vec<StreamUpdate>>>;

    fn recording(decoder: PayloadDecoder) -> (StreamAccumulator, Log) {
        let log: Log = Arc::new(Mutex::new(Vec::new()));
        let mut accumulator = StreamAccumulator::new(decoder);
        let sink = Arc::clone(&log);
        accumulator.subscribe(move |_session: SessionId, update: &StreamUpdate| {
            sink.lock().unwrap().push(update.clone());
        });
        (accumulator, log)
    }

    fn texts(log: &Log) -> Vec<(bool, String)> {
        log.lock()
            .unwrap()
            .iter()
            .map(|update| (update.is_terminal(), update.snapshot().to_string()))
            .collect()
    }

    #[test]
    fn chunks_accumulate_in_order_then_done_fires_once() {
        let (mut acc, log) = recording(PayloadDecoder::Text);
        for chunk in ["Hel", "lo, ", "world"] {
            acc.on_chunk(chunk);
        }
        acc.on_done();
        acc.on_done();

        assert_eq!(acc.buffer(), "Hello, world");
        assert_eq!(
            texts(&log),
            vec![
                (false, "Hel".to_string()),
                (false, "Hello, ".to_string()),
                (false, "Hello, world".to_string()),
                (true, "Hello, world".to_string()),
            ]
        );
        assert_eq!(acc.state(), SessionState::Done);
    }

    #[test]
    fn chunk_after_abort_is_not_observed() {
        let (mut acc, log) = recording(PayloadDecoder::Text);
        acc.on_chunk("first");
        let handle = acc.abort_handle();
        handle.abort();
        acc.on_chunk(" second");
        acc.on_done();

        assert_eq!(acc.buffer(), "first");
        assert_eq!(texts(&log), vec![(false, "first".to_string())]);
        assert_eq!(acc.state(), SessionState::Aborted);
    }

    #[test]
    fn error_preserves_buffer_and_stops_processing() {
        let (mut acc, log) = recording(PayloadDecoder::Text);
        acc.on_chunk("partial");
        acc.on_error(StreamError::Transport("connection reset".into()));
        acc.on_chunk(" ignored");

        assert_eq!(acc.buffer(), "partial");
        let updates = log.lock().unwrap().clone();
        assert_eq!(updates.len(), 2);
        match &updates[1] {
            StreamUpdate::Error { error, snapshot } => {
                assert_eq!(error, &StreamError::Transport("connection reset".into()));
                assert_eq!(&**snapshot, "partial");
            }
            other => panic!("expected error update, got {other:?}"),
        }
        assert_eq!(acc.state(), SessionState::Failed);
    }

    #[test]
    fn chat_delta_payloads_decode_and_finish_on_done_sentinel() {
        let (mut acc, log) = recording(PayloadDecoder::ChatDelta);
        acc.on_chunk(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#);
        acc.on_chunk(r#"{"choices":[{"delta":{"content":"Hi"}}]}"#);
        let state = acc.on_chunk("[DONE]");

        assert_eq!(state, SessionState::Done);
        assert_eq!(
            texts(&log),
            vec![(false, "Hi".to_string()), (true, "Hi".to_string())]
        );
    }

    #[test]
    fn chat_delta_error_body_fails_session() {
        let (mut acc, _log) = recording(PayloadDecoder::ChatDelta);
        let state = acc.on_chunk(r#"{"error":{"message":"quota"}}"#);
        assert_eq!(state, SessionState::Failed);
    }

    #[test]
    fn reset_starts_fresh_session_and_drops_stale_events() {
        let (mut acc, log) = recording(PayloadDecoder::Text);
        let old = acc.session();
        let old_handle = acc.abort_handle();
        acc.on_chunk("old");

        let new = acc.reset();
        assert_ne!(old, new);
        assert!(acc.buffer().is_empty());
        assert!(old_handle.is_aborted());

        acc.handle_event(old, SourceEvent::Chunk("stale".into()));
        acc.handle_event(new, SourceEvent::Chunk("fresh".into()));
        old_handle.abort();
        acc.handle_event(new, SourceEvent::Done);

        assert_eq!(acc.buffer(), "fresh");
        assert_eq!(acc.state(), SessionState::Done);
        let last = log.lock().unwrap().last().cloned().unwrap();
        assert_eq!(
            last,
            StreamUpdate::Done {
                snapshot: Arc::from("fresh")
            }
        );
    }

    #[test]
    fn channel_observer_receives_tagged_updates() {
        let (tx, mut rx) = mpsc::unbounded_channel::<(StreamUpdate, SessionId)>();
        let mut acc = StreamAccumulator::new(PayloadDecoder::Text);
        acc.subscribe(tx);
        acc.on_chunk("x");

        let (update, session) = rx.try_recv().expect("update");
        assert_eq!(session, acc.session());
        assert_eq!(&**update.snapshot(), "x");
    }
}
