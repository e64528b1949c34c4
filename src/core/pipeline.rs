use tracing::trace;

use crate::markdown::{Parser, Token};
use crate::stream::{SessionId, StreamUpdate};

/// Re-parses the stream buffer on every update and keeps the latest tokens.
///
/// While a session streams, the tolerant [`Parser::parse`] is used; the
/// terminal update is parsed with [`Parser::parse_final`].
#[derive(Debug, Clone)]
pub struct StreamingPipeline {
    parser: Parser,
    session: Option<SessionId>,
    tokens: Vec<Token>,
    finished: bool,
}

impl StreamingPipeline {
    pub fn new(parser: Parser) -> Self {
        Self {
            parser,
            session: None,
            tokens: Vec::new(),
            finished: false,
        }
    }

    pub fn parser(&self) -> &Parser {
        &self.parser
    }

    pub fn tokens(&self) -> &[Token] {
        &self.tokens
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn session(&self) -> Option<SessionId> {
        self.session
    }

    /// Number of tokens, at any depth, still waiting for closing syntax.
    pub fn incomplete_count(&self) -> usize {
        self.tokens.iter().map(Token::count_incomplete).sum()
    }

    /// Apply an update. A newer session replaces the current one; updates
    /// from older sessions, or after the current one finished, are ignored.
    pub fn apply(&mut self, session: SessionId, update: &StreamUpdate) -> bool {
        match self.session {
            Some(current) if session < current => return false,
            Some(current) if session == current && self.finished => return false,
            Some(current) if session == current => {}
            _ => {
                self.session = Some(session);
                self.finished = false;
                self.tokens.clear();
            }
        }

        let snapshot = update.snapshot();
        self.tokens = if update.is_terminal() {
            self.finished = true;
            self.parser.parse_final(snapshot)
        } else {
            self.parser.parse(snapshot)
        };
        trace!(
            session = session.0,
            len = snapshot.len(),
            tokens = self.tokens.len(),
            finished = self.finished,
            "Re-parsed stream buffer"
        );
        true
    }

    pub fn reset(&mut self) {
        self.session = None;
        self.tokens.clear();
        self.finished = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::{block_math, find_tag, ExtensionSet, TokenKind, TokenTag};
    use crate::stream::{PayloadDecoder, StreamAccumulator};
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn chunk(text: &str) -> StreamUpdate {
        StreamUpdate::Chunk {
            snapshot: Arc::from(text),
        }
    }

    #[test]
    fn streaming_then_final_parse() {
        let mut pipeline = StreamingPipeline::new(Parser::new());
        let session = SessionId(1);

        assert!(pipeline.apply(session, &chunk("**bo")));
        assert_eq!(pipeline.incomplete_count(), 2);
        assert!(!pipeline.is_finished());

        let done = StreamUpdate::Done {
            snapshot: Arc::from("**bold**"),
        };
        assert!(pipeline.apply(session, &done));
        assert!(pipeline.is_finished());
        assert_eq!(pipeline.incomplete_count(), 0);
        assert_eq!(pipeline.tokens()[0].children[0].tag(), TokenTag::Strong);

        assert!(!pipeline.apply(session, &chunk("late")));
    }

    #[test]
    fn older_sessions_are_ignored_and_newer_ones_replace() {
        let mut pipeline = StreamingPipeline::new(Parser::new());
        pipeline.apply(SessionId(2), &chunk("current"));
        assert!(!pipeline.apply(SessionId(1), &chunk("stale")));
        assert_eq!(pipeline.tokens()[0].plain_text(), "current");

        assert!(pipeline.apply(SessionId(3), &chunk("next")));
        assert_eq!(pipeline.session(), Some(SessionId(3)));
        assert_eq!(pipeline.tokens()[0].plain_text(), "next");
    }

    #[test]
    fn failed_stream_is_parsed_as_final() {
        let mut pipeline = StreamingPipeline::new(Parser::new());
        let update = StreamUpdate::Error {
            error: crate::stream::StreamError::Transport("reset".into()),
            snapshot: Arc::from("`unclosed"),
        };
        pipeline.apply(SessionId(1), &update);
        assert_eq!(pipeline.incomplete_count(), 0);
        assert_eq!(
            pipeline.tokens()[0].children[0].kind,
            TokenKind::Text {
                text: "`unclosed".into()
            }
        );
    }

    #[test]
    fn unclosed_math_block_settles_to_markdown_when_done() {
        let parser = Parser::with_extensions(ExtensionSet::new().with(block_math()));
        let mut pipeline = StreamingPipeline::new(parser);
        let text = "intro\n\n$$\nx\n**b**";

        pipeline.apply(SessionId(1), &chunk(text));
        assert!(pipeline.incomplete_count() > 0);

        let done = StreamUpdate::Done {
            snapshot: Arc::from(text),
        };
        pipeline.apply(SessionId(1), &done);
        assert_eq!(pipeline.incomplete_count(), 0);
        assert!(find_tag(pipeline.tokens(), TokenTag::Strong).is_some());
        assert!(find_tag(pipeline.tokens(), TokenTag::Custom).is_none());
    }

    #[tokio::test]
    async fn accumulator_updates_flow_through_channel() {
        let (tx, mut rx) = mpsc::unbounded_channel::<(StreamUpdate, SessionId)>();
        let mut acc = StreamAccumulator::new(PayloadDecoder::Text);
        acc.subscribe(tx);
        for part in ["# Ti", "tle\n\nsome `co", "de`"] {
            acc.on_chunk(part);
        }
        acc.on_done();
        drop(acc);

        let mut pipeline = StreamingPipeline::new(Parser::new());
        let mut incomplete_seen = Vec::new();
        while let Some((update, session)) = rx.recv().await {
            pipeline.apply(session, &update);
            incomplete_seen.push(pipeline.incomplete_count());
        }
        assert_eq!(incomplete_seen.first().copied(), Some(0));
        assert!(incomplete_seen[1] > 0);
        assert_eq!(incomplete_seen.last().copied(), Some(0));
        assert!(pipeline.is_finished());
        assert_eq!(pipeline.tokens().len(), 2);
    }
}
