//! Glue between a source task and the local accumulator.

use tokio::sync::mpsc::UnboundedReceiver;
use tracing::debug;

use crate::stream::{
    SessionId, SessionState, SourceEvent, StreamAccumulator, StreamError, StreamUpdate,
};

/// Apply source events to `accumulator` until its session ends, handing every
/// resulting update to `on_update` in order.
///
/// `updates` must be the receiving end of a channel subscribed to
/// `accumulator`. If the event channel closes before a terminal event, the
/// session is failed with a transport error.
pub async fn follow<F>(
    accumulator: &mut StreamAccumulator,
    events: &mut UnboundedReceiver<(SourceEvent, SessionId)>,
    updates: &mut UnboundedReceiver<(StreamUpdate, SessionId)>,
    mut on_update: F,
) -> SessionState
where
    F: FnMut(SessionId, &StreamUpdate),
{
    loop {
        let state = match events.recv().await {
            Some((event, session)) => accumulator.handle_event(session, event),
            None => {
                debug!(session = accumulator.session().0, "Source closed early");
                accumulator.on_error(StreamError::Transport(
                    "stream ended without completing".to_string(),
                ));
                accumulator.state()
            }
        };
        while let Ok((update, session)) = updates.try_recv() {
            on_update(session, &update);
        }
        if state.is_terminal() {
            return state;
        }
    }
}
