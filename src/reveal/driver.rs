use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::reveal::cursor::{RevealCursor, RevealFrame};
use crate::reveal::RevealConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RevealOutcome {
    Completed,
    Cancelled,
}

/// Emit frames from `cursor` one per `interval` until it completes or
/// `cancel` fires. No frame is emitted once `cancel` has been observed.
pub async fn drive<F>(
    mut cursor: RevealCursor,
    interval: Duration,
    cancel: &CancellationToken,
    mut on_frame: F,
) -> RevealOutcome
where
    F: FnMut(&RevealFrame),
{
    if cursor.total() == 0 {
        if let Some(frame) = cursor.advance() {
            on_frame(&frame);
        }
        return RevealOutcome::Completed;
    }

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return RevealOutcome::Cancelled,
            _ = tokio::time::sleep(interval) => {}
        }
        if cancel.is_cancelled() {
            return RevealOutcome::Cancelled;
        }
        match cursor.advance() {
            Some(frame) => {
                on_frame(&frame);
                if frame.done {
                    return RevealOutcome::Completed;
                }
            }
            None => return RevealOutcome::Completed,
        }
    }
}

/// Reveal `content` with `config`.
pub async fn reveal<F>(
    content: &str,
    config: &RevealConfig,
    cancel: &CancellationToken,
    on_frame: F,
) -> RevealOutcome
where
    F: FnMut(&RevealFrame),
{
    drive(
        RevealCursor::new(content, config.step),
        config.interval,
        cancel,
        on_frame,
    )
    .await
}

struct RevealTask {
    content: String,
    cancel: CancellationToken,
    shown_bytes: Arc<AtomicUsize>,
}

/// Owns the reveal of one display element.
///
/// Frames go out over a channel tagged with a generation number; each call
/// to [`Typewriter::set_content`] that changes the content starts a new
/// generation and cancels the previous task. Dropping the typewriter cancels
/// whatever is running.
pub struct Typewriter {
    config: RevealConfig,
    tx: mpsc::UnboundedSender<(RevealFrame, u64)>,
    generation: u64,
    current: Option<RevealTask>,
}

impl Typewriter {
    pub fn new(config: RevealConfig) -> (Self, mpsc::UnboundedReceiver<(RevealFrame, u64)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                config,
                tx,
                generation: 0,
                current: None,
            },
            rx,
        )
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    /// Start revealing `content`. Content that extends what is already being
    /// revealed picks up where the previous task stopped.
    pub fn set_content(&mut self, content: impl Into<String>) -> u64 {
        let content = content.into();
        let mut start = 0;
        if let Some(task) = self.current.take() {
            if task.content == content && !task.cancel.is_cancelled() {
                self.current = Some(task);
                return self.generation;
            }
            task.cancel.cancel();
            if content.starts_with(task.content.as_str()) {
                start = task.shown_bytes.load(Ordering::Acquire);
            }
        }

        self.generation += 1;
        let generation = self.generation;
        let cancel = CancellationToken::new();
        let shown_bytes = Arc::new(AtomicUsize::new(start));
        let cursor = RevealCursor::starting_at(content.clone(), self.config.step, start);
        debug!(
            generation,
            start = cursor.position(),
            total = cursor.total(),
            "Starting reveal"
        );

        let tx = self.tx.clone();
        let interval = self.config.interval;
        let task_cancel = cancel.clone();
        let progress = Arc::clone(&shown_bytes);
        tokio::spawn(async move {
            drive(cursor, interval, &task_cancel, |frame| {
                progress.store(frame.text.len(), Ordering::Release);
                let _ = tx.send((frame.clone(), generation));
            })
            .await;
        });

        self.current = Some(RevealTask {
            content,
            cancel,
            shown_bytes,
        });
        generation
    }

    pub fn stop(&mut self) {
        if let Some(task) = self.current.take() {
            task.cancel.cancel();
        }
    }
}

impl Drop for Typewriter {
    fn drop(&mut self) {
        self.stop();
    }
}
