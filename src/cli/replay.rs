use std::error::Error;
use std::path::Path;
use std::time::Duration;

use tokio::sync::mpsc;

use crate::cli::read_input;
use crate::cli::render::render_document;
use crate::cli::session::follow;
use crate::core::config::Config;
use crate::core::pipeline::StreamingPipeline;
use crate::markdown::Parser;
use crate::stream::{
    spawn_source, PayloadDecoder, ScriptedSource, SessionId, SessionState, StreamAccumulator,
    StreamUpdate,
};

/// What the pipeline looked like after one update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayStep {
    pub buffer_len: usize,
    pub blocks: usize,
    pub incomplete: usize,
}

pub struct ReplayReport {
    pub steps: Vec<ReplayStep>,
    pub state: SessionState,
    pub pipeline: StreamingPipeline,
}

/// Stream `text` through a scripted source in `chunk_size` character pieces,
/// re-parsing after each one.
pub async fn replay(
    config: &Config,
    text: &str,
    chunk_size: usize,
    delay: Option<Duration>,
) -> ReplayReport {
    let mut source = ScriptedSource::from_text(text, chunk_size);
    if let Some(delay) = delay {
        source = source.with_delay(delay);
    }

    let mut accumulator = StreamAccumulator::new(PayloadDecoder::Text);
    let (update_tx, mut updates) = mpsc::unbounded_channel::<(StreamUpdate, SessionId)>();
    accumulator.subscribe(update_tx);

    let (event_tx, mut events) = mpsc::unbounded_channel();
    let task = spawn_source(source, accumulator.session(), accumulator.liveness(), event_tx);

    let mut pipeline = StreamingPipeline::new(Parser::with_extensions(config.extension_set()));
    let mut steps = Vec::new();
    let state = follow(&mut accumulator, &mut events, &mut updates, |session, update| {
        pipeline.apply(session, update);
        steps.push(ReplayStep {
            buffer_len: update.snapshot().len(),
            blocks: pipeline.tokens().len(),
            incomplete: pipeline.incomplete_count(),
        });
    })
    .await;
    let _ = task.await;

    ReplayReport {
        steps,
        state,
        pipeline,
    }
}

pub async fn run_replay(
    config: &Config,
    file: Option<&Path>,
    chunk_size: usize,
    delay_ms: u64,
) -> Result<(), Box<dyn Error>> {
    let text = read_input(file)?;
    let delay = (delay_ms > 0).then(|| Duration::from_millis(delay_ms));
    let report = replay(config, &text, chunk_size, delay).await;

    for (index, step) in report.steps.iter().enumerate() {
        println!(
            "step {:>3}: {:>5} bytes, {} blocks, {} incomplete",
            index + 1,
            step.buffer_len,
            step.blocks,
            step.incomplete
        );
    }
    println!("final state: {:?}", report.state);
    println!();
    for line in render_document(config, report.pipeline.tokens()) {
        println!("{line}");
    }
    Ok(())
}
