//! One-shot streaming chat

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::cli::session::follow;
use crate::core::chat_stream::{ChatClient, ChatStreamService};
use crate::core::config::Config;
use crate::core::conversation::Conversation;
use crate::core::message::MessageStatus;
use crate::core::pipeline::StreamingPipeline;
use crate::markdown::Parser;
use crate::render::{line_text, RenderTheme, Renderer};
use crate::stream::{PayloadDecoder, SessionId, SessionState, StreamAccumulator, StreamUpdate};
use crate::utils::logging::TranscriptLog;

pub struct ChatOptions {
    pub prompt: String,
    pub system: Option<String>,
    /// Skip the final markdown render even when markdown is enabled.
    pub raw: bool,
    pub log: Option<PathBuf>,
}

pub async fn run_chat(config: &Config, options: ChatOptions) -> Result<(), Box<dyn Error>> {
    if options.prompt.trim().is_empty() {
        return Err("Usage: streamark chat <prompt>".into());
    }

    let client = ChatClient::from_config(config)?;
    let log = match &options.log {
        Some(path) => TranscriptLog::open(path)?,
        None => TranscriptLog::disabled(),
    };

    let mut conversation =
        Conversation::new().with_fallback_message(config.fallback_message.clone());
    if let Some(system) = options.system {
        conversation = conversation.with_system_prompt(system);
    }
    let reply_id = conversation.submit(options.prompt);
    if let Some(user) = conversation.messages().front() {
        log.log_message(user)?;
    }

    let markdown = config.markdown_enabled() && !options.raw;
    let extensions = config.extension_set();
    let mut pipeline = StreamingPipeline::new(Parser::with_extensions(extensions.clone()));

    let mut accumulator = StreamAccumulator::new(PayloadDecoder::ChatDelta);
    let (update_tx, mut updates) = mpsc::unbounded_channel::<(StreamUpdate, SessionId)>();
    accumulator.subscribe(update_tx);

    let (service, mut events) = ChatStreamService::new();
    let task = service.spawn_stream(
        client,
        conversation.api_messages(),
        accumulator.session(),
        accumulator.liveness(),
    );
    drop(service);

    let mut printed = 0;
    let mut failure = None;
    let mut stdout = io::stdout();
    let state = follow(&mut accumulator, &mut events, &mut updates, |session, update| {
        conversation.apply(reply_id, update);
        pipeline.apply(session, update);

        let snapshot = update.snapshot();
        if snapshot.len() > printed {
            let _ = write!(stdout, "{}", &snapshot[printed..]);
            let _ = stdout.flush();
            printed = snapshot.len();
        }
        if let StreamUpdate::Error { error, .. } = update {
            failure = Some(error.clone());
        }
    })
    .await;
    task.await?;
    if printed > 0 {
        println!();
    }

    if let Some(reply) = conversation.get(reply_id) {
        log.log_message(reply)?;
    }

    match state {
        SessionState::Done if markdown => {
            let renderer = Renderer::new()
                .with_theme(RenderTheme::plain())
                .with_extensions(extensions);
            println!();
            for line in renderer.render(pipeline.tokens()) {
                println!("{}", line_text(&line));
            }
            Ok(())
        }
        SessionState::Done => Ok(()),
        _ => {
            if let Some(reply) = conversation.get(reply_id) {
                if printed == 0
                    && reply.status == MessageStatus::Error
                    && !reply.content.is_empty()
                {
                    println!("{}", reply.content);
                }
            }
            match failure {
                Some(error) => Err(error.into()),
                None => Err("stream aborted".into()),
            }
        }
    }
}
