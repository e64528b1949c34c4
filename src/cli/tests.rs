use super::*;
use crate::cli::replay::replay;
use crate::cli::session::follow;
use crate::markdown::TokenTag;
use crate::stream::{
    spawn_source, PayloadDecoder, ScriptedSource, SessionId, SessionState, StreamAccumulator,
    StreamError, StreamUpdate,
};
use std::time::Duration;
use tokio::sync::mpsc;

#[test]
fn parses_chat_prompt_and_global_flags() {
    let args = Args::try_parse_from([
        "streamark", "chat", "-m", "tiny", "--log", "t.log", "what", "is", "rust",
    ])
    .unwrap();
    assert_eq!(args.model.as_deref(), Some("tiny"));
    assert_eq!(args.log, Some(PathBuf::from("t.log")));
    match args.command {
        Commands::Chat { prompt, raw, .. } => {
            assert_eq!(prompt.join(" "), "what is rust");
            assert!(!raw);
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn parses_config_set_with_multi_word_value() {
    let args = Args::try_parse_from([
        "streamark",
        "config",
        "set",
        "fallback_message",
        "Sorry,",
        "try",
        "again",
    ])
    .unwrap();
    match args.command {
        Commands::Config {
            action: Some(ConfigAction::Set { key, value }),
        } => {
            assert_eq!(key, "fallback_message");
            assert_eq!(value.join(" "), "Sorry, try again");
        }
        other => panic!("unexpected command: {other:?}"),
    }
}

#[test]
fn replay_defaults_and_required_arguments() {
    let args = Args::try_parse_from(["streamark", "replay"]).unwrap();
    match args.command {
        Commands::Replay {
            file,
            chunk_size,
            delay_ms,
        } => {
            assert!(file.is_none());
            assert_eq!(chunk_size, 8);
            assert_eq!(delay_ms, 0);
        }
        other => panic!("unexpected command: {other:?}"),
    }

    assert!(Args::try_parse_from(["streamark", "chat"]).is_err());
    assert!(Args::try_parse_from(["streamark"]).is_err());
}

#[tokio::test]
async fn follow_delivers_updates_in_order() {
    let mut accumulator = StreamAccumulator::new(PayloadDecoder::Text);
    let (update_tx, mut updates) = mpsc::unbounded_channel::<(StreamUpdate, SessionId)>();
    accumulator.subscribe(update_tx);
    let (event_tx, mut events) = mpsc::unbounded_channel();
    let task = spawn_source(
        ScriptedSource::new(["Hel", "lo, ", "world"]),
        accumulator.session(),
        accumulator.liveness(),
        event_tx,
    );

    let mut seen = Vec::new();
    let state = follow(&mut accumulator, &mut events, &mut updates, |_, update| {
        seen.push((update.is_terminal(), update.snapshot().to_string()));
    })
    .await;
    task.await.unwrap();

    assert_eq!(state, SessionState::Done);
    assert_eq!(
        seen,
        vec![
            (false, "Hel".to_string()),
            (false, "Hello, ".to_string()),
            (false, "Hello, world".to_string()),
            (true, "Hello, world".to_string()),
        ]
    );
}

#[tokio::test]
async fn follow_fails_session_when_source_disappears() {
    let mut accumulator = StreamAccumulator::new(PayloadDecoder::Text);
    let (update_tx, mut updates) = mpsc::unbounded_channel::<(StreamUpdate, SessionId)>();
    accumulator.subscribe(update_tx);
    let (event_tx, mut events) = mpsc::unbounded_channel();
    drop(event_tx);

    let mut last = None;
    let state = follow(&mut accumulator, &mut events, &mut updates, |_, update| {
        last = Some(update.clone());
    })
    .await;

    assert_eq!(state, SessionState::Failed);
    assert!(matches!(
        last,
        Some(StreamUpdate::Error {
            error: StreamError::Transport(_),
            ..
        })
    ));
}

#[tokio::test(start_paused = true)]
async fn replay_reports_incomplete_tokens_until_done() {
    let report = replay(
        &Config::default(),
        "Some **bold** text",
        4,
        Some(Duration::from_millis(10)),
    )
    .await;

    assert_eq!(report.state, SessionState::Done);
    assert!(report.steps.iter().any(|step| step.incomplete > 0));
    let last = report.steps.last().unwrap();
    assert_eq!(last.incomplete, 0);
    assert_eq!(last.buffer_len, "Some **bold** text".len());
    assert!(report.pipeline.is_finished());
    assert_eq!(report.pipeline.tokens()[0].children[1].tag(), TokenTag::Strong);
}
