use crate::core::message::{Message, MessageRole, MessageStatus};
use std::error::Error;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends finished chat messages to a plain-text transcript.
#[derive(Debug, Default)]
pub struct TranscriptLog {
    file_path: Option<PathBuf>,
    is_active: bool,
}

impl TranscriptLog {
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Start logging to `path`, failing early if it cannot be opened for
    /// appending.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, Box<dyn Error>> {
        let path = path.into();
        OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            file_path: Some(path),
            is_active: true,
        })
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Pause or resume. A note is written before pausing so gaps in the
    /// transcript are explained.
    pub fn toggle(&mut self, pause_note: &str) -> Result<String, Box<dyn Error>> {
        let Some(path) = self.file_path.clone() else {
            return Err("No transcript file configured".into());
        };
        if self.is_active {
            self.write_block(&format!("## {pause_note}"))?;
            self.is_active = false;
            Ok(format!("Transcript paused ({})", path.display()))
        } else {
            self.is_active = true;
            Ok(format!("Transcript resumed ({})", path.display()))
        }
    }

    /// Record `message` if it is final. User turns get a prefix; failed
    /// replies are marked.
    pub fn log_message(&self, message: &Message) -> Result<(), Box<dyn Error>> {
        if !self.is_active || !message.status.is_terminal() {
            return Ok(());
        }
        let block = match (message.role, message.status) {
            (MessageRole::User, _) => format!("You: {}", message.content),
            (MessageRole::System, _) => format!("## {}", message.content),
            (MessageRole::Assistant, MessageStatus::Error) => {
                format!("{}\n## (reply failed)", message.content)
            }
            (MessageRole::Assistant, _) if message.content.is_empty() => return Ok(()),
            (MessageRole::Assistant, _) => message.content.clone(),
        };
        self.write_block(&block)
    }

    fn write_block(&self, content: &str) -> Result<(), Box<dyn Error>> {
        let Some(path) = &self.file_path else {
            return Ok(());
        };
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let mut writer = BufWriter::new(file);
        for line in content.lines() {
            writeln!(writer, "{line}")?;
        }
        writeln!(writer)?;
        writer.flush()?;
        Ok(())
    }

    pub fn status_string(&self) -> String {
        let name = |path: &Path| {
            path.file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .into_owned()
        };
        match (&self.file_path, self.is_active) {
            (None, _) => "disabled".to_string(),
            (Some(path), true) => format!("active ({})", name(path)),
            (Some(path), false) => format!("paused ({})", name(path)),
        }
    }
}
