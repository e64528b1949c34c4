//! Progressive reveal of finished text ("typing" effect).
//!
//! [`RevealCursor`] is the pure part: a lazy sequence of prefixes. The
//! [`driver`] functions put it on a tokio timer and make cancellation
//! authoritative: once cancelled, no further frame is emitted.

pub mod cursor;
pub mod driver;

use std::fmt;
use std::time::Duration;

pub use cursor::{RevealCursor, RevealFrame, Retarget};
pub use driver::{reveal, RevealOutcome, Typewriter};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevealError {
    ZeroStep,
    ZeroInterval,
}

impl fmt::Display for RevealError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevealError::ZeroStep => write!(f, "reveal step must be at least 1"),
            RevealError::ZeroInterval => write!(f, "reveal interval must be at least 1ms"),
        }
    }
}

impl std::error::Error for RevealError {}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealConfig {
    /// Grapheme clusters revealed per tick.
    pub step: usize,
    pub interval: Duration,
    /// Appended to in-progress frames when displayed.
    pub suffix: Option<String>,
}

impl RevealConfig {
    pub fn new(step: usize, interval: Duration) -> Result<Self, RevealError> {
        if step == 0 {
            return Err(RevealError::ZeroStep);
        }
        if interval < Duration::from_millis(1) {
            return Err(RevealError::ZeroInterval);
        }
        Ok(Self {
            step,
            interval,
            suffix: None,
        })
    }

    pub fn with_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.suffix = Some(suffix.into());
        self
    }
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            step: 1,
            interval: Duration::from_millis(50),
            suffix: None,
        }
    }
}
