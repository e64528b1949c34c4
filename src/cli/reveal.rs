use std::error::Error;
use std::io::{self, Write};

use tokio_util::sync::CancellationToken;
use unicode_width::UnicodeWidthStr;

use crate::core::config::Config;
use crate::reveal::{reveal, RevealConfig, RevealFrame};

pub fn reveal_config(
    config: &Config,
    step: Option<usize>,
    interval_ms: Option<u64>,
) -> Result<RevealConfig, Box<dyn Error>> {
    let mut settings = config.reveal.clone();
    if step.is_some() {
        settings.step = step;
    }
    if interval_ms.is_some() {
        settings.interval_ms = interval_ms;
    }
    Ok(settings.to_config()?)
}

/// Writes each frame as the text added since the previous one. A suffix is
/// drawn after the text and rubbed out with backspaces before the next write.
struct FramePrinter<W: Write> {
    out: W,
    suffix: Option<String>,
    shown: usize,
    suffix_drawn: bool,
}

impl<W: Write> FramePrinter<W> {
    fn new(out: W, suffix: Option<String>) -> Self {
        Self {
            out,
            suffix,
            shown: 0,
            suffix_drawn: false,
        }
    }

    fn print(&mut self, frame: &RevealFrame) -> io::Result<()> {
        if self.suffix_drawn {
            let width = self.suffix.as_deref().map(UnicodeWidthStr::width).unwrap_or(0);
            write!(self.out, "{}", "\u{8} \u{8}".repeat(width))?;
            self.suffix_drawn = false;
        }
        write!(self.out, "{}", &frame.text[self.shown..])?;
        self.shown = frame.text.len();
        if let Some(suffix) = self.suffix.as_deref().filter(|_| !frame.done) {
            write!(self.out, "{suffix}")?;
            self.suffix_drawn = true;
        }
        self.out.flush()
    }
}

pub async fn run_reveal(
    config: &Config,
    text: &str,
    step: Option<usize>,
    interval_ms: Option<u64>,
) -> Result<(), Box<dyn Error>> {
    let reveal_config = reveal_config(config, step, interval_ms)?;
    let mut printer = FramePrinter::new(io::stdout(), reveal_config.suffix.clone());
    let mut write_error = None;

    reveal(text, &reveal_config, &CancellationToken::new(), |frame| {
        if write_error.is_none() {
            write_error = printer.print(frame).err();
        }
    })
    .await;

    match write_error {
        Some(err) => Err(err.into()),
        None => {
            println!();
            Ok(())
        }
    }
}
