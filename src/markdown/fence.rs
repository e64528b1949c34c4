/// Tracks fenced code blocks line by line.
#[derive(Debug, Default, Clone)]
pub(crate) struct FenceTracker {
    open: Option<OpenFence>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OpenFence {
    pub marker: char,
    pub len: usize,
    pub indent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum FenceLine {
    Opening,
    Closing,
    Inside,
    Outside,
}

/// Parse a fence marker run at the start of `line` (after indentation).
fn marker_run(line: &str) -> Option<(char, usize, &str)> {
    let trimmed = line.trim_start_matches([' ', '\t']);
    let marker = trimmed.chars().next()?;
    if marker != '`' && marker != '~' {
        return None;
    }
    let len = trimmed.chars().take_while(|c| *c == marker).count();
    if len < 3 {
        return None;
    }
    Some((marker, len, &trimmed[len..]))
}

impl FenceTracker {
    pub fn is_open(&self) -> bool {
        self.open.is_some()
    }

    pub fn open_fence(&self) -> Option<&OpenFence> {
        self.open.as_ref()
    }

    /// Classify `line` (without its newline) and update state.
    pub fn feed(&mut self, line: &str) -> FenceLine {
        let line = line.trim_end_matches(['\n', '\r']);
        match &self.open {
            Some(open) => {
                if let Some((marker, len, rest)) = marker_run(line) {
                    if marker == open.marker && len >= open.len && rest.trim().is_empty() {
                        self.open = None;
                        return FenceLine::Closing;
                    }
                }
                FenceLine::Inside
            }
            None => match marker_run(line) {
                // Backtick fences cannot carry backticks in their info string.
                Some((marker, len, rest)) if !(marker == '`' && rest.contains('`')) => {
                    let indent_len = line.len() - line.trim_start_matches([' ', '\t']).len();
                    self.open = Some(OpenFence {
                        marker,
                        len,
                        indent: line[..indent_len].to_string(),
                    });
                    FenceLine::Opening
                }
                _ => FenceLine::Outside,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_open_and_close() {
        let mut tracker = FenceTracker::default();
        assert_eq!(tracker.feed("text"), FenceLine::Outside);
        assert_eq!(tracker.feed("```rust"), FenceLine::Opening);
        assert_eq!(tracker.feed("~~~"), FenceLine::Inside);
        assert_eq!(tracker.feed("``"), FenceLine::Inside);
        assert_eq!(tracker.feed("````"), FenceLine::Closing);
        assert!(!tracker.is_open());
    }

    #[test]
    fn inline_code_is_not_a_fence() {
        let mut tracker = FenceTracker::default();
        assert_eq!(tracker.feed("```code``` inline"), FenceLine::Outside);
        assert!(!tracker.is_open());
    }

    #[test]
    fn remembers_indent_of_opening_line() {
        let mut tracker = FenceTracker::default();
        tracker.feed("  ~~~~ text");
        let open = tracker.open_fence().unwrap();
        assert_eq!(open.marker, '~');
        assert_eq!(open.len, 4);
        assert_eq!(open.indent, "  ");
    }
}
