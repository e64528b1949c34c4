use unicode_segmentation::UnicodeSegmentation;

/// One emitted prefix of the target content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealFrame {
    pub text: String,
    /// Grapheme clusters shown so far.
    pub shown: usize,
    /// Grapheme clusters in the whole target.
    pub total: usize,
    /// Set on exactly one frame per target: the one that reaches the end.
    pub done: bool,
}

impl RevealFrame {
    /// Text with an in-progress marker appended to every frame but the last.
    pub fn display(&self, suffix: Option<&str>) -> String {
        match suffix {
            Some(suffix) if !self.done => format!("{}{}", self.text, suffix),
            _ => self.text.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retarget {
    /// Same content; nothing changed.
    Unchanged,
    /// The new content extends the old one; the position is kept.
    Continued,
    /// Different content; the position went back to zero.
    Restarted,
}

/// Lazy sequence of growing prefixes over a string, stepping by grapheme
/// clusters so no frame ever splits a character.
#[derive(Debug, Clone)]
pub struct RevealCursor {
    content: String,
    /// Byte offset of the end of each grapheme cluster.
    ends: Vec<usize>,
    position: usize,
    step: usize,
    finished: bool,
}

fn grapheme_ends(content: &str) -> Vec<usize> {
    content
        .grapheme_indices(true)
        .map(|(start, grapheme)| start + grapheme.len())
        .collect()
}

impl RevealCursor {
    pub fn new(content: impl Into<String>, step: usize) -> Self {
        let content = content.into();
        let ends = grapheme_ends(&content);
        Self {
            content,
            ends,
            position: 0,
            step: step.max(1),
            finished: false,
        }
    }

    /// Start with everything up to `byte_offset` (rounded down to a cluster
    /// boundary) already shown.
    pub fn starting_at(content: impl Into<String>, step: usize, byte_offset: usize) -> Self {
        let mut cursor = Self::new(content, step);
        cursor.position = cursor.ends.partition_point(|end| *end <= byte_offset);
        cursor
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn total(&self) -> usize {
        self.ends.len()
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn prefix(&self) -> &str {
        &self.content[..self.byte_position()]
    }

    pub fn byte_position(&self) -> usize {
        match self.position {
            0 => 0,
            n => self.ends[n - 1],
        }
    }

    /// Point the cursor at new content. A continuation of the current content
    /// keeps its position and reopens the sequence if more text arrived.
    pub fn retarget(&mut self, content: impl Into<String>) -> Retarget {
        let content = content.into();
        if content == self.content {
            return Retarget::Unchanged;
        }

        if content.starts_with(self.content.as_str()) {
            let shown_bytes = self.byte_position();
            let ends = grapheme_ends(&content);
            self.position = ends.partition_point(|end| *end <= shown_bytes);
            self.ends = ends;
            self.content = content;
            self.finished = false;
            return Retarget::Continued;
        }

        self.ends = grapheme_ends(&content);
        self.content = content;
        self.position = 0;
        self.finished = false;
        Retarget::Restarted
    }

    pub fn advance(&mut self) -> Option<RevealFrame> {
        if self.finished {
            return None;
        }

        let total = self.total();
        self.position = (self.position + self.step).min(total);
        let done = self.position == total;
        if done {
            self.finished = true;
        }

        Some(RevealFrame {
            text: self.prefix().to_string(),
            shown: self.position,
            total,
            done,
        })
    }
}

impl Iterator for RevealCursor {
    type Item = RevealFrame;

    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn texts(cursor: RevealCursor) -> Vec<String> {
        cursor.map(|frame| frame.text).collect()
    }

    #[test]
    fn steps_through_prefixes_and_ends_on_full_content() {
        let frames: Vec<RevealFrame> = RevealCursor::new("Hello", 2).collect();
        let texts: Vec<&str> = frames.iter().map(|f| f.text.as_str()).collect();
        assert_eq!(texts, vec!["He", "Hell", "Hello"]);
        assert_eq!(frames.iter().filter(|f| f.done).count(), 1);
        assert!(frames.last().unwrap().done);
    }

    #[test]
    fn final_prefix_equals_content_for_any_step() {
        let content = "Streaming 🚀 text with ünïcode";
        for step in 1..=40 {
            let frames: Vec<RevealFrame> = RevealCursor::new(content, step).collect();
            assert_eq!(frames.last().unwrap().text, content, "step {step}");
            assert_eq!(frames.iter().filter(|f| f.done).count(), 1, "step {step}");
        }
    }

    #[test]
    fn large_step_reveals_everything_at_once() {
        assert_eq!(texts(RevealCursor::new("abc", 3)), vec!["abc"]);
        assert_eq!(texts(RevealCursor::new("abc", 99)), vec!["abc"]);
    }

    #[test]
    fn empty_content_completes_with_single_frame() {
        let frames: Vec<RevealFrame> = RevealCursor::new("", 4).collect();
        assert_eq!(frames.len(), 1);
        assert!(frames[0].done);
        assert_eq!(frames[0].text, "");
    }

    #[test]
    fn never_splits_grapheme_clusters() {
        let content = "e\u{301}👨‍👩‍👧x";
        assert_eq!(
            texts(RevealCursor::new(content, 1)),
            vec!["e\u{301}", "e\u{301}👨‍👩‍👧", content]
        );
    }

    #[test]
    fn zero_step_is_clamped_to_one() {
        assert_eq!(texts(RevealCursor::new("ab", 0)), vec!["a", "ab"]);
    }

    #[test]
    fn continuation_keeps_position_and_reopens() {
        let mut cursor = RevealCursor::new("Hel", 2);
        assert_eq!(cursor.advance().unwrap().text, "He");
        assert_eq!(cursor.retarget("Hello"), Retarget::Continued);
        assert_eq!(cursor.position(), 2);
        let rest: Vec<String> = cursor.by_ref().map(|f| f.text).collect();
        assert_eq!(rest, vec!["Hell", "Hello"]);

        assert_eq!(cursor.retarget("Hello!"), Retarget::Continued);
        let frame = cursor.advance().unwrap();
        assert_eq!(frame.text, "Hello!");
        assert!(frame.done);
    }

    #[test]
    fn new_identity_restarts_from_zero() {
        let mut cursor = RevealCursor::new("first", 3);
        cursor.advance();
        assert_eq!(cursor.retarget("other"), Retarget::Restarted);
        assert_eq!(cursor.position(), 0);
        assert_eq!(cursor.advance().unwrap().text, "oth");
        assert_eq!(cursor.retarget("other"), Retarget::Unchanged);
    }

    #[test]
    fn starting_at_rounds_down_to_cluster_boundary() {
        let cursor = RevealCursor::starting_at("aé", 1, 2);
        assert_eq!(cursor.prefix(), "a");
    }

    #[test]
    fn display_appends_suffix_until_done() {
        let mut cursor = RevealCursor::new("ab", 1);
        let first = cursor.advance().unwrap();
        let last = cursor.advance().unwrap();
        assert_eq!(first.display(Some("▍")), "a▍");
        assert_eq!(last.display(Some("▍")), "ab");
    }
}
