use std::sync::Arc;

/// Append-only text accumulated over one streaming session.
///
/// The buffer only grows until [`StreamBuffer::reset`], which is reserved for
/// the start of a new session.
#[derive(Debug, Default, Clone)]
pub struct StreamBuffer {
    text: String,
}

impl StreamBuffer {
    pub fn new() -> Self {
        Self {
            text: String::with_capacity(1024),
        }
    }

    pub fn push_str(&mut self, chunk: &str) {
        self.text.push_str(chunk);
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    /// Owned copy handed to observers so no reader can see a half-applied
    /// append.
    pub fn snapshot(&self) -> Arc<str> {
        Arc::from(self.text.as_str())
    }

    pub(crate) fn reset(&mut self) {
        self.text.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_detached_from_later_appends() {
        let mut buffer = StreamBuffer::new();
        buffer.push_str("Hel");
        let early = buffer.snapshot();
        buffer.push_str("lo");
        assert_eq!(&*early, "Hel");
        assert_eq!(&*buffer.snapshot(), "Hello");
        assert_eq!(buffer.len(), 5);
    }

    #[test]
    fn reset_clears_for_next_session() {
        let mut buffer = StreamBuffer::new();
        buffer.push_str("stale");
        buffer.reset();
        assert!(buffer.is_empty());
    }
}
