//! Closing of syntax left open at the end of a growing buffer.
//!
//! Only the tail is touched: an unterminated code fence, or the last leaf
//! block's unmatched emphasis, code span or link destination. Closing text is
//! appended after `boundary`; anything the tokenizer reports past that offset
//! was synthesized and marks its token incomplete. A dangling delimiter run
//! at the very end (`"Hello **"`) is withheld until the next chunk decides
//! what it is.

use crate::markdown::fence::{FenceLine, FenceTracker, OpenFence};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Repaired {
    pub source: String,
    /// Offset in `source` where synthesized text begins.
    pub boundary: usize,
}

impl Repaired {
    pub fn untouched(src: &str) -> Self {
        Self {
            source: src.to_string(),
            boundary: src.len(),
        }
    }
}

pub(crate) fn repair_tail(src: &str) -> Repaired {
    let mut tracker = FenceTracker::default();
    let mut leaf_start = 0;
    let mut offset = 0;
    let mut last_line_start = 0;
    let mut last_kind = FenceLine::Outside;

    for line in src.split_inclusive('\n') {
        let kind = tracker.feed(line);
        match kind {
            FenceLine::Closing => leaf_start = offset + line.len(),
            FenceLine::Outside => {
                if line.trim().is_empty() {
                    leaf_start = offset + line.len();
                } else if starts_block(line) {
                    leaf_start = offset;
                }
            }
            FenceLine::Opening | FenceLine::Inside => {}
        }
        last_line_start = offset;
        last_kind = kind;
        offset += line.len();
    }

    if let Some(open) = tracker.open_fence() {
        return close_fence(src, open, last_line_start, last_kind == FenceLine::Opening);
    }
    close_inline(src, leaf_start)
}

fn starts_block(line: &str) -> bool {
    let trimmed = line.trim_start_matches(' ');
    if trimmed.starts_with(['#', '>', '|']) {
        return true;
    }
    if trimmed.starts_with("- ") || trimmed.starts_with("* ") || trimmed.starts_with("+ ") {
        return true;
    }
    let digits = trimmed.bytes().take_while(u8::is_ascii_digit).count();
    digits > 0 && (trimmed[digits..].starts_with(". ") || trimmed[digits..].starts_with(") "))
}

fn close_fence(
    src: &str,
    open: &OpenFence,
    last_line_start: usize,
    last_is_opening: bool,
) -> Repaired {
    let mut base_end = src.len();
    let last_line = &src[last_line_start..];
    if !last_is_opening && !last_line.ends_with('\n') {
        let partial = last_line.trim();
        if !partial.is_empty() && partial.chars().all(|c| c == open.marker) {
            base_end = last_line_start;
        }
    }

    let base = &src[..base_end];
    let mut source = String::with_capacity(base.len() + open.indent.len() + open.len + 2);
    source.push_str(base);
    let boundary = source.len();
    if !base.is_empty() && !base.ends_with('\n') {
        source.push('\n');
    }
    source.push_str(&open.indent);
    source.extend(std::iter::repeat_n(open.marker, open.len));
    source.push('\n');
    Repaired { source, boundary }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Delim {
    marker: u8,
    len: usize,
}

#[derive(Debug, Default)]
struct InlineScan {
    stack: Vec<Delim>,
    open_code: Option<usize>,
    open_link: bool,
    /// Start of a delimiter run at the end of the text that neither opened
    /// nor closed anything.
    trailing_literal: Option<usize>,
}

fn run_len(bytes: &[u8], start: usize, marker: u8) -> usize {
    bytes[start..].iter().take_while(|b| **b == marker).count()
}

fn find_closing_backticks(bytes: &[u8], from: usize, len: usize) -> Option<usize> {
    let mut i = from;
    while i < bytes.len() {
        if bytes[i] == b'`' {
            let run = run_len(bytes, i, b'`');
            if run == len {
                return Some(i + run);
            }
            i += run;
        } else {
            i += 1;
        }
    }
    None
}

fn is_space(c: Option<char>) -> bool {
    c.is_none_or(char::is_whitespace)
}

fn is_alnum(c: Option<char>) -> bool {
    c.is_some_and(char::is_alphanumeric)
}

/// Apply one delimiter run to the stack. Returns true when the run did
/// nothing and stays literal text.
fn apply_run(
    stack: &mut Vec<Delim>,
    marker: u8,
    len: usize,
    prev: Option<char>,
    next: Option<char>,
    may_open: bool,
) -> bool {
    if marker == b'~' && len != 2 {
        return true;
    }
    if marker == b'_' && is_alnum(prev) && is_alnum(next) {
        return true;
    }

    let mut can_open = may_open && !is_space(next);
    let mut can_close = !is_space(prev);
    if marker == b'_' {
        can_open &= !is_alnum(prev);
        can_close &= !is_alnum(next);
    }
    let mut remaining = len;
    let mut matched = false;

    if can_close {
        while let Some(top) = stack.last() {
            if top.marker != marker || top.len > remaining {
                break;
            }
            remaining -= top.len;
            stack.pop();
            matched = true;
            if remaining == 0 {
                break;
            }
        }
    }

    if remaining > 0 && can_open {
        if marker == b'~' {
            stack.push(Delim { marker, len: 2 });
        } else {
            while remaining >= 2 {
                stack.push(Delim { marker, len: 2 });
                remaining -= 2;
            }
            if remaining == 1 {
                stack.push(Delim { marker, len: 1 });
            }
        }
        return false;
    }

    !matched
}

fn scan_inline(tail: &str) -> InlineScan {
    let bytes = tail.as_bytes();
    let mut scan = InlineScan::default();
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'\\' => {
                scan.trailing_literal = None;
                i += 2;
            }
            b'`' => {
                scan.trailing_literal = None;
                let len = run_len(bytes, i, b'`');
                match find_closing_backticks(bytes, i + len, len) {
                    Some(end) => i = end,
                    None => {
                        scan.open_code = Some(len);
                        break;
                    }
                }
            }
            b']' if bytes.get(i + 1) == Some(&b'(') => {
                scan.trailing_literal = None;
                let dest_start = i + 2;
                match bytes[dest_start..].iter().position(|b| *b == b')') {
                    Some(pos) => i = dest_start + pos + 1,
                    None => {
                        if !tail[dest_start..].contains(char::is_whitespace) {
                            scan.open_link = true;
                            break;
                        }
                        i = dest_start;
                    }
                }
            }
            marker @ (b'*' | b'_' | b'~') => {
                let len = run_len(bytes, i, marker);
                let prev = tail[..i].chars().next_back();
                let next = tail[i + len..].chars().next();
                // An intraword `*` only opens when a later run could close it.
                let may_open = marker != b'*'
                    || !(is_alnum(prev) && is_alnum(next))
                    || tail[i + len..].contains('*');
                let literal = apply_run(&mut scan.stack, marker, len, prev, next, may_open);
                // `_` after a letter or digit never opens, whatever follows.
                let settled = marker == b'_' && is_alnum(prev);
                scan.trailing_literal = (literal && !settled).then_some(i);
                i += len;
            }
            b' ' | b'\t' | b'\r' | b'\n' => i += 1,
            _ => {
                scan.trailing_literal = None;
                i += 1;
            }
        }
    }

    scan
}

fn close_inline(src: &str, leaf_start: usize) -> Repaired {
    let tail = &src[leaf_start..];
    let scan = scan_inline(tail);

    let mut closers = String::new();
    if let Some(len) = scan.open_code {
        closers.extend(std::iter::repeat_n('`', len));
    }
    if scan.open_link {
        closers.push(')');
    }
    for delim in scan.stack.iter().rev() {
        let marker = char::from(delim.marker);
        closers.extend(std::iter::repeat_n(marker, delim.len));
    }

    let withheld = match scan.trailing_literal {
        Some(start) if scan.open_code.is_none() && !scan.open_link => Some(leaf_start + start),
        _ => None,
    };
    if closers.is_empty() && withheld.is_none() {
        return Repaired::untouched(src);
    }

    let mut base = src[..withheld.unwrap_or(src.len())].trim_end();
    if scan.open_code.is_none() {
        base = base.trim_end_matches('\\');
    }

    let mut source = String::with_capacity(base.len() + closers.len());
    source.push_str(base);
    let boundary = source.len();
    source.push_str(&closers);
    Repaired { source, boundary }
}
