//! Length-bounded truncation that keeps both ends of the content.
//!
//! Multi-line content keeps its first and last `preserve_lines` lines and
//! replaces the middle with a marker line. Short or single-block content is
//! cut character-wise around [`TRUNCATION_MARKER`]. All lengths are in
//! characters, never bytes, so multi-byte text is never split mid-codepoint.

use std::borrow::Cow;

use crate::constants::TRUNCATION_MARKER;

/// Truncates content to a character budget.
#[derive(Clone, Copy, Debug)]
pub struct SmartTruncator {
    preserve_lines: usize,
}

impl Default for SmartTruncator {
    fn default() -> Self {
        Self::new(5)
    }
}

impl SmartTruncator {
    /// Create a truncator keeping `preserve_lines` lines at each end.
    #[must_use]
    pub const fn new(preserve_lines: usize) -> Self {
        Self { preserve_lines }
    }

    /// Lines kept at each end.
    #[must_use]
    pub const fn preserve_lines(&self) -> usize {
        self.preserve_lines
    }

    /// Truncate `content` to at most `max_length` characters.
    ///
    /// Returns the input unchanged when it already fits.
    #[must_use]
    pub fn truncate<'a>(&self, content: &'a str, max_length: usize) -> Cow<'a, str> {
        let total_chars = content.chars().count();
        if total_chars <= max_length {
            return Cow::Borrowed(content);
        }

        let lines: Vec<&str> = content.split('\n').collect();
        if self.preserve_lines == 0 || lines.len() <= self.preserve_lines * 2 {
            return Cow::Owned(truncate_chars(content, total_chars, max_length));
        }

        let head = &lines[..self.preserve_lines];
        let tail = &lines[lines.len() - self.preserve_lines..];
        let middle = &lines[self.preserve_lines..lines.len() - self.preserve_lines];
        // Each removed line also drops its newline.
        let removed_chars: usize = middle.iter().map(|l| l.chars().count() + 1).sum();
        let marker = format!(
            "... [{} lines truncated, ~{removed_chars} chars] ...",
            middle.len()
        );

        let mut out = String::with_capacity(content.len());
        out.push_str(&head.join("\n"));
        out.push('\n');
        out.push_str(&marker);
        out.push('\n');
        out.push_str(&tail.join("\n"));

        if out.chars().count() > max_length {
            return Cow::Owned(truncate_chars(content, total_chars, max_length));
        }
        Cow::Owned(out)
    }
}

/// Keep a prefix and suffix around the marker, `max_length` chars in total.
fn truncate_chars(content: &str, total_chars: usize, max_length: usize) -> String {
    let marker_len = TRUNCATION_MARKER.chars().count();
    if max_length <= marker_len {
        return content.chars().take(max_length).collect();
    }
    let budget = max_length - marker_len;
    let head_len = budget.div_ceil(2);
    let tail_len = budget / 2;

    let mut out: String = content.chars().take(head_len).collect();
    out.push_str(TRUNCATION_MARKER);
    out.extend(content.chars().skip(total_chars - tail_len));
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered_lines(n: usize) -> String {
        (1..=n)
            .map(|i| format!("line {i:03} of the build output"))
            .collect::<Vec<_>>()
            .join("\n")
    }

    #[test]
    fn short_content_is_borrowed() {
        let t = SmartTruncator::default();
        assert!(matches!(t.truncate("hello", 5), Cow::Borrowed("hello")));
        assert!(matches!(t.truncate("", 0), Cow::Borrowed("")));
    }

    #[test]
    fn line_based_keeps_both_ends_verbatim() {
        let content = numbered_lines(40);
        let t = SmartTruncator::new(3);
        let out = t.truncate(&content, 400);
        let in_lines: Vec<&str> = content.split('\n').collect();
        let out_lines: Vec<&str> = out.split('\n').collect();
        assert_eq!(out_lines.len(), 7);
        assert_eq!(&out_lines[..3], &in_lines[..3]);
        assert_eq!(&out_lines[4..], &in_lines[37..]);
        assert!(out_lines[3].contains("34 lines truncated"));
        assert!(out.chars().count() <= 400);
    }

    #[test]
    fn few_lines_fall_back_to_chars() {
        let content = "x".repeat(300);
        let out = SmartTruncator::new(5).truncate(&content, 100);
        assert_eq!(out.chars().count(), 100);
        assert!(out.contains(TRUNCATION_MARKER));
        assert!(out.starts_with("xxx"));
        assert!(out.ends_with("xxx"));
    }

    #[test]
    fn oversized_line_result_falls_back_to_chars() {
        // 12 lines, each 200 chars: keeping 10 lines cannot fit in 500.
        let content = (0..12).map(|_| "y".repeat(200)).collect::<Vec<_>>().join("\n");
        let out = SmartTruncator::new(5).truncate(&content, 500);
        assert_eq!(out.chars().count(), 500);
        assert!(out.contains(TRUNCATION_MARKER));
    }

    #[test]
    fn tiny_budget_is_a_plain_prefix() {
        let out = SmartTruncator::default().truncate("abcdefghijklmnopqrstuvwxyz", 4);
        assert_eq!(out, "abcd");
    }

    #[test]
    fn multibyte_content_counts_chars() {
        let content = "é".repeat(100);
        let out = SmartTruncator::default().truncate(&content, 40);
        assert_eq!(out.chars().count(), 40);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn never_exceeds_budget(
                content in "(.{0,60}\n){0,40}",
                max_length in 0usize..800,
                preserve_lines in 0usize..8,
            ) {
                let t = SmartTruncator::new(preserve_lines);
                let out = t.truncate(&content, max_length);
                if content.chars().count() <= max_length {
                    prop_assert_eq!(out.as_ref(), content.as_str());
                } else {
                    prop_assert!(out.chars().count() <= max_length);
                }
            }

            #[test]
            fn line_mode_preserves_edges(
                lines in proptest::collection::vec("[a-z ]{0,30}", 12..60),
                preserve_lines in 1usize..5,
            ) {
                let content = lines.join("\n");
                let t = SmartTruncator::new(preserve_lines);
                // Budget large enough for the line form, too small for the whole.
                let max_length = content.chars().count() - 1;
                let out = t.truncate(&content, max_length);
                if out.contains(" lines truncated, ~") {
                    let out_lines: Vec<&str> = out.split('\n').collect();
                    prop_assert_eq!(&out_lines[..preserve_lines], &lines[..preserve_lines]);
                    let n = out_lines.len();
                    prop_assert_eq!(
                        &out_lines[n - preserve_lines..],
                        &lines[lines.len() - preserve_lines..]
                    );
                }
            }
        }
    }
}
