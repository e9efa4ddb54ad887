//! Splits a character stream into a lazy sequence of non-empty,
//! boundary-terminated segments.

/// Splits a character source into segments, each ending at the first point
/// its trailing bytes match one of `boundaries`. Boundaries are tried
/// longest-first so that a longer boundary wins over a shorter one that is
/// also a suffix of it (e.g. `"\n\n"` over `"\n"`).
///
/// The final segment, if any characters remain when the source is
/// exhausted, is emitted without requiring a boundary match.
pub struct TextSegmentReader<I> {
    chars: I,
    boundaries: Vec<String>,
    buffer: String,
    exhausted: bool,
}

impl<I: Iterator<Item = char>> TextSegmentReader<I> {
    /// Build a reader over `chars`, splitting on `boundaries`. `boundaries`
    /// is sorted longest-first internally, so callers may pass it in any
    /// order.
    pub fn new(chars: I, mut boundaries: Vec<String>) -> Self {
        boundaries.sort_by(|a, b| b.len().cmp(&a.len()));
        Self {
            chars,
            boundaries,
            buffer: String::new(),
            exhausted: false,
        }
    }

    fn matched_boundary(&self) -> bool {
        self.boundaries
            .iter()
            .any(|b| !b.is_empty() && self.buffer.ends_with(b.as_str()))
    }
}

impl<I: Iterator<Item = char>> Iterator for TextSegmentReader<I> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.exhausted {
            return None;
        }

        loop {
            match self.chars.next() {
                Some(c) => {
                    self.buffer.push(c);
                    if self.matched_boundary() {
                        return Some(std::mem::take(&mut self.buffer));
                    }
                }
                None => {
                    self.exhausted = true;
                    if self.buffer.is_empty() {
                        return None;
                    }
                    return Some(std::mem::take(&mut self.buffer));
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segments(text: &str, boundaries: &[&str]) -> Vec<String> {
        let boundaries = boundaries.iter().map(|s| s.to_string()).collect();
        TextSegmentReader::new(text.chars(), boundaries).collect()
    }

    #[test]
    fn splits_on_single_boundary() {
        let segs = segments("a.b.c", &["."]);
        assert_eq!(segs, vec!["a.", "b.", "c"]);
    }

    #[test]
    fn longest_boundary_wins_over_shorter_suffix() {
        let segs = segments("a\n\nb\nc", &["\n", "\n\n"]);
        assert_eq!(segs, vec!["a\n\n", "b\n", "c"]);
    }

    #[test]
    fn no_boundaries_emits_single_final_segment() {
        let segs = segments("hello world", &[]);
        assert_eq!(segs, vec!["hello world"]);
    }

    #[test]
    fn empty_source_emits_nothing() {
        let segs = segments("", &["."]);
        assert!(segs.is_empty());
    }

    #[test]
    fn boundary_at_very_end_has_no_trailing_empty_segment() {
        let segs = segments("a.b.", &["."]);
        assert_eq!(segs, vec!["a.", "b."]);
    }

    #[test]
    fn ignores_empty_boundary_strings() {
        let segs = segments("abc", &[""]);
        assert_eq!(segs, vec!["abc"]);
    }
}
