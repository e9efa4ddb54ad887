//! Accumulates text segments into token-bounded chunks.

use crate::contracts::Tokenizer;
use crate::segment::config::ChunkingConfig;

/// Greedily packs segments from an upstream [`TextSegmentReader`](super::reader::TextSegmentReader)
/// into chunks of at most `max_tokens_per_chunk` tokens, closing a chunk
/// early whenever the next segment starts with a configured stop signal.
///
/// A single segment that alone exceeds `max_tokens_per_chunk` still forms
/// its own chunk — it is never split mid-segment.
pub struct SegmentChunkReader<'t, I, T: ?Sized> {
    segments: I,
    tokenizer: &'t T,
    max_tokens_per_chunk: usize,
    stop_signals: Vec<String>,
    buffer: String,
    buffer_tokens: usize,
    finished: bool,
}

impl<'t, I, T> SegmentChunkReader<'t, I, T>
where
    I: Iterator<Item = String>,
    T: Tokenizer + ?Sized,
{
    /// Build a chunk reader pulling segments from `segments`, measuring
    /// token counts with `tokenizer`.
    pub fn new(
        segments: I,
        tokenizer: &'t T,
        max_tokens_per_chunk: usize,
        stop_signals: Vec<String>,
    ) -> Self {
        Self {
            segments,
            tokenizer,
            max_tokens_per_chunk,
            stop_signals,
            buffer: String::new(),
            buffer_tokens: 0,
            finished: false,
        }
    }

    /// Build a chunk reader from a [`ChunkingConfig`] instead of its raw
    /// fields.
    pub fn from_config(segments: I, tokenizer: &'t T, config: ChunkingConfig) -> Self {
        Self::new(segments, tokenizer, config.max_tokens_per_chunk, config.stop_signals)
    }

    fn starts_with_stop_signal(&self, segment: &str) -> bool {
        self.stop_signals.iter().any(|s| segment.starts_with(s.as_str()))
    }
}

impl<'t, I, T> Iterator for SegmentChunkReader<'t, I, T>
where
    I: Iterator<Item = String>,
    T: Tokenizer + ?Sized,
{
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.finished {
            return None;
        }

        loop {
            match self.segments.next() {
                Some(segment) => {
                    let segment_tokens = self.tokenizer.count_tokens(&segment);
                    let must_split = !self.buffer.is_empty()
                        && (self.buffer_tokens + segment_tokens > self.max_tokens_per_chunk
                            || self.starts_with_stop_signal(&segment));

                    if must_split {
                        let emitted = std::mem::replace(&mut self.buffer, segment);
                        self.buffer_tokens = segment_tokens;
                        return Some(emitted);
                    }

                    self.buffer.push_str(&segment);
                    self.buffer_tokens += segment_tokens;
                }
                None => {
                    self.finished = true;
                    if self.buffer.is_empty() {
                        return None;
                    }
                    return Some(std::mem::take(&mut self.buffer));
                }
            }
        }
    }
}
