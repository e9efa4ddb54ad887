//! Tunables for the chunking and sectioning stages.

use serde::{Deserialize, Serialize};

/// Controls the segment-based chunk reader.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Soft cap on tokens per chunk; a single oversized segment still forms
    /// its own chunk rather than being split mid-segment.
    pub max_tokens_per_chunk: usize,
    /// Strings that, when a segment starts with one, force the current
    /// chunk closed before that segment is appended.
    pub stop_signals: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_chunk: 400,
            stop_signals: Vec::new(),
        }
    }
}

/// Controls the section segmenter's statistical adaptive threshold and
/// minimum-requirements policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SectioningConfig {
    /// Hard cap on tokens per section; always forces a split when crossed.
    pub max_tokens_per_section: usize,
    /// Number of upcoming chunks considered when computing the adaptive
    /// similarity threshold.
    pub lookahead: usize,
    /// Multiplier `m` applied to the stddev term of the threshold formula.
    pub std_dev_multiplier: f32,
    /// Floor below which the adaptive threshold is never allowed to drop.
    pub min_similarity: f32,
    /// Fraction of `max_tokens_per_section` above which the threshold is
    /// tightened to discourage further growth of an already-large section.
    pub token_strictness_threshold: f32,
    /// Minimum chunk count a section must reach before a similarity-based
    /// split is honored.
    pub min_chunks_per_section: usize,
    /// Minimum token count a section must reach before a similarity-based
    /// split is honored.
    pub min_tokens_per_section: usize,
    /// Strings that mark the start of a new logical unit; interact with the
    /// minimum-requirements policy for early sections.
    pub stop_signals: Vec<String>,
}

impl Default for SectioningConfig {
    fn default() -> Self {
        Self {
            max_tokens_per_section: 2000,
            lookahead: 5,
            std_dev_multiplier: 1.0,
            min_similarity: 0.3,
            token_strictness_threshold: 0.7,
            min_chunks_per_section: 2,
            min_tokens_per_section: 200,
            stop_signals: Vec::new(),
        }
    }
}
