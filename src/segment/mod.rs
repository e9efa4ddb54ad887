//! Embedding-Guided Section Segmenter: a three-stage streaming pipeline
//! from raw text to embedded section drafts.
//!
//! ```text
//! TextSegmentReader -> SegmentChunkReader -> section_stream
//! ```
//!
//! The first two stages are synchronous iterators; the third is an async
//! stream, since it is the only stage that calls the embedder.

mod chunker;
mod config;
mod reader;
mod sectioner;

pub use chunker::SegmentChunkReader;
pub use config::{ChunkingConfig, SectioningConfig};
pub use reader::TextSegmentReader;
pub use sectioner::{section_stream, EmbeddedChunk, SectionDraft};
