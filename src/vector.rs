//! Data model shared by the store and the segmenter.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An immutable vector with a cached magnitude, as owned by the store after
/// insertion. Search results hand back a copy of `values`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Vector {
    /// Identity of the vector.
    pub id: Uuid,
    /// Raw components. Invariant: `values.len() == store.dimension`.
    pub values: Vec<f32>,
    /// `sqrt(sum(values[i]^2))`, computed once at construction.
    pub magnitude: f32,
}

impl Vector {
    /// Build a `Vector`, computing its magnitude from `values`.
    pub fn new(id: Uuid, values: Vec<f32>) -> Self {
        let magnitude = crate::kernel::magnitude(&values);
        Self {
            id,
            values,
            magnitude,
        }
    }
}

/// A contiguous piece of text bounded by token count and segmenter stop
/// signals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chunk {
    /// Identity of the chunk.
    pub id: Uuid,
    /// The section this chunk belongs to.
    pub section_id: Uuid,
    /// Position within the owning section. Unique within that section.
    pub chunk_index: u32,
    /// Non-empty UTF-8 text.
    pub content: String,
    /// Embedding of `content`, once computed. `None` before embedding.
    pub embedding: Option<Vec<f32>>,
}

/// An ordered group of chunks forming one semantic unit for retrieval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Section {
    /// Identity of the section.
    pub id: Uuid,
    /// The file this section belongs to.
    pub file_id: Uuid,
    /// Position within the owning file. Unique within that file.
    pub section_index: u32,
    /// Chunk IDs in ascending `chunk_index` order, with no gaps.
    pub chunk_ids: Vec<Uuid>,
    /// Optional short summary of the section's content.
    pub summary: Option<String>,
    /// Optional extra context carried alongside the section.
    pub additional_context: Option<String>,
    /// Embedding of the section (e.g. of its summary), once computed.
    pub embedding: Option<Vec<f32>>,
}

/// A source document. Deleting a file cascades to its sections and chunks
/// (enforced by the metadata store, see [`crate::contracts::FileStore`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct File {
    /// Identity of the file.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Content hash, opaque to this crate.
    pub content_hash: Vec<u8>,
}
