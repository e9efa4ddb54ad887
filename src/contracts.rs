//! External collaborator contracts: tokenizer, embedder, and metadata
//! store. The crate only depends on these traits — concrete backends are
//! out of scope (HTTP clients, ONNX/embedding-model runtimes, SQL/KV
//! stores).

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::RagResult;
use crate::vector::{Chunk, File, Section};

/// Token counting. Must be pure and cheap — the segmenter calls this on
/// every chunk, every consider step.
pub trait Tokenizer: Send + Sync {
    /// Number of tokens `text` would encode to. Determinism is required;
    /// a total order across concatenation is not.
    fn count_tokens(&self, text: &str) -> usize;
}

/// Text embedding. Allowed to be slow and fallible; failures propagate to
/// the caller verbatim via [`RagError::Embedder`](crate::error::RagError::Embedder).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed `text`. The returned vector's length must equal the store's
    /// configured dimension — callers reject mismatches, this trait makes
    /// no promise about it.
    async fn embed(&self, text: &str) -> RagResult<Vec<f32>>;
}

/// CRUD contract for file records. Deleting a file cascades to its
/// sections and chunks — the implementing store is responsible for this
/// invariant.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Insert a new file record.
    async fn add(&self, file: File) -> RagResult<()>;
    /// True if a file with this id exists.
    async fn exists(&self, id: Uuid) -> RagResult<bool>;
    /// Fetch all file records.
    async fn get_all(&self) -> RagResult<Vec<File>>;
    /// Replace an existing file record.
    async fn update(&self, file: File) -> RagResult<()>;
    /// Delete a file and cascade to its sections and chunks.
    async fn delete(&self, id: Uuid) -> RagResult<()>;
}

/// CRUD contract for section records.
#[async_trait]
pub trait SectionStore: Send + Sync {
    /// Insert a new section record.
    async fn add(&self, section: Section) -> RagResult<()>;
    /// Fetch a section by id.
    async fn get_by_id(&self, id: Uuid) -> RagResult<Option<Section>>;
    /// Fetch a section by its owning file and `section_index`.
    async fn get_by_index(&self, file_id: Uuid, index: u32) -> RagResult<Option<Section>>;
    /// Delete every section belonging to `file_id`.
    async fn delete_by_file(&self, file_id: Uuid) -> RagResult<()>;
}

/// CRUD contract for chunk records.
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Insert a new chunk record.
    async fn add(&self, chunk: Chunk) -> RagResult<()>;
    /// Fetch a chunk by id.
    async fn get_by_id(&self, id: Uuid) -> RagResult<Option<Chunk>>;
    /// Fetch a chunk by its owning section and `chunk_index`.
    async fn get_by_index(&self, section_id: Uuid, index: u32) -> RagResult<Option<Chunk>>;
    /// Delete every chunk reachable from `file_id` (via its sections).
    async fn delete_by_file(&self, file_id: Uuid) -> RagResult<()>;
}

/// An in-memory reference implementation of [`FileStore`], [`SectionStore`]
/// and [`ChunkStore`], for tests and examples. Mirrors the
/// `HashMap`-keyed `StoreData` pattern, made async and cascading: deleting
/// a file removes its sections and their chunks too.
#[cfg(any(test, feature = "test-support"))]
pub mod memory {
    use std::collections::HashMap;

    use parking_lot::Mutex;

    use super::*;

    #[derive(Default)]
    struct Data {
        files: HashMap<Uuid, File>,
        sections: HashMap<Uuid, Section>,
        chunks: HashMap<Uuid, Chunk>,
    }

    /// A single in-memory store implementing all three metadata-store
    /// traits over shared state, so cascading deletes can actually cascade.
    #[derive(Default)]
    pub struct InMemoryMetadataStore {
        data: Mutex<Data>,
    }

    impl InMemoryMetadataStore {
        /// Create an empty store.
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl FileStore for InMemoryMetadataStore {
        async fn add(&self, file: File) -> RagResult<()> {
            self.data.lock().files.insert(file.id, file);
            Ok(())
        }

        async fn exists(&self, id: Uuid) -> RagResult<bool> {
            Ok(self.data.lock().files.contains_key(&id))
        }

        async fn get_all(&self) -> RagResult<Vec<File>> {
            Ok(self.data.lock().files.values().cloned().collect())
        }

        async fn update(&self, file: File) -> RagResult<()> {
            self.data.lock().files.insert(file.id, file);
            Ok(())
        }

        async fn delete(&self, id: Uuid) -> RagResult<()> {
            let mut data = self.data.lock();
            data.files.remove(&id);

            let section_ids: Vec<Uuid> = data
                .sections
                .values()
                .filter(|s| s.file_id == id)
                .map(|s| s.id)
                .collect();

            for section_id in section_ids {
                if let Some(section) = data.sections.remove(&section_id) {
                    for chunk_id in section.chunk_ids {
                        data.chunks.remove(&chunk_id);
                    }
                }
            }

            Ok(())
        }
    }

    #[async_trait]
    impl SectionStore for InMemoryMetadataStore {
        async fn add(&self, section: Section) -> RagResult<()> {
            self.data.lock().sections.insert(section.id, section);
            Ok(())
        }

        async fn get_by_id(&self, id: Uuid) -> RagResult<Option<Section>> {
            Ok(self.data.lock().sections.get(&id).cloned())
        }

        async fn get_by_index(&self, file_id: Uuid, index: u32) -> RagResult<Option<Section>> {
            Ok(self
                .data
                .lock()
                .sections
                .values()
                .find(|s| s.file_id == file_id && s.section_index == index)
                .cloned())
        }

        async fn delete_by_file(&self, file_id: Uuid) -> RagResult<()> {
            let mut data = self.data.lock();
            let section_ids: Vec<Uuid> = data
                .sections
                .values()
                .filter(|s| s.file_id == file_id)
                .map(|s| s.id)
                .collect();
            for id in section_ids {
                data.sections.remove(&id);
            }
            Ok(())
        }
    }

    #[async_trait]
    impl ChunkStore for InMemoryMetadataStore {
        async fn add(&self, chunk: Chunk) -> RagResult<()> {
            self.data.lock().chunks.insert(chunk.id, chunk);
            Ok(())
        }

        async fn get_by_id(&self, id: Uuid) -> RagResult<Option<Chunk>> {
            Ok(self.data.lock().chunks.get(&id).cloned())
        }

        async fn get_by_index(&self, section_id: Uuid, index: u32) -> RagResult<Option<Chunk>> {
            Ok(self
                .data
                .lock()
                .chunks
                .values()
                .find(|c| c.section_id == section_id && c.chunk_index == index)
                .cloned())
        }

        async fn delete_by_file(&self, file_id: Uuid) -> RagResult<()> {
            let mut data = self.data.lock();
            let section_ids: Vec<Uuid> = data
                .sections
                .values()
                .filter(|s| s.file_id == file_id)
                .map(|s| s.id)
                .collect();
            let chunk_ids: Vec<Uuid> = data
                .chunks
                .values()
                .filter(|c| section_ids.contains(&c.section_id))
                .map(|c| c.id)
                .collect();
            for id in chunk_ids {
                data.chunks.remove(&id);
            }
            Ok(())
        }
    }

}
