//! Cosine Vector Store: an in-memory, persistable, SoA store of
//! fixed-dimension vectors supporting parallel top-k cosine search.
//!
//! Structure mirrors `Himasnhu-AT-rvector`'s `Abkve`/`AbkveInner` split: a
//! thin public type holding a single `parking_lot::RwLock`, wrapping an
//! unsynchronized inner struct that does the actual work. Readers
//! (`search`, `save`) take a read lock and may run concurrently with each
//! other; writers (`add`, `remove`, `load`) take a write lock and are
//! exclusive.

use parking_lot::RwLock;
use rayon::prelude::*;
use uuid::Uuid;

use crate::error::{RagError, RagResult};
use crate::heap::{merge_heaps, BoundedMinHeap};
use crate::kernel;
use crate::vector::Vector;

/// Above this many stored vectors, `search` fans out across the rayon
/// thread pool instead of scanning single-threaded. Tunable; must not
/// change the result for identical inputs, only how it is computed.
const PARALLEL_SEARCH_THRESHOLD: usize = 1000;

/// Thread-safe cosine similarity vector store.
pub struct CosineVectorStore {
    dimension: usize,
    inner: RwLock<StoreInner>,
}

/// The raw, unsynchronized SoA store. All mutation goes through the
/// outer `RwLock`.
struct StoreInner {
    /// `values[i*dimension .. (i+1)*dimension]` is vector `i`.
    values: Vec<f32>,
    ids: Vec<Uuid>,
    magnitudes: Vec<f32>,
    count: usize,
    capacity: usize,
}

impl StoreInner {
    fn new() -> Self {
        Self {
            values: Vec::new(),
            ids: Vec::new(),
            magnitudes: Vec::new(),
            count: 0,
            capacity: 0,
        }
    }

    fn ensure_capacity(&mut self, dimension: usize, required: usize) {
        if required <= self.capacity {
            return;
        }
        let new_capacity = (self.capacity * 2).max(required);
        self.values.resize(new_capacity * dimension, 0.0);
        self.ids.resize(new_capacity, Uuid::nil());
        self.magnitudes.resize(new_capacity, 0.0);
        self.capacity = new_capacity;
    }

    fn row(&self, dimension: usize, index: usize) -> &[f32] {
        let base = index * dimension;
        &self.values[base..base + dimension]
    }

    fn add(&mut self, dimension: usize, vector: &Vector) {
        self.ensure_capacity(dimension, self.count + 1);
        let base = self.count * dimension;
        self.values[base..base + dimension].copy_from_slice(&vector.values);
        self.ids[self.count] = vector.id;
        self.magnitudes[self.count] = vector.magnitude;
        self.count += 1;
    }

    /// Swap-with-last removal; does not preserve order.
    fn remove(&mut self, dimension: usize, id: Uuid) -> bool {
        let Some(index) = self.ids[..self.count].iter().position(|&x| x == id) else {
            return false;
        };
        let last = self.count - 1;
        if index != last {
            let (left, right) = self.values.split_at_mut(last * dimension);
            let dst = &mut left[index * dimension..(index + 1) * dimension];
            dst.copy_from_slice(&right[..dimension]);
            self.ids[index] = self.ids[last];
            self.magnitudes[index] = self.magnitudes[last];
        }
        self.count -= 1;
        true
    }
}

impl CosineVectorStore {
    /// Create an empty store for vectors of `dimension` components.
    pub fn new(dimension: usize) -> RagResult<Self> {
        if dimension == 0 {
            return Err(RagError::InvalidDimension(dimension));
        }
        Ok(Self {
            dimension,
            inner: RwLock::new(StoreInner::new()),
        })
    }

    /// Dimension every stored/queried vector must match.
    pub fn dimension(&self) -> usize {
        self.dimension
    }

    /// Number of vectors currently stored.
    pub fn len(&self) -> usize {
        self.inner.read().count
    }

    /// True if the store holds no vectors.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Insert a vector, growing the backing arrays if needed.
    pub fn add(&self, vector: Vector) -> RagResult<()> {
        if vector.values.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.values.len(),
            });
        }
        let mut inner = self.inner.write();
        inner.add(self.dimension, &vector);
        Ok(())
    }

    /// Remove the vector with the given id. Returns `true` on hit, `false`
    /// if no such id was present. Never fails.
    pub fn remove(&self, id: Uuid) -> bool {
        let mut inner = self.inner.write();
        inner.remove(self.dimension, id)
    }

    /// Top-k cosine-similarity search.
    ///
    /// Returns up to `k` vector copies. Returns an empty vector (not an
    /// error) if `query` is empty, `k == 0`, the store is empty, or
    /// `magnitude(query) == 0`. Fails with [`RagError::DimensionMismatch`]
    /// if `query.len() != dimension` (and `query` is non-empty).
    pub fn search(&self, query: &[f32], k: usize) -> RagResult<Vec<Vector>> {
        if query.is_empty() || k == 0 {
            return Ok(Vec::new());
        }
        if query.len() != self.dimension {
            return Err(RagError::DimensionMismatch {
                expected: self.dimension,
                actual: query.len(),
            });
        }

        let inner = self.inner.read();
        if inner.count == 0 {
            return Ok(Vec::new());
        }

        let query_mag = kernel::magnitude(query);
        if query_mag == 0.0 {
            tracing::warn!("search: zero-magnitude query, returning empty result");
            return Ok(Vec::new());
        }

        let dimension = self.dimension;
        let count = inner.count;

        let heap = if count > PARALLEL_SEARCH_THRESHOLD {
            tracing::debug!(count, "search: fanning out across the rayon thread pool");
            self.search_parallel(&inner, query, query_mag, k)
        } else {
            let mut heap = BoundedMinHeap::new(k);
            for i in 0..count {
                let score = kernel::cosine(query, query_mag, inner.row(dimension, i), inner.magnitudes[i]);
                heap.add(i, score);
            }
            heap
        };

        let mut scored: Vec<(f32, Vector)> = heap
            .into_items()
            .into_iter()
            .map(|(index, score)| {
                (
                    score,
                    Vector {
                        id: inner.ids[index],
                        values: inner.row(dimension, index).to_vec(),
                        magnitude: inner.magnitudes[index],
                    },
                )
            })
            .collect();
        scored.sort_by(|(a, _), (b, _)| b.partial_cmp(a).unwrap_or(std::cmp::Ordering::Equal));
        Ok(scored.into_iter().map(|(_, v)| v).collect())
    }

    fn search_parallel(
        &self,
        inner: &StoreInner,
        query: &[f32],
        query_mag: f32,
        k: usize,
    ) -> BoundedMinHeap<usize> {
        let dimension = self.dimension;
        let count = inner.count;
        let workers = rayon::current_num_threads().max(1);
        let chunk = count.div_ceil(workers).max(1);

        let partials: Vec<BoundedMinHeap<usize>> = (0..count)
            .into_par_iter()
            .step_by(chunk)
            .map(|start| {
                let end = (start + chunk).min(count);
                let mut local = BoundedMinHeap::new(k);
                for i in start..end {
                    let score =
                        kernel::cosine(query, query_mag, inner.row(dimension, i), inner.magnitudes[i]);
                    local.add(i, score);
                }
                local
            })
            .collect();

        merge_heaps(k, partials)
    }

    /// Write a bit-exact snapshot to `writer`. Readers may run concurrently
    /// with this.
    pub fn save<W: std::io::Write>(&self, writer: W) -> RagResult<()> {
        let inner = self.inner.read();
        crate::codec::write_snapshot(writer, self.dimension, &inner.ids[..inner.count], |i| {
            (inner.row(self.dimension, i), inner.magnitudes[i])
        })
        .inspect_err(|e| tracing::error!(error = %e, "save: failed to write snapshot"))
    }

    /// Replace this store's state from a previously `save`d snapshot.
    ///
    /// All-or-nothing: a short read, a dimension mismatch, or a malformed
    /// payload leaves the store completely unchanged.
    pub fn load<R: std::io::Read>(&self, reader: R) -> RagResult<()> {
        let loaded = crate::codec::read_snapshot(reader, self.dimension)
            .inspect_err(|e| tracing::error!(error = %e, "load: rejected snapshot, store unchanged"))?;
        let mut inner = self.inner.write();
        inner.ensure_capacity(self.dimension, loaded.ids.len());
        inner.values[..loaded.values.len()].copy_from_slice(&loaded.values);
        inner.ids[..loaded.ids.len()].copy_from_slice(&loaded.ids);
        inner.magnitudes[..loaded.magnitudes.len()].copy_from_slice(&loaded.magnitudes);
        inner.count = loaded.ids.len();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit(dim: usize, hot: usize) -> Vec<f32> {
        let mut v = vec![0.0; dim];
        v[hot] = 1.0;
        v
    }

    #[test]
    fn empty_store_search_returns_empty() {
        let store = CosineVectorStore::new(8).unwrap();
        let result = store.search(&[1.0; 8], 5).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn dimension_mismatch_on_add() {
        let store = CosineVectorStore::new(8).unwrap();
        let v = Vector::new(Uuid::new_v4(), vec![0.0; 7]);
        let err = store.add(v).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { expected: 8, actual: 7 }));
    }

    #[test]
    fn zero_magnitude_query_returns_empty() {
        // Exercises the `tracing::warn!` on this path; ignore the error if
        // another test in this binary already installed a subscriber.
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let store = CosineVectorStore::new(4).unwrap();
        store.add(Vector::new(Uuid::new_v4(), unit(4, 0))).unwrap();
        let result = store.search(&[0.0, 0.0, 0.0, 0.0], 1).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn identity_retrieval() {
        let store = CosineVectorStore::new(4).unwrap();
        let v0 = Vector::new(Uuid::new_v4(), unit(4, 0));
        let v1 = Vector::new(Uuid::new_v4(), unit(4, 1));
        let v2 = Vector::new(Uuid::new_v4(), unit(4, 2));
        store.add(v0).unwrap();
        store.add(v1.clone()).unwrap();
        store.add(v2).unwrap();

        let result = store.search(&v1.values, 1).unwrap();
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].id, v1.id);
    }

    #[test]
    fn remove_then_search() {
        let store = CosineVectorStore::new(4).unwrap();
        let a = Vector::new(Uuid::new_v4(), unit(4, 0));
        let b = Vector::new(Uuid::new_v4(), unit(4, 1));
        let c = Vector::new(Uuid::new_v4(), unit(4, 2));
        store.add(a.clone()).unwrap();
        store.add(b.clone()).unwrap();
        store.add(c.clone()).unwrap();

        assert!(store.remove(b.id));
        let result = store.search(&b.values, 3).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|v| v.id != b.id));
    }

    #[test]
    fn cosine_of_self_is_near_one() {
        let store = CosineVectorStore::new(8).unwrap();
        let v = Vector::new(Uuid::new_v4(), vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0]);
        store.add(v.clone()).unwrap();
        let result = store.search(&v.values, 1).unwrap();
        assert_eq!(result.len(), 1);
        let sim = kernel::cosine(&v.values, v.magnitude, &result[0].values, result[0].magnitude);
        assert!((sim - 1.0).abs() < 1e-5);
    }

    #[test]
    fn search_result_size_is_min_k_and_count() {
        let store = CosineVectorStore::new(4).unwrap();
        for i in 0..3 {
            store.add(Vector::new(Uuid::new_v4(), unit(4, i))).unwrap();
        }
        let result = store.search(&unit(4, 0), 10).unwrap();
        assert_eq!(result.len(), 3);
    }

    #[test]
    fn parallel_and_sequential_search_agree() {
        let store = CosineVectorStore::new(16).unwrap();
        for i in 0..(PARALLEL_SEARCH_THRESHOLD + 50) {
            let mut v = vec![0.0f32; 16];
            v[i % 16] = 1.0 + (i as f32 * 0.001);
            store.add(Vector::new(Uuid::new_v4(), v)).unwrap();
        }

        let query = unit(16, 3);
        let result = store.search(&query, 10).unwrap();
        assert_eq!(result.len(), 10);
    }

    #[test]
    fn save_and_load_roundtrip_preserves_top_k_ids() {
        let store = CosineVectorStore::new(8).unwrap();
        let mut ids = Vec::new();
        for i in 0..20 {
            let mut v = vec![0.0f32; 8];
            v[i % 8] = 1.0 + i as f32 * 0.01;
            let vector = Vector::new(Uuid::new_v4(), v);
            ids.push(vector.id);
            store.add(vector).unwrap();
        }

        let mut buf = Vec::new();
        store.save(&mut buf).unwrap();

        let loaded = CosineVectorStore::new(8).unwrap();
        loaded.load(buf.as_slice()).unwrap();

        let query = unit(8, 3);
        let a = store.search(&query, 5).unwrap();
        let b = loaded.search(&query, 5).unwrap();
        let a_ids: std::collections::HashSet<_> = a.iter().map(|v| v.id).collect();
        let b_ids: std::collections::HashSet<_> = b.iter().map(|v| v.id).collect();
        assert_eq!(a_ids, b_ids);
    }

    #[test]
    fn load_with_wrong_dimension_fails_without_mutating_store() {
        let source = CosineVectorStore::new(4).unwrap();
        source.add(Vector::new(Uuid::new_v4(), unit(4, 0))).unwrap();
        let mut buf = Vec::new();
        source.save(&mut buf).unwrap();

        let target = CosineVectorStore::new(8).unwrap();
        target.add(Vector::new(Uuid::new_v4(), unit(8, 0))).unwrap();
        let err = target.load(buf.as_slice()).unwrap_err();
        assert!(matches!(err, RagError::DimensionMismatch { .. }));
        assert_eq!(target.len(), 1);
    }
}
