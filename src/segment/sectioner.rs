//! Groups embedded chunks into sections by tracking a running centroid and
//! splitting when the next chunk's similarity to it falls below a
//! statistically adaptive threshold, or when the section's token budget is
//! exhausted.

use std::collections::VecDeque;

use futures::Stream;
use tokio_util::sync::CancellationToken;

use crate::contracts::{Embedder, Tokenizer};
use crate::error::{RagError, RagResult};
use crate::segment::config::SectioningConfig;

/// A chunk paired with its embedding, as produced by the chunk reader plus
/// an embedding call.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    /// Chunk text.
    pub content: String,
    /// Embedding of `content`.
    pub embedding: Vec<f32>,
}

/// One section's worth of embedded chunks, in chunk order.
pub type SectionDraft = Vec<EmbeddedChunk>;

/// Build a lazy stream of [`SectionDraft`]s from a chunk-text source.
///
/// The cancellation token is checked at exactly two points: before each
/// upstream read, and before each consider step. On cancellation the stream
/// yields a final `Err(RagError::Cancelled)` and ends; no partial section is
/// emitted.
pub fn section_stream<'a>(
    chunks: impl Iterator<Item = String> + 'a,
    tokenizer: &'a (dyn Tokenizer + 'a),
    embedder: &'a (dyn Embedder + 'a),
    config: SectioningConfig,
    cancellation: CancellationToken,
) -> impl Stream<Item = RagResult<SectionDraft>> + 'a {
    async_stream::try_stream! {
        // A lookahead of 0 would leave nothing to pop as the seed chunk, so
        // the effective window is floored to 1: a seed chunk must come from
        // somewhere.
        let target = config.lookahead.max(1);
        let mut upstream = chunks;
        let mut lookahead: VecDeque<EmbeddedChunk> = VecDeque::new();

        refill(&mut lookahead, &mut upstream, embedder, target, &cancellation).await?;

        let Some(seed) = lookahead.pop_front() else {
            return;
        };
        refill(&mut lookahead, &mut upstream, embedder, target, &cancellation).await?;

        let mut current_tokens = tokenizer.count_tokens(&seed.content);
        let mut last_started_with_stop = starts_with_any(&seed.content, &config.stop_signals);
        let mut chunk_count: usize = 1;
        let mut centroid = seed.embedding.clone();
        let mut current: SectionDraft = vec![seed];

        loop {
            if cancellation.is_cancelled() {
                tracing::warn!("section_stream: cancelled before consider step");
                Err(RagError::Cancelled)?;
            }

            let Some(candidate) = lookahead.pop_front() else {
                break;
            };
            refill(&mut lookahead, &mut upstream, embedder, target, &cancellation).await?;

            let candidate_tokens = tokenizer.count_tokens(&candidate.content);
            let similarity = crate::kernel::cosine_vectors(&candidate.embedding, &centroid);
            let threshold = adaptive_threshold(&lookahead, &current, &centroid, current_tokens, &config);
            let satisfies_minimums = meets_minimums(
                chunk_count,
                current_tokens,
                &config.stop_signals,
                &candidate.content,
                last_started_with_stop,
                &config,
            );

            let split_by_similarity = similarity < threshold && satisfies_minimums;
            let split_by_size = current_tokens + candidate_tokens > config.max_tokens_per_section;

            if split_by_similarity || split_by_size {
                tracing::trace!(
                    similarity,
                    threshold,
                    split_by_size,
                    chunk_count,
                    "section_stream: splitting section"
                );
                yield std::mem::take(&mut current);

                centroid = candidate.embedding.clone();
                chunk_count = 1;
                current_tokens = candidate_tokens;
                last_started_with_stop = starts_with_any(&candidate.content, &config.stop_signals);
                current.push(candidate);
            } else {
                let n = chunk_count as f32;
                for (c, v) in centroid.iter_mut().zip(candidate.embedding.iter()) {
                    *c = (*c * n + v) / (n + 1.0);
                }
                chunk_count += 1;
                current_tokens += candidate_tokens;
                last_started_with_stop = starts_with_any(&candidate.content, &config.stop_signals);
                current.push(candidate);
            }
        }

        if !current.is_empty() {
            yield current;
        }
    }
}

async fn refill<I>(
    lookahead: &mut VecDeque<EmbeddedChunk>,
    upstream: &mut I,
    embedder: &dyn Embedder,
    target: usize,
    cancellation: &CancellationToken,
) -> RagResult<()>
where
    I: Iterator<Item = String>,
{
    while lookahead.len() < target {
        if cancellation.is_cancelled() {
            return Err(RagError::Cancelled);
        }
        match upstream.next() {
            Some(content) => {
                let embedding = embedder.embed(&content).await.inspect_err(|e| {
                    tracing::error!(error = %e, "section_stream: embedder call failed");
                })?;
                lookahead.push_back(EmbeddedChunk { content, embedding });
            }
            None => break,
        }
    }
    Ok(())
}

fn starts_with_any(text: &str, signals: &[String]) -> bool {
    signals.iter().any(|s| text.starts_with(s.as_str()))
}

/// Statistical adaptive threshold for the similarity split.
///
/// `base = max(min_similarity, mean(samples) - m * stddev(samples))`, where
/// `samples` are similarities of lookahead chunks (plus, if fewer than five
/// of those, the current section's own chunks) to the running centroid.
/// With fewer than three samples total, `base = min_similarity`.
///
/// `base` is then tightened as the section's token usage approaches its
/// cap: past `token_strictness_threshold` of `max_tokens_per_section`, the
/// threshold is raised quadratically with how far over that fraction the
/// section already is.
fn adaptive_threshold(
    lookahead: &VecDeque<EmbeddedChunk>,
    current: &[EmbeddedChunk],
    centroid: &[f32],
    current_tokens: usize,
    config: &SectioningConfig,
) -> f32 {
    let mut samples: Vec<f32> = lookahead
        .iter()
        .map(|c| crate::kernel::cosine_vectors(&c.embedding, centroid))
        .collect();

    if samples.len() < 5 {
        samples.extend(
            current
                .iter()
                .map(|c| crate::kernel::cosine_vectors(&c.embedding, centroid)),
        );
    }

    let base = if samples.len() < 3 {
        config.min_similarity
    } else {
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        let variance =
            samples.iter().map(|s| (s - mean).powi(2)).sum::<f32>() / samples.len() as f32;
        let stddev = variance.sqrt();
        (mean - config.std_dev_multiplier * stddev).max(config.min_similarity)
    };

    let usage = current_tokens as f32 / config.max_tokens_per_section as f32;
    if usage < config.token_strictness_threshold {
        return base;
    }

    let e = (usage - config.token_strictness_threshold) / (1.0 - config.token_strictness_threshold);
    let adjusted = base * (1.0 + 0.5 * e * e);
    adjusted.max(config.min_similarity).min(0.95)
}

/// Minimum-requirements policy gating a similarity-based split.
///
/// A section must reach both `min_chunks_per_section` and
/// `min_tokens_per_section` before a low-similarity candidate is allowed to
/// start a new section. If the section's last accepted chunk itself started
/// with a stop signal, the baseline minimums suffice. Otherwise, while the
/// section is still very young (at most two chunks) and the candidate
/// starts with a stop signal, the token minimum is tightened to 1.5x.
fn meets_minimums(
    chunk_count: usize,
    current_tokens: usize,
    stop_signals: &[String],
    candidate_content: &str,
    last_started_with_stop: bool,
    config: &SectioningConfig,
) -> bool {
    let baseline =
        chunk_count >= config.min_chunks_per_section && current_tokens >= config.min_tokens_per_section;
    if !baseline {
        return false;
    }

    if last_started_with_stop {
        return true;
    }

    if !stop_signals.is_empty() && chunk_count <= 2 && starts_with_any(candidate_content, stop_signals) {
        return current_tokens as f32 >= 1.5 * config.min_tokens_per_section as f32;
    }

    true
}
