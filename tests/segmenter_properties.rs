//! Segmenter scenarios: size cap and cancellation behavior.

use async_trait::async_trait;
use futures::StreamExt;
use ragcore::contracts::{Embedder, Tokenizer};
use ragcore::error::{RagError, RagResult};
use ragcore::segment::{section_stream, SectioningConfig};
use tokio_util::sync::CancellationToken;

struct WordTokenizer;
impl Tokenizer for WordTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}

/// Always returns the same embedding, so every chunk is maximally similar
/// to the running centroid and only the size cap can force a split.
struct ConstantEmbedder;
#[async_trait]
impl Embedder for ConstantEmbedder {
    async fn embed(&self, _text: &str) -> RagResult<Vec<f32>> {
        Ok(vec![1.0, 0.0])
    }
}

/// Alternates between two orthogonal embeddings, so similarity to the
/// centroid drops to zero on (almost) every new chunk, forcing a split.
struct AlternatingEmbedder;
#[async_trait]
impl Embedder for AlternatingEmbedder {
    async fn embed(&self, text: &str) -> RagResult<Vec<f32>> {
        let n: usize = text
            .split_whitespace()
            .next()
            .and_then(|w| w.trim_start_matches("chunk").parse().ok())
            .unwrap_or(0);
        Ok(if n % 2 == 0 {
            vec![1.0, 0.0]
        } else {
            vec![0.0, 1.0]
        })
    }
}

fn words(n: usize, prefix: &str) -> String {
    (0..n)
        .map(|i| format!("{prefix}{i}"))
        .collect::<Vec<_>>()
        .join(" ")
}

#[tokio::test]
async fn size_cap_keeps_sections_within_three_sixty_token_chunks() {
    let tokenizer = WordTokenizer;
    let embedder = ConstantEmbedder;
    let config = SectioningConfig {
        max_tokens_per_section: 200,
        min_chunks_per_section: 1,
        min_tokens_per_section: 1,
        ..SectioningConfig::default()
    };

    let chunks = (0..10).map(|_| words(60, "w")).collect::<Vec<_>>().into_iter();
    let stream = section_stream(
        chunks,
        &tokenizer,
        &embedder,
        config,
        CancellationToken::new(),
    );
    futures::pin_mut!(stream);

    let mut sections = Vec::new();
    while let Some(section) = stream.next().await {
        sections.push(section.unwrap());
    }

    assert!(!sections.is_empty());
    for section in &sections {
        assert!(section.len() <= 3, "section had {} chunks", section.len());
        let total_tokens: usize = section
            .iter()
            .map(|c| tokenizer.count_tokens(&c.content))
            .sum();
        assert!(total_tokens <= 200, "section exceeded token cap: {total_tokens}");
    }
}

#[tokio::test]
async fn cancellation_stops_the_stream_after_the_observed_sections() {
    let tokenizer = WordTokenizer;
    let embedder = AlternatingEmbedder;
    let config = SectioningConfig {
        min_chunks_per_section: 1,
        min_tokens_per_section: 1,
        ..SectioningConfig::default()
    };
    let token = CancellationToken::new();

    let chunks = (0..6)
        .map(|i| format!("chunk{i} has some words in it today"))
        .collect::<Vec<_>>()
        .into_iter();
    let stream = section_stream(chunks, &tokenizer, &embedder, config, token.clone());
    futures::pin_mut!(stream);

    let mut observed = 0;
    loop {
        match stream.next().await {
            Some(Ok(_section)) => {
                observed += 1;
                if observed == 2 {
                    token.cancel();
                }
            }
            Some(Err(RagError::Cancelled)) => break,
            Some(Err(e)) => panic!("unexpected error: {e}"),
            None => panic!("stream ended without a cancellation signal"),
        }
    }

    assert_eq!(observed, 2);
    assert!(stream.next().await.is_none());
}
