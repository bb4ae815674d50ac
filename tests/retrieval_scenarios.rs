//! Retrieval core scenarios: chunk -> rank -> context -> pipeline

use async_trait::async_trait;
use docbuddy::{
    rag::{chunk_text, ContextBuilder, RAGPipeline, ReRanker, NO_CONTENT_ANSWER},
    store::Chunk,
    synthesis::{SynthesisError, SynthesisRequest, Synthesizer},
};
use std::sync::atomic::{AtomicUsize, Ordering};

struct Counting {
    calls: AtomicUsize,
}

#[async_trait]
impl Synthesizer for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    async fn synthesize(&self, request: &SynthesisRequest) -> Result<String, SynthesisError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(format!("{} chars of prompt", request.user.len()))
    }
}

fn report() -> String {
    let filler = "The committee met and reviewed routine items. ".repeat(12);
    format!(
        "{filler}\n\n{filler}\n\nQuarterly revenue rose to 4.2 million. Costs were flat. {filler}"
    )
}

fn stored(document_id: i64, name: &str, text: &str) -> Vec<Chunk> {
    chunk_text(text, 500, 100)
        .unwrap()
        .into_iter()
        .enumerate()
        .map(|(i, c)| Chunk {
            id: document_id * 100 + i as i64,
            document_id,
            document_name: name.to_string(),
            chunk_index: i as i64,
            content: c.content,
            start_char: c.start as i64,
            end_char: c.end as i64,
        })
        .collect()
}

#[test]
fn test_ranking_keeps_only_matching_chunks() {
    let chunks = stored(1, "report.pdf", &report());
    assert!(chunks.len() > 3);

    let ranked = ReRanker::new().rank("What was the quarterly revenue?", &chunks, 10);
    assert!(!ranked.is_empty());
    assert!(ranked.iter().all(|r| r.score > 0.0));
    assert!(ranked.iter().all(|r| {
        let lower = r.chunk.content.to_lowercase();
        lower.contains("quarterly") || lower.contains("revenue")
    }));
    assert!(ranked.windows(2).all(|w| w[0].score >= w[1].score));
}

#[test]
fn test_context_labels_follow_rank_order() {
    let mut chunks = stored(1, "report.pdf", &report());
    chunks.extend(stored(2, "minutes.docx", "Revenue was discussed briefly."));

    let ranked = ReRanker::new().rank("revenue", &chunks, 10);
    let context = ContextBuilder::new().build(&ranked);

    assert_eq!(context.chunk_ids, ranked.iter().map(|r| r.chunk.id).collect::<Vec<_>>());
    let first = &ranked[0].chunk;
    assert!(context.text.starts_with(&format!(
        "[From {}, Chunk {}]",
        first.document_name,
        first.chunk_index + 1
    )));
    assert!(context.document_ids.contains(&2));
}

#[test]
fn test_window_offsets_cover_text() {
    let text = report();
    let chunks = chunk_text(&text, 500, 100).unwrap();
    let total = text.chars().count();

    assert_eq!(chunks[0].start, 0);
    assert_eq!(chunks.last().unwrap().end, total);
    for pair in chunks.windows(2) {
        assert!(pair[1].start > pair[0].start);
        assert!(pair[1].start <= pair[0].end);
    }
}

#[tokio::test]
async fn test_pipeline_skips_synthesis_without_candidates() {
    let synthesizer = Counting {
        calls: AtomicUsize::new(0),
    };
    let result = RAGPipeline::new()
        .answer("anything", &[], &synthesizer)
        .await
        .unwrap();

    assert_eq!(result.answer, NO_CONTENT_ANSWER);
    assert!(result.chunk_ids.is_empty());
    assert_eq!(synthesizer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_pipeline_respects_limit() {
    let synthesizer = Counting {
        calls: AtomicUsize::new(0),
    };
    let chunks = stored(1, "report.pdf", &report());
    let mut pipeline = RAGPipeline::new();
    let mut config = pipeline.config().clone();
    config.limit = 2;
    pipeline.set_config(config);

    // no term matches, so the fallback takes the leading chunks
    let result = pipeline.answer("zzz yyy", &chunks, &synthesizer).await.unwrap();
    assert_eq!(result.chunk_ids, vec![chunks[0].id, chunks[1].id]);
    assert_eq!(result.document_ids, vec![1]);
    assert_eq!(synthesizer.calls.load(Ordering::SeqCst), 1);
}
