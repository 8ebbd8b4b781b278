use std::sync::Arc;

use ruleseer_core::config::{IndexSettings, SearchSettings, Settings};
use ruleseer_core::traits::Embedder;
use ruleseer_core::types::{Chunk, ChunkMetadata, ChunkType};
use ruleseer_core::Result;
use ruleseer_search::{parse_type_filter, RuleSearch, SearchRequest, SearchResponse};
use ruleseer_vector::VectorStore;
use tempfile::TempDir;

/// Counts vocabulary words per axis plus a bias axis; rankings follow word overlap.
struct KeywordEmbedder;

const VOCAB: [&str; 6] = ["deep", "strike", "reserves", "necrons", "reanimation", "fade"];

impl Embedder for KeywordEmbedder {
    fn id(&self) -> &str {
        "test:keywords"
    }

    fn dim(&self) -> usize {
        VOCAB.len() + 1
    }

    fn max_len(&self) -> usize {
        256
    }

    fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts
            .iter()
            .map(|text| {
                let lower = text.to_lowercase();
                let mut v: Vec<f32> = VOCAB.iter().map(|w| lower.matches(w).count() as f32).collect();
                v.push(0.1);
                let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
                v.iter().map(|x| x / norm).collect()
            })
            .collect())
    }
}

fn chunk(t: ChunkType, text: &str, faction: Option<&str>) -> Chunk {
    Chunk { text: text.to_string(), metadata: ChunkMetadata::new(t).with_faction(faction) }
}

fn mixed_corpus() -> Vec<Chunk> {
    vec![
        chunk(
            ChunkType::Stratagem,
            "[Stratagem: Fire and Fade] (Aeldari) Deep Strike units may fade into Reserves.",
            Some("Aeldari"),
        ),
        chunk(ChunkType::FactionRule, "[Faction Rule: Reanimation Protocols] (Necrons) Necrons reanimation.", Some("Necrons")),
        chunk(ChunkType::CoreRule, "[Core Rule: Deep Strike] Units with Deep Strike can be set up in Reserves.", None),
    ]
}

async fn built_facade(tmp: &TempDir, chunks: &[Chunk], settings: &SearchSettings) -> RuleSearch {
    let store = VectorStore::open(tmp.path().join("index"), Arc::new(KeywordEmbedder), &IndexSettings::default());
    store.build(chunks).await.expect("build");
    RuleSearch::with_store(store, settings)
}

#[tokio::test]
async fn unbuilt_index_is_reported_without_loading_a_model() {
    let tmp = TempDir::new().expect("tmp");
    let mut settings = Settings::default();
    settings.paths.index_dir = tmp.path().join("missing").to_string_lossy().into_owned();
    settings.embedding.model_dir = Some(tmp.path().join("no-model").to_string_lossy().into_owned());
    let facade = RuleSearch::open(&settings);
    assert!(!facade.is_ready());
    let response = facade.search(&SearchRequest::new("deep strike")).await.expect("search");
    assert!(response.is_index_not_built());
    assert!(response.render().contains("ruleseer-indexer"));
}

#[tokio::test]
async fn faction_filter_keeps_faction_agnostic_rules() {
    let tmp = TempDir::new().expect("tmp");
    let facade = built_facade(&tmp, &mixed_corpus(), &SearchSettings::default()).await;
    let response = facade.search(&SearchRequest::new("deep strike").with_faction("necrons")).await.expect("search");
    let hits = response.hits();
    assert_eq!(hits.len(), 2);
    assert!(hits.iter().any(|h| h.metadata.chunk_type == ChunkType::CoreRule));
    assert!(hits.iter().any(|h| h.metadata.faction.as_deref() == Some("Necrons")));
    assert!(hits.iter().all(|h| h.metadata.faction.as_deref() != Some("Aeldari")));
    assert_eq!(hits[0].metadata.chunk_type, ChunkType::CoreRule, "core rule outranks the necrons rule");
}

#[tokio::test]
async fn faction_filter_over_fetches_past_better_matches() {
    let tmp = TempDir::new().expect("tmp");
    let mut chunks: Vec<Chunk> = (0..6)
        .map(|i| chunk(ChunkType::Stratagem, &format!("[Stratagem {i}] (Aeldari) Deep Strike from Reserves."), Some("Aeldari")))
        .collect();
    chunks.push(chunk(ChunkType::FactionRule, "[Faction Rule: Reanimation Protocols] (Necrons) Deep.", Some("Necrons")));
    let facade = built_facade(&tmp, &chunks, &SearchSettings::default()).await;

    let request = SearchRequest::new("deep strike reserves").with_faction("Necrons").with_limit(1);
    let response = facade.search(&request).await.expect("search");
    assert_eq!(response.hits().len(), 1);
    assert_eq!(response.hits()[0].metadata.faction.as_deref(), Some("Necrons"));
}

#[tokio::test]
async fn type_filter_excludes_core_rule() {
    let tmp = TempDir::new().expect("tmp");
    let facade = built_facade(&tmp, &mixed_corpus(), &SearchSettings::default()).await;
    let request = SearchRequest::new("deep strike").with_type(Some(ChunkType::Stratagem));
    let response = facade.search(&request).await.expect("search");
    assert_eq!(response.hits().len(), 1);
    assert!(response.hits().iter().all(|h| h.metadata.chunk_type == ChunkType::Stratagem));

    let all = SearchRequest::new("deep strike").with_type(parse_type_filter("all").expect("all"));
    assert_eq!(facade.search(&all).await.expect("search").hits().len(), 3);
}

#[tokio::test]
async fn limits_are_clamped_not_rejected() {
    let tmp = TempDir::new().expect("tmp");
    let settings = SearchSettings { default_limit: 2, max_limit: 2, ..SearchSettings::default() };
    let facade = built_facade(&tmp, &mixed_corpus(), &settings).await;

    let zero = facade.search(&SearchRequest::new("deep strike").with_limit(0)).await.expect("zero");
    assert_eq!(zero.hits().len(), 1);
    let huge = facade.search(&SearchRequest::new("deep strike").with_limit(1_000)).await.expect("huge");
    assert_eq!(huge.hits().len(), 2);
    let default = facade.search(&SearchRequest::new("deep strike")).await.expect("default");
    assert_eq!(default.hits().len(), 2);
}

#[tokio::test]
async fn empty_results_render_a_hint() {
    let tmp = TempDir::new().expect("tmp");
    let facade = built_facade(&tmp, &mixed_corpus(), &SearchSettings::default()).await;
    let request = SearchRequest::new("deep strike").with_type(Some(ChunkType::Enhancement));
    let response = facade.search(&request).await.expect("search");
    assert!(matches!(&response, SearchResponse::Hits { hits, .. } if hits.is_empty()));
    assert!(response.render().starts_with("No results found for \"deep strike\""));
}

#[tokio::test]
async fn rendered_hits_are_ranked_markdown() {
    let tmp = TempDir::new().expect("tmp");
    let facade = built_facade(&tmp, &mixed_corpus(), &SearchSettings::default()).await;
    let response = facade.search(&SearchRequest::new("deep strike reserves").with_limit(2)).await.expect("search");
    let text = response.render();
    assert!(text.starts_with("## Search Results for \"deep strike reserves\"\nFound 2 results:"));
    assert!(text.contains("### 1. [core_rule]"));
    assert!(text.contains("### 2. ["));
    assert!(text.contains("% match)"));
}
