//! Query facade over the index store: limit clamping, type and faction
//! filtering, and the markdown rendering shown to callers.
//!
//! The embedding model is only resolved on the first query that actually hits a
//! built index, so asking an unbuilt index never loads weights.
use once_cell::sync::OnceCell;
use serde::Serialize;
use std::path::PathBuf;

use ruleseer_core::config::{EmbeddingSettings, IndexSettings, SearchSettings, Settings};
use ruleseer_core::types::{ChunkType, SearchResult};
use ruleseer_core::{Error, Result};
use ruleseer_embed::shared_embedder;
use ruleseer_vector::VectorStore;

/// Wire value meaning "no type filter".
pub const ALL_TYPES: &str = "all";

#[derive(Debug, Clone, Default)]
pub struct SearchRequest {
    pub query: String,
    pub chunk_type: Option<ChunkType>,
    pub faction: Option<String>,
    pub limit: Option<usize>,
}

impl SearchRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), ..Self::default() }
    }

    pub fn with_type(mut self, chunk_type: Option<ChunkType>) -> Self {
        self.chunk_type = chunk_type;
        self
    }

    pub fn with_faction(mut self, faction: impl Into<String>) -> Self {
        self.faction = Some(faction.into());
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SearchResponse {
    /// No build has been committed yet.
    IndexNotBuilt,
    Hits { query: String, hits: Vec<SearchResult> },
}

impl SearchResponse {
    pub fn hits(&self) -> &[SearchResult] {
        match self {
            Self::IndexNotBuilt => &[],
            Self::Hits { hits, .. } => hits.as_slice(),
        }
    }

    pub fn is_index_not_built(&self) -> bool {
        matches!(self, Self::IndexNotBuilt)
    }

    pub fn render(&self) -> String {
        let (query, hits) = match self {
            Self::IndexNotBuilt => {
                return "Vector index not built. Run 'ruleseer-indexer' to build it first.".to_string();
            }
            Self::Hits { query, hits } => (query, hits),
        };
        if hits.is_empty() {
            return format!("No results found for \"{query}\". Try a different query or remove the type filter.");
        }
        let mut lines = vec![format!("## Search Results for \"{query}\""), format!("Found {} results:\n", hits.len())];
        for (i, hit) in hits.iter().enumerate() {
            lines.push(format!("### {}. [{}] ({:.1}% match)", i + 1, hit.metadata.chunk_type, hit.score_percent()));
            if let Some(unit) = &hit.metadata.unit_name {
                lines.push(format!("**Unit:** {unit}"));
            }
            if let Some(detachment) = &hit.metadata.detachment {
                lines.push(format!("**Detachment:** {detachment}"));
            }
            lines.push(hit.text.clone());
            lines.push(String::new());
        }
        lines.join("\n").trim_end().to_string()
    }
}

/// `"all"` (or empty) means no filter; anything else must name a chunk type.
pub fn parse_type_filter(raw: &str) -> Result<Option<ChunkType>> {
    let raw = raw.trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case(ALL_TYPES) {
        return Ok(None);
    }
    raw.parse().map(Some)
}

/// Default when absent, then clamped into `1..=max_limit`.
pub fn clamp_limit(limit: Option<usize>, settings: &SearchSettings) -> usize {
    limit.unwrap_or(settings.default_limit).clamp(1, settings.max_limit.max(1))
}

/// Entries without a faction belong to every faction.
pub fn matches_faction(hit: &SearchResult, faction: &str) -> bool {
    hit.metadata.faction.as_deref().map_or(true, |f| f.eq_ignore_ascii_case(faction))
}

pub struct RuleSearch {
    index_dir: PathBuf,
    embedding: EmbeddingSettings,
    index: IndexSettings,
    settings: SearchSettings,
    store: OnceCell<VectorStore>,
}

impl RuleSearch {
    /// Facade over the index at `settings.paths.index_dir`, using the shared embedder.
    pub fn open(settings: &Settings) -> Self {
        Self {
            index_dir: settings.paths.index_dir(),
            embedding: settings.embedding.clone(),
            index: settings.index.clone(),
            settings: settings.search.clone(),
            store: OnceCell::new(),
        }
    }

    /// Facade over an already constructed store.
    pub fn with_store(store: VectorStore, settings: &SearchSettings) -> Self {
        let facade = Self {
            index_dir: store.index_dir().to_path_buf(),
            embedding: EmbeddingSettings::default(),
            index: IndexSettings::default(),
            settings: settings.clone(),
            store: OnceCell::new(),
        };
        let _ = facade.store.set(store);
        facade
    }

    pub fn is_ready(&self) -> bool {
        match self.store.get() {
            Some(store) => store.is_ready(),
            None => matches!(ruleseer_vector::manifest::read_manifest(&self.index_dir), Ok(Some(_))),
        }
    }

    fn store(&self) -> Result<&VectorStore> {
        self.store.get_or_try_init(|| {
            let embedder = shared_embedder(&self.embedding)?;
            Ok(VectorStore::open(self.index_dir.clone(), embedder, &self.index))
        })
    }

    pub async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        if !self.is_ready() {
            return Ok(SearchResponse::IndexNotBuilt);
        }
        let limit = clamp_limit(request.limit, &self.settings);
        let faction = request.faction.as_deref().map(str::trim).filter(|f| !f.is_empty());
        let fetch = match faction {
            Some(_) => limit.saturating_mul(self.settings.overfetch_factor).min(self.settings.max_fetch).max(limit),
            None => limit,
        };

        let store = self.store()?;
        let mut hits = match store.query(&request.query, fetch, request.chunk_type).await {
            Ok(hits) => hits,
            Err(Error::IndexNotFound(_)) => return Ok(SearchResponse::IndexNotBuilt),
            Err(e) => return Err(e),
        };
        let fetched = hits.len();
        if let Some(faction) = faction {
            hits.retain(|h| matches_faction(h, faction));
        }
        hits.truncate(limit);
        tracing::debug!(query = %request.query, limit, fetch, fetched, returned = hits.len(), "rule search");
        Ok(SearchResponse::Hits { query: request.query.clone(), hits })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ruleseer_core::types::ChunkMetadata;

    #[test]
    fn limits_clamp_into_range() {
        let s = SearchSettings::default();
        assert_eq!(clamp_limit(None, &s), 5);
        assert_eq!(clamp_limit(Some(0), &s), 1);
        assert_eq!(clamp_limit(Some(7), &s), 7);
        assert_eq!(clamp_limit(Some(500), &s), 20);
    }

    #[test]
    fn type_filter_parsing() {
        assert_eq!(parse_type_filter("all").expect("all"), None);
        assert_eq!(parse_type_filter("").expect("empty"), None);
        assert_eq!(parse_type_filter("stratagem").expect("stratagem"), Some(ChunkType::Stratagem));
        assert!(parse_type_filter("wargear").is_err());
    }

    #[test]
    fn factionless_entries_match_any_faction() {
        let hit = |faction: Option<&str>| SearchResult {
            text: String::new(),
            score: 0.5,
            position: 0,
            metadata: ChunkMetadata::new(ChunkType::CoreRule).with_faction(faction),
        };
        assert!(matches_faction(&hit(None), "necrons"));
        assert!(matches_faction(&hit(Some("Necrons")), "necrons"));
        assert!(!matches_faction(&hit(Some("Aeldari")), "necrons"));
    }

    #[test]
    fn render_formats_hits() {
        let response = SearchResponse::Hits {
            query: "deep strike".into(),
            hits: vec![SearchResult {
                text: "[Stratagem: Fire and Fade] (Aeldari)".into(),
                score: 0.8234,
                position: 3,
                metadata: ChunkMetadata::new(ChunkType::Stratagem).with_detachment("Battle Host").with_faction(Some("Aeldari")),
            }],
        };
        let expected = "## Search Results for \"deep strike\"\nFound 1 results:\n\n\
                        ### 1. [stratagem] (82.3% match)\n**Detachment:** Battle Host\n[Stratagem: Fire and Fade] (Aeldari)";
        assert_eq!(response.render(), expected);
    }

    #[test]
    fn render_separates_consecutive_hits() {
        let hit = |text: &str, score: f32, metadata: ChunkMetadata| SearchResult { text: text.into(), score, position: 0, metadata };
        let response = SearchResponse::Hits {
            query: "avatar".into(),
            hits: vec![
                hit("Overview", 0.9, ChunkMetadata::new(ChunkType::UnitOverview).with_unit("Avatar of Khaine")),
                hit("[Core Rule: Deep Strike]", 0.5, ChunkMetadata::new(ChunkType::CoreRule)),
            ],
        };
        let expected = "## Search Results for \"avatar\"\nFound 2 results:\n\n\
                        ### 1. [unit_overview] (90.0% match)\n**Unit:** Avatar of Khaine\nOverview\n\n\
                        ### 2. [core_rule] (50.0% match)\n[Core Rule: Deep Strike]";
        assert_eq!(response.render(), expected);
    }

    #[test]
    fn render_empty_and_unbuilt() {
        let empty = SearchResponse::Hits { query: "xyz".into(), hits: Vec::new() };
        assert_eq!(empty.render(), "No results found for \"xyz\". Try a different query or remove the type filter.");
        assert!(SearchResponse::IndexNotBuilt.render().contains("not built"));
    }
}
