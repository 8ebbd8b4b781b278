//! Persistent vector index over rule chunks, backed by LanceDB.
//!
//! Layout of an index directory:
//! - `manifest.json`: the committed build (see [`manifest`])
//! - `lance/<table>.lance`: one LanceDB table per build
//!
//! A build writes a new table, then flips the manifest; queries only ever read
//! the table the manifest names.
use chrono::Utc;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use ruleseer_core::config::IndexSettings;
use ruleseer_core::traits::Embedder;
use ruleseer_core::types::{Chunk, ChunkType, SearchResult};
use ruleseer_core::{Error, Result};

pub mod index_build;
pub mod manifest;
pub mod schema;
pub mod search;
pub mod table;

pub use manifest::IndexManifest;

use index_build::{build_ivfpq_index, compute_ivfpq_params, validate_table, wants_ann};
use manifest::{corpus_hash, read_manifest, write_manifest_atomic, MANIFEST_VERSION};
use table::{chunks_to_record_batch, create_chunk_table, open_index_db, remove_stale_tables, staging_table_name};

#[derive(Debug, Clone)]
pub struct BuildReport {
    pub table: String,
    pub rows: usize,
    pub dim: usize,
    pub embedder_id: String,
    pub ann_index: bool,
    /// Tables from earlier builds swept after the commit.
    pub removed_tables: Vec<String>,
    pub elapsed: Duration,
}

pub struct VectorStore {
    index_dir: PathBuf,
    embedder: Arc<dyn Embedder>,
    settings: IndexSettings,
}

impl VectorStore {
    /// Does no I/O; the index directory is created by the first build.
    pub fn open(index_dir: impl Into<PathBuf>, embedder: Arc<dyn Embedder>, settings: &IndexSettings) -> Self {
        Self { index_dir: index_dir.into(), embedder, settings: settings.clone() }
    }

    pub fn index_dir(&self) -> &Path {
        &self.index_dir
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// True once a build has been committed. Does not open the table.
    pub fn is_ready(&self) -> bool {
        matches!(read_manifest(&self.index_dir), Ok(Some(_)))
    }

    pub fn manifest(&self) -> Result<IndexManifest> {
        match read_manifest(&self.index_dir) {
            Ok(Some(m)) => Ok(m),
            Ok(None) => Err(Error::IndexNotFound(self.index_dir.clone())),
            Err(e) => {
                tracing::warn!(dir = %self.index_dir.display(), error = %format!("{e:#}"), "ignoring unreadable manifest");
                Err(Error::IndexNotFound(self.index_dir.clone()))
            }
        }
    }

    /// Replace the index with exactly `chunks`. Nothing is visible to queries
    /// until the manifest is committed; a failure leaves the previous build live.
    pub async fn build(&self, chunks: &[Chunk]) -> Result<BuildReport> {
        let started = Instant::now();
        let dim = self.embedder.dim();
        let vectors = self.embed_chunks(chunks)?;

        let window = self.settings.batch_size.max(1);
        let mut batches = Vec::with_capacity(chunks.len().div_ceil(window));
        for (i, (cs, vs)) in chunks.chunks(window).zip(vectors.chunks(window)).enumerate() {
            let start = u32::try_from(i * window).map_err(|e| Error::InvalidInput(e.to_string()))?;
            batches.push(chunks_to_record_batch(cs, vs, start, dim).map_err(|e| Error::InvalidInput(format!("{e:#}")))?);
        }

        let conn = open_index_db(&self.index_dir).await.map_err(Error::Store)?;
        let name = staging_table_name(&conn).await.map_err(Error::Store)?;
        tracing::info!(table = %name, rows = chunks.len(), "staging index table");
        let table = create_chunk_table(&conn, &name, batches, dim).await.map_err(Error::Store)?;

        let ann_index = wants_ann(chunks.len(), self.settings.ann_min_rows);
        if ann_index {
            let params = compute_ivfpq_params(chunks.len(), dim);
            tracing::info!(nlist = params.nlist, m = params.m, nbits = params.nbits, "training IVF-PQ index");
            build_ivfpq_index(&table, &params).await.map_err(Error::Store)?;
        }
        if let Some(first) = vectors.first() {
            validate_table(&table, first).await.map_err(Error::Store)?;
        }

        let manifest = IndexManifest {
            version: MANIFEST_VERSION,
            table: name.clone(),
            embedder_id: self.embedder.id().to_string(),
            dim,
            rows: chunks.len(),
            corpus_hash: corpus_hash(chunks),
            built_at: Utc::now().to_rfc3339(),
        };
        write_manifest_atomic(&self.index_dir, &manifest).map_err(Error::Store)?;
        tracing::info!(table = %name, rows = manifest.rows, "committed index");

        let removed_tables = remove_stale_tables(&self.index_dir, &name).unwrap_or_else(|e| {
            tracing::warn!(error = %format!("{e:#}"), "stale table sweep failed");
            Vec::new()
        });
        if !removed_tables.is_empty() {
            tracing::info!(count = removed_tables.len(), "removed tables from earlier builds");
        }

        Ok(BuildReport {
            table: name,
            rows: manifest.rows,
            dim,
            embedder_id: manifest.embedder_id,
            ann_index,
            removed_tables,
            elapsed: started.elapsed(),
        })
    }

    fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>> {
        let window = self.settings.batch_size.max(1);
        let dim = self.embedder.dim();
        let pb = ProgressBar::new(chunks.len() as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} chunks ({percent}%) {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);

        let mut vectors = Vec::with_capacity(chunks.len());
        for window_chunks in chunks.chunks(window) {
            let texts: Vec<String> = window_chunks.iter().map(|c| c.text.clone()).collect();
            let embedded = self.embedder.embed_batch(&texts)?;
            if embedded.len() != texts.len() {
                return Err(Error::Embedding(anyhow::anyhow!(
                    "embedder returned {} vectors for {} texts",
                    embedded.len(),
                    texts.len()
                )));
            }
            if let Some(bad) = embedded.iter().find(|v| v.len() != dim) {
                return Err(Error::Embedding(anyhow::anyhow!("vector of length {} from an embedder of dim {dim}", bad.len())));
            }
            vectors.extend(embedded);
            pb.set_position(vectors.len() as u64);
            tracing::info!("Embedded {}/{} chunks", vectors.len(), chunks.len());
        }
        pb.finish_and_clear();
        Ok(vectors)
    }

    /// Embed `text` and return up to `top_k` nearest chunks.
    pub async fn query(&self, text: &str, top_k: usize, filter: Option<ChunkType>) -> Result<Vec<SearchResult>> {
        check_top_k(top_k)?;
        let manifest = self.manifest()?;
        let vector = self.embedder.embed(text)?;
        self.search_manifest(&manifest, &vector, top_k, filter).await
    }

    pub async fn query_vector(&self, vector: &[f32], top_k: usize, filter: Option<ChunkType>) -> Result<Vec<SearchResult>> {
        check_top_k(top_k)?;
        let manifest = self.manifest()?;
        self.search_manifest(&manifest, vector, top_k, filter).await
    }

    async fn search_manifest(
        &self,
        manifest: &IndexManifest,
        vector: &[f32],
        top_k: usize,
        filter: Option<ChunkType>,
    ) -> Result<Vec<SearchResult>> {
        if vector.len() != manifest.dim {
            return Err(Error::InvalidInput(format!(
                "query vector has {} dimensions, index '{}' has {}",
                vector.len(),
                manifest.table,
                manifest.dim
            )));
        }
        if manifest.rows == 0 {
            return Ok(Vec::new());
        }
        let conn = open_index_db(&self.index_dir).await.map_err(Error::Store)?;
        let table = conn.open_table(&manifest.table).execute().await.map_err(|e| Error::Store(e.into()))?;
        let hits = search::search_table(&table, vector, top_k, filter).await.map_err(Error::Store)?;
        tracing::debug!(table = %manifest.table, top_k, ?filter, hits = hits.len(), "vector query");
        Ok(hits)
    }
}

fn check_top_k(top_k: usize) -> Result<()> {
    if top_k == 0 {
        return Err(Error::InvalidInput("top_k must be at least 1".into()));
    }
    Ok(())
}
