//! LanceDB connection and housekeeping helpers.
//!
//! Tables live under `<index_dir>/lance/`, one directory per table. Every build
//! writes a fresh `chunks_<timestamp>` table; older ones are swept after commit.
use anyhow::{ensure, Result};
use arrow_array::types::Float32Type;
use arrow_array::{FixedSizeListArray, RecordBatch, RecordBatchIterator, StringArray, UInt32Array};
use arrow_schema::ArrowError;
use chrono::Utc;
use lancedb::{connect, Connection, Table};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ruleseer_core::types::Chunk;

use crate::schema::build_chunk_schema;

pub const TABLE_PREFIX: &str = "chunks_";
const LANCE_EXT: &str = ".lance";

pub fn lance_dir(index_dir: &Path) -> PathBuf {
    index_dir.join("lance")
}

pub async fn open_db(uri: &str) -> Result<Connection> {
    Ok(connect(uri).execute().await?)
}

pub async fn open_index_db(index_dir: &Path) -> Result<Connection> {
    let dir = lance_dir(index_dir);
    std::fs::create_dir_all(&dir)?;
    open_db(&dir.to_string_lossy()).await
}

/// `chunks_<utc timestamp>`, suffixed when a table of that name already exists.
pub async fn staging_table_name(conn: &Connection) -> Result<String> {
    let base = format!("{TABLE_PREFIX}{}", Utc::now().format("%Y%m%d%H%M%S%3f"));
    let names = conn.table_names().execute().await?;
    let mut candidate = base.clone();
    let mut n = 1usize;
    while names.contains(&candidate) {
        candidate = format!("{base}_{n}");
        n += 1;
    }
    Ok(candidate)
}

/// Convert one window of chunks and their vectors into a record batch.
/// `start` is the insertion position of the first chunk.
pub fn chunks_to_record_batch(chunks: &[Chunk], vectors: &[Vec<f32>], start: u32, dim: usize) -> Result<RecordBatch> {
    ensure!(chunks.len() == vectors.len(), "{} chunks but {} vectors", chunks.len(), vectors.len());
    let dim_i32 = i32::try_from(dim)?;
    let mut positions = Vec::with_capacity(chunks.len());
    let mut texts = Vec::with_capacity(chunks.len());
    let mut types = Vec::with_capacity(chunks.len());
    let mut unit_names = Vec::with_capacity(chunks.len());
    let mut detachments = Vec::with_capacity(chunks.len());
    let mut factions = Vec::with_capacity(chunks.len());
    let mut sources = Vec::with_capacity(chunks.len());
    let mut vecs: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(chunks.len());
    for (offset, (chunk, vector)) in chunks.iter().zip(vectors).enumerate() {
        ensure!(vector.len() == dim, "vector of length {} in an index of dim {dim}", vector.len());
        let meta = &chunk.metadata;
        positions.push(start + u32::try_from(offset)?);
        texts.push(chunk.text.as_str());
        types.push(meta.chunk_type.as_str());
        unit_names.push(meta.unit_name.as_deref());
        detachments.push(meta.detachment.as_deref());
        factions.push(meta.faction.as_deref());
        sources.push(meta.source.as_str());
        vecs.push(Some(vector.iter().map(|&x| Some(x)).collect()));
    }
    let batch = RecordBatch::try_new(
        build_chunk_schema(dim_i32),
        vec![
            Arc::new(UInt32Array::from(positions)),
            Arc::new(StringArray::from(texts)),
            Arc::new(StringArray::from(types)),
            Arc::new(StringArray::from(unit_names)),
            Arc::new(StringArray::from(detachments)),
            Arc::new(StringArray::from(factions)),
            Arc::new(StringArray::from(sources)),
            Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vecs, dim_i32)),
        ],
    )?;
    Ok(batch)
}

/// Create `name` from all batches in one write. Zero batches creates an empty table.
pub async fn create_chunk_table(conn: &Connection, name: &str, batches: Vec<RecordBatch>, dim: usize) -> Result<Table> {
    let schema = build_chunk_schema(i32::try_from(dim)?);
    let rows: Vec<Result<RecordBatch, ArrowError>> = batches.into_iter().map(Ok).collect();
    let reader = Box::new(RecordBatchIterator::new(rows.into_iter(), schema));
    Ok(conn.create_table(name, reader).execute().await?)
}

/// Delete every `chunks_*` table directory except `active`. Returns the removed table names.
/// A directory that cannot be removed is logged and left for the next build.
pub fn remove_stale_tables(index_dir: &Path, active: &str) -> Result<Vec<String>> {
    let dir = lance_dir(index_dir);
    let mut removed = Vec::new();
    if !dir.exists() {
        return Ok(removed);
    }
    for entry in std::fs::read_dir(&dir)? {
        let entry = entry?;
        let file_name = entry.file_name();
        let Some(name) = file_name.to_str().and_then(|n| n.strip_suffix(LANCE_EXT)) else { continue };
        if name == active || !name.starts_with(TABLE_PREFIX) {
            continue;
        }
        match std::fs::remove_dir_all(entry.path()) {
            Ok(()) => removed.push(name.to_string()),
            Err(e) => tracing::warn!(table = name, error = %e, "could not remove stale table"),
        }
    }
    removed.sort();
    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow_array::Array;
    use ruleseer_core::types::{ChunkMetadata, ChunkType};

    #[test]
    fn record_batch_keeps_positions_and_nullable_metadata() {
        let chunks = vec![
            Chunk { text: "[Core Rule: Deep Strike] Set up in Reserves.".into(), metadata: ChunkMetadata::new(ChunkType::CoreRule) },
            Chunk {
                text: "[Stratagem: Fire and Fade]".into(),
                metadata: ChunkMetadata::new(ChunkType::Stratagem).with_detachment("Battle Host").with_faction(Some("Aeldari")),
            },
        ];
        let vectors = vec![vec![1.0, 0.0], vec![0.0, 1.0]];
        let batch = chunks_to_record_batch(&chunks, &vectors, 7, 2).expect("batch");
        assert_eq!(batch.num_rows(), 2);
        let pos = batch.column(0).as_any().downcast_ref::<UInt32Array>().expect("position");
        assert_eq!((pos.value(0), pos.value(1)), (7, 8));
        let faction = batch.column(5).as_any().downcast_ref::<StringArray>().expect("faction");
        assert!(faction.is_null(0));
        assert_eq!(faction.value(1), "Aeldari");
    }

    #[test]
    fn record_batch_rejects_wrong_dimension() {
        let chunks = vec![Chunk { text: "x".into(), metadata: ChunkMetadata::new(ChunkType::CoreRule) }];
        assert!(chunks_to_record_batch(&chunks, &[vec![1.0, 0.0, 0.0]], 0, 2).is_err());
        assert!(chunks_to_record_batch(&chunks, &[], 0, 2).is_err());
    }

    #[test]
    fn stale_sweep_keeps_active_and_foreign_dirs() {
        let tmp = tempfile::tempdir().expect("tmp");
        let lance = lance_dir(tmp.path());
        for name in ["chunks_1.lance", "chunks_2.lance", "notes.lance", "chunks_3"] {
            std::fs::create_dir_all(lance.join(name)).expect("mkdir");
        }
        let removed = remove_stale_tables(tmp.path(), "chunks_2").expect("sweep");
        assert_eq!(removed, vec!["chunks_1".to_string()]);
        assert!(lance.join("chunks_2.lance").exists());
        assert!(lance.join("notes.lance").exists());
        assert!(lance.join("chunks_3").exists());
    }
}
