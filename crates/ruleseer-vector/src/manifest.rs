//! `manifest.json`: the pointer from an index directory to its active table.
//!
//! A build is committed only when the manifest is replaced, so readers either
//! see the previous table or the new one.
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};

use ruleseer_core::types::Chunk;

pub const MANIFEST_FILE: &str = "manifest.json";
pub const MANIFEST_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexManifest {
    pub version: u32,
    pub table: String,
    pub embedder_id: String,
    pub dim: usize,
    pub rows: usize,
    pub corpus_hash: String,
    /// RFC 3339 timestamp of the commit.
    pub built_at: String,
}

pub fn manifest_path(index_dir: &Path) -> PathBuf {
    index_dir.join(MANIFEST_FILE)
}

/// `Ok(None)` when no manifest has been committed yet.
pub fn read_manifest(index_dir: &Path) -> Result<Option<IndexManifest>> {
    let path = manifest_path(index_dir);
    let raw = match std::fs::read_to_string(&path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
    };
    let manifest = serde_json::from_str(&raw).with_context(|| format!("parsing {}", path.display()))?;
    Ok(Some(manifest))
}

/// Write to a temp file in the same directory, then rename over the old manifest.
pub fn write_manifest_atomic(index_dir: &Path, manifest: &IndexManifest) -> Result<()> {
    std::fs::create_dir_all(index_dir)?;
    let mut tmp = tempfile::NamedTempFile::new_in(index_dir)?;
    serde_json::to_writer_pretty(tmp.as_file_mut(), manifest)?;
    tmp.as_file_mut().write_all(b"\n")?;
    tmp.as_file().sync_all()?;
    tmp.persist(manifest_path(index_dir)).map_err(|e| e.error).context("committing manifest")?;
    Ok(())
}

/// blake3 over every chunk's text and metadata, in order.
pub fn corpus_hash(chunks: &[Chunk]) -> String {
    let mut hasher = blake3::Hasher::new();
    for chunk in chunks {
        let meta = &chunk.metadata;
        for field in [
            chunk.text.as_str(),
            meta.chunk_type.as_str(),
            meta.source.as_str(),
            meta.unit_name.as_deref().unwrap_or(""),
            meta.detachment.as_deref().unwrap_or(""),
            meta.faction.as_deref().unwrap_or(""),
        ] {
            hasher.update(field.as_bytes());
            hasher.update(&[0u8]);
        }
    }
    hasher.finalize().to_hex().to_string()
}
