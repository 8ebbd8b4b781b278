use anyhow::{anyhow, Result};
use arrow_array::{Array, Float32Array, RecordBatch, StringArray, UInt32Array};
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};
use std::cmp::Ordering;

use ruleseer_core::types::{ChunkMetadata, ChunkType, SearchResult};

use crate::schema::{
    COL_DETACHMENT, COL_DISTANCE, COL_FACTION, COL_POSITION, COL_SOURCE, COL_TEXT, COL_TYPE, COL_UNIT_NAME,
};

/// SQL predicate for the type prefilter. Type names are fixed identifiers, no quoting needed.
pub fn type_predicate(chunk_type: ChunkType) -> String {
    format!("{COL_TYPE} = '{}'", chunk_type.as_str())
}

/// Cosine nearest-neighbour search over `table`, best first.
pub async fn search_table(table: &Table, vector: &[f32], k: usize, filter: Option<ChunkType>) -> Result<Vec<SearchResult>> {
    let mut query = table.vector_search(vector.to_vec())?.distance_type(DistanceType::Cosine).limit(k);
    if let Some(t) = filter {
        query = query.only_if(type_predicate(t));
    }
    let mut stream = query.execute().await?;
    let mut hits = Vec::new();
    while let Some(batch) = stream.try_next().await? {
        hits.extend(decode_batch(&batch)?);
    }
    sort_hits(&mut hits);
    hits.truncate(k);
    Ok(hits)
}

/// Score descending, then insertion position ascending.
pub fn sort_hits(hits: &mut [SearchResult]) {
    hits.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal).then(a.position.cmp(&b.position)));
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow!("result column '{name}' missing or mistyped"))
}

fn optional(arr: &StringArray, i: usize) -> Option<String> {
    if arr.is_null(i) {
        None
    } else {
        Some(arr.value(i).to_string())
    }
}

fn decode_batch(batch: &RecordBatch) -> Result<Vec<SearchResult>> {
    let positions = column::<UInt32Array>(batch, COL_POSITION)?;
    let texts = column::<StringArray>(batch, COL_TEXT)?;
    let types = column::<StringArray>(batch, COL_TYPE)?;
    let units = column::<StringArray>(batch, COL_UNIT_NAME)?;
    let detachments = column::<StringArray>(batch, COL_DETACHMENT)?;
    let factions = column::<StringArray>(batch, COL_FACTION)?;
    let sources = column::<StringArray>(batch, COL_SOURCE)?;
    let distances = column::<Float32Array>(batch, COL_DISTANCE)?;

    let mut out = Vec::with_capacity(batch.num_rows());
    for i in 0..batch.num_rows() {
        let metadata = ChunkMetadata {
            chunk_type: types.value(i).parse()?,
            unit_name: optional(units, i),
            detachment: optional(detachments, i),
            faction: optional(factions, i),
            source: sources.value(i).parse()?,
        };
        out.push(SearchResult {
            text: texts.value(i).to_string(),
            score: 1.0 - distances.value(i),
            position: positions.value(i),
            metadata,
        });
    }
    Ok(out)
}
