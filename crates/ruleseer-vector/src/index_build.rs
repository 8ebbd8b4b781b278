//! IVF-PQ training for large staged tables, and the pre-commit validation query.
//!
//! Small corpora are searched exhaustively; the ANN index only pays off once a
//! build crosses `index.ann_min_rows`.
use anyhow::{ensure, Result};
use futures::TryStreamExt;
use lancedb::index::vector::IvfPqIndexBuilder;
use lancedb::index::Index;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{DistanceType, Table};

use crate::schema::COL_VECTOR;

/// PQ codebooks with 8 bits need at least this many training rows.
pub const MIN_PQ_TRAINING_ROWS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IvfPqParams {
    pub nlist: usize,
    pub m: usize,
    pub nbits: usize,
}

pub fn compute_ivfpq_params(rows: usize, dim: usize) -> IvfPqParams {
    let sqrt_n = (rows as f64).sqrt() as usize;
    // One partition per ~sqrt(n) rows, but keep every partition trainable.
    let nlist = sqrt_n.clamp(1, (rows / MIN_PQ_TRAINING_ROWS).max(1));
    let preferred = if dim >= 1024 { 32 } else { 16 };
    let m = [preferred, 16, 8, 4, 2, 1].into_iter().find(|m| dim % m == 0).unwrap_or(1);
    IvfPqParams { nlist, m, nbits: 8 }
}

/// Whether a build of `rows` rows should train an ANN index.
pub fn wants_ann(rows: usize, ann_min_rows: usize) -> bool {
    ann_min_rows > 0 && rows >= ann_min_rows.max(MIN_PQ_TRAINING_ROWS)
}

pub async fn build_ivfpq_index(table: &Table, params: &IvfPqParams) -> Result<()> {
    table
        .create_index(
            &[COL_VECTOR],
            Index::IvfPq(
                IvfPqIndexBuilder::default()
                    .distance_type(DistanceType::Cosine)
                    .num_partitions(params.nlist as u32)
                    .num_sub_vectors(params.m as u32),
            ),
        )
        .execute()
        .await?;
    Ok(())
}

/// Query the staged table with one of its own vectors; it must come back non-empty.
pub async fn validate_table(table: &Table, vector: &[f32]) -> Result<()> {
    let mut stream = table.vector_search(vector.to_vec())?.distance_type(DistanceType::Cosine).limit(1).execute().await?;
    let mut rows = 0usize;
    while let Some(batch) = stream.try_next().await? {
        rows += batch.num_rows();
    }
    ensure!(rows > 0, "staged table returned no rows for a validation query");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn params_for_minilm_corpus() {
        let p = compute_ivfpq_params(10_000, 384);
        assert_eq!(p.m, 16);
        assert_eq!(p.nbits, 8);
        assert_eq!(p.nlist, 39);
        assert_eq!(384 % p.m, 0);
    }

    #[test]
    fn params_for_odd_dimension() {
        assert_eq!(compute_ivfpq_params(1_000, 6).m, 2);
        assert_eq!(compute_ivfpq_params(1_000, 7).m, 1);
        assert_eq!(compute_ivfpq_params(10, 8).nlist, 1);
    }

    #[test]
    fn ann_threshold() {
        assert!(!wants_ann(100_000, 0));
        assert!(!wants_ann(100, 50));
        assert!(wants_ann(5_000, 1_000));
    }
}
