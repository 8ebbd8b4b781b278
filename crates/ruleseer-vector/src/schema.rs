use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const COL_POSITION: &str = "position";
pub const COL_TEXT: &str = "text";
pub const COL_TYPE: &str = "chunk_type";
pub const COL_UNIT_NAME: &str = "unit_name";
pub const COL_DETACHMENT: &str = "detachment";
pub const COL_FACTION: &str = "faction";
pub const COL_SOURCE: &str = "source";
pub const COL_VECTOR: &str = "vector";
/// Added by LanceDB to vector search results.
pub const COL_DISTANCE: &str = "_distance";

/// One row per chunk; `vector` width is fixed per index by the embedder.
pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(COL_POSITION, DataType::UInt32, false),
        Field::new(COL_TEXT, DataType::Utf8, false),
        Field::new(COL_TYPE, DataType::Utf8, false),
        Field::new(COL_UNIT_NAME, DataType::Utf8, true),
        Field::new(COL_DETACHMENT, DataType::Utf8, true),
        Field::new(COL_FACTION, DataType::Utf8, true),
        Field::new(COL_SOURCE, DataType::Utf8, false),
        Field::new(COL_VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}
