use arrow_schema::{DataType, Field, Schema};
use std::sync::Arc;

pub const ID: &str = "id";
pub const DOC_ID: &str = "doc_id";
pub const CONTENT: &str = "content";
pub const CHUNK_INDEX: &str = "chunk_index";
pub const TOTAL_CHUNKS: &str = "total_chunks";
pub const CONTENT_TYPE: &str = "content_type";
pub const HAS_PREVIOUS: &str = "has_previous";
pub const HAS_NEXT: &str = "has_next";
/// Chunk metadata map serialised as a JSON object.
pub const METADATA: &str = "metadata";
pub const VECTOR: &str = "vector";

pub fn build_chunk_schema(dim: i32) -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new(ID, DataType::Utf8, false),
        Field::new(DOC_ID, DataType::Utf8, false),
        Field::new(CONTENT, DataType::Utf8, false),
        Field::new(CHUNK_INDEX, DataType::Int32, false),
        Field::new(TOTAL_CHUNKS, DataType::Int32, false),
        Field::new(CONTENT_TYPE, DataType::Utf8, false),
        Field::new(HAS_PREVIOUS, DataType::Boolean, false),
        Field::new(HAS_NEXT, DataType::Boolean, false),
        Field::new(METADATA, DataType::Utf8, false),
        Field::new(VECTOR, DataType::FixedSizeList(Arc::new(Field::new("item", DataType::Float32, true)), dim), true),
    ]))
}
