//! LanceDB-backed vector index.
//!
//! One row per chunk; the chunk payload is stored in flat columns with the
//! metadata map as JSON. Nearest-neighbour search uses cosine distance and
//! payload scans use a `lower(content) LIKE` predicate.
use anyhow::{anyhow, Result};
use arrow_array::types::Float32Type;
use arrow_array::{
    Array, BooleanArray, FixedSizeListArray, Float32Array, Int32Array, RecordBatch, RecordBatchIterator, StringArray,
};
use async_trait::async_trait;
use futures::TryStreamExt;
use lancedb::query::{ExecutableQuery, QueryBase};
use lancedb::{Connection, DistanceType, Table};
use std::sync::Arc;
use tracing::debug;

use ragfuse_core::traits::VectorIndex;
use ragfuse_core::types::{Chunk, ContentType, IndexHit, IndexPoint, Meta, PayloadFilter};

use crate::schema::{self, build_chunk_schema};
use crate::table::{ensure_table, open_db, sql_literal};

pub struct LanceIndex {
    db: Connection,
    table_name: String,
    dim: usize,
}

impl LanceIndex {
    /// Open (and create if missing) `table_name` under `uri`.
    pub async fn open(uri: &str, table_name: &str, dim: usize) -> Result<Self> {
        let db = open_db(uri).await?;
        ensure_table(&db, table_name, build_chunk_schema(dim as i32)).await?;
        Ok(Self { db, table_name: table_name.to_string(), dim })
    }

    async fn table(&self) -> Result<Table> {
        Ok(self.db.open_table(&self.table_name).execute().await?)
    }

    fn points_to_record_batch(&self, points: &[IndexPoint]) -> Result<RecordBatch> {
        let mut ids = Vec::with_capacity(points.len());
        let mut doc_ids = Vec::with_capacity(points.len());
        let mut contents = Vec::with_capacity(points.len());
        let mut chunk_indices = Vec::with_capacity(points.len());
        let mut totals = Vec::with_capacity(points.len());
        let mut content_types = Vec::with_capacity(points.len());
        let mut has_previous = Vec::with_capacity(points.len());
        let mut has_next = Vec::with_capacity(points.len());
        let mut metadata = Vec::with_capacity(points.len());
        let mut vectors: Vec<Option<Vec<Option<f32>>>> = Vec::with_capacity(points.len());

        for p in points {
            if p.vector.len() != self.dim {
                return Err(anyhow!("vector for chunk {} has {} dims, index expects {}", p.chunk.id, p.vector.len(), self.dim));
            }
            let c = &p.chunk;
            ids.push(c.id.clone());
            doc_ids.push(c.doc_id.clone());
            contents.push(c.content.clone());
            chunk_indices.push(i32::try_from(c.chunk_index)?);
            totals.push(i32::try_from(c.total_chunks)?);
            content_types.push(c.content_type.as_str());
            has_previous.push(c.has_previous);
            has_next.push(c.has_next);
            metadata.push(serde_json::to_string(&c.metadata)?);
            vectors.push(Some(p.vector.iter().map(|&x| Some(x)).collect()));
        }

        Ok(RecordBatch::try_new(
            build_chunk_schema(self.dim as i32),
            vec![
                Arc::new(StringArray::from(ids)),
                Arc::new(StringArray::from(doc_ids)),
                Arc::new(StringArray::from(contents)),
                Arc::new(Int32Array::from(chunk_indices)),
                Arc::new(Int32Array::from(totals)),
                Arc::new(StringArray::from(content_types)),
                Arc::new(BooleanArray::from(has_previous)),
                Arc::new(BooleanArray::from(has_next)),
                Arc::new(StringArray::from(metadata)),
                Arc::new(FixedSizeListArray::from_iter_primitive::<Float32Type, _, _>(vectors, self.dim as i32)),
            ],
        )?)
    }
}

fn column<'a, T: Array + 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T> {
    batch
        .column_by_name(name)
        .and_then(|c| c.as_any().downcast_ref::<T>())
        .ok_or_else(|| anyhow!("column '{name}' missing or has unexpected type"))
}

fn chunks_from_batch(batch: &RecordBatch) -> Result<Vec<Chunk>> {
    let ids = column::<StringArray>(batch, schema::ID)?;
    let doc_ids = column::<StringArray>(batch, schema::DOC_ID)?;
    let contents = column::<StringArray>(batch, schema::CONTENT)?;
    let indices = column::<Int32Array>(batch, schema::CHUNK_INDEX)?;
    let totals = column::<Int32Array>(batch, schema::TOTAL_CHUNKS)?;
    let types = column::<StringArray>(batch, schema::CONTENT_TYPE)?;
    let prev = column::<BooleanArray>(batch, schema::HAS_PREVIOUS)?;
    let next = column::<BooleanArray>(batch, schema::HAS_NEXT)?;
    let metadata = column::<StringArray>(batch, schema::METADATA)?;

    (0..batch.num_rows())
        .map(|i| {
            let content_type = ContentType::parse(types.value(i))
                .ok_or_else(|| anyhow!("unknown content_type '{}'", types.value(i)))?;
            let metadata: Meta = serde_json::from_str(metadata.value(i))?;
            Ok(Chunk {
                id: ids.value(i).to_string(),
                doc_id: doc_ids.value(i).to_string(),
                content: contents.value(i).to_string(),
                chunk_index: usize::try_from(indices.value(i))?,
                total_chunks: usize::try_from(totals.value(i))?,
                content_type,
                has_previous: prev.value(i),
                has_next: next.value(i),
                metadata,
            })
        })
        .collect()
}

fn filter_predicate(filter: &PayloadFilter) -> Option<String> {
    match filter {
        PayloadFilter::ContentContainsAny(terms) => {
            if terms.is_empty() {
                return None;
            }
            let clauses: Vec<String> = terms
                .iter()
                .map(|t| format!("lower({}) LIKE {}", schema::CONTENT, sql_literal(&format!("%{}%", t.to_lowercase()))))
                .collect();
            Some(clauses.join(" OR "))
        }
    }
}

#[async_trait]
impl VectorIndex for LanceIndex {
    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        if points.is_empty() {
            return Ok(());
        }
        let batch = self.points_to_record_batch(&points)?;
        let schema = batch.schema();
        let reader = Box::new(RecordBatchIterator::new(vec![Ok(batch)].into_iter(), schema));
        let table = self.table().await?;
        // id is unique: replace existing rows, insert new ones
        let mut mi = table.merge_insert(&[schema::ID]);
        mi.when_matched_update_all(None).when_not_matched_insert_all();
        mi.execute(reader).await?;
        debug!(rows = points.len(), table = %self.table_name, "upserted chunks");
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<IndexHit>> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        let table = self.table().await?;
        let mut stream = table
            .vector_search(vector.to_vec())?
            .distance_type(DistanceType::Cosine)
            .limit(limit)
            .execute()
            .await?;
        let mut hits = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            let distances = column::<Float32Array>(&batch, "_distance")?;
            for (i, chunk) in chunks_from_batch(&batch)?.into_iter().enumerate() {
                hits.push(IndexHit { chunk, score: 1.0 - distances.value(i) });
            }
        }
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn scan(&self, filter: &PayloadFilter, limit: usize) -> Result<Vec<Chunk>> {
        let Some(predicate) = filter_predicate(filter) else {
            return Ok(Vec::new());
        };
        if limit == 0 {
            return Ok(Vec::new());
        }
        let table = self.table().await?;
        let mut stream = table.query().only_if(predicate).limit(limit).execute().await?;
        let mut out = Vec::new();
        while let Some(batch) = stream.try_next().await? {
            out.extend(chunks_from_batch(&batch)?);
        }
        out.truncate(limit);
        Ok(out)
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.table().await?.count_rows(None).await?)
    }
}
