//! In-process vector index for mock mode and tests.
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::sync::RwLock;

use ragfuse_core::traits::VectorIndex;
use ragfuse_core::types::{Chunk, IndexHit, IndexPoint, PayloadFilter};

/// Brute-force cosine index over an insertion-ordered point list.
#[derive(Default)]
pub struct MemoryIndex {
    points: RwLock<Vec<IndexPoint>>,
}

impl MemoryIndex {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn cosine(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0f32, 0f32, 0f32);
    for (x, y) in a.iter().zip(b) {
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    dot / (na.sqrt() * nb.sqrt())
}

#[async_trait]
impl VectorIndex for MemoryIndex {
    async fn upsert(&self, points: Vec<IndexPoint>) -> Result<()> {
        let Ok(mut guard) = self.points.write() else {
            bail!("memory index lock poisoned");
        };
        for p in points {
            match guard.iter_mut().find(|q| q.chunk.id == p.chunk.id) {
                Some(existing) => *existing = p,
                None => guard.push(p),
            }
        }
        Ok(())
    }

    async fn search(&self, vector: &[f32], limit: usize) -> Result<Vec<IndexHit>> {
        let Ok(guard) = self.points.read() else {
            bail!("memory index lock poisoned");
        };
        let mut hits: Vec<IndexHit> = guard
            .iter()
            .map(|p| IndexHit { chunk: p.chunk.clone(), score: cosine(vector, &p.vector) })
            .collect();
        // stable sort keeps insertion order among equal scores
        hits.sort_by(|a, b| b.score.total_cmp(&a.score));
        hits.truncate(limit);
        Ok(hits)
    }

    async fn scan(&self, filter: &PayloadFilter, limit: usize) -> Result<Vec<Chunk>> {
        let Ok(guard) = self.points.read() else {
            bail!("memory index lock poisoned");
        };
        Ok(guard
            .iter()
            .filter(|p| filter.matches(&p.chunk))
            .take(limit)
            .map(|p| p.chunk.clone())
            .collect())
    }

    async fn count(&self) -> Result<usize> {
        let Ok(guard) = self.points.read() else {
            bail!("memory index lock poisoned");
        };
        Ok(guard.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cosine_handles_zero_vectors() {
        assert_eq!(cosine(&[0.0, 0.0], &[1.0, 0.0]), 0.0);
        assert!((cosine(&[1.0, 0.0], &[2.0, 0.0]) - 1.0).abs() < 1e-6);
        assert!(cosine(&[1.0, 0.0], &[-1.0, 0.0]) < -0.99);
    }
}
