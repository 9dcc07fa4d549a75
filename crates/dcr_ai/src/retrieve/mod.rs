use dcr_core::error::AppError;
use serde::{Deserialize, Serialize};

use crate::embeddings::Embedder;
use crate::index::LoadedIndex;

/// One retrieval hit: the chunk text plus where it sits in the transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievedChunk {
    pub ordinal: u32,
    pub text: String,
    pub score: f32,
}

/// Return the up-to-`k` chunks most similar to `query`, ranked by cosine
/// similarity descending with ties broken by transcript order.
pub fn retrieve(
    index: &LoadedIndex,
    embedder: &dyn Embedder,
    query: &str,
    k: usize,
) -> Result<Vec<RetrievedChunk>, AppError> {
    let query = query.trim();
    if query.is_empty() {
        return Err(AppError::new("RETRIEVAL_FAILED", "Query must not be empty"));
    }
    let k = k.max(1);

    let qv = embedder.embed(query)?;
    if qv.len() as u32 != index.status.dims {
        return Err(AppError::new(
            "RETRIEVAL_FAILED",
            "Query embedding dimensions do not match the index",
        )
        .with_details(format!(
            "index_dims={}; query_dims={}; embed_model={}",
            index.status.dims,
            qv.len(),
            index.status.embed_model
        )));
    }

    let qnorm = l2_norm(&qv);
    if qnorm == 0.0 {
        return Err(AppError::new(
            "RETRIEVAL_FAILED",
            "Query embedding norm is zero",
        ));
    }

    let mut scored: Vec<(u32, f32)> = Vec::with_capacity(index.chunks.len());
    for (chunk, v) in index.chunks.iter().zip(index.vectors.iter()) {
        let vnorm = l2_norm(v);
        if vnorm == 0.0 {
            continue;
        }
        scored.push((chunk.ordinal, dot(&qv, v) / (qnorm * vnorm)));
    }

    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.0.cmp(&b.0))
    });
    scored.truncate(k);

    let mut hits = Vec::with_capacity(scored.len());
    for (ordinal, score) in scored {
        let chunk = index
            .chunks
            .iter()
            .find(|c| c.ordinal == ordinal)
            .ok_or_else(|| {
                AppError::new("RETRIEVAL_FAILED", "Scored chunk missing from index")
                    .with_details(format!("ordinal={ordinal}"))
            })?;
        hits.push(RetrievedChunk {
            ordinal,
            text: chunk.text.clone(),
            score,
        });
    }
    Ok(hits)
}

fn l2_norm(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

fn dot(a: &[f32], b: &[f32]) -> f32 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn norm_and_dot_basics() {
        assert_eq!(l2_norm(&[3.0, 4.0]), 5.0);
        assert_eq!(dot(&[1.0, 2.0], &[3.0, 4.0]), 11.0);
        assert_eq!(l2_norm(&[]), 0.0);
    }
}
