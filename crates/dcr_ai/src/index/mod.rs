use std::fs;
use std::path::{Path, PathBuf};

use dcr_core::error::AppError;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::embeddings::Embedder;

pub mod cache;

pub use cache::IndexCache;

/// Status record persisted with each index. The embedding model name and
/// dimensionality are recorded so a query with a mismatched embedder is
/// rejected instead of silently returning nonsense.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexStatus {
    pub embed_model: String,
    pub dims: u32,
    pub chunk_count: u32,
    pub updated_at: String, // RFC3339
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexedChunk {
    pub ordinal: u32,
    pub text: String,
    pub text_sha256: String,
}

/// In-memory handle to one persisted index. Vectors are parallel to chunks.
#[derive(Debug, Clone)]
pub struct LoadedIndex {
    pub name: String,
    pub status: IndexStatus,
    pub chunks: Vec<IndexedChunk>,
    pub vectors: Vec<Vec<f32>>,
}

/// Store of named vector indexes under one root directory.
///
/// Layout per index: `<root>/<name>/{status,chunks,vectors}.json` plus a
/// sibling plaintext mirror `<root>/<name>_meta.txt` for human inspection
/// (write-only; never read back).
#[derive(Debug, Clone)]
pub struct IndexStore {
    root: PathBuf,
}

impl IndexStore {
    pub fn open(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        self.root.as_path()
    }

    fn index_dir(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    fn staging_dir(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}.staging"))
    }

    fn meta_path(&self, name: &str) -> PathBuf {
        self.root.join(format!("{name}_meta.txt"))
    }

    pub fn exists(&self, name: &str) -> bool {
        validate_name(name).is_ok() && self.index_dir(name).is_dir()
    }

    /// Build an index from `chunks` and persist it under `name`, fully
    /// replacing any prior index of that name.
    ///
    /// The new index is staged in a scratch directory and only swapped into
    /// place once every chunk embedded and serialized; a failure part-way
    /// leaves the previous index untouched.
    pub fn build_and_persist(
        &self,
        chunks: &[String],
        embedder: &dyn Embedder,
        name: &str,
        updated_at: &str,
    ) -> Result<IndexStatus, AppError> {
        validate_name(name)?;
        if chunks.is_empty() {
            return Err(AppError::new(
                "INDEX_BUILD_FAILED",
                "No chunks to index; transcript was empty",
            ));
        }
        fs::create_dir_all(&self.root).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to create index root directory")
                .with_details(format!("path={}; err={}", self.root.display(), e))
        })?;

        let staging = self.staging_dir(name);
        let result = self.build_staged(&staging, chunks, embedder, name, updated_at);
        if result.is_err() {
            // Leave no partial artifacts behind; the previous index (if any)
            // is still in place.
            let _ = fs::remove_dir_all(&staging);
        }
        result
    }

    fn build_staged(
        &self,
        staging: &Path,
        chunks: &[String],
        embedder: &dyn Embedder,
        name: &str,
        updated_at: &str,
    ) -> Result<IndexStatus, AppError> {
        if staging.exists() {
            fs::remove_dir_all(staging).map_err(|e| {
                AppError::new("INDEX_BUILD_FAILED", "Failed to clear stale staging directory")
                    .with_details(format!("path={}; err={}", staging.display(), e))
            })?;
        }
        fs::create_dir_all(staging).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to create staging directory")
                .with_details(format!("path={}; err={}", staging.display(), e))
        })?;

        info!(index = name, chunk_count = chunks.len(), "embedding chunks for index build");

        let mut records: Vec<IndexedChunk> = Vec::with_capacity(chunks.len());
        let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());
        let mut dims: Option<u32> = None;

        for (i, text) in chunks.iter().enumerate() {
            let v = embedder.embed(text).map_err(|e| {
                let retryable = e.retryable;
                AppError::new("INDEX_BUILD_FAILED", "Failed to embed chunk")
                    .with_details(format!("ordinal={i}; cause={e}"))
                    .with_retryable(retryable)
            })?;
            let this_dims = v.len() as u32;
            match dims {
                Some(d) if d != this_dims => {
                    return Err(AppError::new(
                        "INDEX_BUILD_FAILED",
                        "Embedding dimension mismatch across chunks",
                    )
                    .with_details(format!("expected={d}; got={this_dims}; ordinal={i}")));
                }
                None => dims = Some(this_dims),
                _ => {}
            }
            debug!(ordinal = i, "embedded chunk");

            records.push(IndexedChunk {
                ordinal: i as u32,
                text: text.clone(),
                text_sha256: sha256_hex(text.as_bytes()),
            });
            vectors.push(v);
        }

        let dims = dims.ok_or_else(|| {
            AppError::new("INDEX_BUILD_FAILED", "No embeddings were produced")
        })?;
        let status = IndexStatus {
            embed_model: embedder.model_name().to_string(),
            dims,
            chunk_count: chunks.len() as u32,
            updated_at: updated_at.to_string(),
        };

        write_json(&staging.join("status.json"), &status)?;
        write_json(&staging.join("chunks.json"), &records)?;
        write_json(&staging.join("vectors.json"), &vectors)?;

        // Swap the staged index into place: full replace, never a merge.
        let final_dir = self.index_dir(name);
        if final_dir.exists() {
            fs::remove_dir_all(&final_dir).map_err(|e| {
                AppError::new("INDEX_BUILD_FAILED", "Failed to remove previous index")
                    .with_details(format!("path={}; err={}", final_dir.display(), e))
            })?;
        }
        fs::rename(staging, &final_dir).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to finalize index directory")
                .with_details(format!(
                    "staging={}; dest={}; err={}",
                    staging.display(),
                    final_dir.display(),
                    e
                ))
        })?;

        self.write_meta(name, chunks)?;
        info!(index = name, dims, "index persisted");
        Ok(status)
    }

    /// Plaintext mirror of the chunk contents, for debugging and audit only.
    fn write_meta(&self, name: &str, chunks: &[String]) -> Result<(), AppError> {
        let path = self.meta_path(name);
        let mut out = String::new();
        for (i, chunk) in chunks.iter().enumerate() {
            out.push_str(&format!("--- Chunk {i} ---\n{chunk}\n\n"));
        }
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, out.as_bytes()).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to write index metadata mirror")
                .with_details(format!("path={}; err={}", tmp.display(), e))
        })?;
        fs::rename(&tmp, &path).map_err(|e| {
            AppError::new("INDEX_BUILD_FAILED", "Failed to finalize index metadata mirror")
                .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
        })?;
        Ok(())
    }

    /// Load a persisted index. A missing index is `Ok(None)` so callers can
    /// distinguish "no data yet" from a real failure.
    pub fn load(&self, name: &str) -> Result<Option<LoadedIndex>, AppError> {
        validate_name(name)?;
        let dir = self.index_dir(name);
        if !dir.is_dir() {
            return Ok(None);
        }

        let status: IndexStatus = read_json(&dir.join("status.json"))?;
        let chunks: Vec<IndexedChunk> = read_json(&dir.join("chunks.json"))?;
        let vectors: Vec<Vec<f32>> = read_json(&dir.join("vectors.json"))?;

        if chunks.len() != vectors.len() || status.chunk_count as usize != chunks.len() {
            return Err(AppError::new(
                "INDEX_LOAD_FAILED",
                "Index chunk and vector counts disagree",
            )
            .with_details(format!(
                "status={}; chunks={}; vectors={}",
                status.chunk_count,
                chunks.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().position(|v| v.len() as u32 != status.dims) {
            return Err(AppError::new(
                "INDEX_LOAD_FAILED",
                "Index vector dimensions disagree with status",
            )
            .with_details(format!("ordinal={bad}; dims={}", status.dims)));
        }

        Ok(Some(LoadedIndex {
            name: name.to_string(),
            status,
            chunks,
            vectors,
        }))
    }
}

fn validate_name(name: &str) -> Result<(), AppError> {
    if name.is_empty()
        || !name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(AppError::new("INDEX_NAME_INVALID", "Index name is invalid")
            .with_details(format!("name={name}")));
    }
    Ok(())
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), AppError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", "Failed to encode index artifact")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    fs::write(path, json.as_bytes()).map_err(|e| {
        AppError::new("INDEX_BUILD_FAILED", "Failed to write index artifact")
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let bytes = fs::read(path).map_err(|e| {
        AppError::new("INDEX_LOAD_FAILED", "Failed to read index artifact")
            .with_details(format!("path={}; err={}", path.display(), e))
    })?;
    serde_json::from_slice(&bytes).map_err(|e| {
        AppError::new("INDEX_LOAD_FAILED", "Failed to decode index artifact")
            .with_details(format!("path={}; err={}", path.display(), e))
    })
}

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}
