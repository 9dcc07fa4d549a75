use dcr_core::error::AppError;

/// Embedding collaborator. One index is always built and queried through a
/// single embedder, so the model is fixed at construction time.
pub trait Embedder {
    fn embed(&self, text: &str) -> Result<Vec<f32>, AppError>;

    /// Name recorded in the index status so a later query can detect a
    /// mismatched embedding function.
    fn model_name(&self) -> &str;
}

pub mod rest_embed;

pub use rest_embed::RestEmbedder;
