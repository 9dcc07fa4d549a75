use dcr_core::error::AppError;
use tiktoken_rs::CoreBPE;

/// Token counter over the cl100k vocabulary, the same one the downstream
/// chat model consumes. Constructed once and shared; a missing vocabulary is
/// fatal to the caller so no chunk ever escapes the token budget.
pub struct TokenCounter {
    bpe: CoreBPE,
}

impl TokenCounter {
    pub fn new() -> Result<Self, AppError> {
        let bpe = tiktoken_rs::cl100k_base().map_err(|e| {
            AppError::new("TOKENIZER_UNAVAILABLE", "Failed to load the cl100k tokenizer")
                .with_details(e.to_string())
        })?;
        Ok(Self { bpe })
    }

    pub fn count(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}
