use crate::tokenize::TokenCounter;

/// Split a transcript into chunks of whole paragraphs, each within
/// `max_tokens` under the fixed tokenizer.
///
/// Paragraphs are blank-line separated and never split internally: a single
/// paragraph that alone exceeds the budget is emitted as one oversized
/// chunk. Output preserves source order and, joined back with blank lines,
/// reconstructs the non-empty paragraph sequence.
pub fn split_into_chunks(text: &str, max_tokens: usize, counter: &TokenCounter) -> Vec<String> {
    let normalized = normalize_newlines(text);

    let mut chunks: Vec<String> = Vec::new();
    let mut current = String::new();

    for para in normalized.split("\n\n") {
        let candidate = format!("{current}\n\n{para}");
        if counter.count(&candidate) > max_tokens {
            flush(&mut chunks, &current);
            current = para.to_string();
        } else {
            current = candidate;
        }
    }
    flush(&mut chunks, &current);

    chunks
}

fn flush(chunks: &mut Vec<String>, accumulator: &str) {
    let trimmed = accumulator.trim();
    if !trimmed.is_empty() {
        chunks.push(trimmed.to_string());
    }
}

pub fn normalize_newlines(s: &str) -> String {
    s.replace("\r\n", "\n").replace('\r', "\n")
}
