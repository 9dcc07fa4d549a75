use std::fs;
use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use crate::error::AppError;

/// Document rendering collaborator. The router hands it already-normalized
/// section text; implementations own layout and the output location.
pub trait ReportRenderer {
    fn render_report(
        &self,
        title: &str,
        diagnosis: &str,
        medications: &str,
    ) -> Result<PathBuf, AppError>;
}

/// Renders the consultation report as a dated Markdown document.
#[derive(Debug, Clone)]
pub struct MarkdownReportRenderer {
    output_dir: PathBuf,
}

impl MarkdownReportRenderer {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn output_path(&self, title: &str) -> PathBuf {
        self.output_dir.join(format!("{}.md", slug(title)))
    }
}

impl ReportRenderer for MarkdownReportRenderer {
    fn render_report(
        &self,
        title: &str,
        diagnosis: &str,
        medications: &str,
    ) -> Result<PathBuf, AppError> {
        fs::create_dir_all(&self.output_dir).map_err(|e| {
            AppError::new("REPORT_RENDER_FAILED", "Failed to create report directory")
                .with_details(format!("path={}; err={}", self.output_dir.display(), e))
        })?;

        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", clean_text(title)));
        out.push_str(&format!("Date: {}\n\n", OffsetDateTime::now_utc().date()));
        out.push_str("## Diagnosis\n\n");
        out.push_str(&clean_text(diagnosis));
        out.push_str("\n\n## Medications\n\n");
        out.push_str(&clean_text(medications));
        out.push('\n');

        let path = self.output_path(title);
        write_atomic(&path, out.as_bytes())?;
        Ok(path)
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), AppError> {
    let tmp = path.with_extension("tmp");
    fs::write(&tmp, bytes).map_err(|e| {
        AppError::new("REPORT_RENDER_FAILED", "Failed to write report document")
            .with_details(format!("path={}; err={}", tmp.display(), e))
    })?;
    fs::rename(&tmp, path).map_err(|e| {
        AppError::new("REPORT_RENDER_FAILED", "Failed to finalize report document")
            .with_details(format!("tmp={}; dest={}; err={}", tmp.display(), path.display(), e))
    })?;
    Ok(())
}

fn slug(title: &str) -> String {
    let mut out = String::with_capacity(title.len());
    for ch in title.chars() {
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.ends_with('_') && !out.is_empty() {
            out.push('_');
        }
    }
    let trimmed = out.trim_end_matches('_');
    if trimmed.is_empty() {
        "report".to_string()
    } else {
        trimmed.to_string()
    }
}

/// Normalize free-form model output to the restricted character set the
/// document renderers support. Typographic punctuation is mapped to ASCII
/// equivalents; anything else outside ASCII is dropped.
pub fn clean_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\u{2013}' | '\u{2014}' | '\u{2212}' => out.push('-'),
            '\u{2018}' | '\u{2019}' => out.push('\''),
            '\u{201C}' | '\u{201D}' => out.push('"'),
            '\u{2022}' | '\u{25CF}' => out.push('-'),
            '\u{2026}' => out.push_str("..."),
            '\u{00A9}' => out.push_str("(c)"),
            '\u{00AE}' => out.push_str("(r)"),
            '\u{00A0}' => out.push(' '),
            c if c.is_ascii() => out.push(c),
            _ => {}
        }
    }
    out
}
