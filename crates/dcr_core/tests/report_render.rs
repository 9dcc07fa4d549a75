use std::fs;

use dcr_core::report::{MarkdownReportRenderer, ReportRenderer};

#[test]
fn renders_markdown_report_with_both_sections() {
    let dir = tempfile::tempdir().expect("tempdir");
    let renderer = MarkdownReportRenderer::new(dir.path().to_path_buf());

    let path = renderer
        .render_report("Patient Report", "Seasonal flu", "Tamiflu 75mg twice daily")
        .expect("render");

    assert_eq!(path.file_name().and_then(|n| n.to_str()), Some("patient_report.md"));
    let body = fs::read_to_string(&path).expect("read");
    assert!(body.starts_with("# Patient Report\n"));
    assert!(body.contains("## Diagnosis\n\nSeasonal flu"));
    assert!(body.contains("## Medications\n\nTamiflu 75mg twice daily"));

    // No temp artifact left behind.
    assert!(!path.with_extension("tmp").exists());
}

#[test]
fn normalizes_unsupported_characters_before_rendering() {
    let dir = tempfile::tempdir().expect("tempdir");
    let renderer = MarkdownReportRenderer::new(dir.path().to_path_buf());

    let path = renderer
        .render_report("Patient Report", "flu \u{2014} mild\u{2026}", "\u{2022} Tamiflu")
        .expect("render");

    let body = fs::read_to_string(&path).expect("read");
    assert!(body.contains("flu - mild..."));
    assert!(body.contains("- Tamiflu"));
}

#[test]
fn rerendering_overwrites_the_previous_document() {
    let dir = tempfile::tempdir().expect("tempdir");
    let renderer = MarkdownReportRenderer::new(dir.path().to_path_buf());

    renderer
        .render_report("Patient Report", "first", "none")
        .expect("render 1");
    let path = renderer
        .render_report("Patient Report", "second", "none")
        .expect("render 2");

    let body = fs::read_to_string(&path).expect("read");
    assert!(body.contains("second"));
    assert!(!body.contains("first"));
}
