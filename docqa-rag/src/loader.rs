//! File-format text extraction.
//!
//! [`load_file`] dispatches on the original file name's extension and returns
//! page-scoped [`Document`]s. Supported formats: PDF (`pdf-extract`), DOCX
//! (`docx-rs`), and plain text. Anything else fails with
//! [`RagError::UnsupportedFileType`] before any state is written.

use std::collections::HashMap;
use std::path::Path;

use docx_rs::{DocumentChild, ParagraphChild, RunChild, read_docx};
use tracing::debug;

use crate::document::Document;
use crate::error::{RagError, Result};

/// Load a source file into one or more page-scoped documents.
///
/// `file_name` is the client's original file name; it determines the format
/// and is recorded as `source` metadata. The returned documents carry a
/// placeholder id — the pipeline replaces it with the generated document
/// identifier before chunking.
///
/// # Errors
///
/// Returns [`RagError::UnsupportedFileType`] for unknown extensions,
/// [`RagError::Io`] if the file cannot be read, and
/// [`RagError::ExtractionError`] if the format parser fails.
pub async fn load_file(path: &Path, file_name: &str) -> Result<Vec<Document>> {
    let extension = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();

    let documents = match extension.as_str() {
        "pdf" => extract_pdf(path, file_name).await?,
        "docx" => extract_docx(path, file_name).await?,
        "txt" => {
            let text = tokio::fs::read_to_string(path).await?;
            vec![make_document(text, file_name, None)]
        }
        other => return Err(RagError::UnsupportedFileType(other.to_string())),
    };

    debug!(source = file_name, pages = documents.len(), "loaded file");
    Ok(documents)
}

/// Extract PDF text on a blocking thread and split it into per-page segments
/// at form-feed boundaries when the extractor emits them.
async fn extract_pdf(path: &Path, file_name: &str) -> Result<Vec<Document>> {
    let path = path.to_path_buf();
    let text = tokio::task::spawn_blocking(move || {
        pdf_extract::extract_text(&path).map_err(|e| RagError::ExtractionError {
            format: "pdf".into(),
            message: e.to_string(),
        })
    })
    .await
    .map_err(|e| RagError::ExtractionError { format: "pdf".into(), message: e.to_string() })??;

    if !text.contains('\u{c}') {
        return Ok(vec![make_document(text, file_name, Some(1))]);
    }

    Ok(text
        .split('\u{c}')
        .enumerate()
        .map(|(i, page)| make_document(page.to_string(), file_name, Some(i as u32 + 1)))
        .collect())
}

/// Extract DOCX paragraph text, one segment for the whole file.
async fn extract_docx(path: &Path, file_name: &str) -> Result<Vec<Document>> {
    let bytes = tokio::fs::read(path).await?;
    let docx = read_docx(&bytes).map_err(|e| RagError::ExtractionError {
        format: "docx".into(),
        message: e.to_string(),
    })?;

    let mut paragraphs = Vec::new();
    for child in &docx.document.children {
        if let DocumentChild::Paragraph(paragraph) = child {
            let mut line = String::new();
            for para_child in &paragraph.children {
                if let ParagraphChild::Run(run) = para_child {
                    for run_child in &run.children {
                        if let RunChild::Text(text) = run_child {
                            line.push_str(&text.text);
                        }
                    }
                }
            }
            paragraphs.push(line);
        }
    }

    Ok(vec![make_document(paragraphs.join("\n"), file_name, None)])
}

fn make_document(text: String, file_name: &str, page: Option<u32>) -> Document {
    let mut metadata = HashMap::new();
    metadata.insert("source".to_string(), file_name.to_string());
    if let Some(page) = page {
        metadata.insert("page".to_string(), page.to_string());
    }

    Document { id: String::new(), text, metadata, source_uri: Some(file_name.to_string()), page }
}
