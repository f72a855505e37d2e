//! File adapter: uploaded documents to text records.
//!
//! Formats are recognized by a closed [`DocumentFormat`] tag, not by ad hoc
//! suffix comparisons; anything outside the table lands on
//! [`DocumentFormat::Unsupported`] and is skipped with a warning. Extractors
//! prefer partial text over hard failure where the underlying parser allows.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use calamine::Reader;
use tracing::warn;

use super::{AdapterOutput, RawRecord};
use crate::scratch::ScratchWorkspace;
use crate::types::RagError;

/// Recognized upload formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DocumentFormat {
    Pdf,
    Docx,
    Xlsx,
    Csv,
    Txt,
    Unsupported,
}

impl DocumentFormat {
    pub fn from_path(path: &Path) -> Self {
        let Some(extension) = path.extension().and_then(|ext| ext.to_str()) else {
            return Self::Unsupported;
        };
        match extension.to_ascii_lowercase().as_str() {
            "pdf" => Self::Pdf,
            "docx" | "doc" => Self::Docx,
            "xlsx" => Self::Xlsx,
            "csv" => Self::Csv,
            "txt" => Self::Txt,
            _ => Self::Unsupported,
        }
    }
}

/// Stages uploads into scratch storage and extracts their text.
pub struct FileSource<'a> {
    scratch: &'a ScratchWorkspace,
}

impl<'a> FileSource<'a> {
    pub fn new(scratch: &'a ScratchWorkspace) -> Self {
        Self { scratch }
    }

    /// Loads each file into one record. Unsupported formats and failed
    /// extractions are skipped; neither aborts the remaining files.
    pub async fn load_files(&self, paths: &[PathBuf]) -> AdapterOutput {
        let mut output = AdapterOutput::default();

        for path in paths {
            let format = DocumentFormat::from_path(path);
            if format == DocumentFormat::Unsupported {
                warn!(path = %path.display(), "skipping unsupported file format");
                continue;
            }

            match self.load_file(path, format).await {
                Ok(record) => {
                    output.records.push(record);
                    output.sources_processed += 1;
                }
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable file");
                }
            }
        }

        output
    }

    async fn load_file(&self, path: &Path, format: DocumentFormat) -> Result<RawRecord, RagError> {
        let staged = self.stage(path).await?;
        let data = tokio::fs::read(&staged).await?;
        let text = extract_text(&data, format)?;
        if text.trim().is_empty() {
            return Err(RagError::Extraction(format!(
                "no text content in {}",
                path.display()
            )));
        }

        let source_id = path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("upload")
            .to_string();
        Ok(RawRecord::new(source_id, text))
    }

    /// Copies the upload into scratch so extraction never touches the
    /// caller's file, mirroring how uploads arrive as transient copies.
    async fn stage(&self, path: &Path) -> Result<PathBuf, RagError> {
        let uploads = self.scratch.subdir("uploads").await?;
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .unwrap_or("bin");
        let staged = uploads.join(format!("{}.{extension}", uuid::Uuid::new_v4()));
        tokio::fs::copy(path, &staged).await?;
        Ok(staged)
    }
}

/// Dispatches raw bytes to the extractor for `format`.
pub fn extract_text(data: &[u8], format: DocumentFormat) -> Result<String, RagError> {
    match format {
        DocumentFormat::Pdf => extract_pdf(data),
        DocumentFormat::Docx => extract_docx(data),
        DocumentFormat::Xlsx => extract_xlsx(data),
        DocumentFormat::Csv => extract_csv(data),
        DocumentFormat::Txt => Ok(String::from_utf8_lossy(data).into_owned()),
        DocumentFormat::Unsupported => Err(RagError::UnsupportedFormat(
            "no extractor for this format".to_string(),
        )),
    }
}

fn extract_pdf(data: &[u8]) -> Result<String, RagError> {
    let text = pdf_extract::extract_text_from_mem(data)
        .map_err(|err| RagError::Extraction(err.to_string()))?;
    let cleaned = text
        .replace('\0', "")
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n");
    Ok(cleaned)
}

fn extract_docx(data: &[u8]) -> Result<String, RagError> {
    let docx = docx_rs::read_docx(data).map_err(|err| RagError::Extraction(err.to_string()))?;

    let mut text = String::new();
    for child in docx.document.children {
        if let docx_rs::DocumentChild::Paragraph(paragraph) = child {
            for child in paragraph.children {
                if let docx_rs::ParagraphChild::Run(run) = child {
                    for child in run.children {
                        if let docx_rs::RunChild::Text(t) = child {
                            text.push_str(&t.text);
                        }
                    }
                }
            }
            text.push('\n');
        }
    }
    Ok(text)
}

fn extract_xlsx(data: &[u8]) -> Result<String, RagError> {
    let cursor = Cursor::new(data.to_vec());
    let mut workbook = calamine::open_workbook_auto_from_rs(cursor)
        .map_err(|err| RagError::Extraction(err.to_string()))?;

    let mut text = String::new();
    for sheet_name in workbook.sheet_names().to_vec() {
        let Ok(range) = workbook.worksheet_range(&sheet_name) else {
            continue;
        };
        text.push_str(&format!("Sheet: {sheet_name}\n"));
        for row in range.rows() {
            let cells: Vec<String> = row
                .iter()
                .map(|cell| match cell {
                    calamine::Data::Empty => String::new(),
                    calamine::Data::String(s) => s.clone(),
                    calamine::Data::Float(f) => f.to_string(),
                    calamine::Data::Int(i) => i.to_string(),
                    calamine::Data::Bool(b) => b.to_string(),
                    calamine::Data::DateTime(dt) => dt.to_string(),
                    other => other.to_string(),
                })
                .collect();
            if cells.iter().any(|cell| !cell.is_empty()) {
                text.push_str(&cells.join(" | "));
                text.push('\n');
            }
        }
    }
    Ok(text)
}

fn extract_csv(data: &[u8]) -> Result<String, RagError> {
    let mut reader = csv::Reader::from_reader(data);
    let mut text = String::new();

    if let Ok(headers) = reader.headers() {
        text.push_str(&headers.iter().collect::<Vec<_>>().join(" | "));
        text.push('\n');
    }
    // Malformed rows are dropped, not the whole file.
    for record in reader.records().flatten() {
        text.push_str(&record.iter().collect::<Vec<_>>().join(" | "));
        text.push('\n');
    }
    Ok(text)
}
