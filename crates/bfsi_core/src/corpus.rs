use std::fs;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{PipelineError, Result};

/// One source document, concatenated per file. `source_id` is the file name.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceDocument {
    pub source_id: String,
    pub text: String,
}

/// Loads every `.txt`/`.md` (UTF-8) and `.pdf` file from the corpus
/// directory, in file-name order so a rebuild over unchanged input is
/// reproducible. Files that fail to read or parse are skipped with a
/// warning; other extensions are ignored. A missing directory is fatal:
/// the builder cannot run without a corpus.
pub fn load_documents(dir: &Path) -> Result<Vec<SourceDocument>> {
    if !dir.is_dir() {
        return Err(PipelineError::Corpus(format!(
            "data directory {} not found",
            dir.display()
        )));
    }

    let mut paths: Vec<_> = fs::read_dir(dir)?
        .collect::<std::io::Result<Vec<_>>>()?
        .into_iter()
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();
    paths.sort();

    let mut documents = Vec::new();
    for path in paths {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_ascii_lowercase();

        let text = match extension.as_str() {
            "txt" | "md" => match fs::read_to_string(&path) {
                Ok(text) => text,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unreadable text file");
                    continue;
                }
            },
            "pdf" => match read_pdf(&path) {
                Ok(text) => text,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "skipping unparseable pdf");
                    continue;
                }
            },
            _ => continue,
        };

        if text.trim().is_empty() {
            continue;
        }

        let source_id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        debug!(source_id = %source_id, chars = text.chars().count(), "loaded document");
        documents.push(SourceDocument { source_id, text });
    }

    Ok(documents)
}

fn read_pdf(path: &Path) -> Result<String> {
    let document = lopdf::Document::load(path)
        .map_err(|e| PipelineError::Corpus(format!("load {}: {e}", path.display())))?;
    let pages: Vec<u32> = document.get_pages().keys().copied().collect();
    document
        .extract_text(&pages)
        .map_err(|e| PipelineError::Corpus(format!("extract {}: {e}", path.display())))
}
