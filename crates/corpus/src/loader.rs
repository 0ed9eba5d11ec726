//! Reads owner-authored documents from the data directory.

use std::path::{Path, PathBuf};

use doppel_core::{CorpusError, Document};
use tracing::{debug, info};

const EXTENSIONS: &[&str] = &["txt", "md"];

/// Load every `*.txt` and `*.md` file in `dir`, sorted by file name.
///
/// Blank documents are skipped. A missing directory, an unreadable file, or
/// a directory with nothing usable in it is an error: the persona has no
/// content to speak from.
pub fn load(dir: &Path) -> Result<Vec<Document>, CorpusError> {
    let entries = std::fs::read_dir(dir).map_err(|e| CorpusError::Unavailable {
        path: dir.to_path_buf(),
        reason: e.to_string(),
    })?;

    let mut paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && has_corpus_extension(p))
        .collect();
    paths.sort();

    let mut documents = Vec::with_capacity(paths.len());
    for path in paths {
        let text = std::fs::read_to_string(&path).map_err(|e| CorpusError::Read {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        if text.trim().is_empty() {
            debug!(path = %path.display(), "Skipping empty document");
            continue;
        }

        let label = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        documents.push(Document { label, text });
    }

    if documents.is_empty() {
        return Err(CorpusError::Unavailable {
            path: dir.to_path_buf(),
            reason: "no non-empty .txt or .md documents".into(),
        });
    }

    info!(dir = %dir.display(), documents = documents.len(), "Corpus loaded");
    Ok(documents)
}

fn has_corpus_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| EXTENSIONS.iter().any(|x| e.eq_ignore_ascii_case(x)))
}
