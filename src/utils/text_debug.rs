// src/utils/text_debug.rs
use std::fs::File;
use std::io::Write;
use std::path::Path;
use regex::Regex;
use crate::utils::error::StorageError;

/// Saves extracted text to a file, wrapping each highlighted span as `[[kind:...]]`.
/// Overlapping spans are skipped so the output stays readable.
pub fn save_debug_text(text: &str, path: &Path, highlights: &[(usize, usize, &str)]) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;

    let mut annotated = String::with_capacity(text.len() + highlights.len() * 16);
    let mut last_pos = 0;
    let mut sorted_highlights = highlights.to_vec();
    sorted_highlights.sort_by_key(|h| h.0); // Sort by position

    for (start, end, kind) in sorted_highlights {
        if start < last_pos || end > text.len() {
            continue;
        }
        annotated.push_str(&text[last_pos..start]);
        annotated.push_str(&format!("[[{}:{}]]", kind, &text[start..end]));
        last_pos = end;
    }

    if last_pos < text.len() {
        annotated.push_str(&text[last_pos..]);
    }

    file.write_all(annotated.as_bytes())?;

    tracing::info!("Saved debug text to {}", path.display());
    Ok(())
}

/// Annotates every match of the given `(pattern, kind)` pairs and saves the result.
pub fn create_debug_text(text: &str, path: &Path, patterns: &[(&str, &str)]) -> Result<(), StorageError> {
    let mut highlights = Vec::new();

    for (pattern, kind) in patterns {
        let re = Regex::new(pattern).map_err(|e| {
            StorageError::SerializationError(format!("Invalid regex pattern '{}': {}", pattern, e))
        })?;

        for mat in re.find_iter(text) {
            highlights.push((mat.start(), mat.end(), *kind));
        }
    }

    save_debug_text(text, path, &highlights)
}
