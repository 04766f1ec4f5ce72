// src/storage/mod.rs
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use serde::Serialize;
use crate::extractors::Quarter;
use crate::roster::TickerRecord;
use crate::utils::error::StorageError;

/// Audit record written next to each validated transcript.
#[derive(Debug, Clone, Serialize)]
pub struct TranscriptMetadata {
    pub ticker: String,
    pub company_name: String,
    pub quarter: u8,
    pub fiscal_year: u16,
    pub source_url: Option<String>,
    pub company_response: String,
    pub period_response: String,
    pub validated_at: String,
}

/// Owns the on-disk layout: `{base}/{ticker}/` holds downloads and validated files.
pub struct StorageManager {
    base_dir: PathBuf,
}

impl StorageManager {
    /// Creates a new StorageManager with the specified base directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self, StorageError> {
        let base_path = base_dir.as_ref().to_path_buf();

        // Create the base directory if it doesn't exist
        if !base_path.exists() {
            fs::create_dir_all(&base_path)
                .map_err(StorageError::IoError)?;
        }

        Ok(Self { base_dir: base_path })
    }

    pub fn ticker_dir(&self, ticker: &str) -> PathBuf {
        self.base_dir.join(file_safe(ticker))
    }

    pub fn debug_dir(&self, ticker: &str) -> PathBuf {
        self.ticker_dir(ticker).join("debug")
    }

    /// Download target for one search result. Year and rank keep names unique
    /// across (ticker, year) pairs, so a worker still running after its pair
    /// timed out cannot overwrite the next pair's downloads.
    pub fn temp_path(&self, record: &TickerRecord, year: u16, rank: usize) -> PathBuf {
        self.ticker_dir(&record.ticker).join(format!(
            "{}_FY{}_r{}_temp.pdf",
            file_safe(&record.company_name),
            year,
            rank
        ))
    }

    pub fn canonical_path(&self, record: &TickerRecord, quarter: Quarter, fiscal_year: u16) -> PathBuf {
        self.ticker_dir(&record.ticker)
            .join(canonical_file_name(&record.company_name, quarter, fiscal_year))
    }

    /// Moves `src` to `dest`, replacing whatever is already there.
    pub fn promote(&self, src: &Path, dest: &Path) -> Result<(), StorageError> {
        if dest.exists() {
            tracing::info!("Replacing existing file {}", dest.display());
            fs::remove_file(dest)?;
        }
        fs::rename(src, dest)?;
        Ok(())
    }

    /// Removes a file; a file that is already gone is not an error.
    pub fn discard(&self, path: &Path) -> Result<(), StorageError> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::IoError(e)),
        }
    }

    /// Saves metadata as `{stem}.json` beside the transcript.
    pub fn save_metadata(&self, transcript: &Path, metadata: &TranscriptMetadata) -> Result<PathBuf, StorageError> {
        let file_path = transcript.with_extension("json");

        let metadata_str = serde_json::to_string_pretty(metadata)
            .map_err(|e| StorageError::SerializationError(e.to_string()))?;

        fs::write(&file_path, metadata_str)
            .map_err(StorageError::IoError)?;

        tracing::debug!("Saved metadata to {}", file_path.display());

        Ok(file_path)
    }
}

/// `{company}_Q{n}_FY{year}.pdf`
pub fn canonical_file_name(company_name: &str, quarter: Quarter, fiscal_year: u16) -> String {
    format!("{}_Q{}_FY{}.pdf", file_safe(company_name), quarter, fiscal_year)
}

// Path separators would otherwise turn a company name into nested directories.
fn file_safe(name: &str) -> String {
    name.chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '-',
            _ => c,
        })
        .collect()
}
