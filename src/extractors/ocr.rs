// src/extractors/ocr.rs
use std::path::{Path, PathBuf};
use std::process::Command;
use crate::utils::error::ExtractError;

// Tesseract TSV row level for a single word.
const TSV_WORD_LEVEL: &str = "5";
const RASTER_DPI: &str = "300";

/// One recognized line, words in reading order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrLine {
    pub words: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrBlock {
    pub lines: Vec<OcrLine>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OcrPage {
    pub blocks: Vec<OcrBlock>,
}

/// Text recognizer for image-only PDFs.
pub trait OcrEngine: Send + Sync + 'static {
    fn recognize(&self, pdf_path: &Path) -> Result<Vec<OcrPage>, ExtractError>;
}

/// Rasterizes with Poppler's `pdftoppm` and recognizes with `tesseract`.
pub struct TesseractOcr {
    language: String,
}

impl TesseractOcr {
    pub fn new(language: impl Into<String>) -> Self {
        Self { language: language.into() }
    }

    fn rasterize(&self, pdf_path: &Path, out_dir: &Path) -> Result<Vec<PathBuf>, ExtractError> {
        let prefix = out_dir.join("page");
        let output = Command::new("pdftoppm")
            .arg("-r").arg(RASTER_DPI)
            .arg("-png")
            .arg(pdf_path)
            .arg(&prefix)
            .output()
            .map_err(|e| ExtractError::Ocr(format!("pdftoppm failed to start: {}", e)))?;

        if !output.status.success() {
            return Err(ExtractError::Ocr(format!(
                "pdftoppm failed for {}: {}",
                pdf_path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        // pdftoppm zero-pads page numbers depending on page count: page-1.png or page-01.png
        let mut images: Vec<(u32, PathBuf)> = std::fs::read_dir(out_dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter_map(|path| {
                let stem = path.file_stem()?.to_str()?;
                let number = stem.strip_prefix("page-")?.parse::<u32>().ok()?;
                Some((number, path))
            })
            .collect();
        images.sort_by_key(|(number, _)| *number);
        Ok(images.into_iter().map(|(_, path)| path).collect())
    }

    fn recognize_image(&self, image: &Path) -> Result<OcrPage, ExtractError> {
        let output = Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .arg("-l").arg(&self.language)
            .arg("tsv")
            .output()
            .map_err(|e| ExtractError::Ocr(format!("tesseract failed to start: {}", e)))?;

        if !output.status.success() {
            return Err(ExtractError::Ocr(format!(
                "tesseract failed for {}: {}",
                image.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        Ok(parse_tsv_page(&String::from_utf8_lossy(&output.stdout)))
    }
}

impl Default for TesseractOcr {
    fn default() -> Self {
        Self::new("eng")
    }
}

impl OcrEngine for TesseractOcr {
    fn recognize(&self, pdf_path: &Path) -> Result<Vec<OcrPage>, ExtractError> {
        let scratch = tempfile::tempdir()?;
        let images = self.rasterize(pdf_path, scratch.path())?;
        tracing::debug!("Rasterized {} pages of {} for OCR", images.len(), pdf_path.display());

        images.iter().map(|image| self.recognize_image(image)).collect()
    }
}

/// Groups tesseract TSV word rows into blocks and lines, keeping row order.
///
/// Columns: level page_num block_num par_num line_num word_num left top width height conf text
pub fn parse_tsv_page(tsv: &str) -> OcrPage {
    let mut page = OcrPage::default();
    let mut current_block: Option<String> = None;
    let mut current_line: Option<(String, String)> = None;

    for row in tsv.lines().skip(1) {
        let cols: Vec<&str> = row.split('\t').collect();
        if cols.len() < 12 || cols[0] != TSV_WORD_LEVEL {
            continue;
        }
        let word = cols[11].trim();
        if word.is_empty() {
            continue;
        }
        let block_key = cols[2].to_string();
        let line_key = (cols[3].to_string(), cols[4].to_string());

        if current_block.as_ref() != Some(&block_key) {
            page.blocks.push(OcrBlock::default());
            current_block = Some(block_key);
            current_line = None;
        }
        // A block was pushed above if none existed yet.
        let Some(block) = page.blocks.last_mut() else { continue };
        if current_line.as_ref() != Some(&line_key) {
            block.lines.push(OcrLine::default());
            current_line = Some(line_key);
        }
        if let Some(line) = block.lines.last_mut() {
            line.words.push(word.to_string());
        }
    }

    page
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_TSV: &str = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t2480\t3508\t-1\t
2\t1\t1\t0\t0\t0\t200\t180\t900\t60\t-1\t
3\t1\t1\t1\t0\t0\t200\t180\t900\t60\t-1\t
4\t1\t1\t1\t1\t0\t200\t180\t900\t60\t-1\t
5\t1\t1\t1\t1\t1\t200\t180\t200\t60\t96.1\tAsian
5\t1\t1\t1\t1\t2\t420\t180\t200\t60\t95.3\tPaints
5\t1\t1\t1\t1\t3\t640\t180\t260\t60\t94.8\tLimited
4\t1\t1\t1\t2\t0\t200\t260\t600\t60\t-1\t
5\t1\t1\t1\t2\t1\t200\t260\t300\t60\t91.0\tEarnings
5\t1\t1\t1\t2\t2\t520\t260\t100\t60\t90.2\tCall
2\t1\t2\t0\t0\t0\t200\t400\t400\t60\t-1\t
5\t1\t2\t1\t1\t1\t200\t400\t100\t60\t93.0\tQ1
5\t1\t2\t1\t1\t2\t320\t400\t200\t60\t92.5\tFY2023
5\t1\t2\t1\t1\t3\t540\t400\t20\t60\t10.0\t ";

    #[test]
    fn test_parse_tsv_groups_blocks_and_lines() {
        let page = parse_tsv_page(SAMPLE_TSV);

        assert_eq!(page.blocks.len(), 2);
        assert_eq!(page.blocks[0].lines.len(), 2);
        assert_eq!(page.blocks[0].lines[0].words, vec!["Asian", "Paints", "Limited"]);
        assert_eq!(page.blocks[0].lines[1].words, vec!["Earnings", "Call"]);
        assert_eq!(page.blocks[1].lines[0].words, vec!["Q1", "FY2023"]);
    }

    #[test]
    fn test_parse_empty_tsv() {
        assert_eq!(parse_tsv_page(""), OcrPage::default());
        assert_eq!(parse_tsv_page("level\tpage_num\n"), OcrPage::default());
    }
}
