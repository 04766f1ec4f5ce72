// src/extractors/text.rs
use lopdf::Document;
use std::path::Path;
use std::sync::Arc;
use crate::extractors::ocr::{OcrEngine, OcrPage};
use crate::utils::error::ExtractError;

pub const DEFAULT_MAX_PAGES: usize = 2;

/// Pulls plain text from the first pages of a PDF, falling back to OCR
/// when the document carries no text layer.
pub struct TextExtractor {
    max_pages: usize,
    ocr: Arc<dyn OcrEngine>,
}

impl TextExtractor {
    pub fn new(max_pages: usize, ocr: Arc<dyn OcrEngine>) -> Self {
        Self { max_pages, ocr }
    }

    pub fn extract(&self, pdf_path: &Path) -> Result<String, ExtractError> {
        let text = self.extract_text_layer(pdf_path)?;
        if !text.trim().is_empty() {
            tracing::debug!("Extracted {} chars of embedded text from {}", text.len(), pdf_path.display());
            return Ok(text);
        }

        tracing::info!("No embedded text in {}, falling back to OCR", pdf_path.display());
        let pages = self.ocr.recognize(pdf_path)?;
        let text = flatten_ocr_pages(&pages);
        tracing::debug!("OCR produced {} chars for {}", text.len(), pdf_path.display());
        Ok(text)
    }

    /// Text of pages `1..=max_pages`, each followed by a newline.
    /// A page whose text cannot be decoded contributes an empty string.
    fn extract_text_layer(&self, pdf_path: &Path) -> Result<String, ExtractError> {
        let document = Document::load(pdf_path)?;
        let page_numbers: Vec<u32> = document.get_pages().keys().copied().take(self.max_pages).collect();

        let mut text = String::new();
        for page_number in page_numbers {
            match document.extract_text(&[page_number]) {
                Ok(page_text) => text.push_str(&page_text),
                Err(e) => {
                    tracing::debug!("Page {} of {} yielded no text: {}", page_number, pdf_path.display(), e);
                }
            }
            text.push('\n');
        }
        Ok(text)
    }
}

/// Words of a line joined by single spaces, lines joined by newlines,
/// in page -> block -> line order.
pub fn flatten_ocr_pages(pages: &[OcrPage]) -> String {
    pages
        .iter()
        .flat_map(|page| page.blocks.iter())
        .flat_map(|block| block.lines.iter())
        .map(|line| line.words.join(" "))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Synthetic PDFs for tests across the crate.
#[cfg(test)]
pub(crate) mod test_pdf {
    use lopdf::content::{Content, Operation};
    use lopdf::{dictionary, Document, Object, Stream};
    use std::path::Path;

    /// Writes a PDF with one page per entry; each line becomes a text run.
    /// An empty slice produces a page with no text layer.
    pub fn write_pdf(path: &Path, pages: &[&[&str]]) {
        let contents: Vec<(Vec<u8>, bool)> = pages.iter().map(|lines| (text_content(lines), true)).collect();
        write_pages(path, &contents);
    }

    /// Like `write_pdf`, but the first page gets `raw` as its content stream
    /// and no resources, so its text cannot be decoded.
    pub fn write_pdf_with_broken_first_page(path: &Path, raw: &[u8], pages: &[&[&str]]) {
        let mut contents = vec![(raw.to_vec(), false)];
        contents.extend(pages.iter().map(|lines| (text_content(lines), true)));
        write_pages(path, &contents);
    }

    fn text_content(lines: &[&str]) -> Vec<u8> {
        let mut operations = Vec::new();
        for (i, line) in lines.iter().enumerate() {
            operations.push(Operation::new("BT", vec![]));
            operations.push(Operation::new("Tf", vec!["F1".into(), 12.into()]));
            operations.push(Operation::new("Td", vec![72.into(), (720 - 20 * i as i64).into()]));
            operations.push(Operation::new("Tj", vec![Object::string_literal(*line)]));
            operations.push(Operation::new("ET", vec![]));
        }
        Content { operations }.encode().unwrap()
    }

    fn write_pages(path: &Path, pages: &[(Vec<u8>, bool)]) {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
            "Encoding" => "WinAnsiEncoding",
        });
        let resources_id = doc.add_object(dictionary! {
            "Font" => dictionary! {
                "F1" => font_id,
            },
        });

        let mut kids: Vec<Object> = Vec::new();
        for (content, with_resources) in pages {
            let content_id = doc.add_object(Stream::new(dictionary! {}, content.clone()));
            let mut page = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Contents" => content_id,
            };
            if *with_resources {
                page.set("Resources", resources_id);
            }
            kids.push(doc.add_object(page).into());
        }

        let page_count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => page_count,
                "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);
        doc.save(path).unwrap();
    }
}
