// src/extractors/mod.rs
pub mod ocr;
pub mod period;
pub mod text;

// Re-export key extraction types for convenience
pub use ocr::{OcrEngine, TesseractOcr};
pub use period::{parse_fiscal_period, FiscalPeriod, Quarter};
pub use text::TextExtractor;
