pub mod bbox;
pub mod image;
pub mod ocr;
pub mod pdf;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub use bbox::BoundingBox;
pub use ocr::{OcrEngine, OcrLanguage, Recognition, TesseractEngine};

/// Extraction strategy chosen from the upload's file extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentFormat {
    Pdf,
    Image,
}

impl DocumentFormat {
    /// Accepts `pdf`, `png`, `jpg` and `jpeg`, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "pdf" => Some(Self::Pdf),
            "png" | "jpg" | "jpeg" => Some(Self::Image),
            _ => None,
        }
    }
}

/// Where an extracted item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemSource {
    /// Native PDF text; carries no position.
    TextLayer,
    /// Recognized from pixels; carries an image-space box.
    Ocr,
}

/// An extracted text region before PII detection and box clamping.
#[derive(Debug, Clone, PartialEq)]
pub struct RawItem {
    pub text: String,
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub source: ItemSource,
}

impl RawItem {
    /// A native text-layer run: full confidence, zero box.
    pub fn text_layer(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bbox: BoundingBox::ZERO,
            confidence: 1.0,
            source: ItemSource::TextLayer,
        }
    }
}

/// One page of extractor output.
#[derive(Debug, Clone, PartialEq)]
pub struct PageDraft {
    pub page_index: u32,
    pub width: u32,
    pub height: u32,
    pub items: Vec<RawItem>,
}

/// Turns document bytes into page drafts.
///
/// Extraction never fails outright: unreadable inputs produce fewer pages
/// or items and a warning in the log.
#[derive(Clone)]
pub struct DocumentExtractor {
    engine: Arc<dyn OcrEngine>,
    dpi: u32,
}

impl DocumentExtractor {
    pub fn new(engine: Arc<dyn OcrEngine>, dpi: u32) -> Self {
        Self { engine, dpi }
    }

    pub fn extract(&self, bytes: &[u8], format: DocumentFormat, language: OcrLanguage) -> Vec<PageDraft> {
        match format {
            DocumentFormat::Image => image::extract_image(bytes, self.engine.as_ref(), language),
            DocumentFormat::Pdf => pdf::extract_pdf(bytes, self.dpi, self.engine.as_ref(), language),
        }
    }
}
