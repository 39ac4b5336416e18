//! Turns extractor output into the persisted result model.
//!
//! PII detection runs over each page's item texts first, then OCR boxes are
//! clamped into the page. Text-layer items keep their zero box.

use serde::{Deserialize, Serialize};

use crate::pii::PiiDetector;
use crate::processor::bbox::normalize;
use crate::processor::{BoundingBox, ItemSource, PageDraft};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub text: String,
    pub bbox: BoundingBox,
    pub confidence: f32,
    pub is_sensitive: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub masked_text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub page_index: u32,
    pub width: u32,
    pub height: u32,
    pub items: Vec<Item>,
}

/// Everything extracted from one document, pages in index order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DocumentResult {
    pub pages: Vec<Page>,
}

impl DocumentResult {
    pub fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    pub fn item_count(&self) -> usize {
        self.pages.iter().map(|p| p.items.len()).sum()
    }

    pub fn sensitive_items(&self) -> impl Iterator<Item = &Item> {
        self.pages.iter().flat_map(|p| p.items.iter()).filter(|i| i.is_sensitive)
    }
}

fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_finite() {
        confidence.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

pub fn fuse_page(draft: PageDraft, detector: &PiiDetector) -> Page {
    let verdicts = {
        let texts: Vec<&str> = draft.items.iter().map(|i| i.text.as_str()).collect();
        detector.detect(&texts)
    };

    let items = draft
        .items
        .into_iter()
        .zip(verdicts)
        .map(|(raw, verdict)| {
            let bbox = match raw.source {
                ItemSource::Ocr => normalize(raw.bbox, draft.width, draft.height),
                ItemSource::TextLayer => raw.bbox,
            };
            Item {
                text: raw.text,
                bbox,
                confidence: clamp_confidence(raw.confidence),
                is_sensitive: verdict.is_sensitive(),
                masked_text: verdict.masked_text().map(str::to_string),
            }
        })
        .collect();

    Page {
        page_index: draft.page_index,
        width: draft.width,
        height: draft.height,
        items,
    }
}

pub fn fuse_document(drafts: Vec<PageDraft>, detector: &PiiDetector) -> DocumentResult {
    DocumentResult {
        pages: drafts.into_iter().map(|d| fuse_page(d, detector)).collect(),
    }
}
