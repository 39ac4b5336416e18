use std::io::Cursor;

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::error::ProcessError;
use crate::processor::bbox::BoundingBox;
use crate::processor::{ItemSource, RawItem};

/// Recognition language requested for a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OcrLanguage {
    Korean,
    English,
}

impl OcrLanguage {
    /// Maps an ISO code to a language; anything unrecognized is English.
    pub fn from_code(code: &str) -> Self {
        match code.trim().to_ascii_lowercase().as_str() {
            "ko" => OcrLanguage::Korean,
            _ => OcrLanguage::English,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            OcrLanguage::Korean => "ko",
            OcrLanguage::English => "en",
        }
    }

    /// Traineddata name used by Tesseract.
    pub fn tesseract_code(&self) -> &'static str {
        match self {
            OcrLanguage::Korean => "kor",
            OcrLanguage::English => "eng",
        }
    }
}

/// One recognized text region as reported by an engine.
#[derive(Debug, Clone, PartialEq)]
pub struct Recognition {
    pub text: String,
    pub score: f32,
    /// Polygon corners in image pixels, any winding.
    pub quad: [(f32, f32); 4],
}

impl Recognition {
    /// Builds a recognition from an axis-aligned rectangle.
    pub fn from_rect(text: impl Into<String>, score: f32, left: f32, top: f32, width: f32, height: f32) -> Self {
        let (right, bottom) = (left + width, top + height);
        Self {
            text: text.into(),
            score,
            quad: [(left, top), (right, top), (right, bottom), (left, bottom)],
        }
    }
}

/// Text recognition over a decoded image.
///
/// Implementations run only on the OCR worker thread, one call at a time.
pub trait OcrEngine: Send + Sync {
    fn recognize(&self, image: &RgbImage, language: OcrLanguage) -> Result<Vec<Recognition>, ProcessError>;
}

/// Runs `engine` over `image` and converts the output into raw items.
///
/// Empty texts are dropped and scores are clamped into [0, 1]. An engine
/// failure yields no items; it is logged and never propagated.
pub fn recognize_items(engine: &dyn OcrEngine, image: &RgbImage, language: OcrLanguage) -> Vec<RawItem> {
    let _span = tracing::info_span!(
        "processor.ocr",
        width = image.width(),
        height = image.height(),
        lang = language.code()
    )
    .entered();

    let recognitions = match engine.recognize(image, language) {
        Ok(r) => r,
        Err(e) => {
            tracing::warn!("OCR failed, continuing without items: {}", e);
            return Vec::new();
        }
    };

    recognitions
        .into_iter()
        .filter_map(|r| {
            let text = r.text.trim();
            if text.is_empty() {
                return None;
            }
            let confidence = if r.score.is_finite() {
                r.score.clamp(0.0, 1.0)
            } else {
                0.0
            };
            Some(RawItem {
                text: text.to_string(),
                bbox: BoundingBox::from_quad(&r.quad),
                confidence,
                source: ItemSource::Ocr,
            })
        })
        .collect()
}

/// Tesseract backend through leptess.
///
/// A fresh `LepTess` handle is created per call; the handle is not `Send`
/// and creation is cheap next to recognition itself.
#[derive(Debug, Clone, Default)]
pub struct TesseractEngine {
    datapath: Option<String>,
}

impl TesseractEngine {
    pub fn new(datapath: Option<String>) -> Self {
        Self { datapath }
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &RgbImage, language: OcrLanguage) -> Result<Vec<Recognition>, ProcessError> {
        let mut png_data = Vec::new();
        image
            .write_to(&mut Cursor::new(&mut png_data), image::ImageFormat::Png)
            .map_err(|e| ProcessError::OcrFailed(format!("Failed to encode image: {}", e)))?;

        let mut lt = leptess::LepTess::new(self.datapath.as_deref(), language.tesseract_code())
            .map_err(|e| ProcessError::EngineUnavailable(format!("Failed to initialize Tesseract: {}", e)))?;

        lt.set_image_from_mem(&png_data)
            .map_err(|e| ProcessError::OcrFailed(format!("Failed to set image for OCR: {}", e)))?;

        let tsv = lt
            .get_tsv_text(0)
            .map_err(|e| ProcessError::OcrFailed(format!("Failed to read OCR output: {}", e)))?;

        Ok(parse_tsv(&tsv))
    }
}

struct LineAccumulator {
    key: (u32, u32, u32, u32),
    words: Vec<String>,
    conf_sum: f32,
    left: f32,
    top: f32,
    right: f32,
    bottom: f32,
}

impl LineAccumulator {
    fn start(word: &TsvWord) -> Self {
        Self {
            key: word.key,
            words: vec![word.text.to_string()],
            conf_sum: word.conf,
            left: word.left,
            top: word.top,
            right: word.left + word.width,
            bottom: word.top + word.height,
        }
    }

    fn push(&mut self, word: &TsvWord) {
        self.words.push(word.text.to_string());
        self.conf_sum += word.conf;
        self.left = self.left.min(word.left);
        self.top = self.top.min(word.top);
        self.right = self.right.max(word.left + word.width);
        self.bottom = self.bottom.max(word.top + word.height);
    }

    fn finish(self) -> Recognition {
        let score = self.conf_sum / self.words.len() as f32 / 100.0;
        Recognition::from_rect(
            self.words.join(" "),
            score,
            self.left,
            self.top,
            self.right - self.left,
            self.bottom - self.top,
        )
    }
}

struct TsvWord<'a> {
    key: (u32, u32, u32, u32),
    left: f32,
    top: f32,
    width: f32,
    height: f32,
    conf: f32,
    text: &'a str,
}

fn parse_word(line: &str) -> Option<TsvWord<'_>> {
    let cols: Vec<&str> = line.splitn(12, '\t').collect();
    if cols.len() != 12 || cols[0] != "5" {
        return None;
    }
    let num = |i: usize| cols[i].trim().parse::<u32>().ok();
    let float = |i: usize| cols[i].trim().parse::<f32>().ok();
    let conf = float(10)?;
    let text = cols[11].trim();
    if conf < 0.0 || text.is_empty() {
        return None;
    }
    Some(TsvWord {
        key: (num(1)?, num(2)?, num(3)?, num(4)?),
        left: float(6)?,
        top: float(7)?,
        width: float(8)?,
        height: float(9)?,
        conf,
        text,
    })
}

/// Groups Tesseract TSV word rows into one recognition per text line.
///
/// Rows that do not have the 12 expected columns or carry no confidence
/// are skipped.
pub fn parse_tsv(tsv: &str) -> Vec<Recognition> {
    let mut lines = Vec::new();
    let mut current: Option<LineAccumulator> = None;

    for word in tsv.lines().filter_map(parse_word) {
        if let Some(acc) = current.as_mut() {
            if acc.key == word.key {
                acc.push(&word);
                continue;
            }
        }
        if let Some(done) = current.take() {
            lines.push(done.finish());
        }
        current = Some(LineAccumulator::start(&word));
    }
    if let Some(done) = current {
        lines.push(done.finish());
    }
    lines
}
