use image::{DynamicImage, GrayImage, ImageFormat, RgbImage};
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};

use crate::error::ProcessError;
use crate::processor::ocr::{recognize_items, OcrEngine, OcrLanguage};
use crate::processor::{PageDraft, RawItem};

/// US Letter in points, used when a page declares no box at all.
const DEFAULT_PAGE_SIZE_PT: (f32, f32) = (612.0, 792.0);

/// Pattern lopdf emits for CID fonts it cannot map.
const IDENTITY_H_PATTERN: &str = "?Identity-H Unimplemented?";

/// Guards against cyclic `Parent` chains in malformed files.
const MAX_INHERITANCE_DEPTH: usize = 32;

/// A `TJ` adjustment more negative than this (in thousandths of text space)
/// is rendered as a word gap.
const TJ_SPACE_THRESHOLD: f32 = -200.0;

/// Extracts every page of a PDF in document order.
///
/// Each page yields its native text runs (confidence 1.0, zero box) followed
/// by the OCR items of each embedded image. A PDF that cannot be parsed
/// yields no pages.
pub fn extract_pdf(bytes: &[u8], dpi: u32, engine: &dyn OcrEngine, language: OcrLanguage) -> Vec<PageDraft> {
    let _span = tracing::info_span!("processor.pdf", bytes = bytes.len(), dpi).entered();

    let doc = match Document::load_mem(bytes) {
        Ok(doc) => doc,
        Err(e) => {
            tracing::warn!("Failed to load PDF, no pages extracted: {}", e);
            return Vec::new();
        }
    };

    let mut pages = Vec::new();

    for (index, (page_number, page_id)) in doc.get_pages().into_iter().enumerate() {
        let _page_span = tracing::debug_span!("processor.pdf.page", page = page_number).entered();

        let (width_pt, height_pt) = page_size(&doc, page_id).unwrap_or(DEFAULT_PAGE_SIZE_PT);

        let mut items: Vec<RawItem> = page_text_runs(&doc, page_id, page_number)
            .into_iter()
            .map(RawItem::text_layer)
            .collect();

        for (name, stream) in page_images(&doc, page_id) {
            match decode_embedded_image(stream) {
                Ok(rgb) => items.extend(recognize_items(engine, &rgb, language)),
                Err(e) => tracing::warn!(image = %name, "Skipping embedded image: {}", e),
            }
        }

        pages.push(PageDraft {
            page_index: index as u32,
            width: points_to_pixels(width_pt, dpi),
            height: points_to_pixels(height_pt, dpi),
            items,
        });
    }

    pages
}

/// Truncating conversion from PDF points (1/72 inch) to pixels at `dpi`.
fn points_to_pixels(points: f32, dpi: u32) -> u32 {
    (points as f64 * dpi as f64 / 72.0) as u32
}

fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        other => Some(other),
    }
}

/// Looks `key` up on the page, then on its ancestors in the page tree.
fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut dict = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_INHERITANCE_DEPTH {
        if let Ok(obj) = dict.get(key) {
            return resolve(doc, obj);
        }
        let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
        dict = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn number(obj: &Object) -> Option<f32> {
    match obj {
        Object::Integer(i) => Some(*i as f32),
        Object::Real(r) => Some(*r as f32),
        _ => None,
    }
}

/// Clockwise page rotation in degrees, normalized to `0..360`.
fn page_rotation(doc: &Document, page_id: ObjectId) -> i64 {
    inherited(doc, page_id, b"Rotate")
        .and_then(|o| o.as_i64().ok())
        .map(|r| r.rem_euclid(360))
        .unwrap_or(0)
}

/// Displayed page size in points: CropBox, else MediaBox, with width and
/// height swapped for pages rotated a quarter turn.
fn page_size(doc: &Document, page_id: ObjectId) -> Option<(f32, f32)> {
    let rect = inherited(doc, page_id, b"CropBox").or_else(|| inherited(doc, page_id, b"MediaBox"))?;
    let coords: Vec<f32> = rect
        .as_array()
        .ok()?
        .iter()
        .filter_map(|o| resolve(doc, o).and_then(number))
        .collect();
    if coords.len() != 4 {
        return None;
    }
    let (width, height) = ((coords[2] - coords[0]).abs(), (coords[3] - coords[1]).abs());
    match page_rotation(doc, page_id) {
        90 | 270 => Some((height, width)),
        _ => Some((width, height)),
    }
}

/// Decodes a PDF string operand: UTF-16BE with BOM, UTF-8, else Latin-1.
fn decode_pdf_string(bytes: &[u8]) -> String {
    if let Some(rest) = bytes.strip_prefix(&[0xFE, 0xFF]) {
        let units: Vec<u16> = rest
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16_lossy(&units);
    }
    match std::str::from_utf8(bytes) {
        Ok(s) => s.to_string(),
        Err(_) => bytes.iter().map(|&b| b as char).collect(),
    }
}

fn is_garbled(text: &str) -> bool {
    text.contains(IDENTITY_H_PATTERN)
        || text
            .chars()
            .any(|c| c == char::REPLACEMENT_CHARACTER || (c.is_control() && !c.is_whitespace()))
}

#[derive(Default)]
struct RunCollector {
    runs: Vec<String>,
    current: String,
}

impl RunCollector {
    fn push(&mut self, bytes: &[u8]) {
        self.current.push_str(&decode_pdf_string(bytes));
    }

    fn flush(&mut self) {
        let text = self.current.trim();
        if !text.is_empty() {
            self.runs.push(text.to_string());
        }
        self.current.clear();
    }
}

fn string_operand(obj: Option<&Object>) -> Option<&[u8]> {
    match obj {
        Some(Object::String(bytes, _)) => Some(bytes),
        _ => None,
    }
}

/// Reads text-showing operators from the page content stream.
///
/// A run ends at any positioning operator, a font change or `ET`.
fn content_runs(doc: &Document, page_id: ObjectId) -> Result<Vec<String>, ProcessError> {
    let data = doc
        .get_page_content(page_id)
        .map_err(|e| ProcessError::PdfProcessing(format!("Failed to read page content: {}", e)))?;
    let content = Content::decode(&data)
        .map_err(|e| ProcessError::PdfProcessing(format!("Failed to decode page content: {}", e)))?;

    let mut collector = RunCollector::default();
    for op in &content.operations {
        match op.operator.as_str() {
            "Tj" => {
                if let Some(bytes) = string_operand(op.operands.first()) {
                    collector.push(bytes);
                }
            }
            "'" => {
                collector.flush();
                if let Some(bytes) = string_operand(op.operands.first()) {
                    collector.push(bytes);
                }
            }
            "\"" => {
                collector.flush();
                if let Some(bytes) = string_operand(op.operands.get(2)) {
                    collector.push(bytes);
                }
            }
            "TJ" => {
                let parts = op.operands.first().and_then(|o| o.as_array().ok());
                for part in parts.into_iter().flatten() {
                    match part {
                        Object::String(bytes, _) => collector.push(bytes),
                        other => {
                            if number(other).is_some_and(|n| n < TJ_SPACE_THRESHOLD) {
                                collector.current.push(' ');
                            }
                        }
                    }
                }
            }
            "Td" | "TD" | "T*" | "Tm" | "Tf" | "ET" => collector.flush(),
            _ => {}
        }
    }
    collector.flush();
    Ok(collector.runs)
}

/// Native text runs of one page.
///
/// Falls back to lopdf's font-aware `extract_text`, one run per line, when
/// the content stream cannot be decoded or yields garbled strings.
fn page_text_runs(doc: &Document, page_id: ObjectId, page_number: u32) -> Vec<String> {
    match content_runs(doc, page_id) {
        Ok(runs) if !runs.iter().any(|r| is_garbled(r)) => return runs,
        Ok(_) => tracing::debug!("Garbled text runs, using font-aware extraction"),
        Err(e) => tracing::debug!("{}, using font-aware extraction", e),
    }

    match doc.extract_text(&[page_number]) {
        Ok(text) => text
            .lines()
            .map(|line| line.replace(IDENTITY_H_PATTERN, ""))
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty() && !is_garbled(line))
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to extract page text: {}", e);
            Vec::new()
        }
    }
}

/// Image XObjects referenced from the page resources.
fn page_images(doc: &Document, page_id: ObjectId) -> Vec<(String, &Stream)> {
    let Some(xobjects) = inherited(doc, page_id, b"Resources")
        .and_then(|r| r.as_dict().ok())
        .and_then(|r| r.get(b"XObject").ok())
        .and_then(|x| resolve(doc, x))
        .and_then(|x| x.as_dict().ok())
    else {
        return Vec::new();
    };

    xobjects
        .iter()
        .filter_map(|(name, obj)| {
            let stream = resolve(doc, obj)?.as_stream().ok()?;
            let subtype = stream.dict.get(b"Subtype").ok()?.as_name().ok()?;
            (subtype == b"Image").then(|| (String::from_utf8_lossy(name).into_owned(), stream))
        })
        .collect()
}

fn stream_filters(dict: &Dictionary) -> Vec<Vec<u8>> {
    match dict.get(b"Filter") {
        Ok(Object::Name(name)) => vec![name.clone()],
        Ok(Object::Array(items)) => items
            .iter()
            .filter_map(|o| o.as_name().ok().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

fn dimension(dict: &Dictionary, key: &[u8]) -> Result<u32, ProcessError> {
    dict.get(key)
        .ok()
        .and_then(|o| o.as_i64().ok())
        .and_then(|v| u32::try_from(v).ok())
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            ProcessError::ImageProcessing(format!("missing {}", String::from_utf8_lossy(key)))
        })
}

/// Decodes an image XObject into RGB pixels.
///
/// Supports JPEG (`DCTDecode`) and raw or Flate-compressed 8-bit DeviceRGB
/// and DeviceGray samples.
fn decode_embedded_image(stream: &Stream) -> Result<RgbImage, ProcessError> {
    let filters = stream_filters(&stream.dict);

    if filters.iter().any(|f| f.as_slice() == b"DCTDecode") {
        if filters.len() != 1 {
            return Err(ProcessError::UnsupportedFormat("chained DCTDecode".to_string()));
        }
        let img = image::load_from_memory_with_format(&stream.content, ImageFormat::Jpeg)
            .map_err(|e| ProcessError::ImageProcessing(format!("JPEG decode failed: {}", e)))?;
        return Ok(img.to_rgb8());
    }

    if let Some(f) = filters
        .iter()
        .find(|f| matches!(f.as_slice(), b"JPXDecode" | b"JBIG2Decode" | b"CCITTFaxDecode"))
    {
        return Err(ProcessError::UnsupportedFormat(String::from_utf8_lossy(f).into_owned()));
    }

    let width = dimension(&stream.dict, b"Width")?;
    let height = dimension(&stream.dict, b"Height")?;
    let bits = stream
        .dict
        .get(b"BitsPerComponent")
        .ok()
        .and_then(|o| o.as_i64().ok())
        .unwrap_or(8);
    if bits != 8 {
        return Err(ProcessError::UnsupportedFormat(format!("{} bits per component", bits)));
    }

    let components: usize = match stream.dict.get(b"ColorSpace").ok().and_then(|o| o.as_name().ok()) {
        Some(b"DeviceRGB") => 3,
        Some(b"DeviceGray") => 1,
        _ => return Err(ProcessError::UnsupportedFormat("color space".to_string())),
    };

    let data = if filters.is_empty() {
        stream.content.clone()
    } else {
        stream
            .decompressed_content()
            .map_err(|e| ProcessError::ImageProcessing(format!("Failed to decompress: {}", e)))?
    };

    let expected = (width as usize)
        .checked_mul(height as usize)
        .and_then(|n| n.checked_mul(components))
        .ok_or_else(|| ProcessError::ImageProcessing(format!("image too large: {}x{}", width, height)))?;
    if data.len() < expected {
        return Err(ProcessError::ImageProcessing(format!(
            "sample data too short: {} < {}",
            data.len(),
            expected
        )));
    }
    let samples = data[..expected].to_vec();

    let img = if components == 3 {
        RgbImage::from_raw(width, height, samples).map(DynamicImage::ImageRgb8)
    } else {
        GrayImage::from_raw(width, height, samples).map(DynamicImage::ImageLuma8)
    };
    img.map(|i| i.to_rgb8())
        .ok_or_else(|| ProcessError::ImageProcessing("invalid sample buffer".to_string()))
}
