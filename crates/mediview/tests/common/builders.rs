//! Builders for test documents and a scripted OCR engine.

#![allow(dead_code)]

use std::io::Cursor;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use image::{ImageFormat, RgbImage};
use lopdf::{dictionary, Dictionary, Document, Object, Stream};

use mediview::error::ProcessError;
use mediview::processor::{OcrEngine, OcrLanguage, Recognition};

/// Encodes a solid PNG of the given size.
pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let mut out = Vec::new();
    RgbImage::from_pixel(width, height, image::Rgb([255, 255, 255]))
        .write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
        .expect("Failed to encode PNG");
    out
}

/// A PDF hex string literal holding `text` as UTF-16BE with a byte-order mark.
pub fn utf16_hex(text: &str) -> String {
    let hex: String = text.encode_utf16().map(|u| format!("{:04X}", u)).collect();
    format!("<FEFF{}>", hex)
}

struct PdfPage {
    content: Option<String>,
    media_box: [i64; 4],
    images: Vec<(u32, u32)>,
}

/// Builder for small in-memory PDFs.
pub struct PdfBuilder {
    pages: Vec<PdfPage>,
}

impl PdfBuilder {
    pub fn new() -> Self {
        Self { pages: Vec::new() }
    }

    /// Adds a Letter-size page with the given content stream.
    pub fn text_page(mut self, content: &str) -> Self {
        self.pages.push(PdfPage {
            content: Some(content.to_string()),
            media_box: [0, 0, 612, 792],
            images: Vec::new(),
        });
        self
    }

    /// Adds a Letter-size page holding one raw RGB image XObject.
    pub fn image_page(mut self, width: u32, height: u32) -> Self {
        self.pages.push(PdfPage {
            content: None,
            media_box: [0, 0, 612, 792],
            images: vec![(width, height)],
        });
        self
    }

    pub fn empty_page(mut self, media_box: [i64; 4]) -> Self {
        self.pages.push(PdfPage {
            content: None,
            media_box,
            images: Vec::new(),
        });
        self
    }

    pub fn build(self) -> Vec<u8> {
        let mut doc = Document::with_version("1.5");
        let pages_id = doc.new_object_id();
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });

        let mut kids = Vec::new();
        for page in self.pages {
            let mut xobjects = Dictionary::new();
            for (i, (width, height)) in page.images.iter().enumerate() {
                let image = Stream::new(
                    dictionary! {
                        "Type" => "XObject",
                        "Subtype" => "Image",
                        "Width" => *width as i64,
                        "Height" => *height as i64,
                        "ColorSpace" => "DeviceRGB",
                        "BitsPerComponent" => 8,
                    },
                    vec![255u8; (width * height * 3) as usize],
                );
                xobjects.set(format!("Im{}", i + 1), doc.add_object(image));
            }
            let resources_id = doc.add_object(dictionary! {
                "Font" => dictionary! { "F1" => font_id },
                "XObject" => xobjects,
            });

            let mut dict = dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "Resources" => resources_id,
                "MediaBox" => page.media_box.iter().map(|&v| Object::Integer(v)).collect::<Vec<_>>(),
            };
            if let Some(content) = page.content {
                let content_id = doc.add_object(Stream::new(dictionary! {}, content.into_bytes()));
                dict.set("Contents", content_id);
            }
            kids.push(Object::Reference(doc.add_object(dict)));
        }

        let count = kids.len() as i64;
        doc.objects.insert(
            pages_id,
            Object::Dictionary(dictionary! {
                "Type" => "Pages",
                "Kids" => kids,
                "Count" => count,
            }),
        );
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => pages_id,
        });
        doc.trailer.set("Root", catalog_id);

        let mut bytes = Vec::new();
        doc.save_to(&mut bytes).expect("Failed to serialize PDF");
        bytes
    }
}

/// OCR engine that reads the same lines off every image.
///
/// Each call sleeps for `delay`, tracks how many calls overlap and records
/// the width of every image it was given.
pub struct ScriptedEngine {
    lines: Vec<String>,
    delay: Duration,
    active: AtomicUsize,
    max_active: AtomicUsize,
    calls: AtomicUsize,
    widths: Mutex<Vec<u32>>,
}

impl ScriptedEngine {
    pub fn new(lines: &[&str]) -> Self {
        Self {
            lines: lines.iter().map(|l| l.to_string()).collect(),
            delay: Duration::ZERO,
            active: AtomicUsize::new(0),
            max_active: AtomicUsize::new(0),
            calls: AtomicUsize::new(0),
            widths: Mutex::new(Vec::new()),
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn max_active(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn widths(&self) -> Vec<u32> {
        self.widths.lock().unwrap().clone()
    }
}

impl OcrEngine for ScriptedEngine {
    fn recognize(&self, image: &RgbImage, _language: OcrLanguage) -> Result<Vec<Recognition>, ProcessError> {
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.widths.lock().unwrap().push(image.width());

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }

        let recognitions = self
            .lines
            .iter()
            .enumerate()
            .map(|(i, line)| Recognition::from_rect(line.clone(), 0.87, 4.0, 4.0 + 24.0 * i as f32, 120.0, 20.0))
            .collect();

        self.active.fetch_sub(1, Ordering::SeqCst);
        Ok(recognitions)
    }
}
