use crate::processor::ocr::{recognize_items, OcrEngine, OcrLanguage};
use crate::processor::PageDraft;

/// OCR over a standalone image upload; always one page when decodable.
pub fn extract_image(bytes: &[u8], engine: &dyn OcrEngine, language: OcrLanguage) -> Vec<PageDraft> {
    let _span = tracing::info_span!("processor.image", bytes = bytes.len()).entered();

    let img = match image::load_from_memory(bytes) {
        Ok(img) => img,
        Err(e) => {
            tracing::warn!("Failed to decode image, no pages extracted: {}", e);
            return Vec::new();
        }
    };

    let rgb = img.to_rgb8();
    let items = recognize_items(engine, &rgb, language);
    tracing::debug!(items = items.len(), "Image recognized");

    vec![PageDraft {
        page_index: 0,
        width: rgb.width(),
        height: rgb.height(),
        items,
    }]
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;
    use std::sync::Mutex;

    use image::{ImageFormat, Rgb, RgbImage};

    use super::*;
    use crate::error::ProcessError;
    use crate::processor::ocr::Recognition;
    use crate::processor::{BoundingBox, ItemSource};

    struct RecordingEngine {
        seen: Mutex<Vec<(u32, u32, OcrLanguage)>>,
    }

    impl OcrEngine for RecordingEngine {
        fn recognize(&self, image: &RgbImage, language: OcrLanguage) -> Result<Vec<Recognition>, ProcessError> {
            self.seen
                .lock()
                .unwrap()
                .push((image.width(), image.height(), language));
            Ok(vec![Recognition::from_rect("보호자", 0.87, 5.0, 6.0, 20.0, 8.0)])
        }
    }

    fn encode(format: ImageFormat, width: u32, height: u32) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb([250, 250, 250]));
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), format).unwrap();
        out
    }

    #[test]
    fn test_png_single_page_with_true_dimensions() {
        let engine = RecordingEngine {
            seen: Mutex::new(Vec::new()),
        };
        let pages = extract_image(&encode(ImageFormat::Png, 64, 48), &engine, OcrLanguage::Korean);

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].page_index, 0);
        assert_eq!((pages[0].width, pages[0].height), (64, 48));
        assert_eq!(pages[0].items.len(), 1);
        assert_eq!(pages[0].items[0].bbox, BoundingBox::new(5, 6, 20, 8));
        assert_eq!(pages[0].items[0].source, ItemSource::Ocr);
        assert_eq!(
            engine.seen.lock().unwrap().as_slice(),
            &[(64, 48, OcrLanguage::Korean)]
        );
    }

    #[test]
    fn test_jpeg_decodes() {
        let engine = RecordingEngine {
            seen: Mutex::new(Vec::new()),
        };
        let pages = extract_image(&encode(ImageFormat::Jpeg, 32, 16), &engine, OcrLanguage::English);
        assert_eq!(pages.len(), 1);
        assert_eq!((pages[0].width, pages[0].height), (32, 16));
    }

    #[test]
    fn test_undecodable_bytes_yield_no_pages() {
        let engine = RecordingEngine {
            seen: Mutex::new(Vec::new()),
        };
        assert!(extract_image(b"not an image", &engine, OcrLanguage::English).is_empty());
        assert!(extract_image(&[], &engine, OcrLanguage::English).is_empty());
        assert!(engine.seen.lock().unwrap().is_empty());
    }
}
