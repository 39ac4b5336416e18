//! Submission requests and their validation.

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::processor::{DocumentFormat, OcrLanguage};

use super::config::PipelineConfig;
use super::error::ValidationError;

const SUPPORTED_LANGUAGES: &[&str] = &["en", "ko"];

/// Whether `submit` waits for the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SubmitMode {
    #[default]
    Sync,
    Async,
}

/// A document as handed over by the caller.
#[derive(Clone, Default)]
pub struct SubmitRequest {
    pub bytes: Vec<u8>,
    /// MIME type claimed by the uploader; informational only.
    pub declared_content_type: Option<String>,
    pub filename: Option<String>,
    /// `en` or `ko`; the configured default when absent or blank.
    pub language: Option<String>,
    pub mode: SubmitMode,
}

impl SubmitRequest {
    pub fn new(filename: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            bytes,
            filename: Some(filename.into()),
            ..Default::default()
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.declared_content_type = Some(content_type.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }

    pub fn asynchronous(mut self) -> Self {
        self.mode = SubmitMode::Async;
        self
    }
}

impl fmt::Debug for SubmitRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubmitRequest")
            .field("bytes.len", &self.bytes.len())
            .field("declared_content_type", &self.declared_content_type)
            .field("filename.is_some", &self.filename.is_some())
            .field("language", &self.language)
            .field("mode", &self.mode)
            .finish()
    }
}

/// A request that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    pub filename: String,
    pub declared_content_type: Option<String>,
    /// Derived from the extension, which wins over the declared type.
    pub content_type: String,
    pub format: DocumentFormat,
    pub language_code: String,
    pub language: OcrLanguage,
    pub bytes: Arc<Vec<u8>>,
    pub mode: SubmitMode,
}

fn extension(filename: &str) -> Option<String> {
    Path::new(filename)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Content type implied by a supported extension.
pub fn content_type_for(extension: &str) -> Option<String> {
    DocumentFormat::from_extension(extension)?;
    mime_guess::from_ext(extension)
        .first_raw()
        .map(str::to_string)
}

/// Checks filename, type, language and size, in that order.
pub fn validate(request: SubmitRequest, config: &PipelineConfig) -> Result<ValidatedRequest, ValidationError> {
    let filename = request
        .filename
        .as_deref()
        .map(str::trim)
        .filter(|f| !f.is_empty())
        .ok_or(ValidationError::MissingFilename)?
        .to_string();

    let ext = extension(&filename).unwrap_or_default();
    let format = DocumentFormat::from_extension(&ext)
        .ok_or_else(|| ValidationError::UnsupportedExtension(ext.clone()))?;
    let content_type =
        content_type_for(&ext).ok_or_else(|| ValidationError::UnsupportedExtension(ext.clone()))?;

    let language_code = request
        .language
        .as_deref()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .unwrap_or(config.default_language.as_str())
        .to_lowercase();
    if !SUPPORTED_LANGUAGES.contains(&language_code.as_str()) {
        return Err(ValidationError::UnsupportedLanguage(language_code));
    }

    if request.bytes.is_empty() {
        return Err(ValidationError::EmptyFile);
    }
    let size = request.bytes.len() as u64;
    if size > config.max_file_size_bytes {
        return Err(ValidationError::TooLarge {
            size,
            limit: config.max_file_size_bytes,
        });
    }

    Ok(ValidatedRequest {
        filename,
        declared_content_type: request.declared_content_type,
        content_type,
        format,
        language: OcrLanguage::from_code(&language_code),
        language_code,
        bytes: Arc::new(request.bytes),
        mode: request.mode,
    })
}
