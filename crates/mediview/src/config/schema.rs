use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level settings file. Every section may be omitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default = "default_version")]
    pub version: String,
    /// Falls back to `~/.mediview/data/mediview.db` when absent.
    #[serde(default)]
    pub database_path: Option<PathBuf>,
    #[serde(default)]
    pub ocr: OcrSettings,
    #[serde(default)]
    pub limits: LimitSettings,
    #[serde(default)]
    pub pii: PiiSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            version: default_version(),
            database_path: None,
            ocr: OcrSettings::default(),
            limits: LimitSettings::default(),
            pii: PiiSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Settings {
    /// The configured database path, or the per-user default.
    pub fn resolved_database_path(&self) -> Option<PathBuf> {
        self.database_path
            .clone()
            .or_else(crate::db::default_database_path)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcrSettings {
    /// Rasterization density used to convert PDF points to pixels.
    #[serde(default = "default_dpi")]
    pub dpi: u32,
    /// Directory holding Tesseract `*.traineddata`; the engine default when absent.
    #[serde(default)]
    pub tessdata_dir: Option<String>,
    /// Language used when a request does not name one.
    #[serde(default = "default_language")]
    pub default_language: String,
}

fn default_dpi() -> u32 {
    300
}

fn default_language() -> String {
    "en".to_string()
}

impl Default for OcrSettings {
    fn default() -> Self {
        Self {
            dpi: default_dpi(),
            tessdata_dir: None,
            default_language: default_language(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LimitSettings {
    #[serde(default = "default_max_file_size_mb")]
    pub max_file_size_mb: u64,
}

fn default_max_file_size_mb() -> u64 {
    10
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            max_file_size_mb: default_max_file_size_mb(),
        }
    }
}

impl LimitSettings {
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PiiSettings {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Added to the built-in name keyword vocabulary.
    #[serde(default)]
    pub extra_name_keywords: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for PiiSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            extra_name_keywords: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// A tracing filter directive, e.g. `info` or `mediview=debug`.
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}
