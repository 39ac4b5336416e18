use crate::config::Settings;
use crate::pii::PiiDetector;

/// The slice of [`Settings`] the pipeline reads at runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineConfig {
    pub max_file_size_bytes: u64,
    pub default_language: String,
    pub ocr_dpi: u32,
    pub tessdata_dir: Option<String>,
    pub pii_enabled: bool,
    pub extra_name_keywords: Vec<String>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

impl PipelineConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            max_file_size_bytes: settings.limits.max_file_size_bytes(),
            default_language: settings.ocr.default_language.clone(),
            ocr_dpi: settings.ocr.dpi,
            tessdata_dir: settings.ocr.tessdata_dir.clone(),
            pii_enabled: settings.pii.enabled,
            extra_name_keywords: settings.pii.extra_name_keywords.clone(),
        }
    }

    pub fn pii_detector(&self) -> PiiDetector {
        if self.pii_enabled {
            PiiDetector::new().with_extra_keywords(&self.extra_name_keywords)
        } else {
            PiiDetector::disabled()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_default_settings() {
        let config = PipelineConfig::default();
        assert_eq!(config.max_file_size_bytes, 10 * 1024 * 1024);
        assert_eq!(config.default_language, "en");
        assert_eq!(config.ocr_dpi, 300);
        assert!(config.pii_detector().is_enabled());
    }

    #[test]
    fn test_disabled_pii() {
        let mut settings = Settings::default();
        settings.pii.enabled = false;
        let config = PipelineConfig::from_settings(&settings);
        assert!(!config.pii_detector().is_enabled());
    }

    #[test]
    fn test_extra_keywords_reach_detector() {
        let mut settings = Settings::default();
        settings.pii.extra_name_keywords = vec!["수진자".to_string()];
        let detector = PipelineConfig::from_settings(&settings).pii_detector();
        let result = detector.detect(&["수진자", "김민준"]);
        assert!(result[1].is_sensitive());
    }
}
