use std::path::{Path, PathBuf};

use tracing_subscriber::EnvFilter;

use crate::config::schema::Settings;
use crate::error::ConfigError;

const SCHEMA_JSON: &str = include_str!("../../../../schema/settings-v1.json");

const SUPPORTED_LANGUAGES: &[&str] = &["en", "ko"];

pub const ENV_DATABASE_PATH: &str = "MEDIVIEW_DATABASE_PATH";
pub const ENV_OCR_DPI: &str = "MEDIVIEW_OCR_DPI";
pub const ENV_TESSDATA_DIR: &str = "MEDIVIEW_TESSDATA_DIR";
pub const ENV_MAX_FILE_SIZE_MB: &str = "MEDIVIEW_MAX_FILE_SIZE_MB";
pub const ENV_LOG_LEVEL: &str = "MEDIVIEW_LOG_LEVEL";

pub fn load_settings<P: AsRef<Path>>(path: P) -> Result<Settings, ConfigError> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
        path: path.to_path_buf(),
        source: e,
    })?;

    load_settings_from_str(&content)
}

pub fn load_settings_from_str(content: &str) -> Result<Settings, ConfigError> {
    let json_value: serde_json::Value = serde_json::from_str(content)?;

    validate_schema(&json_value)?;

    let settings: Settings = serde_json::from_value(json_value)?;

    validate_settings(&settings)?;

    Ok(settings)
}

/// Loads the file when given, otherwise starts from defaults, then applies
/// `MEDIVIEW_*` environment overrides.
pub fn load_settings_with_env(path: Option<&Path>) -> Result<Settings, ConfigError> {
    let mut settings = match path {
        Some(path) => load_settings(path)?,
        None => Settings::default(),
    };
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok())?;
    validate_settings(&settings)?;
    Ok(settings)
}

fn validate_schema(json_value: &serde_json::Value) -> Result<(), ConfigError> {
    let schema: serde_json::Value =
        serde_json::from_str(SCHEMA_JSON).map_err(|e| ConfigError::Validation {
            message: format!("Invalid embedded schema JSON: {}", e),
        })?;

    let validator = jsonschema::validator_for(&schema).map_err(|e| ConfigError::Validation {
        message: format!("Failed to compile JSON schema: {}", e),
    })?;

    let error_messages: Vec<String> = validator
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !error_messages.is_empty() {
        return Err(ConfigError::SchemaValidation {
            errors: error_messages.join("; "),
        });
    }

    Ok(())
}

/// Semantic checks that hold after environment overrides too.
pub fn validate_settings(settings: &Settings) -> Result<(), ConfigError> {
    if settings.version != "1.0" {
        return Err(ConfigError::Validation {
            message: format!("Unsupported settings version: {}", settings.version),
        });
    }

    if !(72..=1200).contains(&settings.ocr.dpi) {
        return Err(ConfigError::Validation {
            message: format!("ocr.dpi must be between 72 and 1200, got {}", settings.ocr.dpi),
        });
    }

    if !SUPPORTED_LANGUAGES.contains(&settings.ocr.default_language.as_str()) {
        return Err(ConfigError::Validation {
            message: format!(
                "ocr.default_language must be one of {:?}, got '{}'",
                SUPPORTED_LANGUAGES, settings.ocr.default_language
            ),
        });
    }

    if settings.limits.max_file_size_mb == 0 {
        return Err(ConfigError::Validation {
            message: "limits.max_file_size_mb must be greater than zero".to_string(),
        });
    }

    if let Err(e) = EnvFilter::try_new(&settings.logging.level) {
        return Err(ConfigError::Validation {
            message: format!("Invalid logging.level '{}': {}", settings.logging.level, e),
        });
    }

    Ok(())
}

/// Overlays `MEDIVIEW_*` variables onto `settings`.
///
/// `lookup` resolves a variable name; pass `|n| std::env::var(n).ok()` for
/// the process environment. Blank values are ignored.
pub fn apply_env_overrides<F>(settings: &mut Settings, lookup: F) -> Result<(), ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |name: &str| lookup(name).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

    if let Some(path) = get(ENV_DATABASE_PATH) {
        settings.database_path = Some(PathBuf::from(path));
    }
    if let Some(value) = get(ENV_OCR_DPI) {
        settings.ocr.dpi = parse_number(ENV_OCR_DPI, &value)?;
    }
    if let Some(dir) = get(ENV_TESSDATA_DIR) {
        settings.ocr.tessdata_dir = Some(dir);
    }
    if let Some(value) = get(ENV_MAX_FILE_SIZE_MB) {
        settings.limits.max_file_size_mb = parse_number(ENV_MAX_FILE_SIZE_MB, &value)?;
    }
    if let Some(level) = get(ENV_LOG_LEVEL) {
        settings.logging.level = level;
    }

    Ok(())
}

fn parse_number<T: std::str::FromStr>(name: &str, value: &str) -> Result<T, ConfigError> {
    value.parse().map_err(|_| ConfigError::InvalidEnv {
        name: name.to_string(),
        value: value.to_string(),
    })
}
