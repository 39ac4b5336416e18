pub mod loader;
pub mod schema;

pub use loader::{
    apply_env_overrides, load_settings, load_settings_from_str, load_settings_with_env,
    validate_settings,
};
pub use schema::{LimitSettings, LoggingSettings, OcrSettings, PiiSettings, Settings};
