//! TOML settings for extraction and classification.

mod defaults;
mod io;
mod types;

pub use io::{CONFIG_FILE_NAME, config_path, load_or_default, load_settings_from, save, save_to_path};
pub use types::{ClassificationSettings, ConfigError, ExtractionSettings, Settings};
