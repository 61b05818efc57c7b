//! Application configuration.
//!
//! Settings live in a TOML file split into sections; missing fields
//! fall back to defaults so old configs keep loading across upgrades.

mod manager;
mod settings;

pub use manager::{ConfigError, ConfigManager, ConfigResult};
pub use settings::{ExportSettings, LoggingSettings, PathSettings, Settings};
