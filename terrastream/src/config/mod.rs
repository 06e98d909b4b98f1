//! Streaming configuration
//!
//! [`StreamingConfig`] gathers every tunable of the engine and maps to an INI
//! file with `[cache]`, `[scheduler]`, `[lod]` and one `[layer.<name>]`
//! section per layer. Values missing from the file keep their defaults.
//!
//! # Example
//!
//! ```ignore
//! use terrastream::config::{default_config_path, StreamingConfig};
//!
//! let config = StreamingConfig::load(&default_config_path())?;
//! let selector = LodSelector::new(config.lod_config());
//! for layer in &config.layers {
//!     let layer_config = config.layer_config(layer);
//! }
//! ```

mod file;
mod parser;
mod settings;
mod writer;

pub use file::{
    config_directory, default_config_path, ConfigFileError, CONFIG_DIR_NAME, CONFIG_FILE_NAME,
};
pub use settings::{
    CacheSettings, ConfigError, LayerSettings, LodSettings, SchedulerSettings, StreamingConfig,
};
