//! Configuration for the tool server.
//! This module handles loading and validation of the
//! ~/.config/toolsmith/tools.json configuration file.

mod io;
mod model;
mod validation;

pub use io::{CONFIG_PATH_ENV, default_config_path, load_config, load_config_from_path, save_config_to_path};
pub use model::{
    ConfigError, DEFAULT_MAX_ALTERNATIVES, DEFAULT_MAX_FILE_SUGGESTIONS, EnrichmentSettings, ToolServerConfig,
};
pub use validation::{MAX_RETRY_DELAY_MS, MAX_TRANSACTION_RETRIES, ValidationError, validate_config};
