//! TOML configuration for the service and its tools.
//!
//! Settings live in `config.toml` under the app root directory. A missing file
//! yields defaults; values are normalized on load.

mod defaults;
mod load;
mod types;


use crate::app_dirs;

pub use load::{config_path, load_from_path, load_or_default};
pub use types::{AppConfig, ConfigError, DatasetSettings, ServerSettings, StoreSettings};

/// Default filename used to store the app configuration.
pub const CONFIG_FILE_NAME: &str = "config.toml";

fn map_app_dir_error(error: app_dirs::AppDirError) -> ConfigError {
    match error {
        app_dirs::AppDirError::NoBaseDir => ConfigError::NoConfigDir,
        app_dirs::AppDirError::CreateDir { path, source } => {
            ConfigError::CreateDir { path, source }
        }
    }
}
