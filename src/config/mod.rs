pub mod error;
pub mod settings;

pub use error::ConfigError;
pub use settings::{
    ArtifactStoreSettings, ContextSettings, LauncherSettings, LogSettings, PipelineSettings,
    ProvisionerSettings, WorkdirSettings, DEFAULT_AUTH_SCHEME, DEFAULT_LOG_REMOTE_BASE,
    DEFAULT_PROVISION_ENDPOINT, DEFAULT_STORAGE_GIB, STORAGE_CLAIM_ENV,
};

use std::path::Path;

/// Loads settings from `path` when given, otherwise the built-in defaults,
/// and validates the result.
pub fn load_settings(path: Option<&Path>) -> Result<LauncherSettings, ConfigError> {
    let settings = match path {
        Some(path) => LauncherSettings::from_path(path)?,
        None => LauncherSettings::default(),
    };
    settings.validate()?;
    Ok(settings)
}
