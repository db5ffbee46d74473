use crate::config::ArtifactStoreSettings;
use std::path::Path;

pub mod directory;
pub mod http;
pub mod log_upload;

pub use directory::DirectoryStore;
pub use http::HttpStore;
pub use log_upload::{upload_log_if_present, LogUploadOutcome};

#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("remote path `{0}` has no object path")]
    EmptyRemotePath(String),
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("upload to {url} failed: {reason}")]
    Upload { url: String, reason: String },
}

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> ArtifactError {
    ArtifactError::Io {
        path: path.display().to_string(),
        source,
    }
}

/// Destination for files produced by a run, addressed by `scheme:///path`
/// style remote paths.
pub trait ArtifactStore {
    fn upload(&self, local: &Path, remote: &str) -> Result<(), ArtifactError>;
}

/// Builds the configured store. `bearer_token` is only used by the HTTP
/// store; callers resolve it from `token_env` themselves.
pub fn store_from_settings(
    settings: &ArtifactStoreSettings,
    bearer_token: Option<String>,
) -> Box<dyn ArtifactStore> {
    match settings {
        ArtifactStoreSettings::Directory { root } => Box::new(DirectoryStore::new(root)),
        ArtifactStoreSettings::Http { base_url, .. } => {
            let token = bearer_token.filter(|value| !value.trim().is_empty());
            Box::new(HttpStore::new(base_url, token))
        }
    }
}

/// Joins path segments onto a remote base without doubling slashes and
/// without touching the `scheme://` prefix.
pub fn join_remote<S: AsRef<str>>(base: &str, segments: &[S]) -> String {
    let (scheme, rest) = match base.split_once("://") {
        Some((scheme, rest)) => (Some(scheme), rest),
        None => (None, base),
    };
    let leading_slash = rest.starts_with('/');
    let mut parts: Vec<&str> = rest.split('/').filter(|p| !p.is_empty()).collect();
    for segment in segments {
        parts.extend(segment.as_ref().split('/').filter(|p| !p.is_empty()));
    }
    let joined = parts.join("/");
    match (scheme, leading_slash) {
        (Some(scheme), true) => format!("{scheme}:///{joined}"),
        (Some(scheme), false) => format!("{scheme}://{joined}"),
        (None, true) => format!("/{joined}"),
        (None, false) => joined,
    }
}

/// Object path of a remote location with scheme and authority removed:
/// `latch:///a/b` and `latch://a/b` both give `a/b`.
pub fn object_path(remote: &str) -> Result<String, ArtifactError> {
    let rest = remote.split_once("://").map_or(remote, |(_, rest)| rest);
    let path = rest
        .split('/')
        .filter(|p| !p.is_empty() && *p != "." && *p != "..")
        .collect::<Vec<_>>()
        .join("/");
    if path.is_empty() {
        return Err(ArtifactError::EmptyRemotePath(remote.to_string()));
    }
    Ok(path)
}
