use super::{io_error, object_path, ArtifactError, ArtifactStore};
use std::fs;
use std::path::Path;

/// Store that accepts `PUT <base_url>/<object path>` uploads.
#[derive(Debug, Clone)]
pub struct HttpStore {
    base_url: String,
    bearer_token: Option<String>,
}

impl HttpStore {
    pub fn new(base_url: &str, bearer_token: Option<String>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            bearer_token,
        }
    }

    pub fn object_url(&self, remote: &str) -> Result<String, ArtifactError> {
        let encoded = object_path(remote)?
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect::<Vec<_>>()
            .join("/");
        Ok(format!("{}/{encoded}", self.base_url))
    }
}

impl ArtifactStore for HttpStore {
    fn upload(&self, local: &Path, remote: &str) -> Result<(), ArtifactError> {
        let url = self.object_url(remote)?;
        let body = fs::read(local).map_err(|e| io_error(local, e))?;

        let mut request = ureq::put(&url).set("content-type", "text/plain");
        if let Some(token) = &self.bearer_token {
            request = request.set("Authorization", &format!("Bearer {token}"));
        }
        request
            .send_bytes(&body)
            .map_err(|e| ArtifactError::Upload {
                url: url.clone(),
                reason: e.to_string(),
            })?;
        Ok(())
    }
}
