use crate::config::ProvisionerSettings;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    #[error("failed to get execution token")]
    MissingToken,
    #[error("storage provisioning request to {endpoint} failed: {reason}")]
    Request { endpoint: String, reason: String },
    #[error("storage provisioning at {endpoint} returned status {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },
    #[error("storage provisioning at {endpoint} returned an unreadable response: {reason}")]
    Response { endpoint: String, reason: String },
    #[error("storage provisioning at {endpoint} returned an empty volume name")]
    EmptyVolumeName { endpoint: String },
}

#[derive(Debug, Clone, Deserialize)]
struct ProvisionResponse {
    name: String,
}

/// Client for the cluster-local service that hands out shared volumes.
#[derive(Debug, Clone)]
pub struct StorageProvisioner {
    endpoint: String,
    auth_scheme: String,
    storage_gib: u32,
    timeout: Duration,
}

impl StorageProvisioner {
    pub fn new(settings: &ProvisionerSettings) -> Self {
        Self {
            endpoint: settings.endpoint.trim().to_string(),
            auth_scheme: settings.auth_scheme.trim().to_string(),
            storage_gib: settings.storage_gib,
            timeout: Duration::from_secs(settings.timeout_secs),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn storage_gib(&self) -> u32 {
        self.storage_gib
    }

    /// Requests one volume and returns its name. Never retries: a failed
    /// request leaves the run without working storage.
    pub fn provision(&self, execution_token: &str) -> Result<String, ProvisionError> {
        let token = execution_token.trim();
        if token.is_empty() {
            return Err(ProvisionError::MissingToken);
        }

        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();
        let response = match agent
            .post(&self.endpoint)
            .set("Authorization", &format!("{} {token}", self.auth_scheme))
            .send_json(json!({ "storage_gib": self.storage_gib }))
        {
            Ok(response) => response,
            Err(ureq::Error::Status(status, response)) => {
                return Err(ProvisionError::Status {
                    endpoint: self.endpoint.clone(),
                    status,
                    body: response.into_string().unwrap_or_default(),
                })
            }
            Err(err) => {
                return Err(ProvisionError::Request {
                    endpoint: self.endpoint.clone(),
                    reason: err.to_string(),
                })
            }
        };

        let body = response
            .into_json::<ProvisionResponse>()
            .map_err(|e| ProvisionError::Response {
                endpoint: self.endpoint.clone(),
                reason: e.to_string(),
            })?;

        let name = body.name.trim();
        if name.is_empty() {
            return Err(ProvisionError::EmptyVolumeName {
                endpoint: self.endpoint.clone(),
            });
        }
        Ok(name.to_string())
    }
}
