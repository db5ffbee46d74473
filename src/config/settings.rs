use super::ConfigError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

pub const DEFAULT_PROVISION_ENDPOINT: &str =
    "http://nf-dispatcher-service.flyte.svc.cluster.local/provision-storage";
pub const DEFAULT_AUTH_SCHEME: &str = "Latch-Execution-Token";
pub const DEFAULT_STORAGE_GIB: u32 = 100;
pub const DEFAULT_LOG_REMOTE_BASE: &str = "latch:///your_log_dir/nf_nf_core_crisprseq";

/// Environment key the provisioned volume name is exported under.
pub const STORAGE_CLAIM_ENV: &str = "K8S_STORAGE_CLAIM_NAME";

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LauncherSettings {
    #[serde(default)]
    pub provisioner: ProvisionerSettings,
    #[serde(default)]
    pub workdir: WorkdirSettings,
    #[serde(default)]
    pub pipeline: PipelineSettings,
    #[serde(default = "default_environment")]
    pub environment: BTreeMap<String, String>,
    #[serde(default)]
    pub logs: LogSettings,
    #[serde(default)]
    pub artifact_store: ArtifactStoreSettings,
    #[serde(default)]
    pub context: ContextSettings,
    #[serde(default)]
    pub event_log: Option<PathBuf>,
}

impl Default for LauncherSettings {
    fn default() -> Self {
        Self {
            provisioner: ProvisionerSettings::default(),
            workdir: WorkdirSettings::default(),
            pipeline: PipelineSettings::default(),
            environment: default_environment(),
            logs: LogSettings::default(),
            artifact_store: ArtifactStoreSettings::default(),
            context: ContextSettings::default(),
            event_log: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ProvisionerSettings {
    #[serde(default = "default_provision_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_auth_scheme")]
    pub auth_scheme: String,
    #[serde(default = "default_storage_gib")]
    pub storage_gib: u32,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for ProvisionerSettings {
    fn default() -> Self {
        Self {
            endpoint: default_provision_endpoint(),
            auth_scheme: default_auth_scheme(),
            storage_gib: default_storage_gib(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorkdirSettings {
    #[serde(default = "default_source_root")]
    pub source_root: PathBuf,
    #[serde(default = "default_shared_dir")]
    pub shared_dir: PathBuf,
    #[serde(default = "default_excluded_names")]
    pub excluded_names: Vec<String>,
}

impl Default for WorkdirSettings {
    fn default() -> Self {
        Self {
            source_root: default_source_root(),
            shared_dir: default_shared_dir(),
            excluded_names: default_excluded_names(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PipelineSettings {
    #[serde(default = "default_pipeline_binary")]
    pub binary: String,
    #[serde(default = "default_entry_script")]
    pub entry_script: String,
    #[serde(default = "default_profile")]
    pub profile: String,
    #[serde(default = "default_config_file")]
    pub config_file: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            binary: default_pipeline_binary(),
            entry_script: default_entry_script(),
            profile: default_profile(),
            config_file: default_config_file(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LogSettings {
    #[serde(default = "default_log_file_name")]
    pub file_name: String,
    #[serde(default = "default_log_remote_base")]
    pub remote_base: String,
    #[serde(default = "default_log_remote_file_name")]
    pub remote_file_name: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            file_name: default_log_file_name(),
            remote_base: default_log_remote_base(),
            remote_file_name: default_log_remote_file_name(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArtifactStoreSettings {
    Directory {
        root: PathBuf,
    },
    Http {
        base_url: String,
        #[serde(default)]
        token_env: Option<String>,
    },
}

impl Default for ArtifactStoreSettings {
    fn default() -> Self {
        Self::Directory {
            root: PathBuf::from("/ldata"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ContextSettings {
    #[serde(default = "default_token_env")]
    pub token_env: String,
    #[serde(default = "default_run_name_env")]
    pub run_name_env: String,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
            run_name_env: default_run_name_env(),
        }
    }
}

fn default_provision_endpoint() -> String {
    DEFAULT_PROVISION_ENDPOINT.to_string()
}

fn default_auth_scheme() -> String {
    DEFAULT_AUTH_SCHEME.to_string()
}

fn default_storage_gib() -> u32 {
    DEFAULT_STORAGE_GIB
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_source_root() -> PathBuf {
    PathBuf::from("/root")
}

fn default_shared_dir() -> PathBuf {
    PathBuf::from("/nf-workdir")
}

fn default_excluded_names() -> Vec<String> {
    [
        "latch",
        ".latch",
        "nextflow",
        ".nextflow",
        "work",
        "results",
        "miniconda",
        "anaconda3",
        "mambaforge",
    ]
    .iter()
    .map(|name| name.to_string())
    .collect()
}

fn default_pipeline_binary() -> String {
    "/root/nextflow".to_string()
}

fn default_entry_script() -> String {
    "main.nf".to_string()
}

fn default_profile() -> String {
    "docker".to_string()
}

fn default_config_file() -> String {
    "latch.config".to_string()
}

fn default_environment() -> BTreeMap<String, String> {
    BTreeMap::from([
        ("NXF_HOME".to_string(), "/root/.nextflow".to_string()),
        (
            "NXF_OPTS".to_string(),
            "-Xms2048M -Xmx8G -XX:ActiveProcessorCount=4".to_string(),
        ),
        ("NXF_DISABLE_CHECK_LATEST".to_string(), "true".to_string()),
    ])
}

fn default_log_file_name() -> String {
    ".nextflow.log".to_string()
}

fn default_log_remote_base() -> String {
    DEFAULT_LOG_REMOTE_BASE.to_string()
}

fn default_log_remote_file_name() -> String {
    "nextflow.log".to_string()
}

fn default_token_env() -> String {
    "FLYTE_INTERNAL_EXECUTION_ID".to_string()
}

fn default_run_name_env() -> String {
    "FLYTE_INTERNAL_EXECUTION_NAME".to_string()
}

fn is_plain_file_name(value: &str) -> bool {
    !value.trim().is_empty() && !value.contains('/') && value != "." && value != ".."
}

impl LauncherSettings {
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&raw, path)
    }

    pub fn from_yaml(raw: &str, path: &Path) -> Result<Self, ConfigError> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
            path: path.display().to_string(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.provisioner.endpoint.trim();
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::Settings(format!(
                "provisioner.endpoint `{endpoint}` must be an http(s) url"
            )));
        }
        if self.provisioner.auth_scheme.trim().is_empty() {
            return Err(ConfigError::Settings(
                "provisioner.auth_scheme must be non-empty".to_string(),
            ));
        }
        if self.provisioner.storage_gib == 0 {
            return Err(ConfigError::Settings(
                "provisioner.storage_gib must be greater than zero".to_string(),
            ));
        }
        if !self.workdir.shared_dir.is_absolute() {
            return Err(ConfigError::Settings(format!(
                "workdir.shared_dir `{}` must be absolute",
                self.workdir.shared_dir.display()
            )));
        }
        if let Some(name) = self
            .workdir
            .excluded_names
            .iter()
            .find(|name| !is_plain_file_name(name))
        {
            return Err(ConfigError::Settings(format!(
                "workdir.excluded_names entry `{name}` must be a single path component"
            )));
        }
        for (field, value) in [
            ("pipeline.binary", &self.pipeline.binary),
            ("pipeline.entry_script", &self.pipeline.entry_script),
            ("pipeline.profile", &self.pipeline.profile),
            ("pipeline.config_file", &self.pipeline.config_file),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Settings(format!("{field} must be non-empty")));
            }
        }
        if let Some(key) = self
            .environment
            .keys()
            .find(|key| key.is_empty() || key.contains('='))
        {
            return Err(ConfigError::Settings(format!(
                "environment key `{key}` is not a valid variable name"
            )));
        }
        if self.environment.contains_key(STORAGE_CLAIM_ENV) {
            return Err(ConfigError::Settings(format!(
                "environment must not set {STORAGE_CLAIM_ENV}; it is filled from the provisioned volume"
            )));
        }
        if !is_plain_file_name(&self.logs.file_name) {
            return Err(ConfigError::Settings(
                "logs.file_name must be a file name inside the working directory".to_string(),
            ));
        }
        if !is_plain_file_name(&self.logs.remote_file_name) {
            return Err(ConfigError::Settings(
                "logs.remote_file_name must be a single path component".to_string(),
            ));
        }
        if self.logs.remote_base.trim().is_empty() {
            return Err(ConfigError::Settings(
                "logs.remote_base must be non-empty".to_string(),
            ));
        }
        if let ArtifactStoreSettings::Http { base_url, .. } = &self.artifact_store {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(ConfigError::Settings(format!(
                    "artifact_store.base_url `{base_url}` must be an http(s) url"
                )));
            }
        }
        for (field, value) in [
            ("context.token_env", &self.context.token_env),
            ("context.run_name_env", &self.context.run_name_env),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::Settings(format!("{field} must be non-empty")));
            }
        }
        Ok(())
    }
}
