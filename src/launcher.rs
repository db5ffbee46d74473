use crate::artifacts::{upload_log_if_present, ArtifactStore, LogUploadOutcome};
use crate::catalog::{CatalogError, FlagOrder, ParameterCatalog, ParameterValues, ValuesError};
use crate::config::{ContextSettings, LauncherSettings, STORAGE_CLAIM_ENV};
use crate::logging::EventLog;
use crate::pipeline::{
    build_flags, build_invocation, merge_environment, run_pipeline, InvocationSpec, PipelineError,
    PipelineRun,
};
use crate::provision::{ProvisionError, StorageProvisioner};
use crate::workdir::{materialize, MaterializeSummary, WorkdirError};
use std::collections::BTreeMap;
use std::io::Write;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum LaunchError {
    #[error("failed to get execution token")]
    MissingExecutionToken,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Values(#[from] ValuesError),
    #[error(transparent)]
    Provision(#[from] ProvisionError),
    #[error(transparent)]
    Workdir(#[from] WorkdirError),
    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl LaunchError {
    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Pipeline(PipelineError::NonZeroExit { exit_code, .. }) => Some(*exit_code),
            _ => None,
        }
    }
}

/// Identity of the orchestrated execution, supplied by whoever invokes the
/// launcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    pub execution_token: Option<String>,
    pub run_name: Option<String>,
}

impl ExecutionContext {
    pub fn new(execution_token: Option<String>, run_name: Option<String>) -> Self {
        Self {
            execution_token,
            run_name,
        }
    }

    pub fn from_lookup<F>(settings: &ContextSettings, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());
        Self {
            execution_token: non_empty(&settings.token_env),
            run_name: non_empty(&settings.run_name_env),
        }
    }

    fn token(&self) -> Option<&str> {
        self.execution_token
            .as_deref()
            .map(str::trim)
            .filter(|token| !token.is_empty())
    }
}

#[derive(Debug, Clone)]
pub struct RunReport {
    pub pvc_name: String,
    pub command_form: String,
    pub exit_code: i32,
    pub elapsed: Duration,
    pub materialized: MaterializeSummary,
    pub log_upload: LogUploadOutcome,
}

pub struct Launcher {
    settings: LauncherSettings,
    catalog: ParameterCatalog,
    order: FlagOrder,
    store: Box<dyn ArtifactStore>,
    events: EventLog,
}

impl Launcher {
    pub fn new(
        settings: LauncherSettings,
        catalog: ParameterCatalog,
        store: Box<dyn ArtifactStore>,
    ) -> Result<Self, LaunchError> {
        catalog.validate()?;
        let order = catalog.flag_order()?;
        let events = match &settings.event_log {
            Some(path) => EventLog::to_file(path),
            None => EventLog::to_stderr(),
        };
        Ok(Self {
            settings,
            catalog,
            order,
            store,
            events,
        })
    }

    pub fn with_event_log(mut self, events: EventLog) -> Self {
        self.events = events;
        self
    }

    pub fn settings(&self) -> &LauncherSettings {
        &self.settings
    }

    pub fn catalog(&self) -> &ParameterCatalog {
        &self.catalog
    }

    /// Command line the pipeline would be started with, without touching
    /// storage or the filesystem.
    pub fn assemble(&self, values: &ParameterValues) -> Result<InvocationSpec, LaunchError> {
        values.validate_against(&self.catalog)?;
        let flags = build_flags(&self.catalog, &self.order, values);
        Ok(build_invocation(
            &self.settings.pipeline,
            &self.settings.workdir.shared_dir,
            flags,
        ))
    }

    pub fn provision_storage(&self, context: &ExecutionContext) -> Result<String, LaunchError> {
        let token = context.token().ok_or_else(|| {
            self.events
                .error("provision.failed", "execution token unavailable");
            LaunchError::MissingExecutionToken
        })?;
        let provisioner = StorageProvisioner::new(&self.settings.provisioner);
        self.events.info(
            "provision.start",
            &format!(
                "requesting {} GiB from {}",
                provisioner.storage_gib(),
                provisioner.endpoint()
            ),
        );
        print!("Provisioning shared storage volume... ");
        let _ = std::io::stdout().flush();
        let pvc_name = provisioner.provision(token).map_err(|err| {
            println!();
            self.events.error("provision.failed", &err.to_string());
            err
        })?;
        println!("Done.");
        self.events.info("provision.done", &pvc_name);
        Ok(pvc_name)
    }

    /// Full run: validate inputs, provision a volume, then launch on it.
    pub fn run(
        &self,
        context: &ExecutionContext,
        values: &ParameterValues,
    ) -> Result<RunReport, LaunchError> {
        values.validate_against(&self.catalog)?;
        if context.token().is_none() {
            self.events
                .error("launch.rejected", "execution token unavailable");
            return Err(LaunchError::MissingExecutionToken);
        }
        let pvc_name = self.provision_storage(context)?;
        self.run_with_volume(context, &pvc_name, values)
    }

    /// Materializes the working directory and runs the pipeline on an
    /// already provisioned volume. Values are checked before anything is
    /// staged; once staging starts, the log upload runs afterwards whether
    /// or not the launch succeeded.
    pub fn run_with_volume(
        &self,
        context: &ExecutionContext,
        pvc_name: &str,
        values: &ParameterValues,
    ) -> Result<RunReport, LaunchError> {
        values.validate_against(&self.catalog)?;
        let result = self.launch(pvc_name, values);
        if let Err(err) = &result {
            self.events.error("launch.failed", &err.to_string());
        }

        println!();
        let log_path = self
            .settings
            .workdir
            .shared_dir
            .join(&self.settings.logs.file_name);
        let log_upload = upload_log_if_present(
            self.store.as_ref(),
            &log_path,
            &self.settings.logs.remote_base,
            &self.settings.logs.remote_file_name,
            context.run_name.as_deref(),
            &self.events,
        );

        let (materialized, run) = result?;
        Ok(RunReport {
            pvc_name: pvc_name.to_string(),
            command_form: run.command_form,
            exit_code: run.exit_code,
            elapsed: run.elapsed,
            materialized,
            log_upload,
        })
    }

    fn launch(
        &self,
        pvc_name: &str,
        values: &ParameterValues,
    ) -> Result<(MaterializeSummary, PipelineRun), LaunchError> {
        let workdir = &self.settings.workdir;
        let summary = materialize(
            &workdir.source_root,
            &workdir.shared_dir,
            &workdir.excluded_names,
        )?;
        self.events.info(
            "workdir.materialized",
            &format!(
                "{} files, {} directories, {} symlinks copied to {}; {} entries skipped",
                summary.files,
                summary.directories,
                summary.symlinks,
                workdir.shared_dir.display(),
                summary.skipped
            ),
        );

        let spec = self.assemble(values)?;
        let env = merge_environment(inherited_environment(), &self.run_overrides(pvc_name));

        println!("Launching Nextflow Runtime");
        println!("{}", spec.command_form());
        println!();
        self.events.info("pipeline.start", &spec.command_form());

        let run = run_pipeline(&spec, &env)?;
        self.events.info(
            "pipeline.done",
            &format!("exit code {} after {}s", run.exit_code, run.elapsed.as_secs()),
        );
        Ok((summary, run))
    }

    fn run_overrides(&self, pvc_name: &str) -> BTreeMap<String, String> {
        let mut overrides = self.settings.environment.clone();
        overrides.insert(STORAGE_CLAIM_ENV.to_string(), pvc_name.to_string());
        overrides
    }
}

fn inherited_environment() -> impl Iterator<Item = (String, String)> {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
}
