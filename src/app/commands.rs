use crate::app::cli::{help_text, parse_cli_verb, parse_options, CliOptions, CliVerb};
use crate::artifacts::store_from_settings;
use crate::catalog::{ParameterCatalog, ParameterValues};
use crate::config::{load_settings, ArtifactStoreSettings, LauncherSettings};
use crate::launcher::{ExecutionContext, LaunchError, Launcher};
use std::fmt;

/// Error message plus the status the process should exit with. A failed
/// pipeline passes its own exit code through; everything else exits 1.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandFailure {
    pub message: String,
    pub exit_code: i32,
}

impl fmt::Display for CommandFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl From<String> for CommandFailure {
    fn from(message: String) -> Self {
        Self {
            message,
            exit_code: 1,
        }
    }
}

impl From<LaunchError> for CommandFailure {
    fn from(err: LaunchError) -> Self {
        Self {
            exit_code: err.exit_code().filter(|code| *code > 0).unwrap_or(1),
            message: err.to_string(),
        }
    }
}

pub fn run_cli(args: Vec<String>) -> Result<String, CommandFailure> {
    if args.is_empty() {
        return Ok(help_text());
    }

    match parse_cli_verb(args[0].as_str()) {
        CliVerb::Params => Ok(cmd_params(&parse_options(&args[1..])?)?),
        CliVerb::Flags => Ok(cmd_flags(&parse_options(&args[1..])?)?),
        CliVerb::Provision => Ok(cmd_provision(&parse_options(&args[1..])?)?),
        CliVerb::Run => cmd_run(&parse_options(&args[1..])?),
        CliVerb::Help => Ok(help_text()),
        CliVerb::Unknown => Err(format!("unknown command `{}`", args[0]).into()),
    }
}

fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn load_catalog(options: &CliOptions) -> Result<ParameterCatalog, String> {
    match &options.catalog {
        Some(path) => ParameterCatalog::from_path(path).map_err(|e| e.to_string()),
        None => Ok(ParameterCatalog::builtin()),
    }
}

fn load_values(options: &CliOptions, catalog: &ParameterCatalog) -> Result<ParameterValues, String> {
    let mut values = match &options.params_file {
        Some(path) => ParameterValues::from_yaml_path(path, catalog).map_err(|e| e.to_string())?,
        None => ParameterValues::new(),
    };
    for raw in &options.params {
        values
            .apply_assignment(raw, catalog)
            .map_err(|e| e.to_string())?;
    }
    Ok(values)
}

fn build_launcher(options: &CliOptions) -> Result<Launcher, String> {
    let settings: LauncherSettings =
        load_settings(options.config.as_deref()).map_err(|e| e.to_string())?;
    let catalog = load_catalog(options)?;
    let store_token = match &settings.artifact_store {
        ArtifactStoreSettings::Http {
            token_env: Some(key),
            ..
        } => env_lookup(key),
        _ => None,
    };
    let store = store_from_settings(&settings.artifact_store, store_token);
    Launcher::new(settings, catalog, store).map_err(|e| e.to_string())
}

fn cmd_params(options: &CliOptions) -> Result<String, String> {
    let catalog = load_catalog(options)?;
    catalog.validate().map_err(|e| e.to_string())?;

    let mut lines = Vec::new();
    for section in catalog.sections() {
        lines.push(format!("[{}]", section.title.unwrap_or("General")));
        for param in section.parameters {
            let default = param
                .default
                .as_ref()
                .map(|value| value.render())
                .unwrap_or_else(|| "-".to_string());
            lines.push(format!(
                "  {0:32} {1:20} default={2}",
                param.name,
                param.type_label(),
                default
            ));
            if !param.description.is_empty() {
                lines.push(format!("      {}", param.description));
            }
        }
    }
    Ok(lines.join("\n"))
}

fn cmd_flags(options: &CliOptions) -> Result<String, String> {
    let launcher = build_launcher(options)?;
    let values = load_values(options, launcher.catalog())?;
    let spec = launcher.assemble(&values).map_err(|e| e.to_string())?;
    Ok([
        format!("binary={}", spec.binary),
        format!("working_directory={}", spec.working_directory.display()),
        format!("command={}", spec.command_form()),
    ]
    .join("\n"))
}

fn cmd_provision(options: &CliOptions) -> Result<String, String> {
    let launcher = build_launcher(options)?;
    let context = ExecutionContext::from_lookup(&launcher.settings().context, env_lookup);
    let pvc_name = launcher
        .provision_storage(&context)
        .map_err(|e| e.to_string())?;
    Ok(format!("pvc_name={pvc_name}"))
}

fn cmd_run(options: &CliOptions) -> Result<String, CommandFailure> {
    let launcher = build_launcher(options)?;
    let values = load_values(options, launcher.catalog())?;
    let context = ExecutionContext::from_lookup(&launcher.settings().context, env_lookup);
    let report = launcher.run(&context, &values)?;

    Ok([
        "run=ok".to_string(),
        format!("pvc_name={}", report.pvc_name),
        format!("exit_code={}", report.exit_code),
        format!("elapsed_secs={}", report.elapsed.as_secs()),
        format!("files_copied={}", report.materialized.files),
        format!("log_upload={}", report.log_upload.as_str()),
    ]
    .join("\n"))
}
