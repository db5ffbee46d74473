use std::path::PathBuf;
use std::time::Duration;

pub mod invocation;
pub mod runner;

pub use invocation::{build_flags, build_invocation};
pub use runner::{merge_environment, run_pipeline};

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("pipeline binary missing: {binary}")]
    MissingBinary { binary: String },
    #[error("failed to spawn pipeline `{binary}`: {source}")]
    Spawn {
        binary: String,
        #[source]
        source: std::io::Error,
    },
    #[error("pipeline working directory {path} is missing")]
    MissingWorkingDirectory { path: String },
    #[error("pipeline process failed with exit code {exit_code}")]
    NonZeroExit {
        exit_code: i32,
        command_form: String,
    },
}

/// Fully resolved command line for one pipeline launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvocationSpec {
    pub binary: String,
    pub args: Vec<String>,
    pub working_directory: PathBuf,
}

impl InvocationSpec {
    pub fn command_form(&self) -> String {
        let mut parts = Vec::with_capacity(self.args.len() + 1);
        parts.push(self.binary.as_str());
        parts.extend(self.args.iter().map(String::as_str));
        parts.join(" ")
    }
}

#[derive(Debug, Clone)]
pub struct PipelineRun {
    pub command_form: String,
    pub exit_code: i32,
    pub elapsed: Duration,
}
