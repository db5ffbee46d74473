use crate::pipeline::{InvocationSpec, PipelineError, PipelineRun};
use std::collections::BTreeMap;
use std::process::{Command, Stdio};
use std::time::Instant;

/// Inherited variables overlaid with `overrides`; an override replaces an
/// inherited value of the same key.
pub fn merge_environment<I>(
    inherited: I,
    overrides: &BTreeMap<String, String>,
) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let mut env: BTreeMap<String, String> = inherited.into_iter().collect();
    for (key, value) in overrides {
        env.insert(key.clone(), value.clone());
    }
    env
}

/// Runs the pipeline to completion with the given environment. Output goes
/// straight to this process's stdout/stderr.
pub fn run_pipeline(
    spec: &InvocationSpec,
    env: &BTreeMap<String, String>,
) -> Result<PipelineRun, PipelineError> {
    if !spec.working_directory.is_dir() {
        return Err(PipelineError::MissingWorkingDirectory {
            path: spec.working_directory.display().to_string(),
        });
    }

    let command_form = spec.command_form();
    let mut command = Command::new(&spec.binary);
    command
        .current_dir(&spec.working_directory)
        .args(&spec.args)
        .env_clear()
        .envs(env)
        .stdin(Stdio::null())
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit());

    let start = Instant::now();
    let status = match command.status() {
        Ok(status) => status,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            return Err(PipelineError::MissingBinary {
                binary: spec.binary.clone(),
            })
        }
        Err(source) => {
            return Err(PipelineError::Spawn {
                binary: spec.binary.clone(),
                source,
            })
        }
    };
    let elapsed = start.elapsed();

    let exit_code = status.code().unwrap_or(-1);
    if !status.success() {
        return Err(PipelineError::NonZeroExit {
            exit_code,
            command_form,
        });
    }

    Ok(PipelineRun {
        command_form,
        exit_code,
        elapsed,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_win_over_inherited_values() {
        let inherited = vec![
            ("PATH".to_string(), "/usr/bin".to_string()),
            ("NXF_HOME".to_string(), "/home/user/.nextflow".to_string()),
        ];
        let overrides = BTreeMap::from([
            ("NXF_HOME".to_string(), "/root/.nextflow".to_string()),
            ("K8S_STORAGE_CLAIM_NAME".to_string(), "pvc-1".to_string()),
        ]);

        let env = merge_environment(inherited, &overrides);
        assert_eq!(env.get("PATH"), Some(&"/usr/bin".to_string()));
        assert_eq!(env.get("NXF_HOME"), Some(&"/root/.nextflow".to_string()));
        assert_eq!(
            env.get("K8S_STORAGE_CLAIM_NAME"),
            Some(&"pvc-1".to_string())
        );
        assert_eq!(env.len(), 3);
    }
}
