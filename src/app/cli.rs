use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Params,
    Flags,
    Provision,
    Run,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "params" => CliVerb::Params,
        "flags" => CliVerb::Flags,
        "provision" => CliVerb::Provision,
        "run" => CliVerb::Run,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CliOptions {
    pub config: Option<PathBuf>,
    pub catalog: Option<PathBuf>,
    pub params_file: Option<PathBuf>,
    pub params: Vec<String>,
}

pub fn parse_options(args: &[String]) -> Result<CliOptions, String> {
    let mut options = CliOptions::default();
    let mut i = 0usize;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = || {
            args.get(i + 1)
                .filter(|v| !v.starts_with("--"))
                .cloned()
                .ok_or_else(|| format!("{flag} requires a value"))
        };
        match flag {
            "--config" => options.config = Some(PathBuf::from(value()?)),
            "--catalog" => options.catalog = Some(PathBuf::from(value()?)),
            "--params-file" => options.params_file = Some(PathBuf::from(value()?)),
            "--param" => {
                let raw = value()?;
                if !raw.contains('=') {
                    return Err("--param requires name=value".to_string());
                }
                options.params.push(raw);
            }
            other => return Err(format!("unexpected argument `{other}`")),
        }
        i += 2;
    }
    Ok(options)
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  params [--catalog <file>]            List pipeline parameters by section".to_string(),
        "  flags [options]                      Print the pipeline command without running it"
            .to_string(),
        "  provision [--config <file>]          Provision a shared storage volume".to_string(),
        "  run [options]                        Provision storage, stage the workdir and run"
            .to_string(),
        String::new(),
        "Options:".to_string(),
        "  --config <file>                      Launcher settings (yaml)".to_string(),
        "  --catalog <file>                     Parameter catalog (yaml), builtin if omitted"
            .to_string(),
        "  --params-file <file>                 Parameter values (yaml mapping)".to_string(),
        "  --param <name=value>                 Set one parameter; repeatable".to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn options_collect_repeated_params() {
        let options = parse_options(&args(&[
            "--config",
            "launcher.yaml",
            "--param",
            "analysis=targeted",
            "--param",
            "protospacer=ACGT",
        ]))
        .expect("parse");
        assert_eq!(options.config, Some(PathBuf::from("launcher.yaml")));
        assert_eq!(options.params, vec!["analysis=targeted", "protospacer=ACGT"]);
    }

    #[test]
    fn options_reject_missing_values_and_unknown_flags() {
        assert_eq!(
            parse_options(&args(&["--config"])),
            Err("--config requires a value".to_string())
        );
        assert_eq!(
            parse_options(&args(&["--param", "analysis"])),
            Err("--param requires name=value".to_string())
        );
        assert_eq!(
            parse_options(&args(&["--verbose"])),
            Err("unexpected argument `--verbose`".to_string())
        );
    }
}
