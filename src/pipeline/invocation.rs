use crate::catalog::{FlagOrder, ParamKind, ParamValue, ParameterCatalog, ParameterValues};
use crate::config::PipelineSettings;
use crate::pipeline::InvocationSpec;
use std::path::Path;

/// Turns supplied values into `--name value` tokens in invocation order.
///
/// Values that are absent or equal to the declared default produce nothing,
/// leaving the pipeline's own default handling in charge. A `true` boolean
/// is a bare `--name`; `false` is omitted.
pub fn build_flags(
    catalog: &ParameterCatalog,
    order: &FlagOrder,
    values: &ParameterValues,
) -> Vec<String> {
    let mut flags = Vec::new();
    for name in order.as_slice() {
        let (Some(param), Some(value)) = (catalog.get(name), values.get(name)) else {
            continue;
        };
        let value = param.kind.coerce(value.clone()).unwrap_or_else(|_| value.clone());
        if param.is_default(&value) {
            continue;
        }
        let flag = format!("--{name}");
        match (param.kind, &value) {
            (ParamKind::Boolean, ParamValue::Bool(true)) => flags.push(flag),
            (ParamKind::Boolean, ParamValue::Bool(false)) => {}
            (_, ParamValue::Text(text)) if text.trim().is_empty() => {}
            (_, other) => {
                flags.push(flag);
                flags.push(other.render());
            }
        }
    }
    flags
}

pub fn build_invocation(
    settings: &PipelineSettings,
    work_dir: &Path,
    flags: Vec<String>,
) -> InvocationSpec {
    let mut args = vec![
        "run".to_string(),
        work_dir.join(&settings.entry_script).display().to_string(),
        "-work-dir".to_string(),
        work_dir.display().to_string(),
        "-profile".to_string(),
        settings.profile.clone(),
        "-c".to_string(),
        settings.config_file.clone(),
    ];
    args.extend(flags);
    InvocationSpec {
        binary: settings.binary.clone(),
        args,
        working_directory: work_dir.to_path_buf(),
    }
}
