use super::{ParamValue, ParameterCatalog};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ValuesError {
    #[error("failed to read parameter file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid parameter yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("parameter assignment `{0}` must use `name=value`")]
    MalformedAssignment(String),
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
    #[error("invalid value for parameter `{name}`: {reason}")]
    InvalidValue { name: String, reason: String },
    #[error("required parameter `{0}` is missing")]
    MissingRequired(String),
}

/// User-supplied values keyed by parameter name. A name that is not present
/// is "absent" and leaves the pipeline's own default in force.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterValues {
    values: BTreeMap<String, ParamValue>,
}

impl ParameterValues {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.values.insert(name.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, name: &str, value: ParamValue) {
        self.values.insert(name.to_string(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<ParamValue> {
        self.values.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.values.get(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Applies one `name=value` assignment, coercing the text to the declared
    /// kind. `name=` clears a previously supplied value.
    pub fn apply_assignment(
        &mut self,
        raw: &str,
        catalog: &ParameterCatalog,
    ) -> Result<(), ValuesError> {
        let (name, text) = raw
            .split_once('=')
            .ok_or_else(|| ValuesError::MalformedAssignment(raw.to_string()))?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ValuesError::MalformedAssignment(raw.to_string()));
        }
        let param = catalog
            .get(name)
            .ok_or_else(|| ValuesError::UnknownParameter(name.to_string()))?;
        match param
            .kind
            .parse_text(text)
            .map_err(|reason| ValuesError::InvalidValue {
                name: name.to_string(),
                reason,
            })? {
            Some(value) => self.insert(name, value),
            None => {
                self.remove(name);
            }
        }
        Ok(())
    }

    pub fn from_yaml_str(
        raw: &str,
        path: &Path,
        catalog: &ParameterCatalog,
    ) -> Result<Self, ValuesError> {
        let mapping: BTreeMap<String, serde_yaml::Value> =
            serde_yaml::from_str(raw).map_err(|source| ValuesError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        let mut values = Self::new();
        for (name, raw_value) in mapping {
            let param = catalog
                .get(&name)
                .ok_or_else(|| ValuesError::UnknownParameter(name.clone()))?;
            let invalid = |reason: String| ValuesError::InvalidValue {
                name: name.clone(),
                reason,
            };
            let value = match raw_value {
                serde_yaml::Value::Null => continue,
                serde_yaml::Value::Bool(v) => ParamValue::Bool(v),
                serde_yaml::Value::Number(n) => match n.as_i64() {
                    Some(v) => ParamValue::Int(v),
                    None => ParamValue::Float(n.as_f64().unwrap_or(f64::NAN)),
                },
                serde_yaml::Value::String(text) => match param.kind.parse_text(&text) {
                    Ok(Some(value)) => value,
                    Ok(None) => continue,
                    Err(reason) => return Err(invalid(reason)),
                },
                _ => return Err(invalid("expected a scalar value".to_string())),
            };
            let value = param.kind.coerce(value).map_err(invalid)?;
            values.insert(&name, value);
        }
        Ok(values)
    }

    pub fn from_yaml_path(path: &Path, catalog: &ParameterCatalog) -> Result<Self, ValuesError> {
        let raw = fs::read_to_string(path).map_err(|source| ValuesError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml_str(&raw, path, catalog)
    }

    /// Checks the values against the workflow signature: every name is
    /// declared, every value fits its kind, required parameters are set.
    pub fn validate_against(&self, catalog: &ParameterCatalog) -> Result<(), ValuesError> {
        for (name, value) in &self.values {
            let param = catalog
                .get(name)
                .ok_or_else(|| ValuesError::UnknownParameter(name.clone()))?;
            param
                .kind
                .coerce(value.clone())
                .map_err(|reason| ValuesError::InvalidValue {
                    name: name.clone(),
                    reason,
                })?;
        }
        for param in &catalog.parameters {
            if !param.is_required() {
                continue;
            }
            let present = match self.values.get(&param.name) {
                Some(ParamValue::Text(text)) => !text.trim().is_empty(),
                Some(_) => true,
                None => false,
            };
            if !present {
                return Err(ValuesError::MissingRequired(param.name.clone()));
            }
        }
        Ok(())
    }
}
