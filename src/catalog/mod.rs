use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

pub mod builtin;
pub mod values;

pub use builtin::{crisprseq_catalog, CRISPRSEQ_INVOCATION_ORDER};
pub use values::{ParameterValues, ValuesError};

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid catalog yaml in {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("parameter `{0}` is declared more than once")]
    DuplicateName(String),
    #[error("unknown parameter `{0}`")]
    UnknownParameter(String),
    #[error("parameter `{0}` appears more than once in the invocation order")]
    DuplicateOrderEntry(String),
    #[error("invalid default for parameter `{name}`: {reason}")]
    InvalidDefault { name: String, reason: String },
    #[error("required parameter `{0}` must not declare a default")]
    RequiredWithDefault(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ParamKind {
    File,
    Directory,
    String,
    Boolean,
    Integer,
    Float,
}

impl ParamKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::File => "file",
            Self::Directory => "directory",
            Self::String => "string",
            Self::Boolean => "boolean",
            Self::Integer => "integer",
            Self::Float => "float",
        }
    }

    pub fn is_reference(self) -> bool {
        matches!(self, Self::File | Self::Directory)
    }

    /// Coerces command-line text into a value of this kind. Empty text is
    /// treated as "not supplied".
    pub fn parse_text(self, raw: &str) -> Result<Option<ParamValue>, String> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }
        let value = match self {
            Self::File | Self::Directory | Self::String => ParamValue::Text(trimmed.to_string()),
            Self::Boolean => match trimmed.to_ascii_lowercase().as_str() {
                "true" | "yes" | "1" => ParamValue::Bool(true),
                "false" | "no" | "0" => ParamValue::Bool(false),
                other => return Err(format!("`{other}` is not a boolean")),
            },
            Self::Integer => ParamValue::Int(
                trimmed
                    .parse::<i64>()
                    .map_err(|_| format!("`{trimmed}` is not an integer"))?,
            ),
            Self::Float => ParamValue::Float(
                trimmed
                    .parse::<f64>()
                    .map_err(|_| format!("`{trimmed}` is not a number"))?,
            ),
        };
        Ok(Some(value))
    }

    /// Normalizes an already-typed value to this kind, widening integers to
    /// floats where a float is declared.
    pub fn coerce(self, value: ParamValue) -> Result<ParamValue, String> {
        match (self, value) {
            (Self::File | Self::Directory | Self::String, ParamValue::Text(text)) => {
                Ok(ParamValue::Text(text))
            }
            (Self::String, ParamValue::Int(v)) => Ok(ParamValue::Text(v.to_string())),
            (Self::String, ParamValue::Float(v)) => {
                Ok(ParamValue::Text(ParamValue::Float(v).render()))
            }
            (Self::Boolean, ParamValue::Bool(v)) => Ok(ParamValue::Bool(v)),
            (Self::Integer, ParamValue::Int(v)) => Ok(ParamValue::Int(v)),
            (Self::Float, ParamValue::Float(v)) => Ok(ParamValue::Float(v)),
            (Self::Float, ParamValue::Int(v)) => Ok(ParamValue::Float(v as f64)),
            (Self::Boolean | Self::Integer | Self::Float, ParamValue::Text(text)) => self
                .parse_text(&text)?
                .ok_or_else(|| format!("empty value for {} parameter", self.as_str())),
            (kind, other) => Err(format!(
                "{} value `{}` does not fit a {} parameter",
                other.kind_label(),
                other.render(),
                kind.as_str()
            )),
        }
    }
}

impl std::fmt::Display for ParamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum ParamValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl ParamValue {
    fn kind_label(&self) -> &'static str {
        match self {
            Self::Bool(_) => "boolean",
            Self::Int(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
        }
    }

    /// Text form handed to the pipeline. Whole floats keep one decimal so
    /// `30.0` is not shortened to `30`.
    pub fn render(&self) -> String {
        match self {
            Self::Bool(v) => v.to_string(),
            Self::Int(v) => v.to_string(),
            Self::Float(v) if v.is_finite() && v.fract() == 0.0 => format!("{v:.1}"),
            Self::Float(v) => v.to_string(),
            Self::Text(v) => v.clone(),
        }
    }
}

impl From<&str> for ParamValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for ParamValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for ParamValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ParamValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for ParamValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParameterDefinition {
    pub name: String,
    pub kind: ParamKind,
    #[serde(default = "default_true")]
    pub optional: bool,
    #[serde(default)]
    pub output: bool,
    #[serde(default)]
    pub default: Option<ParamValue>,
    #[serde(default)]
    pub section_title: Option<String>,
    #[serde(default)]
    pub description: String,
}

fn default_true() -> bool {
    true
}

impl ParameterDefinition {
    pub fn type_label(&self) -> String {
        let prefix = if self.output {
            "output"
        } else if self.optional {
            "optional"
        } else {
            "required"
        };
        format!("{prefix} {}", self.kind)
    }

    pub fn is_required(&self) -> bool {
        !self.optional
    }

    pub fn is_default(&self, value: &ParamValue) -> bool {
        match &self.default {
            Some(default) => self.kind.coerce(default.clone()).as_ref() == Ok(value),
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ParameterCatalog {
    pub parameters: Vec<ParameterDefinition>,
    #[serde(default)]
    pub invocation_order: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CatalogSection<'a> {
    pub title: Option<&'a str>,
    pub parameters: Vec<&'a ParameterDefinition>,
}

impl ParameterCatalog {
    pub fn builtin() -> Self {
        crisprseq_catalog()
    }

    pub fn from_path(path: &Path) -> Result<Self, CatalogError> {
        let raw = fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let mut catalog: Self =
            serde_yaml::from_str(&raw).map_err(|source| CatalogError::Parse {
                path: path.display().to_string(),
                source,
            })?;
        catalog.validate()?;
        catalog.normalize_defaults();
        Ok(catalog)
    }

    /// Rewrites YAML literals (`30` for a float parameter, `"true"` for a
    /// boolean) into the declared kind. Call after `validate`.
    fn normalize_defaults(&mut self) {
        for param in &mut self.parameters {
            if let Some(default) = param.default.take() {
                param.default = Some(param.kind.coerce(default.clone()).unwrap_or(default));
            }
        }
    }

    pub fn validate(&self) -> Result<(), CatalogError> {
        let mut seen = HashSet::new();
        for param in &self.parameters {
            if !seen.insert(param.name.as_str()) {
                return Err(CatalogError::DuplicateName(param.name.clone()));
            }
            match &param.default {
                Some(_) if param.is_required() => {
                    return Err(CatalogError::RequiredWithDefault(param.name.clone()));
                }
                Some(default) => {
                    param.kind.coerce(default.clone()).map_err(|reason| {
                        CatalogError::InvalidDefault {
                            name: param.name.clone(),
                            reason,
                        }
                    })?;
                }
                None => {}
            }
        }
        self.flag_order().map(|_| ())
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDefinition> {
        self.parameters.iter().find(|param| param.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.parameters.iter().map(|param| param.name.as_str())
    }

    /// Invocation order declared by the catalog, or declaration order when
    /// none is given.
    pub fn flag_order(&self) -> Result<FlagOrder, CatalogError> {
        match &self.invocation_order {
            Some(order) => FlagOrder::new(order.iter().map(String::as_str), self),
            None => FlagOrder::new(self.names(), self),
        }
    }

    /// Groups parameters for display. A parameter without a section title
    /// stays in the section opened by the closest preceding title.
    pub fn sections(&self) -> Vec<CatalogSection<'_>> {
        let mut sections: Vec<CatalogSection<'_>> = Vec::new();
        for param in &self.parameters {
            let starts_new = match (&param.section_title, sections.last()) {
                (Some(_), _) | (None, None) => true,
                (None, Some(_)) => false,
            };
            if starts_new {
                sections.push(CatalogSection {
                    title: param.section_title.as_deref(),
                    parameters: Vec::new(),
                });
            }
            if let Some(current) = sections.last_mut() {
                current.parameters.push(param);
            }
        }
        sections
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagOrder(Vec<String>);

impl FlagOrder {
    pub fn new<'a, I>(names: I, catalog: &ParameterCatalog) -> Result<Self, CatalogError>
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut order = Vec::new();
        let mut seen = HashSet::new();
        for name in names {
            if catalog.get(name).is_none() {
                return Err(CatalogError::UnknownParameter(name.to_string()));
            }
            if !seen.insert(name.to_string()) {
                return Err(CatalogError::DuplicateOrderEntry(name.to_string()));
            }
            order.push(name.to_string());
        }
        Ok(Self(order))
    }

    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}
