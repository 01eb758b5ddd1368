//! Configuration loading and management

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// HTTP methods the route table can expose
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Options,
}

impl HttpMethod {
    /// Every method, in the order used for `Allow` headers
    pub const ALL: [HttpMethod; 6] = [
        HttpMethod::Get,
        HttpMethod::Post,
        HttpMethod::Put,
        HttpMethod::Patch,
        HttpMethod::Delete,
        HttpMethod::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
            HttpMethod::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration of one field of a model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Field name, used as JSON key and as URL segment for reference routes
    pub name: String,

    /// Scalar keyword (`string`, `number`, ...) or the name of another model
    #[serde(rename = "type")]
    pub field_type: String,

    /// Reject creates and replaces that omit this field
    #[serde(default)]
    pub required: bool,

    /// Value applied on create when the payload omits the field
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,

    /// URL segment of the reverse route on the target model
    ///
    /// Defaults to the declaring model's collection name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub inverse: Option<String>,
}

impl FieldConfig {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            required: false,
            default: None,
            inverse: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default = Some(value);
        self
    }

    pub fn with_inverse(mut self, inverse: impl Into<String>) -> Self {
        self.inverse = Some(inverse.into());
        self
    }
}

/// Declaration of one model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    /// Model name (e.g., "Book")
    pub name: String,

    /// Ordered field declarations
    #[serde(default)]
    pub fields: Vec<FieldConfig>,
}

impl ModelConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, field: FieldConfig) -> Self {
        self.fields.push(field);
        self
    }
}

/// Complete configuration consumed by the router builder
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    /// URL prefix placed before every collection segment
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// HTTP methods for which routes are registered
    #[serde(default = "default_methods")]
    pub methods: Vec<HttpMethod>,

    /// Apply declared field defaults on create
    #[serde(default = "default_true")]
    pub apply_defaults: bool,

    /// Fail startup instead of warning when a field type names no known model
    #[serde(default)]
    pub strict_references: bool,

    /// Models to expose
    #[serde(default)]
    pub models: Vec<ModelConfig>,
}

fn default_prefix() -> String {
    "/api/v1/".to_string()
}

fn default_methods() -> Vec<HttpMethod> {
    HttpMethod::ALL.to_vec()
}

fn default_true() -> bool {
    true
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            methods: default_methods(),
            apply_defaults: true,
            strict_references: false,
            models: Vec::new(),
        }
    }
}

impl ApiConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError {
            file: Some(path.to_string()),
            message: e.to_string(),
        })?;
        serde_yaml::from_str(&content).map_err(|e| ConfigError::ParseError {
            file: Some(path.to_string()),
            message: e.to_string(),
        })
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        serde_yaml::from_str(yaml).map_err(|e| ConfigError::ParseError {
            file: None,
            message: e.to_string(),
        })
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    pub fn with_methods(mut self, methods: impl IntoIterator<Item = HttpMethod>) -> Self {
        self.methods = methods.into_iter().collect();
        self
    }

    pub fn with_model(mut self, model: ModelConfig) -> Self {
        self.models.push(model);
        self
    }

    /// Whether routes for this method are registered
    pub fn allows(&self, method: HttpMethod) -> bool {
        self.methods.contains(&method)
    }

    /// Merge several configuration fragments
    ///
    /// Models are concatenated in order; scalar settings come from the last
    /// fragment. Duplicate model names are kept so that schema construction
    /// reports them.
    pub fn merge(configs: Vec<ApiConfig>) -> Self {
        let mut merged = ApiConfig::default();
        let mut models = Vec::new();

        for config in configs {
            merged.prefix = config.prefix;
            merged.methods = config.methods;
            merged.apply_defaults = config.apply_defaults;
            merged.strict_references = config.strict_references;
            models.extend(config.models);
        }

        merged.models = models;
        merged
    }
}
