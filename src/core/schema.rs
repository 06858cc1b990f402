// src/core/schema.rs

//! Declared shape of the resolved configuration: field types, requiredness,
//! defaults, and value constraints, checked once at the resolution boundary.

use crate::core::config_resolver::ResolverError;
use crate::models::ConfigValue;
use std::collections::BTreeMap;

/// The declared type of a configuration field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Bool,
    Integer,
    List,
    Mapping,
}

impl FieldKind {
    pub fn expected_name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Bool => "bool",
            Self::Integer => "integer",
            Self::List => "list",
            Self::Mapping => "mapping",
        }
    }
}

/// Declaration of one configuration field.
#[derive(Debug, Clone)]
pub struct FieldSpec {
    pub key: String,
    pub kind: FieldKind,
    pub required: bool,
    pub default: Option<ConfigValue>,
    pub allowed: Option<Vec<String>>,
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl FieldSpec {
    pub fn new(key: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            key: key.into(),
            kind,
            required: false,
            default: None,
            allowed: None,
            min: None,
            max: None,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<ConfigValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Restricts a string field to a fixed set of values.
    pub fn allowed(mut self, values: &[&str]) -> Self {
        self.allowed = Some(values.iter().map(|s| s.to_string()).collect());
        self
    }

    /// Restricts an integer field to an inclusive range.
    pub fn range(mut self, min: i64, max: i64) -> Self {
        self.min = Some(min);
        self.max = Some(max);
        self
    }
}

/// An ordered collection of field declarations. Field order is the order
/// validation runs in, which matters because validation is fail-fast.
#[derive(Debug, Clone, Default)]
pub struct ConfigSchema {
    fields: Vec<FieldSpec>,
}

impl ConfigSchema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, spec: FieldSpec) -> Self {
        self.fields.push(spec);
        self
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.key == key)
    }

    /// Maps a dotted key from the environment convention onto a declared
    /// field key: exact match first, then the underscore-flattened form
    /// (`output.format` -> `output_format`).
    pub fn canonical_key(&self, dotted: &str) -> Option<&str> {
        if let Some(spec) = self.get(dotted) {
            return Some(&spec.key);
        }
        let flattened = dotted.replace('.', "_");
        self.get(&flattened).map(|spec| spec.key.as_str())
    }

    /// The lowest-precedence configuration layer: every declared default.
    pub fn defaults(&self) -> BTreeMap<String, ConfigValue> {
        self.fields
            .iter()
            .filter_map(|f| f.default.clone().map(|v| (f.key.clone(), v)))
            .collect()
    }

    /// Validates a fully merged value map. Fail-fast: the first violation
    /// is returned, in field declaration order.
    pub fn validate(&self, values: &BTreeMap<String, ConfigValue>) -> Result<(), ResolverError> {
        for spec in &self.fields {
            let value = match values.get(&spec.key) {
                Some(value) => value,
                None if spec.required => {
                    return Err(ResolverError::Validation {
                        key: spec.key.clone(),
                        message: "required field is missing".to_string(),
                    });
                }
                None => continue,
            };

            self.validate_kind(spec, value)?;
            self.validate_constraints(spec, value)?;
        }
        Ok(())
    }

    fn validate_kind(&self, spec: &FieldSpec, value: &ConfigValue) -> Result<(), ResolverError> {
        let matches = matches!(
            (spec.kind, value),
            (FieldKind::String, ConfigValue::String(_))
                | (FieldKind::Bool, ConfigValue::Bool(_))
                | (FieldKind::Integer, ConfigValue::Integer(_))
                | (FieldKind::List, ConfigValue::List(_))
                | (FieldKind::Mapping, ConfigValue::Mapping(_))
        );
        if matches {
            return Ok(());
        }
        Err(ResolverError::Validation {
            key: spec.key.clone(),
            message: format!(
                "expected {}, found {} '{}'",
                spec.kind.expected_name(),
                value.type_name(),
                value
            ),
        })
    }

    fn validate_constraints(
        &self,
        spec: &FieldSpec,
        value: &ConfigValue,
    ) -> Result<(), ResolverError> {
        if let (Some(allowed), ConfigValue::String(s)) = (&spec.allowed, value) {
            if !allowed.iter().any(|a| a == s) {
                return Err(ResolverError::Validation {
                    key: spec.key.clone(),
                    message: format!(
                        "value '{}' is not one of the allowed values [{}]",
                        s,
                        allowed.join(", ")
                    ),
                });
            }
        }
        if let ConfigValue::Integer(i) = value {
            if let Some(min) = spec.min {
                if *i < min {
                    return Err(ResolverError::Validation {
                        key: spec.key.clone(),
                        message: format!("value {} is below the minimum {}", i, min),
                    });
                }
            }
            if let Some(max) = spec.max {
                if *i > max {
                    return Err(ResolverError::Validation {
                        key: spec.key.clone(),
                        message: format!("value {} is above the maximum {}", i, max),
                    });
                }
            }
        }
        Ok(())
    }
}
