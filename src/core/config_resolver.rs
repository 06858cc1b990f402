// src/core/config_resolver.rs

//! Multi-source configuration resolution with fixed precedence.
//!
//! Layers merge in one order that no runtime setting can alter:
//! CLI overrides > environment > profile (post-inheritance) > defaults.
//! Every merged value then passes through the normalization boundary and
//! one fail-fast validation pass against the declared schema.

use crate::constants::{ENV_NESTING_DELIMITER, ENV_PREFIX};
use crate::core::normalize;
use crate::core::profile_graph::{self, MissingProfilePolicy, ProfileSource};
use crate::core::schema::{ConfigSchema, FieldKind, FieldSpec};
use crate::models::{ConfigValue, Provenance, ResolvedConfig};
use std::collections::BTreeMap;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ResolverError {
    #[error("Filesystem Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Error parsing TOML in '{path}': {source}")]
    TomlParse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("Profile '{name}' not found.")]
    ProfileNotFound { name: String },
    #[error("Circular profile inheritance detected: {cycle_path}")]
    CyclicProfile { cycle_path: String },
    #[error("Profile inheritance chain exceeds {depth} levels at '{name}'.")]
    InheritanceTooDeep { depth: usize, name: String },
    #[error("Invalid value for key '{key}': {message}")]
    Validation { key: String, message: String },
    #[error("Unknown configuration key '{key}' (from {origin} source).")]
    UnknownKey { key: String, origin: Provenance },
}

/// How unknown keys are treated during resolution. A resolver parameter,
/// never global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum KeyPolicy {
    /// Unknown keys fail resolution.
    Strict,
    /// Unknown keys are dropped with a logged note and a recorded warning.
    #[default]
    Lenient,
}

/// One resolution call's inputs. The environment arrives as an injected
/// snapshot; the core never reads the process environment itself.
#[derive(Default)]
pub struct ResolveRequest {
    pub profile: Option<String>,
    pub missing_profile: MissingProfilePolicy,
    pub cli_overrides: BTreeMap<String, ConfigValue>,
    pub env: BTreeMap<String, String>,
    pub key_policy: KeyPolicy,
}

impl ResolveRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, name: impl Into<String>) -> Self {
        self.profile = Some(name.into());
        self
    }

    pub fn profile_optional(mut self) -> Self {
        self.missing_profile = MissingProfilePolicy::Optional;
        self
    }

    pub fn with_cli_override(mut self, key: impl Into<String>, value: impl Into<ConfigValue>) -> Self {
        self.cli_overrides.insert(key.into(), value.into());
        self
    }

    pub fn with_env(mut self, env: BTreeMap<String, String>) -> Self {
        self.env = env;
        self
    }

    pub fn with_key_policy(mut self, policy: KeyPolicy) -> Self {
        self.key_policy = policy;
        self
    }
}

// --- PUBLIC API ---

/// Resolves one configuration snapshot from all sources.
///
/// Steps: seed schema defaults, overlay the inherited profile layer,
/// overlay translated environment variables, overlay CLI flag values,
/// normalize per declared field kind, validate fail-fast. The first
/// validation violation is returned naming the offending key.
pub fn resolve(
    source: &dyn ProfileSource,
    schema: &ConfigSchema,
    request: &ResolveRequest,
) -> Result<ResolvedConfig, ResolverError> {
    let mut values = schema.defaults();
    let mut provenance: BTreeMap<String, Provenance> = values
        .keys()
        .map(|k| (k.clone(), Provenance::Defaults))
        .collect();
    let mut warnings = Vec::new();

    if let Some(profile_name) = &request.profile {
        let layer = profile_graph::resolve(source, profile_name, request.missing_profile)?;
        warnings.extend(layer.warnings);
        log::debug!(
            "Profile chain for '{}': [{}]",
            profile_name,
            layer.chain.join(" -> ")
        );
        for (key, value) in layer.settings {
            overlay(
                schema,
                &mut values,
                &mut provenance,
                &mut warnings,
                request.key_policy,
                key,
                value,
                Provenance::Profile,
            )?;
        }
    }

    for (key, value) in translate_env(&request.env) {
        overlay(
            schema,
            &mut values,
            &mut provenance,
            &mut warnings,
            request.key_policy,
            key,
            value,
            Provenance::Env,
        )?;
    }

    for (key, value) in &request.cli_overrides {
        overlay(
            schema,
            &mut values,
            &mut provenance,
            &mut warnings,
            request.key_policy,
            key.clone(),
            value.clone(),
            Provenance::Cli,
        )?;
    }

    for spec in schema.fields() {
        if let Some(value) = values.get(&spec.key) {
            let normalized = normalize_for(spec, value);
            values.insert(spec.key.clone(), normalized);
        }
    }

    schema.validate(&values)?;

    Ok(ResolvedConfig::from_parts(values, provenance, warnings))
}

// --- OVERLAY AND TRANSLATION ---

fn overlay(
    schema: &ConfigSchema,
    values: &mut BTreeMap<String, ConfigValue>,
    provenance: &mut BTreeMap<String, Provenance>,
    warnings: &mut Vec<String>,
    policy: KeyPolicy,
    key: String,
    value: ConfigValue,
    origin: Provenance,
) -> Result<(), ResolverError> {
    let canonical = match schema.canonical_key(&key) {
        Some(canonical) => canonical.to_string(),
        None => {
            match policy {
                KeyPolicy::Strict => {
                    return Err(ResolverError::UnknownKey { key, origin });
                }
                KeyPolicy::Lenient => {
                    let note = format!("Ignoring unknown {} key '{}'.", origin, key);
                    log::debug!("{}", note);
                    warnings.push(note);
                    return Ok(());
                }
            }
        }
    };
    values.insert(canonical.clone(), value);
    provenance.insert(canonical, origin);
    Ok(())
}

/// Translates prefixed environment variables into dotted configuration
/// keys: `CADRE_OUTPUT__FORMAT` becomes `output.format`. Values are parsed
/// as scalars where possible so `true` and `30` keep their native types.
fn translate_env(env: &BTreeMap<String, String>) -> Vec<(String, ConfigValue)> {
    let mut translated = Vec::new();
    for (name, raw) in env {
        let Some(rest) = name
            .strip_prefix(ENV_PREFIX)
            .and_then(|r| r.strip_prefix('_'))
        else {
            continue;
        };
        if rest.is_empty() {
            continue;
        }
        let key = rest
            .split(ENV_NESTING_DELIMITER)
            .map(str::to_lowercase)
            .collect::<Vec<_>>()
            .join(".");
        translated.push((key, parse_env_value(raw)));
    }
    translated
}

fn parse_env_value(raw: &str) -> ConfigValue {
    match raw {
        "true" => return ConfigValue::Bool(true),
        "false" => return ConfigValue::Bool(false),
        _ => {}
    }
    if let Ok(i) = raw.parse::<i64>() {
        return ConfigValue::Integer(i);
    }
    if let Ok(x) = raw.parse::<f64>() {
        return ConfigValue::Float(x);
    }
    ConfigValue::String(raw.to_string())
}

// --- NORMALIZATION PASS ---

/// Coerces one merged value into its declared field kind. Shape kinds go
/// through the total normalizer; typed scalars parse from strings when the
/// source supplied text. A value that cannot be brought into shape is left
/// as-is so validation can name the key precisely.
fn normalize_for(spec: &FieldSpec, value: &ConfigValue) -> ConfigValue {
    match spec.kind {
        FieldKind::String => {
            let default = spec
                .default
                .as_ref()
                .and_then(ConfigValue::as_str)
                .unwrap_or("");
            ConfigValue::String(normalize::ensure_string(Some(value), default))
        }
        FieldKind::List => {
            let default = match &spec.default {
                Some(ConfigValue::List(items)) => items.clone(),
                _ => Vec::new(),
            };
            ConfigValue::List(normalize::ensure_list(Some(value), &default))
        }
        FieldKind::Mapping => ConfigValue::Mapping(normalize::to_structured_mapping(Some(value))),
        FieldKind::Bool => match value {
            ConfigValue::String(s) if s.eq_ignore_ascii_case("true") => ConfigValue::Bool(true),
            ConfigValue::String(s) if s.eq_ignore_ascii_case("false") => ConfigValue::Bool(false),
            other => other.clone(),
        },
        FieldKind::Integer => match value {
            ConfigValue::String(s) => match s.parse::<i64>() {
                Ok(i) => ConfigValue::Integer(i),
                Err(_) => value.clone(),
            },
            other => other.clone(),
        },
    }
}
