// src/cli.rs

//! The demo front end's argument surface.
//!
//! The core consumes an opaque flag->value override map; translating clap
//! flags into resolved-config keys happens here and nowhere else.

use crate::models::ConfigValue;
use clap::Parser;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// cadre: layered configuration and command dispatch for CLI tools.
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Profile to resolve configuration from.
    #[arg(long)]
    pub profile: Option<String>,

    /// Continue with an empty profile layer if the profile is missing.
    #[arg(long)]
    pub profile_optional: bool,

    /// Override the `debug` setting (`--debug` or `--debug=false`).
    #[arg(long, num_args = 0..=1, default_missing_value = "true", require_equals = true)]
    pub debug: Option<bool>,

    /// Override the `output_format` setting (table, json, plain).
    #[arg(long)]
    pub output: Option<String>,

    /// Reject unknown configuration keys instead of ignoring them.
    #[arg(long)]
    pub strict: bool,

    /// Directory containing profile files. Defaults to ~/.config/cadre/profiles.
    #[arg(long)]
    pub profiles_dir: Option<PathBuf>,

    /// Command name followed by its arguments.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    pub args: Vec<String>,
}

impl Cli {
    /// Maps explicit flags one-to-one onto top-level resolved-config keys.
    pub fn overrides(&self) -> BTreeMap<String, ConfigValue> {
        let mut overrides = BTreeMap::new();
        if let Some(debug) = self.debug {
            overrides.insert("debug".to_string(), ConfigValue::Bool(debug));
        }
        if let Some(output) = &self.output {
            overrides.insert(
                "output_format".to_string(),
                ConfigValue::String(output.clone()),
            );
        }
        overrides
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flags_map_onto_config_keys() {
        let cli = Cli::try_parse_from(["cadre", "--debug", "--output", "json", "echo", "hi"])
            .unwrap();

        let overrides = cli.overrides();
        assert_eq!(overrides.get("debug"), Some(&ConfigValue::Bool(true)));
        assert_eq!(
            overrides.get("output_format"),
            Some(&ConfigValue::String("json".into()))
        );
        assert_eq!(cli.args, vec!["echo", "hi"]);
    }

    #[test]
    fn test_debug_accepts_explicit_value() {
        let cli = Cli::try_parse_from(["cadre", "--debug=false"]).unwrap();
        assert_eq!(cli.overrides().get("debug"), Some(&ConfigValue::Bool(false)));
    }

    #[test]
    fn test_no_flags_means_no_overrides() {
        let cli = Cli::try_parse_from(["cadre", "config"]).unwrap();
        assert!(cli.overrides().is_empty());
        assert_eq!(cli.args, vec!["config"]);
    }
}
