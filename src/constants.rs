// src/constants.rs

/// Prefix for environment variables that map onto configuration keys.
pub const ENV_PREFIX: &str = "CADRE";

/// Delimiter marking a nested section in an environment variable name
/// (`CADRE_OUTPUT__FORMAT` -> `output.format`).
pub const ENV_NESTING_DELIMITER: &str = "__";

/// The name of the directory containing cadre configuration for a user (in ~/.config/).
pub const APP_CONFIG_DIR: &str = "cadre";

/// The name of the directory holding profile files (inside the config dir).
pub const PROFILE_DIR_NAME: &str = "profiles";

/// File extension for profile documents.
pub const PROFILE_FILE_EXTENSION: &str = "toml";

/// The reserved profile key naming the parent profile.
pub const INHERITS_FROM_KEY: &str = "inherits_from";

/// Hard ceiling on the length of a profile inheritance chain.
pub const MAX_INHERITANCE_DEPTH: usize = 32;
