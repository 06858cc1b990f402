// src/core/registry.rs

//! The in-memory command registry: name -> handler + metadata.
//!
//! Registration order is preserved because `list()` feeds help output and
//! must be deterministic. Lookup is a linear scan over names and aliases;
//! registries hold tens of commands, not thousands.

use crate::models::{ExecutionContext, HandlerReply};
use anyhow::Result;
use thiserror::Error;

/// The single documented handler signature: exactly one `ExecutionContext`
/// argument. There is no alternate arity and no introspection-based retry.
pub type CommandHandler = Box<dyn Fn(&ExecutionContext) -> Result<HandlerReply>>;

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Command '{name}' is already registered.")]
    CommandConflict { name: String },
    #[error("Command '{name}' not found.")]
    CommandNotFound { name: String },
}

/// Descriptive metadata supplied at registration time.
#[derive(Debug, Clone)]
pub struct CommandMetadata {
    pub description: String,
    pub aliases: Vec<String>,
    pub category: String,
}

impl Default for CommandMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            aliases: Vec::new(),
            category: "command".to_string(),
        }
    }
}

impl CommandMetadata {
    pub fn describe(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Default::default()
        }
    }

    pub fn alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }
}

/// A registered command: its names plus the handler itself.
pub struct RegisteredCommand {
    name: String,
    description: String,
    aliases: Vec<String>,
    category: String,
    handler: CommandHandler,
}

impl RegisteredCommand {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn aliases(&self) -> &[String] {
        &self.aliases
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn invoke(&self, context: &ExecutionContext) -> Result<HandlerReply> {
        (self.handler)(context)
    }

    fn answers_to(&self, name: &str) -> bool {
        self.name == name || self.aliases.iter().any(|a| a == name)
    }
}

/// In-memory map of command name -> handler + metadata.
#[derive(Default)]
pub struct CommandRegistry {
    commands: Vec<RegisteredCommand>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a command. Fails with a conflict if the name or any alias
    /// clashes with an existing name or alias; the registry is unchanged on
    /// failure.
    pub fn register(
        &mut self,
        name: impl Into<String>,
        handler: CommandHandler,
        metadata: CommandMetadata,
    ) -> Result<(), RegistryError> {
        let name = name.into();
        let mut incoming = vec![name.as_str()];
        incoming.extend(metadata.aliases.iter().map(String::as_str));

        for candidate in &incoming {
            if self.commands.iter().any(|c| c.answers_to(candidate)) {
                return Err(RegistryError::CommandConflict {
                    name: candidate.to_string(),
                });
            }
        }

        log::debug!("Registering command '{}'", name);
        self.commands.push(RegisteredCommand {
            name,
            description: metadata.description,
            aliases: metadata.aliases,
            category: metadata.category,
            handler,
        });
        Ok(())
    }

    /// Finds a command by its name or one of its aliases.
    pub fn lookup(&self, name: &str) -> Result<&RegisteredCommand, RegistryError> {
        self.commands
            .iter()
            .find(|c| c.answers_to(name))
            .ok_or_else(|| RegistryError::CommandNotFound {
                name: name.to_string(),
            })
    }

    /// Registered command names, in registration order.
    pub fn list(&self) -> Vec<&str> {
        self.commands.iter().map(|c| c.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{OutputFormat, ResolvedConfig};
    use std::collections::BTreeMap;
    use std::path::PathBuf;

    fn empty_context() -> ExecutionContext {
        ExecutionContext {
            config: ResolvedConfig::from_parts(BTreeMap::new(), BTreeMap::new(), Vec::new()),
            args: Vec::new(),
            env: BTreeMap::new(),
            working_dir: PathBuf::from("."),
            output_format: OutputFormat::Table,
        }
    }

    fn reply_with(text: &'static str) -> CommandHandler {
        Box::new(move |_ctx| Ok(HandlerReply::success(text)))
    }

    #[test]
    fn test_duplicate_registration_keeps_first_handler() {
        let mut registry = CommandRegistry::new();
        registry
            .register("build", reply_with("first"), CommandMetadata::default())
            .unwrap();

        let err = registry
            .register("build", reply_with("second"), CommandMetadata::default())
            .unwrap_err();
        assert!(matches!(err, RegistryError::CommandConflict { name } if name == "build"));

        let reply = registry
            .lookup("build")
            .unwrap()
            .invoke(&empty_context())
            .unwrap();
        assert_eq!(reply.stdout, "first");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_alias_conflicts_leave_registry_unchanged() {
        let mut registry = CommandRegistry::new();
        registry
            .register(
                "delete",
                reply_with("delete"),
                CommandMetadata::default().alias("del"),
            )
            .unwrap();

        // New command whose alias collides with an existing alias.
        let err = registry
            .register(
                "deluge",
                reply_with("deluge"),
                CommandMetadata::default().alias("del"),
            )
            .unwrap_err();
        assert!(matches!(err, RegistryError::CommandConflict { .. }));
        assert_eq!(registry.list(), vec!["delete"]);
    }

    #[test]
    fn test_lookup_by_alias() {
        let mut registry = CommandRegistry::new();
        registry
            .register(
                "register",
                reply_with("reg"),
                CommandMetadata::describe("Register a thing.").alias("reg"),
            )
            .unwrap();

        assert_eq!(registry.lookup("reg").unwrap().name(), "register");
        assert!(registry.lookup("unknown").is_err());
    }

    #[test]
    fn test_list_preserves_registration_order() {
        let mut registry = CommandRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            registry
                .register(name, reply_with("x"), CommandMetadata::default())
                .unwrap();
        }
        assert_eq!(registry.list(), vec!["zeta", "alpha", "mid"]);
    }
}
