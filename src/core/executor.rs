// src/core/executor.rs

//! The command execution lifecycle driver.
//!
//! `execute` looks the handler up, builds a fresh `ExecutionContext`,
//! drives the record through Pending -> Running -> Completed/Failed, and
//! appends the outcome to the session history. A handler error is absorbed
//! into a Failed record here; it never propagates past this boundary.

use crate::core::registry::{CommandRegistry, RegistryError};
use crate::core::session::{SessionError, SessionManager};
use crate::models::{
    CommandOutput, CommandRecord, CommandStateError, ExecutionContext, OutputFormat,
    ResolvedConfig,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Instant;
use thiserror::Error;
use uuid::Uuid;

/// Failures of dispatch itself, as opposed to failures of the handler
/// (which land in the command record).
#[derive(Error, Debug)]
pub enum DispatchError {
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    State(#[from] CommandStateError),
}

/// Per-dispatch inputs beyond the command name: arguments, environment
/// snapshot, working directory, and the output-format hint.
#[derive(Debug, Clone)]
pub struct Invocation {
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub working_dir: PathBuf,
    pub output_format: OutputFormat,
}

impl Invocation {
    pub fn with_args(args: Vec<String>) -> Self {
        Self {
            args,
            env: BTreeMap::new(),
            working_dir: PathBuf::from("."),
            output_format: OutputFormat::default(),
        }
    }
}

/// Dispatches one command invocation.
///
/// A lookup miss or an unknown session returns an error without creating a
/// command record or touching any history. After dispatch begins, the
/// returned record is always terminal: Completed with the handler's reply,
/// or Failed carrying the captured error message.
pub fn execute(
    registry: &CommandRegistry,
    sessions: &mut SessionManager,
    session_id: Uuid,
    name: &str,
    invocation: Invocation,
    config: &ResolvedConfig,
) -> Result<CommandRecord, DispatchError> {
    let command = registry.lookup(name)?;
    sessions.get(session_id)?;

    let command_line = if invocation.args.is_empty() {
        name.to_string()
    } else {
        format!("{} {}", name, invocation.args.join(" "))
    };

    let context = ExecutionContext {
        config: config.clone(),
        args: invocation.args,
        env: invocation.env,
        working_dir: invocation.working_dir,
        output_format: invocation.output_format,
    };

    let mut record = CommandRecord::new(command.name(), command_line, command.category());
    record.start_execution()?;
    let started = Instant::now();

    match command.invoke(&context) {
        Ok(reply) => {
            record.complete_execution(CommandOutput {
                exit_code: reply.exit_code,
                stdout: reply.stdout,
                stderr: reply.stderr,
                duration: started.elapsed(),
            })?;
        }
        Err(e) => {
            // Alternate-style multi-line format ("{:#}") keeps the whole
            // context chain in one captured message.
            let message = format!("{:#}", e);
            log::debug!("Handler '{}' failed: {}", command.name(), message);
            record.fail_execution(message)?;
        }
    }

    sessions.append_command(session_id, record.id())?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::registry::{CommandMetadata, CommandRegistry};
    use crate::models::{CommandStatus, HandlerReply};
    use anyhow::anyhow;

    fn empty_config() -> ResolvedConfig {
        ResolvedConfig::from_parts(BTreeMap::new(), BTreeMap::new(), Vec::new())
    }

    fn setup() -> (CommandRegistry, SessionManager, Uuid) {
        let mut registry = CommandRegistry::new();
        registry
            .register(
                "greet",
                Box::new(|ctx: &ExecutionContext| {
                    Ok(HandlerReply::success(format!("hello {}", ctx.args.join(" "))))
                }),
                CommandMetadata::describe("Greets the arguments."),
            )
            .unwrap();
        registry
            .register(
                "explode",
                Box::new(|_ctx: &ExecutionContext| Err(anyhow!("boom"))),
                CommandMetadata::default(),
            )
            .unwrap();

        let mut sessions = SessionManager::new();
        let session_id = sessions.create().id();
        (registry, sessions, session_id)
    }

    #[test]
    fn test_successful_dispatch_completes_and_records_history() {
        let (registry, mut sessions, session_id) = setup();

        let record = execute(
            &registry,
            &mut sessions,
            session_id,
            "greet",
            Invocation::with_args(vec!["world".to_string()]),
            &empty_config(),
        )
        .unwrap();

        assert_eq!(record.status(), CommandStatus::Completed);
        assert_eq!(record.command_line(), "greet world");
        let output = record.output().unwrap();
        assert_eq!(output.exit_code, 0);
        assert_eq!(output.stdout, "hello world");
        assert!(record.started_at().is_some());
        assert!(record.completed_at().is_some());

        let history = sessions.get(session_id).unwrap().command_history();
        assert_eq!(history, &[record.id()]);
    }

    #[test]
    fn test_handler_error_is_absorbed_into_failed_record() {
        let (registry, mut sessions, session_id) = setup();

        let record = execute(
            &registry,
            &mut sessions,
            session_id,
            "explode",
            Invocation::with_args(Vec::new()),
            &empty_config(),
        )
        .unwrap();

        assert_eq!(record.status(), CommandStatus::Failed);
        assert!(record.failure().unwrap().contains("boom"));
        assert!(record.output().is_none());

        // The failure still lands in the session history.
        let history = sessions.get(session_id).unwrap().command_history();
        assert_eq!(history, &[record.id()]);
    }

    #[test]
    fn test_missing_command_leaves_no_trace() {
        let (registry, mut sessions, session_id) = setup();

        let err = execute(
            &registry,
            &mut sessions,
            session_id,
            "missing-cmd",
            Invocation::with_args(Vec::new()),
            &empty_config(),
        )
        .unwrap_err();

        assert!(matches!(
            err,
            DispatchError::Registry(RegistryError::CommandNotFound { ref name }) if name == "missing-cmd"
        ));
        assert!(sessions.get(session_id).unwrap().command_history().is_empty());
    }

    #[test]
    fn test_unknown_session_fails_before_any_record() {
        let (registry, mut sessions, _) = setup();

        let err = execute(
            &registry,
            &mut sessions,
            Uuid::new_v4(),
            "greet",
            Invocation::with_args(Vec::new()),
            &empty_config(),
        )
        .unwrap_err();
        assert!(matches!(err, DispatchError::Session(_)));
    }

    #[test]
    fn test_alias_dispatch_records_canonical_name() {
        let mut registry = CommandRegistry::new();
        registry
            .register(
                "register",
                Box::new(|_ctx: &ExecutionContext| Ok(HandlerReply::success("ok"))),
                CommandMetadata::default().alias("reg"),
            )
            .unwrap();
        let mut sessions = SessionManager::new();
        let session_id = sessions.create().id();

        let record = execute(
            &registry,
            &mut sessions,
            session_id,
            "reg",
            Invocation::with_args(Vec::new()),
            &empty_config(),
        )
        .unwrap();
        assert_eq!(record.name(), "register");
    }
}
