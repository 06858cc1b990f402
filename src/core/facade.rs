// src/core/facade.rs

//! The single entry point the CLI front end talks to.
//!
//! `CoreFacade` composes the registry, the session manager, the schema,
//! and the profile source into one explicit context object passed around
//! by the caller. There is no process-wide state: two facades in one
//! process are fully isolated. Everything here is single-threaded and
//! blocking; concurrent access must be serialized by the caller.

use crate::core::config_resolver::{self, ResolveRequest, ResolverError};
use crate::core::executor::{self, DispatchError, Invocation};
use crate::core::profile_graph::ProfileSource;
use crate::core::registry::{CommandHandler, CommandMetadata, CommandRegistry, RegistryError};
use crate::core::schema::ConfigSchema;
use crate::core::session::{SessionError, SessionManager, SessionStore};
use crate::models::{CommandRecord, ResolvedConfig, Session};
use std::collections::BTreeMap;
use uuid::Uuid;

pub struct CoreFacade {
    registry: CommandRegistry,
    sessions: SessionManager,
    commands: BTreeMap<Uuid, CommandRecord>,
    schema: ConfigSchema,
    profiles: Box<dyn ProfileSource>,
}

impl CoreFacade {
    pub fn new(schema: ConfigSchema, profiles: Box<dyn ProfileSource>) -> Self {
        Self {
            registry: CommandRegistry::new(),
            sessions: SessionManager::new(),
            commands: BTreeMap::new(),
            schema,
            profiles,
        }
    }

    /// Attaches an optional persistence collaborator for sessions.
    pub fn with_session_store(mut self, store: Box<dyn SessionStore>) -> Self {
        self.sessions = SessionManager::new().with_store(store);
        self
    }

    pub fn schema(&self) -> &ConfigSchema {
        &self.schema
    }

    // --- Commands ---

    pub fn register_command(
        &mut self,
        name: impl Into<String>,
        handler: CommandHandler,
        metadata: CommandMetadata,
    ) -> Result<(), RegistryError> {
        self.registry.register(name, handler, metadata)
    }

    /// Registered command names in registration order, for help/listing.
    pub fn list_commands(&self) -> Vec<&str> {
        self.registry.list()
    }

    pub fn registry(&self) -> &CommandRegistry {
        &self.registry
    }

    // --- Configuration ---

    pub fn resolve_config(&self, request: &ResolveRequest) -> Result<ResolvedConfig, ResolverError> {
        config_resolver::resolve(self.profiles.as_ref(), &self.schema, request)
    }

    // --- Sessions ---

    pub fn open_session(&mut self) -> Uuid {
        self.sessions.create().id()
    }

    pub fn session(&mut self, id: Uuid) -> Result<&Session, SessionError> {
        self.sessions.get(id)
    }

    // --- Execution ---

    /// Dispatches one command invocation within a session and retains the
    /// resulting record. Handler failures come back as a Failed record, not
    /// as an `Err`.
    pub fn execute(
        &mut self,
        session_id: Uuid,
        name: &str,
        invocation: Invocation,
        config: &ResolvedConfig,
    ) -> Result<&CommandRecord, DispatchError> {
        let record = executor::execute(
            &self.registry,
            &mut self.sessions,
            session_id,
            name,
            invocation,
            config,
        )?;
        let id = record.id();
        self.commands.insert(id, record);
        // Just inserted above.
        Ok(&self.commands[&id])
    }

    /// Looks up a retained command record by id.
    pub fn command(&self, id: Uuid) -> Option<&CommandRecord> {
        self.commands.get(&id)
    }

    /// The session's command records, in history (dispatch) order.
    pub fn command_history(&mut self, session_id: Uuid) -> Result<Vec<&CommandRecord>, SessionError> {
        let ids: Vec<Uuid> = self.sessions.get(session_id)?.command_history().to_vec();
        Ok(ids.iter().filter_map(|id| self.commands.get(id)).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config_resolver::ResolveRequest;
    use crate::core::profile_graph::MemoryProfileSource;
    use crate::core::schema::{FieldKind, FieldSpec};
    use crate::models::{CommandStatus, ExecutionContext, HandlerReply, Profile};
    use anyhow::anyhow;

    fn facade() -> CoreFacade {
        let schema = ConfigSchema::new()
            .field(FieldSpec::new("debug", FieldKind::Bool).default_value(false))
            .field(
                FieldSpec::new("output_format", FieldKind::String)
                    .default_value("table")
                    .allowed(&["table", "json", "plain"]),
            );

        let mut profiles = MemoryProfileSource::new();
        let mut dev = Profile::new("dev");
        dev.settings.insert("debug".to_string(), true.into());
        profiles.insert(dev);

        let mut facade = CoreFacade::new(schema, Box::new(profiles));
        facade
            .register_command(
                "echo",
                Box::new(|ctx: &ExecutionContext| Ok(HandlerReply::success(ctx.args.join(" ")))),
                CommandMetadata::describe("Echoes its arguments."),
            )
            .unwrap();
        facade
            .register_command(
                "fail",
                Box::new(|_ctx: &ExecutionContext| Err(anyhow!("nope"))),
                CommandMetadata::default(),
            )
            .unwrap();
        facade
    }

    #[test]
    fn test_end_to_end_dispatch_and_history() {
        let mut facade = facade();
        let config = facade
            .resolve_config(&ResolveRequest::new().with_profile("dev"))
            .unwrap();
        assert_eq!(config.get_bool("debug"), Some(true));

        let session = facade.open_session();
        let first_id = facade
            .execute(
                session,
                "echo",
                Invocation::with_args(vec!["hi".to_string()]),
                &config,
            )
            .unwrap()
            .id();
        let second_id = facade
            .execute(session, "fail", Invocation::with_args(Vec::new()), &config)
            .unwrap()
            .id();

        let history = facade.command_history(session).unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].id(), first_id);
        assert_eq!(history[0].status(), CommandStatus::Completed);
        assert_eq!(history[1].id(), second_id);
        assert_eq!(history[1].status(), CommandStatus::Failed);
    }

    #[test]
    fn test_two_facades_are_isolated() {
        let mut a = facade();
        let b = facade();

        a.register_command(
            "extra",
            Box::new(|_ctx: &ExecutionContext| Ok(HandlerReply::success(""))),
            CommandMetadata::default(),
        )
        .unwrap();

        assert_eq!(a.list_commands(), vec!["echo", "fail", "extra"]);
        assert_eq!(b.list_commands(), vec!["echo", "fail"]);
    }

    #[test]
    fn test_command_lookup_by_id() {
        let mut facade = facade();
        let config = facade.resolve_config(&ResolveRequest::new()).unwrap();
        let session = facade.open_session();
        let id = facade
            .execute(session, "echo", Invocation::with_args(Vec::new()), &config)
            .unwrap()
            .id();

        assert_eq!(facade.command(id).unwrap().name(), "echo");
        assert!(facade.command(Uuid::new_v4()).is_none());
    }
}
