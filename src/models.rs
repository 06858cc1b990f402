// src/models.rs

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::time::{Duration, SystemTime};
use thiserror::Error;
use uuid::Uuid;

// --- CONFIGURATION VALUE MODEL ---

/// A dynamically-typed configuration value as found in profile files,
/// environment snapshots, and CLI overrides. Uses `untagged` so TOML
/// documents can use natural syntax for every shape.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    String(String),
    List(Vec<ConfigValue>),
    Mapping(BTreeMap<String, ConfigValue>),
}

impl ConfigValue {
    /// A short human-readable name for the value's shape, used in logs
    /// and validation messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::List(_) => "list",
            Self::Mapping(_) => "mapping",
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(i) => Some(*i),
            _ => None,
        }
    }
}

impl fmt::Display for ConfigValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Integer(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::String(s) => write!(f, "{}", s),
            Self::List(items) => {
                let rendered: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", rendered.join(", "))
            }
            Self::Mapping(map) => {
                let rendered: Vec<String> =
                    map.iter().map(|(k, v)| format!("{}={}", k, v)).collect();
                write!(f, "{{{}}}", rendered.join(", "))
            }
        }
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for ConfigValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for ConfigValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

// --- PROFILE MODELS (What is read from a profile file) ---

/// The deserialized structure of a profile document: the reserved
/// `inherits_from` key plus arbitrary settings keys.
#[derive(Deserialize, Debug, Clone, Default)]
pub(crate) struct ProfileDocument {
    pub inherits_from: Option<String>,
    #[serde(flatten)]
    pub settings: BTreeMap<String, ConfigValue>,
}

/// A named, inheritable bundle of configuration settings.
/// Immutable once loaded; the inheritance graph must be acyclic.
#[derive(Debug, Clone)]
pub struct Profile {
    pub name: String,
    pub inherits_from: Option<String>,
    pub settings: BTreeMap<String, ConfigValue>,
}

impl Profile {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inherits_from: None,
            settings: BTreeMap::new(),
        }
    }

    pub(crate) fn from_document(name: &str, doc: ProfileDocument) -> Self {
        Self {
            name: name.to_string(),
            inherits_from: doc.inherits_from,
            settings: doc.settings,
        }
    }
}

// --- RESOLVED CONFIGURATION ---

/// The origin a resolved key was taken from, in ascending precedence.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum Provenance {
    Defaults,
    Profile,
    Env,
    Cli,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Defaults => "defaults",
            Self::Profile => "profile",
            Self::Env => "env",
            Self::Cli => "cli",
        };
        f.write_str(label)
    }
}

/// The final, validated, precedence-merged configuration snapshot for one
/// run. Created once per resolution call; read-only afterwards, so it is
/// safe to share across any number of readers.
#[derive(Serialize, Debug, Clone)]
pub struct ResolvedConfig {
    values: BTreeMap<String, ConfigValue>,
    provenance: BTreeMap<String, Provenance>,
    warnings: Vec<String>,
}

impl ResolvedConfig {
    pub(crate) fn from_parts(
        values: BTreeMap<String, ConfigValue>,
        provenance: BTreeMap<String, Provenance>,
        warnings: Vec<String>,
    ) -> Self {
        Self {
            values,
            provenance,
            warnings,
        }
    }

    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        self.values.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.values.get(key).and_then(ConfigValue::as_str)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.values.get(key).and_then(ConfigValue::as_bool)
    }

    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.values.get(key).and_then(ConfigValue::as_integer)
    }

    /// The source the key's final value came from, if the key exists.
    pub fn provenance(&self, key: &str) -> Option<Provenance> {
        self.provenance.get(key).copied()
    }

    /// Non-fatal notes recorded during resolution (missing optional
    /// profile, ignored unknown keys in lenient mode).
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    /// Iterates resolved keys in lexicographic order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ConfigValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

// --- COMMAND LIFECYCLE MODELS ---

/// Lifecycle states of a dispatched command. Transitions are strictly
/// forward: Pending -> Running -> Completed | Failed.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "UPPERCASE")]
pub enum CommandStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl fmt::Display for CommandStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Completed => "COMPLETED",
            Self::Failed => "FAILED",
        };
        f.write_str(label)
    }
}

/// What a handler produced: exit code plus captured streams.
#[derive(Serialize, Debug, Clone, Default)]
pub struct HandlerReply {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl HandlerReply {
    pub fn success(stdout: impl Into<String>) -> Self {
        Self {
            exit_code: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    pub fn failure(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self {
            exit_code,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }
}

/// The recorded outcome of a finished command.
#[derive(Serialize, Debug, Clone)]
pub struct CommandOutput {
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub duration: Duration,
}

#[derive(Error, Debug)]
pub enum CommandStateError {
    #[error("Command '{name}' cannot transition from {from} to {to}.")]
    InvalidTransition {
        name: String,
        from: CommandStatus,
        to: CommandStatus,
    },
}

/// One dispatched invocation of a registered handler, tracked through its
/// lifecycle state machine. Mutation happens only through the transition
/// methods; a record in a terminal state is frozen.
#[derive(Debug, Clone)]
pub struct CommandRecord {
    id: Uuid,
    name: String,
    command_line: String,
    kind: String,
    status: CommandStatus,
    started_at: Option<SystemTime>,
    completed_at: Option<SystemTime>,
    output: Option<CommandOutput>,
    failure: Option<String>,
}

impl CommandRecord {
    pub(crate) fn new(
        name: impl Into<String>,
        command_line: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            command_line: command_line.into(),
            kind: kind.into(),
            status: CommandStatus::Pending,
            started_at: None,
            completed_at: None,
            output: None,
            failure: None,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command_line(&self) -> &str {
        &self.command_line
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn status(&self) -> CommandStatus {
        self.status
    }

    pub fn started_at(&self) -> Option<SystemTime> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<SystemTime> {
        self.completed_at
    }

    pub fn output(&self) -> Option<&CommandOutput> {
        self.output.as_ref()
    }

    /// The captured failure message, present only in the Failed state.
    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    /// One-shot transition Pending -> Running.
    pub fn start_execution(&mut self) -> Result<(), CommandStateError> {
        if self.status != CommandStatus::Pending {
            return Err(CommandStateError::InvalidTransition {
                name: self.name.clone(),
                from: self.status,
                to: CommandStatus::Running,
            });
        }
        self.status = CommandStatus::Running;
        self.started_at = Some(SystemTime::now());
        Ok(())
    }

    /// Terminal transition Running -> Completed.
    pub fn complete_execution(&mut self, output: CommandOutput) -> Result<(), CommandStateError> {
        if self.status != CommandStatus::Running {
            return Err(CommandStateError::InvalidTransition {
                name: self.name.clone(),
                from: self.status,
                to: CommandStatus::Completed,
            });
        }
        self.status = CommandStatus::Completed;
        self.completed_at = Some(SystemTime::now());
        self.output = Some(output);
        Ok(())
    }

    /// Terminal transition Running -> Failed, carrying the captured message.
    pub fn fail_execution(&mut self, message: impl Into<String>) -> Result<(), CommandStateError> {
        if self.status != CommandStatus::Running {
            return Err(CommandStateError::InvalidTransition {
                name: self.name.clone(),
                from: self.status,
                to: CommandStatus::Failed,
            });
        }
        self.status = CommandStatus::Failed;
        self.completed_at = Some(SystemTime::now());
        self.failure = Some(message.into());
        Ok(())
    }
}

// --- SESSION MODELS ---

/// A logical grouping of command invocations with shared history.
/// The history is append-only: ids are never removed or reordered.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Session {
    id: Uuid,
    created_at: SystemTime,
    last_activity: SystemTime,
    command_history: Vec<Uuid>,
}

impl Session {
    pub(crate) fn new() -> Self {
        let now = SystemTime::now();
        Self {
            id: Uuid::new_v4(),
            created_at: now,
            last_activity: now,
            command_history: Vec::new(),
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn created_at(&self) -> SystemTime {
        self.created_at
    }

    pub fn last_activity(&self) -> SystemTime {
        self.last_activity
    }

    pub fn command_history(&self) -> &[Uuid] {
        &self.command_history
    }

    pub(crate) fn push_command(&mut self, command_id: Uuid) {
        self.command_history.push(command_id);
        self.last_activity = SystemTime::now();
    }

    pub(crate) fn touch(&mut self) {
        self.last_activity = SystemTime::now();
    }
}

// --- EXECUTION CONTEXT ---

/// Output-format hint passed to handlers and the renderer.
#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Plain,
}

impl OutputFormat {
    /// Parses the `output_format` configuration value. Unrecognized names
    /// fall back to the default; the schema's allowed-values check is the
    /// authoritative gate.
    pub fn from_config(value: Option<&str>) -> Self {
        match value {
            Some("json") => Self::Json,
            Some("plain") => Self::Plain,
            _ => Self::Table,
        }
    }
}

/// The immutable bundle of inputs serving exactly one execution: resolved
/// config snapshot, invocation arguments, environment snapshot, working
/// directory, and the output-format hint.
#[derive(Debug, Clone)]
pub struct ExecutionContext {
    pub config: ResolvedConfig,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub working_dir: PathBuf,
    pub output_format: OutputFormat,
}
