// src/core/profile_graph.rs

//! Profile inheritance as an explicit directed graph.
//!
//! `inherits_from` is an edge from child to parent. Resolution walks
//! parent-first with the current path as a visited set, so a cycle is
//! reported before any merge work happens instead of looping. Merge order
//! is root to leaf: each child's keys override the parent's.

use crate::constants::{MAX_INHERITANCE_DEPTH, PROFILE_FILE_EXTENSION};
use crate::core::config_resolver::ResolverError;
use crate::models::{ConfigValue, Profile, ProfileDocument};
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

/// Read-only provider of profiles by name. The resolver never cares where
/// profiles physically live.
pub trait ProfileSource {
    /// Loads the named profile, `Ok(None)` when no such profile exists.
    fn load(&self, name: &str) -> Result<Option<Profile>, ResolverError>;
}

/// Loads profiles from `<dir>/<name>.toml` documents.
pub struct DirProfileSource {
    dir: PathBuf,
}

impl DirProfileSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ProfileSource for DirProfileSource {
    fn load(&self, name: &str) -> Result<Option<Profile>, ResolverError> {
        let path = self.dir.join(format!("{}.{}", name, PROFILE_FILE_EXTENSION));
        if !path.is_file() {
            return Ok(None);
        }
        let content = fs::read_to_string(&path)?;
        let doc: ProfileDocument =
            toml::from_str(&content).map_err(|e| ResolverError::TomlParse {
                path: path.display().to_string(),
                source: e,
            })?;
        Ok(Some(Profile::from_document(name, doc)))
    }
}

/// In-memory profile source for tests and embedded setups.
#[derive(Default)]
pub struct MemoryProfileSource {
    profiles: BTreeMap<String, Profile>,
}

impl MemoryProfileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, profile: Profile) {
        self.profiles.insert(profile.name.clone(), profile);
    }
}

impl ProfileSource for MemoryProfileSource {
    fn load(&self, name: &str) -> Result<Option<Profile>, ResolverError> {
        Ok(self.profiles.get(name).cloned())
    }
}

/// What to do when the requested profile does not exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingProfilePolicy {
    /// A missing profile is a hard failure.
    #[default]
    Required,
    /// Resolution continues with an empty profile layer and a recorded
    /// warning.
    Optional,
}

/// The merged settings of one inheritance chain, plus the chain that was
/// actually walked (root first) for diagnostics.
#[derive(Debug, Clone, Default)]
pub struct ProfileLayer {
    pub settings: BTreeMap<String, ConfigValue>,
    pub chain: Vec<String>,
    pub warnings: Vec<String>,
}

/// Resolves a profile's effective settings through its inheritance chain.
///
/// A name reappearing on the current path fails with a cycle error naming
/// the full path. A missing parent anywhere in the chain is always a hard
/// failure; `MissingProfilePolicy::Optional` only forgives the requested
/// leaf profile itself.
pub fn resolve(
    source: &dyn ProfileSource,
    name: &str,
    policy: MissingProfilePolicy,
) -> Result<ProfileLayer, ResolverError> {
    let mut chain: Vec<Profile> = Vec::new();
    let mut path: Vec<String> = Vec::new();
    let mut next = Some(name.to_string());

    while let Some(current) = next {
        if path.iter().any(|seen| *seen == current) {
            let mut cycle = path.clone();
            cycle.push(current);
            return Err(ResolverError::CyclicProfile {
                cycle_path: cycle.join(" -> "),
            });
        }
        if path.len() >= MAX_INHERITANCE_DEPTH {
            return Err(ResolverError::InheritanceTooDeep {
                depth: MAX_INHERITANCE_DEPTH,
                name: current,
            });
        }

        let profile = match source.load(&current)? {
            Some(profile) => profile,
            None if path.is_empty() && policy == MissingProfilePolicy::Optional => {
                let warning = format!("Profile '{}' not found; continuing without it.", current);
                log::debug!("{}", warning);
                return Ok(ProfileLayer {
                    warnings: vec![warning],
                    ..Default::default()
                });
            }
            None => {
                return Err(ResolverError::ProfileNotFound { name: current });
            }
        };

        path.push(current);
        next = profile.inherits_from.clone();
        chain.push(profile);
    }

    // Walked leaf-first; merge must run root to leaf so children override.
    chain.reverse();

    let mut layer = ProfileLayer::default();
    for profile in chain {
        layer.settings.extend(profile.settings);
        layer.chain.push(profile.name);
    }
    Ok(layer)
}
