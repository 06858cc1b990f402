// src/core/mod.rs

pub mod config_resolver;
pub mod executor;
pub mod facade;
pub mod normalize;
pub mod profile_graph;
pub mod registry;
pub mod schema;
pub mod session;
