// src/bin/cadre.rs

use anyhow::{Context, Result};
use cadre::cli::Cli;
use cadre::constants::{APP_CONFIG_DIR, PROFILE_DIR_NAME};
use cadre::core::config_resolver::{KeyPolicy, ResolveRequest};
use cadre::core::executor::Invocation;
use cadre::core::facade::CoreFacade;
use cadre::core::profile_graph::DirProfileSource;
use cadre::core::registry::CommandMetadata;
use cadre::core::schema::{ConfigSchema, FieldKind, FieldSpec};
use cadre::models::{ExecutionContext, HandlerReply, OutputFormat};
use clap::Parser;
use colored::*;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The main entry point of the demo `cadre` binary.
/// It sets up logging, parses arguments, wires the facade,
/// and performs centralized error handling.
fn main() {
    env_logger::init();

    if let Err(e) = run_cli(Cli::parse()) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", cli);

    let profiles_dir = cli
        .profiles_dir
        .clone()
        .unwrap_or_else(default_profiles_dir);
    let mut facade = CoreFacade::new(
        default_schema(),
        Box::new(DirProfileSource::new(profiles_dir)),
    );
    register_builtins(&mut facade)?;

    let env_snapshot: BTreeMap<String, String> = std::env::vars().collect();

    let mut request = ResolveRequest::new()
        .with_env(env_snapshot.clone())
        .with_key_policy(if cli.strict {
            KeyPolicy::Strict
        } else {
            KeyPolicy::Lenient
        });
    if let Some(profile) = &cli.profile {
        request = request.with_profile(profile.as_str());
    }
    if cli.profile_optional {
        request = request.profile_optional();
    }
    request.cli_overrides = cli.overrides();

    let config = facade.resolve_config(&request)?;
    for warning in config.warnings() {
        eprintln!("{} {}", "warning:".yellow().bold(), warning);
    }

    let output_format = OutputFormat::from_config(config.get_str("output_format"));

    let mut words = cli.args.into_iter();
    let name = match words.next() {
        Some(name) => name,
        None => {
            print_command_list(&facade);
            return Ok(());
        }
    };
    // Listing is a front-end concern, like help; it never hits the executor.
    if name == "commands" {
        print_command_list(&facade);
        return Ok(());
    }
    let args: Vec<String> = words.collect();

    let session = facade.open_session();
    let invocation = Invocation {
        args,
        env: env_snapshot,
        working_dir: std::env::current_dir()
            .context("Failed to determine the current working directory.")?,
        output_format,
    };

    let record = facade.execute(session, &name, invocation, &config)?;

    if let Some(output) = record.output() {
        if !output.stdout.is_empty() {
            println!("{}", output.stdout);
        }
        if !output.stderr.is_empty() {
            eprintln!("{}", output.stderr);
        }
        log::debug!(
            "Command '{}' completed in {:?} with exit code {}.",
            record.name(),
            output.duration,
            output.exit_code
        );
        if output.exit_code != 0 {
            std::process::exit(output.exit_code);
        }
    } else if let Some(failure) = record.failure() {
        eprintln!(
            "\n{}: command '{}' failed: {}",
            "Error".red().bold(),
            record.name().cyan(),
            failure
        );
        std::process::exit(1);
    }

    Ok(())
}

/// The demo application's configuration schema.
fn default_schema() -> ConfigSchema {
    ConfigSchema::new()
        .field(
            FieldSpec::new("output_format", FieldKind::String)
                .default_value("table")
                .allowed(&["table", "json", "plain"]),
        )
        .field(FieldSpec::new("debug", FieldKind::Bool).default_value(false))
        .field(
            FieldSpec::new("timeout", FieldKind::Integer)
                .default_value(30i64)
                .range(1, 3600),
        )
        .field(FieldSpec::new("tags", FieldKind::List))
}

fn default_profiles_dir() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(APP_CONFIG_DIR)
        .join(PROFILE_DIR_NAME)
}

fn register_builtins(facade: &mut CoreFacade) -> Result<()> {
    facade.register_command(
        "config",
        Box::new(|ctx: &ExecutionContext| {
            let body = match ctx.output_format {
                OutputFormat::Json => serde_json::to_string_pretty(&ctx.config)?,
                _ => render_config_table(ctx),
            };
            Ok(HandlerReply::success(body))
        }),
        CommandMetadata::describe("Show the resolved configuration and each value's source.")
            .alias("cfg")
            .category("builtin"),
    )?;

    facade.register_command(
        "echo",
        Box::new(|ctx: &ExecutionContext| Ok(HandlerReply::success(ctx.args.join(" ")))),
        CommandMetadata::describe("Echo arguments back (dispatch smoke test).").category("builtin"),
    )?;

    Ok(())
}

fn render_config_table(ctx: &ExecutionContext) -> String {
    let mut lines = Vec::new();
    for (key, value) in ctx.config.iter() {
        let provenance = ctx
            .config
            .provenance(key)
            .map(|p| p.to_string())
            .unwrap_or_default();
        lines.push(format!("{:<24} {:<24} ({})", key, value, provenance));
    }
    lines.join("\n")
}

fn print_command_list(facade: &CoreFacade) {
    println!("{}", "Available commands:".bold());
    for name in facade.list_commands() {
        match facade.registry().lookup(name) {
            Ok(command) if !command.description().is_empty() => {
                println!("  {:<12} {}", name.cyan(), command.description());
            }
            _ => println!("  {}", name.cyan()),
        }
    }
}
