//! ScriptFlow - browser automation scripting engine
//!
//! Command line entry point: run, validate and inspect scripts.

mod cli;
mod register;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use clap::Parser;
use serde_json::{json, Map, Value};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use scriptflow_config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use scriptflow_core::registry::Resolver;
use scriptflow_protocols::io::MemoryIo;
use scriptflow_protocols::types::RunStatus;
use scriptflow_runtime::{Script, ScriptSettings};

use crate::cli::{Cli, Commands};
use crate::register::build_resolver;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Initialize tracing. Console output goes to stderr so stdout carries only
/// JSON; a daily rotated file is added when a log directory is configured.
fn init_tracing(logging: &LoggingConfig) -> CliResult<()> {
    let file_layer = match &logging.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)?;
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix("scriptflow")
                .filename_suffix("log")
                .max_log_files(30)
                .build(dir)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);

            // Flushes pending lines on exit.
            static GUARD: OnceLock<WorkerGuard> = OnceLock::new();
            let _ = GUARD.set(guard);

            Some(fmt::layer().with_writer(non_blocking).with_ansi(false))
        }
        None => None,
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(file_layer)
        .init();

    Ok(())
}

fn check_config(config: &Config) -> CliResult<()> {
    let validation = ConfigValidator::validate(config)?;
    for warning in &validation.warnings {
        warn!("Config {}: {}", warning.path, warning.message);
    }
    match validation.into_error() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

#[tokio::main]
async fn main() -> CliResult<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::load_or_default(cli.config.as_deref())?;
    init_tracing(&config.logging)?;
    check_config(&config)?;
    let resolver = build_resolver(&config).await?;

    match cli.command {
        Commands::Run {
            script,
            inputs,
            context,
            step,
        } => {
            let failed = run_script(&script, inputs, context, step, &resolver, &config).await?;
            if failed {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Validate { script } => {
            if !validate_script(&script, &resolver)? {
                std::process::exit(1);
            }
            Ok(())
        }
        Commands::Types => print_json(&json!({
            "actions": resolver.list_actions(),
            "pipes": resolver.list_pipes(),
        })),
    }
}

/// Play `path` back and print the outcome. Returns whether the run failed.
async fn run_script(
    path: &Path,
    inputs: Option<PathBuf>,
    context: Option<String>,
    step: bool,
    resolver: &Resolver,
    config: &Config,
) -> CliResult<bool> {
    let io = Arc::new(match inputs {
        Some(inputs) => MemoryIo::with_inputs(read_inputs(&inputs)?),
        None => MemoryIo::new(),
    });
    let mut script = Script::load_file(path, resolver, ScriptSettings::from(config))?.with_io(io.clone());
    if let Some(name) = context {
        script.start_context(&name)?;
    }
    info!("Running script {} ({})", script.id(), path.display());

    let result = if step {
        script.run_action().await
    } else {
        script.run_all().await
    };

    let mut report = json!({
        "script": script.id(),
        "playhead": script.playhead(),
        "outputs": outputs(&io),
    });
    let failed = match result {
        Ok(status) => {
            report["status"] = json!(status);
            false
        }
        Err(error) => {
            report["status"] = json!(RunStatus::Fail);
            report["error"] = json!(error.info());
            true
        }
    };
    script.teardown();
    print_json(&report)?;
    Ok(failed)
}

/// Load `path` and report unresolved types. Returns whether it is clean.
fn validate_script(path: &Path, resolver: &Resolver) -> CliResult<bool> {
    let script = Script::load_file(path, resolver, ScriptSettings::default())?;
    let tree = script.tree();
    let mut unresolved = Vec::new();
    for (kind, name) in tree.unresolved_types() {
        warn!("Unresolved {:?} type: {}", kind, name);
        unresolved.push(json!({ "kind": kind, "type": name }));
    }
    let valid = unresolved.is_empty();
    print_json(&json!({
        "script": script.id(),
        "contexts": tree.contexts().iter().map(|c| c.name.clone()).collect::<Vec<_>>(),
        "actions": tree.len(),
        "unresolved": unresolved,
        "valid": valid,
    }))?;
    Ok(valid)
}

/// Inputs file: a JSON object keyed by input name.
fn read_inputs(path: &Path) -> CliResult<HashMap<String, Value>> {
    let content = std::fs::read_to_string(path)?;
    match serde_json::from_str::<Value>(&content)? {
        Value::Object(map) => Ok(map.into_iter().collect()),
        _ => Err(format!("{}: inputs must be a JSON object", path.display()).into()),
    }
}

/// Outputs keyed by name; a key emitted twice keeps its last value.
fn outputs(io: &MemoryIo) -> Map<String, Value> {
    io.outputs().into_iter().collect()
}

fn print_json(value: &Value) -> CliResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
