use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use serde_json::Value;

use agent_data_gate::config::GateConfig;
use agent_data_gate::entities::EntityType;
use agent_data_gate::logging;
use agent_data_gate::permissions::{PermissionLevel, Role};
use agent_data_gate::storage::MemoryStore;
use agent_data_gate::{DataGate, GateError};

/// Permission-checked data access for the dashboard agent
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct CliArgs {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// JSON fixture (`{"table": [rows]}`) loaded into the in-memory store
    #[arg(short, long, value_name = "FILE")]
    data: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List the function catalog
    Functions {
        /// Print full tool definitions as JSON
        #[arg(long)]
        json: bool,
    },

    /// Call a function
    Call {
        name: String,
        #[arg(short, long, default_value = "user")]
        role: String,
        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Run a raw SQL statement through the guard
    Sql {
        text: String,
        #[arg(short, long, default_value = "user")]
        role: String,
    },

    /// Check whether a role holds a level on an entity
    Check {
        role: String,
        entity: EntityType,
        level: PermissionLevel,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = CliArgs::parse();

    let config = match &cli.config {
        Some(path) => GateConfig::from_file(path)?,
        None => GateConfig::default(),
    };
    let _guard = logging::init_logging(&config.logging)?;

    let store = Arc::new(MemoryStore::new());
    if let Some(path) = &cli.data {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Cannot read fixture {}", path.display()))?;
        let fixture: Value = serde_json::from_str(&text)
            .with_context(|| format!("Cannot parse fixture {}", path.display()))?;
        let rows = store.load_fixture(&fixture).await?;
        tracing::info!("[Cli] Loaded {} rows from {}", rows, path.display());
    }

    let gate = DataGate::new(&config, store)?;

    match cli.command {
        Command::Functions { json } => list_functions(&gate, json)?,
        Command::Call { name, role, params } => {
            let params: Value = serde_json::from_str(&params).context("--params is not valid JSON")?;
            let result = gate
                .execute_database_function(&name, &params, &Role::from(role))
                .await;
            print_result(result)?;
        }
        Command::Sql { text, role } => {
            let result = gate.execute_sql(&text, &Role::from(role)).await;
            match result {
                Ok(outcome) if !outcome.success => {
                    eprintln!(
                        "{} {}",
                        "Statement failed:".yellow().bold(),
                        outcome.error.as_deref().unwrap_or("unknown error")
                    );
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                }
                other => print_result(other)?,
            }
        }
        Command::Check { role, entity, level } => {
            let role = Role::from(role);
            if gate.has_permission(&role, entity, level) {
                println!("{} '{}' has {} on {}", "Allowed:".green().bold(), role, level, entity);
            } else {
                println!("{} '{}' lacks {} on {}", "Denied:".red().bold(), role, level, entity);
            }
        }
    }

    Ok(())
}

fn list_functions(gate: &DataGate, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&gate.functions().definitions())?);
        return Ok(());
    }

    for name in gate.functions().names() {
        if let Some(registration) = gate.get_database_function(name.as_str()) {
            println!(
                "{} {} {}",
                name.as_str().cyan().bold(),
                format!("[{} {}]", registration.required_level, registration.required_entity).dimmed(),
                registration.description
            );
        }
    }
    Ok(())
}

fn print_result<T: serde::Serialize>(result: Result<T, GateError>) -> Result<()> {
    match result {
        Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
        Err(err) => {
            eprintln!("{} {}", "Error:".red().bold(), err);
            println!("{}", serde_json::to_string_pretty(&err.to_payload())?);
        }
    }
    Ok(())
}
