use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use costscope_models::request::ProjectRequest;
use costscope_store::ResultStore;
use serde::Serialize;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "costscope", about = "Construction cost estimates and DealShield scenarios")]
struct Cli {
    /// Path to a TOML configuration file (built-in defaults when omitted)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Pretty-print the output JSON
    #[arg(long, global = true)]
    pretty: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Calculate a ProjectRequest and print the result
    Calculate {
        /// Read ProjectRequest JSON from a file instead of stdin
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Request id to store the result under (random UUID by default)
        #[arg(long)]
        request_id: Option<String>,
    },
    /// Print the DealShield scenario table for a request
    Scenarios {
        /// Read ProjectRequest JSON from a file instead of stdin
        #[arg(short, long, conflicts_with = "stored")]
        input: Option<PathBuf>,

        /// Use a previously stored result instead of calculating
        #[arg(long)]
        stored: Option<String>,
    },
    /// Run the registry integrity checks and print any violations
    Validate,
    /// Print stored results
    Show {
        /// A single stored result
        request_id: Option<String>,

        /// How many recent results to list when no id is given
        #[arg(long, default_value_t = 10)]
        recent: usize,
    },
}

fn main() -> ExitCode {
    // Initialize tracing (respects RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            if costscope::is_client_error(&e) {
                ExitCode::from(2)
            } else {
                ExitCode::FAILURE
            }
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = costscope::load_config(cli.config.as_deref())?;

    match &cli.command {
        Command::Calculate { input, request_id } => {
            let request = read_request(input.as_deref())?;
            let engine = costscope::build_engine(&config)?;
            let store = costscope::build_store(&config).context("Failed to open result store")?;

            let record = costscope::calculate(
                &engine,
                store.as_ref().map(|s| s as &dyn ResultStore),
                request_id.clone(),
                &request,
            )
            .context("Calculation failed")?;
            print_json(&record, cli.pretty)
        }
        Command::Scenarios { input, stored } => {
            let engine = costscope::build_engine(&config)?;
            let store = costscope::build_store(&config).context("Failed to open result store")?;

            let record = match stored {
                Some(request_id) => {
                    let Some(store) = &store else {
                        bail!("--stored requires a [store] section in the configuration");
                    };
                    store
                        .get(request_id)
                        .context("Failed to read result store")?
                        .with_context(|| format!("No stored result for {request_id}"))?
                }
                None => {
                    let request = read_request(input.as_deref())?;
                    costscope::calculate(
                        &engine,
                        store.as_ref().map(|s| s as &dyn ResultStore),
                        None,
                        &request,
                    )
                    .context("Calculation failed")?
                }
            };

            let table = engine
                .scenario_table(&record.request_id, &record.result)
                .context("Failed to build scenario table")?;
            print_json(&table, cli.pretty)
        }
        Command::Validate => {
            let registry = costscope_registry::Registry::load(config.registry.dir.as_deref(), false)
                .context("Failed to load building registry")?;
            let violations = registry.validate();
            print_json(&violations, cli.pretty)?;
            if !violations.is_empty() {
                bail!("{} registry integrity violation(s)", violations.len());
            }
            Ok(())
        }
        Command::Show { request_id, recent } => {
            let store = costscope::build_store(&config)
                .context("Failed to open result store")?
                .context("show requires a [store] section in the configuration")?;

            match request_id {
                Some(request_id) => {
                    let record = store
                        .get(request_id)
                        .context("Failed to read result store")?
                        .with_context(|| format!("No stored result for {request_id}"))?;
                    print_json(&record, cli.pretty)
                }
                None => {
                    let records = store.recent(*recent).context("Failed to read result store")?;
                    print_json(&records, cli.pretty)
                }
            }
        }
    }
}

fn read_request(input: Option<&std::path::Path>) -> Result<ProjectRequest> {
    let json = if let Some(path) = input {
        std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input: {}", path.display()))?
    } else {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("Failed to read from stdin")?;
        buf
    };

    serde_json::from_str(&json).context("Failed to parse ProjectRequest JSON")
}

fn print_json<T: Serialize>(value: &T, pretty: bool) -> Result<()> {
    let output = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{output}");
    Ok(())
}
