//! Thin CLI wrapper over `workflow-client-core`: load a GUI-exported
//! workflow document, inspect/override its discovered inputs, and submit
//! it to a remote queue.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde_json::Value;

use workflow_client_core::config::{ClientConfig, LogConfig};
use workflow_client_core::events::PollingEventChannel;
use workflow_client_core::field::FieldRegistry;
use workflow_client_core::handle::WorkflowHandle;
use workflow_client_core::logging;
use workflow_client_core::node_type::NodeTypeCatalog;
use workflow_client_core::retry::RetryPolicy;
use workflow_client_core::transport::{ReqwestTransport, Transport};

#[derive(Parser)]
#[command(name = "wfc", about = "Submit GUI-exported workflow documents as parameterized jobs")]
struct Cli {
    /// Workflow document to load (a GUI-exported JSON file).
    #[arg(long)]
    document: PathBuf,

    /// Optional client config file (TOML or YAML). Defaults are used if omitted.
    #[arg(long, env = "WFC_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print every discovered input with its current value.
    ListInputs,
    /// Validate every discovered input without submitting.
    Validate,
    /// Override inputs, validate, submit, and wait for the result.
    Submit {
        /// Repeatable `INDEX=VALUE` override. `VALUE` is parsed as JSON;
        /// values that aren't valid JSON are taken as a literal string.
        #[arg(long = "set", value_name = "INDEX=VALUE")]
        sets: Vec<String>,
        #[arg(long, default_value_t = 1)]
        runs: u32,
        #[arg(long, default_value_t = 0)]
        priority: i32,
        #[arg(long, default_value_t = 300)]
        timeout_secs: u64,
    },
    /// Fetch a session's current status from the transport.
    Status { session_id: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => ClientConfig::from_file(path).context("loading client config")?,
        None => ClientConfig::default(),
    };
    logging::init_logging(&LogConfig::default())?;

    let document_text = std::fs::read_to_string(&cli.document)
        .with_context(|| format!("reading workflow document {}", cli.document.display()))?;

    let transport: Arc<dyn Transport> =
        Arc::new(ReqwestTransport::new(&config).context("building transport")?);
    let events = Arc::new(PollingEventChannel::new(
        Arc::clone(&transport),
        RetryPolicy::polling(config.poll_interval_initial, config.poll_interval_max),
    ));

    let registry = FieldRegistry::with_builtins();
    let catalog = NodeTypeCatalog::built_in();
    let mut handle = WorkflowHandle::discover(
        &document_text,
        &registry,
        catalog,
        config,
        Arc::clone(&transport),
        events,
    )
    .context("discovering workflow inputs")?;

    match cli.command {
        Command::ListInputs => {
            for input in handle.list_inputs() {
                println!(
                    "[{}] {} ({}.{}) kind={} required={} value={}",
                    input.input_index,
                    input.label,
                    input.node_id,
                    input.field_name,
                    input.kind,
                    input.required,
                    input.value.unwrap_or(Value::Null),
                );
            }
        }
        Command::Validate => match handle.validate_all() {
            Ok(()) => println!("all inputs valid"),
            Err(err) => {
                eprintln!("{err}");
                std::process::exit(1);
            }
        },
        Command::Submit { sets, runs, priority, timeout_secs } => {
            for raw in sets {
                let (index_str, value_str) = raw
                    .split_once('=')
                    .with_context(|| format!("expected INDEX=VALUE, got {raw:?}"))?;
                let index: usize = index_str.parse().context("input index must be a number")?;
                let value = parse_cli_value(value_str);
                handle.set_input_value(index, value)?;
            }

            let outputs = handle
                .submit_sync(runs, priority, Duration::from_secs(timeout_secs))
                .await
                .context("submitting workflow")?;

            let rendered: Vec<Value> = outputs
                .into_iter()
                .map(|(node, asset)| {
                    serde_json::json!({
                        "node_id": node.node_id,
                        "asset": asset,
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&rendered)?);
        }
        Command::Status { session_id } => {
            let status = transport.get_session(&session_id).await.context("fetching session status")?;
            println!("{}", serde_json::to_string_pretty(&status.detail)?);
        }
    }

    Ok(())
}

fn parse_cli_value(raw: &str) -> Value {
    serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()))
}
