use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use serde_json::{Value, json};
use tracing::debug;
use tracing_subscriber::EnvFilter;

use mosaic_config::WidgetInstance;
use mosaic_migration::{WidgetRegistry, WidgetType};
use mosaic_pipeline::{NormalizedRecord, normalize_response};
use mosaic_runtime::{
  ChannelNotifier, Dashboard, Provider, ProviderError, ProviderRequest, RuntimeConfig, WidgetEvent,
};
use mosaic_validator::{read_definition, validate_value};

/// Mosaic - declarative dashboard widgets that talk over an event bus
#[derive(Parser)]
#[command(name = "mosaic")]
#[command(version, about, long_about = None)]
struct Cli {
  /// Path to a runtime config file (default: <config dir>/mosaic/config.json)
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
  /// Check a widget definition file and print the validation report
  Validate {
    /// Path to the widget definition (JSON)
    definition_file: PathBuf,
  },

  /// Transform provider JSON read from stdin into display records
  Transform {
    /// Path to the widget definition (JSON)
    definition_file: PathBuf,
  },

  /// Mount a widget on provider JSON from stdin, publish one event and
  /// print what the widget shows afterwards
  Simulate {
    /// Path to the widget definition (JSON)
    definition_file: PathBuf,

    /// Event name to publish, e.g. "project.selected"
    #[arg(long)]
    event: String,

    /// Event payload as JSON
    #[arg(long, default_value = "{}")]
    payload: String,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();
  init_tracing();

  match cli.command {
    Some(Commands::Validate { definition_file }) => validate(definition_file),
    Some(Commands::Transform { definition_file }) => transform(definition_file),
    Some(Commands::Simulate {
      definition_file,
      event,
      payload,
    }) => simulate(definition_file, cli.config, event, payload),
    None => {
      println!("mosaic - use --help to see available commands");
      Ok(())
    }
  }
}

fn init_tracing() {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(io::stderr)
    .init();
}

/// Read the runtime config from `--config`, else from the user config dir if
/// a file exists there, else defaults.
async fn load_config(explicit: Option<&Path>) -> Result<RuntimeConfig> {
  let path = match explicit {
    Some(path) => path.to_path_buf(),
    None => match dirs::config_dir().map(|dir| dir.join("mosaic").join("config.json")) {
      Some(path) if tokio::fs::try_exists(&path).await.unwrap_or(false) => path,
      _ => return Ok(RuntimeConfig::default()),
    },
  };

  let content = tokio::fs::read_to_string(&path)
    .await
    .with_context(|| format!("failed to read config file: {}", path.display()))?;
  let config = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse config file: {}", path.display()))?;
  debug!(file = %path.display(), "loaded runtime config");
  Ok(config)
}

fn validate(definition_file: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { validate_async(definition_file).await })
}

async fn validate_async(definition_file: PathBuf) -> Result<()> {
  let content = tokio::fs::read_to_string(&definition_file)
    .await
    .with_context(|| format!("failed to read definition file: {}", definition_file.display()))?;
  let document: Value = serde_json::from_str(&content)
    .with_context(|| format!("failed to parse definition file: {}", definition_file.display()))?;

  let report = validate_value(&document);
  for error in &report.errors {
    eprintln!("error: {}", error);
  }
  for warning in &report.warnings {
    eprintln!("warning: {}", warning);
  }
  println!("{}", serde_json::to_string_pretty(&report)?);

  if !report.valid {
    bail!(
      "{} is not a valid widget definition",
      definition_file.display()
    );
  }
  Ok(())
}

fn transform(definition_file: PathBuf) -> Result<()> {
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async { transform_async(definition_file).await })
}

async fn transform_async(definition_file: PathBuf) -> Result<()> {
  let definition = read_definition(&definition_file)
    .await
    .context("failed to load widget definition")?;
  eprintln!("Loaded widget: {}", definition.metadata.name);

  let response = read_json_from_stdin()?;
  let records = normalize_response(&response, &definition);
  eprintln!("Transformed {} records", records.len());

  println!("{}", serde_json::to_string_pretty(&values(&records))?);
  Ok(())
}

fn simulate(
  definition_file: PathBuf,
  config_file: Option<PathBuf>,
  event: String,
  payload: String,
) -> Result<()> {
  let payload: Value =
    serde_json::from_str(&payload).context("failed to parse --payload as JSON")?;
  let rt = tokio::runtime::Runtime::new()?;
  rt.block_on(async {
    let config = load_config(config_file.as_deref()).await?;
    simulate_async(definition_file, config, event, payload).await
  })
}

const SIMULATED_WIDGET: &str = "simulated";

async fn simulate_async(
  definition_file: PathBuf,
  config: RuntimeConfig,
  event: String,
  payload: Value,
) -> Result<()> {
  let definition = read_definition(&definition_file)
    .await
    .context("failed to load widget definition")?;
  eprintln!("Loaded widget: {}", definition.metadata.name);

  let response = read_json_from_stdin()?;

  let mut registry = WidgetRegistry::new();
  registry.register(WidgetType::new(SIMULATED_WIDGET, 1));

  let (notifier, mut events) = ChannelNotifier::channel();
  let dashboard = Dashboard::new(
    config,
    registry,
    Arc::new(StdinProvider { response }),
    Arc::new(notifier),
  );

  let instance = WidgetInstance {
    id: SIMULATED_WIDGET.to_string(),
    widget_type: SIMULATED_WIDGET.to_string(),
    version: 1,
    config: json!({}),
    layout_position: None,
  };
  dashboard
    .mount(instance, definition)
    .context("failed to mount widget")?;

  // Wait for the initial fetch
  let first = tokio::time::timeout(Duration::from_secs(5), async {
    loop {
      match events.recv().await {
        Some(event @ (WidgetEvent::DataUpdated { .. } | WidgetEvent::FetchFailed { .. })) => {
          return Some(event);
        }
        Some(_) => continue,
        None => return None,
      }
    }
  })
  .await
  .context("timed out waiting for the initial fetch")?;
  if let Some(WidgetEvent::FetchFailed { error, .. }) = first {
    bail!("initial fetch failed: {}", error);
  }

  let delivered = dashboard.bus().publish(&event, payload, "cli");
  eprintln!("Published {} to {} subscription(s)", event, delivered);

  let mut notifications = Vec::new();
  while let Ok(event) = events.try_recv() {
    if let WidgetEvent::Notification { level, message, .. } = event {
      notifications.push(json!({ "level": level, "message": message }));
    }
  }

  let visible = dashboard.visible_records(SIMULATED_WIDGET)?;
  let output = json!({
    "delivered": delivered,
    "total": dashboard.records(SIMULATED_WIDGET)?.len(),
    "visible": values(&visible),
    "highlighted": dashboard.highlighted(SIMULATED_WIDGET)?,
    "notifications": notifications,
    "eventLog": dashboard.bus().event_log(),
  });
  println!("{}", serde_json::to_string_pretty(&output)?);

  dashboard.shutdown();
  Ok(())
}

/// Serves the JSON piped on stdin for every fetch.
struct StdinProvider {
  response: Value,
}

#[async_trait]
impl Provider for StdinProvider {
  async fn fetch(&self, _request: &ProviderRequest) -> Result<Value, ProviderError> {
    Ok(self.response.clone())
  }
}

fn values(records: &[NormalizedRecord]) -> Vec<Value> {
  records
    .iter()
    .map(|record| Value::Object(record.values.clone()))
    .collect()
}

fn read_json_from_stdin() -> Result<Value> {
  use std::io::IsTerminal;

  if io::stdin().is_terminal() {
    // No stdin pipe, no records
    Ok(json!([]))
  } else {
    let mut input = String::new();
    io::stdin()
      .read_to_string(&mut input)
      .context("failed to read provider JSON from stdin")?;

    if input.trim().is_empty() {
      Ok(json!([]))
    } else {
      serde_json::from_str(&input).context("failed to parse provider JSON from stdin")
    }
  }
}
