use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde::Serialize;
use testing_triage::prelude::*;
use tracing_subscriber::EnvFilter;
#[cfg(feature = "otel")]
use tracing_subscriber::layer::SubscriberExt;
#[cfg(feature = "otel")]
use tracing_subscriber::util::SubscriberInitExt;

#[derive(Parser)]
#[command(name = "testing-triage")]
#[command(about = "Run Behave suites and triage their failures", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Project root (default: current directory)
    #[arg(short, long, global = true)]
    root: Option<PathBuf>,

    /// Path to triage.yaml (default: <ROOT>/triage.yaml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// List feature files and their scenarios
    List {
        /// Feature category: api, ui or all
        #[arg(short = 't', long = "type", default_value = "all")]
        feature_type: String,
    },

    /// Run the test suite with optional filters
    Run {
        /// Tag expression, e.g. @smoke
        #[arg(long)]
        tags: Option<String>,

        /// Feature file or directory under the project root
        #[arg(short, long)]
        path: Option<String>,

        /// Only run scenarios with this name
        #[arg(short, long)]
        name: Option<String>,

        /// Show what would run without executing steps
        #[arg(long)]
        dry_run: bool,

        /// Seconds before the run is aborted (overrides config)
        #[arg(long)]
        timeout: Option<u64>,
    },

    /// Show results of the most recent run
    Last,

    /// Show results of a specific run
    Results {
        /// Run identifier, e.g. run_20260112_221845
        run_id: String,
    },

    /// Show failures with output excerpts and screenshots
    Failures {
        /// Only failures whose scenario name contains this text
        #[arg(short, long)]
        scenario: Option<String>,

        /// Run identifier (default: latest)
        #[arg(long)]
        run_id: Option<String>,
    },

    /// Count features and scenarios per category
    Coverage,

    /// Trace a failed scenario to its step definition and related code
    Analyze {
        /// Scenario name (case-insensitive substring)
        scenario: String,

        /// Run identifier (default: latest)
        #[arg(long)]
        run_id: Option<String>,
    },
}

#[derive(Serialize)]
struct ErrorOutput<'a> {
    error: String,
    kind: &'static str,
    #[serde(flatten)]
    record: Option<&'a testing_triage::RunRecord>,
}

#[cfg(feature = "otel")]
fn init_otel_tracing(verbose: bool) {
    use opentelemetry::trace::TracerProvider as _;
    use opentelemetry_otlp::WithExportConfig;
    use opentelemetry_sdk::runtime::Tokio;
    use opentelemetry_sdk::trace::TracerProvider;

    let filter = if verbose {
        "testing_triage=debug"
    } else {
        "testing_triage=info"
    };

    let otlp_endpoint = std::env::var("OTEL_EXPORTER_OTLP_ENDPOINT")
        .unwrap_or_else(|_| "http://localhost:4317".to_string());

    let exporter = opentelemetry_otlp::SpanExporter::builder()
        .with_tonic()
        .with_endpoint(&otlp_endpoint)
        .build()
        .expect("Failed to create OTLP exporter");

    let provider = TracerProvider::builder()
        .with_batch_exporter(exporter, Tokio)
        .build();

    let tracer = provider.tracer("testing-triage");
    let otel_layer = tracing_opentelemetry::layer().with_tracer(tracer);

    tracing_subscriber::registry()
        .with(EnvFilter::new(filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(otel_layer)
        .init();

    opentelemetry::global::set_tracer_provider(provider);
}

#[cfg(not(feature = "otel"))]
fn init_tracing(verbose: bool) {
    let filter = if verbose {
        "testing_triage=debug"
    } else {
        "testing_triage=info"
    };

    // stdout carries JSON results, so logs go to stderr
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    #[cfg(feature = "otel")]
    init_otel_tracing(cli.verbose);

    #[cfg(not(feature = "otel"))]
    init_tracing(cli.verbose);

    let result = run(cli).await;

    #[cfg(feature = "otel")]
    opentelemetry::global::shutdown_tracer_provider();

    match result {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::from(1),
        Err(e) => {
            tracing::error!(error = %e, "Triage command failed");
            ExitCode::from(2)
        }
    }
}

fn build_manager(root: Option<PathBuf>, config: Option<PathBuf>) -> anyhow::Result<RunManager> {
    let root = root.unwrap_or_else(|| PathBuf::from("."));
    let mut config = match config {
        Some(path) => TriageConfig::load(&path)?,
        None => TriageConfig::discover(&root)?,
    };
    if config.project_root.as_os_str().is_empty() {
        config.project_root = root;
    }
    Ok(RunManager::new(config)?)
}

/// Returns whether the command succeeded; triage errors are reported as JSON
async fn run(cli: Cli) -> anyhow::Result<bool> {
    let manager = build_manager(cli.root, cli.config)?;

    let result = match cli.command {
        Commands::List { feature_type } => feature_type
            .parse::<FeatureFilter>()
            .and_then(|filter| to_json(&manager.list_features(filter))),
        Commands::Run {
            tags,
            path,
            name,
            dry_run,
            timeout,
        } => {
            let request = RunRequest {
                tags,
                feature_path: path,
                scenario: name,
                dry_run,
                timeout_seconds: timeout,
            };
            match manager.start_run(request).await {
                Ok(outcome) => {
                    println!("{}", serde_json::to_string_pretty(&outcome)?);
                    return Ok(outcome.success());
                }
                Err(e) => Err(e),
            }
        }
        Commands::Last => manager.get_latest_results().and_then(|r| to_json(&r)),
        Commands::Results { run_id } => manager.get_results(&run_id).and_then(|r| to_json(&r)),
        Commands::Failures { scenario, run_id } => manager
            .failure_details(scenario.as_deref(), run_id.as_deref())
            .and_then(|d| to_json(&d)),
        Commands::Coverage => to_json(&manager.coverage()),
        Commands::Analyze { scenario, run_id } => manager
            .analyze_failure(&scenario, run_id.as_deref())
            .and_then(|a| to_json(&a)),
    };

    match result {
        Ok(json) => {
            println!("{}", json);
            Ok(true)
        }
        Err(e) => {
            let output = ErrorOutput {
                error: e.to_string(),
                kind: e.kind(),
                record: e.record(),
            };
            println!("{}", serde_json::to_string_pretty(&output)?);
            Ok(false)
        }
    }
}

fn to_json<T: Serialize>(value: &T) -> Result<String, TriageError> {
    Ok(serde_json::to_string_pretty(value)?)
}
