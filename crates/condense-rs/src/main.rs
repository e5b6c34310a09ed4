//! Summarize a local markdown document and print the result.
//!
//! Reads the API key from the `OPENROUTER_KEY` environment variable.
//!
//! # Examples
//!
//! ```sh
//! # Fast single-pass executive summary
//! condense report --root ./documents --project acme
//!
//! # Full hierarchical map-reduce summary
//! condense report --root ./documents --project acme --mode detailed
//!
//! # Steer the detailed summary toward a topic
//! condense report --mode detailed --query "Focus on budgets and deadlines."
//!
//! # Persist stage-by-stage status updates for an external driver
//! condense report --mode detailed --status-file ./status/report.json
//! ```

use clap::Parser;
use condense_rs::api::RateLimiter;
use condense_rs::sources::FsDocumentStore;
use condense_rs::workflow::{
    DocumentState, EventHandler, LoggingHandler, SummaryKind, Workflow, WorkflowConfig,
    WorkflowEvent,
};
use condense_rs::CompletionClient;
use std::path::PathBuf;
use std::process;
use std::sync::Arc;
use tracing::warn;

/// Summarize a local markdown document and print the result.
///
/// Documents are looked up at `<root>/<project>/<document>.md`. In detailed
/// mode the document is sliced into fragments at markdown headings, then
/// summarized hierarchically.
#[derive(Parser)]
#[command(name = "condense")]
struct Cli {
    /// Document identifier (file stem under the project directory)
    document: String,

    /// Root directory containing project subdirectories
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Project subdirectory under the root
    #[arg(long, default_value = "")]
    project: String,

    /// Summarization mode: "executive" (single pass) or "detailed"
    /// (hierarchical map-reduce)
    #[arg(long, default_value = "executive")]
    mode: String,

    /// Extra instructions appended to every prompt (detailed mode)
    #[arg(long)]
    query: Option<String>,

    /// Model for map/reduce calls
    #[arg(long)]
    map_model: Option<String>,

    /// Model for the final and executive synthesis
    #[arg(long)]
    final_model: Option<String>,

    /// Steady request rate shared by all completion calls (requests/second)
    #[arg(long)]
    rps: Option<f64>,

    /// Write a JSON status snapshot to this file after every stage
    #[arg(long)]
    status_file: Option<PathBuf>,
}

/// Writes stage-by-stage status snapshots, mirroring what a task-queue
/// driver would persist against the request.
struct StatusFileHandler {
    path: PathBuf,
    project_id: String,
    document_id: String,
}

impl StatusFileHandler {
    fn write(&self, status: &str, progress: u8, error: &str) {
        let payload = serde_json::json!({
            "project_id": self.project_id,
            "document_id": self.document_id,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "summary_status": status,
            "summary_progress": progress,
            "summary_error": error,
        });
        let body = serde_json::to_string_pretty(&payload).unwrap_or_default();
        if let Err(e) = std::fs::write(&self.path, body) {
            warn!("failed to write status file {}: {e}", self.path.display());
        }
    }
}

impl EventHandler for StatusFileHandler {
    fn on_event(&self, event: &WorkflowEvent<'_>) {
        match event {
            WorkflowEvent::StageCompleted {
                stage,
                progress_pct,
            } => self.write(&format!("processing: {}", stage.name()), *progress_pct, ""),
            WorkflowEvent::Failed { error, .. } => self.write("failed", 0, error),
            WorkflowEvent::Finished => self.write("completed", 100, ""),
            _ => {}
        }
    }
}

/// Logs every event and forwards it to the optional status file.
struct CliHandler {
    status: Option<StatusFileHandler>,
}

impl EventHandler for CliHandler {
    fn on_event(&self, event: &WorkflowEvent<'_>) {
        LoggingHandler.on_event(event);
        if let Some(ref status) = self.status {
            status.on_event(event);
        }
    }
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let kind = match cli.mode.as_str() {
        "executive" => SummaryKind::Executive,
        "detailed" => SummaryKind::Detailed,
        other => {
            eprintln!("Error: unknown mode '{other}' (expected 'executive' or 'detailed')");
            process::exit(2);
        }
    };

    let api_key = match std::env::var("OPENROUTER_KEY") {
        Ok(key) => key,
        Err(_) => {
            eprintln!("Error: OPENROUTER_KEY not set");
            process::exit(1);
        }
    };

    let mut config = WorkflowConfig::default();
    if let Some(model) = cli.map_model {
        config.map_model.model = model;
    }
    if let Some(model) = cli.final_model {
        config.final_model.model = model;
    }
    if let Some(rps) = cli.rps {
        config.rate_limit_rps = rps;
    }

    let limiter = Arc::new(RateLimiter::new(config.limiter_config()));
    let client = match CompletionClient::new(api_key, limiter) {
        Ok(client) => client,
        Err(e) => {
            eprintln!("Error: failed to create API client: {e}");
            process::exit(1);
        }
    };

    let store = FsDocumentStore::new(&cli.root);
    let handler = CliHandler {
        status: cli.status_file.map(|path| StatusFileHandler {
            path,
            project_id: cli.project.clone(),
            document_id: cli.document.clone(),
        }),
    };
    if let Some(ref status) = handler.status {
        status.write("initializing", 10, "");
    }

    let state = DocumentState::new(&cli.project, &cli.document, kind)
        .with_user_query(cli.query);

    let workflow = Workflow::new(&client, &store, &store, config).with_event_handler(&handler);
    let final_state = workflow.run(state).await;

    match (final_state.final_summary, final_state.error) {
        (Some(summary), None) => println!("{summary}"),
        (_, Some(error)) => {
            eprintln!("Error: {error}");
            process::exit(1);
        }
        _ => {
            eprintln!("Error: workflow completed without a summary");
            process::exit(1);
        }
    }
}
