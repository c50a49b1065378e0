//! Vigil command-line front end.
//!
//! Drives the dashboard coordinators against a live signal backend.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::EnvFilter;

use vigil_client::VigilClient;
use vigil_common::types::{ActionKind, ExportFormat, MetricKind};
use vigil_common::Config;
use vigil_dashboard::{
    presenter, CaseDetailLoader, ChatPanel, SignalsPage, SubmitOutcome, UploadTracker,
};

mod style;

#[derive(Parser)]
#[command(name = "vigil")]
#[command(about = "Pharmacovigilance signal dashboard")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum MetricArg {
    Prr,
    Cases,
    Trend,
}

impl From<MetricArg> for MetricKind {
    fn from(arg: MetricArg) -> Self {
        match arg {
            MetricArg::Prr => MetricKind::Prr,
            MetricArg::Cases => MetricKind::Cases,
            MetricArg::Trend => MetricKind::Trend,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// List ranked statistical signals
    Signals {
        /// Minimum PRR (defaults to VIGIL_SIGNAL_THRESHOLD)
        #[arg(long)]
        threshold: Option<f64>,

        /// Maximum number of signals (defaults to VIGIL_SIGNAL_LIMIT)
        #[arg(long)]
        limit: Option<u32>,

        /// Drill into one signal's metric
        #[arg(long, value_name = "SIGNAL_ID")]
        drill: Option<String>,

        /// Metric to drill into
        #[arg(long, value_enum, default_value = "prr")]
        metric: MetricArg,

        /// Open the deep-analysis view for one signal
        #[arg(long, value_name = "SIGNAL_ID")]
        analyze: Option<String>,
    },

    /// Show one case with its similar cases
    Case { id: String },

    /// Download a case report
    Export {
        id: String,

        #[arg(long, default_value = "pdf")]
        format: ExportFormat,

        /// Output path (defaults to <id>.<ext>)
        #[arg(long)]
        out: Option<PathBuf>,
    },

    /// List analysis sessions
    Sessions {
        /// Organization filter (defaults to VIGIL_ORGANIZATION)
        #[arg(long)]
        organization: Option<String>,
    },

    /// Show upload history
    Uploads,

    /// Delete an upload
    DeleteUpload { id: String },

    /// Merge an upload into its session
    MergeUpload { id: String },

    /// Ask the assistant a question
    Ask {
        query: Vec<String>,

        /// Run the interpreted query without asking
        #[arg(long)]
        confirm: bool,

        /// Interpret in the context of the previous query's filters
        #[arg(long)]
        refine: bool,

        /// Start from a fresh context
        #[arg(long)]
        reset: bool,

        /// Continue an existing assistant session
        #[arg(long)]
        session: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("vigil=info".parse()?))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env()?;
    let client = VigilClient::from_config(&config)?;

    match cli.command {
        Commands::Signals {
            threshold,
            limit,
            drill,
            metric,
            analyze,
        } => {
            let threshold = threshold.unwrap_or(config.signal_threshold);
            let limit = limit.unwrap_or(config.signal_limit);
            cmd_signals(&config, &client, threshold, limit, drill, metric.into(), analyze).await
        }
        Commands::Case { id } => cmd_case(client, &id).await,
        Commands::Export { id, format, out } => cmd_export(&client, &id, format, out).await,
        Commands::Sessions { organization } => {
            let organization = organization.or_else(|| config.organization.clone());
            cmd_sessions(&client, organization.as_deref()).await
        }
        Commands::Uploads => cmd_uploads(&client).await,
        Commands::DeleteUpload { id } => {
            client.delete_upload(&id).await?;
            println!("Deleted upload {id}");
            Ok(())
        }
        Commands::MergeUpload { id } => {
            let merged = client.merge_upload(&id).await?;
            println!("Merged upload {id} into session {}", merged.session_id);
            if let Some(message) = merged.message {
                println!("{message}");
            }
            Ok(())
        }
        Commands::Ask {
            query,
            confirm,
            refine,
            reset,
            session,
        } => cmd_ask(&config, client, &query.join(" "), confirm, refine, reset, session).await,
    }
}

async fn cmd_signals(
    config: &Config,
    client: &VigilClient,
    threshold: f64,
    limit: u32,
    drill: Option<String>,
    metric: MetricKind,
    analyze: Option<String>,
) -> Result<()> {
    let mut page = SignalsPage::new(config.dashboard_context());
    page.reload(client, threshold, limit).await;
    if let Some(notice) = page.load_error() {
        eprintln!("{notice}");
    }

    let theme = page.context().theme;
    if page.signals().is_empty() {
        println!("No signals above PRR {threshold}");
    }
    for signal in page.signals().iter() {
        println!(
            "{}",
            style::severity(theme, signal.severity).apply_to(presenter::signal_card(signal))
        );
    }

    if let Some(id) = drill {
        if page.click_metric(&id, metric) {
            if let Some(line) = presenter::detail_line(page.drilldown().detail()) {
                println!("\n{}", style::emphasis(theme).apply_to(line));
            }
        } else {
            eprintln!("No listed signal with id {id}");
        }
    }

    if let Some(id) = analyze {
        if page.click_card(&id) {
            if let Some(analysis) = page.drilldown().analysis() {
                println!("\n{}", presenter::deep_analysis(analysis));
            }
        } else {
            eprintln!("No listed signal with id {id}");
        }
    }
    Ok(())
}

async fn cmd_case(client: VigilClient, id: &str) -> Result<()> {
    let mut loader = CaseDetailLoader::new(Arc::new(client));
    loader.load(id);
    loader.settle().await;
    println!("{}", presenter::case_view(&loader.view()));
    Ok(())
}

async fn cmd_export(
    client: &VigilClient,
    id: &str,
    format: ExportFormat,
    out: Option<PathBuf>,
) -> Result<()> {
    let bytes = client.export_case(id, format).await?;
    let path = out.unwrap_or_else(|| PathBuf::from(format!("{id}.{}", format.extension())));
    tokio::fs::write(&path, &bytes)
        .await
        .with_context(|| format!("writing {}", path.display()))?;
    info!(path = %path.display(), bytes = bytes.len(), "Case report saved");
    println!("Saved {}", path.display());
    Ok(())
}

async fn cmd_sessions(client: &VigilClient, organization: Option<&str>) -> Result<()> {
    let sessions = client.sessions(organization).await?;
    if sessions.is_empty() {
        println!("No sessions");
    }
    for session in sessions {
        println!(
            "{}  {}  {} cases  {}",
            session.id,
            vigil_common::display::or_unknown(session.organization.as_deref()),
            session.case_count,
            vigil_common::display::or_unknown(session.filename.as_deref()),
        );
    }
    Ok(())
}

async fn cmd_uploads(client: &VigilClient) -> Result<()> {
    let records = client.upload_history().await?;
    let mut tracker = UploadTracker::new();
    tracker.sync_history(&records);
    if tracker.items().is_empty() {
        println!("No uploads");
    }
    for item in tracker.items() {
        println!("{}  {}", item.id, presenter::upload_row(item));
    }
    Ok(())
}

async fn cmd_ask(
    config: &Config,
    client: VigilClient,
    query: &str,
    confirm: bool,
    refine: bool,
    reset: bool,
    session: Option<String>,
) -> Result<()> {
    let backend = Arc::new(client);
    let chat = match session {
        Some(id) => ChatPanel::with_session_id(backend, id),
        None => ChatPanel::new(backend),
    };
    chat.set_refinement_mode(refine);
    if reset {
        chat.reset_context();
    }

    let outcome = chat.submit(query).await;
    if let SubmitOutcome::Ignored(reason) = outcome {
        anyhow::bail!("Nothing sent ({reason:?})");
    }

    let mut page = SignalsPage::new(config.dashboard_context());
    if confirm && chat.pending_confirmation().is_some() {
        let confirm_action = chat
            .transcript()
            .last()
            .and_then(|m| {
                m.actions
                    .iter()
                    .find(|a| a.kind == ActionKind::Confirm)
                    .cloned()
            });
        match confirm_action {
            Some(action) => {
                chat.trigger_action(&action).await;
                page.apply_action(&action);
            }
            None => {
                chat.confirm().await;
            }
        }
    }

    println!("{}", presenter::transcript(&chat.transcript()));
    if chat.pending_confirmation().is_some() {
        println!(
            "\nRe-run with --confirm --session {} to execute this query.",
            chat.session_id()
        );
    }
    if let Some(action) = page.last_action() {
        info!(?action, "Chat action applied");
    }
    Ok(())
}
