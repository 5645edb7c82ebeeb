//! proctorsync scheduled task.
//!
//! Invoked by the host scheduler on a fixed interval; performs one
//! reconciliation pass and exits. Every knob is environment-configurable with
//! a default, so the scheduler runs the binary with no arguments. The exit
//! code is non-zero only on a run-level failure; skipped points and records
//! are reported through the logs.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tracing::info;

use proctorsync_core::db::unix_timestamp;
use proctorsync_core::timeout::SessionTimeoutPolicy;
use proctorsync_core::tracing_init;

use proctorsync_task::host::{HostDatabase, MailGateway, MailGatewayConfig};
use proctorsync_task::notify::{LogMailer, Mailer, NotificationDispatcher};
use proctorsync_task::remote::{ParticipantClient, RemoteConfig};
use proctorsync_task::sync::{ReconciliationEngine, RunContext};

#[derive(Parser, Debug)]
#[command(name = "proctorsync-task")]
#[command(version, about = "proctorsync - syncs remote proctoring reviews into activity completion")]
struct Args {
    /// Remote proctoring API base URL
    #[arg(
        long,
        default_value = "https://api.proctorsync.example.com",
        env = "PROCTORSYNC_API_URL"
    )]
    api_url: String,

    /// Per-request HTTP timeout in seconds for remote API calls
    #[arg(long, default_value_t = 30, env = "PROCTORSYNC_HTTP_TIMEOUT")]
    http_timeout: u64,

    /// Participant records fetched per page
    #[arg(long, default_value_t = 100, env = "PROCTORSYNC_PAGE_SIZE")]
    page_size: usize,

    /// Host database file path
    #[arg(long, env = "PROCTORSYNC_DB_PATH")]
    db_path: Option<PathBuf>,

    /// Mail gateway endpoint URL; when unset, status e-mails are logged only
    #[arg(long, env = "PROCTORSYNC_MAIL_URL")]
    mail_url: Option<String>,

    /// Sender address for status e-mails
    #[arg(
        long,
        default_value = "no-reply@proctorsync.example.com",
        env = "PROCTORSYNC_MAIL_FROM"
    )]
    mail_from: String,

    /// Bearer token for the mail gateway
    #[arg(long, env = "PROCTORSYNC_MAIL_TOKEN")]
    mail_token: Option<String>,

    /// Minutes of course inactivity before a remote session is closed
    #[arg(long, default_value_t = 10, env = "PROCTORSYNC_SESSION_TIMEOUT")]
    session_timeout_mins: i64,

    /// Trailing grace window (minutes) in which a close attempt is still made
    #[arg(long, default_value_t = 4, env = "PROCTORSYNC_SESSION_GRACE")]
    session_grace_mins: i64,

    /// Concurrent integration-point workers (1 = sequential)
    #[arg(long, default_value_t = 1, env = "PROCTORSYNC_WORKERS")]
    workers: usize,

    /// Unix time of the last successful run, supplied by the scheduler
    /// (0 = full resync)
    #[arg(long, default_value_t = 0, env = "PROCTORSYNC_LAST_RUN")]
    last_run: i64,

    /// Log level filter for the task (e.g. "info", "debug", "warn")
    #[arg(long, default_value = "info", env = "PROCTORSYNC_LOG_LEVEL")]
    log_level: String,

    /// Output logs as JSON (for structured log aggregation)
    #[arg(long, env = "PROCTORSYNC_LOG_JSON")]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let log_filter = format!(
        "proctorsync_task={level},proctorsync_core={level}",
        level = args.log_level
    );
    tracing_init::init_tracing(&log_filter, args.log_json);

    info!(
        version = env!("CARGO_PKG_VERSION"),
        api_url = %args.api_url,
        workers = args.workers,
        last_run = args.last_run,
        "Starting proctorsync task"
    );

    let db_path = match args.db_path {
        Some(path) => path,
        None => default_db_path()?,
    };
    info!(path = %db_path.display(), "Opening host database");
    let db = Arc::new(HostDatabase::open(&db_path).await?);

    let client = Arc::new(ParticipantClient::new(&RemoteConfig {
        base_url: args.api_url,
        timeout: Duration::from_secs(args.http_timeout),
        page_size: args.page_size,
    })?);

    let mailer: Arc<dyn Mailer> = match args.mail_url {
        Some(endpoint) => Arc::new(MailGateway::new(MailGatewayConfig {
            endpoint,
            from: args.mail_from,
            token: args.mail_token,
        })?),
        None => {
            info!("No mail gateway configured; status e-mails will be logged only");
            Arc::new(LogMailer)
        }
    };
    let dispatcher = Arc::new(NotificationDispatcher::new(mailer));

    let engine = Arc::new(
        ReconciliationEngine::new(
            Arc::clone(&db) as _,
            Arc::clone(&db) as _,
            db as _,
            client as _,
            dispatcher,
        )
        .with_timeout(SessionTimeoutPolicy::new(
            args.session_timeout_mins * 60,
            args.session_grace_mins * 60,
        ))
        .with_max_workers(args.workers),
    );

    // Cancellation: a shutdown signal lets the in-flight record finish, then
    // the engine stops starting new ones.
    let (cancel_tx, cancel_rx) = tokio::sync::watch::channel(false);
    let signal_task = tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("Shutdown signal received; finishing current record");
        let _ = cancel_tx.send(true);
    });

    let ctx = RunContext {
        now: unix_timestamp(),
        last_run_time: args.last_run,
    };
    let report = engine.run(ctx, cancel_rx).await?;
    signal_task.abort();

    info!(
        points = report.points.len(),
        processed = report.points_processed(),
        skipped = report.points_skipped(),
        participants = report.participants_seen(),
        updated = report.completions_updated(),
        notified = report.notifications_sent(),
        sessions_closed = report.sessions_closed(),
        cancelled = report.cancelled,
        "Reconciliation run complete"
    );
    Ok(())
}

/// Wait for Ctrl+C or, on unix, SIGTERM.
async fn wait_for_shutdown_signal() {
    #[cfg(unix)]
    {
        let sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate());
        match sigterm {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {}
                    _ = sigterm.recv() => {}
                }
            }
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}

/// Default host database path: ~/.proctorsync/host.db
fn default_db_path() -> anyhow::Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home.join(".proctorsync").join("host.db"))
}
