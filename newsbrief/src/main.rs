/*
newsbrief - single-binary main.rs
This binary runs the newsletter pipeline once (--once) or starts the daily
scheduler that triggers it at the configured wall-clock time.
*/

use clap::Parser;
use common::Config;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::select;
use tokio::sync::Notify;
use tokio::time::Duration;
use tracing::{error, info};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

// Import modules from the lib
use newsbrief::fetch::NewsClient;
use newsbrief::llm::remote::RemoteLlmProvider;
use newsbrief::mail::smtp::SmtpMailer;
use newsbrief::scheduler::Scheduler;
use newsbrief::storage::Storage;
use newsbrief::workflow::Workflow;

#[derive(Parser, Debug)]
#[command(name = "newsbrief", about = "Newsbrief newsletter pipeline + scheduler")]
struct Args {
    /// Path to config.toml
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Run the pipeline once and exit (no scheduler)
    #[arg(long)]
    once: bool,

    /// Do not trigger an immediate run when the scheduler starts
    #[arg(long)]
    skip_initial_run: bool,

    /// Override the configured news topic
    #[arg(long)]
    topic: Option<String>,

    /// Override log level (info, debug, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env first so credential env vars are visible
    dotenv::dotenv().ok();

    // Parse CLI args
    let args = Args::parse();

    // Resolve config paths
    let default_path = PathBuf::from("config.default.toml");

    let override_path = if let Some(p) = args.config {
        if !p.exists() {
            eprintln!("specified config file not found: {}", p.display());
            return Err(anyhow::anyhow!("Config file not found: {}", p.display()));
        }
        Some(p)
    } else {
        let p = PathBuf::from("config.toml");
        if p.exists() {
            Some(p)
        } else {
            None
        }
    };

    // Load configuration with defaults. This happens before logging init
    // because the log file location comes from the [storage] section.
    let config = match Config::load_with_defaults(
        if default_path.exists() { Some(&default_path) } else { None },
        override_path.as_deref(),
    )
    .await
    {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("failed to load configuration: {:#}", e);
            return Err(e);
        }
    };

    let storage = Storage::new(&config.storage);
    storage.ensure_layout().await?;

    // Initialize logging: stdout plus a daily-rolling file under the logs dir
    let filter = EnvFilter::try_new(&args.log_level).unwrap_or_else(|_| EnvFilter::new("info"));
    let file_appender = tracing_appender::rolling::daily(storage.logs_dir(), "newsbrief.log");
    let (file_writer, _log_guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .with(fmt::layer().with_ansi(false).with_writer(file_writer))
        .init();

    info!(default = ?default_path, override_file = ?override_path, "configuration loaded");

    // Build the stage clients; credentials are resolved from the environment
    let news = match NewsClient::from_config(&config.news) {
        Ok(c) => c,
        Err(e) => {
            error!(%e, "failed to initialize news client");
            return Err(e.into());
        }
    };
    let llm = Arc::new(RemoteLlmProvider::from_config(&config.llm)?);
    info!(model = config.llm.model(), "LLM provider initialized");
    let mailer = Arc::new(SmtpMailer::from_config(&config.mail)?);
    info!(host = config.mail.smtp_host(), "SMTP mailer initialized");

    let workflow = Arc::new(
        Workflow::new(config.clone(), news, llm, mailer, storage).with_topic(args.topic),
    );

    if args.once {
        info!("running newsletter workflow once");
        let report = workflow.run().await?;
        println!("Workflow finished:");
        println!("  articles fetched:  {}", report.articles_fetched);
        println!("  summaries created: {}", report.summaries_created);
        println!("  newsletter:        {}", report.newsletter_path.display());
        return Ok(());
    }

    // Scheduler mode
    let daily_time = config.scheduler.daily_time()?;
    let run_on_start = config.scheduler.run_on_start() && !args.skip_initial_run;

    let shutdown_notify = Arc::new(Notify::new());
    let scheduler = Scheduler::new(workflow, daily_time, run_on_start);

    info!("spawning scheduler task");
    let mut scheduler_handle = tokio::spawn(scheduler.run(shutdown_notify.clone()));

    // Wait for CTRL-C (the scheduler runs until notified)
    select! {
        _ = tokio::signal::ctrl_c() => {
            info!("ctrl-c received, notifying scheduler to shutdown");
            shutdown_notify.notify_waiters();
        }
        res = &mut scheduler_handle => {
            if let Err(join_err) = res {
                error!(%join_err, "scheduler task ended unexpectedly");
            }
            return Ok(());
        }
    }

    // Give the scheduler a bounded window to wind down
    match tokio::time::timeout(Duration::from_secs(20), scheduler_handle).await {
        Ok(Ok(())) => info!("scheduler exited cleanly"),
        Ok(Err(join_err)) => error!(%join_err, "scheduler task panicked"),
        Err(_) => error!("timed out waiting for scheduler shutdown"),
    }

    info!("newsbrief shutdown complete");
    Ok(())
}
