// Workflow driver: the four pipeline stages strictly in order
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::compose;
use crate::deliver;
use crate::error::Result;
use crate::fetch::NewsClient;
use crate::llm::LlmProvider;
use crate::mail::MailTransport;
use crate::storage::Storage;
use crate::summarize;
use common::Config;

/// Counters and artifacts of one completed pipeline run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub articles_fetched: usize,
    pub summaries_created: usize,
    pub newsletter_path: PathBuf,
}

/// Outcome of one trigger attempt.
#[derive(Debug)]
pub enum RunOutcome {
    Completed(RunReport),
    Busy,
}

/// Owns the stage clients and serializes pipeline executions: at most one
/// run is in flight at any time.
pub struct Workflow {
    config: Config,
    news: NewsClient,
    llm: Arc<dyn LlmProvider>,
    mailer: Arc<dyn MailTransport>,
    storage: Storage,
    topic_override: Option<String>,
    run_lock: Mutex<()>,
}

impl Workflow {
    pub fn new(
        config: Config,
        news: NewsClient,
        llm: Arc<dyn LlmProvider>,
        mailer: Arc<dyn MailTransport>,
        storage: Storage,
    ) -> Self {
        Self {
            config,
            news,
            llm,
            mailer,
            storage,
            topic_override: None,
            run_lock: Mutex::new(()),
        }
    }

    /// Use `topic` for every run instead of the configured one.
    pub fn with_topic(mut self, topic: Option<String>) -> Self {
        self.topic_override = topic;
        self
    }

    /// Run the four stages in order, waiting for any run already in flight
    /// to finish first.
    pub async fn run(&self) -> Result<RunReport> {
        let _guard = self.run_lock.lock().await;
        self.run_locked().await
    }

    /// Like `run`, but refuses to overlap an execution already in flight.
    pub async fn try_run(&self) -> Result<RunOutcome> {
        let Ok(_guard) = self.run_lock.try_lock() else {
            return Ok(RunOutcome::Busy);
        };
        self.run_locked().await.map(RunOutcome::Completed)
    }

    async fn run_locked(&self) -> Result<RunReport> {
        info!("newsletter workflow starting");

        let articles = self
            .news
            .fetch_articles(self.topic_override.as_deref(), &self.storage)
            .await?;
        info!(count = articles.len(), "stage 1/4 done: fetch");

        let summaries = summarize::summarize_articles(
            self.llm.as_ref(),
            &articles,
            self.config.llm.summary_max_tokens(),
            self.config.llm.temperature(),
            &self.storage,
        )
        .await?;
        info!(count = summaries.len(), "stage 2/4 done: summarize");

        let newsletter = compose::compose_newsletter(
            self.llm.as_ref(),
            &summaries,
            self.config.llm.newsletter_max_tokens(),
            self.config.llm.temperature(),
            &self.storage,
        )
        .await?;
        info!(path = %newsletter.path.display(), "stage 3/4 done: compose");

        let delivery = deliver::deliver_newsletter(
            self.mailer.as_ref(),
            &self.storage,
            self.config.mail.subject(),
        )
        .await?;
        info!(
            sent = delivery.sent,
            failed = delivery.failed,
            "stage 4/4 done: deliver"
        );

        let report = RunReport {
            articles_fetched: articles.len(),
            summaries_created: summaries.len(),
            newsletter_path: newsletter.path,
        };
        info!(
            articles = report.articles_fetched,
            summaries = report.summaries_created,
            "newsletter workflow finished"
        );
        Ok(report)
    }
}
