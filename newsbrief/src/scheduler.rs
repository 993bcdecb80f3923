// Scheduler: daily wall-clock trigger for the newsletter workflow
use chrono::{Local, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::select;
use tokio::sync::Notify;
use tracing::{error, info, warn};

use crate::workflow::{RunOutcome, Workflow};

/// Runs the workflow once per day at a fixed local time, until shutdown.
pub struct Scheduler {
    workflow: Arc<Workflow>,
    daily_time: NaiveTime,
    run_on_start: bool,
}

impl Scheduler {
    pub fn new(workflow: Arc<Workflow>, daily_time: NaiveTime, run_on_start: bool) -> Self {
        Self {
            workflow,
            daily_time,
            run_on_start,
        }
    }

    /// Run until `shutdown` is notified: one optional immediate trigger,
    /// then one trigger per day at the configured local time.
    pub async fn run(self, shutdown: Arc<Notify>) {
        info!(
            time = %self.daily_time,
            run_on_start = self.run_on_start,
            "scheduler started"
        );

        if self.run_on_start {
            info!("running newsletter workflow immediately");
            self.trigger().await;
        }

        loop {
            let wait = duration_until_next(self.daily_time, Local::now().naive_local());
            info!(seconds = wait.as_secs(), "next newsletter run scheduled");

            select! {
                _ = tokio::time::sleep(wait) => {
                    self.trigger().await;
                }
                _ = shutdown.notified() => {
                    info!("scheduler: shutdown requested, exiting loop");
                    break;
                }
            }
        }
    }

    /// One trigger: skip when a run is still in flight, log failures, never
    /// let them escape into the loop.
    async fn trigger(&self) {
        match self.workflow.try_run().await {
            Ok(RunOutcome::Completed(report)) => {
                info!(
                    articles = report.articles_fetched,
                    summaries = report.summaries_created,
                    newsletter = %report.newsletter_path.display(),
                    "scheduled run completed"
                );
            }
            Ok(RunOutcome::Busy) => {
                warn!("previous run still in progress, skipping this trigger");
            }
            Err(e) => {
                error!(error = %e, "scheduled run failed");
            }
        }
    }
}

/// Time remaining until the next occurrence of `target` after `now`.
fn duration_until_next(target: NaiveTime, now: NaiveDateTime) -> Duration {
    let today = now.date().and_time(target);
    let next = if today > now {
        today
    } else {
        today + chrono::Duration::days(1)
    };
    (next - now).to_std().unwrap_or(Duration::ZERO)
}
