use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{Error, Result};
use common::StorageConfig;

/// Cache file holding the raw provider response of the last fetch
pub const RAW_FETCH_FILE: &str = "latest_fetch.json";
/// Cache file holding the summary records of the last run
pub const SUMMARIES_FILE: &str = "latest_summaries.json";
/// Stable pointer to the most recently composed newsletter
pub const LATEST_NEWSLETTER_FILE: &str = "newsletter.html";

/// On-disk layout used by the pipeline: `cache/` for run artifacts,
/// `logs/` for daily log files, `subscribers.json` for the recipient list.
#[derive(Debug, Clone)]
pub struct Storage {
    cache_dir: PathBuf,
    logs_dir: PathBuf,
    subscribers_path: PathBuf,
}

impl Storage {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            cache_dir: config.cache_dir(),
            logs_dir: config.logs_dir(),
            subscribers_path: config.subscribers_path(),
        }
    }

    /// Create the cache and log directories if they do not exist yet.
    pub async fn ensure_layout(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.cache_dir).await?;
        tokio::fs::create_dir_all(&self.logs_dir).await?;
        Ok(())
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    pub fn subscribers_path(&self) -> &Path {
        &self.subscribers_path
    }

    pub fn latest_newsletter_path(&self) -> PathBuf {
        self.cache_dir.join(LATEST_NEWSLETTER_FILE)
    }

    /// Write through a temp file in the same directory followed by a rename,
    /// so a reader never observes a partially written file.
    async fn write_atomic(&self, path: &Path, contents: &[u8]) -> Result<()> {
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Cache the raw provider response of a fetch, replacing the previous one.
    pub async fn write_raw_fetch(&self, body: &str) -> Result<PathBuf> {
        let path = self.cache_dir.join(RAW_FETCH_FILE);
        self.write_atomic(&path, body.as_bytes()).await?;
        debug!(path = %path.display(), "raw fetch response cached");
        Ok(path)
    }

    /// Cache the summary records of a run, replacing the previous ones.
    pub async fn write_summaries(&self, json: &str) -> Result<PathBuf> {
        let path = self.cache_dir.join(SUMMARIES_FILE);
        self.write_atomic(&path, json.as_bytes()).await?;
        debug!(path = %path.display(), "summaries cached");
        Ok(path)
    }

    /// Persist a composed newsletter twice: a timestamped history copy and
    /// the stable latest pointer the deliver stage reads back. Returns
    /// (latest, history).
    pub async fn write_newsletter(&self, html: &str) -> Result<(PathBuf, PathBuf)> {
        let history = self.cache_dir.join(newsletter_file_name(Local::now()));
        self.write_atomic(&history, html.as_bytes()).await?;

        let latest = self.latest_newsletter_path();
        self.write_atomic(&latest, html.as_bytes()).await?;

        Ok((latest, history))
    }

    /// Read back the most recently composed newsletter.
    pub async fn read_latest_newsletter(&self) -> Result<String> {
        let path = self.latest_newsletter_path();
        if !path.exists() {
            return Err(Error::Config(format!(
                "no newsletter found at {}: the compose stage has not run yet",
                path.display()
            )));
        }
        Ok(tokio::fs::read_to_string(&path).await?)
    }
}

/// History file name for a newsletter composed at `ts`.
fn newsletter_file_name(ts: DateTime<Local>) -> String {
    format!("newsletter_{}.html", ts.format("%Y-%m-%d_%H-%M-%S"))
}
