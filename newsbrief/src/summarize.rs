// Summarize stage: one LLM call per fetched article
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::fetch::Article;
use crate::llm::{LlmProvider, LlmRequest};
use crate::storage::Storage;

/// Outcome of one per-article summarization. A failed completion degrades
/// into a visible placeholder instead of failing the stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    Generated(String),
    Degraded(String),
}

impl SummaryOutcome {
    pub fn text(&self) -> &str {
        match self {
            Self::Generated(s) | Self::Degraded(s) => s,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded(_))
    }
}

/// A summarized article as carried between pipeline stages.
#[derive(Debug, Clone)]
pub struct ArticleSummary {
    pub title: String,
    pub url: Option<String>,
    pub outcome: SummaryOutcome,
}

/// Flat record used for the cache file and the compose prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryRecord {
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
}

impl ArticleSummary {
    pub fn to_record(&self) -> SummaryRecord {
        SummaryRecord {
            title: self.title.clone(),
            summary: self.outcome.text().to_string(),
            url: self.url.clone(),
        }
    }
}

fn summary_prompt(title: &str, content: &str) -> String {
    format!(
        "Summarize the following news article in about 2-3 sentences.\n\
         Keep the tone professional and informative.\n\
         Avoid unnecessary details or promotional content.\n\n\
         Title: {}\n\
         Content: {}\n\n\
         Return only the summary text.",
        title, content
    )
}

/// Summarize the fetched articles one by one, in order.
///
/// Articles without usable text are skipped. A provider error for one
/// article is caught here and turned into a degraded placeholder summary;
/// only cache I/O can fail the stage as a whole.
pub async fn summarize_articles<P: LlmProvider + ?Sized>(
    provider: &P,
    articles: &[Article],
    max_tokens: usize,
    temperature: f32,
    storage: &Storage,
) -> Result<Vec<ArticleSummary>> {
    let mut summaries = Vec::new();

    for (idx, article) in articles.iter().enumerate() {
        let title = article.title.as_deref().unwrap_or("Untitled");
        let Some(content) = article.usable_content() else {
            debug!(position = idx + 1, title, "skipping article without usable content");
            continue;
        };

        let request = LlmRequest {
            prompt: summary_prompt(title, content),
            max_tokens: Some(max_tokens),
            temperature: Some(temperature),
            timeout_seconds: None,
        };

        let outcome = match provider.generate(request).await {
            Ok(response) => SummaryOutcome::Generated(response.content.trim().to_string()),
            Err(e) => {
                warn!(position = idx + 1, title, error = %e, "summarization failed, recording placeholder");
                SummaryOutcome::Degraded(format!("[Error summarizing article {}: {}]", idx + 1, e))
            }
        };

        summaries.push(ArticleSummary {
            title: title.to_string(),
            url: article.url.clone(),
            outcome,
        });
    }

    let records: Vec<SummaryRecord> = summaries.iter().map(ArticleSummary::to_record).collect();
    storage
        .write_summaries(&serde_json::to_string_pretty(&records)?)
        .await?;

    info!(
        summaries = summaries.len(),
        articles = articles.len(),
        "summarize stage completed"
    );
    Ok(summaries)
}
