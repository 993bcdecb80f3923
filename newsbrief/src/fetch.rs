use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::info;
use url::Url;

use crate::error::{Error, Result};
use crate::storage::Storage;
use common::NewsConfig;

/// One normalized news article as returned by the fetch stage.
///
/// Every field is optional: provider items are mapped defensively and a
/// missing field becomes `None` instead of failing the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Article {
    pub title: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub source: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub content: Option<String>,
}

impl Article {
    /// Text the summarize stage can work with: the description first, then
    /// the content snippet. `None` when neither carries anything.
    pub fn usable_content(&self) -> Option<&str> {
        self.description
            .as_deref()
            .filter(|s| !s.trim().is_empty())
            .or_else(|| self.content.as_deref().filter(|s| !s.trim().is_empty()))
    }
}

/// Client for a NewsAPI-style article search endpoint.
pub struct NewsClient {
    client: Client,
    endpoint: Url,
    api_key: String,
    default_topic: String,
    page_size: u32,
    language: String,
    from_days: Option<i64>,
    timeout: Duration,
}

impl NewsClient {
    pub fn new(
        endpoint: &str,
        api_key: impl Into<String>,
        default_topic: impl Into<String>,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("invalid news endpoint {:?}: {}", endpoint, e)))?;
        let client = Client::builder().user_agent("Newsbrief/0.1.0").build()?;

        Ok(Self {
            client,
            endpoint,
            api_key: api_key.into(),
            default_topic: default_topic.into(),
            page_size: 5,
            language: "en".to_string(),
            from_days: None,
            timeout: Duration::from_secs(15),
        })
    }

    pub fn with_params(
        mut self,
        page_size: u32,
        language: impl Into<String>,
        timeout_secs: u64,
    ) -> Self {
        self.page_size = page_size;
        self.language = language.into();
        self.timeout = Duration::from_secs(timeout_secs);
        self
    }

    /// Restrict results to articles published in the last `from_days` days.
    pub fn with_window(mut self, from_days: i64) -> Self {
        self.from_days = Some(from_days);
        self
    }

    /// Build a client from the [news] config section, resolving the API key
    /// through the configured environment variable.
    pub fn from_config(config: &NewsConfig) -> Result<Self> {
        let api_key_env = config.api_key_env();
        let api_key = std::env::var(api_key_env).map_err(|_| {
            Error::Config(format!("news API key env var {} is not set", api_key_env))
        })?;

        let mut client = Self::new(config.endpoint(), api_key, config.topic())?.with_params(
            config.page_size(),
            config.language(),
            config.timeout_seconds(),
        );
        if let Some(days) = config.from_days {
            client = client.with_window(days);
        }
        Ok(client)
    }

    fn effective_topic<'a>(&'a self, requested: Option<&'a str>) -> Result<&'a str> {
        let topic = match requested.map(str::trim) {
            Some(t) if !t.is_empty() => t,
            _ => self.default_topic.trim(),
        };
        if topic.is_empty() {
            return Err(Error::Config("news topic is empty".to_string()));
        }
        Ok(topic)
    }

    /// Run one article search. The raw provider response is cached through
    /// `storage` on every successful call before any parsing happens.
    pub async fn fetch_articles(
        &self,
        topic: Option<&str>,
        storage: &Storage,
    ) -> Result<Vec<Article>> {
        let topic = self.effective_topic(topic)?;
        if self.api_key.trim().is_empty() {
            return Err(Error::Config("news API key is empty".to_string()));
        }

        info!(topic, page_size = self.page_size, "fetching news articles");

        let mut params: Vec<(&str, String)> = vec![
            ("q", topic.to_string()),
            ("pageSize", self.page_size.to_string()),
            ("language", self.language.clone()),
            ("sortBy", "publishedAt".to_string()),
        ];
        if let Some(days) = self.from_days {
            let lower = Utc::now() - ChronoDuration::days(days);
            params.push(("from", lower.to_rfc3339()));
        }

        let response = self
            .client
            .get(self.endpoint.clone())
            .timeout(self.timeout)
            .header("Authorization", &self.api_key)
            .query(&params)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::UnexpectedStatus {
                service: "news API",
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        storage.write_raw_fetch(&body).await?;

        let parsed: NewsApiResponse = serde_json::from_str(&body)?;
        let articles: Vec<Article> = parsed.articles.into_iter().map(map_raw).collect();

        info!(count = articles.len(), "fetch completed");
        Ok(articles)
    }
}

// Wire structures for the provider response
#[derive(Debug, Deserialize)]
struct NewsApiResponse {
    #[serde(default)]
    articles: Vec<RawArticle>,
}

#[derive(Debug, Deserialize)]
struct RawArticle {
    title: Option<String>,
    description: Option<String>,
    url: Option<String>,
    source: Option<RawSource>,
    #[serde(rename = "publishedAt")]
    published_at: Option<String>,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    name: Option<String>,
}

fn map_raw(raw: RawArticle) -> Article {
    Article {
        title: raw.title,
        description: raw.description,
        url: raw.url,
        source: raw.source.and_then(|s| s.name),
        published_at: raw.published_at.and_then(|s| s.parse().ok()),
        content: raw.content,
    }
}
