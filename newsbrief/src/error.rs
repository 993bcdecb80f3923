use thiserror::Error;

/// Errors surfaced by the newsletter pipeline stages.
#[derive(Debug, Error)]
pub enum Error {
    /// Missing or unusable configuration: empty topic, unset credential
    /// env vars, absent subscriber file, and similar startup problems.
    #[error("configuration error: {0}")]
    Config(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// A remote API answered with a non-success status. The body is kept
    /// verbatim so rate-limit and quota messages stay visible in logs.
    #[error("{service} returned status {status}: {body}")]
    UnexpectedStatus {
        service: &'static str,
        status: u16,
        body: String,
    },

    /// The completion endpoint answered 200 but carried no choices.
    #[error("LLM response contained no completion choices")]
    NoCompletion,

    /// The newsletter stage could not produce usable HTML. Unlike failed
    /// per-article summaries, this aborts the run.
    #[error("newsletter generation failed: {0}")]
    Generation(String),

    #[error("SMTP transport error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("failed to build mail message: {0}")]
    Mail(#[from] lettre::error::Error),

    #[error("invalid mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
