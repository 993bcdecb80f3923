use crate::error::Result;

/// One outbound newsletter email, ready for a transport.
#[derive(Debug, Clone)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

/// Transport abstraction so delivery logic stays independent of SMTP
/// details (and testable without a relay).
#[async_trait::async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, email: &OutboundEmail) -> Result<()>;
}

pub mod smtp;
