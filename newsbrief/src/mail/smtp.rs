use lettre::message::{header, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::time::Duration;

use super::{MailTransport, OutboundEmail};
use crate::error::{Error, Result};
use common::MailConfig;

/// SMTP mailer speaking STARTTLS with authenticated login. The SMTP
/// username doubles as the From address.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl SmtpMailer {
    /// Build a mailer from the [mail] config section, resolving the
    /// credentials through the configured environment variables.
    pub fn from_config(config: &MailConfig) -> Result<Self> {
        let username_env = config.username_env();
        let password_env = config.password_env();
        let username = std::env::var(username_env).map_err(|_| {
            Error::Config(format!("mail username env var {} is not set", username_env))
        })?;
        let password = std::env::var(password_env).map_err(|_| {
            Error::Config(format!("mail password env var {} is not set", password_env))
        })?;

        let from: Mailbox = username.parse().map_err(|e| {
            Error::Config(format!("mail username {:?} is not a valid address: {}", username, e))
        })?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(config.smtp_host())?
            .port(config.smtp_port())
            .credentials(Credentials::new(username, password))
            .timeout(Some(Duration::from_secs(config.timeout_seconds())))
            .build();

        Ok(Self { transport, from })
    }
}

#[async_trait::async_trait]
impl MailTransport for SmtpMailer {
    async fn send(&self, email: &OutboundEmail) -> Result<()> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(email.to.parse()?)
            .subject(email.subject.clone())
            .multipart(
                MultiPart::alternative().singlepart(
                    SinglePart::builder()
                        .header(header::ContentType::TEXT_HTML)
                        .body(email.html_body.clone()),
                ),
            )?;

        self.transport.send(message).await?;
        Ok(())
    }
}
