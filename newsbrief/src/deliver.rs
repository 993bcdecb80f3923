// Deliver stage: fan the composed newsletter out to the subscriber list
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

use crate::compose::CLOSING_PHRASE;
use crate::error::{Error, Result};
use crate::mail::{MailTransport, OutboundEmail};
use crate::storage::Storage;

/// One entry of the subscriber list file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Per-recipient send counters for one delivery round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeliveryReport {
    pub sent: usize,
    pub failed: usize,
}

/// Load the subscriber list: a JSON array of { name, email } objects.
pub async fn load_subscribers(path: &Path) -> Result<Vec<Subscriber>> {
    if !path.exists() {
        return Err(Error::Config(format!(
            "subscriber file not found: {}",
            path.display()
        )));
    }
    let data = tokio::fs::read_to_string(path).await?;
    Ok(serde_json::from_str(&data)?)
}

/// Rewrite the shared closing phrase into a name-bearing variant.
fn personalize(html: &str, name: &str) -> String {
    let personal = format!("{}, {}!", CLOSING_PHRASE.trim_end_matches('!'), name);
    html.replace(CLOSING_PHRASE, &personal)
}

/// Send the latest composed newsletter to every subscriber that has an
/// email address.
///
/// Entries without an address are skipped silently. A transport failure for
/// one recipient is counted and logged, then the loop moves on; it never
/// aborts the round.
pub async fn deliver_newsletter<M: MailTransport + ?Sized>(
    mailer: &M,
    storage: &Storage,
    subject: &str,
) -> Result<DeliveryReport> {
    let html = storage.read_latest_newsletter().await?;
    let subscribers = load_subscribers(storage.subscribers_path()).await?;

    info!(subscribers = subscribers.len(), "delivering newsletter");

    let mut report = DeliveryReport::default();
    for subscriber in &subscribers {
        let Some(email) = subscriber.email.as_deref().filter(|e| !e.trim().is_empty()) else {
            debug!(
                name = subscriber.name.as_deref().unwrap_or(""),
                "skipping subscriber without email"
            );
            continue;
        };
        let name = subscriber.name.as_deref().unwrap_or("Subscriber");

        let message = OutboundEmail {
            to: email.to_string(),
            subject: subject.to_string(),
            html_body: personalize(&html, name),
        };

        match mailer.send(&message).await {
            Ok(()) => {
                report.sent += 1;
                debug!(to = email, "newsletter sent");
            }
            Err(e) => {
                report.failed += 1;
                warn!(to = email, error = %e, "failed to send newsletter");
            }
        }
    }

    info!(sent = report.sent, failed = report.failed, "deliver stage completed");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::StorageConfig;
    use std::sync::Mutex;

    struct RecordingMailer {
        sent: Mutex<Vec<OutboundEmail>>,
        fail_for: Vec<String>,
    }

    impl RecordingMailer {
        fn new() -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_for: Vec::new(),
            }
        }

        fn failing_for(addresses: &[&str]) -> Self {
            Self {
                sent: Mutex::new(Vec::new()),
                fail_for: addresses.iter().map(|a| a.to_string()).collect(),
            }
        }

        fn recorded(&self) -> Vec<OutboundEmail> {
            self.sent.lock().expect("lock").clone()
        }
    }

    #[async_trait::async_trait]
    impl MailTransport for RecordingMailer {
        async fn send(&self, email: &OutboundEmail) -> Result<()> {
            if self.fail_for.contains(&email.to) {
                return Err(Error::Config("recipient rejected".to_string()));
            }
            self.sent.lock().expect("lock").push(email.clone());
            Ok(())
        }
    }

    async fn storage_with_newsletter(dir: &Path, html: &str, subscribers: &str) -> Storage {
        let storage = Storage::new(&StorageConfig {
            data_dir: Some(dir.to_string_lossy().to_string()),
        });
        storage.ensure_layout().await.expect("layout");
        storage.write_newsletter(html).await.expect("newsletter");
        tokio::fs::write(storage.subscribers_path(), subscribers)
            .await
            .expect("subscribers");
        storage
    }

    #[test]
    fn personalize_rewrites_the_closing_phrase() {
        let html = format!("<p>{}</p>", CLOSING_PHRASE);
        let personal = personalize(&html, "Leo");
        assert!(personal.contains("Stay tuned for more AI insights, Leo!"));
        assert!(!personal.contains(CLOSING_PHRASE));
    }

    #[tokio::test]
    async fn skips_subscribers_without_email() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = storage_with_newsletter(
            dir.path(),
            "<html><body>news</body></html>",
            r#"[
                {"name": "NoMail"},
                {"name": "Empty", "email": "  "},
                {"name": "Leo", "email": "leo@example.com"}
            ]"#,
        )
        .await;

        let mailer = RecordingMailer::new();
        let report = deliver_newsletter(&mailer, &storage, "Daily")
            .await
            .expect("delivery runs");

        assert_eq!(report, DeliveryReport { sent: 1, failed: 0 });
        let recorded = mailer.recorded();
        assert_eq!(recorded.len(), 1);
        assert_eq!(recorded[0].to, "leo@example.com");
        assert_eq!(recorded[0].subject, "Daily");
    }

    #[tokio::test]
    async fn failures_are_counted_and_do_not_abort() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = storage_with_newsletter(
            dir.path(),
            "<html><body>news</body></html>",
            r#"[
                {"name": "A", "email": "a@example.com"},
                {"name": "B", "email": "b@example.com"},
                {"name": "C", "email": "c@example.com"}
            ]"#,
        )
        .await;

        let mailer = RecordingMailer::failing_for(&["b@example.com"]);
        let report = deliver_newsletter(&mailer, &storage, "Daily")
            .await
            .expect("delivery runs");

        assert_eq!(report, DeliveryReport { sent: 2, failed: 1 });
        let recorded: Vec<String> = mailer.recorded().into_iter().map(|m| m.to).collect();
        assert_eq!(recorded, vec!["a@example.com", "c@example.com"]);
    }

    #[tokio::test]
    async fn each_recipient_gets_a_personalized_body() {
        let dir = tempfile::tempdir().expect("tempdir");
        let html = format!("<html><body><p>{}</p></body></html>", CLOSING_PHRASE);
        let storage = storage_with_newsletter(
            dir.path(),
            &html,
            r#"[
                {"name": "Leo", "email": "leo@example.com"},
                {"email": "anon@example.com"}
            ]"#,
        )
        .await;

        let mailer = RecordingMailer::new();
        deliver_newsletter(&mailer, &storage, "Daily")
            .await
            .expect("delivery runs");

        let recorded = mailer.recorded();
        assert!(recorded[0].html_body.contains("AI insights, Leo!"));
        // missing name gets the generic salutation
        assert!(recorded[1].html_body.contains("AI insights, Subscriber!"));
    }

    #[tokio::test]
    async fn empty_subscriber_list_reports_zero() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage =
            storage_with_newsletter(dir.path(), "<html><body>news</body></html>", "[]").await;

        let mailer = RecordingMailer::new();
        let report = deliver_newsletter(&mailer, &storage, "Daily")
            .await
            .expect("delivery runs");
        assert_eq!(report, DeliveryReport::default());
    }

    #[tokio::test]
    async fn missing_subscriber_file_is_a_config_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::new(&StorageConfig {
            data_dir: Some(dir.path().to_string_lossy().to_string()),
        });
        storage.ensure_layout().await.expect("layout");
        storage
            .write_newsletter("<html></html>")
            .await
            .expect("newsletter");

        let mailer = RecordingMailer::new();
        let err = deliver_newsletter(&mailer, &storage, "Daily")
            .await
            .expect_err("no subscriber file");
        assert!(matches!(err, Error::Config(_)));
        assert!(err.to_string().contains("subscriber file not found"));
    }

    #[tokio::test]
    async fn missing_newsletter_fails_before_sending() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = Storage::new(&StorageConfig {
            data_dir: Some(dir.path().to_string_lossy().to_string()),
        });
        storage.ensure_layout().await.expect("layout");

        let mailer = RecordingMailer::new();
        let err = deliver_newsletter(&mailer, &storage, "Daily")
            .await
            .expect_err("no newsletter yet");
        assert!(matches!(err, Error::Config(_)));
        assert!(mailer.recorded().is_empty());
    }
}
