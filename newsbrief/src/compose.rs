// Compose stage: one LLM call turning the summary records into HTML
use std::path::PathBuf;
use tracing::info;

use crate::error::{Error, Result};
use crate::llm::{LlmProvider, LlmRequest};
use crate::storage::Storage;
use crate::summarize::{ArticleSummary, SummaryRecord};

/// Closing phrase the compose prompt pins at the end of every newsletter.
/// The deliver stage rewrites this exact phrase per recipient, so the two
/// stages must agree on it.
pub const CLOSING_PHRASE: &str = "Stay tuned for more AI insights!";

/// A composed newsletter: the cleaned HTML and the latest-pointer path it
/// was persisted to.
#[derive(Debug, Clone)]
pub struct ComposedNewsletter {
    pub html: String,
    pub path: PathBuf,
}

fn newsletter_prompt(articles_json: &str) -> String {
    let mut prompt = String::new();
    prompt.push_str("You are an expert newsletter writer for an AI news digest.\n\n");
    prompt.push_str(
        "Write a professional and engaging newsletter in HTML format ONLY \
         (no markdown, no **bold**, no markdown-style formatting).\n\n",
    );
    prompt.push_str(
        "IMPORTANT: Return ONLY the HTML code, starting with the <html> tag. \
         Do not include any explanatory text before or after the HTML.\n\n",
    );
    prompt.push_str("For each article inside the JSON:\n");
    prompt.push_str("- Use a <div> card.\n");
    prompt.push_str("- Show <h2> for the title.\n");
    prompt.push_str("- Show <p> for the summary.\n");
    prompt.push_str("- Use: <a href=\"ARTICLE_URL\">Read full article</a>\n\n");
    prompt.push_str("Return HTML exactly in this structure:\n\n");
    prompt.push_str(
        r#"<html>
  <body style="background-color:#0e1117; color:white; font-family:Arial; padding:25px;">
    <h1 style="text-align:center; color:#61dafb;">AI Newsletter Digest</h1>

    <p style="font-size:16px; opacity:0.9;">
      Write a short introduction about today's AI news.
    </p>

    <div style="background-color:#1a1f25; padding:20px; border-radius:10px; margin-bottom:25px;">
      <h2 style="color:#61dafb;">ARTICLE_TITLE</h2>
      <p>ARTICLE_SUMMARY</p>
      <a href="ARTICLE_URL" style="color:#ff9f1c;">Read full article</a>
    </div>

"#,
    );
    prompt.push_str(&format!(
        "    <p style=\"margin-top:40px;\">{}</p>\n  </body>\n</html>\n\n",
        CLOSING_PHRASE
    ));
    prompt.push_str("ARTICLES JSON:\n");
    prompt.push_str(articles_json);
    prompt.push_str("\n\nReturn ONLY valid HTML. No markdown. No extraneous characters.\n");
    prompt.push_str("Do not stop early. Generate the complete HTML until the final </html> tag.\n");
    prompt
}

/// Helper to extract HTML from text that might contain markdown backticks
/// or preamble prose before the document itself.
fn extract_html(text: &str) -> String {
    let mut candidate = text.trim();

    // 1. Prefer fenced content when the model wrapped its output
    if let Some(start) = candidate.find("```") {
        let rest = &candidate[start + 3..];
        let rest = rest.strip_prefix("html").unwrap_or(rest);
        if let Some(end) = rest.find("```") {
            candidate = rest[..end].trim();
        }
    }

    // 2. Drop anything before the first document tag
    let tag_start = ["<!DOCTYPE", "<!doctype", "<html", "<HTML"]
        .iter()
        .filter_map(|tag| candidate.find(tag))
        .min();

    match tag_start {
        Some(idx) => candidate[idx..].trim().to_string(),
        None => candidate.to_string(),
    }
}

/// Compose the newsletter from the summary records with a single LLM call,
/// then persist it (timestamped history copy + latest pointer).
///
/// Runs even for an empty record list so the digest for a quiet day still
/// exists. Any provider error is fatal for the run.
pub async fn compose_newsletter<P: LlmProvider + ?Sized>(
    provider: &P,
    summaries: &[ArticleSummary],
    max_tokens: usize,
    temperature: f32,
    storage: &Storage,
) -> Result<ComposedNewsletter> {
    let records: Vec<SummaryRecord> = summaries.iter().map(ArticleSummary::to_record).collect();
    let articles_json = serde_json::to_string_pretty(&records)?;

    info!(summaries = summaries.len(), "composing newsletter");

    let request = LlmRequest {
        prompt: newsletter_prompt(&articles_json),
        max_tokens: Some(max_tokens),
        temperature: Some(temperature),
        timeout_seconds: None,
    };

    let response = provider
        .generate(request)
        .await
        .map_err(|e| Error::Generation(format!("newsletter completion failed: {}", e)))?;

    let html = extract_html(&response.content);
    if html.is_empty() {
        return Err(Error::Generation("model returned an empty newsletter".to_string()));
    }

    let (latest, history) = storage.write_newsletter(&html).await?;
    info!(
        latest = %latest.display(),
        history = %history.display(),
        bytes = html.len(),
        "newsletter written"
    );

    Ok(ComposedNewsletter { html, path: latest })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::{LlmResponse, UsageMetadata};
    use crate::summarize::SummaryOutcome;
    use common::StorageConfig;
    use std::path::Path;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const MINIMAL_HTML: &str = "<html><body><h1>AI Newsletter Digest</h1></body></html>";

    struct CountingProvider {
        calls: AtomicUsize,
        reply: &'static str,
    }

    impl CountingProvider {
        fn replying(reply: &'static str) -> Self {
            Self {
                calls: AtomicUsize::new(0),
                reply,
            }
        }
    }

    #[async_trait::async_trait]
    impl LlmProvider for CountingProvider {
        async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(LlmResponse {
                content: self.reply.to_string(),
                usage: UsageMetadata::default(),
                model: "test".to_string(),
            })
        }
    }

    struct FailingProvider;

    #[async_trait::async_trait]
    impl LlmProvider for FailingProvider {
        async fn generate(&self, _request: LlmRequest) -> Result<LlmResponse> {
            Err(Error::NoCompletion)
        }
    }

    fn storage_in(dir: &Path) -> Storage {
        Storage::new(&StorageConfig {
            data_dir: Some(dir.to_string_lossy().to_string()),
        })
    }

    fn summary(title: &str) -> ArticleSummary {
        ArticleSummary {
            title: title.to_string(),
            url: Some("https://example.com/a".to_string()),
            outcome: SummaryOutcome::Generated("A summary.".to_string()),
        }
    }

    #[test]
    fn prompt_embeds_records_and_closing_phrase() {
        let prompt = newsletter_prompt(r#"[{"title": "T", "summary": "S", "url": null}]"#);
        assert!(prompt.contains(CLOSING_PHRASE));
        assert!(prompt.contains("ARTICLES JSON:"));
        assert!(prompt.contains(r#""title": "T""#));
        assert!(prompt.contains("starting with the <html> tag"));
    }

    #[test]
    fn extract_html_unwraps_fences() {
        let fenced = format!("```html\n{}\n```", MINIMAL_HTML);
        assert_eq!(extract_html(&fenced), MINIMAL_HTML);

        let bare_fence = format!("```\n{}\n```", MINIMAL_HTML);
        assert_eq!(extract_html(&bare_fence), MINIMAL_HTML);
    }

    #[test]
    fn extract_html_drops_preamble() {
        let chatty = format!("Sure! Here is your newsletter:\n\n{}", MINIMAL_HTML);
        assert_eq!(extract_html(&chatty), MINIMAL_HTML);

        let doctype = "<!DOCTYPE html><html><body></body></html>";
        assert_eq!(extract_html(&format!("intro {}", doctype)), doctype);
    }

    #[test]
    fn extract_html_passes_clean_input_through() {
        assert_eq!(extract_html(MINIMAL_HTML), MINIMAL_HTML);
        // no recognizable tag: keep the trimmed text as-is
        assert_eq!(extract_html("  plain text  "), "plain text");
    }

    #[tokio::test]
    async fn empty_summary_list_still_composes_once() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = storage_in(dir.path());
        storage.ensure_layout().await.expect("layout");

        let provider = CountingProvider::replying(MINIMAL_HTML);
        let composed = compose_newsletter(&provider, &[], 2500, 0.7, &storage)
            .await
            .expect("compose succeeds");

        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(composed.html, MINIMAL_HTML);
        assert_eq!(
            storage.read_latest_newsletter().await.expect("persisted"),
            MINIMAL_HTML
        );
    }

    #[tokio::test]
    async fn provider_error_is_fatal_for_compose() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = storage_in(dir.path());
        storage.ensure_layout().await.expect("layout");

        let err = compose_newsletter(&FailingProvider, &[summary("T")], 2500, 0.7, &storage)
            .await
            .expect_err("compose fails");
        assert!(matches!(err, Error::Generation(_)));
        assert!(err.to_string().contains("newsletter completion failed"));
    }

    #[tokio::test]
    async fn empty_completion_is_rejected() {
        let dir = tempfile::tempdir().expect("tempdir");
        let storage = storage_in(dir.path());
        storage.ensure_layout().await.expect("layout");

        let provider = CountingProvider::replying("   ");
        let err = compose_newsletter(&provider, &[summary("T")], 2500, 0.7, &storage)
            .await
            .expect_err("empty output rejected");
        assert!(matches!(err, Error::Generation(_)));
        assert!(err.to_string().contains("empty newsletter"));
    }
}
