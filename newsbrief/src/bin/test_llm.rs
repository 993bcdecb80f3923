use newsbrief::llm::remote::RemoteLlmProvider;
use newsbrief::llm::{LlmProvider, LlmRequest};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    dotenv::dotenv().ok();

    let api_key = std::env::var("OPENROUTER_API_KEY")
        .or_else(|_| std::env::var("OPENAI_API_KEY"))
        .expect("Set OPENROUTER_API_KEY or OPENAI_API_KEY environment variable");

    // Allow custom base URL or use OpenRouter default
    let base_url = std::env::var("LLM_BASE_URL")
        .unwrap_or_else(|_| "https://openrouter.ai/api/v1/chat/completions".to_string());

    let model = std::env::var("LLM_MODEL")
        .unwrap_or_else(|_| "meta-llama/llama-3-8b-instruct".to_string());

    println!("\n{}", "=".repeat(60));
    println!("Testing LLM Provider");
    println!("Base URL: {}", base_url);
    println!("Model: {}", model);
    println!("{}", "=".repeat(60));

    let provider = RemoteLlmProvider::new(&base_url, &api_key, &model).with_defaults(30, 256, 0.7);

    // Test 1: Plain completion
    println!("\n[Test 1] Plain completion...");
    let request = LlmRequest {
        prompt: "Reply with the single word: ready".to_string(),
        max_tokens: Some(16),
        temperature: Some(0.0),
        timeout_seconds: None,
    };
    match provider.generate(request).await {
        Ok(response) => {
            println!("✓ Success!");
            println!("  Model: {}", response.model);
            println!("  Content: {}", response.content.trim());
            println!(
                "  Usage: {} tokens (prompt: {}, completion: {})",
                response.usage.total_tokens,
                response.usage.prompt_tokens,
                response.usage.completion_tokens
            );
        }
        Err(e) => {
            eprintln!("✗ Failed: {}", e);
        }
    }

    // Test 2: Summary-style prompt
    let test_article = r#"
Rust is a systems programming language that runs blazingly fast, prevents
segfaults, and guarantees thread safety. It accomplishes these goals through
a unique ownership system that enforces memory safety without requiring a
garbage collector.

Many companies are adopting Rust for critical infrastructure, including
Mozilla, Dropbox, and Microsoft. The language's performance and safety
guarantees make it ideal for operating systems, web servers, and embedded systems.
    "#;

    println!("\n[Test 2] Summary-style prompt...");
    let request = LlmRequest {
        prompt: format!(
            "Summarize the following news article in about 2-3 sentences.\n\n{}",
            test_article
        ),
        max_tokens: Some(256),
        temperature: Some(0.7),
        timeout_seconds: None,
    };
    match provider.generate(request).await {
        Ok(response) => {
            println!("✓ Success!");
            println!("  Summary: {}", response.content.trim());
            println!("  Tokens: {}", response.usage.total_tokens);
        }
        Err(e) => {
            eprintln!("✗ Failed: {}", e);
        }
    }

    println!("\n{}", "=".repeat(60));
    println!("Tests completed");
    println!("{}", "=".repeat(60));
}
