use common::StorageConfig;
use newsbrief::fetch::NewsClient;
use newsbrief::storage::Storage;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    dotenv::dotenv().ok();

    let api_key = std::env::var("NEWS_API_KEY").expect("Set NEWS_API_KEY environment variable");

    // Test topics
    let topics = vec!["Artificial Intelligence", "Rust programming", "Space"];

    let storage = Storage::new(&StorageConfig {
        data_dir: Some("data".to_string()),
    });
    if let Err(e) = storage.ensure_layout().await {
        eprintln!("✗ Failed to prepare data directory: {}", e);
        return;
    }

    for topic in topics {
        println!("\n{}", "=".repeat(60));
        println!("Testing: {}", topic);
        println!("{}", "=".repeat(60));

        let client = match NewsClient::new("https://newsapi.org/v2/everything", &api_key, topic) {
            Ok(c) => c.with_params(5, "en", 15),
            Err(e) => {
                eprintln!("✗ Failed to build client: {}", e);
                continue;
            }
        };

        match client.fetch_articles(None, &storage).await {
            Ok(articles) => {
                println!("✓ Success!");
                println!("  Articles: {}", articles.len());

                if !articles.is_empty() {
                    println!("\n  First 3 articles:");
                    for (i, article) in articles.iter().take(3).enumerate() {
                        println!("    {}. {:?}", i + 1, article.title);
                        println!("       URL: {}", article.url.as_deref().unwrap_or("none"));
                        let desc_len = article.description.as_deref().map(str::len).unwrap_or(0);
                        let content_len = article.content.as_deref().map(str::len).unwrap_or(0);
                        println!(
                            "       Description: {} chars, Content: {} chars",
                            desc_len, content_len
                        );
                    }
                }
            }
            Err(e) => {
                println!("✗ Failed: {}", e);
            }
        }
    }
}
