//! Ask Claude a few questions through the local `claude` CLI.
//!
//! ```sh
//! RUST_LOG=claude_code_sdk=debug cargo run -p claude-code-sdk --example quick_start
//! ```

use claude_code_sdk::{query, ContentBlock, Message, QueryOptions};
use futures::StreamExt;

async fn run(title: &str, prompt: &str, opts: QueryOptions) -> anyhow::Result<()> {
    println!("=== {title} ===");

    let mut stream = query(prompt, opts);
    while let Some(msg) = stream.next().await {
        match msg? {
            Message::Assistant(assistant) => {
                for block in &assistant.content {
                    if let ContentBlock::Text { text } = block {
                        println!("Claude: {text}");
                    }
                }
            }
            Message::Result(result) => {
                if let Some(cost) = result.total_cost_usd.filter(|c| *c > 0.0) {
                    println!("\nCost: ${cost:.4}");
                }
            }
            _ => {}
        }
    }
    println!();
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    run("Basic Example", "What is 2 + 2?", QueryOptions::default()).await?;

    run(
        "With Options Example",
        "Explain what Rust is in one sentence.",
        QueryOptions {
            system_prompt: Some("You are a helpful assistant that explains things simply.".into()),
            max_turns: Some(1),
            ..Default::default()
        },
    )
    .await?;

    run(
        "With Tools Example",
        "Create a file called hello.txt with 'Hello, World!' in it",
        QueryOptions {
            allowed_tools: vec!["Read".into(), "Write".into()],
            system_prompt: Some("You are a helpful file assistant.".into()),
            ..Default::default()
        },
    )
    .await?;

    Ok(())
}
