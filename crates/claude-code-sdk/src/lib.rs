//! `claude-code-sdk` — drive the Claude Code CLI from Rust.
//!
//! Spawns `claude --output-format stream-json --verbose … --print <prompt>`,
//! reads newline-delimited JSON from its stdout and hands back a stream of
//! typed [`Message`]s.
//!
//! # Architecture
//!
//! ```text
//! QueryOptions
//!     │
//!     ▼
//! build_command          ← options → argv, fixed flag order
//!     │
//!     ▼
//! SubprocessCliTransport ← locates + spawns `claude`, reads JSONL from
//!     │                     stdout, drains stderr, checks the exit code
//!     ▼
//! parse_message          ← raw serde_json::Value → Message (or dropped)
//!     │
//!     ▼
//! QueryStream            ← futures::Stream<Item = Result<Message>>;
//!                           disconnects on end, error or drop
//! ```
//!
//! # Quick start
//!
//! ```rust,ignore
//! use claude_code_sdk::{query, Message, QueryOptions};
//! use futures::StreamExt;
//!
//! let opts = QueryOptions {
//!     max_turns: Some(1),
//!     ..Default::default()
//! };
//!
//! let mut stream = query("What is 2 + 2?", opts);
//! while let Some(msg) = stream.next().await {
//!     match msg? {
//!         Message::Assistant(a) => println!("{}", a.text()),
//!         Message::Result(r) => println!("cost: {:?}", r.total_cost_usd),
//!         _ => {}
//!     }
//! }
//! ```

pub mod command;
pub mod error;
pub mod events;
pub mod locate;
pub mod parse;
pub mod process;
pub mod stream;
pub mod transport;
pub mod types;

#[cfg(all(test, unix))]
mod test_support;

pub use command::build_command;
pub use error::ClaudeSdkError;
pub use events::{subscribe, EventHandle, QueryEvent};
pub use locate::CliLocator;
pub use parse::parse_message;
pub use process::SubprocessCliTransport;
pub use stream::QueryStream;
pub use transport::Transport;
pub use types::{
    AssistantMessage, ContentBlock, McpServerConfig, Message, PermissionMode, QueryOptions,
    ResultMessage, SystemMessage, ToolResultContent, UserMessage,
};

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ClaudeSdkError>;

/// Run a single query against the Claude CLI.
///
/// Returns a [`QueryStream`] that yields [`Message`] values as they arrive
/// from the subprocess. If no `claude` binary can be found the stream yields
/// a single [`ClaudeSdkError::CliNotFound`] and ends.
///
/// # Example
///
/// ```rust,ignore
/// use claude_code_sdk::{query, QueryOptions};
/// use futures::StreamExt;
///
/// let stream = query("say hello", QueryOptions::default());
/// let messages: Vec<_> = stream.collect().await;
/// ```
pub fn query(prompt: impl Into<String>, opts: QueryOptions) -> QueryStream {
    match SubprocessCliTransport::new(prompt, opts) {
        Ok(transport) => QueryStream::new(transport),
        Err(e) => QueryStream::failed(e),
    }
}

/// Run a query over a caller-supplied [`Transport`].
pub fn query_with<T: Transport + 'static>(transport: T) -> QueryStream {
    QueryStream::new(transport)
}
