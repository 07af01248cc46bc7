use futures::StreamExt;
use tokio::task::JoinHandle;

use crate::stream::QueryStream;
use crate::types::{Message, QueryOptions};
use crate::ClaudeSdkError;

/// One notification from [`subscribe`].
#[derive(Debug)]
pub enum QueryEvent {
    Message(Message),
    /// The query failed; no further events follow.
    Error(ClaudeSdkError),
    /// The stream finished normally.
    End,
}

/// Handle to a running subscription.
pub struct EventHandle {
    task: JoinHandle<()>,
}

impl EventHandle {
    /// Stop delivering events. The underlying stream is dropped, which
    /// terminates the subprocess; no `End` event is sent.
    pub fn abort(&self) {
        self.task.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Wait until the subscription has delivered its last event or was
    /// aborted.
    pub async fn finished(self) {
        let _ = self.task.await;
    }
}

/// Run a query on a background task and push its messages to `handler`.
///
/// Push-style counterpart of [`crate::query`]. Must be called from within a
/// Tokio runtime.
pub fn subscribe<F>(prompt: impl Into<String>, opts: QueryOptions, handler: F) -> EventHandle
where
    F: FnMut(QueryEvent) + Send + 'static,
{
    subscribe_stream(crate::query(prompt, opts), handler)
}

pub(crate) fn subscribe_stream<F>(mut stream: QueryStream, mut handler: F) -> EventHandle
where
    F: FnMut(QueryEvent) + Send + 'static,
{
    let task = tokio::spawn(async move {
        while let Some(item) = stream.next().await {
            match item {
                Ok(msg) => handler(QueryEvent::Message(msg)),
                Err(e) => {
                    handler(QueryEvent::Error(e));
                    return;
                }
            }
        }
        handler(QueryEvent::End);
    });
    EventHandle { task }
}
