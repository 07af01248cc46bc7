use std::ops::{Deref, DerefMut};
use std::pin::Pin;
use std::task::{Context, Poll};

use futures::stream::{self, BoxStream, Stream};

use crate::parse::parse_message;
use crate::transport::Transport;
use crate::types::Message;
use crate::Result;

// ─── QueryStream ──────────────────────────────────────────────────────────

/// An async stream of [`Message`]s from one Claude subprocess.
///
/// Messages are yielded as soon as each stdout line is translated, so the
/// first one is available while the CLI is still working. The stream ends
/// after the last message or after the first error. Dropping it early
/// terminates the subprocess.
///
/// ```rust,ignore
/// use claude_code_sdk::{query, Message, QueryOptions};
/// use futures::StreamExt;
///
/// let mut stream = query("say hello", QueryOptions::default());
/// while let Some(msg) = stream.next().await {
///     if let Message::Result(r) = msg? {
///         println!("result: {:?}", r.result_text());
///     }
/// }
/// ```
pub struct QueryStream {
    inner: BoxStream<'static, Result<Message>>,
}

impl QueryStream {
    /// Drive `transport` from connect to exhaustion.
    pub(crate) fn new<T: Transport + 'static>(transport: T) -> Self {
        let guard = DisconnectGuard::new(transport);
        let inner = stream::unfold(Some((guard, false)), |state| async move {
            let (mut transport, connected) = state?;

            if !connected {
                if let Err(e) = transport.connect().await {
                    transport.disconnect();
                    return Some((Err(e), None));
                }
            }

            loop {
                match transport.next_message().await {
                    Ok(Some(raw)) => match parse_message(&raw) {
                        Some(msg) => return Some((Ok(msg), Some((transport, true)))),
                        None => {
                            tracing::debug!(kind = ?raw.get("type"), "dropping untranslatable message");
                        }
                    },
                    Ok(None) => {
                        transport.disconnect();
                        return None;
                    }
                    Err(e) => {
                        transport.disconnect();
                        return Some((Err(e), None));
                    }
                }
            }
        });
        QueryStream {
            inner: Box::pin(inner),
        }
    }

    /// A stream that yields `err` and ends. Used when the transport cannot
    /// even be built (no binary found).
    pub(crate) fn failed(err: crate::ClaudeSdkError) -> Self {
        QueryStream {
            inner: Box::pin(stream::once(async move { Err(err) })),
        }
    }
}

impl Stream for QueryStream {
    type Item = Result<Message>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

// ─── DisconnectGuard ──────────────────────────────────────────────────────

/// Owns a transport and disconnects it exactly once: explicitly on normal
/// end or error, or from `Drop` when the stream is abandoned.
struct DisconnectGuard<T: Transport> {
    transport: T,
    disconnected: bool,
}

impl<T: Transport> DisconnectGuard<T> {
    fn new(transport: T) -> Self {
        DisconnectGuard {
            transport,
            disconnected: false,
        }
    }

    fn disconnect(&mut self) {
        if !self.disconnected {
            self.disconnected = true;
            self.transport.disconnect();
        }
    }
}

impl<T: Transport> Deref for DisconnectGuard<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> DerefMut for DisconnectGuard<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.transport
    }
}

impl<T: Transport> Drop for DisconnectGuard<T> {
    fn drop(&mut self) {
        if !self.disconnected {
            tracing::debug!("query stream dropped early, disconnecting");
        }
        self.disconnect();
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────
