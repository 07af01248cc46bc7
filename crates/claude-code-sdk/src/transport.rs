use async_trait::async_trait;
use futures::stream::{self, Stream};
use serde_json::Value;

use crate::Result;

/// A source of raw stream-json values.
///
/// [`crate::process::SubprocessCliTransport`] is the only production
/// implementation; the seam exists so the query driver can be exercised
/// without a real CLI.
#[async_trait]
pub trait Transport: Send {
    /// Start the underlying process. A no-op when already connected.
    async fn connect(&mut self) -> Result<()>;

    /// Stop the underlying process if it is still running and release every
    /// handle. Idempotent, and synchronous so it can run from `Drop`.
    fn disconnect(&mut self);

    /// The next decoded value, or `Ok(None)` once output is exhausted.
    async fn next_message(&mut self) -> Result<Option<Value>>;

    fn is_connected(&self) -> bool;

    /// Adapt [`Transport::next_message`] into a stream that ends after the
    /// first error.
    fn receive_messages(&mut self) -> impl Stream<Item = Result<Value>> + Send + '_
    where
        Self: Sized,
    {
        stream::unfold(Some(self), |transport| async move {
            let transport = transport?;
            match transport.next_message().await {
                Ok(Some(value)) => Some((Ok(value), Some(transport))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
