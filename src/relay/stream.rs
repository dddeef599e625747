//! Chunked pass-through of binary bodies.
//!
//! A pump task reads the upstream body and hands it to the response body over
//! a capacity-1 channel in chunks of at most `chunk_size` bytes, so at most a
//! couple of chunks are resident per request regardless of segment size.
//! Dropping the response body (client disconnect) closes the channel, which
//! stops the pump and drops the upstream response with it.

use axum::body::{Body, Bytes};
use futures_util::{Stream, StreamExt};
use std::io;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, warn};

/// Largest chunk handed downstream in one write
pub const RELAY_CHUNK_SIZE: usize = 8 * 1024;

type ChunkResult = Result<Bytes, io::Error>;

/// Build a response body that relays `upstream` chunk by chunk.
///
/// `idle_timeout` bounds the wait for each upstream chunk. An upstream error
/// or an idle timeout ends the body with an error so the client sees an
/// aborted transfer, never a silently truncated one.
pub fn relay_body<S, E>(upstream: S, chunk_size: usize, idle_timeout: Duration) -> Body
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::error::Error + Send + Sync + 'static,
{
    let (tx, rx) = mpsc::channel::<ChunkResult>(1);
    tokio::spawn(pump(upstream, tx, chunk_size.max(1), idle_timeout));
    Body::from_stream(ReceiverStream::new(rx))
}

async fn pump<S, E>(upstream: S, tx: mpsc::Sender<ChunkResult>, chunk_size: usize, idle_timeout: Duration)
where
    S: Stream<Item = Result<Bytes, E>> + Send,
    E: std::error::Error + Send + Sync + 'static,
{
    let mut upstream = std::pin::pin!(upstream);
    let mut relayed: u64 = 0;

    loop {
        let next = tokio::select! {
            _ = tx.closed() => {
                debug!("Client went away after {} bytes, abandoning upstream", relayed);
                return;
            }
            next = tokio::time::timeout(idle_timeout, upstream.next()) => next,
        };

        let mut bytes = match next {
            Ok(Some(Ok(bytes))) => bytes,
            Ok(None) => {
                debug!("Upstream body complete: {} bytes relayed", relayed);
                return;
            }
            Ok(Some(Err(e))) => {
                warn!("Upstream body failed after {} bytes: {}", relayed, e);
                let _ = tx.send(Err(io::Error::other(e))).await;
                return;
            }
            Err(_) => {
                warn!(
                    "Upstream body stalled for {}s after {} bytes",
                    idle_timeout.as_secs(),
                    relayed
                );
                let _ = tx
                    .send(Err(io::Error::new(io::ErrorKind::TimedOut, "upstream body stalled")))
                    .await;
                return;
            }
        };

        while !bytes.is_empty() {
            let chunk = bytes.split_to(chunk_size.min(bytes.len()));
            let len = chunk.len() as u64;
            if tx.send(Ok(chunk)).await.is_err() {
                debug!("Client went away after {} bytes, abandoning upstream", relayed);
                return;
            }
            relayed += len;
        }
    }
}
