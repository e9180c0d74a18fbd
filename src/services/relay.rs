//! Backpressure-aware relay of an upstream byte stream into a response body.
//!
//! ```text
//!  upstream chunks          bounded mpsc (N chunks)          response body
//! ┌───────────────┐  next  ┌──────────────────────┐  recv  ┌─────────────┐
//! │ reqwest body  │ ─────▶ │     relay task       │ ─────▶ │ axum::Body  │
//! └───────────────┘        └──────────────────────┘        └─────────────┘
//!         ▲                         │  Sender::closed()            │
//!         └────── dropped ◀─────────┴────────── body dropped ◀─────┘
//! ```
//!
//! The relay never reads more than the channel capacity ahead of the caller.
//! When the caller disconnects the server drops the body, the receiver goes
//! away, and the relay stops reading upstream on its next await point. Both
//! sides are bounded by the idle timeout: an upstream that stops sending and a
//! caller that stops reading each end the relay.
//!
//! Once response headers are sent the status can no longer change. A failure
//! after that point is pushed into the body as an `io::Error`, which makes the
//! server cut the connection so the caller sees a truncated transfer rather
//! than a clean end of body. One channel slot is reserved up front for that
//! error, so it can be delivered even when the channel is full.

use std::fmt::Display;
use std::io;
use std::time::Duration;

use axum::body::Body;
use bytes::Bytes;
use futures_util::{Stream, StreamExt};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::task::TaskTracker;
use tracing::{Instrument, Span, debug, error, warn};

use crate::metrics;

/// Item type carried from the relay task to the response body.
pub type BodyChunk = Result<Bytes, io::Error>;

/// Failure after the response was committed.
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("upstream body failed: {0}")]
    Upstream(String),

    #[error("upstream sent no data for {}s", .0.as_secs())]
    Idle(Duration),

    #[error("caller read no data for {}s", .0.as_secs())]
    CallerStalled(Duration),
}

/// How a relay ended.
#[derive(Debug)]
pub enum RelayOutcome {
    /// Upstream finished and every byte was handed to the caller.
    Completed { bytes: u64 },
    /// The caller went away; upstream reading stopped.
    ClientGone { bytes: u64 },
    /// Upstream or caller stalled or failed mid-stream; the response was terminated.
    Aborted { bytes: u64, error: RelayError },
}

impl RelayOutcome {
    /// Bytes handed to the response body.
    pub fn bytes(&self) -> u64 {
        match self {
            RelayOutcome::Completed { bytes }
            | RelayOutcome::ClientGone { bytes }
            | RelayOutcome::Aborted { bytes, .. } => *bytes,
        }
    }

    /// Metric label.
    pub fn label(&self) -> &'static str {
        match self {
            RelayOutcome::Completed { .. } => "completed",
            RelayOutcome::ClientGone { .. } => "client_gone",
            RelayOutcome::Aborted { .. } => "aborted",
        }
    }
}

/// Copy `source` into `sink` until one side ends.
///
/// - every chunk is forwarded in upstream order
/// - `sink.send` waits while the channel is full (backpressure), at most
///   `idle_timeout`
/// - the wait for each upstream chunk is raced against `sink.closed()` and
///   bounded by `idle_timeout`
///
/// One slot of `sink` stays reserved for the terminating error, so the data
/// window is one chunk smaller than the channel capacity.
pub async fn relay<S, E>(source: S, sink: mpsc::Sender<BodyChunk>, idle_timeout: Duration) -> RelayOutcome
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    let mut source = std::pin::pin!(source);
    let mut bytes = 0u64;

    let Ok(error_slot) = sink.clone().reserve_owned().await else {
        return RelayOutcome::ClientGone { bytes };
    };

    loop {
        let next = tokio::select! {
            biased;

            _ = sink.closed() => return RelayOutcome::ClientGone { bytes },
            next = timeout(idle_timeout, source.next()) => next,
        };

        let chunk = match next {
            Ok(Some(Ok(chunk))) => chunk,
            Ok(None) => return RelayOutcome::Completed { bytes },
            Ok(Some(Err(e))) => return abort(error_slot, bytes, RelayError::Upstream(e.to_string())),
            Err(_) => return abort(error_slot, bytes, RelayError::Idle(idle_timeout)),
        };

        if chunk.is_empty() {
            continue;
        }

        let len = chunk.len() as u64;
        match timeout(idle_timeout, sink.send(Ok(chunk))).await {
            Ok(Ok(())) => bytes += len,
            Ok(Err(_)) => return RelayOutcome::ClientGone { bytes },
            Err(_) => return abort(error_slot, bytes, RelayError::CallerStalled(idle_timeout)),
        }
    }
}

fn abort(slot: mpsc::OwnedPermit<BodyChunk>, bytes: u64, error: RelayError) -> RelayOutcome {
    let _ = slot.send(Err(io::Error::other(error.to_string())));
    RelayOutcome::Aborted { bytes, error }
}

/// Response body fed by the receiving half of a relay channel.
pub fn channel_body(rx: mpsc::Receiver<BodyChunk>) -> Body {
    let stream = futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    });
    Body::from_stream(stream)
}

/// Start relaying `source` on a tracked task and return the body to send.
///
/// The task inherits the current span; its outcome is logged and counted
/// when it ends.
pub fn spawn_relay<S, E>(
    tracker: &TaskTracker,
    source: S,
    capacity: usize,
    idle_timeout: Duration,
) -> Body
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: Display + Send + 'static,
{
    // +1 for the slot the relay reserves for a terminating error.
    let (tx, rx) = mpsc::channel(capacity.max(1) + 1);

    let task = async move {
        let outcome = relay(source, tx, idle_timeout).await;
        metrics::record_relay(outcome.label(), outcome.bytes());

        match &outcome {
            RelayOutcome::Completed { bytes } => debug!(bytes, "Image relay completed"),
            RelayOutcome::ClientGone { bytes } => {
                warn!(bytes, "Caller disconnected during image relay, upstream read stopped")
            }
            RelayOutcome::Aborted { bytes, error } => {
                error!(bytes, error = %error, "Image relay aborted after headers were sent")
            }
        }
    };
    tracker.spawn(task.instrument(Span::current()));

    channel_body(rx)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures_util::stream;

    use super::*;

    const IDLE: Duration = Duration::from_secs(5);

    fn ok_chunks(parts: &[&'static [u8]]) -> Vec<Result<Bytes, String>> {
        parts.iter().map(|p| Ok(Bytes::from_static(p))).collect()
    }

    async fn drain(mut rx: mpsc::Receiver<BodyChunk>) -> (Vec<u8>, Option<io::Error>) {
        let mut data = Vec::new();
        while let Some(chunk) = rx.recv().await {
            match chunk {
                Ok(bytes) => data.extend_from_slice(&bytes),
                Err(e) => return (data, Some(e)),
            }
        }
        (data, None)
    }

    #[tokio::test]
    async fn test_relay_preserves_bytes_and_order() {
        let (tx, rx) = mpsc::channel(2);
        let source = stream::iter(ok_chunks(&[&[0xFF, 0xD8], b"", &[1, 2, 3], &[4], &[0xFF, 0xD9]]));

        let relay = tokio::spawn(relay(source, tx, IDLE));
        let (data, err) = drain(rx).await;
        let outcome = relay.await.unwrap();

        assert_eq!(data, vec![0xFF, 0xD8, 1, 2, 3, 4, 0xFF, 0xD9]);
        assert!(err.is_none());
        assert!(matches!(outcome, RelayOutcome::Completed { bytes: 8 }));
    }

    #[tokio::test]
    async fn test_relay_empty_source_completes() {
        let (tx, rx) = mpsc::channel(1);
        let source = stream::iter(ok_chunks(&[]));

        let outcome = relay(source, tx, IDLE).await;
        let (data, err) = drain(rx).await;

        assert!(matches!(outcome, RelayOutcome::Completed { bytes: 0 }));
        assert!(data.is_empty());
        assert!(err.is_none());
    }

    #[tokio::test]
    async fn test_relay_mid_stream_failure_terminates_body() {
        let (tx, rx) = mpsc::channel(4);
        let source = stream::iter(vec![
            Ok(Bytes::from_static(b"head")),
            Err("connection reset by peer".to_string()),
            Ok(Bytes::from_static(b"tail")),
        ]);

        let outcome = relay(source, tx, IDLE).await;
        let (data, err) = drain(rx).await;

        assert_eq!(data, b"head");
        assert!(err.unwrap().to_string().contains("connection reset"));
        match outcome {
            RelayOutcome::Aborted { bytes, error } => {
                assert_eq!(bytes, 4);
                assert!(matches!(error, RelayError::Upstream(_)));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_relay_idle_upstream_aborts() {
        let (tx, rx) = mpsc::channel(4);
        let source = stream::iter(ok_chunks(&[b"partial"])).chain(stream::pending());

        let outcome = relay(source, tx, Duration::from_millis(50)).await;
        let (data, err) = drain(rx).await;

        assert_eq!(data, b"partial");
        assert!(err.is_some());
        assert!(matches!(
            outcome,
            RelayOutcome::Aborted {
                bytes: 7,
                error: RelayError::Idle(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_relay_stops_when_caller_disconnects_while_waiting_upstream() {
        let (tx, rx) = mpsc::channel(4);
        drop(rx);

        let outcome = relay(stream::pending::<Result<Bytes, String>>(), tx, IDLE).await;
        assert!(matches!(outcome, RelayOutcome::ClientGone { bytes: 0 }));
    }

    #[tokio::test]
    async fn test_relay_stops_reading_endless_upstream_after_disconnect() {
        let (tx, mut rx) = mpsc::channel(2);
        let source = stream::repeat_with(|| Ok::<_, String>(Bytes::from_static(b"chunk")));

        let relay = tokio::spawn(relay(source, tx, IDLE));
        assert!(rx.recv().await.is_some());
        drop(rx);

        let outcome = tokio::time::timeout(Duration::from_secs(5), relay)
            .await
            .expect("relay should stop after the caller disconnects")
            .unwrap();
        assert!(matches!(outcome, RelayOutcome::ClientGone { .. }));
    }

    #[tokio::test]
    async fn test_relay_applies_backpressure() {
        let pulled = Arc::new(AtomicUsize::new(0));
        let counter = pulled.clone();
        let source = stream::repeat_with(|| Ok::<_, String>(Bytes::from_static(b"x"))).map(move |c| {
            counter.fetch_add(1, Ordering::SeqCst);
            c
        });

        // One slot is reserved for errors, leaving a data window of one chunk.
        let (tx, rx) = mpsc::channel(2);
        let relay = tokio::spawn(relay(source, tx, IDLE));

        tokio::time::sleep(Duration::from_millis(100)).await;
        // One chunk sits in the channel, one waits in `send`; nothing more is read.
        assert!(pulled.load(Ordering::SeqCst) <= 2);

        drop(rx);
        let outcome = relay.await.unwrap();
        assert!(matches!(outcome, RelayOutcome::ClientGone { bytes: 1 }));
    }

    #[tokio::test]
    async fn test_relay_gives_up_on_caller_that_stops_reading() {
        let (tx, rx) = mpsc::channel(2);
        let source = stream::repeat_with(|| Ok::<_, String>(Bytes::from_static(b"chunk")));

        // The receiver stays alive but is never read.
        let outcome = tokio::time::timeout(
            Duration::from_secs(5),
            relay(source, tx, Duration::from_millis(50)),
        )
        .await
        .expect("relay should not wait on a stalled caller forever");

        match outcome {
            RelayOutcome::Aborted { bytes, error } => {
                assert_eq!(bytes, 5);
                assert!(matches!(error, RelayError::CallerStalled(_)));
            }
            other => panic!("unexpected outcome: {other:?}"),
        }

        // A caller that resumes sees the buffered chunk, then the error.
        let (data, err) = drain(rx).await;
        assert_eq!(data, b"chunk");
        assert!(err.unwrap().to_string().contains("caller read no data"));
    }

    #[tokio::test]
    async fn test_spawn_relay_body_collects_all_bytes() {
        let tracker = TaskTracker::new();
        let payload: Vec<u8> = (0..=255u8).cycle().take(64 * 1024).collect();
        let chunks: Vec<Result<Bytes, String>> = payload
            .chunks(1000)
            .map(|c| Ok(Bytes::copy_from_slice(c)))
            .collect();

        let body = spawn_relay(&tracker, stream::iter(chunks), 2, IDLE);
        let collected = axum::body::to_bytes(body, usize::MAX).await.unwrap();

        tracker.close();
        tracker.wait().await;
        assert_eq!(collected.as_ref(), payload.as_slice());
    }

    #[tokio::test]
    async fn test_spawn_relay_body_errors_on_upstream_failure() {
        let tracker = TaskTracker::new();
        let source = stream::iter(vec![
            Ok(Bytes::from_static(b"abc")),
            Err("boom".to_string()),
        ]);

        let body = spawn_relay(&tracker, source, 2, IDLE);
        assert!(axum::body::to_bytes(body, usize::MAX).await.is_err());
    }

    #[test]
    fn test_outcome_labels() {
        assert_eq!(RelayOutcome::Completed { bytes: 1 }.label(), "completed");
        assert_eq!(RelayOutcome::ClientGone { bytes: 2 }.bytes(), 2);
        let aborted = RelayOutcome::Aborted {
            bytes: 3,
            error: RelayError::Idle(Duration::from_secs(30)),
        };
        assert_eq!(aborted.label(), "aborted");
        assert_eq!(aborted.bytes(), 3);
    }
}
