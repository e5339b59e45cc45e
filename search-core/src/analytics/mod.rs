//! Asynchronous analytics recording (spec C6).
//!
//! Serving latency must never depend on analytics I/O: `record` enqueues
//! onto a bounded channel and returns immediately, dropping the event (with
//! a counter increment) if the channel is full.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::store::AnalyticsStore;
use crate::types::analytics::AnalyticsEvent;

/// Counters exposed for operational visibility.
#[derive(Debug, Default)]
pub struct RecorderMetrics {
    enqueued: AtomicU64,
    dropped: AtomicU64,
    written: AtomicU64,
    write_failures: AtomicU64,
}

impl RecorderMetrics {
    #[must_use]
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn written(&self) -> u64 {
        self.written.load(Ordering::Relaxed)
    }
}

/// The producer handle given to the orchestrator. Cloning is cheap; all
/// clones share one channel and one writer pool.
#[derive(Clone)]
pub struct AnalyticsRecorder {
    sender: mpsc::Sender<AnalyticsEvent>,
    metrics: Arc<RecorderMetrics>,
}

impl AnalyticsRecorder {
    /// Spawn `worker_count` batching writers draining a channel of
    /// `buffer_size` capacity, and return the producer handle.
    #[must_use]
    pub fn spawn(
        store: Arc<dyn AnalyticsStore>,
        buffer_size: usize,
        worker_count: usize,
        batch_size: usize,
        batch_interval: Duration,
    ) -> Self {
        let (sender, receiver) = mpsc::channel(buffer_size);
        let metrics = Arc::new(RecorderMetrics::default());
        let receiver = Arc::new(tokio::sync::Mutex::new(receiver));

        for worker_id in 0..worker_count.max(1) {
            let store = store.clone();
            let metrics = metrics.clone();
            let receiver = receiver.clone();
            tokio::spawn(async move {
                run_writer(worker_id, receiver, store, metrics, batch_size, batch_interval).await;
            });
        }

        Self { sender, metrics }
    }

    /// Record one event. Never blocks the caller: on a full channel the
    /// event is dropped and the drop counter is incremented (spec §4.6).
    pub fn record(&self, mut event: AnalyticsEvent) {
        sanitize_defensively(&mut event);

        match self.sender.try_send(event) {
            Ok(()) => {
                self.metrics.enqueued.fetch_add(1, Ordering::Relaxed);
            }
            Err(_) => {
                self.metrics.dropped.fetch_add(1, Ordering::Relaxed);
                warn!("analytics buffer full, dropping event");
            }
        }
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<RecorderMetrics> {
        self.metrics.clone()
    }
}

/// Defensive anonymization: if `caller_ip` looks like a raw dotted-quad
/// IPv4 address, zero its low bits rather than trust that the boundary
/// already anonymized it (spec §4.6 privacy contract). `session_id` is not
/// touched here: it is an opaque client-rotated token, never a raw address.
fn sanitize_defensively(event: &mut AnalyticsEvent) {
    if looks_like_raw_ipv4(&event.caller_ip) {
        event.caller_ip = anonymize_ipv4(&event.caller_ip);
    }
}

fn looks_like_raw_ipv4(s: &str) -> bool {
    let parts: Vec<&str> = s.split('.').collect();
    parts.len() == 4 && parts.iter().all(|p| p.parse::<u8>().is_ok())
}

fn anonymize_ipv4(s: &str) -> String {
    let mut parts: Vec<&str> = s.split('.').collect();
    parts[3] = "0";
    parts.join(".")
}

async fn run_writer(
    worker_id: usize,
    receiver: Arc<tokio::sync::Mutex<mpsc::Receiver<AnalyticsEvent>>>,
    store: Arc<dyn AnalyticsStore>,
    metrics: Arc<RecorderMetrics>,
    batch_size: usize,
    batch_interval: Duration,
) {
    loop {
        let mut batch = Vec::with_capacity(batch_size);
        let deadline = tokio::time::sleep(batch_interval);
        tokio::pin!(deadline);

        loop {
            let mut guard = receiver.lock().await;
            tokio::select! {
                event = guard.recv() => {
                    drop(guard);
                    match event {
                        Some(event) => {
                            batch.push(event);
                            if batch.len() >= batch_size {
                                break;
                            }
                        }
                        None => return,
                    }
                }
                () = &mut deadline => {
                    drop(guard);
                    break;
                }
            }
        }

        if batch.is_empty() {
            continue;
        }

        debug!(worker_id, batch_len = batch.len(), "flushing analytics batch");
        for event in &batch {
            match store.record_event(event).await {
                Ok(()) => {
                    metrics.written.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    // Analytics failures are logged and swallowed (spec §7):
                    // they must never fail a user request.
                    metrics.write_failures.fetch_add(1, Ordering::Relaxed);
                    warn!(error = %e, "analytics write failed");
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_ipv4_looking_caller_ip_is_anonymized() {
        let mut event = sample_event("203.0.113.42");
        sanitize_defensively(&mut event);
        assert_eq!(event.caller_ip, "203.0.113.0");
    }

    #[test]
    fn opaque_caller_ip_is_left_untouched() {
        let mut event = sample_event("anon-abc123");
        sanitize_defensively(&mut event);
        assert_eq!(event.caller_ip, "anon-abc123");
    }

    fn sample_event(caller_ip: &str) -> AnalyticsEvent {
        AnalyticsEvent {
            event_id: uuid::Uuid::nil(),
            session_id: "sess-1".into(),
            caller_ip: caller_ip.to_string(),
            query: "boots".into(),
            query_hash: "abc".into(),
            search_type: crate::types::request::SearchType::Semantic,
            filters: crate::types::filters::Filters::default(),
            page: 1,
            limit: 25,
            user_agent: None,
            result_count: 1,
            cache_hit: false,
            applied_strategies: vec![],
            latency_ms: 1,
            clicked_external_id: None,
            category: None,
            primary_intent: "other".into(),
            avg_similarity: 0.0,
            timestamp: chrono::DateTime::<chrono::Utc>::UNIX_EPOCH,
        }
    }
}
