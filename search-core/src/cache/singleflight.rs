//! Per-fingerprint request coalescing.
//!
//! When two concurrent requests miss the result cache for the same
//! fingerprint, only the first actually executes the pipeline; the rest wait
//! on its outcome. This is distinct from and sits in front of
//! [`crate::store::ResultCache`], which persists the result afterward.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::broadcast;

use crate::error::{Error, Result};
use crate::fingerprint::Fingerprint;
use crate::types::SearchResponse;

enum Slot {
    InFlight(broadcast::Sender<Result<SearchResponse>>),
}

/// Coalesces concurrent cache-miss fills for identical fingerprints.
#[derive(Default)]
pub struct SingleFlight {
    inflight: Mutex<HashMap<Fingerprint, Slot>>,
}

impl SingleFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `produce` for `key`, ensuring only one concurrent caller per key
    /// actually executes it. Other callers for the same key receive a clone
    /// of its result.
    pub async fn run<F, Fut>(&self, key: Fingerprint, produce: F) -> Result<SearchResponse>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<SearchResponse>>,
    {
        let mut receiver = {
            let mut inflight = self.inflight.lock();
            match inflight.get(&key) {
                Some(Slot::InFlight(tx)) => Some(tx.subscribe()),
                None => {
                    let (tx, _rx) = broadcast::channel(1);
                    inflight.insert(key, Slot::InFlight(tx));
                    None
                }
            }
        };

        if let Some(rx) = receiver.take() {
            return wait_for_result(rx).await;
        }

        let result = produce().await;

        let tx = {
            let mut inflight = self.inflight.lock();
            match inflight.remove(&key) {
                Some(Slot::InFlight(tx)) => tx,
                None => return result,
            }
        };

        // Ignore send errors: no other caller was waiting.
        let _ = tx.send(result.clone());
        result
    }

    /// Like [`Self::run`], but `produce` executes on a detached `tokio`
    /// task: if the calling future is dropped (the caller's deadline
    /// elapsed), the fill still completes and peers still see its result
    /// (spec §4.5 cancellation semantics — "the single-flight peer outlives
    /// its initiator").
    pub async fn run_detached<F, Fut>(self: &Arc<Self>, key: Fingerprint, produce: F) -> Result<SearchResponse>
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = Result<SearchResponse>> + Send + 'static,
    {
        let mut receiver = {
            let mut inflight = self.inflight.lock();
            match inflight.get(&key) {
                Some(Slot::InFlight(tx)) => Some(tx.subscribe()),
                None => {
                    let (tx, _rx) = broadcast::channel(1);
                    inflight.insert(key, Slot::InFlight(tx));
                    None
                }
            }
        };

        if receiver.is_none() {
            let this = self.clone();
            let leader_rx = {
                let inflight = self.inflight.lock();
                match inflight.get(&key) {
                    Some(Slot::InFlight(tx)) => tx.subscribe(),
                    None => unreachable!("slot just inserted by this caller"),
                }
            };
            tokio::spawn(async move {
                let result = produce().await;
                let tx = {
                    let mut inflight = this.inflight.lock();
                    match inflight.remove(&key) {
                        Some(Slot::InFlight(tx)) => tx,
                        None => return,
                    }
                };
                let _ = tx.send(result);
            });
            receiver = Some(leader_rx);
        }

        wait_for_result(receiver.expect("receiver is always populated above")).await
    }
}

async fn wait_for_result(
    mut rx: broadcast::Receiver<Result<SearchResponse>>,
) -> Result<SearchResponse> {
    match rx.recv().await {
        Ok(result) => result,
        Err(_) => Err(Error::Cancelled),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Duration;

    use crate::types::filters::Filters;
    use crate::types::request::SearchType;

    fn sample_key() -> Fingerprint {
        Fingerprint::compute("boots", &Filters::default(), 1, 25, SearchType::Semantic)
    }

    fn sample_response() -> SearchResponse {
        use crate::types::response::*;
        SearchResponse {
            results: vec![],
            pagination: Pagination::new(1, 25, 0),
            filters: AppliedFilters {
                min_price: None,
                max_price: None,
                store_scope: None,
                similarity_threshold: 0.5,
            },
            facets: Facets::default(),
            metadata: ResponseMetadata {
                cache_hit: false,
                fallback_used: false,
                applied_strategies: vec![],
                search_type: SearchType::Semantic,
                result_count: 0,
            },
        }
    }

    #[tokio::test]
    async fn concurrent_calls_for_same_key_execute_once() {
        let flight = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicU32::new(0));
        let key = sample_key();

        let mut handles = vec![];
        for _ in 0..8 {
            let flight = flight.clone();
            let calls = calls.clone();
            handles.push(tokio::spawn(async move {
                flight
                    .run(key, || async {
                        calls.fetch_add(1, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(20)).await;
                        Ok(sample_response())
                    })
                    .await
            }));
        }

        for h in handles {
            h.await.unwrap().unwrap();
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn detached_fill_survives_caller_cancellation() {
        let flight = Arc::new(SingleFlight::new());
        let calls = Arc::new(AtomicU32::new(0));
        let key = sample_key();

        let flight_clone = flight.clone();
        let calls_clone = calls.clone();
        let leader = tokio::spawn(async move {
            flight_clone
                .run_detached(key, move || async move {
                    calls_clone.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(sample_response())
                })
                .await
        });

        // Cancel the leader almost immediately; the spawned fill keeps running.
        tokio::time::sleep(Duration::from_millis(5)).await;
        leader.abort();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn distinct_keys_execute_independently() {
        let flight = SingleFlight::new();
        let calls = AtomicU32::new(0);

        let r1 = flight
            .run(sample_key(), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(sample_response())
            })
            .await;
        assert!(r1.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
