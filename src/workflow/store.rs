// AdsFlow - pending operation storage
// The registry only talks to `PendingStore`; the in-memory map is the default
// backend and the only shared mutable state in the process.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::dry_run::PendingOperation;

#[async_trait]
pub trait PendingStore: Send + Sync {
    async fn insert(&self, op: PendingOperation);

    /// Remove and return the operation for `token`. Claiming is atomic: of two
    /// concurrent callers with the same token at most one gets `Some`.
    async fn take(&self, token: &str) -> Option<PendingOperation>;

    /// Drop every operation older than `ttl`; returns how many were dropped.
    async fn purge_expired(&self, ttl: Duration) -> usize;

    async fn len(&self) -> usize;
}

#[derive(Default)]
pub struct InMemoryStore {
    pending: RwLock<HashMap<String, PendingOperation>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingStore for InMemoryStore {
    async fn insert(&self, op: PendingOperation) {
        self.pending.write().await.insert(op.token.clone(), op);
    }

    async fn take(&self, token: &str) -> Option<PendingOperation> {
        self.pending.write().await.remove(token)
    }

    async fn purge_expired(&self, ttl: Duration) -> usize {
        let mut pending = self.pending.write().await;
        let before = pending.len();
        pending.retain(|_, op| !op.is_expired(ttl));
        before - pending.len()
    }

    async fn len(&self) -> usize {
        self.pending.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::dry_run::DryRunBuilder;
    use serde_json::json;

    fn op(token: &str) -> PendingOperation {
        let dry_run = DryRunBuilder::new("Test op", "Google Ads", "1234567890").build();
        PendingOperation::new(token.to_string(), dry_run, json!({}))
    }

    #[tokio::test]
    async fn take_is_single_shot() {
        let store = InMemoryStore::new();
        store.insert(op("abc")).await;
        assert_eq!(store.len().await, 1);
        assert!(store.take("abc").await.is_some());
        assert!(store.take("abc").await.is_none());
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn purge_drops_only_expired() {
        let store = InMemoryStore::new();
        store.insert(op("a")).await;
        store.insert(op("b")).await;
        assert_eq!(store.purge_expired(Duration::from_secs(3600)).await, 0);
        assert_eq!(store.purge_expired(Duration::ZERO).await, 2);
        assert_eq!(store.len().await, 0);
    }

    #[tokio::test]
    async fn concurrent_takes_yield_one_winner() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        store.insert(op("race")).await;

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { store.take("race").await.is_some() })
            })
            .collect();

        let mut winners = 0;
        for h in handles {
            if h.await.unwrap() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
