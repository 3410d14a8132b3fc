use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::domain::order::{OrderStatus, OrderSummary};
use crate::errors::OrderApiError;
use crate::ports::{CacheInvalidator, OrderCollectionSource};

/// Cache key: the status filter of a list view, `None` for all orders.
pub type CollectionKey = Option<OrderStatus>;

#[derive(Clone, Debug, Default)]
struct CacheEntry {
    orders: Option<Vec<OrderSummary>>,
    stale: bool,
    consumers: usize,
    version: u64,
}

/// List-view cache of order summaries. The detail workflow reaches it only
/// through [`CacheInvalidator`].
pub struct OrderCollectionCache {
    source: Arc<dyn OrderCollectionSource>,
    entries: RwLock<HashMap<CollectionKey, CacheEntry>>,
}

impl OrderCollectionCache {
    pub fn new(source: Arc<dyn OrderCollectionSource>) -> Self {
        Self { source, entries: RwLock::new(HashMap::new()) }
    }

    /// Registers an active consumer (a mounted list view) for `key`.
    pub async fn attach(&self, key: CollectionKey) {
        let mut entries = self.entries.write().await;
        entries.entry(key).or_default().consumers += 1;
    }

    pub async fn detach(&self, key: CollectionKey) {
        let mut entries = self.entries.write().await;
        if let Some(entry) = entries.get_mut(&key) {
            entry.consumers = entry.consumers.saturating_sub(1);
        }
    }

    pub async fn is_stale(&self, key: CollectionKey) -> bool {
        let entries = self.entries.read().await;
        entries.get(&key).map(|entry| entry.stale || entry.orders.is_none()).unwrap_or(true)
    }

    pub async fn active_consumers(&self, key: CollectionKey) -> usize {
        let entries = self.entries.read().await;
        entries.get(&key).map(|entry| entry.consumers).unwrap_or(0)
    }

    /// Returns cached summaries, fetching when absent or stale.
    pub async fn get(&self, key: CollectionKey) -> Result<Vec<OrderSummary>, OrderApiError> {
        {
            let entries = self.entries.read().await;
            if let Some(CacheEntry { orders: Some(orders), stale: false, .. }) = entries.get(&key) {
                return Ok(orders.clone());
            }
        }
        self.refetch(key).await
    }

    async fn refetch(&self, key: CollectionKey) -> Result<Vec<OrderSummary>, OrderApiError> {
        let started_at = {
            let mut entries = self.entries.write().await;
            entries.entry(key).or_default().version
        };

        let orders = self.source.list_orders(key).await?;

        let mut entries = self.entries.write().await;
        let entry = entries.entry(key).or_default();
        entry.orders = Some(orders.clone());
        // An invalidation that raced this fetch keeps the entry stale.
        entry.stale = entry.version != started_at;
        debug!(
            event_name = "order.cache.refetched",
            filter = key.map(|status| status.as_str()).unwrap_or("all"),
            count = orders.len(),
            "order collection refetched"
        );
        Ok(orders)
    }
}

#[async_trait]
impl CacheInvalidator for OrderCollectionCache {
    async fn invalidate_order_collection(&self) {
        let active = {
            let mut entries = self.entries.write().await;
            let mut active = Vec::new();
            for (key, entry) in entries.iter_mut() {
                entry.stale = true;
                entry.version += 1;
                if entry.consumers > 0 {
                    active.push(*key);
                }
            }
            active
        };

        info!(
            event_name = "order.cache.invalidated",
            active_entries = active.len(),
            "order collection marked stale"
        );

        for key in active {
            if let Err(error) = self.refetch(key).await {
                warn!(
                    event_name = "order.cache.refetch_failed",
                    filter = key.map(|status| status.as_str()).unwrap_or("all"),
                    error = %error,
                    "order collection refetch failed; entry stays stale"
                );
            }
        }
    }
}
