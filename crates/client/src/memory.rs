use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use orderdesk_core::domain::order::{Order, OrderId, OrderStatus, OrderSummary, StatusUpdate};
use orderdesk_core::errors::OrderApiError;
use orderdesk_core::ports::{OrderApi, OrderCollectionSource};

/// Order API backed by a map, for tests and offline operator runs. Applies
/// status updates the way the admin backend does and can be told to fail.
#[derive(Default)]
pub struct InMemoryOrderApi {
    orders: RwLock<HashMap<OrderId, Order>>,
    failure: RwLock<Option<OrderApiError>>,
    update_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl InMemoryOrderApi {
    pub fn with_orders(orders: impl IntoIterator<Item = Order>) -> Self {
        let orders = orders.into_iter().map(|order| (order.id.clone(), order)).collect();
        Self { orders: RwLock::new(orders), ..Self::default() }
    }

    pub async fn insert(&self, order: Order) {
        self.orders.write().await.insert(order.id.clone(), order);
    }

    pub async fn get(&self, id: &OrderId) -> Option<Order> {
        self.orders.read().await.get(id).cloned()
    }

    /// Every mutating call fails with `error` until cleared.
    pub async fn fail_mutations_with(&self, error: Option<OrderApiError>) {
        *self.failure.write().await = error;
    }

    pub fn update_calls(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }

    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::SeqCst)
    }

    async fn injected_failure(&self) -> Result<(), OrderApiError> {
        match self.failure.read().await.clone() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl OrderApi for InMemoryOrderApi {
    async fn fetch_order(&self, id: &OrderId) -> Result<Order, OrderApiError> {
        self.get(id).await.ok_or_else(|| OrderApiError::NotFound(id.clone()))
    }

    async fn update_order_status(
        &self,
        id: &OrderId,
        update: &StatusUpdate,
    ) -> Result<Order, OrderApiError> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        self.injected_failure().await?;

        let mut orders = self.orders.write().await;
        let order = orders.get_mut(id).ok_or_else(|| OrderApiError::NotFound(id.clone()))?;
        order.status = update.status;
        order.rejection_reason = match update.status {
            OrderStatus::Rejected => update.rejection_reason.clone(),
            _ => None,
        };
        if update.delivery_time_slot.is_some() {
            order.delivery_time_slot = update.delivery_time_slot;
        }
        order.can_edit_address = update.status == OrderStatus::New;
        order.updated_at = Some(Utc::now());
        Ok(order.clone())
    }

    async fn delete_order(&self, id: &OrderId) -> Result<(), OrderApiError> {
        self.delete_calls.fetch_add(1, Ordering::SeqCst);
        self.injected_failure().await?;

        let mut orders = self.orders.write().await;
        orders.remove(id).map(|_| ()).ok_or_else(|| OrderApiError::NotFound(id.clone()))
    }
}

#[async_trait]
impl OrderCollectionSource for InMemoryOrderApi {
    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderSummary>, OrderApiError> {
        let orders = self.orders.read().await;
        let mut summaries: Vec<OrderSummary> = orders
            .values()
            .filter(|order| status.map_or(true, |wanted| order.status == wanted))
            .map(|order| OrderSummary {
                id: order.id.clone(),
                customer_name: order.customer_name.clone(),
                customer_phone: order.customer_phone.clone(),
                delivery_address: order.delivery_address.clone(),
                status: order.status,
                total_amount: order.total_amount,
                created_at: order.created_at,
                items_count: order.items.len() as u32,
            })
            .collect();
        summaries.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(summaries)
    }
}
