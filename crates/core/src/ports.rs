//! Collaborators the order workflow talks to. Implementations live outside
//! the core: HTTP in `orderdesk-client`, presentation in whatever hosts the
//! workflow.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::order::{Order, OrderId, OrderStatus, OrderSummary, StatusUpdate};
use crate::errors::OrderApiError;

#[async_trait]
pub trait OrderApi: Send + Sync {
    async fn fetch_order(&self, id: &OrderId) -> Result<Order, OrderApiError>;
    async fn update_order_status(
        &self,
        id: &OrderId,
        update: &StatusUpdate,
    ) -> Result<Order, OrderApiError>;
    async fn delete_order(&self, id: &OrderId) -> Result<(), OrderApiError>;
}

#[async_trait]
pub trait OrderCollectionSource: Send + Sync {
    async fn list_orders(
        &self,
        status: Option<OrderStatus>,
    ) -> Result<Vec<OrderSummary>, OrderApiError>;
}

/// Marks the order collection stale. Refetching is the cache owner's call.
#[async_trait]
pub trait CacheInvalidator: Send + Sync {
    async fn invalidate_order_collection(&self);
}

pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Success,
    Info,
    Warning,
    Error,
}

pub trait Notifier: Send + Sync {
    fn notify(&self, message: &str, severity: Severity);
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

/// Keeps notifications and navigation requests in memory so a host without a
/// UI (or a test) can inspect them afterwards.
#[derive(Clone, Default)]
pub struct RecordingPresenter {
    notifications: Arc<Mutex<Vec<Notification>>>,
    paths: Arc<Mutex<Vec<String>>>,
}

impl RecordingPresenter {
    pub fn notifications(&self) -> Vec<Notification> {
        match self.notifications.lock() {
            Ok(items) => items.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn paths(&self) -> Vec<String> {
        match self.paths.lock() {
            Ok(items) => items.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn last_path(&self) -> Option<String> {
        self.paths().pop()
    }
}

impl Notifier for RecordingPresenter {
    fn notify(&self, message: &str, severity: Severity) {
        let notification = Notification { message: message.to_owned(), severity };
        match self.notifications.lock() {
            Ok(mut items) => items.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}

impl Navigator for RecordingPresenter {
    fn navigate(&self, path: &str) {
        match self.paths.lock() {
            Ok(mut items) => items.push(path.to_owned()),
            Err(poisoned) => poisoned.into_inner().push(path.to_owned()),
        }
    }
}
