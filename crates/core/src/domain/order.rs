use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::errors::ValidationError;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct OrderId(pub String);

impl OrderId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OrderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Order lifecycle status. The storefront backend speaks Russian labels on the
/// wire; the English names are accepted on input and used for display.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    #[serde(rename = "новый", alias = "new")]
    New,
    #[serde(rename = "принят", alias = "accepted")]
    Accepted,
    #[serde(rename = "отказано", alias = "rejected")]
    Rejected,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 3] = [Self::New, Self::Accepted, Self::Rejected];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::New => "new",
            Self::Accepted => "accepted",
            Self::Rejected => "rejected",
        }
    }

    pub fn wire_label(&self) -> &'static str {
        match self {
            Self::New => "новый",
            Self::Accepted => "принят",
            Self::Rejected => "отказано",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized || status.wire_label() == normalized)
            .ok_or_else(|| ValidationError::UnknownStatus(value.trim().to_owned()))
    }
}

/// Delivery windows offered when accepting an order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DeliveryTimeSlot {
    #[serde(rename = "13:00-14:00")]
    From13To14,
    #[serde(rename = "14:00-15:00")]
    From14To15,
    #[serde(rename = "15:00-16:00")]
    From15To16,
    #[serde(rename = "16:00-17:00")]
    From16To17,
}

impl DeliveryTimeSlot {
    pub const ALL: [DeliveryTimeSlot; 4] =
        [Self::From13To14, Self::From14To15, Self::From15To16, Self::From16To17];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::From13To14 => "13:00-14:00",
            Self::From14To15 => "14:00-15:00",
            Self::From15To16 => "15:00-16:00",
            Self::From16To17 => "16:00-17:00",
        }
    }
}

impl fmt::Display for DeliveryTimeSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryTimeSlot {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        Self::ALL
            .into_iter()
            .find(|slot| slot.as_str() == trimmed)
            .ok_or_else(|| ValidationError::UnknownDeliveryTimeSlot(trimmed.to_owned()))
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub product_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    pub product_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant_name: Option<String>,
    pub quantity: u32,
    pub price: Decimal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    pub user_id: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_type: Option<String>,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub items: Vec<OrderItem>,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub can_edit_address: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_receipt_file_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_receipt_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_receipt_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_time_slot: Option<DeliveryTimeSlot>,
}

impl Order {
    /// Trailing six characters of the id, as shown in admin headers.
    pub fn short_id(&self) -> &str {
        let id = self.id.as_str();
        match id.char_indices().rev().nth(5) {
            Some((start, _)) => &id[start..],
            None => id,
        }
    }

    pub fn customer_chat_link(&self) -> String {
        format!("tg://user?id={}", self.user_id)
    }

    pub fn has_receipt(&self) -> bool {
        self.payment_receipt_file_id.as_deref().is_some_and(|value| !value.trim().is_empty())
    }
}

/// List-view projection of an order, without items.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OrderSummary {
    pub id: OrderId,
    pub customer_name: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub status: OrderStatus,
    pub total_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub items_count: u32,
}

/// Request body of a status change.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivery_time_slot: Option<DeliveryTimeSlot>,
}

impl StatusUpdate {
    pub fn new(status: OrderStatus) -> Self {
        Self { status, rejection_reason: None, delivery_time_slot: None }
    }
}
