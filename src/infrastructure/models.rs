use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::order::{LineItem, Order};

/// Serialized form of an [`Order`] as stored under its primary key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRecord {
    pub order_id: u64,
    pub customer_id: Uuid,
    pub line_items: Vec<LineItemRecord>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LineItemRecord {
    pub item_id: String,
    pub quantity: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<BigDecimal>,
}

impl From<&Order> for OrderRecord {
    fn from(order: &Order) -> Self {
        Self {
            order_id: order.order_id,
            customer_id: order.customer_id,
            line_items: order
                .line_items
                .iter()
                .map(|item| LineItemRecord {
                    item_id: item.item_id.clone(),
                    quantity: item.quantity,
                    unit_price: item.unit_price.clone(),
                })
                .collect(),
            created_at: order.created_at,
        }
    }
}

impl From<OrderRecord> for Order {
    fn from(record: OrderRecord) -> Self {
        Self {
            order_id: record.order_id,
            customer_id: record.customer_id,
            line_items: record
                .line_items
                .into_iter()
                .map(|item| LineItem {
                    item_id: item.item_id,
                    quantity: item.quantity,
                    unit_price: item.unit_price,
                })
                .collect(),
            created_at: record.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    #[test]
    fn record_uses_documented_field_names() {
        let order = Order {
            order_id: 9,
            customer_id: Uuid::nil(),
            line_items: vec![LineItem {
                item_id: "sku-1".to_string(),
                quantity: 2,
                unit_price: Some(BigDecimal::from_str("9.99").expect("valid decimal")),
            }],
            created_at: None,
        };

        let value = serde_json::to_value(OrderRecord::from(&order)).expect("serialize");

        assert_eq!(value["order_id"], 9);
        assert_eq!(value["customer_id"], "00000000-0000-0000-0000-000000000000");
        assert_eq!(value["line_items"][0]["item_id"], "sku-1");
        assert_eq!(value["line_items"][0]["quantity"], 2);
        assert_eq!(value["line_items"][0]["unit_price"], "9.99");
        assert!(value["created_at"].is_null());
    }

    #[test]
    fn record_without_price_or_timestamp_decodes() {
        let record: OrderRecord = serde_json::from_str(
            r#"{"order_id":5,"customer_id":"11111111-1111-1111-1111-111111111111",
                "line_items":[{"item_id":"sku-1","quantity":2}]}"#,
        )
        .expect("decode");

        let order = Order::from(record);
        assert_eq!(order.order_id, 5);
        assert_eq!(order.line_items[0].unit_price, None);
        assert_eq!(order.created_at, None);
    }
}
