//! Order snapshot - immutable view of an order for printing

use super::types::{Customer, OrderLine, OrderTotals, OrderType};
use serde::{Deserialize, Serialize};

/// Order snapshot - produced by the pricing/order layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderSnapshot {
    /// Bill / order number
    pub order_number: String,
    /// Dine-in, takeaway or delivery
    #[serde(default)]
    pub order_type: OrderType,
    /// Table name (dine-in)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    /// Creation time (Unix millis)
    pub created_at: i64,
    /// Customer details
    #[serde(default)]
    pub customer: Customer,
    /// Payment method label ("Cash", "UPI", ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    /// Cart lines
    pub items: Vec<OrderLine>,
    /// Money fields
    #[serde(default)]
    pub totals: OrderTotals,
}

impl OrderSnapshot {
    /// Order type and table label, e.g. "Dine In / T4"
    pub fn label(&self) -> String {
        match self.table_name.as_deref().map(str::trim) {
            Some(table) if !table.is_empty() => {
                format!("{} / {}", self.order_type.label(), table)
            }
            _ => self.order_type.label().to_string(),
        }
    }
}

/// Last printed state of an existing order
///
/// Same shape as [`OrderSnapshot`]. Only used to compute additional kitchen
/// tickets; its absence means "new order, print everything".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct PreviousOrderSnapshot(pub OrderSnapshot);

impl PreviousOrderSnapshot {
    pub fn items(&self) -> &[OrderLine] {
        &self.0.items
    }
}

impl From<OrderSnapshot> for PreviousOrderSnapshot {
    fn from(snapshot: OrderSnapshot) -> Self {
        Self(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn line(menu_id: i64, quantity: u32) -> OrderLine {
        OrderLine {
            menu_id,
            name: format!("Item {}", menu_id),
            quantity,
            unit_price: dec!(10.00),
            portion: None,
            line_total: dec!(10.00) * rust_decimal::Decimal::from(quantity),
            instructions: None,
        }
    }

    fn snapshot() -> OrderSnapshot {
        OrderSnapshot {
            order_number: "B-101".to_string(),
            order_type: OrderType::DineIn,
            table_name: Some("T4".to_string()),
            created_at: 1_705_912_335_000,
            customer: Customer::default(),
            payment_method: None,
            items: vec![line(1, 2), line(2, 1)],
            totals: OrderTotals::default(),
        }
    }

    #[test]
    fn test_label_with_table() {
        assert_eq!(snapshot().label(), "Dine In / T4");
    }

    #[test]
    fn test_label_without_table() {
        let mut s = snapshot();
        s.order_type = OrderType::Takeaway;
        s.table_name = Some("  ".to_string());
        assert_eq!(s.label(), "Takeaway");
    }

    #[test]
    fn test_deserialize_minimal_json() {
        let json = r#"{
            "order_number": "42",
            "created_at": 0,
            "items": [
                {"menu_id": 7, "name": "Dal", "quantity": 1,
                 "unit_price": "120.00", "line_total": "120.00",
                 "portion": "HALF", "instructions": "less oil"}
            ],
            "totals": {"subtotal": "120.00", "grand_total": "126.00"}
        }"#;

        let s: OrderSnapshot = serde_json::from_str(json).unwrap();
        assert_eq!(s.order_type, OrderType::DineIn);
        assert_eq!(s.items[0].portion, Some(crate::order::Portion::Half));
        assert_eq!(s.items[0].note(), Some("less oil"));
        assert_eq!(s.totals.grand_total.to_string(), "126.00");
        assert!(s.customer.is_empty());
    }

    #[test]
    fn test_previous_snapshot_is_transparent() {
        let prev: PreviousOrderSnapshot = snapshot().into();
        let json = serde_json::to_value(&prev).unwrap();
        assert_eq!(json["order_number"], "B-101");
        assert_eq!(prev.items().len(), 2);
    }
}
