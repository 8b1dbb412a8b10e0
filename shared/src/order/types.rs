//! Order line, customer and totals types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How the order is served
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderType {
    #[default]
    DineIn,
    Takeaway,
    Delivery,
}

impl OrderType {
    /// Label printed on tickets
    pub fn label(&self) -> &'static str {
        match self {
            OrderType::DineIn => "Dine In",
            OrderType::Takeaway => "Takeaway",
            OrderType::Delivery => "Delivery",
        }
    }
}

/// Portion served for a line (half/full plates)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Portion {
    Half,
    Full,
}

impl Portion {
    pub fn label(&self) -> &'static str {
        match self {
            Portion::Half => "Half",
            Portion::Full => "Full",
        }
    }
}

/// One cart line as priced by the order layer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct OrderLine {
    /// Menu item id (identity used by the kitchen ticket diff)
    pub menu_id: i64,
    /// Item name
    pub name: String,
    /// Quantity ordered
    pub quantity: u32,
    /// Unit price
    pub unit_price: Decimal,
    /// Selected portion
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub portion: Option<Portion>,
    /// Line total (computed upstream)
    pub line_total: Decimal,
    /// Special instructions for the kitchen
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
}

impl OrderLine {
    /// Non-empty, trimmed instructions
    pub fn note(&self) -> Option<&str> {
        self.instructions
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }
}

/// Customer fields printed on receipts
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mobile: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

impl Customer {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.mobile.is_none() && self.address.is_none()
    }
}

/// Pre-computed money fields
///
/// Every amount is final. The printer formats them and never recomputes.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrderTotals {
    /// Sum of line totals
    pub subtotal: Decimal,
    /// Menu discount amount
    pub discount: Decimal,
    /// Menu discount percentage
    pub discount_percent: Decimal,
    /// Special (manual) discount amount
    pub special_discount: Decimal,
    /// Extra charges (packing, delivery)
    pub extra_charges: Decimal,
    /// Subtotal after discounts and extra charges
    pub discounted_subtotal: Decimal,
    /// Service charge amount
    pub service_charge: Decimal,
    /// Service charge percentage
    pub service_charge_percent: Decimal,
    /// Tax amount
    pub tax: Decimal,
    /// Tax percentage
    pub tax_percent: Decimal,
    /// Tip
    pub tip: Decimal,
    /// Amount due
    pub grand_total: Decimal,
}
