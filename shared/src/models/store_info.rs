//! Outlet Model

use serde::{Deserialize, Serialize};

/// Outlet printed in receipt headers and the pay-request QR
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Outlet {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub phone: Option<String>,
    /// UPI merchant id (VPA). No QR block is printed without it.
    pub merchant_upi_id: Option<String>,
}

impl Outlet {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Merchant id if configured and non-blank
    pub fn merchant_id(&self) -> Option<&str> {
        self.merchant_upi_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_merchant_id_is_none() {
        let mut outlet = Outlet::new("Tiffin House");
        assert_eq!(outlet.merchant_id(), None);

        outlet.merchant_upi_id = Some("   ".to_string());
        assert_eq!(outlet.merchant_id(), None);

        outlet.merchant_upi_id = Some(" tiffin@upi ".to_string());
        assert_eq!(outlet.merchant_id(), Some("tiffin@upi"));
    }
}
