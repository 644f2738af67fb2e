use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Billing contact attached to a host order.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone, Default)]
pub struct BillingAddress {
    pub firstname: String,
    pub lastname: String,
    pub telephone: Option<String>,
}

impl BillingAddress {
    /// First and last name joined by a space, with surrounding whitespace removed.
    pub fn full_name(&self) -> String {
        format!("{} {}", self.firstname, self.lastname)
            .trim()
            .to_string()
    }
}

#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct StatusHistoryEntry {
    pub status: String,
    pub comment: String,
}

/// The storefront's order as seen by the checkout flow.
///
/// Owned by the host order-management system. The reconciler only reads it and
/// appends to `status_history`.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct HostOrder {
    /// Human-readable increment id, sent to the gateway as the receipt.
    pub real_order_id: String,
    /// Grand total in the store's base currency.
    pub base_grand_total: Decimal,
    /// Grand total in the currency the customer was quoted.
    pub grand_total: Decimal,
    pub base_currency_code: String,
    pub quote_currency_code: String,
    pub status: String,
    pub billing_address: BillingAddress,
    pub customer_email: Option<String>,
    #[serde(default)]
    pub status_history: Vec<StatusHistoryEntry>,
}

impl HostOrder {
    pub fn new(real_order_id: impl Into<String>, base_grand_total: Decimal) -> Self {
        Self {
            real_order_id: real_order_id.into(),
            base_grand_total,
            grand_total: base_grand_total,
            base_currency_code: "INR".to_string(),
            quote_currency_code: "INR".to_string(),
            status: "pending".to_string(),
            billing_address: BillingAddress::default(),
            customer_email: None,
            status_history: Vec::new(),
        }
    }

    /// Appends a history note under the given status.
    pub fn add_status_to_history(&mut self, status: impl Into<String>, comment: impl Into<String>) {
        self.status_history.push(StatusHistoryEntry {
            status: status.into(),
            comment: comment.into(),
        });
    }
}
