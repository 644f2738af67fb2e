use crate::error::{CheckoutError, Result};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `payment_capture` value asking the gateway to capture payments automatically.
pub const AUTO_CAPTURE: u8 = 1;

/// Converts a major-unit total into integer minor units.
///
/// Assumes two fractional digits for every currency; any further fraction is
/// truncated, not rounded.
pub fn to_minor_units(total: Decimal) -> Result<i64> {
    total
        .checked_mul(dec!(100))
        .and_then(|minor| minor.trunc().to_i64())
        .ok_or_else(|| {
            CheckoutError::ValidationError(format!(
                "Order total {} cannot be expressed in minor units",
                total
            ))
        })
}

/// What the gateway's order record must contain for the current host order.
///
/// Derived fresh on every use; never cached or persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpectedOrderData {
    pub receipt: String,
    pub amount: i64,
    pub currency: String,
}

/// One of the fields compared when verifying a remote order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderField {
    Receipt,
    Amount,
    Currency,
    Id,
}

impl OrderField {
    /// Comparison order used during verification.
    pub const ALL: [OrderField; 4] = [
        OrderField::Receipt,
        OrderField::Amount,
        OrderField::Currency,
        OrderField::Id,
    ];

    fn matches(self, expected: &ExpectedOrderData, id: &str, remote: &RemoteOrder) -> bool {
        match self {
            OrderField::Receipt => remote.receipt.as_deref() == Some(expected.receipt.as_str()),
            OrderField::Amount => remote.amount == RemoteAmount::Minor(expected.amount),
            OrderField::Currency => remote.currency == expected.currency,
            OrderField::Id => remote.id == id,
        }
    }
}

impl fmt::Display for OrderField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OrderField::Receipt => "receipt",
            OrderField::Amount => "amount",
            OrderField::Currency => "currency",
            OrderField::Id => "id",
        };
        f.write_str(name)
    }
}

impl ExpectedOrderData {
    /// Returns the first field (in `OrderField::ALL` order) where `remote`
    /// differs from this data overlaid with `id`, or `None` if all match.
    pub fn first_mismatch(&self, id: &str, remote: &RemoteOrder) -> Option<OrderField> {
        OrderField::ALL
            .into_iter()
            .find(|field| !field.matches(self, id, remote))
    }
}

/// Body of a gateway order creation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateOrderRequest {
    pub receipt: String,
    pub amount: i64,
    pub currency: String,
    pub payment_capture: u8,
}

impl From<ExpectedOrderData> for CreateOrderRequest {
    fn from(data: ExpectedOrderData) -> Self {
        Self {
            receipt: data.receipt,
            amount: data.amount,
            currency: data.currency,
            payment_capture: AUTO_CAPTURE,
        }
    }
}

/// Amount as reported by the gateway.
///
/// Only an integer is a valid minor-unit amount. Anything else the gateway
/// sends (a numeric string, a float) is kept verbatim and never compares equal
/// to an expected amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RemoteAmount {
    Minor(i64),
    Unexpected(serde_json::Value),
}

/// The gateway's order record. Read-only from the checkout's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteOrder {
    pub id: String,
    pub amount: RemoteAmount,
    pub currency: String,
    #[serde(default)]
    pub receipt: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub attempts: u32,
    #[serde(default)]
    pub created_at: Option<i64>,
}
