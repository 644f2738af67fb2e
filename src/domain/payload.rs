use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Data handed to the checkout page so it can open the gateway's payment form.
#[derive(Debug, Serialize, Deserialize, PartialEq, Clone)]
pub struct CheckoutPayload {
    #[serde(rename = "razorpay_order_id")]
    pub remote_order_id: String,
    pub customer_name: String,
    /// Empty when the billing address has no phone number.
    pub customer_phone: String,
    #[serde(rename = "order_id")]
    pub host_order_id: String,
    /// Base grand total in minor units.
    pub base_amount: i64,
    pub base_currency: String,
    /// Empty when the order has no customer email.
    pub customer_email: String,
    pub quote_currency: String,
    /// Quote grand total rounded to two decimals.
    #[serde(with = "rust_decimal::serde::float")]
    pub quote_amount: Decimal,
}

/// Controller-facing result of a checkout: the payload, or `{"error": true}`.
///
/// The error details are not part of the response; they are recorded in the
/// checkout session's error list for the page to render.
#[derive(Debug, Serialize, PartialEq, Clone)]
#[serde(untagged)]
pub enum CheckoutResponse {
    Ready(CheckoutPayload),
    Failed { error: bool },
}

impl<E> From<Result<CheckoutPayload, E>> for CheckoutResponse {
    fn from(result: Result<CheckoutPayload, E>) -> Self {
        match result {
            Ok(payload) => CheckoutResponse::Ready(payload),
            Err(_) => CheckoutResponse::Failed { error: true },
        }
    }
}
