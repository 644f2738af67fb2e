#![allow(dead_code)]

use assert_cmd::cargo_bin;
use serde_json::{Value, json};
use std::process::Command;
use wiremock::matchers::{basic_auth, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const KEY_ID: &str = "rzp_test_key";
pub const KEY_SECRET: &str = "rzp_test_secret";

/// Gateway order JSON as the orders API returns it.
pub fn order_json(id: &str, receipt: &str, amount: i64) -> Value {
    json!({
        "id": id,
        "entity": "order",
        "amount": amount,
        "amount_paid": 0,
        "amount_due": amount,
        "currency": "INR",
        "receipt": receipt,
        "offer_id": null,
        "status": "created",
        "attempts": 0,
        "notes": [],
        "created_at": 1582628071
    })
}

pub fn error_json(description: &str) -> Value {
    json!({
        "error": {
            "code": "BAD_REQUEST_ERROR",
            "description": description
        }
    })
}

/// Answers order creation for `receipt` with a new order `id`.
pub async fn mount_create(server: &MockServer, receipt: &str, amount: i64, id: &str) {
    Mock::given(method("POST"))
        .and(path("/v1/orders"))
        .and(basic_auth(KEY_ID, KEY_SECRET))
        .and(body_partial_json(json!({"receipt": receipt})))
        .respond_with(ResponseTemplate::new(200).set_body_json(order_json(id, receipt, amount)))
        .mount(server)
        .await;
}

/// The binary configured against `server` with valid credentials.
pub fn checkout_command(server: &MockServer) -> Command {
    let mut cmd = Command::new(cargo_bin!("razorpay-checkout"));
    cmd.arg("--base-url")
        .arg(format!("{}/v1/", server.uri()))
        .env("PAYMENT_RAZORPAY_ACTIVE", "1")
        .env("PAYMENT_RAZORPAY_KEY_ID", KEY_ID)
        .env("PAYMENT_RAZORPAY_KEY_SECRET", KEY_SECRET)
        .env_remove("PAYMENT_RAZORPAY_CURRENCY")
        .env_remove("RUST_LOG");
    cmd
}

pub const ORDERS_HEADER: &str = "order_id,status,base_grand_total,grand_total,base_currency,quote_currency,firstname,lastname,telephone,email";
