//! Gateway configuration read from the store's configuration paths.

use crate::domain::ports::ConfigProvider;
use crate::error::{CheckoutError, Result};
use std::time::Duration;

pub const CONFIG_PATH_ENABLED: &str = "payment/razorpay/active";
pub const CONFIG_PATH_KEY_ID: &str = "payment/razorpay/key_id";
pub const CONFIG_PATH_KEY_SECRET: &str = "payment/razorpay/key_secret";
pub const CONFIG_PATH_CURRENCY: &str = "payment/razorpay/currency";

pub const BASE_URL: &str = "https://api.razorpay.com/v1/";
pub const DEFAULT_CURRENCY: &str = "INR";
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Whether the payment method is switched on for the store.
pub fn is_enabled(config: &dyn ConfigProvider) -> bool {
    config.flag(CONFIG_PATH_ENABLED)
}

/// Everything needed to talk to the gateway.
#[derive(Debug, Clone, PartialEq)]
pub struct GatewaySettings {
    pub key_id: String,
    pub key_secret: String,
    /// Currency every gateway order is created in.
    pub currency: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl GatewaySettings {
    /// Reads credentials and currency from `config`.
    ///
    /// Both key values are required; the currency falls back to INR.
    pub fn load(config: &dyn ConfigProvider) -> Result<Self> {
        let key_id = required(config, CONFIG_PATH_KEY_ID)?;
        let key_secret = required(config, CONFIG_PATH_KEY_SECRET)?;
        let currency = config
            .value(CONFIG_PATH_CURRENCY)
            .filter(|c| !c.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

        Ok(Self {
            key_id,
            key_secret,
            currency,
            base_url: BASE_URL.to_string(),
            timeout: REQUEST_TIMEOUT,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

fn required(config: &dyn ConfigProvider, path: &str) -> Result<String> {
    config
        .value(path)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| CheckoutError::ValidationError(format!("{} is not configured", path)))
}

/// Reads configuration paths from environment variables.
///
/// `payment/razorpay/key_id` is looked up as `PAYMENT_RAZORPAY_KEY_ID`.
#[derive(Debug, Default, Clone, Copy)]
pub struct EnvConfig;

impl EnvConfig {
    pub fn variable_name(path: &str) -> String {
        path.replace('/', "_").to_ascii_uppercase()
    }
}

impl ConfigProvider for EnvConfig {
    fn value(&self, path: &str) -> Option<String> {
        std::env::var(Self::variable_name(path)).ok()
    }
}
