use super::order::HostOrder;
use super::remote_order::{CreateOrderRequest, RemoteOrder};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;

/// Client for the payment gateway's order API.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    async fn fetch_order(&self, id: &str) -> std::result::Result<RemoteOrder, GatewayError>;
    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> std::result::Result<RemoteOrder, GatewayError>;
}

/// Host-side order persistence.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn load(&self, real_order_id: &str) -> Result<Option<HostOrder>>;
    async fn save(&self, order: HostOrder) -> Result<()>;
}

/// State of a single checkout session.
///
/// Holds at most one remote order id plus the user-visible error messages
/// accumulated during the session. Callers must not share one session across
/// concurrent requests.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn remote_order_id(&self) -> Result<Option<String>>;
    async fn set_remote_order_id(&self, id: &str) -> Result<()>;
    async fn add_error(&self, message: String) -> Result<()>;
    async fn errors(&self) -> Result<Vec<String>>;
}

/// Read access to store configuration values addressed by path.
pub trait ConfigProvider: Send + Sync {
    fn value(&self, path: &str) -> Option<String>;

    /// Interprets the value at `path` as a flag: absent, empty, `0` and `false`
    /// are off, anything else is on.
    fn flag(&self, path: &str) -> bool {
        match self.value(path) {
            Some(value) => {
                let value = value.trim();
                !(value.is_empty() || value == "0" || value.eq_ignore_ascii_case("false"))
            }
            None => false,
        }
    }
}

pub type PaymentGatewayBox = Box<dyn PaymentGateway>;
pub type OrderStoreBox = Box<dyn OrderStore>;
pub type SessionStoreBox = Box<dyn SessionStore>;
pub type SessionStoreFactory = Box<dyn Fn(&str) -> SessionStoreBox + Send + Sync>;
