use crate::domain::order::HostOrder;
use crate::domain::payload::CheckoutPayload;
use crate::domain::ports::{OrderStoreBox, PaymentGatewayBox, SessionStore};
use crate::domain::remote_order::{CreateOrderRequest, ExpectedOrderData, to_minor_units};
use crate::error::{CheckoutError, Result};
use rust_decimal::RoundingStrategy;
use tracing::{debug, info, warn};

/// Prefix of every gateway failure recorded in the checkout session.
pub const ERROR_MESSAGE_PREFIX: &str = "Razorpay Error: ";

/// Links a host order to a gateway order for the current checkout session.
///
/// An existing link is reused only after re-checking the gateway's record
/// against the order's current receipt, amount and currency; otherwise a new
/// gateway order is created. Gateway calls are awaited one after another and
/// never retried.
pub struct OrderReconciler {
    gateway: PaymentGatewayBox,
    order_store: OrderStoreBox,
    currency: String,
}

impl OrderReconciler {
    /// Creates a reconciler that creates gateway orders in INR.
    ///
    /// # Arguments
    ///
    /// * `gateway` - The gateway's order API.
    /// * `order_store` - Where the annotated host order is saved.
    pub fn new(gateway: PaymentGatewayBox, order_store: OrderStoreBox) -> Self {
        Self {
            gateway,
            order_store,
            currency: crate::config::DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Creates gateway orders in `currency` instead of INR.
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// The receipt, amount and currency the gateway order must carry.
    pub fn expected_order_data(&self, order: &HostOrder) -> Result<ExpectedOrderData> {
        let data = ExpectedOrderData {
            receipt: order.real_order_id.clone(),
            amount: to_minor_units(order.base_grand_total)?,
            currency: self.currency.clone(),
        };

        info!(
            receipt = %data.receipt,
            amount = data.amount,
            currency = %data.currency,
            "expected razorpay order data"
        );

        Ok(data)
    }

    /// Checks that the gateway order `remote_order_id` still matches `order`.
    ///
    /// Fetch failures are returned as errors, not as `false`.
    pub async fn verify_remote_order(
        &self,
        remote_order_id: &str,
        order: &HostOrder,
    ) -> Result<bool> {
        let remote = self.gateway.fetch_order(remote_order_id).await?;
        let expected = self.expected_order_data(order)?;

        if let Some(field) = expected.first_mismatch(remote_order_id, &remote) {
            debug!(
                razorpay_order_id = %remote_order_id,
                %field,
                "razorpay order does not match host order"
            );
            return Ok(false);
        }

        info!(razorpay_order_id = %remote_order_id, "Razorpay order amount verified");
        Ok(true)
    }

    /// Makes sure the session is linked to a gateway order matching `order`
    /// and returns the data the checkout page needs.
    ///
    /// Any failure while reading the session, talking to the gateway or
    /// updating the session link is recorded in the session's error list and
    /// returned; in that case the host order is not saved and the previous link
    /// is left in place.
    pub async fn ensure_remote_order(
        &self,
        session: &dyn SessionStore,
        order: &mut HostOrder,
    ) -> Result<CheckoutPayload> {
        let remote_order_id = match self.link_remote_order(session, order).await {
            Ok(id) => id,
            Err(e) => {
                warn!(order_id = %order.real_order_id, error = %e, "razorpay order linking failed");
                let message = format!("{}{}", ERROR_MESSAGE_PREFIX, e);
                if let Err(session_err) = session.add_error(message).await {
                    warn!(
                        order_id = %order.real_order_id,
                        error = %session_err,
                        "failed to record razorpay error in session"
                    );
                }
                return Err(e);
            }
        };

        let payload = self.build_payload(remote_order_id, order)?;

        // The caller's order only gets the note once it is persisted
        let mut annotated = order.clone();
        annotated.add_status_to_history(
            order.status.clone(),
            format!("Razorpay Order ID: {}", payload.remote_order_id),
        );
        self.order_store.save(annotated.clone()).await?;
        *order = annotated;

        Ok(payload)
    }

    /// Same as [`ensure_remote_order`](Self::ensure_remote_order) for an order
    /// loaded from the order store.
    pub async fn ensure_remote_order_by_id(
        &self,
        session: &dyn SessionStore,
        real_order_id: &str,
    ) -> Result<CheckoutPayload> {
        let mut order = self
            .order_store
            .load(real_order_id)
            .await?
            .ok_or_else(|| CheckoutError::OrderNotFound(real_order_id.to_string()))?;

        self.ensure_remote_order(session, &mut order).await
    }

    /// Reuses the session's gateway order if it still verifies, otherwise
    /// creates one and stores its id in the session.
    async fn link_remote_order(
        &self,
        session: &dyn SessionStore,
        order: &HostOrder,
    ) -> Result<String> {
        let linked = session
            .remote_order_id()
            .await?
            .filter(|id| !id.is_empty());

        match linked {
            Some(id) => {
                if self.verify_remote_order(&id, order).await? {
                    return Ok(id);
                }
            }
            None => {
                info!(
                    order_id = %order.real_order_id,
                    razorpay_order_id = "NULL",
                    "no razorpay order in session"
                );
            }
        }

        let request = CreateOrderRequest::from(self.expected_order_data(order)?);
        let created = self.gateway.create_order(&request).await?;
        info!(
            order_id = %order.real_order_id,
            razorpay_order_id = %created.id,
            "razorpay order created"
        );

        session.set_remote_order_id(&created.id).await?;
        Ok(created.id)
    }

    fn build_payload(
        &self,
        remote_order_id: String,
        order: &HostOrder,
    ) -> Result<CheckoutPayload> {
        let billing = &order.billing_address;

        Ok(CheckoutPayload {
            remote_order_id,
            customer_name: billing.full_name(),
            customer_phone: billing.telephone.clone().unwrap_or_default(),
            host_order_id: order.real_order_id.clone(),
            base_amount: to_minor_units(order.base_grand_total)?,
            base_currency: order.base_currency_code.clone(),
            customer_email: order.customer_email.clone().unwrap_or_default(),
            quote_currency: order.quote_currency_code.clone(),
            quote_amount: order
                .grand_total
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::order::BillingAddress;
    use crate::domain::ports::{OrderStore, SessionStore};
    use crate::domain::remote_order::{RemoteAmount, RemoteOrder};
    use crate::infrastructure::in_memory::{InMemoryGateway, InMemoryOrderStore, InMemorySession};
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use std::io;
    use std::sync::{Arc, Mutex};

    fn order() -> HostOrder {
        let mut order = HostOrder::new("100000123", dec!(499.99));
        order.grand_total = dec!(6.0249);
        order.quote_currency_code = "USD".to_string();
        order.billing_address = BillingAddress {
            firstname: "Asha".to_string(),
            lastname: "Rao".to_string(),
            telephone: Some("9999999999".to_string()),
        };
        order.customer_email = Some("asha@example.com".to_string());
        order
    }

    fn matching_remote(id: &str) -> RemoteOrder {
        RemoteOrder {
            id: id.to_string(),
            amount: RemoteAmount::Minor(49999),
            currency: "INR".to_string(),
            receipt: Some("100000123".to_string()),
            status: Some("created".to_string()),
            attempts: 0,
            created_at: None,
        }
    }

    fn reconciler(gateway: &InMemoryGateway, store: &InMemoryOrderStore) -> OrderReconciler {
        OrderReconciler::new(Box::new(gateway.clone()), Box::new(store.clone()))
    }

    #[test]
    fn test_expected_order_data() {
        let gateway = InMemoryGateway::new();
        let store = InMemoryOrderStore::new();
        let data = reconciler(&gateway, &store)
            .expected_order_data(&order())
            .unwrap();

        assert_eq!(data.receipt, "100000123");
        assert_eq!(data.amount, 49999);
        assert_eq!(data.currency, "INR");
    }

    #[test]
    fn test_expected_order_data_uses_configured_currency() {
        let gateway = InMemoryGateway::new();
        let store = InMemoryOrderStore::new();
        let mut order = order();
        order.base_currency_code = "EUR".to_string();

        let data = reconciler(&gateway, &store)
            .with_currency("USD")
            .expected_order_data(&order)
            .unwrap();
        assert_eq!(data.currency, "USD");
    }

    #[tokio::test]
    async fn test_verify_remote_order_match() {
        let gateway = InMemoryGateway::new();
        gateway.insert(matching_remote("order_abc")).await;
        let store = InMemoryOrderStore::new();

        let verified = reconciler(&gateway, &store)
            .verify_remote_order("order_abc", &order())
            .await
            .unwrap();
        assert!(verified);
        assert_eq!(gateway.fetch_calls(), 1);
    }

    #[tokio::test]
    async fn test_verify_remote_order_sees_amount_change() {
        let gateway = InMemoryGateway::new();
        gateway.insert(matching_remote("order_abc")).await;
        let store = InMemoryOrderStore::new();
        let reconciler = reconciler(&gateway, &store);

        let mut order = order();
        assert!(reconciler.verify_remote_order("order_abc", &order).await.unwrap());

        order.base_grand_total = dec!(500.00);
        assert!(!reconciler.verify_remote_order("order_abc", &order).await.unwrap());
    }

    #[tokio::test]
    async fn test_verify_remote_order_fetch_failure_propagates() {
        let gateway = InMemoryGateway::new();
        let store = InMemoryOrderStore::new();

        let result = reconciler(&gateway, &store)
            .verify_remote_order("order_missing", &order())
            .await;
        assert!(matches!(result, Err(CheckoutError::GatewayError(_))));
    }

    #[tokio::test]
    async fn test_ensure_without_link_creates_order() {
        let gateway = InMemoryGateway::new();
        let store = InMemoryOrderStore::new();
        let session = InMemorySession::new();
        let mut order = order();

        let payload = reconciler(&gateway, &store)
            .ensure_remote_order(&session, &mut order)
            .await
            .unwrap();

        assert_eq!(gateway.fetch_calls(), 0);
        assert_eq!(gateway.create_calls(), 1);
        assert_eq!(
            session.remote_order_id().await.unwrap().as_deref(),
            Some(payload.remote_order_id.as_str())
        );
        assert_eq!(payload.base_amount, 49999);
        assert_eq!(payload.customer_name, "Asha Rao");
        assert_eq!(payload.customer_phone, "9999999999");
        assert_eq!(payload.customer_email, "asha@example.com");
        assert_eq!(payload.quote_currency, "USD");
        assert_eq!(payload.quote_amount, dec!(6.02));

        let saved = store.load("100000123").await.unwrap().unwrap();
        assert_eq!(saved.status_history.len(), 1);
        assert_eq!(
            saved.status_history[0].comment,
            format!("Razorpay Order ID: {}", payload.remote_order_id)
        );
    }

    #[tokio::test]
    async fn test_ensure_reuses_verified_link() {
        let gateway = InMemoryGateway::new();
        gateway.insert(matching_remote("order_abc")).await;
        let store = InMemoryOrderStore::new();
        let session = InMemorySession::with_remote_order_id("order_abc");

        let payload = reconciler(&gateway, &store)
            .ensure_remote_order(&session, &mut order())
            .await
            .unwrap();

        assert_eq!(payload.remote_order_id, "order_abc");
        assert_eq!(gateway.fetch_calls(), 1);
        assert_eq!(gateway.create_calls(), 0);
    }

    #[tokio::test]
    async fn test_ensure_replaces_stale_link() {
        let gateway = InMemoryGateway::new();
        let mut stale = matching_remote("order_abc");
        stale.amount = RemoteAmount::Minor(40000);
        gateway.insert(stale).await;
        let store = InMemoryOrderStore::new();
        let session = InMemorySession::with_remote_order_id("order_abc");

        let payload = reconciler(&gateway, &store)
            .ensure_remote_order(&session, &mut order())
            .await
            .unwrap();

        assert_ne!(payload.remote_order_id, "order_abc");
        assert_eq!(gateway.create_calls(), 1);
        assert_eq!(
            session.remote_order_id().await.unwrap(),
            Some(payload.remote_order_id)
        );
    }

    #[tokio::test]
    async fn test_ensure_failure_records_session_error() {
        let gateway = InMemoryGateway::new();
        gateway.fail_with("Authentication failed");
        let store = InMemoryOrderStore::new();
        let session = InMemorySession::with_remote_order_id("order_old");

        let result = reconciler(&gateway, &store)
            .ensure_remote_order(&session, &mut order())
            .await;

        assert!(matches!(result, Err(CheckoutError::GatewayError(_))));
        assert_eq!(
            session.errors().await.unwrap(),
            vec!["Razorpay Error: Authentication failed".to_string()]
        );
        assert_eq!(
            session.remote_order_id().await.unwrap().as_deref(),
            Some("order_old")
        );
        assert!(store.load("100000123").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_ensure_by_id_loads_order() {
        let gateway = InMemoryGateway::new();
        let store = InMemoryOrderStore::new();
        store.save(order()).await.unwrap();
        let session = InMemorySession::new();
        let reconciler = reconciler(&gateway, &store);

        let payload = reconciler
            .ensure_remote_order_by_id(&session, "100000123")
            .await
            .unwrap();
        assert_eq!(payload.host_order_id, "100000123");

        let missing = reconciler.ensure_remote_order_by_id(&session, "999").await;
        assert!(matches!(missing, Err(CheckoutError::OrderNotFound(id)) if id == "999"));
    }

    /// Collects formatted log output for assertions.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl LogBuffer {
        fn count(&self, needle: &str) -> usize {
            String::from_utf8_lossy(&self.0.lock().unwrap())
                .matches(needle)
                .count()
        }
    }

    fn capture_logs() -> (LogBuffer, tracing::subscriber::DefaultGuard) {
        let buffer = LogBuffer::default();
        let writer = buffer.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .with_max_level(tracing::Level::DEBUG)
            .finish();
        (buffer, tracing::subscriber::set_default(subscriber))
    }

    const VERIFIED: &str = "Razorpay order amount verified";

    #[tokio::test]
    async fn test_verified_event_only_on_full_match() {
        let gateway = InMemoryGateway::new();
        gateway.insert(matching_remote("order_abc")).await;
        let mut stale = matching_remote("order_stale");
        stale.currency = "USD".to_string();
        gateway.insert(stale).await;
        let store = InMemoryOrderStore::new();
        let reconciler = reconciler(&gateway, &store);
        let (logs, _guard) = capture_logs();

        assert!(!reconciler.verify_remote_order("order_stale", &order()).await.unwrap());
        assert_eq!(logs.count(VERIFIED), 0);

        assert!(reconciler.verify_remote_order("order_gone", &order()).await.is_err());
        assert_eq!(logs.count(VERIFIED), 0);

        assert!(reconciler.verify_remote_order("order_abc", &order()).await.unwrap());
        assert_eq!(logs.count(VERIFIED), 1);
    }

    /// Session whose error list cannot be written.
    struct ReadOnlyErrorsSession;

    #[async_trait]
    impl SessionStore for ReadOnlyErrorsSession {
        async fn remote_order_id(&self) -> Result<Option<String>> {
            Ok(None)
        }

        async fn set_remote_order_id(&self, _id: &str) -> Result<()> {
            Ok(())
        }

        async fn add_error(&self, _message: String) -> Result<()> {
            Err(CheckoutError::ValidationError("session closed".to_string()))
        }

        async fn errors(&self) -> Result<Vec<String>> {
            Ok(Vec::new())
        }
    }

    #[tokio::test]
    async fn test_gateway_error_survives_session_write_failure() {
        let gateway = InMemoryGateway::new();
        gateway.fail_with("Authentication failed");
        let store = InMemoryOrderStore::new();

        let result = reconciler(&gateway, &store)
            .ensure_remote_order(&ReadOnlyErrorsSession, &mut order())
            .await;

        match result {
            Err(CheckoutError::GatewayError(e)) => {
                assert_eq!(e.to_string(), "Authentication failed")
            }
            other => panic!("expected gateway error, got {:?}", other),
        }
    }

    struct FailingOrderStore;

    #[async_trait]
    impl OrderStore for FailingOrderStore {
        async fn load(&self, _real_order_id: &str) -> Result<Option<HostOrder>> {
            Ok(None)
        }

        async fn save(&self, _order: HostOrder) -> Result<()> {
            Err(CheckoutError::ValidationError("disk full".to_string()))
        }
    }

    #[tokio::test]
    async fn test_history_note_not_kept_when_save_fails() {
        let gateway = InMemoryGateway::new();
        let reconciler =
            OrderReconciler::new(Box::new(gateway.clone()), Box::new(FailingOrderStore));
        let session = InMemorySession::new();
        let mut order = order();

        let result = reconciler.ensure_remote_order(&session, &mut order).await;

        assert!(matches!(result, Err(CheckoutError::ValidationError(_))));
        assert!(order.status_history.is_empty());
    }

    #[tokio::test]
    async fn test_history_note_copied_back_after_save() {
        let gateway = InMemoryGateway::new();
        let store = InMemoryOrderStore::new();
        let session = InMemorySession::new();
        let mut order = order();

        reconciler(&gateway, &store)
            .ensure_remote_order(&session, &mut order)
            .await
            .unwrap();

        assert_eq!(order.status_history.len(), 1);
        assert_eq!(store.load("100000123").await.unwrap(), Some(order));
    }
}
