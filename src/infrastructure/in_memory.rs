use crate::domain::order::HostOrder;
use crate::domain::ports::{
    ConfigProvider, OrderStore, PaymentGateway, SessionStore, SessionStoreBox, SessionStoreFactory,
};
use crate::domain::remote_order::{CreateOrderRequest, RemoteAmount, RemoteOrder};
use crate::error::{GatewayError, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::RwLock;

/// A thread-safe in-memory store for host orders, keyed by real order id.
///
/// Ideal for testing or for embedding where the host keeps its own records.
#[derive(Default, Clone)]
pub struct InMemoryOrderStore {
    orders: Arc<RwLock<HashMap<String, HostOrder>>>,
}

impl InMemoryOrderStore {
    /// Creates a new, empty in-memory order store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for InMemoryOrderStore {
    async fn load(&self, real_order_id: &str) -> Result<Option<HostOrder>> {
        let orders = self.orders.read().await;
        Ok(orders.get(real_order_id).cloned())
    }

    async fn save(&self, order: HostOrder) -> Result<()> {
        let mut orders = self.orders.write().await;
        orders.insert(order.real_order_id.clone(), order);
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SessionState {
    remote_order_id: Option<String>,
    errors: Vec<String>,
}

/// One checkout session held in memory. Clones share the same state.
#[derive(Default, Clone)]
pub struct InMemorySession {
    state: Arc<RwLock<SessionState>>,
}

impl InMemorySession {
    /// Creates a session with no linked gateway order.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_remote_order_id(id: impl Into<String>) -> Self {
        Self {
            state: Arc::new(RwLock::new(SessionState {
                remote_order_id: Some(id.into()),
                errors: Vec::new(),
            })),
        }
    }
}

#[async_trait]
impl SessionStore for InMemorySession {
    async fn remote_order_id(&self) -> Result<Option<String>> {
        let state = self.state.read().await;
        Ok(state.remote_order_id.clone())
    }

    async fn set_remote_order_id(&self, id: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.remote_order_id = Some(id.to_string());
        Ok(())
    }

    async fn add_error(&self, message: String) -> Result<()> {
        let mut state = self.state.write().await;
        state.errors.push(message);
        Ok(())
    }

    async fn errors(&self) -> Result<Vec<String>> {
        let state = self.state.read().await;
        Ok(state.errors.clone())
    }
}

/// Registry of in-memory sessions, keyed by session id.
#[derive(Default, Clone)]
pub struct InMemorySessions {
    sessions: Arc<Mutex<HashMap<String, InMemorySession>>>,
}

impl InMemorySessions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the session for `session_id`, creating it on first use.
    pub fn session(&self, session_id: &str) -> InMemorySession {
        let mut sessions = self.sessions.lock().unwrap_or_else(PoisonError::into_inner);
        sessions.entry(session_id.to_string()).or_default().clone()
    }

    pub fn factory(&self) -> SessionStoreFactory {
        let sessions = self.clone();
        Box::new(move |session_id: &str| {
            Box::new(sessions.session(session_id)) as SessionStoreBox
        })
    }
}

/// Sandbox stand-in for the gateway's order API.
///
/// Created orders get sequential ids (`order_sandbox1`, ...). Fetches are
/// served from the orders created or inserted so far. Clones share state, so
/// a test can keep a handle and inspect the call counters.
#[derive(Default, Clone)]
pub struct InMemoryGateway {
    orders: Arc<RwLock<HashMap<String, RemoteOrder>>>,
    failure: Arc<Mutex<Option<GatewayError>>>,
    create_failure: Arc<Mutex<Option<GatewayError>>>,
    next_id: Arc<AtomicUsize>,
    fetch_calls: Arc<AtomicUsize>,
    create_calls: Arc<AtomicUsize>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds an order as if the gateway already knew it.
    pub async fn insert(&self, order: RemoteOrder) {
        let mut orders = self.orders.write().await;
        orders.insert(order.id.clone(), order);
    }

    /// Makes every subsequent call fail with an API error carrying `description`.
    pub fn fail_with(&self, description: impl Into<String>) {
        set_failure(&self.failure, description.into());
    }

    /// Like [`fail_with`](Self::fail_with), but only order creation fails;
    /// fetches keep being served.
    pub fn fail_create_with(&self, description: impl Into<String>) {
        set_failure(&self.create_failure, description.into());
    }

    pub fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub fn create_calls(&self) -> usize {
        self.create_calls.load(Ordering::SeqCst)
    }
}

fn set_failure(slot: &Mutex<Option<GatewayError>>, description: String) {
    let mut failure = slot.lock().unwrap_or_else(PoisonError::into_inner);
    *failure = Some(GatewayError::Api {
        status: 400,
        code: "BAD_REQUEST_ERROR".to_string(),
        description,
    });
}

fn check_failure(slot: &Mutex<Option<GatewayError>>) -> std::result::Result<(), GatewayError> {
    let failure = slot.lock().unwrap_or_else(PoisonError::into_inner);
    match failure.as_ref() {
        Some(err) => Err(err.clone()),
        None => Ok(()),
    }
}

#[async_trait]
impl PaymentGateway for InMemoryGateway {
    async fn fetch_order(&self, id: &str) -> std::result::Result<RemoteOrder, GatewayError> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        check_failure(&self.failure)?;

        let orders = self.orders.read().await;
        orders
            .get(id)
            .cloned()
            .ok_or_else(|| GatewayError::NotFound(id.to_string()))
    }

    async fn create_order(
        &self,
        request: &CreateOrderRequest,
    ) -> std::result::Result<RemoteOrder, GatewayError> {
        self.create_calls.fetch_add(1, Ordering::SeqCst);
        check_failure(&self.failure)?;
        check_failure(&self.create_failure)?;

        let n = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let order = RemoteOrder {
            id: format!("order_sandbox{}", n),
            amount: RemoteAmount::Minor(request.amount),
            currency: request.currency.clone(),
            receipt: Some(request.receipt.clone()),
            status: Some("created".to_string()),
            attempts: 0,
            created_at: None,
        };

        let mut orders = self.orders.write().await;
        orders.insert(order.id.clone(), order.clone());
        Ok(order)
    }
}

/// Map-backed configuration.
#[derive(Debug, Default, Clone)]
pub struct InMemoryConfig {
    values: HashMap<String, String>,
}

impl InMemoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, path: &str, value: impl Into<String>) -> Self {
        self.values.insert(path.to_string(), value.into());
        self
    }
}

impl ConfigProvider for InMemoryConfig {
    fn value(&self, path: &str) -> Option<String> {
        self.values.get(path).cloned()
    }
}
