use crate::domain::order::HostOrder;
use crate::domain::ports::{OrderStore, SessionStore, SessionStoreBox, SessionStoreFactory};
use crate::error::{CheckoutError, Result};
use async_trait::async_trait;
use rocksdb::{ColumnFamilyDescriptor, DB, Options};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::path::Path;
use std::sync::Arc;

/// Column Family for storing host orders.
pub const CF_ORDERS: &str = "orders";
/// Column Family for storing checkout session state.
pub const CF_SESSIONS: &str = "sessions";

const KEY_REMOTE_ORDER_ID: &str = "remote_order_id";
const KEY_ERRORS: &str = "errors";

/// A persistent store implementation using RocksDB.
///
/// Keeps host orders and checkout sessions in separate Column Families, so a
/// session link survives process restarts.
///
/// This struct is thread-safe (`Clone` shares the underlying `Arc<DB>`).
#[derive(Clone)]
pub struct RocksDBStore {
    db: Arc<DB>,
}

impl RocksDBStore {
    /// Opens or creates a RocksDB instance at the specified path.
    ///
    /// Ensures that the required column families ("orders" and "sessions") exist.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let cf_orders = ColumnFamilyDescriptor::new(CF_ORDERS, Options::default());
        let cf_sessions = ColumnFamilyDescriptor::new(CF_SESSIONS, Options::default());

        let db = DB::open_cf_descriptors(&opts, path, vec![cf_orders, cf_sessions])?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Returns a handle on the persisted session `session_id`.
    pub fn session(&self, session_id: &str) -> RocksDBSession {
        RocksDBSession {
            db: self.db.clone(),
            session_id: session_id.to_string(),
        }
    }

    pub fn session_factory(&self) -> SessionStoreFactory {
        let store = self.clone();
        Box::new(move |session_id: &str| Box::new(store.session(session_id)) as SessionStoreBox)
    }
}

fn missing_cf(name: &str) -> CheckoutError {
    CheckoutError::InternalError(Box::new(std::io::Error::other(format!(
        "{} column family not found",
        name
    ))))
}

fn get_json<T: DeserializeOwned>(db: &DB, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
    let cf = db.cf_handle(cf_name).ok_or_else(|| missing_cf(cf_name))?;

    match db.get_cf(cf, key)? {
        Some(bytes) => {
            let value = serde_json::from_slice(&bytes).map_err(|e| {
                CheckoutError::InternalError(Box::new(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("Deserialization error: {}", e),
                )))
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

fn put_json<T: Serialize>(db: &DB, cf_name: &str, key: &[u8], value: &T) -> Result<()> {
    let cf = db.cf_handle(cf_name).ok_or_else(|| missing_cf(cf_name))?;

    let bytes = serde_json::to_vec(value).map_err(|e| {
        CheckoutError::InternalError(Box::new(std::io::Error::new(
            std::io::ErrorKind::InvalidData,
            format!("Serialization error: {}", e),
        )))
    })?;

    db.put_cf(cf, key, bytes)?;
    Ok(())
}

#[async_trait]
impl OrderStore for RocksDBStore {
    async fn load(&self, real_order_id: &str) -> Result<Option<HostOrder>> {
        get_json(&self.db, CF_ORDERS, real_order_id.as_bytes())
    }

    async fn save(&self, order: HostOrder) -> Result<()> {
        put_json(&self.db, CF_ORDERS, order.real_order_id.as_bytes(), &order)
    }
}

/// One checkout session persisted in the "sessions" Column Family.
#[derive(Clone)]
pub struct RocksDBSession {
    db: Arc<DB>,
    session_id: String,
}

impl RocksDBSession {
    fn key(&self, field: &str) -> Vec<u8> {
        format!("{}:{}", self.session_id, field).into_bytes()
    }
}

#[async_trait]
impl SessionStore for RocksDBSession {
    async fn remote_order_id(&self) -> Result<Option<String>> {
        get_json(&self.db, CF_SESSIONS, &self.key(KEY_REMOTE_ORDER_ID))
    }

    async fn set_remote_order_id(&self, id: &str) -> Result<()> {
        put_json(&self.db, CF_SESSIONS, &self.key(KEY_REMOTE_ORDER_ID), &id)
    }

    async fn add_error(&self, message: String) -> Result<()> {
        let mut errors = self.errors().await?;
        errors.push(message);
        put_json(&self.db, CF_SESSIONS, &self.key(KEY_ERRORS), &errors)
    }

    async fn errors(&self) -> Result<Vec<String>> {
        Ok(get_json(&self.db, CF_SESSIONS, &self.key(KEY_ERRORS))?.unwrap_or_default())
    }
}
