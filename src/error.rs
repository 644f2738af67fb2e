use thiserror::Error;

/// Failures reported by (or while talking to) the payment gateway.
///
/// The `Display` output is what the customer ends up seeing, so API errors
/// render the gateway's own description.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GatewayError {
    #[error("{description}")]
    Api {
        status: u16,
        code: String,
        description: String,
    },
    #[error("The id provided does not exist: {0}")]
    NotFound(String),
    #[error("Gateway request failed: {0}")]
    Transport(String),
    #[error("Unexpected gateway response: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error(transparent)]
    GatewayError(#[from] GatewayError),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Validation error: {0}")]
    ValidationError(String),
    #[error("Order not found: {0}")]
    OrderNotFound(String),
    #[error("Internal error: {0}")]
    InternalError(Box<dyn std::error::Error + Send + Sync>),
    #[cfg(feature = "storage-rocksdb")]
    #[error("Storage error: {0}")]
    StorageError(#[from] rocksdb::Error),
}

pub type Result<T> = std::result::Result<T, CheckoutError>;
