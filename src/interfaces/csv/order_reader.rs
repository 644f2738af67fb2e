use crate::domain::order::{BillingAddress, HostOrder};
use crate::error::{CheckoutError, Result};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Read;

/// One row of the orders CSV.
#[derive(Debug, Deserialize)]
struct OrderRecord {
    order_id: String,
    status: String,
    base_grand_total: Decimal,
    grand_total: Decimal,
    base_currency: String,
    quote_currency: String,
    firstname: String,
    lastname: String,
    telephone: Option<String>,
    email: Option<String>,
}

impl From<OrderRecord> for HostOrder {
    fn from(record: OrderRecord) -> Self {
        HostOrder {
            real_order_id: record.order_id,
            base_grand_total: record.base_grand_total,
            grand_total: record.grand_total,
            base_currency_code: record.base_currency,
            quote_currency_code: record.quote_currency,
            status: record.status,
            billing_address: BillingAddress {
                firstname: record.firstname,
                lastname: record.lastname,
                telephone: record.telephone,
            },
            customer_email: record.email,
            status_history: Vec::new(),
        }
    }
}

/// Reads host orders from a CSV source.
///
/// Expects the header `order_id,status,base_grand_total,grand_total,
/// base_currency,quote_currency,firstname,lastname,telephone,email`. Empty
/// `telephone` and `email` fields are read as absent.
pub struct OrderReader<R: Read> {
    reader: csv::Reader<R>,
}

impl<R: Read> OrderReader<R> {
    /// Creates a new `OrderReader` from any `Read` source (e.g., File, Stdin).
    pub fn new(source: R) -> Self {
        let reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .flexible(true)
            .from_reader(source);
        Self { reader }
    }

    /// Returns an iterator that lazily reads and converts orders.
    pub fn orders(self) -> impl Iterator<Item = Result<HostOrder>> {
        self.reader
            .into_deserialize::<OrderRecord>()
            .map(|result| result.map(HostOrder::from).map_err(CheckoutError::from))
    }
}
