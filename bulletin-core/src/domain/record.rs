//! Normalized trade record: one product's trading activity for one date.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One normalized bulletin row.
///
/// `(exchange_product_id, trade_date)` is the dedup key: the store holds at
/// most one record per key and never updates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub exchange_product_id: String,
    pub exchange_product_name: String,
    pub oil_id: String,
    pub delivery_basis_id: String,
    pub delivery_basis_name: String,
    pub delivery_type_id: String,
    pub volume: Option<Decimal>,
    pub total: Option<Decimal>,
    pub count: i64,
    pub trade_date: NaiveDate,
}

impl TradeRecord {
    /// Build a record, deriving the oil / basis / delivery-type ids from the product id.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        exchange_product_id: impl Into<String>,
        exchange_product_name: impl Into<String>,
        delivery_basis_name: impl Into<String>,
        volume: Option<Decimal>,
        total: Option<Decimal>,
        count: i64,
        trade_date: NaiveDate,
    ) -> Self {
        let exchange_product_id = exchange_product_id.into();
        let parts = split_product_id(&exchange_product_id);
        Self {
            exchange_product_id,
            exchange_product_name: exchange_product_name.into(),
            oil_id: parts.oil_id,
            delivery_basis_id: parts.delivery_basis_id,
            delivery_basis_name: delivery_basis_name.into(),
            delivery_type_id: parts.delivery_type_id,
            volume,
            total,
            count,
            trade_date,
        }
    }

    /// The dedup key.
    pub fn key(&self) -> (&str, NaiveDate) {
        (&self.exchange_product_id, self.trade_date)
    }
}

/// Fixed-offset components of an exchange product id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCodeParts {
    pub oil_id: String,
    pub delivery_basis_id: String,
    pub delivery_type_id: String,
}

/// Slice a product id such as `A592UFM060F` into `A592` / `UFM` / `F`.
///
/// Works on characters, not bytes; ids shorter than the layout yield
/// whatever characters are present.
pub fn split_product_id(product_id: &str) -> ProductCodeParts {
    let chars: Vec<char> = product_id.chars().collect();
    let slice = |from: usize, to: usize| -> String {
        let to = to.min(chars.len());
        let from = from.min(to);
        chars[from..to].iter().collect()
    };

    ProductCodeParts {
        oil_id: slice(0, 4),
        delivery_basis_id: slice(4, 7),
        delivery_type_id: chars.last().map(|c| c.to_string()).unwrap_or_default(),
    }
}
