//! Lenient numeric coercion for table cells.
//!
//! A dash, an empty string or anything unparsable becomes `None`; coercion
//! never fails a row.

use super::sheet::Cell;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Monetary / volume scale of the store.
pub const DECIMAL_SCALE: u32 = 2;

fn placeholder(s: &str) -> bool {
    let s = s.trim();
    s.is_empty() || s == "-"
}

/// Volume / total cells.
pub fn to_decimal(cell: &Cell) -> Option<Decimal> {
    let value = match cell {
        Cell::Empty => None,
        Cell::Number(n) if n.is_finite() => Decimal::from_f64(*n),
        Cell::Number(_) => None,
        Cell::Text(s) if placeholder(s) => None,
        Cell::Text(s) => {
            let s = s.trim();
            Decimal::from_str(s)
                .ok()
                .or_else(|| s.parse::<f64>().ok().filter(|f| f.is_finite()).and_then(Decimal::from_f64))
        }
    };
    value.map(|d| d.round_dp(DECIMAL_SCALE))
}

/// Contract-count cells. Non-integral values are treated as missing.
pub fn to_count(cell: &Cell) -> Option<i64> {
    let n = match cell {
        Cell::Empty => return None,
        Cell::Number(n) => *n,
        Cell::Text(s) if placeholder(s) => return None,
        Cell::Text(s) => {
            let s = s.trim();
            if let Ok(i) = s.parse::<i64>() {
                return Some(i);
            }
            s.parse::<f64>().ok()?
        }
    };
    (n.is_finite() && n.fract() == 0.0 && n.abs() < i64::MAX as f64).then_some(n as i64)
}
