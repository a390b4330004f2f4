//! Domain types shared by every pipeline stage.

pub mod link;
pub mod record;

pub use link::BulletinLink;
pub use record::{split_product_id, ProductCodeParts, TradeRecord};
