//! Listing pages, bulletin downloads and the circuit breaker guarding the origin.

pub mod circuit_breaker;
pub mod document;
pub mod http;
pub mod listing;
pub mod provider;

pub use circuit_breaker::CircuitBreaker;
pub use document::DownloadedDocument;
pub use http::{HttpDocumentSource, HttpPageFetcher, HttpSettings};
pub use listing::ListingParser;
pub use provider::{DataError, DocumentSource, PageFetcher};
