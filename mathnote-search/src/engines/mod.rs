//! Search provider implementations.
//!
//! Each module provides a struct implementing
//! [`crate::engine::SearchProvider`] for one external search API.

pub mod arxiv;
pub mod bing;
pub mod google;

pub use arxiv::ArxivProvider;
pub use bing::BingProvider;
pub use google::GoogleProvider;
