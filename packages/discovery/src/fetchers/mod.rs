//! Page client implementations.

pub mod http;

pub use http::HttpPageClient;
