//! Security: credential handling and SSRF protection for evidence fetches.

pub mod credentials;
pub mod url_validator;

pub use credentials::BackendCredentials;
pub use url_validator::UrlValidator;
