// HTTP client wrapper for the admin REST backend
pub mod client;
pub mod error;
pub mod request;
pub mod transport;

// Re-export common types
pub use client::HttpClient;
pub use error::{ApiError, Result};
pub use request::{ApiRequest, FormPart, Method, RequestBody};
pub use transport::{StaticToken, TokenSource, Transport};
