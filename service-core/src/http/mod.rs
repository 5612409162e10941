//! Outbound HTTP utilities shared by services that call third-party REST APIs.

pub mod retry;

pub use retry::{RetryConfig, Transient, retry_http_call};
