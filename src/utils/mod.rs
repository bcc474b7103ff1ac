//! Utility functions and helpers.

pub mod http;
pub mod log;
pub mod retry;
pub mod url;

pub use http::{HttpRequest, HttpResponse, HttpTransport, ReqwestTransport};
pub use retry::RetryPolicy;
