//! Tile payload sources
//!
//! This module provides the HTTP client abstraction the fetch scheduler
//! downloads through, and the URL templates layers use to turn a tile address
//! into a request URL.
//!
//! ```ignore
//! use terrastream::provider::{AsyncReqwestClient, UrlTemplate};
//!
//! let client = AsyncReqwestClient::new()?;
//! let template = UrlTemplate::parse("https://tiles.example.com/{z}/{x}/{y}.png")?;
//! let body = client.get(&template.expand(&address, 256)).await?;
//! ```

mod http;
mod template;
mod types;

pub use http::{
    AsyncHttpClient, AsyncReqwestClient, DEFAULT_POOL_MAX_IDLE_PER_HOST, DEFAULT_TIMEOUT_SECS,
};
pub use template::{TemplateError, UrlTemplate};
pub use types::ProviderError;

#[cfg(test)]
pub use http::tests::{GatedHttpClient, MockAsyncHttpClient};
