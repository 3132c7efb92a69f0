//! # Host Bridge Traits
//!
//! Capability traits the agent core depends on, implemented per host.
//!
//! ## Overview
//!
//! The sync pipeline never talks to the network or the wall clock directly.
//! It goes through the traits in this crate so the same code runs against
//! `reqwest` in production and against in-memory fakes in tests.
//!
//! ## Traits
//!
//! - [`HttpClient`](http::HttpClient) - Single-attempt async HTTP with per-request timeouts
//! - [`Clock`](time::Clock) - Time source for the daily scheduler
//!
//! ## Error Handling
//!
//! All bridge traits use the [`BridgeError`](error::BridgeError) type. Implementations
//! should convert transport errors into `Timeout` or `Connection` where possible so
//! callers can report them precisely.
//!
//! ## Examples
//!
//! ### Implementing HttpClient
//!
//! ```ignore
//! use bridge_traits::http::{HttpClient, HttpRequest, HttpResponse};
//! use bridge_traits::error::Result;
//! use async_trait::async_trait;
//!
//! pub struct MyHttpClient {
//!     client: reqwest::Client,
//! }
//!
//! #[async_trait]
//! impl HttpClient for MyHttpClient {
//!     async fn execute(&self, request: HttpRequest) -> Result<HttpResponse> {
//!         // Implementation
//!         todo!()
//!     }
//! }
//! ```

pub mod error;
pub mod http;
pub mod time;

pub use error::BridgeError;

// Re-export commonly used types
pub use http::{HttpClient, HttpMethod, HttpRequest, HttpResponse, RetryPolicy};
pub use time::{Clock, LogLevel, SystemClock};
