//! Rate-limited, authenticated client for the DPClim API.
//!
//! Every request takes a slot from the [`RateLimiter`], attaches the current
//! bearer token and is retried under a bounded policy:
//! - `401`/`403`: invalidate the token and retry once with a fresh one
//! - `429`: wait for `Retry-After` and retry, up to a fixed cap
//! - `204`: returned as [`ApiResponse::NoContent`], not an error
//! - anything else non-2xx: fails immediately

mod client;
mod error;
mod limiter;
#[cfg(test)]
pub(crate) mod mock;
mod transport;

pub use client::{ApiClient, ApiResponse, DEFAULT_BASE_URL, RetryPolicy};
pub use error::ApiError;
pub use limiter::RateLimiter;
pub use transport::{HttpTransport, Transport, TransportResponse};
