//! Network access.
//!
//! Strategies reach the network through the [`NetworkBackend`] trait so the
//! transport can be swapped: [`HttpBackend`] for real requests,
//! [`OfflineBackend`] when the user forces cache-only operation, and scripted
//! mocks in tests.

pub mod backend;
pub mod http;

pub use backend::{FetchedResponse, NetworkBackend, OfflineBackend, Request};
pub use http::HttpBackend;
