//! Backing-store API module.
//!
//! This module provides the `BackendClient` for reading lessons and students
//! and invoking edge functions, the typed `FetchError` every remote call
//! returns, and the `RetryPolicy` the client applies to each request.
//!
//! The client is constructed explicitly from configuration and passed to
//! whoever needs it; there is no global instance.

pub mod client;
pub mod error;
pub mod retry;

pub use client::BackendClient;
pub use error::{FetchError, FetchErrorKind};
pub use retry::{retry, RetryPolicy};
