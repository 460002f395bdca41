//! Paydash HTTP client
//!
//! A typed client for the payment portal's REST API. Every call goes through
//! [`client::ApiClient::request`], which attaches the stored bearer token and
//! performs at most one token refresh and replay when the API answers 401.

pub mod client;
pub mod types;

pub use client::{ApiClient, ApiClientBuilder, AuthMode, RequestDescriptor, error::ClientError};
