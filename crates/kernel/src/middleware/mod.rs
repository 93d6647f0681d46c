//! HTTP request extractors.

pub mod bearer_auth;

pub use bearer_auth::{OptionalCaller, RequiredCaller, TokenClaims, issue_token};
