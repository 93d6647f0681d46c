//! Commons social backend kernel.
//!
//! Filter sets turn query-string parameters into querysets, the paginator
//! slices them into pages and serializers shape each row for the caller.
//! The `commons` binary serves them over HTTP; this library exposes the
//! same pieces for integration testing.

pub mod config;
pub mod db;
pub mod error;
pub mod filter;
pub mod middleware;
pub mod models;
pub mod pagination;
pub mod query;
pub mod routes;
pub mod serialize;
pub mod state;
