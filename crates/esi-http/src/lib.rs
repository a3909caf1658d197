//! HTTP boundary of the ESI engine.
//!
//! This crate provides:
//! - `HttpFetch` trait - GET capability supplied by the host
//! - `resolve_uri` - Include sources resolved against the request base
//! - `HttpIncludeLoader` - Cache-aware include resolution

mod fetch;
mod loader;
mod uri;

pub use fetch::*;
pub use loader::*;
pub use uri::*;
