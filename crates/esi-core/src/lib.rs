//! Core abstractions for the ESI engine.
//!
//! This crate provides the fundamental types and traits:
//! - `Fragment` - The parsed content tree
//! - `RequestDescriptor` - The request a body is rendered for
//! - `ExecutionContext` - Per-request state and variable bindings
//! - `IncludeLoader` trait - Capability for resolving includes

mod context;
mod fragment;
mod include;

pub use context::*;
pub use fragment::*;
pub use include::*;
