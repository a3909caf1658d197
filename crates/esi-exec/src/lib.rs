//! Fragment execution.
//!
//! This crate provides:
//! - `FragmentExecutor` - Per-variant dispatch, recursive and async
//! - `ExecuteInput` / `ExecuteInterceptor` - Execute-time pipelines
//! - `substitute_variables` - `$(...)` placeholder substitution

mod executor;
mod substitute;

pub use executor::*;
pub use substitute::*;
