//! aqua-core - Shared types for the aqua transport layer
//!
//! This crate provides the error taxonomy, the result buffer used by the
//! functional transport tier, the timeout/deadline model, and the polling
//! primitive every bounded wait is built on.

pub mod buffer;
pub mod error;
pub mod poll;
pub mod timeout;

pub use buffer::*;
pub use error::*;
pub use poll::*;
pub use timeout::*;
