//! Shared types for the order settlement engine
//!
//! Domain models, order records and events, error codes, and small
//! utilities used by the engine and anything embedding it.

pub mod error;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{AppError, ErrorCategory, ErrorCode};
