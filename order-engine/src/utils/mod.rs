//! 工具模块 - 错误类型、日志初始化

pub mod error;
pub mod logger;

pub use error::{SettlementError, SettlementResult};
