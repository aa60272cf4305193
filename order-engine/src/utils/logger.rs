//! 日志初始化
//!
//! 输出到 stdout，或在 `log_dir` 存在时写入按天滚动的文件。
//! `RUST_LOG` 优先于配置中的 LOG_LEVEL。生产环境输出 JSON 行。

use std::path::Path;
use tracing_subscriber::EnvFilter;

/// 日志文件名前缀 (order-engine.YYYY-MM-DD)
const LOG_FILE_PREFIX: &str = "order-engine";

/// 日志行格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// 人类可读 (开发)
    #[default]
    Text,
    /// 每行一个 JSON 对象 (生产，便于采集)
    Json,
}

/// 过滤器: RUST_LOG > `level` > info
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// stdout 文本日志，info 级别
pub fn init_logger() {
    init_logger_with_file(None, LogFormat::Text, None);
}

/// 按级别、格式和可选日志目录初始化全局 subscriber
///
/// 已有全局 subscriber 时保留原有的，不报错。
pub fn init_logger_with_file(log_level: Option<&str>, format: LogFormat, log_dir: Option<&str>) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(build_filter(log_level.unwrap_or("info")))
        .with_target(false);

    let file_appender = log_dir
        .map(Path::new)
        .filter(|dir| dir.is_dir())
        .map(|dir| tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX));
    let to_file = file_appender.is_some();

    let result = match (format, file_appender) {
        (LogFormat::Json, Some(writer)) => builder.json().with_writer(writer).try_init(),
        (LogFormat::Json, None) => builder.json().try_init(),
        (LogFormat::Text, Some(writer)) => builder.with_ansi(false).with_writer(writer).try_init(),
        (LogFormat::Text, None) => builder.try_init(),
    };

    match result {
        Ok(()) => tracing::debug!(?format, to_file, "Logger initialized"),
        Err(_) => tracing::debug!("Global subscriber already set, keeping it"),
    }
}
