use crate::utils::logger::LogFormat;
use std::path::PathBuf;

/// redb 数据库文件名 (位于 WORK_DIR 下)
pub const DB_FILE_NAME: &str = "orders.redb";

/// 冲突重试次数上限 (含首次尝试)
pub const MAX_COMMIT_ATTEMPTS: u32 = 3;

/// 引擎配置 - 结算引擎的所有配置项
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | /var/lib/crab/orders | 工作目录 (redb 文件、日志) |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_DIR | (未设置) | 日志目录，设置后启用文件日志 |
/// | EVENT_CHANNEL_CAPACITY | 1024 | 事件广播缓冲区大小 |
/// | POINTS_PER_UNIT | 10000 | 每积分对应的消费金额 |
/// | MAX_COMMIT_ATTEMPTS | 3 | 并发冲突最大尝试次数 (1..=3) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/crab POINTS_PER_UNIT=5000 cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录，存储 redb 数据库
    pub work_dir: String,
    /// 运行环境: development | staging | production
    pub environment: String,
    /// tracing 最大日志级别
    pub log_level: String,
    /// 文件日志目录
    pub log_dir: Option<String>,
    /// 订单事件广播缓冲区
    pub event_channel_capacity: usize,
    /// 每多少金额积 1 分
    pub points_per_unit: i64,
    /// 提交冲突时的最大尝试次数
    pub max_commit_attempts: u32,
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "/var/lib/crab/orders".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.trim().is_empty()),
            event_channel_capacity: std::env::var("EVENT_CHANNEL_CAPACITY")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(1024),
            points_per_unit: std::env::var("POINTS_PER_UNIT")
                .ok()
                .and_then(|v| v.parse().ok())
                .filter(|v| *v > 0)
                .unwrap_or(10_000),
            max_commit_attempts: std::env::var("MAX_COMMIT_ATTEMPTS")
                .ok()
                .and_then(|v| v.parse::<u32>().ok())
                .unwrap_or(MAX_COMMIT_ATTEMPTS)
                .clamp(1, MAX_COMMIT_ATTEMPTS),
        }
    }

    /// 使用自定义工作目录覆盖配置
    ///
    /// 常用于测试场景
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    /// redb 数据库文件路径
    pub fn db_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join(DB_FILE_NAME)
    }

    /// 生产环境输出 JSON 日志，其余环境输出文本
    pub fn log_format(&self) -> LogFormat {
        if self.environment.eq_ignore_ascii_case("production") {
            LogFormat::Json
        } else {
            LogFormat::Text
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
