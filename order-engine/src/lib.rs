//! Order Settlement Engine - 餐厅点餐结算与优惠券核销
//!
//! # 架构概述
//!
//! - **优惠券** (`vouchers`): 查找、资格判定、折扣计算
//! - **订单** (`orders`): 状态机、结算提交、事件广播
//! - **会员** (`marketing`): 按已完成订单消费计算等级与积分
//! - **配置** (`core`): 环境变量配置
//!
//! # 模块结构
//!
//! ```text
//! order-engine/src/
//! ├── core/          # 配置
//! ├── marketing/     # 会员等级、积分
//! ├── orders/        # 订单账本、存储、OrdersManager
//! ├── utils/         # 日志
//! └── vouchers/      # 优惠券目录、资格、折扣
//! ```

pub mod core;
pub mod marketing;
pub mod orders;
pub mod utils;
pub mod vouchers;

// Re-export 公共类型
pub use core::Config;
pub use orders::{
    Actor, ActorRole, CheckoutRequest, EventPayload, MemoryStore, Order, OrderAction, OrderEvent,
    OrderEventType, OrderItem, OrderStatus, OrdersManager, RedbStore, SettlementStore, Topping,
};
pub use utils::error::{SettlementError, SettlementResult};
pub use vouchers::{DiscountResult, VoucherCatalog};

// Re-export logger functions
pub use utils::logger::{LogFormat, init_logger, init_logger_with_file};

/// 设置运行环境：加载 .env、创建工作目录、初始化日志
pub fn setup_environment() -> std::io::Result<Config> {
    dotenv::dotenv().ok();

    let config = Config::from_env();
    std::fs::create_dir_all(&config.work_dir)?;
    if let Some(dir) = &config.log_dir {
        std::fs::create_dir_all(dir)?;
    }
    init_logger_with_file(
        Some(&config.log_level),
        config.log_format(),
        config.log_dir.as_deref(),
    );

    tracing::info!(
        work_dir = %config.work_dir,
        environment = %config.environment,
        "Environment ready"
    );
    Ok(config)
}
