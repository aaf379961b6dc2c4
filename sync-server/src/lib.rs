//! Sync Server - 离线优先的订单同步与冲突裁决服务
//!
//! # 架构概述
//!
//! 员工设备离线时在本地修改订单，联网后批量推送快照。服务端用向量时钟裁决
//! 每一份快照是否覆盖规范副本，驱动订单状态机和改单审批，并把通知按角色
//! 扇出到持久化存储与实时推送频道。
//!
//! # 模块结构
//!
//! ```text
//! sync-server/src/
//! ├── core/          # 配置、状态、错误、HTTP 服务器
//! ├── auth/          # JWT 认证、员工上下文
//! ├── store/         # redb 规范订单库
//! ├── orders/        # 同步裁决、状态机、改单审批
//! ├── notify/        # 通知扇出、推送频道
//! ├── api/           # HTTP 路由、WebSocket hub
//! └── utils/         # 日志、错误类型
//! ```

pub mod api;
pub mod auth;
pub mod core;
pub mod notify;
pub mod orders;
pub mod store;
pub mod utils;

// Re-export 公共类型
pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use notify::{NotificationFanout, NotificationHub};
pub use orders::OrderService;
pub use store::OrderStore;
pub use utils::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

// Security logging macro - 支持 tracing 格式说明符
#[macro_export]
macro_rules! security_log {
    ($level:expr, $event:expr, $($key:ident = $value:expr),*) => {
        tracing::info!(
            target: "security",
            level = $level,
            event = $event,
            $($key = $value),*
        );
    };
}

/// 设置运行环境: 加载 .env、初始化日志
pub fn setup_environment() -> Config {
    // .env 不存在时使用进程环境变量
    let _ = dotenv::dotenv();
    let config = Config::from_env();
    init_logger_with_file(Some(&config.log_level), config.log_dir.as_deref());
    config
}

pub fn print_banner() {
    println!(
        r#"
   _____
  / ___/__  ______  _____
  \__ \/ / / / __ \/ ___/
 ___/ / /_/ / / / / /__
/____/\__, /_/ /_/\___/
     /____/  order sync {}
    "#,
        env!("CARGO_PKG_VERSION")
    );
}
