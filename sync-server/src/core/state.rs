use std::sync::Arc;

use crate::auth::JwtService;
use crate::core::{Config, Result};
use crate::notify::{NotificationFanout, NotificationHub};
use crate::orders::OrderService;
use crate::store::OrderStore;

/// 服务器状态 - 持有所有服务的单例引用
///
/// 使用 Arc / 内部共享实现浅拷贝，每个请求克隆一份。
///
/// # 服务组件
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 配置项 (不可变) |
/// | store | OrderStore | 嵌入式 redb 订单库 |
/// | hub | NotificationHub | 实时推送频道 |
/// | orders | OrderService | 同步、状态机、改单审批 |
/// | jwt_service | Arc<JwtService> | JWT 认证服务 |
#[derive(Clone)]
pub struct ServerState {
    /// 服务器配置
    pub config: Config,
    /// 规范订单库
    pub store: OrderStore,
    /// 推送频道
    pub hub: NotificationHub,
    /// 订单写入服务 (所有写入者共享同一路径)
    pub orders: OrderService,
    /// JWT 认证服务 (Arc 共享所有权)
    pub jwt_service: Arc<JwtService>,
}

impl ServerState {
    /// 使用已打开的存储组装状态
    pub fn new(config: Config, store: OrderStore, jwt_service: Arc<JwtService>) -> Self {
        let hub = NotificationHub::new(config.hub_channel_capacity);
        let fanout = NotificationFanout::new(store.clone(), hub.clone());
        let orders = OrderService::new(store.clone(), fanout, config.server_node_id.clone());
        Self {
            config,
            store,
            hub,
            orders,
            jwt_service,
        }
    }

    /// 初始化服务器状态
    ///
    /// 按顺序初始化：
    /// 1. 工作目录
    /// 2. 数据库 (work_dir/sync.redb)
    /// 3. 推送频道、订单服务、JWT
    pub fn initialize(config: &Config) -> Result<Self> {
        config.ensure_work_dir()?;
        let store = OrderStore::open(config.database_path())?;
        tracing::info!(path = %config.database_path().display(), "Order store opened");
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        Ok(Self::new(config.clone(), store, jwt_service))
    }

    /// 内存数据库状态 (测试、临时节点)
    pub fn in_memory(config: &Config) -> Result<Self> {
        let store = OrderStore::open_in_memory()?;
        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        Ok(Self::new(config.clone(), store, jwt_service))
    }

    /// 获取 JWT 服务
    pub fn get_jwt_service(&self) -> Arc<JwtService> {
        self.jwt_service.clone()
    }
}
