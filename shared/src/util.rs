/// 生成实体 id (UUID v4)
///
/// 订单 id 由下单设备生成，通知 id 由服务端生成，两端使用同一格式。
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
