//! 设备同步 wire 格式与边界转换
//!
//! 设备上传/拉取的订单形状 ([`OrderSnapshotDto`]) 仍使用 JSON 字符串字段
//! (`itemsJson`, `pendingAmendmentsJson`, `vectorClock`)，进入服务端前统一
//! 转换为 [`IncomingSnapshot`]，解析失败成为显式的 [`SnapshotError`]。
//!
//! 时钟保持编码形式，由调用方用 `compare_encoded` 比较，
//! 这样单个损坏的时钟只会让该订单失败关闭，不会拖垮整批。

use super::model::{Order, parse_table_ids};
use super::money::{money_eq, validate_line_item};
use super::types::{AmendmentDelta, DiscountType, LineItem, OrderStatus};
use crate::clock::VectorClock;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

fn empty_array() -> String {
    "[]".to_string()
}

fn empty_object() -> String {
    "{}".to_string()
}

fn one() -> i32 {
    1
}

fn yes() -> bool {
    true
}

/// 订单同步 DTO (设备 ↔ 服务端)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderSnapshotDto {
    pub order_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    /// 逗号拼接的桌台 id
    #[serde(default)]
    pub table_id: String,
    #[serde(default)]
    pub total_amount: f64,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workflow_status: Option<String>,
    /// 序列化的订单行；旧设备字段名为 `metadataJson`
    #[serde(default = "empty_array", alias = "metadataJson")]
    pub items_json: String,
    #[serde(default = "empty_array")]
    pub pending_amendments_json: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "one")]
    pub guest_count: i32,
    #[serde(default)]
    pub payment_method: String,
    #[serde(default = "empty_object")]
    pub vector_clock: String,
    #[serde(default = "Utc::now")]
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub service_charge: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub discount_type: String,
    #[serde(default)]
    pub discount_reason: String,
    #[serde(default)]
    pub final_total: Option<f64>,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    #[serde(default = "yes")]
    pub can_amend: bool,
}

/// 边界转换错误
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    #[error("snapshot is missing orderId")]
    MissingOrderId,

    #[error("order {order_id}: unknown status '{status}'")]
    UnknownStatus { order_id: String, status: String },

    #[error("order {order_id}: malformed itemsJson: {reason}")]
    MalformedItems { order_id: String, reason: String },

    #[error("order {order_id}: malformed pendingAmendmentsJson: {reason}")]
    MalformedAmendments { order_id: String, reason: String },

    #[error("order {order_id}: invalid line item: {reason}")]
    InvalidLineItem { order_id: String, reason: String },
}

impl SnapshotError {
    pub fn order_id(&self) -> Option<&str> {
        match self {
            SnapshotError::MissingOrderId => None,
            SnapshotError::UnknownStatus { order_id, .. }
            | SnapshotError::MalformedItems { order_id, .. }
            | SnapshotError::MalformedAmendments { order_id, .. }
            | SnapshotError::InvalidLineItem { order_id, .. } => Some(order_id),
        }
    }
}

/// 经过校验的设备快照
#[derive(Debug, Clone, PartialEq)]
pub struct IncomingSnapshot {
    pub order_id: String,
    pub staff_id: Option<String>,
    pub customer_id: Option<String>,
    pub customer_name: String,
    pub table_ids: BTreeSet<String>,
    pub status: OrderStatus,
    pub items: Vec<LineItem>,
    pub pending_amendment: Vec<AmendmentDelta>,
    pub notes: String,
    pub guest_count: i32,
    pub payment_method: Option<String>,
    /// 编码形式，比较时再解析
    pub clock_json: String,
    pub created_at: DateTime<Utc>,
    pub service_charge: f64,
    pub discount: f64,
    pub discount_type: DiscountType,
    pub discount_reason: Option<String>,
    pub final_total: Option<f64>,
    pub paid_at: Option<DateTime<Utc>>,
    pub can_amend: bool,
    /// 设备自报的 totalAmount，仅用于和服务端重算结果对比
    pub reported_total: f64,
}

fn parse_json_list<T: serde::de::DeserializeOwned>(raw: &str) -> Result<Vec<T>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed == "null" {
        return Ok(Vec::new());
    }
    serde_json::from_str(trimmed).map_err(|e| e.to_string())
}

fn non_empty(s: String) -> Option<String> {
    if s.trim().is_empty() { None } else { Some(s) }
}

impl OrderSnapshotDto {
    /// 校验并转换为类型化快照
    pub fn into_typed(self) -> Result<IncomingSnapshot, SnapshotError> {
        if self.order_id.trim().is_empty() {
            return Err(SnapshotError::MissingOrderId);
        }
        let order_id = self.order_id;

        // workflowStatus 是权威状态，缺失时使用旧字段
        let raw_status = self.workflow_status.as_deref().unwrap_or(&self.status);
        let status = raw_status
            .parse::<OrderStatus>()
            .map_err(|_| SnapshotError::UnknownStatus {
                order_id: order_id.clone(),
                status: raw_status.to_string(),
            })?;

        let items = parse_json_list::<LineItem>(&self.items_json).map_err(|reason| {
            SnapshotError::MalformedItems {
                order_id: order_id.clone(),
                reason,
            }
        })?;
        let pending_amendment = parse_json_list::<AmendmentDelta>(&self.pending_amendments_json)
            .map_err(|reason| SnapshotError::MalformedAmendments {
                order_id: order_id.clone(),
                reason,
            })?;

        // 订单行与改单新增行在进入任何金额计算前校验范围
        let added = pending_amendment.iter().filter_map(|delta| match delta {
            AmendmentDelta::Add { item } => Some(item),
            AmendmentDelta::Delete { .. } => None,
        });
        for item in items.iter().chain(added) {
            validate_line_item(item).map_err(|reason| SnapshotError::InvalidLineItem {
                order_id: order_id.clone(),
                reason,
            })?;
        }

        Ok(IncomingSnapshot {
            order_id,
            staff_id: self.staff_id.and_then(non_empty),
            customer_id: self.customer_id.and_then(non_empty),
            customer_name: self.customer_name,
            table_ids: parse_table_ids(&self.table_id),
            status,
            items,
            pending_amendment,
            notes: self.notes,
            guest_count: self.guest_count,
            payment_method: non_empty(self.payment_method),
            clock_json: self.vector_clock,
            created_at: self.created_at,
            service_charge: self.service_charge,
            discount: self.discount,
            discount_type: DiscountType::parse_lenient(&self.discount_type),
            discount_reason: non_empty(self.discount_reason),
            final_total: self.final_total,
            paid_at: self.paid_at,
            can_amend: self.can_amend,
            reported_total: self.total_amount,
        })
    }
}

impl IncomingSnapshot {
    /// 覆盖订单的可变字段 (不含状态、时钟、历史、版本)
    ///
    /// totalAmount 始终由订单行重算；finalTotal 仅在设备给出正值时保留。
    /// 快照未携带 staffId / customerId 时保留已有关联 (旧设备不发送这两个字段)。
    pub fn overwrite(&self, order: &mut Order) {
        order.staff_id = self.staff_id.clone().or(order.staff_id.take());
        order.customer_id = self.customer_id.clone().or(order.customer_id.take());
        order.customer_name = self.customer_name.clone();
        order.table_ids = self.table_ids.clone();
        order.items = self.items.clone();
        order.pending_amendment = self.pending_amendment.clone();
        order.notes = self.notes.clone();
        order.guest_count = self.guest_count;
        order.payment_method = self.payment_method.clone();
        order.service_charge = self.service_charge;
        order.discount = self.discount;
        order.discount_type = self.discount_type;
        order.discount_reason = self.discount_reason.clone();
        order.paid_at = self.paid_at.or(order.paid_at);
        order.recompute_totals();
        if let Some(final_total) = self.final_total.filter(|v| *v > 0.0) {
            order.final_total = final_total;
        }
    }

    /// 构建新的订单 (不含历史，由调用方追加)
    pub fn to_order(&self, tenant_id: &str, clock: VectorClock) -> Order {
        let mut order = Order::new(self.order_id.clone(), tenant_id);
        self.overwrite(&mut order);
        order.status = self.status;
        order.workflow_status = self.status;
        order.created_at = self.created_at;
        order.can_amend = self.can_amend && self.status != OrderStatus::Paid;
        order.vector_clock = clock;
        order
    }

    /// 设备自报总额与订单行不一致
    pub fn total_mismatch(&self) -> bool {
        !self.items.is_empty() && !money_eq(self.reported_total, Order::sum_items(&self.items))
    }
}

impl Order {
    /// 对任意订单行求和
    pub fn sum_items(items: &[LineItem]) -> f64 {
        use super::money::to_f64;
        to_f64(items.iter().map(LineItem::line_total).sum())
    }

    /// 转换为 wire 形状 (GET /orders、设备上传)
    pub fn to_snapshot(&self) -> OrderSnapshotDto {
        OrderSnapshotDto {
            order_id: self.id.clone(),
            staff_id: self.staff_id.clone(),
            customer_name: self.customer_name.clone(),
            customer_id: self.customer_id.clone(),
            table_id: self.table_id_string(),
            total_amount: self.total_amount,
            status: self.status.to_string(),
            workflow_status: Some(self.workflow_status.to_string()),
            items_json: serde_json::to_string(&self.items).unwrap_or_else(|_| empty_array()),
            pending_amendments_json: serde_json::to_string(&self.pending_amendment)
                .unwrap_or_else(|_| empty_array()),
            notes: self.notes.clone(),
            guest_count: self.guest_count,
            payment_method: self.payment_method.clone().unwrap_or_default(),
            vector_clock: self.vector_clock.encode(),
            created_at: self.created_at,
            service_charge: self.service_charge,
            discount: self.discount,
            discount_type: self.discount_type.as_str().to_string(),
            discount_reason: self.discount_reason.clone().unwrap_or_default(),
            final_total: Some(self.final_total),
            paid_at: self.paid_at,
            can_amend: self.can_amend,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_json() -> &'static str {
        r#"{
            "orderId": "6f1c1b9e-0000-4000-8000-000000000001",
            "customerName": "Walk-in",
            "tableId": "3,4",
            "totalAmount": 19.0,
            "status": "Placed",
            "metadataJson": "[{\"id\":\"p1\",\"name\":\"Pizza\",\"price\":9.5,\"qty\":2}]",
            "pendingAmendmentsJson": "[]",
            "vectorClock": "{\"tab-1\":1}",
            "createdAt": "2025-03-01T12:00:00Z",
            "discountType": "none",
            "paymentMethod": ""
        }"#
    }

    #[test]
    fn test_legacy_payload_converts() {
        let dto: OrderSnapshotDto = serde_json::from_str(device_json()).unwrap();
        let snap = dto.into_typed().unwrap();
        assert_eq!(snap.status, OrderStatus::Placed);
        assert_eq!(snap.items, vec![LineItem::new("p1", "Pizza", 9.5, 2)]);
        assert_eq!(snap.table_ids.len(), 2);
        assert_eq!(snap.payment_method, None);
        assert_eq!(snap.guest_count, 1);
        assert!(!snap.total_mismatch());
    }

    #[test]
    fn test_malformed_items_is_explicit_error() {
        let mut dto: OrderSnapshotDto = serde_json::from_str(device_json()).unwrap();
        dto.items_json = "[{\"id\":".to_string();
        assert!(matches!(
            dto.into_typed(),
            Err(SnapshotError::MalformedItems { .. })
        ));
    }

    #[test]
    fn test_malformed_amendments_is_explicit_error() {
        let mut dto: OrderSnapshotDto = serde_json::from_str(device_json()).unwrap();
        dto.pending_amendments_json = r#"[{"type":"replace"}]"#.to_string();
        let err = dto.into_typed().unwrap_err();
        assert!(matches!(err, SnapshotError::MalformedAmendments { .. }));
        assert_eq!(err.order_id(), Some("6f1c1b9e-0000-4000-8000-000000000001"));
    }

    #[test]
    fn test_out_of_range_line_items_rejected() {
        let mut dto: OrderSnapshotDto = serde_json::from_str(device_json()).unwrap();
        dto.items_json = r#"[{"id":"p1","name":"Pizza","price":1e20,"qty":1000000000}]"#.to_string();
        assert!(matches!(
            dto.into_typed(),
            Err(SnapshotError::InvalidLineItem { .. })
        ));

        let mut dto: OrderSnapshotDto = serde_json::from_str(device_json()).unwrap();
        dto.pending_amendments_json =
            r#"[{"type":"add","item":{"id":"p2","name":"Water","price":1.0,"qty":-2}}]"#.to_string();
        let err = dto.into_typed().unwrap_err();
        assert!(matches!(err, SnapshotError::InvalidLineItem { .. }));
        assert_eq!(err.order_id(), Some("6f1c1b9e-0000-4000-8000-000000000001"));
    }

    #[test]
    fn test_missing_customer_id_keeps_existing_link() {
        let dto: OrderSnapshotDto = serde_json::from_str(device_json()).unwrap();
        let snap = dto.into_typed().unwrap();
        assert_eq!(snap.customer_id, None);

        let mut order = Order::new("o-1", "t-1");
        order.customer_id = Some("c-1".into());
        order.staff_id = Some("waiter-1".into());
        snap.overwrite(&mut order);
        assert_eq!(order.customer_id.as_deref(), Some("c-1"));
        assert_eq!(order.staff_id.as_deref(), Some("waiter-1"));
    }

    #[test]
    fn test_unknown_status_rejected() {
        let mut dto: OrderSnapshotDto = serde_json::from_str(device_json()).unwrap();
        dto.status = "Teleported".to_string();
        assert!(matches!(
            dto.into_typed(),
            Err(SnapshotError::UnknownStatus { .. })
        ));
    }

    #[test]
    fn test_server_recomputes_total() {
        let mut dto: OrderSnapshotDto = serde_json::from_str(device_json()).unwrap();
        dto.total_amount = 99.0;
        let snap = dto.into_typed().unwrap();
        assert!(snap.total_mismatch());

        let order = snap.to_order("t-1", VectorClock::from([("tab-1", 1)]));
        assert_eq!(order.total_amount, 19.0);
        assert_eq!(order.final_total, 19.0);
        assert_eq!(order.workflow_status, OrderStatus::Placed);
    }

    #[test]
    fn test_order_to_snapshot_and_back() {
        let dto: OrderSnapshotDto = serde_json::from_str(device_json()).unwrap();
        let order = dto.into_typed().unwrap().to_order("t-1", VectorClock::from([("tab-1", 1)]));
        let back = order.to_snapshot().into_typed().unwrap();
        assert_eq!(back.items, order.items);
        assert_eq!(back.table_ids, order.table_ids);
        assert_eq!(back.clock_json, r#"{"tab-1":1}"#);
    }
}
