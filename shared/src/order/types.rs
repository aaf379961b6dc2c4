//! Shared types for the order model

use super::money::{to_decimal, to_f64};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Order Status
// ============================================================================

/// 订单生命周期状态
///
/// `status` 与 `workflowStatus` 在每次提交时同时写入同一个值。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum OrderStatus {
    /// 设备下单
    #[default]
    Placed,
    /// 旧设备使用的等价初始状态
    Pending,
    /// 厨房已接单
    Preparing,
    Ready,
    Served,
    /// 已结账 (终态)
    Paid,
    /// 厨房拒单
    Declined,
    /// 管理员取消 (终态)
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 8] = [
        OrderStatus::Placed,
        OrderStatus::Pending,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Served,
        OrderStatus::Paid,
        OrderStatus::Declined,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Placed => "Placed",
            OrderStatus::Pending => "Pending",
            OrderStatus::Preparing => "Preparing",
            OrderStatus::Ready => "Ready",
            OrderStatus::Served => "Served",
            OrderStatus::Paid => "Paid",
            OrderStatus::Declined => "Declined",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// 终态不再接受任何状态迁移
    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Paid | OrderStatus::Cancelled)
    }

    /// 可以挂起改单请求的状态
    pub fn is_amendable(&self) -> bool {
        matches!(
            self,
            OrderStatus::Placed | OrderStatus::Pending | OrderStatus::Preparing | OrderStatus::Served
        )
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 未知状态字符串
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown order status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for OrderStatus {
    type Err = UnknownStatus;

    /// 大小写不敏感；旧设备偶尔发送小写状态
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "placed" => Ok(OrderStatus::Placed),
            "pending" => Ok(OrderStatus::Pending),
            "preparing" => Ok(OrderStatus::Preparing),
            "ready" => Ok(OrderStatus::Ready),
            "served" => Ok(OrderStatus::Served),
            "paid" => Ok(OrderStatus::Paid),
            "declined" => Ok(OrderStatus::Declined),
            "cancelled" | "canceled" => Ok(OrderStatus::Cancelled),
            _ => Err(UnknownStatus(s.to_string())),
        }
    }
}

// ============================================================================
// Line Items & Amendments
// ============================================================================

/// 订单行
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LineItem {
    /// Product reference
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub price: f64,
    #[serde(alias = "qty")]
    pub quantity: i32,
    /// 口味/做法标签
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modifier: Option<String>,
}

impl LineItem {
    pub fn new(id: impl Into<String>, name: impl Into<String>, price: f64, quantity: i32) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            price,
            quantity,
            modifier: None,
        }
    }

    /// 单价 × 数量；越界输入饱和而不是 panic
    pub fn line_total(&self) -> Decimal {
        to_decimal(self.price).saturating_mul(Decimal::from(self.quantity))
    }

    /// 同一商品、同一单价、同一做法的行可以合并数量
    pub fn same_line(&self, other: &LineItem) -> bool {
        self.id == other.id
            && to_f64(to_decimal(self.price)) == to_f64(to_decimal(other.price))
            && self.modifier == other.modifier
    }
}

/// 改单增量
///
/// Wire 形式：`{"type":"add","item":{...}}` / `{"type":"delete","itemId":"..."}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum AmendmentDelta {
    Add {
        item: LineItem,
    },
    Delete {
        #[serde(rename = "itemId")]
        item_id: String,
    },
}

// ============================================================================
// Payment adjustments
// ============================================================================

/// 折扣类型
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum DiscountType {
    Percentage,
    Amount,
    #[default]
    None,
}

impl DiscountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiscountType::Percentage => "percentage",
            DiscountType::Amount => "amount",
            DiscountType::None => "none",
        }
    }

    /// 空字符串与未知值都按无折扣处理
    pub fn parse_lenient(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "percentage" | "percent" => DiscountType::Percentage,
            "amount" | "fixed" => DiscountType::Amount,
            _ => DiscountType::None,
        }
    }
}

// ============================================================================
// History
// ============================================================================

/// 状态历史 (只追加)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StatusHistoryEntry {
    pub status: OrderStatus,
    pub timestamp: DateTime<Utc>,
    pub actor: String,
}

// ============================================================================
// Sync results
// ============================================================================

/// 单个订单的同步结果
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SyncStatus {
    #[serde(rename = "Synchronized")]
    Inserted,
    Updated,
    #[serde(rename = "Conflict - Server Wins")]
    ConflictServerWins,
}

impl SyncStatus {
    pub fn is_accepted(&self) -> bool {
        !matches!(self, SyncStatus::ConflictServerWins)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SyncResult {
    pub order_id: String,
    pub status: SyncStatus,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_parse_case_insensitive() {
        assert_eq!("Paid".parse::<OrderStatus>(), Ok(OrderStatus::Paid));
        assert_eq!("preparing".parse::<OrderStatus>(), Ok(OrderStatus::Preparing));
        assert_eq!("canceled".parse::<OrderStatus>(), Ok(OrderStatus::Cancelled));
        assert!("Eaten".parse::<OrderStatus>().is_err());
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_string(&OrderStatus::Served).unwrap(), "\"Served\"");
        assert!(OrderStatus::Paid.is_terminal());
        assert!(!OrderStatus::Ready.is_amendable());
        assert!(OrderStatus::Served.is_amendable());
    }

    #[test]
    fn test_amendment_delta_wire_format() {
        let add: AmendmentDelta = serde_json::from_str(
            r#"{"type":"add","item":{"id":"p1","name":"Soup","price":4.5,"qty":2}}"#,
        )
        .unwrap();
        assert_eq!(
            add,
            AmendmentDelta::Add {
                item: LineItem::new("p1", "Soup", 4.5, 2)
            }
        );

        let delete: AmendmentDelta = serde_json::from_str(r#"{"type":"delete","itemId":"p1"}"#).unwrap();
        assert_eq!(
            serde_json::to_value(&delete).unwrap(),
            serde_json::json!({"type": "delete", "itemId": "p1"})
        );
    }

    #[test]
    fn test_sync_status_wire_names() {
        let results = vec![
            SyncResult { order_id: "a".into(), status: SyncStatus::Inserted },
            SyncResult { order_id: "b".into(), status: SyncStatus::ConflictServerWins },
        ];
        let json = serde_json::to_string(&results).unwrap();
        assert_eq!(
            json,
            r#"[{"orderId":"a","status":"Synchronized"},{"orderId":"b","status":"Conflict - Server Wins"}]"#
        );
    }

    #[test]
    fn test_same_line_ignores_float_noise() {
        let a = LineItem::new("p1", "Tea", 0.1 + 0.2, 1);
        let b = LineItem::new("p1", "Tea", 0.3, 3);
        assert!(a.same_line(&b));
        let mut c = b.clone();
        c.modifier = Some("no sugar".into());
        assert!(!a.same_line(&c));
    }

    #[test]
    fn test_discount_type_lenient() {
        assert_eq!(DiscountType::parse_lenient(""), DiscountType::None);
        assert_eq!(DiscountType::parse_lenient("Percentage"), DiscountType::Percentage);
        assert_eq!(DiscountType::parse_lenient("amount"), DiscountType::Amount);
    }
}
