//! Canonical order aggregate

use super::money::{MAX_QUANTITY, to_decimal, to_f64};
use super::types::{AmendmentDelta, DiscountType, LineItem, OrderStatus, StatusHistoryEntry};
use crate::clock::VectorClock;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 订单聚合 (租户隔离)
///
/// `id` 由下单设备生成并在设备与服务端之间保持不变。
/// `version` 是服务端行版本号，每次提交 +1，用于同步批次的乐观并发检查。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,
    pub tenant_id: String,
    #[serde(default)]
    pub table_ids: BTreeSet<String>,
    pub status: OrderStatus,
    pub workflow_status: OrderStatus,
    #[serde(default)]
    pub items: Vec<LineItem>,
    /// 最多一批待审批改单；新提案整体替换旧批次
    #[serde(default)]
    pub pending_amendment: Vec<AmendmentDelta>,
    #[serde(default)]
    pub vector_clock: VectorClock,
    #[serde(default)]
    pub status_history: Vec<StatusHistoryEntry>,

    // === Money ===
    pub total_amount: f64,
    #[serde(default)]
    pub service_charge: f64,
    #[serde(default)]
    pub discount: f64,
    #[serde(default)]
    pub discount_type: DiscountType,
    #[serde(default)]
    pub final_total: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_reason: Option<String>,

    pub can_amend: bool,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub staff_id: Option<String>,
    #[serde(default)]
    pub customer_name: String,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_guest_count")]
    pub guest_count: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,

    #[serde(default)]
    pub version: u64,
}

fn default_guest_count() -> i32 {
    1
}

impl Order {
    /// 新下单 (status = Placed)
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            tenant_id: tenant_id.into(),
            table_ids: BTreeSet::new(),
            status: OrderStatus::Placed,
            workflow_status: OrderStatus::Placed,
            items: Vec::new(),
            pending_amendment: Vec::new(),
            vector_clock: VectorClock::new(),
            status_history: Vec::new(),
            total_amount: 0.0,
            service_charge: 0.0,
            discount: 0.0,
            discount_type: DiscountType::None,
            final_total: 0.0,
            discount_reason: None,
            can_amend: true,
            created_at: Utc::now(),
            paid_at: None,
            customer_id: None,
            staff_id: None,
            customer_name: String::new(),
            notes: String::new(),
            guest_count: 1,
            payment_method: None,
            version: 0,
        }
    }

    /// 写入新状态：`status`、`workflowStatus` 同步更新并追加历史
    pub fn set_status(&mut self, status: OrderStatus, actor: impl Into<String>, at: DateTime<Utc>) {
        self.status = status;
        self.workflow_status = status;
        self.status_history.push(StatusHistoryEntry {
            status,
            timestamp: at,
            actor: actor.into(),
        });
    }

    /// Σ price × qty
    pub fn items_total(&self) -> f64 {
        to_f64(self.items.iter().map(LineItem::line_total).sum::<Decimal>())
    }

    /// `totalAmount + serviceCharge − discount`，不为负
    pub fn computed_final_total(&self) -> f64 {
        let total = to_decimal(self.total_amount);
        let discount = match self.discount_type {
            DiscountType::Percentage => total * to_decimal(self.discount) / Decimal::ONE_HUNDRED,
            DiscountType::Amount => to_decimal(self.discount),
            DiscountType::None => Decimal::ZERO,
        };
        to_f64((total + to_decimal(self.service_charge) - discount).max(Decimal::ZERO))
    }

    /// 根据订单行重新计算 totalAmount 与 finalTotal
    pub fn recompute_totals(&mut self) {
        self.total_amount = self.items_total();
        self.final_total = self.computed_final_total();
    }

    /// 结账金额：finalTotal 为正时使用，否则回退到 totalAmount
    pub fn settled_amount(&self) -> f64 {
        if self.final_total > 0.0 {
            self.final_total
        } else {
            self.total_amount
        }
    }

    pub fn has_pending_amendment(&self) -> bool {
        !self.pending_amendment.is_empty()
    }

    /// 应用并清空待审批改单，重新计算总额
    pub fn apply_pending_amendment(&mut self) {
        let deltas = std::mem::take(&mut self.pending_amendment);
        apply_deltas(&mut self.items, &deltas);
        self.recompute_totals();
    }

    pub fn is_cash_payment(&self) -> bool {
        self.payment_method
            .as_deref()
            .is_some_and(|m| m.trim().eq_ignore_ascii_case("cash"))
    }

    /// 通知文案中的桌台描述，例如 "Table 3,4" / "Walk-in"
    pub fn table_label(&self) -> String {
        if self.table_ids.is_empty() {
            "Walk-in".to_string()
        } else {
            format!("Table {}", self.table_id_string())
        }
    }

    /// 逗号拼接形式 (wire `tableId`)
    pub fn table_id_string(&self) -> String {
        self.table_ids
            .iter()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// 按顺序应用改单增量
///
/// - `Add`: 与已有行 [`LineItem::same_line`] 时合并数量，否则追加；
///   合并后超过 [`MAX_QUANTITY`] 时另起一行
/// - `Delete`: 删除该商品的所有行
pub fn apply_deltas(items: &mut Vec<LineItem>, deltas: &[AmendmentDelta]) {
    for delta in deltas {
        match delta {
            AmendmentDelta::Add { item } => {
                let merged = items.iter_mut().find(|line| line.same_line(item)).and_then(|line| {
                    let quantity = line
                        .quantity
                        .checked_add(item.quantity)
                        .filter(|q| *q <= MAX_QUANTITY)?;
                    line.quantity = quantity;
                    Some(())
                });
                if merged.is_none() {
                    items.push(item.clone());
                }
            }
            AmendmentDelta::Delete { item_id } => items.retain(|line| &line.id != item_id),
        }
    }
}

/// 解析逗号拼接的桌台 id
pub fn parse_table_ids(raw: &str) -> BTreeSet<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
