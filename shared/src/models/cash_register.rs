//! Cash Register Model

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 租户现金抽屉余额 (现金付款入账，删除已付现金订单时冲回，不低于 0)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CashRegister {
    pub tenant_id: String,
    pub balance: f64,
    pub updated_at: DateTime<Utc>,
}

impl CashRegister {
    pub fn empty(tenant_id: impl Into<String>) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            balance: 0.0,
            updated_at: Utc::now(),
        }
    }
}
