//! Dining Table Model

use serde::{Deserialize, Serialize};

/// 桌台占用状态
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum TableStatus {
    #[default]
    Available,
    Occupied,
}

/// Dining table entity (桌台)
///
/// 订单通过 `tableIds` 引用桌台；首次被引用的未知桌台会以 id 作为桌号登记。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DiningTable {
    pub id: String,
    pub tenant_id: String,
    pub table_number: String,
    pub status: TableStatus,
}

impl DiningTable {
    pub fn new(id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            table_number: id.clone(),
            id,
            tenant_id: tenant_id.into(),
            status: TableStatus::Available,
        }
    }
}
