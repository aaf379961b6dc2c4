//! 订单操作请求 / 响应体

use super::types::{AmendmentDelta, DiscountType, OrderStatus};
use serde::{Deserialize, Serialize};

/// 结账调整项，每个字段独立可选
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaymentAdjustments {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_charge: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_type: Option<DiscountType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_total: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discount_reason: Option<String>,
}

impl PaymentAdjustments {
    pub fn is_empty(&self) -> bool {
        *self == PaymentAdjustments::default()
    }
}

/// POST /api/orders/{id}/status
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdateRequest {
    pub new_status: OrderStatus,
    #[serde(flatten)]
    pub adjustments: PaymentAdjustments,
}

impl StatusUpdateRequest {
    pub fn new(new_status: OrderStatus) -> Self {
        Self {
            new_status,
            adjustments: PaymentAdjustments::default(),
        }
    }
}

/// POST /api/orders/{id}/propose-amendment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProposeAmendmentRequest {
    pub deltas: Vec<AmendmentDelta>,
}

/// POST /api/orders/{id}/respond-amendment
///
/// `updatedItemsJson` 只在服务端没有待审批批次时使用 (旧设备已在本地应用改单)；
/// `updatedTotal` 永远不被采信，总额由服务端重算。
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AmendmentResponseRequest {
    pub approve: bool,
    #[serde(
        default,
        alias = "updatedMetadataJson",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_items_json: Option<String>,
    #[serde(
        default,
        alias = "updatedTotalAmount",
        skip_serializing_if = "Option::is_none"
    )]
    pub updated_total: Option<f64>,
}

/// 状态变更类接口的响应
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct OrderStatusResponse {
    pub id: String,
    pub status: OrderStatus,
    pub version: u64,
}

/// DELETE 接口的响应
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DeletedResponse {
    pub status: String,
    pub id: String,
}

impl DeletedResponse {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            status: "Deleted".to_string(),
            id: id.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_request_flattens_adjustments() {
        let req: StatusUpdateRequest = serde_json::from_str(
            r#"{"newStatus":"Paid","paymentMethod":"Cash","finalTotal":42.5,"discountType":"amount"}"#,
        )
        .unwrap();
        assert_eq!(req.new_status, OrderStatus::Paid);
        assert_eq!(req.adjustments.final_total, Some(42.5));
        assert_eq!(req.adjustments.discount_type, Some(DiscountType::Amount));
        assert!(!req.adjustments.is_empty());

        let plain: StatusUpdateRequest = serde_json::from_str(r#"{"newStatus":"Ready"}"#).unwrap();
        assert!(plain.adjustments.is_empty());
    }

    #[test]
    fn test_amendment_response_accepts_legacy_names() {
        let req: AmendmentResponseRequest = serde_json::from_str(
            r#"{"approve":true,"updatedMetadataJson":"[]","updatedTotalAmount":12.0}"#,
        )
        .unwrap();
        assert_eq!(req.updated_items_json.as_deref(), Some("[]"));
        assert_eq!(req.updated_total, Some(12.0));
    }
}
