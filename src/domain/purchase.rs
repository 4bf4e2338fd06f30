// ==========================================
// 成衣排产系统 - 采购单领域模型
// ==========================================
// ERP 同步落库后的规范化形态, 进入排产前需转为 Order
// ==========================================

use crate::domain::order::Order;
use crate::domain::types::PurchaseStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Purchase {
    pub purchase_id: String,
    pub po_number: String,
    pub supplier: String,
    pub total_quantity: u32,
    pub order_date: Option<NaiveDate>,
    pub delivery_date: Option<NaiveDate>,
    pub status: PurchaseStatus,
}

impl Purchase {
    /// 转换为待排订单
    ///
    /// 采购单没有款号, 由调用方提供
    pub fn to_order(&self, order_id: impl Into<String>, style: impl Into<String>) -> Order {
        Order::new(order_id, self.po_number.clone(), style, self.total_quantity)
    }
}
