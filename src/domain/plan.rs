// ==========================================
// 成衣排产系统 - 计划产量领域模型
// ==========================================
// 一条记录 = 某订单在某 (产线, 日期) 单元格上的计划量
// order_index 用于同一单元格内多条记录的确定性排序
// ==========================================

use crate::domain::types::OrderStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlannedProduction {
    // ===== 主键 =====
    pub entry_id: String,

    // ===== 关联 =====
    pub order_id: String,
    pub line_id: String,

    // ===== 计划信息 =====
    pub plan_date: NaiveDate,
    pub planned_quantity: u32,
    pub actual_quantity: Option<u32>,
    pub status: OrderStatus, // 与订单状态保持一致
    pub order_index: u32,    // 单元格内序号
}

impl PlannedProduction {
    /// 单元格键 (产线, 日期)
    pub fn cell(&self) -> (&str, NaiveDate) {
        (self.line_id.as_str(), self.plan_date)
    }
}
