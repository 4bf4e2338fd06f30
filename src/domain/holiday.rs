// ==========================================
// 成衣排产系统 - 假期领域模型
// ==========================================
// 全局假期: 当天所有产线停产
// 非全局假期: 仅对已关联的产线生效, 未关联任何产线则无效
// 约束: (date, name) 唯一
// ==========================================

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holiday {
    pub holiday_id: String,
    pub date: NaiveDate,
    pub name: String,
    pub is_global: bool,
}

// 假期 ↔ 产线 关联 (多对多)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HolidayLineAssignment {
    pub holiday_id: String,
    pub line_id: String,
}
