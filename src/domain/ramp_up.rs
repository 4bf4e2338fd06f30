// ==========================================
// 成衣排产系统 - 爬坡计划领域模型
// ==========================================
// 订单上线初期效率较低, 按生产天数逐步爬升至稳态效率
// ==========================================

use serde::{Deserialize, Serialize};

/// 爬坡曲线上的一个点
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RampUpPoint {
    pub day_offset: u32,     // 自订单开工起的生产天数 (从0开始)
    pub efficiency_pct: u32, // 效率百分比
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RampUpPlan {
    pub plan_id: String,
    pub name: String,
    pub points: Vec<RampUpPoint>, // 按 day_offset 升序
    pub final_efficiency: u32,    // 超出最后一个点后的稳态效率
}

impl RampUpPlan {
    /// 创建爬坡计划, 点位按 day_offset 排序, 相同偏移保留最后一个
    pub fn new(
        plan_id: impl Into<String>,
        name: impl Into<String>,
        mut points: Vec<RampUpPoint>,
        final_efficiency: u32,
    ) -> Self {
        points.sort_by_key(|p| p.day_offset);
        points.reverse();
        points.dedup_by_key(|p| p.day_offset);
        points.reverse();

        Self {
            plan_id: plan_id.into(),
            name: name.into(),
            points,
            final_efficiency,
        }
    }
}
