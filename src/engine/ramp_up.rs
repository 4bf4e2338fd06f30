// ==========================================
// 成衣排产系统 - 爬坡效率模型
// ==========================================
// day_offset: 订单在产线上已生产的天数 (从0开始)
// 假期及当天未分配产量的日期不计入
// ==========================================

use crate::domain::ramp_up::RampUpPlan;

/// 满效率
pub const FULL_EFFICIENCY: u32 = 100;

/// 查询某生产天的效率百分比, 结果落在 (0, 100]
///
/// 规则:
/// 1) 无爬坡计划或无点位 → 100
/// 2) 取 day_offset ≤ 查询值的最大点位
/// 3) 查询值超过所有点位 → final_efficiency
/// 4) 查询值小于第一个点位 → 第一个点位的效率
pub fn efficiency_on_day(plan: Option<&RampUpPlan>, day_offset: u32) -> u32 {
    let Some(plan) = plan else {
        return FULL_EFFICIENCY;
    };
    let Some(first) = plan.points.first() else {
        return FULL_EFFICIENCY;
    };

    let last_offset = plan.points.last().map(|p| p.day_offset).unwrap_or(0);
    let raw = if day_offset > last_offset {
        plan.final_efficiency
    } else {
        plan.points
            .iter()
            .take_while(|p| p.day_offset <= day_offset)
            .last()
            .unwrap_or(first)
            .efficiency_pct
    };

    raw.clamp(1, FULL_EFFICIENCY)
}

/// 有效日产能 = floor(名义产能 × 效率 / 100)
pub fn effective_capacity(capacity: u32, efficiency_pct: u32) -> u32 {
    let scaled = u64::from(capacity) * u64::from(efficiency_pct) / u64::from(FULL_EFFICIENCY);
    u32::try_from(scaled).unwrap_or(u32::MAX)
}
