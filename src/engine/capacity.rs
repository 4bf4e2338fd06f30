// ==========================================
// 成衣排产系统 - 产能核算
// ==========================================
// 职责: 计算 (产线, 日期) 单元格的可用产能与利用率
// 规则:
// 1) 假期单元格: 可用 = 0, 利用率 = 0 (已有占用不隐藏, 由 holiday_conflicts 暴露)
// 2) 有效产能 = floor(名义产能 × 爬坡效率 / 100)
//    可用产能 = max(有效产能 - 单元格已承诺量, 0)
// 3) 利用率 = 已承诺量 / 名义产能 × 100, 不封顶 (>100 即超排)
// ==========================================

use crate::domain::line::ProductionLine;
use crate::engine::board::ScheduleBoard;
use crate::engine::ramp_up::{effective_capacity, FULL_EFFICIENCY};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ==========================================
// CellReport - 单元格产能快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellReport {
    pub line_id: String,
    pub date: NaiveDate,
    pub capacity: u32,        // 名义产能
    pub committed: u64,       // 已承诺量
    pub available: u32,       // 可用产能 (100% 效率)
    pub utilization_pct: f64, // 利用率 (不封顶)
    pub is_holiday: bool,
}

impl CellReport {
    /// 是否超排
    pub fn is_overbooked(&self) -> bool {
        !self.is_holiday && self.committed > u64::from(self.capacity)
    }

    /// 假期单元格仍有占用 (历史遗留异常)
    pub fn is_holiday_conflict(&self) -> bool {
        self.is_holiday && self.committed > 0
    }
}

// ==========================================
// CapacityAccountant - 产能核算器
// ==========================================
// 只读视图, 纯计算, 不会失败
pub struct CapacityAccountant<'a> {
    board: &'a ScheduleBoard,
}

impl<'a> CapacityAccountant<'a> {
    pub fn new(board: &'a ScheduleBoard) -> Self {
        Self { board }
    }

    pub fn is_holiday(&self, line: &ProductionLine, date: NaiveDate) -> bool {
        self.board.calendar().is_holiday(&line.line_id, date)
    }

    /// 单元格已承诺量
    pub fn committed_load(&self, line: &ProductionLine, date: NaiveDate, excluding: Option<&str>) -> u64 {
        self.board.ledger().committed(&line.line_id, date, excluding)
    }

    /// 可用产能 (100% 效率)
    pub fn available_capacity(&self, line: &ProductionLine, date: NaiveDate) -> u32 {
        self.available_capacity_with(line, date, FULL_EFFICIENCY, None)
    }

    /// 可用产能 (指定效率, 可排除某订单自身的占用)
    pub fn available_capacity_with(
        &self,
        line: &ProductionLine,
        date: NaiveDate,
        efficiency_pct: u32,
        excluding: Option<&str>,
    ) -> u32 {
        if self.is_holiday(line, date) {
            return 0;
        }
        let effective = u64::from(effective_capacity(line.capacity, efficiency_pct));
        let committed = self.committed_load(line, date, excluding);
        u32::try_from(effective.saturating_sub(committed)).unwrap_or(0)
    }

    /// 利用率百分比 (不封顶)
    pub fn utilization(&self, line: &ProductionLine, date: NaiveDate) -> f64 {
        if self.is_holiday(line, date) || line.capacity == 0 {
            return 0.0;
        }
        let committed = self.committed_load(line, date, None) as f64;
        committed / f64::from(line.capacity) * 100.0
    }

    /// 单元格快照
    pub fn cell_report(&self, line: &ProductionLine, date: NaiveDate) -> CellReport {
        CellReport {
            line_id: line.line_id.clone(),
            date,
            capacity: line.capacity,
            committed: self.committed_load(line, date, None),
            available: self.available_capacity(line, date),
            utilization_pct: self.utilization(line, date),
            is_holiday: self.is_holiday(line, date),
        }
    }

    /// 日期区间内逐日快照 (含首尾)
    pub fn cell_reports(&self, line: &ProductionLine, from: NaiveDate, to: NaiveDate) -> Vec<CellReport> {
        from.iter_days()
            .take_while(|d| *d <= to)
            .map(|d| self.cell_report(line, d))
            .collect()
    }

    /// 假期单元格上仍有占用的记录
    pub fn holiday_conflicts(&self) -> Vec<CellReport> {
        self.board
            .ledger()
            .occupied_cells()
            .filter_map(|(line_id, date)| {
                let line = self.board.line(line_id).ok()?;
                let report = self.cell_report(line, date);
                report.is_holiday_conflict().then_some(report)
            })
            .collect()
    }

    /// 超排单元格
    pub fn overbooked_cells(&self) -> Vec<CellReport> {
        self.board
            .ledger()
            .occupied_cells()
            .filter_map(|(line_id, date)| {
                let line = self.board.line(line_id).ok()?;
                let report = self.cell_report(line, date);
                report.is_overbooked().then_some(report)
            })
            .collect()
    }
}
