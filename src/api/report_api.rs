// ==========================================
// 成衣排产系统 - 报表 API
// ==========================================
// 职责: 只读查询 (产能利用率 / 订单状态 / 拆单家族 / 假期冲突 / 操作日志)
// 红线: 不产生任何写入
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::api::schedule_api::ScheduleApi;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::order::Order;
use crate::domain::types::OrderStatus;
use crate::engine::{CapacityAccountant, CellReport, FamilyView, SplitBookkeeper};
use crate::repository::{ActionLogRepository, OrderRepository};
use chrono::{NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::sync::Arc;

// ==========================================
// LineLoadSummary - 产线区间负荷汇总
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct LineLoadSummary {
    pub line_id: String,
    pub name: String,
    pub working_days: u32,   // 区间内非假期天数
    pub capacity_total: u64, // 非假期日名义产能合计
    pub committed_total: u64,
    pub utilization_pct: f64,
    pub overbooked_days: u32,
}

// ==========================================
// ReportApi - 报表API
// ==========================================
pub struct ReportApi {
    schedule_api: Arc<ScheduleApi>,
    order_repo: Arc<OrderRepository>,
    action_log_repo: Arc<ActionLogRepository>,
    bookkeeper: SplitBookkeeper,
}

impl ReportApi {
    pub fn new(
        schedule_api: Arc<ScheduleApi>,
        order_repo: Arc<OrderRepository>,
        action_log_repo: Arc<ActionLogRepository>,
    ) -> Self {
        Self {
            schedule_api,
            order_repo,
            action_log_repo,
            bookkeeper: SplitBookkeeper::new(),
        }
    }

    /// 单元格利用率明细 (闭区间; line_id 为空表示全部产线)
    pub fn utilization_by_range(
        &self,
        line_id: Option<&str>,
        from: NaiveDate,
        to: NaiveDate,
    ) -> ApiResult<Vec<CellReport>> {
        validate_range(from, to)?;
        let board = self.schedule_api.load_board()?;
        let accountant = CapacityAccountant::new(&board);

        let lines = match line_id {
            Some(id) => vec![board.line(id)?],
            None => board.lines(),
        };

        Ok(lines
            .into_iter()
            .flat_map(|line| accountant.cell_reports(line, from, to))
            .collect())
    }

    /// 产线区间负荷汇总
    pub fn line_load_summary(&self, from: NaiveDate, to: NaiveDate) -> ApiResult<Vec<LineLoadSummary>> {
        validate_range(from, to)?;
        let board = self.schedule_api.load_board()?;
        let accountant = CapacityAccountant::new(&board);

        let mut summaries = Vec::new();
        for line in board.lines() {
            let cells = accountant.cell_reports(line, from, to);
            let working: Vec<&CellReport> = cells.iter().filter(|c| !c.is_holiday).collect();

            let capacity_total: u64 = working.iter().map(|c| u64::from(c.capacity)).sum();
            let committed_total: u64 = working.iter().map(|c| c.committed).sum();
            let utilization_pct = if capacity_total == 0 {
                0.0
            } else {
                committed_total as f64 / capacity_total as f64 * 100.0
            };

            summaries.push(LineLoadSummary {
                line_id: line.line_id.clone(),
                name: line.name.clone(),
                working_days: working.len() as u32,
                capacity_total,
                committed_total,
                utilization_pct,
                overbooked_days: cells.iter().filter(|c| c.is_overbooked()).count() as u32,
            });
        }
        Ok(summaries)
    }

    /// 按状态查询订单
    pub fn orders_by_status(&self, status: OrderStatus) -> ApiResult<Vec<Order>> {
        Ok(self.order_repo.list_by_status(status)?)
    }

    /// 拆单家族视图
    pub fn split_family(&self, base_po_number: &str) -> ApiResult<FamilyView> {
        let board = self.schedule_api.load_board()?;
        let view = self.bookkeeper.family(&board, base_po_number);
        if view.members.is_empty() {
            return Err(ApiError::NotFound(format!("拆单家族{}不存在", base_po_number)));
        }
        Ok(view)
    }

    /// 订单溯源: 返回订单所属家族
    pub fn order_ancestry(&self, order_id: &str) -> ApiResult<FamilyView> {
        let board = self.schedule_api.load_board()?;
        let order = board.order(order_id)?;
        Ok(self.bookkeeper.family(&board, order.family_key()))
    }

    /// 假期冲突: 假期单元格上仍有计划量
    pub fn holiday_conflicts(&self) -> ApiResult<Vec<CellReport>> {
        let board = self.schedule_api.load_board()?;
        Ok(CapacityAccountant::new(&board).holiday_conflicts())
    }

    /// 超排单元格 (人工超排产生)
    pub fn overbooked_cells(&self) -> ApiResult<Vec<CellReport>> {
        let board = self.schedule_api.load_board()?;
        Ok(CapacityAccountant::new(&board).overbooked_cells())
    }

    /// 订单操作历史
    pub fn order_history(&self, order_id: &str) -> ApiResult<Vec<ActionLog>> {
        Ok(self.action_log_repo.find_by_order(order_id)?)
    }

    /// 最近的操作日志 (时间降序)
    pub fn recent_actions(&self, limit: u32) -> ApiResult<Vec<ActionLog>> {
        Ok(self.action_log_repo.find_recent(limit)?)
    }

    /// 按操作类型查询日志 (时间降序)
    pub fn actions_by_type(&self, action_type: ActionType, limit: u32) -> ApiResult<Vec<ActionLog>> {
        Ok(self
            .action_log_repo
            .find_by_action_type(action_type.as_str(), limit)?)
    }

    /// 时间范围内的操作日志 (闭区间, UTC)
    pub fn actions_in_range(&self, from: NaiveDateTime, to: NaiveDateTime) -> ApiResult<Vec<ActionLog>> {
        if from > to {
            return Err(ApiError::InvalidInput(format!(
                "时间区间无效: {} > {}",
                from, to
            )));
        }
        Ok(self.action_log_repo.find_by_time_range(from, to)?)
    }
}

fn validate_range(from: NaiveDate, to: NaiveDate) -> ApiResult<()> {
    if from > to {
        return Err(ApiError::InvalidInput(format!(
            "日期区间无效: {} > {}",
            from, to
        )));
    }
    Ok(())
}
