// ==========================================
// 成衣排产系统 - 排产引擎
// ==========================================
// 职责: 落位 / 退回待排 / 移动 / 冲突检测 / 实际产量回写
// 状态机: PENDING → SCHEDULED → IN_PROGRESS → COMPLETED
//         SCHEDULED / IN_PROGRESS → PENDING (退回待排池)
// 红线: 操作要么完整生效, 要么不改变任何状态
// ==========================================

use crate::domain::line::ProductionLine;
use crate::domain::order::{Assignment, Order, OrderSchedule};
use crate::domain::plan::PlannedProduction;
use crate::domain::ramp_up::RampUpPlan;
use crate::domain::types::{OrderStatus, PlacementMode};
use crate::engine::board::{ChangeSet, ScheduleBoard};
use crate::engine::capacity::CapacityAccountant;
use crate::engine::error::{ScheduleError, ScheduleResult};
use crate::engine::ramp_up::{effective_capacity, efficiency_on_day};
use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// 默认排产窗口 (天)
pub const DEFAULT_HORIZON_DAYS: u32 = 90;

// ==========================================
// PlaceOptions - 落位参数
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct PlaceOptions {
    pub horizon_days: u32,            // 从起始日起最多遍历的自然日数
    pub mode: PlacementMode,          // 严格 / 人工超排
    pub ramp_up: Option<RampUpPlan>,  // 爬坡计划 (None 表示满效率)
}

impl Default for PlaceOptions {
    fn default() -> Self {
        Self {
            horizon_days: DEFAULT_HORIZON_DAYS,
            mode: PlacementMode::Strict,
            ramp_up: None,
        }
    }
}

impl PlaceOptions {
    /// 实际遍历窗口, 至少包含起始日
    pub fn window_days(&self) -> u32 {
        self.horizon_days.max(1)
    }
}

// ==========================================
// DayAllocation - 单日分配
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DayAllocation {
    pub date: NaiveDate,
    pub quantity: u32,
    pub efficiency_pct: u32,
}

// ==========================================
// OverlapReport - 冲突检测结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapDay {
    pub date: NaiveDate,
    pub required: u32,  // 朴素落位当日需要的量
    pub available: u32, // 当日可用产能
}

impl OverlapDay {
    pub fn shortfall(&self) -> u32 {
        self.required.saturating_sub(self.available)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverlapReport {
    pub order_id: String,
    pub line_id: String,
    pub start_date: NaiveDate,
    pub collisions: Vec<OverlapDay>,
}

impl OverlapReport {
    pub fn has_overlap(&self) -> bool {
        !self.collisions.is_empty()
    }
}

// ==========================================
// SchedulingEngine - 排产引擎
// ==========================================
pub struct SchedulingEngine {
    // 无状态引擎，不需要注入依赖
}

impl Default for SchedulingEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl SchedulingEngine {
    pub fn new() -> Self {
        Self {}
    }

    // ==========================================
    // 核心方法
    // ==========================================

    /// 将订单落位到产线
    ///
    /// 从 start 起逐日前进, 跳过该产线的假期,
    /// 每个可生产日分配 min(剩余量, 可用产能), 直到分配完毕或到达窗口上限
    ///
    /// # 错误
    /// - `HolidayOnly`: 窗口内全部为假期
    /// - `CapacityExceeded`: 窗口内产能不足
    /// - `InvalidTransition`: 订单不是 PENDING
    /// - `LineUnavailable` / `NotFound`
    #[instrument(skip(self, board, options), fields(horizon = options.horizon_days, mode = ?options.mode))]
    pub fn place(
        &self,
        board: &mut ScheduleBoard,
        order_id: &str,
        line_id: &str,
        start: NaiveDate,
        options: &PlaceOptions,
    ) -> ScheduleResult<ChangeSet> {
        let order = board.order(order_id)?;
        if order.status() != OrderStatus::Pending {
            return Err(ScheduleError::InvalidTransition {
                order_id: order_id.to_string(),
                from: order.status(),
                to: OrderStatus::Scheduled,
            });
        }
        self.ensure_remaining(order)?;
        let line = Self::schedulable_line(board, line_id)?;

        let allocations = self.compute_plan(board, order, line, start, options)?;
        let order = order.clone();

        let mut change = ChangeSet::default();
        self.commit_plan(board, order, line_id, &allocations, &mut change);

        info!(
            order_id,
            line_id,
            start = %start,
            days = allocations.len(),
            "订单落位完成"
        );
        Ok(change)
    }

    /// 退回待排池
    ///
    /// 删除全部计划, 清空产线与计划日期, 保留实际产量
    #[instrument(skip(self, board))]
    pub fn drop_order(&self, board: &mut ScheduleBoard, order_id: &str) -> ScheduleResult<ChangeSet> {
        let order = board.order(order_id)?;
        match order.status() {
            OrderStatus::Scheduled | OrderStatus::InProgress => {}
            from => {
                return Err(ScheduleError::InvalidTransition {
                    order_id: order_id.to_string(),
                    from,
                    to: OrderStatus::Pending,
                })
            }
        }

        let mut order = order.clone();
        order.schedule = OrderSchedule::Pending;

        let mut change = ChangeSet::default();
        board.commit_order(order, Some(Vec::new()), &mut change);

        info!(order_id, "订单已退回待排池");
        Ok(change)
    }

    /// 移动订单 (退回待排 + 重新落位, 作为一个整体)
    ///
    /// 新计划在排除订单自身占用的前提下计算; 失败时原计划保持不变
    #[instrument(skip(self, board, options), fields(horizon = options.horizon_days, mode = ?options.mode))]
    pub fn move_order(
        &self,
        board: &mut ScheduleBoard,
        order_id: &str,
        line_id: &str,
        start: NaiveDate,
        options: &PlaceOptions,
    ) -> ScheduleResult<ChangeSet> {
        let order = board.order(order_id)?;
        match order.status() {
            OrderStatus::Scheduled | OrderStatus::InProgress => {}
            from => {
                return Err(ScheduleError::InvalidTransition {
                    order_id: order_id.to_string(),
                    from,
                    to: OrderStatus::Scheduled,
                })
            }
        }
        self.ensure_remaining(order)?;
        let line = Self::schedulable_line(board, line_id)?;

        let from_line = order.line_id().unwrap_or_default().to_string();
        let allocations = self.compute_plan(board, order, line, start, options)?;

        let mut order = order.clone();
        order.schedule = OrderSchedule::Pending;
        board.ledger_mut().remove_order(order_id);

        let mut change = ChangeSet::default();
        self.commit_plan(board, order, line_id, &allocations, &mut change);

        info!(order_id, from_line = %from_line, to_line = line_id, start = %start, "订单移动完成");
        Ok(change)
    }

    /// 冲突检测
    ///
    /// 朴素落位: 每个可生产日按有效产能装满剩余量, 不考虑其他订单;
    /// 若某日朴素分配量 > 当日可用产能, 即存在冲突
    pub fn detect_overlap(
        &self,
        board: &ScheduleBoard,
        order_id: &str,
        line_id: &str,
        start: NaiveDate,
        options: &PlaceOptions,
    ) -> ScheduleResult<OverlapReport> {
        let order = board.order(order_id)?;
        let line = Self::schedulable_line(board, line_id)?;
        let accountant = CapacityAccountant::new(board);

        let mut remaining = order.remaining_quantity();
        let mut offset = 0u32;
        let mut collisions = Vec::new();

        for date in Self::horizon(start, options.window_days()) {
            if remaining == 0 {
                break;
            }
            if accountant.is_holiday(line, date) {
                continue;
            }
            let efficiency = efficiency_on_day(options.ramp_up.as_ref(), offset);
            let naive = remaining.min(effective_capacity(line.capacity, efficiency));
            if naive == 0 {
                continue;
            }
            let available =
                accountant.available_capacity_with(line, date, efficiency, Some(order_id));
            if naive > available {
                collisions.push(OverlapDay {
                    date,
                    required: naive,
                    available,
                });
            }
            remaining -= naive;
            offset += 1;
        }

        debug!(order_id, line_id, collisions = collisions.len(), "冲突检测完成");
        Ok(OverlapReport {
            order_id: order_id.to_string(),
            line_id: line_id.to_string(),
            start_date: start,
            collisions,
        })
    }

    /// 记录某日实际产量 (quantity = 0 表示清除该日记录)
    ///
    /// 状态由记录总量推导: 0 → SCHEDULED, 未满 → IN_PROGRESS, 满额 → COMPLETED。
    /// 已完成订单允许修正, 修正后可回到 IN_PROGRESS
    #[instrument(skip(self, board))]
    pub fn record_actual(
        &self,
        board: &mut ScheduleBoard,
        order_id: &str,
        date: NaiveDate,
        quantity: u32,
    ) -> ScheduleResult<ChangeSet> {
        let order = board.order(order_id)?;
        let assignment = match &order.schedule {
            OrderSchedule::Scheduled(a)
            | OrderSchedule::InProgress(a)
            | OrderSchedule::Completed(a) => a.clone(),
            other => {
                return Err(ScheduleError::InvalidTransition {
                    order_id: order_id.to_string(),
                    from: other.status(),
                    to: OrderStatus::InProgress,
                })
            }
        };

        let mut order = order.clone();
        if quantity == 0 {
            order.actual_production.remove(&date);
        } else {
            order.actual_production.insert(date, quantity);
        }

        let recorded = order.produced_total();
        if recorded > u64::from(order.order_quantity) {
            warn!(order_id, recorded, order_quantity = order.order_quantity, "实际产量超出订单数量");
            return Err(ScheduleError::OverProduction {
                order_id: order_id.to_string(),
                recorded,
                order_quantity: order.order_quantity,
            });
        }

        let status = if recorded == u64::from(order.order_quantity) {
            OrderStatus::Completed
        } else if recorded > 0 {
            OrderStatus::InProgress
        } else {
            OrderStatus::Scheduled
        };
        order.schedule = OrderSchedule::with_status(assignment, status);

        let ledger = board.ledger_mut();
        ledger.set_actual(order_id, date, (quantity > 0).then_some(quantity));
        ledger.set_status(order_id, status);
        let plan = ledger.entries_for(order_id).to_vec();

        let mut change = ChangeSet::default();
        board.commit_order(order, Some(plan), &mut change);

        info!(order_id, date = %date, quantity, status = %status, "实际产量已记录");
        Ok(change)
    }

    // ==========================================
    // 内部方法
    // ==========================================

    /// 计算逐日分配 (纯函数, 不修改看板)
    pub fn compute_plan(
        &self,
        board: &ScheduleBoard,
        order: &Order,
        line: &ProductionLine,
        start: NaiveDate,
        options: &PlaceOptions,
    ) -> ScheduleResult<Vec<DayAllocation>> {
        let accountant = CapacityAccountant::new(board);
        let horizon_days = options.window_days();

        let mut remaining = order.remaining_quantity();
        let mut offset = 0u32;
        let mut working_days = 0u32;
        let mut allocations = Vec::new();

        for date in Self::horizon(start, horizon_days) {
            if accountant.is_holiday(line, date) {
                continue;
            }
            working_days += 1;

            let efficiency = efficiency_on_day(options.ramp_up.as_ref(), offset);
            let available = match options.mode {
                PlacementMode::Strict => accountant.available_capacity_with(
                    line,
                    date,
                    efficiency,
                    Some(order.order_id.as_str()),
                ),
                PlacementMode::Override => effective_capacity(line.capacity, efficiency),
            };

            let quantity = remaining.min(available);
            if quantity == 0 {
                continue;
            }
            allocations.push(DayAllocation {
                date,
                quantity,
                efficiency_pct: efficiency,
            });
            remaining -= quantity;
            offset += 1;

            if remaining == 0 {
                break;
            }
        }

        if remaining > 0 {
            warn!(
                order_id = %order.order_id,
                line_id = %line.line_id,
                start = %start,
                shortfall = remaining,
                working_days,
                "排产窗口内无法完成分配"
            );
            return Err(if working_days == 0 {
                ScheduleError::HolidayOnly {
                    order_id: order.order_id.clone(),
                    line_id: line.line_id.clone(),
                    start_date: start,
                    horizon_days,
                }
            } else {
                ScheduleError::CapacityExceeded {
                    order_id: order.order_id.clone(),
                    line_id: line.line_id.clone(),
                    start_date: start,
                    shortfall: remaining,
                }
            });
        }

        Ok(allocations)
    }

    /// 把分配结果写入看板, 订单置为 SCHEDULED
    fn commit_plan(
        &self,
        board: &mut ScheduleBoard,
        mut order: Order,
        line_id: &str,
        allocations: &[DayAllocation],
        change: &mut ChangeSet,
    ) {
        let (Some(first), Some(last)) = (allocations.first(), allocations.last()) else {
            return;
        };

        let entries: Vec<PlannedProduction> = allocations
            .iter()
            .map(|a| PlannedProduction {
                entry_id: uuid::Uuid::new_v4().to_string(),
                order_id: order.order_id.clone(),
                line_id: line_id.to_string(),
                plan_date: a.date,
                planned_quantity: a.quantity,
                actual_quantity: order.actual_production.get(&a.date).copied(),
                status: OrderStatus::Scheduled,
                order_index: board.ledger().next_order_index(line_id, a.date),
            })
            .collect();

        order.schedule = OrderSchedule::Scheduled(Assignment {
            line_id: line_id.to_string(),
            plan_start: first.date,
            plan_end: last.date,
        });
        board.commit_order(order, Some(entries), change);
    }

    fn ensure_remaining(&self, order: &Order) -> ScheduleResult<()> {
        if order.remaining_quantity() == 0 {
            return Err(ScheduleError::InvalidQuantity {
                order_id: order.order_id.clone(),
                quantity: 0,
                reason: "订单没有待生产数量".to_string(),
            });
        }
        Ok(())
    }

    fn schedulable_line<'b>(board: &'b ScheduleBoard, line_id: &str) -> ScheduleResult<&'b ProductionLine> {
        let line = board.line(line_id)?;
        if !line.is_schedulable() {
            return Err(ScheduleError::LineUnavailable {
                line_id: line_id.to_string(),
                status: line.status,
            });
        }
        Ok(line)
    }

    /// 窗口内的自然日序列
    fn horizon(start: NaiveDate, horizon_days: u32) -> impl Iterator<Item = NaiveDate> {
        (0..u64::from(horizon_days)).map_while(move |i| start.checked_add_days(Days::new(i)))
    }
}
