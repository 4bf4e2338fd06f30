// ==========================================
// 成衣排产系统 - 排产 API
// ==========================================
// 职责: 加载排产看板 → 调用引擎 → 变更集 + 操作日志同事务落库
// 红线: 引擎拒绝时数据库不产生任何写入
// 红线: 写操作串行执行, 避免两次操作基于同一份旧看板
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::action_log::{ActionLog, ActionType};
use crate::domain::order::Order;
use crate::domain::plan::PlannedProduction;
use crate::domain::types::PurchaseStatus;
use crate::engine::{
    ChangeSet, HolidayCalendar, OverlapReport, PlaceOptions, ScheduleBoard, ScheduleError,
    SchedulingEngine, SplitBookkeeper,
};
use crate::repository::{
    ChangeSetRepository, HolidayRepository, LineRepository, OrderRepository,
    PlannedProductionRepository, PurchaseRepository, RampUpRepository,
};
use chrono::NaiveDate;
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tracing::{info, instrument, warn};

// ==========================================
// ScheduleOutcome - 写操作结果
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleOutcome {
    pub action_id: Option<String>,                           // 无变更时为 None
    pub orders: Vec<Order>,                                  // 新增/更新的订单
    pub deleted_orders: Vec<String>,                         // 删除的订单
    pub plans: BTreeMap<String, Vec<PlannedProduction>>,     // 订单 → 新计划明细
}

impl ScheduleOutcome {
    fn from_change(change: ChangeSet, action_id: Option<String>) -> Self {
        Self {
            action_id,
            orders: change.upserted_orders,
            deleted_orders: change.deleted_orders,
            plans: change.plan_replacements,
        }
    }

    pub fn order(&self, order_id: &str) -> Option<&Order> {
        self.orders.iter().find(|o| o.order_id == order_id)
    }
}

/// 拆单结果
#[derive(Debug, Clone, Serialize)]
pub struct SplitResponse {
    pub fragment_id: String,
    pub outcome: ScheduleOutcome,
}

// ==========================================
// ScheduleApi - 排产API
// ==========================================
pub struct ScheduleApi {
    line_repo: Arc<LineRepository>,
    holiday_repo: Arc<HolidayRepository>,
    ramp_up_repo: Arc<RampUpRepository>,
    order_repo: Arc<OrderRepository>,
    plan_repo: Arc<PlannedProductionRepository>,
    purchase_repo: Arc<PurchaseRepository>,
    change_set_repo: Arc<ChangeSetRepository>,
    config_manager: Arc<ConfigManager>,
    engine: SchedulingEngine,
    bookkeeper: SplitBookkeeper,
    write_lock: Mutex<()>,
}

impl ScheduleApi {
    /// 创建新的ScheduleApi实例
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        line_repo: Arc<LineRepository>,
        holiday_repo: Arc<HolidayRepository>,
        ramp_up_repo: Arc<RampUpRepository>,
        order_repo: Arc<OrderRepository>,
        plan_repo: Arc<PlannedProductionRepository>,
        purchase_repo: Arc<PurchaseRepository>,
        change_set_repo: Arc<ChangeSetRepository>,
        config_manager: Arc<ConfigManager>,
    ) -> Self {
        Self {
            line_repo,
            holiday_repo,
            ramp_up_repo,
            order_repo,
            plan_repo,
            purchase_repo,
            change_set_repo,
            config_manager,
            engine: SchedulingEngine::new(),
            bookkeeper: SplitBookkeeper::new(),
            write_lock: Mutex::new(()),
        }
    }

    // ==========================================
    // 看板加载
    // ==========================================

    /// 从数据库加载完整排产看板
    pub fn load_board(&self) -> ApiResult<ScheduleBoard> {
        let calendar = HolidayCalendar::from_records(
            self.holiday_repo.list_holidays()?,
            &self.holiday_repo.list_assignments()?,
        );
        let mut board = ScheduleBoard::new(calendar);

        for line in self.line_repo.list_lines()? {
            board.insert_line(line);
        }
        for order in self.order_repo.list_all()? {
            board.insert_order(order);
        }
        for entry in self.plan_repo.list_all()? {
            board.insert_plan_entry(entry);
        }
        for family in self.order_repo.list_families()? {
            board.insert_family(family);
        }
        Ok(board)
    }

    /// 组装落位参数: 排产窗口 / 落位模式 / 默认爬坡计划
    pub fn place_options(&self, line_id: &str) -> ApiResult<PlaceOptions> {
        let horizon_days = self.config_manager.scheduling_horizon_days()?;
        let mode = self.config_manager.placement_mode(Some(line_id))?;

        let ramp_up = match self.config_manager.default_ramp_up_plan_id()? {
            Some(plan_id) => {
                let plan = self.ramp_up_repo.find_plan(&plan_id)?;
                if plan.is_none() {
                    warn!(plan_id = %plan_id, "默认爬坡计划不存在，按满效率排产");
                }
                plan
            }
            None => None,
        };

        Ok(PlaceOptions {
            horizon_days,
            mode,
            ramp_up,
        })
    }

    // ==========================================
    // 排产操作
    // ==========================================

    /// 落位: 待排订单 → 产线 + 开始日期
    #[instrument(skip(self))]
    pub fn place_order(
        &self,
        order_id: &str,
        line_id: &str,
        start_date: NaiveDate,
        actor: &str,
    ) -> ApiResult<ScheduleOutcome> {
        let _guard = self.lock_writes()?;
        let options = self.place_options(line_id)?;
        let mut board = self.load_board()?;

        let change = self
            .engine
            .place(&mut board, order_id, line_id, start_date, &options)?;

        let log = ActionLog::new(ActionType::Place, actor)
            .with_order(order_id)
            .with_line(line_id)
            .with_payload(&json!({
                "start_date": start_date,
                "mode": options.mode.to_db_str(),
                "horizon_days": options.horizon_days,
                "ramp_up_plan_id": options.ramp_up.as_ref().map(|p| p.plan_id.clone()),
            }));
        self.persist(change, log)
    }

    /// 退回待排池
    #[instrument(skip(self))]
    pub fn drop_order(&self, order_id: &str, actor: &str) -> ApiResult<ScheduleOutcome> {
        let _guard = self.lock_writes()?;
        let mut board = self.load_board()?;
        let previous_line = board.order(order_id)?.line_id().map(str::to_string);

        let change = self.engine.drop_order(&mut board, order_id)?;

        let mut log = ActionLog::new(ActionType::Drop, actor).with_order(order_id);
        if let Some(line_id) = previous_line {
            log = log.with_line(line_id);
        }
        self.persist(change, log)
    }

    /// 移动到新产线/新日期
    #[instrument(skip(self))]
    pub fn move_order(
        &self,
        order_id: &str,
        line_id: &str,
        start_date: NaiveDate,
        actor: &str,
    ) -> ApiResult<ScheduleOutcome> {
        let _guard = self.lock_writes()?;
        let options = self.place_options(line_id)?;
        let mut board = self.load_board()?;
        let from = board.order(order_id)?.assignment().cloned();

        let change = self
            .engine
            .move_order(&mut board, order_id, line_id, start_date, &options)?;

        let log = ActionLog::new(ActionType::Move, actor)
            .with_order(order_id)
            .with_line(line_id)
            .with_payload(&json!({
                "from": from,
                "to_line_id": line_id,
                "to_start_date": start_date,
                "mode": options.mode.to_db_str(),
            }));
        self.persist(change, log)
    }

    /// 冲突预检 (只读)
    pub fn detect_overlap(
        &self,
        order_id: &str,
        line_id: &str,
        start_date: NaiveDate,
    ) -> ApiResult<OverlapReport> {
        let options = self.place_options(line_id)?;
        let board = self.load_board()?;
        Ok(self
            .engine
            .detect_overlap(&board, order_id, line_id, start_date, &options)?)
    }

    /// 记录某日实际产量 (数量为 0 表示清除当日记录)
    #[instrument(skip(self))]
    pub fn record_actual_production(
        &self,
        order_id: &str,
        date: NaiveDate,
        quantity: u32,
        actor: &str,
    ) -> ApiResult<ScheduleOutcome> {
        let _guard = self.lock_writes()?;
        let mut board = self.load_board()?;

        let change = self.engine.record_actual(&mut board, order_id, date, quantity)?;

        let log = ActionLog::new(ActionType::RecordOutput, actor)
            .with_order(order_id)
            .with_date_range(date, date)
            .with_payload(&json!({ "date": date, "quantity": quantity }));
        self.persist(change, log)
    }

    // ==========================================
    // 拆单 / 合单 / 改数量
    // ==========================================

    #[instrument(skip(self))]
    pub fn split_order(
        &self,
        order_id: &str,
        split_quantity: u32,
        actor: &str,
    ) -> ApiResult<SplitResponse> {
        let _guard = self.lock_writes()?;
        let mut board = self.load_board()?;

        let outcome = self.bookkeeper.split(&mut board, order_id, split_quantity)?;

        let log = ActionLog::new(ActionType::Split, actor)
            .with_order(order_id)
            .with_payload(&json!({
                "split_quantity": split_quantity,
                "fragment_id": outcome.fragment_id,
            }));
        let fragment_id = outcome.fragment_id.clone();
        let persisted = self.persist(outcome.change, log)?;
        Ok(SplitResponse {
            fragment_id,
            outcome: persisted,
        })
    }

    #[instrument(skip(self))]
    pub fn merge_orders(
        &self,
        fragment_id: &str,
        into_id: &str,
        actor: &str,
    ) -> ApiResult<ScheduleOutcome> {
        let _guard = self.lock_writes()?;
        let mut board = self.load_board()?;

        let change = self.bookkeeper.merge(&mut board, fragment_id, into_id)?;

        let log = ActionLog::new(ActionType::Merge, actor)
            .with_order(into_id)
            .with_payload(&json!({ "fragment_id": fragment_id, "into_id": into_id }));
        self.persist(change, log)
    }

    #[instrument(skip(self))]
    pub fn update_order_quantity(
        &self,
        order_id: &str,
        new_quantity: u32,
        actor: &str,
    ) -> ApiResult<ScheduleOutcome> {
        let _guard = self.lock_writes()?;
        let mut board = self.load_board()?;
        let old_quantity = board.order(order_id)?.order_quantity;

        let change = self
            .bookkeeper
            .update_quantity(&mut board, order_id, new_quantity)?;

        let log = ActionLog::new(ActionType::UpdateQuantity, actor)
            .with_order(order_id)
            .with_payload(&json!({ "from": old_quantity, "to": new_quantity }));
        self.persist(change, log)
    }

    /// 全量校验拆单家族守恒
    pub fn verify_families(&self) -> ApiResult<Vec<ScheduleError>> {
        let board = self.load_board()?;
        Ok(self.bookkeeper.verify_all(&board))
    }

    // ==========================================
    // ERP 采购单
    // ==========================================

    /// 采购单转为待排订单
    #[instrument(skip(self))]
    pub fn admit_purchase(&self, purchase_id: &str, style: &str, actor: &str) -> ApiResult<Order> {
        if style.trim().is_empty() {
            return Err(ApiError::InvalidInput("款号不能为空".to_string()));
        }
        let _guard = self.lock_writes()?;

        let purchase = self
            .purchase_repo
            .find_by_id(purchase_id)?
            .ok_or_else(|| ApiError::NotFound(format!("采购单{}不存在", purchase_id)))?;
        if purchase.status != PurchaseStatus::Pending {
            return Err(ApiError::BusinessRuleViolation(format!(
                "采购单{}状态为{}，不能重复转单",
                purchase_id, purchase.status
            )));
        }
        if purchase.total_quantity == 0 {
            return Err(ApiError::InvalidInput(format!(
                "采购单{}数量为0",
                purchase_id
            )));
        }

        let order = purchase.to_order(uuid::Uuid::new_v4().to_string(), style.trim());
        let board = self.load_board()?;
        self.bookkeeper.check_new_order(&board, &order)?;

        let log = ActionLog::new(ActionType::AdmitPurchase, actor)
            .with_order(order.order_id.clone())
            .with_payload(&json!({
                "purchase_id": purchase_id,
                "po_number": purchase.po_number,
                "quantity": purchase.total_quantity,
            }));
        self.purchase_repo.admit(purchase_id, &order, &log)?;

        info!(order_id = %order.order_id, po = %order.po_number, "采购单已转为待排订单");
        Ok(order)
    }

    // ==========================================
    // 内部辅助
    // ==========================================

    fn lock_writes(&self) -> ApiResult<std::sync::MutexGuard<()>> {
        self.write_lock
            .lock()
            .map_err(|e| ApiError::InternalError(format!("写锁获取失败: {}", e)))
    }

    /// 变更集落库, 日志补充影响日期范围
    fn persist(&self, change: ChangeSet, log: ActionLog) -> ApiResult<ScheduleOutcome> {
        if change.is_empty() {
            return Ok(ScheduleOutcome::from_change(change, None));
        }

        let dates: Vec<NaiveDate> = change
            .plan_replacements
            .values()
            .flatten()
            .map(|e| e.plan_date)
            .collect();
        let log = match (log.date_range_start, dates.iter().min(), dates.iter().max()) {
            (None, Some(&start), Some(&end)) => log.with_date_range(start, end),
            _ => log,
        };

        self.change_set_repo
            .apply(&change, std::slice::from_ref(&log))?;

        info!(
            action = %log.action_type,
            action_id = %log.action_id,
            orders = change.upserted_orders.len(),
            "排产操作已提交"
        );
        Ok(ScheduleOutcome::from_change(change, Some(log.action_id)))
    }
}
