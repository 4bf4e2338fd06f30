// ==========================================
// 成衣排产系统 - 引擎层错误类型
// ==========================================
// 所有错误均可恢复, 并携带足够上下文供前端提示
// InvariantViolation 表示此前存在缺陷, 必须记录完整状态, 不得吞掉
// ==========================================

use crate::domain::types::{LineStatus, OrderStatus};
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    // ===== 排产失败 =====
    #[error("产能不足: order={order_id}, line={line_id}, start={start_date}, 缺口={shortfall}")]
    CapacityExceeded {
        order_id: String,
        line_id: String,
        start_date: NaiveDate,
        shortfall: u32,
    },

    #[error("排产窗口内全部为假期: order={order_id}, line={line_id}, start={start_date}, horizon={horizon_days}天")]
    HolidayOnly {
        order_id: String,
        line_id: String,
        start_date: NaiveDate,
        horizon_days: u32,
    },

    #[error("产线不可排产: line={line_id}, status={status}")]
    LineUnavailable { line_id: String, status: LineStatus },

    // ===== 拆单/数量 =====
    #[error("拆分数量无效: order={order_id}, split={split_quantity}, order_quantity={order_quantity}, 未生产={remaining}")]
    InvalidSplitQuantity {
        order_id: String,
        split_quantity: u32,
        order_quantity: u32,
        remaining: u32,
    },

    #[error("数量无效: order={order_id}, quantity={quantity}, {reason}")]
    InvalidQuantity {
        order_id: String,
        quantity: u32,
        reason: String,
    },

    #[error("实际产量超出订单数量: order={order_id}, recorded={recorded}, order_quantity={order_quantity}")]
    OverProduction {
        order_id: String,
        recorded: u64,
        order_quantity: u32,
    },

    #[error("合单被拒绝: fragment={fragment_id}, into={into_id}, {reason}")]
    MergeRejected {
        fragment_id: String,
        into_id: String,
        reason: String,
    },

    #[error("PO号已被占用: po={po_number}, 已有订单={existing_order_id}")]
    DuplicatePoNumber {
        po_number: String,
        existing_order_id: String,
    },

    // ===== 状态机 =====
    #[error("无效的状态转换: order={order_id}, from={from} to={to}")]
    InvalidTransition {
        order_id: String,
        from: OrderStatus,
        to: OrderStatus,
    },

    // ===== 不变量 =====
    #[error("拆单家族数量不守恒: base_po={base_po_number}, expected={expected}, actual={actual}")]
    InvariantViolation {
        base_po_number: String,
        expected: u64,
        actual: u64,
    },

    #[error("记录未找到: {entity} with id={id}")]
    NotFound { entity: String, id: String },
}

impl ScheduleError {
    pub fn not_found(entity: &str, id: &str) -> Self {
        ScheduleError::NotFound {
            entity: entity.to_string(),
            id: id.to_string(),
        }
    }

    /// 是否属于缺陷类错误 (而非普通用户操作错误)
    pub fn is_defect(&self) -> bool {
        matches!(self, ScheduleError::InvariantViolation { .. })
    }
}

pub type ScheduleResult<T> = Result<T, ScheduleError>;
