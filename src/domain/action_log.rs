// ==========================================
// 成衣排产系统 - 操作日志领域模型
// ==========================================
// 红线: 所有排产写入必须记录
// 用途: 审计追踪
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

// ==========================================
// ActionLog - 操作日志
// ==========================================
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionLog {
    // ===== 主键 =====
    pub action_id: String,        // 日志ID
    pub action_type: String,      // 操作类型 (存储为字符串)
    pub action_ts: NaiveDateTime, // 操作时间戳
    pub actor: String,            // 操作人

    // ===== 影响范围 =====
    pub order_id: Option<String>,           // 订单
    pub line_id: Option<String>,            // 产线
    pub date_range_start: Option<NaiveDate>, // 影响开始日期
    pub date_range_end: Option<NaiveDate>,   // 影响结束日期

    // ===== 操作负载 =====
    pub payload_json: Option<JsonValue>,
    pub detail: Option<String>,
}

// ==========================================
// ActionType - 操作类型
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActionType {
    Place,          // 落位排产
    Drop,           // 退回待排池
    Move,           // 移动
    Split,          // 拆单
    Merge,          // 合单
    UpdateQuantity, // 修改数量
    RecordOutput,   // 记录实际产量
    AdmitPurchase,  // 采购单转订单
}

impl ActionType {
    /// 转换为字符串 (用于数据库存储)
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionType::Place => "Place",
            ActionType::Drop => "Drop",
            ActionType::Move => "Move",
            ActionType::Split => "Split",
            ActionType::Merge => "Merge",
            ActionType::UpdateQuantity => "UpdateQuantity",
            ActionType::RecordOutput => "RecordOutput",
            ActionType::AdmitPurchase => "AdmitPurchase",
        }
    }

    /// 从字符串解析
    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "Place" => Some(ActionType::Place),
            "Drop" => Some(ActionType::Drop),
            "Move" => Some(ActionType::Move),
            "Split" => Some(ActionType::Split),
            "Merge" => Some(ActionType::Merge),
            "UpdateQuantity" => Some(ActionType::UpdateQuantity),
            "RecordOutput" => Some(ActionType::RecordOutput),
            "AdmitPurchase" => Some(ActionType::AdmitPurchase),
            _ => None,
        }
    }
}

// ==========================================
// ActionLog 辅助方法
// ==========================================
impl ActionLog {
    /// 创建新的操作日志 (action_id 使用 UUID v4)
    pub fn new(action_type: ActionType, actor: impl Into<String>) -> Self {
        Self {
            action_id: uuid::Uuid::new_v4().to_string(),
            action_type: action_type.as_str().to_string(),
            action_ts: chrono::Utc::now().naive_utc(),
            actor: actor.into(),
            order_id: None,
            line_id: None,
            date_range_start: None,
            date_range_end: None,
            payload_json: None,
            detail: None,
        }
    }

    pub fn with_order(mut self, order_id: impl Into<String>) -> Self {
        self.order_id = Some(order_id.into());
        self
    }

    pub fn with_line(mut self, line_id: impl Into<String>) -> Self {
        self.line_id = Some(line_id.into());
        self
    }

    /// 设置日期范围
    pub fn with_date_range(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.date_range_start = Some(start);
        self.date_range_end = Some(end);
        self
    }

    /// 设置操作负载 (转换为JSON)
    pub fn with_payload<T: Serialize>(mut self, payload: &T) -> Self {
        self.payload_json = serde_json::to_value(payload).ok();
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn parsed_action_type(&self) -> Option<ActionType> {
        ActionType::from_str(&self.action_type)
    }
}
