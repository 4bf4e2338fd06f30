// ==========================================
// 成衣排产系统 - 领域类型定义
// ==========================================
// 状态枚举统一提供 Display / from_str / to_db_str
// 数据库存储格式: SCREAMING_SNAKE_CASE
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 订单状态 (Order Status)
// ==========================================
// 状态机: PENDING → SCHEDULED → IN_PROGRESS → COMPLETED
// 旁路: SCHEDULED / IN_PROGRESS → PENDING (退回待排池)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Pending,    // 待排
    Scheduled,  // 已排产
    InProgress, // 生产中
    Completed,  // 已完成
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl OrderStatus {
    /// 从字符串解析状态（未知值返回 None，由调用方决定如何报错）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "PENDING" => Some(OrderStatus::Pending),
            "SCHEDULED" => Some(OrderStatus::Scheduled),
            "IN_PROGRESS" => Some(OrderStatus::InProgress),
            "COMPLETED" => Some(OrderStatus::Completed),
            _ => None,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "PENDING",
            OrderStatus::Scheduled => "SCHEDULED",
            OrderStatus::InProgress => "IN_PROGRESS",
            OrderStatus::Completed => "COMPLETED",
        }
    }
}

// ==========================================
// 产线状态 (Line Status)
// ==========================================
// 仅 ACTIVE 产线接受新排产
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LineStatus {
    Active,      // 正常
    Maintenance, // 维护
    Offline,     // 停用
}

impl fmt::Display for LineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl LineStatus {
    /// 从字符串解析状态（未知值按 OFFLINE 处理，避免误排产）
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "ACTIVE" => LineStatus::Active,
            "MAINTENANCE" => LineStatus::Maintenance,
            _ => LineStatus::Offline,
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            LineStatus::Active => "ACTIVE",
            LineStatus::Maintenance => "MAINTENANCE",
            LineStatus::Offline => "OFFLINE",
        }
    }
}

// ==========================================
// 采购单状态 (Purchase Status)
// ==========================================
// ERP 同步来源的订单在进入排产前的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PurchaseStatus {
    Pending,   // 待处理
    Planned,   // 已转入排产
    Completed, // 已完成
}

impl fmt::Display for PurchaseStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

impl PurchaseStatus {
    /// 从字符串解析状态
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "PLANNED" => PurchaseStatus::Planned,
            "COMPLETED" => PurchaseStatus::Completed,
            _ => PurchaseStatus::Pending, // 默认值
        }
    }

    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PurchaseStatus::Pending => "PENDING",
            PurchaseStatus::Planned => "PLANNED",
            PurchaseStatus::Completed => "COMPLETED",
        }
    }
}

// ==========================================
// 落位模式 (Placement Mode)
// ==========================================
// STRICT: 只占用剩余产能
// OVERRIDE: 人工确认超排，按有效产能落位并忽略其他订单的占用
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PlacementMode {
    #[default]
    Strict,
    Override,
}

impl PlacementMode {
    pub fn from_str(s: &str) -> Self {
        match s.trim().to_uppercase().as_str() {
            "OVERRIDE" => PlacementMode::Override,
            _ => PlacementMode::Strict,
        }
    }

    pub fn to_db_str(&self) -> &'static str {
        match self {
            PlacementMode::Strict => "STRICT",
            PlacementMode::Override => "OVERRIDE",
        }
    }
}
