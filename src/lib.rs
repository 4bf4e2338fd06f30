// ==========================================
// 成衣排产系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 产线排程与产能核算 (人工拖拽落位, 引擎校验产能)
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 排产规则
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 装配
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{LineStatus, OrderStatus, PlacementMode, PurchaseStatus};

// 领域实体
pub use domain::{
    ActionLog, ActionType, Assignment, Holiday, LineGroup, Order, OrderSchedule,
    PlannedProduction, ProductionLine, Purchase, RampUpPlan, RampUpPoint, SplitFamily,
};

// 引擎
pub use engine::{
    CapacityAccountant, ChangeSet, HolidayCalendar, ScheduleBoard, ScheduleError,
    SchedulingEngine, SplitBookkeeper,
};

// API
pub use api::{ApiError, ReportApi, ScheduleApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "成衣排产系统";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
