// ==========================================
// 成衣排产系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod action_log;
pub mod holiday;
pub mod line;
pub mod order;
pub mod plan;
pub mod purchase;
pub mod ramp_up;
pub mod types;

// 重导出核心类型
pub use action_log::{ActionLog, ActionType};
pub use holiday::{Holiday, HolidayLineAssignment};
pub use line::{LineGroup, ProductionLine};
pub use order::{Assignment, Order, OrderSchedule, SplitFamily, SplitInfo};
pub use plan::PlannedProduction;
pub use purchase::Purchase;
pub use ramp_up::{RampUpPlan, RampUpPoint};
pub use types::{LineStatus, OrderStatus, PlacementMode, PurchaseStatus};
