// ==========================================
// 成衣排产系统 - 引擎层
// ==========================================
// 职责: 排产与产能核算规则, 不拼 SQL
// 红线: 输入由调用方预先加载, 引擎内部无 I/O
// ==========================================

pub mod board;
pub mod calendar;
pub mod capacity;
pub mod error;
pub mod ramp_up;
pub mod scheduler;
pub mod split;

// 重导出核心引擎
pub use board::{CellEntry, ChangeSet, PlanLedger, ScheduleBoard};
pub use calendar::HolidayCalendar;
pub use capacity::{CapacityAccountant, CellReport};
pub use error::{ScheduleError, ScheduleResult};
pub use ramp_up::{effective_capacity, efficiency_on_day};
pub use scheduler::{
    DayAllocation, OverlapDay, OverlapReport, PlaceOptions, SchedulingEngine,
    DEFAULT_HORIZON_DAYS,
};
pub use split::{FamilyMember, FamilyView, SplitBookkeeper, SplitOutcome};
