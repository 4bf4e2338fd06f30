// ==========================================
// 成衣排产系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口, 是排产数据唯一的写入入口
// ==========================================

pub mod error;
pub mod report_api;
pub mod schedule_api;

// 重导出核心类型
pub use error::{ApiError, ApiResult};
pub use report_api::{LineLoadSummary, ReportApi};
pub use schedule_api::{ScheduleApi, ScheduleOutcome, SplitResponse};
