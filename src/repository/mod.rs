// ==========================================
// 成衣排产系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod action_log_repo;
pub mod change_set_repo;
pub mod error;
pub mod holiday_repo;
pub mod line_repo;
pub mod order_repo;
pub mod plan_repo;
pub mod purchase_repo;
pub mod ramp_up_repo;

// 重导出核心仓储
pub use action_log_repo::ActionLogRepository;
pub use change_set_repo::ChangeSetRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use holiday_repo::HolidayRepository;
pub use line_repo::LineRepository;
pub use order_repo::OrderRepository;
pub use plan_repo::PlannedProductionRepository;
pub use purchase_repo::PurchaseRepository;
pub use ramp_up_repo::RampUpRepository;
