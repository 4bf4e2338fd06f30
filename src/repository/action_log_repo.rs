// ==========================================
// 成衣排产系统 - 操作日志数据仓储
// ==========================================
// 依据: action_log 表
// 红线: 所有排产写入必须记录
// ==========================================

mod core;
mod queries;


pub use core::ActionLogRepository;
pub(crate) use core::insert_log;
