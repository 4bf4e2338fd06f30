use crate::db::{DATETIME_FORMAT, DATE_FORMAT};
use crate::domain::action_log::ActionLog;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection};
use std::sync::{Arc, Mutex};

// ==========================================
// ActionLogRepository - 操作日志仓储
// ==========================================
// 红线: Repository 不做业务逻辑,只做数据映射
pub struct ActionLogRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ActionLogRepository {
    /// 创建新的操作日志仓储
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    pub(super) fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入操作日志
    ///
    /// # 返回
    /// - `Ok(action_id)`: 成功插入,返回action_id
    /// - `Err(...)`: 数据库错误
    pub fn insert(&self, log: &ActionLog) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        insert_log(&conn, log)?;
        Ok(log.action_id.clone())
    }
}

/// 在给定连接/事务上写入一条日志
///
/// 变更集落库时与业务写入共用同一事务
pub(crate) fn insert_log(conn: &Connection, log: &ActionLog) -> RepositoryResult<()> {
    conn.execute(
        r#"
        INSERT INTO action_log (
            action_id, action_type, action_ts, actor,
            order_id, line_id, date_range_start, date_range_end,
            payload_json, detail
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        "#,
        params![
            log.action_id,
            log.action_type,
            log.action_ts.format(DATETIME_FORMAT).to_string(),
            log.actor,
            log.order_id,
            log.line_id,
            log.date_range_start.map(|d| d.format(DATE_FORMAT).to_string()),
            log.date_range_end.map(|d| d.format(DATE_FORMAT).to_string()),
            log.payload_json.as_ref().map(|v| v.to_string()),
            log.detail,
        ],
    )?;
    Ok(())
}
