use super::core::ActionLogRepository;
use crate::db::{DATETIME_FORMAT, DATE_FORMAT};
use crate::domain::action_log::ActionLog;
use crate::repository::error::RepositoryResult;
use chrono::{NaiveDate, NaiveDateTime};
use rusqlite::{params, Result as SqliteResult, Row};

const SELECT_COLUMNS: &str = r#"
    SELECT action_id, action_type, action_ts, actor,
           order_id, line_id, date_range_start, date_range_end,
           payload_json, detail
    FROM action_log
"#;

impl ActionLogRepository {
    // ==========================================
    // 查询操作
    // ==========================================

    /// 按 action_id 查询单个日志
    pub fn find_by_id(&self, action_id: &str) -> RepositoryResult<Option<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE action_id = ?", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        match stmt.query_row(params![action_id], |row| self.map_row(row)) {
            Ok(log) => Ok(Some(log)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// 查询某订单的全部操作日志 (时间升序)
    pub fn find_by_order(&self, order_id: &str) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE order_id = ? ORDER BY action_ts ASC, rowid ASC", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![order_id], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 按操作类型查询
    pub fn find_by_action_type(&self, action_type: &str, limit: u32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE action_type = ? ORDER BY action_ts DESC, rowid DESC LIMIT ?",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![action_type, limit], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 查询指定时间范围的操作日志 (闭区间, 时间降序)
    pub fn find_by_time_range(
        &self,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE action_ts >= ? AND action_ts <= ? ORDER BY action_ts DESC, rowid DESC",
            SELECT_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(
                params![
                    start_time.format(DATETIME_FORMAT).to_string(),
                    end_time.format(DATETIME_FORMAT).to_string()
                ],
                |row| self.map_row(row),
            )?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 查询最近的操作日志
    pub fn find_recent(&self, limit: u32) -> RepositoryResult<Vec<ActionLog>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY action_ts DESC, rowid DESC LIMIT ?", SELECT_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;

        let logs = stmt
            .query_map(params![limit], |row| self.map_row(row))?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(logs)
    }

    /// 统计某订单的日志数量
    pub fn count_by_order(&self, order_id: &str) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM action_log WHERE order_id = ?",
            params![order_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==========================================
    // 辅助方法
    // ==========================================

    /// 将数据库行映射为 ActionLog 实体
    fn map_row(&self, row: &Row) -> SqliteResult<ActionLog> {
        let action_ts_str: String = row.get(2)?;
        let action_ts = NaiveDateTime::parse_from_str(&action_ts_str, DATETIME_FORMAT).map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
        })?;

        let payload_json_str: Option<String> = row.get(8)?;
        let payload_json = payload_json_str.and_then(|s| serde_json::from_str(&s).ok());

        let date_range_start_str: Option<String> = row.get(6)?;
        let date_range_end_str: Option<String> = row.get(7)?;

        Ok(ActionLog {
            action_id: row.get(0)?,
            action_type: row.get(1)?,
            action_ts,
            actor: row.get(3)?,
            order_id: row.get(4)?,
            line_id: row.get(5)?,
            date_range_start: date_range_start_str
                .and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
            date_range_end: date_range_end_str
                .and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok()),
            payload_json,
            detail: row.get(9)?,
        })
    }
}
