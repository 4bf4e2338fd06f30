// ==========================================
// 成衣排产系统 - 节假日数据仓储
// ==========================================
// 依据: holiday / holiday_line 表
// 红线: 同一日期同名节假日只保留一条
// ==========================================

use crate::domain::holiday::{Holiday, HolidayLineAssignment};
use crate::repository::error::{format_date, parse_date, RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

pub struct HolidayRepository {
    conn: Arc<Mutex<Connection>>,
}

impl HolidayRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存节假日
    ///
    /// 同日期同名已存在时更新 is_global, 返回库内实际的 holiday_id
    pub fn save_holiday(&self, holiday: &Holiday) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let date_str = format_date(holiday.date);
        conn.execute(
            r#"
            INSERT INTO holiday (holiday_id, holiday_date, name, is_global)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(holiday_date, name) DO UPDATE SET is_global = excluded.is_global
            "#,
            params![holiday.holiday_id, date_str, holiday.name, holiday.is_global],
        )?;
        let id: String = conn.query_row(
            "SELECT holiday_id FROM holiday WHERE holiday_date = ?1 AND name = ?2",
            params![date_str, holiday.name],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    pub fn delete_holiday(&self, holiday_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute("DELETE FROM holiday WHERE holiday_id = ?1", params![holiday_id])?;
        Ok(())
    }

    /// 查询全部节假日 (日期升序)
    pub fn list_holidays(&self) -> RepositoryResult<Vec<Holiday>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT holiday_id, holiday_date, name, is_global
            FROM holiday ORDER BY holiday_date ASC, name ASC
            "#,
        )?;
        let holidays = stmt
            .query_map([], map_holiday_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(holidays)
    }

    /// 查询日期区间内的节假日 (闭区间)
    pub fn list_in_range(&self, from: NaiveDate, to: NaiveDate) -> RepositoryResult<Vec<Holiday>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT holiday_id, holiday_date, name, is_global
            FROM holiday
            WHERE holiday_date >= ?1 AND holiday_date <= ?2
            ORDER BY holiday_date ASC, name ASC
            "#,
        )?;
        let holidays = stmt
            .query_map(params![format_date(from), format_date(to)], map_holiday_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(holidays)
    }

    // ==========================================
    // 节假日 ↔ 产线 分配
    // ==========================================

    pub fn assign_line(&self, holiday_id: &str, line_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT OR IGNORE INTO holiday_line (holiday_id, line_id) VALUES (?1, ?2)",
            params![holiday_id, line_id],
        )?;
        Ok(())
    }

    pub fn unassign_line(&self, holiday_id: &str, line_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "DELETE FROM holiday_line WHERE holiday_id = ?1 AND line_id = ?2",
            params![holiday_id, line_id],
        )?;
        Ok(())
    }

    pub fn list_assignments(&self) -> RepositoryResult<Vec<HolidayLineAssignment>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT holiday_id, line_id FROM holiday_line ORDER BY holiday_id, line_id",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(HolidayLineAssignment {
                    holiday_id: row.get(0)?,
                    line_id: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }
}

fn map_holiday_row(row: &Row) -> SqliteResult<Holiday> {
    let date_str: String = row.get(1)?;
    Ok(Holiday {
        holiday_id: row.get(0)?,
        date: parse_date(1, &date_str)?,
        name: row.get(2)?,
        is_global: row.get(3)?,
    })
}
