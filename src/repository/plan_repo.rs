// ==========================================
// 成衣排产系统 - 计划明细数据仓储
// ==========================================
// 依据: planned_production 表
// 红线: 一个订单的计划明细只能整体替换, 不做局部修补
// ==========================================

use crate::domain::plan::PlannedProduction;
use crate::domain::types::OrderStatus;
use crate::repository::error::{format_date, parse_date, RepositoryError, RepositoryResult};
use chrono::NaiveDate;
use rusqlite::{params, Connection, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_PLAN: &str = r#"
    SELECT entry_id, order_id, line_id, plan_date, planned_quantity,
           actual_quantity, status, order_index
    FROM planned_production
"#;

// ==========================================
// PlannedProductionRepository - 计划明细仓储
// ==========================================
pub struct PlannedProductionRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PlannedProductionRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 查询全部计划明细
    pub fn list_all(&self) -> RepositoryResult<Vec<PlannedProduction>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY line_id, plan_date, order_index", SELECT_PLAN);
        query_entries(&conn, &sql, [])
    }

    /// 查询订单的计划明细 (日期升序)
    pub fn find_by_order(&self, order_id: &str) -> RepositoryResult<Vec<PlannedProduction>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE order_id = ?1 ORDER BY plan_date", SELECT_PLAN);
        query_entries(&conn, &sql, params![order_id])
    }

    /// 查询产线在日期区间内的计划明细 (闭区间)
    pub fn find_by_line_and_range(
        &self,
        line_id: &str,
        from: NaiveDate,
        to: NaiveDate,
    ) -> RepositoryResult<Vec<PlannedProduction>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE line_id = ?1 AND plan_date >= ?2 AND plan_date <= ?3 ORDER BY plan_date, order_index",
            SELECT_PLAN
        );
        query_entries(&conn, &sql, params![line_id, format_date(from), format_date(to)])
    }

    /// 查询日期区间内全部产线的计划明细
    pub fn find_by_range(&self, from: NaiveDate, to: NaiveDate) -> RepositoryResult<Vec<PlannedProduction>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE plan_date >= ?1 AND plan_date <= ?2 ORDER BY line_id, plan_date, order_index",
            SELECT_PLAN
        );
        query_entries(&conn, &sql, params![format_date(from), format_date(to)])
    }

    /// 统计单元格已承诺量
    pub fn sum_cell(&self, line_id: &str, date: NaiveDate) -> RepositoryResult<u64> {
        let conn = self.get_conn()?;
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(planned_quantity), 0) FROM planned_production WHERE line_id = ?1 AND plan_date = ?2",
            params![line_id, format_date(date)],
            |row| row.get(0),
        )?;
        Ok(u64::try_from(total).unwrap_or(0))
    }

    pub fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM planned_production", [], |row| row.get(0))?;
        Ok(count)
    }
}

fn query_entries<P: rusqlite::Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> RepositoryResult<Vec<PlannedProduction>> {
    let mut stmt = conn.prepare(sql)?;
    let rows = stmt
        .query_map(params, map_plan_row)?
        .collect::<SqliteResult<Vec<_>>>()?;
    Ok(rows)
}

fn map_plan_row(row: &Row) -> SqliteResult<PlannedProduction> {
    let date_str: String = row.get(3)?;
    let status_str: String = row.get(6)?;
    let status = OrderStatus::from_str(&status_str).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            6,
            rusqlite::types::Type::Text,
            format!("无法识别的状态: {}", status_str).into(),
        )
    })?;

    Ok(PlannedProduction {
        entry_id: row.get(0)?,
        order_id: row.get(1)?,
        line_id: row.get(2)?,
        plan_date: parse_date(3, &date_str)?,
        planned_quantity: row.get(4)?,
        actual_quantity: row.get(5)?,
        status,
        order_index: row.get(7)?,
    })
}

// ==========================================
// 事务内写入辅助
// ==========================================

/// 整体替换订单的计划明细 (先删后插)
pub(crate) fn replace_for_order(
    conn: &Connection,
    order_id: &str,
    entries: &[PlannedProduction],
) -> RepositoryResult<()> {
    conn.execute(
        "DELETE FROM planned_production WHERE order_id = ?1",
        params![order_id],
    )?;

    let mut stmt = conn.prepare(
        r#"
        INSERT INTO planned_production (
            entry_id, order_id, line_id, plan_date, planned_quantity,
            actual_quantity, status, order_index
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )?;
    for entry in entries {
        if entry.order_id != order_id {
            return Err(RepositoryError::field(
                "order_id",
                format!("计划明细 {} 不属于订单 {}", entry.entry_id, order_id),
            ));
        }
        stmt.execute(params![
            entry.entry_id,
            entry.order_id,
            entry.line_id,
            format_date(entry.plan_date),
            entry.planned_quantity,
            entry.actual_quantity,
            entry.status.to_db_str(),
            entry.order_index,
        ])?;
    }
    Ok(())
}
