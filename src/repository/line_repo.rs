// ==========================================
// 成衣排产系统 - 产线数据仓储
// ==========================================
// 依据: production_line / line_group 表
// 红线: Repository 不含业务逻辑
// ==========================================

use crate::domain::line::{LineGroup, ProductionLine};
use crate::domain::types::LineStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

// ==========================================
// LineRepository - 产线仓储
// ==========================================

/// 产线仓储
/// 职责: 管理 production_line 与 line_group 表的CRUD操作
pub struct LineRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LineRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 产线
    // ==========================================

    /// 插入或更新产线
    pub fn upsert_line(&self, line: &ProductionLine) -> RepositoryResult<()> {
        if line.capacity == 0 {
            return Err(RepositoryError::field("capacity", "产线产能必须大于0"));
        }
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO production_line (line_id, name, capacity, group_id, status, sort_order)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(line_id) DO UPDATE SET
                name = excluded.name,
                capacity = excluded.capacity,
                group_id = excluded.group_id,
                status = excluded.status,
                sort_order = excluded.sort_order
            "#,
            params![
                line.line_id,
                line.name,
                line.capacity,
                line.group_id,
                line.status.to_db_str(),
                line.sort_order,
            ],
        )?;
        Ok(())
    }

    /// 按ID查询产线
    pub fn find_line(&self, line_id: &str) -> RepositoryResult<Option<ProductionLine>> {
        let conn = self.get_conn()?;
        let line = conn
            .query_row(
                r#"
                SELECT line_id, name, capacity, group_id, status, sort_order
                FROM production_line WHERE line_id = ?1
                "#,
                params![line_id],
                map_line_row,
            )
            .optional()?;
        Ok(line)
    }

    /// 查询全部产线 (按显示顺序)
    pub fn list_lines(&self) -> RepositoryResult<Vec<ProductionLine>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT line_id, name, capacity, group_id, status, sort_order
            FROM production_line
            ORDER BY sort_order ASC, line_id ASC
            "#,
        )?;
        let lines = stmt
            .query_map([], map_line_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(lines)
    }

    /// 更新产线状态
    pub fn set_line_status(&self, line_id: &str, status: LineStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE production_line SET status = ?1 WHERE line_id = ?2",
            params![status.to_db_str(), line_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("ProductionLine", line_id));
        }
        Ok(())
    }

    /// 删除产线
    ///
    /// 仍有计划明细引用时拒绝删除
    pub fn delete_line(&self, line_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let in_use: i64 = conn.query_row(
            "SELECT COUNT(*) FROM planned_production WHERE line_id = ?1",
            params![line_id],
            |row| row.get(0),
        )?;
        if in_use > 0 {
            return Err(RepositoryError::ForeignKeyViolation(format!(
                "产线 {} 仍有 {} 条计划明细",
                line_id, in_use
            )));
        }
        conn.execute("DELETE FROM production_line WHERE line_id = ?1", params![line_id])?;
        Ok(())
    }

    // ==========================================
    // 产线分组
    // ==========================================

    pub fn upsert_group(&self, group: &LineGroup) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO line_group (group_id, name, is_expanded, sort_order)
            VALUES (?1, ?2, ?3, ?4)
            ON CONFLICT(group_id) DO UPDATE SET
                name = excluded.name,
                is_expanded = excluded.is_expanded,
                sort_order = excluded.sort_order
            "#,
            params![group.group_id, group.name, group.is_expanded, group.sort_order],
        )?;
        Ok(())
    }

    pub fn list_groups(&self) -> RepositoryResult<Vec<LineGroup>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            r#"
            SELECT group_id, name, is_expanded, sort_order
            FROM line_group
            ORDER BY sort_order ASC, group_id ASC
            "#,
        )?;
        let groups = stmt
            .query_map([], |row| {
                Ok(LineGroup {
                    group_id: row.get(0)?,
                    name: row.get(1)?,
                    is_expanded: row.get(2)?,
                    sort_order: row.get(3)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(groups)
    }

    /// 切换分组展开状态
    pub fn set_group_expanded(&self, group_id: &str, is_expanded: bool) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "UPDATE line_group SET is_expanded = ?1 WHERE group_id = ?2",
            params![is_expanded, group_id],
        )?;
        Ok(())
    }

    /// 删除分组 (组内产线的 group_id 置空)
    pub fn delete_group(&self, group_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute("DELETE FROM line_group WHERE group_id = ?1", params![group_id])?;
        Ok(())
    }
}

fn map_line_row(row: &Row) -> SqliteResult<ProductionLine> {
    let status: String = row.get(4)?;
    Ok(ProductionLine {
        line_id: row.get(0)?,
        name: row.get(1)?,
        capacity: row.get(2)?,
        group_id: row.get(3)?,
        status: LineStatus::from_str(&status),
        sort_order: row.get(5)?,
    })
}
