// ==========================================
// 成衣排产系统 - 爬坡计划数据仓储
// ==========================================
// 依据: ramp_up_plan / ramp_up_point 表
// ==========================================

use crate::domain::ramp_up::{RampUpPlan, RampUpPoint};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

pub struct RampUpRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RampUpRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 保存爬坡计划 (整体替换曲线点)
    pub fn save_plan(&self, plan: &RampUpPlan) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO ramp_up_plan (plan_id, name, final_efficiency)
            VALUES (?1, ?2, ?3)
            ON CONFLICT(plan_id) DO UPDATE SET
                name = excluded.name,
                final_efficiency = excluded.final_efficiency
            "#,
            params![plan.plan_id, plan.name, plan.final_efficiency],
        )?;
        tx.execute("DELETE FROM ramp_up_point WHERE plan_id = ?1", params![plan.plan_id])?;
        for point in &plan.points {
            tx.execute(
                "INSERT INTO ramp_up_point (plan_id, day_offset, efficiency_pct) VALUES (?1, ?2, ?3)",
                params![plan.plan_id, point.day_offset, point.efficiency_pct],
            )?;
        }

        tx.commit()?;
        Ok(())
    }

    pub fn find_plan(&self, plan_id: &str) -> RepositoryResult<Option<RampUpPlan>> {
        let conn = self.get_conn()?;
        let header: Option<(String, u32)> = conn
            .query_row(
                "SELECT name, final_efficiency FROM ramp_up_plan WHERE plan_id = ?1",
                params![plan_id],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        let Some((name, final_efficiency)) = header else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            r#"
            SELECT day_offset, efficiency_pct FROM ramp_up_point
            WHERE plan_id = ?1 ORDER BY day_offset ASC
            "#,
        )?;
        let points = stmt
            .query_map(params![plan_id], |row| {
                Ok(RampUpPoint {
                    day_offset: row.get(0)?,
                    efficiency_pct: row.get(1)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;

        Ok(Some(RampUpPlan::new(plan_id, name, points, final_efficiency)))
    }

    pub fn list_plan_ids(&self) -> RepositoryResult<Vec<String>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT plan_id FROM ramp_up_plan ORDER BY plan_id")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .collect::<SqliteResult<Vec<String>>>()?;
        Ok(ids)
    }

    pub fn delete_plan(&self, plan_id: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute("DELETE FROM ramp_up_plan WHERE plan_id = ?1", params![plan_id])?;
        Ok(())
    }
}
