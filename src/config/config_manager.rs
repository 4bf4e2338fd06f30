// ==========================================
// 成衣排产系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 约束: 配置值非法时回退默认值并告警, 不中断排产
// ==========================================

use crate::domain::types::PlacementMode;
use crate::engine::DEFAULT_HORIZON_DAYS;
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigScope - 配置作用域
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigScope {
    Global,                   // 全局
    Line { line_id: String }, // 产线
}

impl ConfigScope {
    pub fn scope_id(&self) -> String {
        match self {
            ConfigScope::Global => "global".to_string(),
            ConfigScope::Line { line_id } => format!("line/{}", line_id),
        }
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 排产窗口 (自然日)
    pub const SCHEDULING_HORIZON_DAYS: &str = "scheduling_horizon_days";

    // 默认爬坡计划
    pub const DEFAULT_RAMP_UP_PLAN_ID: &str = "default_ramp_up_plan_id";

    // 落位模式 STRICT / OVERRIDE
    pub const PLACEMENT_MODE: &str = "placement_mode";
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&guard)?;
        }
        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 读取指定作用域的配置值
    pub fn get_value(&self, scope: &ConfigScope, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;
        let value = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = ?1 AND key = ?2",
                params![scope.scope_id(), key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    /// 读取 global scope 的配置值
    pub fn get_global_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        self.get_value(&ConfigScope::Global, key)
    }

    /// 写入配置值 (UPSERT)
    pub fn set_value(&self, scope: &ConfigScope, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO config_kv (scope_id, key, value, updated_at)
            VALUES (?1, ?2, ?3, datetime('now'))
            ON CONFLICT(scope_id, key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![scope.scope_id(), key, value],
        )?;
        Ok(())
    }

    /// 删除配置值 (回退到上级作用域或默认值)
    pub fn remove_value(&self, scope: &ConfigScope, key: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "DELETE FROM config_kv WHERE scope_id = ?1 AND key = ?2",
            params![scope.scope_id(), key],
        )?;
        Ok(())
    }

    /// 获取 global 配置快照 (JSON, 按 key 排序)
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;
        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?)))?;
        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        serde_json::to_string(&json!(config_map))
            .map_err(|e| RepositoryError::InternalError(e.to_string()))
    }

    // ===== 排产配置 =====

    /// 排产窗口天数 (默认 90)
    pub fn scheduling_horizon_days(&self) -> RepositoryResult<u32> {
        let raw = match self.get_global_value(config_keys::SCHEDULING_HORIZON_DAYS)? {
            Some(v) => v,
            None => return Ok(DEFAULT_HORIZON_DAYS),
        };

        match raw.trim().parse::<u32>() {
            Ok(days) if days > 0 => Ok(days),
            _ => {
                tracing::warn!(
                    key = config_keys::SCHEDULING_HORIZON_DAYS,
                    value = %raw,
                    default = DEFAULT_HORIZON_DAYS,
                    "配置值非法，使用默认值"
                );
                Ok(DEFAULT_HORIZON_DAYS)
            }
        }
    }

    /// 默认爬坡计划ID (未配置或为空返回 None)
    pub fn default_ramp_up_plan_id(&self) -> RepositoryResult<Option<String>> {
        Ok(self
            .get_global_value(config_keys::DEFAULT_RAMP_UP_PLAN_ID)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    /// 落位模式: 产线级覆写优先, 其次 global, 默认 STRICT
    pub fn placement_mode(&self, line_id: Option<&str>) -> RepositoryResult<PlacementMode> {
        let line_value = match line_id {
            Some(id) => self.get_value(
                &ConfigScope::Line {
                    line_id: id.to_string(),
                },
                config_keys::PLACEMENT_MODE,
            )?,
            None => None,
        };
        let raw = match line_value {
            Some(v) => v,
            None => match self.get_global_value(config_keys::PLACEMENT_MODE)? {
                Some(v) => v,
                None => return Ok(PlacementMode::default()),
            },
        };

        let normalized = raw.trim().to_uppercase();
        if normalized != "STRICT" && normalized != "OVERRIDE" {
            tracing::warn!(
                key = config_keys::PLACEMENT_MODE,
                value = %raw,
                "配置值非法，使用 STRICT"
            );
        }
        Ok(PlacementMode::from_str(&normalized))
    }
}
