// ==========================================
// 成衣排产系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 幂等建表 (CREATE TABLE IF NOT EXISTS)
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 日期存储格式
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// 时间戳存储格式
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

/// 初始化数据库 schema（幂等）
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;

    match read_schema_version(conn)? {
        Some(v) if v > CURRENT_SCHEMA_VERSION => {
            tracing::warn!(
                db_version = v,
                code_version = CURRENT_SCHEMA_VERSION,
                "数据库 schema 版本高于当前代码版本"
            );
        }
        _ => {}
    }
    Ok(())
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL,
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS line_group (
    group_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    is_expanded INTEGER NOT NULL DEFAULT 1,
    sort_order INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS production_line (
    line_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    capacity INTEGER NOT NULL CHECK (capacity > 0),
    group_id TEXT REFERENCES line_group(group_id) ON DELETE SET NULL,
    status TEXT NOT NULL DEFAULT 'ACTIVE',
    sort_order INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS holiday (
    holiday_id TEXT PRIMARY KEY,
    holiday_date TEXT NOT NULL,
    name TEXT NOT NULL,
    is_global INTEGER NOT NULL DEFAULT 1,
    UNIQUE (holiday_date, name)
);

CREATE TABLE IF NOT EXISTS holiday_line (
    holiday_id TEXT NOT NULL REFERENCES holiday(holiday_id) ON DELETE CASCADE,
    line_id TEXT NOT NULL REFERENCES production_line(line_id) ON DELETE CASCADE,
    PRIMARY KEY (holiday_id, line_id)
);

CREATE TABLE IF NOT EXISTS ramp_up_plan (
    plan_id TEXT PRIMARY KEY,
    name TEXT NOT NULL,
    final_efficiency INTEGER NOT NULL DEFAULT 100
);

CREATE TABLE IF NOT EXISTS ramp_up_point (
    plan_id TEXT NOT NULL REFERENCES ramp_up_plan(plan_id) ON DELETE CASCADE,
    day_offset INTEGER NOT NULL,
    efficiency_pct INTEGER NOT NULL,
    PRIMARY KEY (plan_id, day_offset)
);

CREATE TABLE IF NOT EXISTS production_order (
    order_id TEXT PRIMARY KEY,
    po_number TEXT NOT NULL,
    style TEXT NOT NULL,
    order_quantity INTEGER NOT NULL,
    cut_quantity INTEGER NOT NULL DEFAULT 0,
    issue_quantity INTEGER NOT NULL DEFAULT 0,
    status TEXT NOT NULL DEFAULT 'PENDING',
    line_id TEXT,
    plan_start TEXT,
    plan_end TEXT,
    base_po_number TEXT,
    split_number INTEGER,
    updated_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE INDEX IF NOT EXISTS idx_order_status ON production_order(status);
CREATE INDEX IF NOT EXISTS idx_order_base_po ON production_order(base_po_number);

CREATE TABLE IF NOT EXISTS order_actual_production (
    order_id TEXT NOT NULL REFERENCES production_order(order_id) ON DELETE CASCADE,
    prod_date TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    PRIMARY KEY (order_id, prod_date)
);

CREATE TABLE IF NOT EXISTS planned_production (
    entry_id TEXT PRIMARY KEY,
    order_id TEXT NOT NULL REFERENCES production_order(order_id) ON DELETE CASCADE,
    line_id TEXT NOT NULL,
    plan_date TEXT NOT NULL,
    planned_quantity INTEGER NOT NULL,
    actual_quantity INTEGER,
    status TEXT NOT NULL,
    order_index INTEGER NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_planned_cell ON planned_production(line_id, plan_date);
CREATE INDEX IF NOT EXISTS idx_planned_order ON planned_production(order_id);

CREATE TABLE IF NOT EXISTS split_family (
    base_po_number TEXT PRIMARY KEY,
    original_total INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS purchase (
    purchase_id TEXT PRIMARY KEY,
    po_number TEXT NOT NULL,
    supplier TEXT NOT NULL,
    total_quantity INTEGER NOT NULL,
    order_date TEXT,
    delivery_date TEXT,
    status TEXT NOT NULL DEFAULT 'PENDING'
);

CREATE TABLE IF NOT EXISTS action_log (
    action_id TEXT PRIMARY KEY,
    action_type TEXT NOT NULL,
    action_ts TEXT NOT NULL,
    actor TEXT NOT NULL,
    order_id TEXT,
    line_id TEXT,
    date_range_start TEXT,
    date_range_end TEXT,
    payload_json TEXT,
    detail TEXT
);

CREATE INDEX IF NOT EXISTS idx_action_log_order ON action_log(order_id, action_ts);
"#;
