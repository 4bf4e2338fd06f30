// ==========================================
// 成衣排产系统 - 订单数据仓储
// ==========================================
// 依据: production_order / order_actual_production / split_family 表
// 红线: Repository 不含业务逻辑
// 红线: 状态列与落位列不一致时报错, 不做静默修正
// ==========================================

use crate::domain::order::{Assignment, Order, OrderSchedule, SplitFamily, SplitInfo};
use crate::domain::types::OrderStatus;
use crate::repository::error::{
    format_date, parse_date, parse_opt_date, RepositoryError, RepositoryResult,
};
use chrono::NaiveDate;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

const SELECT_ORDER: &str = r#"
    SELECT order_id, po_number, style, order_quantity, cut_quantity, issue_quantity,
           status, line_id, plan_start, plan_end, base_po_number, split_number
    FROM production_order
"#;

// ==========================================
// OrderRow - 订单原始行
// ==========================================
struct OrderRow {
    order_id: String,
    po_number: String,
    style: String,
    order_quantity: u32,
    cut_quantity: u32,
    issue_quantity: u32,
    status: String,
    line_id: Option<String>,
    plan_start: Option<NaiveDate>,
    plan_end: Option<NaiveDate>,
    base_po_number: Option<String>,
    split_number: Option<u32>,
}

impl OrderRow {
    fn from_row(row: &Row) -> SqliteResult<Self> {
        Ok(Self {
            order_id: row.get(0)?,
            po_number: row.get(1)?,
            style: row.get(2)?,
            order_quantity: row.get(3)?,
            cut_quantity: row.get(4)?,
            issue_quantity: row.get(5)?,
            status: row.get(6)?,
            line_id: row.get(7)?,
            plan_start: parse_opt_date(8, row.get(8)?)?,
            plan_end: parse_opt_date(9, row.get(9)?)?,
            base_po_number: row.get(10)?,
            split_number: row.get(11)?,
        })
    }

    /// 组装领域对象
    fn into_order(self, actual_production: BTreeMap<NaiveDate, u32>) -> RepositoryResult<Order> {
        let status = OrderStatus::from_str(&self.status).ok_or_else(|| {
            RepositoryError::field(
                "status",
                format!("订单 {} 状态值无法识别: {}", self.order_id, self.status),
            )
        })?;

        let schedule = match (status, self.line_id, self.plan_start, self.plan_end) {
            (OrderStatus::Pending, None, None, None) => OrderSchedule::Pending,
            (OrderStatus::Pending, ..) => {
                return Err(RepositoryError::field(
                    "line_id",
                    format!("待排订单 {} 不应携带产线或计划日期", self.order_id),
                ))
            }
            (status, Some(line_id), Some(plan_start), Some(plan_end)) => {
                OrderSchedule::with_status(
                    Assignment {
                        line_id,
                        plan_start,
                        plan_end,
                    },
                    status,
                )
            }
            (status, ..) => {
                return Err(RepositoryError::field(
                    "plan_start",
                    format!("订单 {} 状态为 {} 但缺少产线或计划日期", self.order_id, status),
                ))
            }
        };

        let split = match (self.base_po_number, self.split_number) {
            (Some(base_po_number), Some(split_number)) => Some(SplitInfo {
                base_po_number,
                split_number,
            }),
            (None, None) => None,
            _ => {
                return Err(RepositoryError::field(
                    "split_number",
                    format!("订单 {} 拆单信息不完整", self.order_id),
                ))
            }
        };

        Ok(Order {
            order_id: self.order_id,
            po_number: self.po_number,
            style: self.style,
            order_quantity: self.order_quantity,
            cut_quantity: self.cut_quantity,
            issue_quantity: self.issue_quantity,
            schedule,
            actual_production,
            split,
        })
    }
}

// ==========================================
// OrderRepository - 订单仓储
// ==========================================
pub struct OrderRepository {
    conn: Arc<Mutex<Connection>>,
}

impl OrderRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入操作
    // ==========================================

    /// 插入或更新单个订单 (含实际产量)
    pub fn upsert(&self, order: &Order) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        write_order(&tx, order)?;
        tx.commit()?;
        Ok(())
    }

    /// 批量写入订单
    pub fn batch_upsert(&self, orders: &[Order]) -> RepositoryResult<usize> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        for order in orders {
            write_order(&tx, order)?;
        }
        tx.commit()?;
        Ok(orders.len())
    }

    // ==========================================
    // 查询操作
    // ==========================================

    pub fn find_by_id(&self, order_id: &str) -> RepositoryResult<Option<Order>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE order_id = ?1", SELECT_ORDER);
        let row = conn
            .query_row(&sql, params![order_id], OrderRow::from_row)
            .optional()?;

        match row {
            Some(row) => {
                let actuals = load_actuals_for(&conn, &row.order_id)?;
                Ok(Some(row.into_order(actuals)?))
            }
            None => Ok(None),
        }
    }

    /// 查询全部订单
    pub fn list_all(&self) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!("{} ORDER BY po_number ASC, order_id ASC", SELECT_ORDER);
        self.query_orders(&conn, &sql, [])
    }

    /// 按状态查询订单
    pub fn list_by_status(&self, status: OrderStatus) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE status = ?1 ORDER BY po_number ASC, order_id ASC",
            SELECT_ORDER
        );
        self.query_orders(&conn, &sql, params![status.to_db_str()])
    }

    /// 查询拆单家族成员 (原单 + 子单)
    pub fn list_family_members(&self, base_po_number: &str) -> RepositoryResult<Vec<Order>> {
        let conn = self.get_conn()?;
        let sql = format!(
            r#"{}
            WHERE base_po_number = ?1 OR (po_number = ?1 AND base_po_number IS NULL)
            ORDER BY COALESCE(split_number, 0) ASC, order_id ASC"#,
            SELECT_ORDER
        );
        self.query_orders(&conn, &sql, params![base_po_number])
    }

    fn query_orders<P: rusqlite::Params>(
        &self,
        conn: &Connection,
        sql: &str,
        params: P,
    ) -> RepositoryResult<Vec<Order>> {
        let mut stmt = conn.prepare(sql)?;
        let rows = stmt
            .query_map(params, OrderRow::from_row)?
            .collect::<SqliteResult<Vec<_>>>()?;

        let mut actuals = load_all_actuals(conn)?;
        rows.into_iter()
            .map(|row| {
                let map = actuals.remove(&row.order_id).unwrap_or_default();
                row.into_order(map)
            })
            .collect()
    }

    // ==========================================
    // 拆单家族
    // ==========================================

    pub fn find_family(&self, base_po_number: &str) -> RepositoryResult<Option<SplitFamily>> {
        let conn = self.get_conn()?;
        let family = conn
            .query_row(
                "SELECT base_po_number, original_total FROM split_family WHERE base_po_number = ?1",
                params![base_po_number],
                map_family_row,
            )
            .optional()?;
        Ok(family)
    }

    pub fn list_families(&self) -> RepositoryResult<Vec<SplitFamily>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT base_po_number, original_total FROM split_family ORDER BY base_po_number",
        )?;
        let families = stmt
            .query_map([], map_family_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(families)
    }
}

fn map_family_row(row: &Row) -> SqliteResult<SplitFamily> {
    let total: i64 = row.get(1)?;
    Ok(SplitFamily {
        base_po_number: row.get(0)?,
        original_total: u64::try_from(total).unwrap_or(0),
    })
}

fn load_actuals_for(conn: &Connection, order_id: &str) -> RepositoryResult<BTreeMap<NaiveDate, u32>> {
    let mut stmt = conn.prepare(
        "SELECT prod_date, quantity FROM order_actual_production WHERE order_id = ?1",
    )?;
    let rows = stmt
        .query_map(params![order_id], |row| {
            let date_str: String = row.get(0)?;
            Ok((parse_date(0, &date_str)?, row.get::<_, u32>(1)?))
        })?
        .collect::<SqliteResult<BTreeMap<_, _>>>()?;
    Ok(rows)
}

fn load_all_actuals(conn: &Connection) -> RepositoryResult<HashMap<String, BTreeMap<NaiveDate, u32>>> {
    let mut stmt = conn.prepare("SELECT order_id, prod_date, quantity FROM order_actual_production")?;
    let rows = stmt
        .query_map([], |row| {
            let date_str: String = row.get(1)?;
            Ok((row.get::<_, String>(0)?, parse_date(1, &date_str)?, row.get::<_, u32>(2)?))
        })?
        .collect::<SqliteResult<Vec<_>>>()?;

    let mut map: HashMap<String, BTreeMap<NaiveDate, u32>> = HashMap::new();
    for (order_id, date, qty) in rows {
        map.entry(order_id).or_default().insert(date, qty);
    }
    Ok(map)
}

// ==========================================
// 事务内写入辅助 (供变更集落库复用)
// ==========================================

/// 写入订单主记录, 并整体替换其实际产量
pub(crate) fn write_order(conn: &Connection, order: &Order) -> RepositoryResult<()> {
    let assignment = order.assignment();
    conn.execute(
        r#"
        INSERT INTO production_order (
            order_id, po_number, style, order_quantity, cut_quantity, issue_quantity,
            status, line_id, plan_start, plan_end, base_po_number, split_number, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, datetime('now'))
        ON CONFLICT(order_id) DO UPDATE SET
            po_number = excluded.po_number,
            style = excluded.style,
            order_quantity = excluded.order_quantity,
            cut_quantity = excluded.cut_quantity,
            issue_quantity = excluded.issue_quantity,
            status = excluded.status,
            line_id = excluded.line_id,
            plan_start = excluded.plan_start,
            plan_end = excluded.plan_end,
            base_po_number = excluded.base_po_number,
            split_number = excluded.split_number,
            updated_at = excluded.updated_at
        "#,
        params![
            order.order_id,
            order.po_number,
            order.style,
            order.order_quantity,
            order.cut_quantity,
            order.issue_quantity,
            order.status().to_db_str(),
            assignment.map(|a| a.line_id.as_str()),
            assignment.map(|a| format_date(a.plan_start)),
            assignment.map(|a| format_date(a.plan_end)),
            order.split.as_ref().map(|s| s.base_po_number.as_str()),
            order.split.as_ref().map(|s| s.split_number),
        ],
    )?;

    conn.execute(
        "DELETE FROM order_actual_production WHERE order_id = ?1",
        params![order.order_id],
    )?;
    for (date, qty) in &order.actual_production {
        conn.execute(
            "INSERT INTO order_actual_production (order_id, prod_date, quantity) VALUES (?1, ?2, ?3)",
            params![order.order_id, format_date(*date), qty],
        )?;
    }
    Ok(())
}

pub(crate) fn delete_order(conn: &Connection, order_id: &str) -> RepositoryResult<()> {
    conn.execute("DELETE FROM production_order WHERE order_id = ?1", params![order_id])?;
    Ok(())
}

pub(crate) fn write_family(conn: &Connection, family: &SplitFamily) -> RepositoryResult<()> {
    let total = i64::try_from(family.original_total)
        .map_err(|_| RepositoryError::field("original_total", "家族原始总量溢出"))?;
    conn.execute(
        r#"
        INSERT INTO split_family (base_po_number, original_total) VALUES (?1, ?2)
        ON CONFLICT(base_po_number) DO UPDATE SET original_total = excluded.original_total
        "#,
        params![family.base_po_number, total],
    )?;
    Ok(())
}
