// ==========================================
// 成衣排产系统 - 采购单数据仓储
// ==========================================
// 依据: purchase 表
// 用途: ERP 采购单转生产订单
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::domain::order::Order;
use crate::domain::purchase::Purchase;
use crate::domain::types::PurchaseStatus;
use crate::repository::action_log_repo::insert_log;
use crate::repository::error::{format_date, parse_opt_date, RepositoryError, RepositoryResult};
use crate::repository::order_repo::write_order;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row};
use std::sync::{Arc, Mutex};

const SELECT_PURCHASE: &str = r#"
    SELECT purchase_id, po_number, supplier, total_quantity, order_date, delivery_date, status
    FROM purchase
"#;

pub struct PurchaseRepository {
    conn: Arc<Mutex<Connection>>,
}

impl PurchaseRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn upsert(&self, purchase: &Purchase) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO purchase (
                purchase_id, po_number, supplier, total_quantity,
                order_date, delivery_date, status
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ON CONFLICT(purchase_id) DO UPDATE SET
                po_number = excluded.po_number,
                supplier = excluded.supplier,
                total_quantity = excluded.total_quantity,
                order_date = excluded.order_date,
                delivery_date = excluded.delivery_date,
                status = excluded.status
            "#,
            params![
                purchase.purchase_id,
                purchase.po_number,
                purchase.supplier,
                purchase.total_quantity,
                purchase.order_date.map(format_date),
                purchase.delivery_date.map(format_date),
                purchase.status.to_db_str(),
            ],
        )?;
        Ok(())
    }

    pub fn find_by_id(&self, purchase_id: &str) -> RepositoryResult<Option<Purchase>> {
        let conn = self.get_conn()?;
        let sql = format!("{} WHERE purchase_id = ?1", SELECT_PURCHASE);
        let purchase = conn
            .query_row(&sql, params![purchase_id], map_purchase_row)
            .optional()?;
        Ok(purchase)
    }

    pub fn list_by_status(&self, status: PurchaseStatus) -> RepositoryResult<Vec<Purchase>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "{} WHERE status = ?1 ORDER BY delivery_date ASC, po_number ASC",
            SELECT_PURCHASE
        );
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
            .query_map(params![status.to_db_str()], map_purchase_row)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn set_status(&self, purchase_id: &str, status: PurchaseStatus) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let rows = conn.execute(
            "UPDATE purchase SET status = ?1 WHERE purchase_id = ?2",
            params![status.to_db_str(), purchase_id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("Purchase", purchase_id));
        }
        Ok(())
    }

    /// 采购单转订单: 写入订单、标记采购单为 PLANNED、记录日志, 同一事务
    pub fn admit(&self, purchase_id: &str, order: &Order, log: &ActionLog) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;

        let rows = tx.execute(
            "UPDATE purchase SET status = ?1 WHERE purchase_id = ?2 AND status = ?3",
            params![
                PurchaseStatus::Planned.to_db_str(),
                purchase_id,
                PurchaseStatus::Pending.to_db_str()
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("PendingPurchase", purchase_id));
        }
        write_order(&tx, order)?;
        insert_log(&tx, log)?;

        tx.commit()?;
        Ok(())
    }
}

fn map_purchase_row(row: &Row) -> SqliteResult<Purchase> {
    let status: String = row.get(6)?;
    Ok(Purchase {
        purchase_id: row.get(0)?,
        po_number: row.get(1)?,
        supplier: row.get(2)?,
        total_quantity: row.get(3)?,
        order_date: parse_opt_date(4, row.get(4)?)?,
        delivery_date: parse_opt_date(5, row.get(5)?)?,
        status: PurchaseStatus::from_str(&status),
    })
}
