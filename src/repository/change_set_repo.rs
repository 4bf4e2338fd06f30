// ==========================================
// 成衣排产系统 - 变更集落库
// ==========================================
// 红线: 一次排产操作的全部写入在同一事务内完成
// 红线: 事务失败则数据库保持操作前状态
// ==========================================

use crate::domain::action_log::ActionLog;
use crate::engine::ChangeSet;
use crate::repository::action_log_repo::insert_log;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::order_repo::{delete_order, write_family, write_order};
use crate::repository::plan_repo::replace_for_order;
use rusqlite::Connection;
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct ChangeSetRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ChangeSetRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 应用变更集并写入操作日志
    ///
    /// 写入顺序: 订单 → 计划明细 → 删除订单 → 家族记录 → 日志
    pub fn apply(&self, change: &ChangeSet, logs: &[ActionLog]) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn
            .transaction()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        for order in &change.upserted_orders {
            write_order(&tx, order)?;
        }
        for (order_id, entries) in &change.plan_replacements {
            replace_for_order(&tx, order_id, entries)?;
        }
        for order_id in &change.deleted_orders {
            delete_order(&tx, order_id)?;
        }
        for family in &change.upserted_families {
            write_family(&tx, family)?;
        }
        for log in logs {
            insert_log(&tx, log)?;
        }

        tx.commit()
            .map_err(|e| RepositoryError::DatabaseTransactionError(e.to_string()))?;

        debug!(
            orders = change.upserted_orders.len(),
            plans = change.plan_replacements.len(),
            deleted = change.deleted_orders.len(),
            logs = logs.len(),
            "变更集已落库"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::action_log::ActionType;
    use crate::domain::order::{Assignment, Order, OrderSchedule, SplitFamily};
    use crate::domain::plan::PlannedProduction;
    use crate::domain::types::OrderStatus;
    use crate::repository::order_repo::OrderRepository;
    use crate::repository::plan_repo::PlannedProductionRepository;
    use crate::repository::ActionLogRepository;
    use chrono::NaiveDate;

    fn setup() -> Arc<Mutex<Connection>> {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::configure_sqlite_connection(&conn).unwrap();
        crate::db::init_schema(&conn).unwrap();
        Arc::new(Mutex::new(conn))
    }

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 1, day).unwrap()
    }

    fn entry(id: &str, order_id: &str, day: u32, qty: u32) -> PlannedProduction {
        PlannedProduction {
            entry_id: id.to_string(),
            order_id: order_id.to_string(),
            line_id: "L1".to_string(),
            plan_date: d(day),
            planned_quantity: qty,
            actual_quantity: None,
            status: OrderStatus::Scheduled,
            order_index: 0,
        }
    }

    #[test]
    fn test_apply_replaces_plan_and_logs() {
        let conn = setup();
        let repo = ChangeSetRepository::new(conn.clone());
        let plans = PlannedProductionRepository::new(conn.clone());
        let logs = ActionLogRepository::new(conn.clone());

        let mut order = Order::new("O1", "PO-1", "ST", 150);
        order.schedule = OrderSchedule::Scheduled(Assignment {
            line_id: "L1".to_string(),
            plan_start: d(1),
            plan_end: d(2),
        });
        let mut change = ChangeSet::default();
        change.upserted_orders.push(order.clone());
        change
            .plan_replacements
            .insert("O1".to_string(), vec![entry("E1", "O1", 1, 100), entry("E2", "O1", 2, 50)]);
        let log = ActionLog::new(ActionType::Place, "tester").with_order("O1");
        repo.apply(&change, &[log]).unwrap();

        assert_eq!(plans.find_by_order("O1").unwrap().len(), 2);
        assert_eq!(plans.sum_cell("L1", d(1)).unwrap(), 100);
        assert_eq!(logs.count_by_order("O1").unwrap(), 1);

        // 退回: 计划清空
        order.schedule = OrderSchedule::Pending;
        let mut change = ChangeSet::default();
        change.upserted_orders.push(order);
        change.plan_replacements.insert("O1".to_string(), vec![]);
        repo.apply(&change, &[]).unwrap();
        assert_eq!(plans.count().unwrap(), 0);
    }

    #[test]
    fn test_failed_apply_leaves_database_untouched() {
        let conn = setup();
        let repo = ChangeSetRepository::new(conn.clone());
        let orders = OrderRepository::new(conn.clone());

        let mut change = ChangeSet::default();
        change.upserted_orders.push(Order::new("O1", "PO-1", "ST", 10));
        // 计划明细归属错误 → 整个事务回滚
        change
            .plan_replacements
            .insert("O1".to_string(), vec![entry("E1", "O2", 1, 10)]);

        assert!(repo.apply(&change, &[]).is_err());
        assert!(orders.find_by_id("O1").unwrap().is_none());
    }

    #[test]
    fn test_delete_and_family() {
        let conn = setup();
        let repo = ChangeSetRepository::new(conn.clone());
        let orders = OrderRepository::new(conn.clone());

        let mut change = ChangeSet::default();
        change.upserted_orders.push(Order::new("O1", "PO-1", "ST", 10));
        change.upserted_orders.push(Order::new("O2", "PO-2", "ST", 10));
        change.upserted_families.push(SplitFamily {
            base_po_number: "PO-1".to_string(),
            original_total: 20,
        });
        repo.apply(&change, &[]).unwrap();

        let mut change = ChangeSet::default();
        change.deleted_orders.push("O2".to_string());
        repo.apply(&change, &[]).unwrap();

        assert!(orders.find_by_id("O2").unwrap().is_none());
        assert_eq!(orders.find_family("PO-1").unwrap().unwrap().original_total, 20);
    }
}
