// ==========================================
// 成衣排产系统 - 拆单台账
// ==========================================
// 职责: 拆单 / 合单 / 数量修改, 维护家族数量守恒
// 红线: 家族子单数量合计 == 家族原始总量, 每条写路径返回前都要重新校验
// 红线: 已记录的实际产量始终留在原订单
// ==========================================

use crate::domain::order::{Order, OrderSchedule, SplitFamily, SplitInfo};
use crate::domain::types::OrderStatus;
use crate::engine::board::{ChangeSet, ScheduleBoard};
use crate::engine::error::{ScheduleError, ScheduleResult};
use serde::{Deserialize, Serialize};
use tracing::{error, info, instrument, warn};

// ==========================================
// SplitOutcome - 拆单结果
// ==========================================
#[derive(Debug, Clone)]
pub struct SplitOutcome {
    pub fragment_id: String,
    pub change: ChangeSet,
}

// ==========================================
// FamilyView - 家族视图 (报表用)
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyMember {
    pub order_id: String,
    pub po_number: String,
    pub split_number: Option<u32>,
    pub order_quantity: u32,
    pub status: OrderStatus,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyView {
    pub base_po_number: String,
    pub original_total: u64,
    pub current_total: u64,
    pub members: Vec<FamilyMember>,
}

impl FamilyView {
    pub fn is_balanced(&self) -> bool {
        self.original_total == self.current_total
    }
}

// ==========================================
// SplitBookkeeper - 拆单台账
// ==========================================
pub struct SplitBookkeeper {
    // 无状态
}

impl Default for SplitBookkeeper {
    fn default() -> Self {
        Self::new()
    }
}

impl SplitBookkeeper {
    pub fn new() -> Self {
        Self {}
    }

    /// 拆单
    ///
    /// 规则:
    /// 1) 0 < split_quantity < order_quantity 且不超过未生产数量
    /// 2) 子单继承 base_po_number (原单取自身 PO 号), split_number = 兄弟最大值 + 1
    /// 3) 原单数量减少 split_quantity, 原单已有计划全部作废 (需重新落位)
    #[instrument(skip(self, board))]
    pub fn split(
        &self,
        board: &mut ScheduleBoard,
        order_id: &str,
        split_quantity: u32,
    ) -> ScheduleResult<SplitOutcome> {
        let original = board.order(order_id)?;
        let remaining = original.remaining_quantity();
        if split_quantity == 0
            || split_quantity >= original.order_quantity
            || split_quantity > remaining
        {
            return Err(ScheduleError::InvalidSplitQuantity {
                order_id: order_id.to_string(),
                split_quantity,
                order_quantity: original.order_quantity,
                remaining,
            });
        }

        let base = original.family_key().to_string();
        let expected = self.expected_total(board, &base);
        let split_number = board
            .family_members(&base)
            .iter()
            .filter_map(|o| o.split_number())
            .max()
            .unwrap_or(0)
            + 1;

        let mut fragment = Order::new(
            uuid::Uuid::new_v4().to_string(),
            format!("{}-{}", base, split_number),
            original.style.clone(),
            split_quantity,
        );
        fragment.split = Some(SplitInfo {
            base_po_number: base.clone(),
            split_number,
        });

        let mut updated = original.clone();
        updated.order_quantity -= split_quantity;
        let had_plan = updated.assignment().is_some();
        if had_plan {
            updated.schedule = OrderSchedule::Pending;
        }

        // 先校验, 后提交
        self.check_staged(board, &base, expected, &[&updated, &fragment], &[])?;

        let mut change = ChangeSet::default();
        let fragment_id = fragment.order_id.clone();
        board.commit_order(updated, had_plan.then(Vec::new), &mut change);
        board.commit_order(fragment, None, &mut change);
        board.commit_family(
            SplitFamily {
                base_po_number: base.clone(),
                original_total: expected,
            },
            &mut change,
        );

        info!(
            order_id,
            fragment_id = %fragment_id,
            base_po = %base,
            split_number,
            split_quantity,
            plan_dropped = had_plan,
            "拆单完成"
        );
        Ok(SplitOutcome { fragment_id, change })
    }

    /// 合单: 子单数量并回同家族的另一订单, 子单删除
    #[instrument(skip(self, board))]
    pub fn merge(
        &self,
        board: &mut ScheduleBoard,
        fragment_id: &str,
        into_id: &str,
    ) -> ScheduleResult<ChangeSet> {
        let reject = |reason: &str| ScheduleError::MergeRejected {
            fragment_id: fragment_id.to_string(),
            into_id: into_id.to_string(),
            reason: reason.to_string(),
        };

        if fragment_id == into_id {
            return Err(reject("不能与自身合并"));
        }
        let fragment = board.order(fragment_id)?;
        let into = board.order(into_id)?;

        if !fragment.is_fragment() {
            return Err(reject("只有拆分出的子单可以被合并"));
        }
        if fragment.family_key() != into.family_key() {
            return Err(reject("不属于同一拆单家族"));
        }
        if fragment.status() != OrderStatus::Pending || !fragment.actual_production.is_empty() {
            return Err(reject("子单已排产或已有实际产量"));
        }
        if into.status() == OrderStatus::Completed {
            return Err(reject("目标订单已完成"));
        }

        let base = into.family_key().to_string();
        let expected = self.expected_total(board, &base);

        let merged_quantity = into
            .order_quantity
            .checked_add(fragment.order_quantity)
            .ok_or_else(|| reject("合并后数量超出上限"))?;

        let mut updated = into.clone();
        updated.order_quantity = merged_quantity;
        let had_plan = updated.assignment().is_some();
        if had_plan {
            updated.schedule = OrderSchedule::Pending;
        }

        self.check_staged(board, &base, expected, &[&updated], &[fragment_id])?;

        let mut change = ChangeSet::default();
        board.remove_order(fragment_id, &mut change);
        board.commit_order(updated, had_plan.then(Vec::new), &mut change);

        info!(fragment_id, into_id, base_po = %base, "合单完成");
        Ok(change)
    }

    /// 修改订单数量
    ///
    /// 家族成员的修改视为显式调整家族总量 (总量同步增减)
    #[instrument(skip(self, board))]
    pub fn update_quantity(
        &self,
        board: &mut ScheduleBoard,
        order_id: &str,
        new_quantity: u32,
    ) -> ScheduleResult<ChangeSet> {
        let order = board.order(order_id)?;
        let invalid = |reason: &str| ScheduleError::InvalidQuantity {
            order_id: order_id.to_string(),
            quantity: new_quantity,
            reason: reason.to_string(),
        };

        if order.status() == OrderStatus::Completed {
            return Err(invalid("已完成订单不可修改数量"));
        }
        if new_quantity == 0 {
            return Err(invalid("数量必须大于0"));
        }
        if u64::from(new_quantity) < order.produced_total() {
            return Err(invalid("数量不能小于已记录的实际产量"));
        }
        if new_quantity == order.order_quantity {
            return Ok(ChangeSet::default());
        }

        let base = order.family_key().to_string();
        let family_total: u64 = board
            .family_members(&base)
            .iter()
            .filter(|o| o.order_id != order_id)
            .map(|o| u64::from(o.order_quantity))
            .sum::<u64>()
            + u64::from(new_quantity);
        if family_total > u64::from(u32::MAX) {
            return Err(invalid("家族总量超出上限"));
        }

        let family = board.family_record(&base).cloned().map(|mut family| {
            let delta = i64::from(new_quantity) - i64::from(order.order_quantity);
            family.original_total = (family.original_total as i64 + delta).max(0) as u64;
            family
        });

        let mut updated = order.clone();
        updated.order_quantity = new_quantity;
        let had_plan = updated.assignment().is_some();
        if had_plan {
            updated.schedule = OrderSchedule::Pending;
        }

        if let Some(family) = &family {
            self.check_staged(board, &base, family.original_total, &[&updated], &[])?;
        }

        let mut change = ChangeSet::default();
        board.commit_order(updated, had_plan.then(Vec::new), &mut change);
        if let Some(family) = family {
            board.commit_family(family, &mut change);
        }

        info!(order_id, new_quantity, plan_dropped = had_plan, "订单数量已修改");
        Ok(change)
    }

    /// 新订单入池前的校验 (采购单转单等非拆单路径)
    ///
    /// PO 号不得与已有订单的 PO 号或拆单家族键重复, 否则新订单会被并入已有家族
    pub fn check_new_order(&self, board: &ScheduleBoard, order: &Order) -> ScheduleResult<()> {
        let po = order.po_number.as_str();
        // 优先报告 PO 号完全相同的订单
        let clash = board
            .orders()
            .filter(|o| o.order_id != order.order_id)
            .filter(|o| o.po_number == po || o.family_key() == po)
            .min_by(|a, b| {
                (a.po_number != po, &a.order_id).cmp(&(b.po_number != po, &b.order_id))
            });

        if let Some(existing) = clash {
            warn!(po_number = po, existing_order_id = %existing.order_id, "PO号冲突, 拒绝新订单");
            return Err(ScheduleError::DuplicatePoNumber {
                po_number: po.to_string(),
                existing_order_id: existing.order_id.clone(),
            });
        }

        // 已有家族记录时, 暂存后复核家族合计
        match board.family_record(order.family_key()) {
            Some(family) => self.check_staged(
                board,
                order.family_key(),
                family.original_total,
                &[order],
                &[],
            ),
            None => Ok(()),
        }
    }

    /// 家族视图
    pub fn family(&self, board: &ScheduleBoard, base_po_number: &str) -> FamilyView {
        let members: Vec<FamilyMember> = board
            .family_members(base_po_number)
            .into_iter()
            .map(|o| FamilyMember {
                order_id: o.order_id.clone(),
                po_number: o.po_number.clone(),
                split_number: o.split_number(),
                order_quantity: o.order_quantity,
                status: o.status(),
            })
            .collect();
        let current_total = members.iter().map(|m| u64::from(m.order_quantity)).sum();

        FamilyView {
            base_po_number: base_po_number.to_string(),
            original_total: self.expected_total(board, base_po_number),
            current_total,
            members,
        }
    }

    /// 校验家族数量守恒; 未拆过单的家族直接通过
    pub fn verify_family(&self, board: &ScheduleBoard, base_po_number: &str) -> ScheduleResult<()> {
        let Some(family) = board.family_record(base_po_number) else {
            return Ok(());
        };
        self.check_staged(board, base_po_number, family.original_total, &[], &[])
    }

    /// 校验全部家族, 返回所有违规
    pub fn verify_all(&self, board: &ScheduleBoard) -> Vec<ScheduleError> {
        let mut bases: Vec<String> = board.families().map(|f| f.base_po_number.clone()).collect();
        bases.sort();
        bases
            .iter()
            .filter_map(|base| self.verify_family(board, base).err())
            .collect()
    }

    // ==========================================
    // 内部方法
    // ==========================================

    /// 家族原始总量: 有记录取记录, 否则取当前成员合计
    fn expected_total(&self, board: &ScheduleBoard, base: &str) -> u64 {
        match board.family_record(base) {
            Some(family) => family.original_total,
            None => board
                .family_members(base)
                .iter()
                .map(|o| u64::from(o.order_quantity))
                .sum(),
        }
    }

    /// 在暂存状态上校验家族合计
    ///
    /// staged: 替换或新增的订单; removed: 删除的订单
    fn check_staged(
        &self,
        board: &ScheduleBoard,
        base: &str,
        expected: u64,
        staged: &[&Order],
        removed: &[&str],
    ) -> ScheduleResult<()> {
        let mut members: Vec<&Order> = board
            .family_members(base)
            .into_iter()
            .filter(|o| !removed.contains(&o.order_id.as_str()))
            .filter(|o| !staged.iter().any(|s| s.order_id == o.order_id))
            .collect();
        members.extend(staged.iter().copied().filter(|o| o.family_key() == base));

        let actual: u64 = members.iter().map(|o| u64::from(o.order_quantity)).sum();
        if actual != expected {
            let dump = serde_json::to_string(&members).unwrap_or_default();
            error!(
                base_po = base,
                expected,
                actual,
                members = %dump,
                "拆单家族数量不守恒"
            );
            return Err(ScheduleError::InvariantViolation {
                base_po_number: base.to_string(),
                expected,
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::calendar::HolidayCalendar;

    fn board_with(order: Order) -> ScheduleBoard {
        let mut board = ScheduleBoard::new(HolidayCalendar::new());
        board.insert_order(order);
        board
    }

    #[test]
    fn test_split_numbers_increment() {
        let mut board = board_with(Order::new("O1", "PO-1", "ST", 300));
        let bookkeeper = SplitBookkeeper::new();

        let first = bookkeeper.split(&mut board, "O1", 100).unwrap();
        let second = bookkeeper.split(&mut board, "O1", 50).unwrap();

        let a = board.order(&first.fragment_id).unwrap();
        let b = board.order(&second.fragment_id).unwrap();
        assert_eq!(a.split_number(), Some(1));
        assert_eq!(b.split_number(), Some(2));
        assert_eq!(b.po_number, "PO-1-2");
        assert_eq!(board.order("O1").unwrap().order_quantity, 150);
        assert!(bookkeeper.verify_family(&board, "PO-1").is_ok());
    }

    #[test]
    fn test_split_of_fragment_inherits_base() {
        let mut board = board_with(Order::new("O1", "PO-1", "ST", 300));
        let bookkeeper = SplitBookkeeper::new();

        let first = bookkeeper.split(&mut board, "O1", 120).unwrap();
        let nested = bookkeeper.split(&mut board, &first.fragment_id, 20).unwrap();

        let fragment = board.order(&nested.fragment_id).unwrap();
        assert_eq!(fragment.family_key(), "PO-1");
        assert_eq!(fragment.split_number(), Some(2));
        assert_eq!(bookkeeper.family(&board, "PO-1").current_total, 300);
    }

    #[test]
    fn test_split_quantity_bounds() {
        let mut board = board_with(Order::new("O1", "PO-1", "ST", 100));
        let bookkeeper = SplitBookkeeper::new();

        for qty in [0, 100, 150] {
            let err = bookkeeper.split(&mut board, "O1", qty).unwrap_err();
            assert!(matches!(err, ScheduleError::InvalidSplitQuantity { .. }));
        }
        assert_eq!(board.order("O1").unwrap().order_quantity, 100);
        assert!(board.family_record("PO-1").is_none());
    }

    #[test]
    fn test_corrupted_family_is_detected() {
        let mut board = board_with(Order::new("O1", "PO-1", "ST", 100));
        board.insert_family(SplitFamily {
            base_po_number: "PO-1".to_string(),
            original_total: 120,
        });
        let bookkeeper = SplitBookkeeper::new();

        let err = bookkeeper.split(&mut board, "O1", 10).unwrap_err();
        assert!(err.is_defect());
        assert_eq!(board.order("O1").unwrap().order_quantity, 100);
        assert_eq!(bookkeeper.verify_all(&board).len(), 1);
    }

    #[test]
    fn test_merge_restores_quantity() {
        let mut board = board_with(Order::new("O1", "PO-1", "ST", 300));
        let bookkeeper = SplitBookkeeper::new();
        let outcome = bookkeeper.split(&mut board, "O1", 120).unwrap();

        let change = bookkeeper.merge(&mut board, &outcome.fragment_id, "O1").unwrap();
        assert_eq!(change.deleted_orders, vec![outcome.fragment_id.clone()]);
        assert_eq!(board.order("O1").unwrap().order_quantity, 300);
        assert!(board.order(&outcome.fragment_id).is_err());
        assert!(bookkeeper.verify_family(&board, "PO-1").is_ok());
    }

    #[test]
    fn test_merge_rejects_root_and_foreign_orders() {
        let mut board = board_with(Order::new("O1", "PO-1", "ST", 300));
        board.insert_order(Order::new("O2", "PO-2", "ST", 50));
        let bookkeeper = SplitBookkeeper::new();
        let outcome = bookkeeper.split(&mut board, "O1", 100).unwrap();

        assert!(matches!(
            bookkeeper.merge(&mut board, "O1", &outcome.fragment_id),
            Err(ScheduleError::MergeRejected { .. })
        ));
        assert!(matches!(
            bookkeeper.merge(&mut board, &outcome.fragment_id, "O2"),
            Err(ScheduleError::MergeRejected { .. })
        ));
    }

    #[test]
    fn test_update_quantity_moves_family_total() {
        let mut board = board_with(Order::new("O1", "PO-1", "ST", 300));
        let bookkeeper = SplitBookkeeper::new();
        let outcome = bookkeeper.split(&mut board, "O1", 100).unwrap();

        let change = bookkeeper
            .update_quantity(&mut board, &outcome.fragment_id, 130)
            .unwrap();
        assert_eq!(change.upserted_families[0].original_total, 330);
        assert!(bookkeeper.verify_family(&board, "PO-1").is_ok());

        let err = bookkeeper.update_quantity(&mut board, "O1", 0).unwrap_err();
        assert!(matches!(err, ScheduleError::InvalidQuantity { .. }));
    }
}
