// ==========================================
// 成衣排产系统 - 排产看板 (内存快照)
// ==========================================
// 职责: 承载调用方预先加载的产线/订单/计划/假期/拆单家族
// 结构: 实体表 + 索引 (订单→计划, 单元格→计划), 无对象图循环引用
// 红线: 引擎先在内存中算出完整新状态并校验, 再落到看板并输出变更集
// ==========================================

use crate::domain::line::ProductionLine;
use crate::domain::order::{Order, SplitFamily};
use crate::domain::plan::PlannedProduction;
use crate::domain::types::OrderStatus;
use crate::engine::calendar::HolidayCalendar;
use crate::engine::error::{ScheduleError, ScheduleResult};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap};

// ==========================================
// CellEntry - 单元格内的一条占用
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellEntry {
    pub order_id: String,
    pub quantity: u32,
    pub order_index: u32,
}

// ==========================================
// PlanLedger - 计划台账
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct PlanLedger {
    // 订单 → 计划记录 (按日期升序)
    by_order: HashMap<String, Vec<PlannedProduction>>,
    // (产线, 日期) → 占用 (按 order_index 升序)
    cells: BTreeMap<(String, NaiveDate), Vec<CellEntry>>,
}

impl PlanLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// 订单的计划记录
    pub fn entries_for(&self, order_id: &str) -> &[PlannedProduction] {
        self.by_order
            .get(order_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 单元格内的占用
    pub fn cell_entries(&self, line_id: &str, date: NaiveDate) -> &[CellEntry] {
        self.cells
            .get(&(line_id.to_string(), date))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// 单元格已承诺量, 可排除指定订单
    pub fn committed(&self, line_id: &str, date: NaiveDate, excluding: Option<&str>) -> u64 {
        self.cell_entries(line_id, date)
            .iter()
            .filter(|e| excluding != Some(e.order_id.as_str()))
            .map(|e| u64::from(e.quantity))
            .sum()
    }

    /// 单元格下一个 order_index
    pub fn next_order_index(&self, line_id: &str, date: NaiveDate) -> u32 {
        self.cell_entries(line_id, date)
            .iter()
            .map(|e| e.order_index + 1)
            .max()
            .unwrap_or(0)
    }

    /// 追加一条计划记录 (加载或落位时使用)
    pub fn insert(&mut self, entry: PlannedProduction) {
        let cell = self
            .cells
            .entry((entry.line_id.clone(), entry.plan_date))
            .or_default();
        cell.push(CellEntry {
            order_id: entry.order_id.clone(),
            quantity: entry.planned_quantity,
            order_index: entry.order_index,
        });
        cell.sort_by(|a, b| {
            a.order_index
                .cmp(&b.order_index)
                .then_with(|| a.order_id.cmp(&b.order_id))
        });

        let entries = self.by_order.entry(entry.order_id.clone()).or_default();
        entries.push(entry);
        entries.sort_by_key(|e| e.plan_date);
    }

    /// 移除订单的全部计划记录并返回
    pub fn remove_order(&mut self, order_id: &str) -> Vec<PlannedProduction> {
        let removed = self.by_order.remove(order_id).unwrap_or_default();
        for entry in &removed {
            let key = (entry.line_id.clone(), entry.plan_date);
            if let Some(cell) = self.cells.get_mut(&key) {
                cell.retain(|e| e.order_id != order_id);
                if cell.is_empty() {
                    self.cells.remove(&key);
                }
            }
        }
        removed
    }

    /// 同步订单计划记录的状态
    pub fn set_status(&mut self, order_id: &str, status: OrderStatus) {
        if let Some(entries) = self.by_order.get_mut(order_id) {
            for entry in entries.iter_mut() {
                entry.status = status;
            }
        }
    }

    /// 回写某日实际产量, 不存在该日计划时返回 false
    pub fn set_actual(&mut self, order_id: &str, date: NaiveDate, quantity: Option<u32>) -> bool {
        let Some(entries) = self.by_order.get_mut(order_id) else {
            return false;
        };
        match entries.iter_mut().find(|e| e.plan_date == date) {
            Some(entry) => {
                entry.actual_quantity = quantity;
                true
            }
            None => false,
        }
    }

    /// 所有有占用的单元格
    pub fn occupied_cells(&self) -> impl Iterator<Item = (&str, NaiveDate)> {
        self.cells.keys().map(|(line, date)| (line.as_str(), *date))
    }

    pub fn entry_count(&self) -> usize {
        self.by_order.values().map(Vec::len).sum()
    }
}

// ==========================================
// ChangeSet - 变更集
// ==========================================
// 引擎操作成功后输出, 由 API 层一次性持久化
#[derive(Debug, Clone, Default)]
pub struct ChangeSet {
    pub upserted_orders: Vec<Order>,
    pub deleted_orders: Vec<String>,
    // 订单 → 新的完整计划 (先删后写, 空表示清空)
    pub plan_replacements: BTreeMap<String, Vec<PlannedProduction>>,
    pub upserted_families: Vec<SplitFamily>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.upserted_orders.is_empty()
            && self.deleted_orders.is_empty()
            && self.plan_replacements.is_empty()
            && self.upserted_families.is_empty()
    }

    pub fn order(&self, order_id: &str) -> Option<&Order> {
        self.upserted_orders.iter().find(|o| o.order_id == order_id)
    }

    pub fn plan_for(&self, order_id: &str) -> Option<&[PlannedProduction]> {
        self.plan_replacements.get(order_id).map(Vec::as_slice)
    }
}

// ==========================================
// ScheduleBoard - 排产看板
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ScheduleBoard {
    lines: HashMap<String, ProductionLine>,
    orders: HashMap<String, Order>,
    families: HashMap<String, SplitFamily>,
    ledger: PlanLedger,
    calendar: HolidayCalendar,
}

impl ScheduleBoard {
    pub fn new(calendar: HolidayCalendar) -> Self {
        Self {
            calendar,
            ..Self::default()
        }
    }

    // ==========================================
    // 加载
    // ==========================================

    pub fn insert_line(&mut self, line: ProductionLine) {
        self.lines.insert(line.line_id.clone(), line);
    }

    pub fn insert_order(&mut self, order: Order) {
        self.orders.insert(order.order_id.clone(), order);
    }

    pub fn insert_plan_entry(&mut self, entry: PlannedProduction) {
        self.ledger.insert(entry);
    }

    pub fn insert_family(&mut self, family: SplitFamily) {
        self.families.insert(family.base_po_number.clone(), family);
    }

    pub fn set_calendar(&mut self, calendar: HolidayCalendar) {
        self.calendar = calendar;
    }

    // ==========================================
    // 查询
    // ==========================================

    pub fn line(&self, line_id: &str) -> ScheduleResult<&ProductionLine> {
        self.lines
            .get(line_id)
            .ok_or_else(|| ScheduleError::not_found("ProductionLine", line_id))
    }

    pub fn order(&self, order_id: &str) -> ScheduleResult<&Order> {
        self.orders
            .get(order_id)
            .ok_or_else(|| ScheduleError::not_found("Order", order_id))
    }

    /// 产线列表 (按 sort_order, line_id 排序)
    pub fn lines(&self) -> Vec<&ProductionLine> {
        let mut lines: Vec<&ProductionLine> = self.lines.values().collect();
        lines.sort_by(|a, b| {
            a.sort_order
                .cmp(&b.sort_order)
                .then_with(|| a.line_id.cmp(&b.line_id))
        });
        lines
    }

    pub fn orders(&self) -> impl Iterator<Item = &Order> {
        self.orders.values()
    }

    pub fn family_record(&self, base_po_number: &str) -> Option<&SplitFamily> {
        self.families.get(base_po_number)
    }

    pub fn families(&self) -> impl Iterator<Item = &SplitFamily> {
        self.families.values()
    }

    /// 家族成员: 根订单在前, 子单按拆分序号升序
    pub fn family_members(&self, base_po_number: &str) -> Vec<&Order> {
        let mut members: Vec<&Order> = self
            .orders
            .values()
            .filter(|o| o.family_key() == base_po_number)
            .collect();
        members.sort_by(|a, b| {
            a.split_number()
                .unwrap_or(0)
                .cmp(&b.split_number().unwrap_or(0))
                .then_with(|| a.order_id.cmp(&b.order_id))
        });
        members
    }

    pub fn ledger(&self) -> &PlanLedger {
        &self.ledger
    }

    pub fn calendar(&self) -> &HolidayCalendar {
        &self.calendar
    }

    // ==========================================
    // 提交 (仅供引擎在校验通过后调用)
    // ==========================================

    /// 写入订单新状态, 并按需替换其计划
    pub(crate) fn commit_order(
        &mut self,
        order: Order,
        plan: Option<Vec<PlannedProduction>>,
        change: &mut ChangeSet,
    ) {
        let order_id = order.order_id.clone();
        if let Some(entries) = plan {
            self.ledger.remove_order(&order_id);
            for entry in &entries {
                self.ledger.insert(entry.clone());
            }
            change.plan_replacements.insert(order_id.clone(), entries);
        }
        change.upserted_orders.retain(|o| o.order_id != order_id);
        change.upserted_orders.push(order.clone());
        self.orders.insert(order_id, order);
    }

    /// 删除订单及其计划
    pub(crate) fn remove_order(&mut self, order_id: &str, change: &mut ChangeSet) {
        self.ledger.remove_order(order_id);
        self.orders.remove(order_id);
        change.upserted_orders.retain(|o| o.order_id != order_id);
        change.plan_replacements.remove(order_id);
        change.deleted_orders.push(order_id.to_string());
    }

    pub(crate) fn commit_family(&mut self, family: SplitFamily, change: &mut ChangeSet) {
        change
            .upserted_families
            .retain(|f| f.base_po_number != family.base_po_number);
        change.upserted_families.push(family.clone());
        self.families.insert(family.base_po_number.clone(), family);
    }

    pub(crate) fn ledger_mut(&mut self) -> &mut PlanLedger {
        &mut self.ledger
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, day).unwrap()
    }

    fn entry(id: &str, order_id: &str, day: u32, qty: u32, index: u32) -> PlannedProduction {
        PlannedProduction {
            entry_id: id.to_string(),
            order_id: order_id.to_string(),
            line_id: "A".to_string(),
            plan_date: d(day),
            planned_quantity: qty,
            actual_quantity: None,
            status: OrderStatus::Scheduled,
            order_index: index,
        }
    }

    #[test]
    fn test_ledger_committed_and_exclusion() {
        let mut ledger = PlanLedger::new();
        ledger.insert(entry("E1", "O1", 1, 60, 0));
        ledger.insert(entry("E2", "O2", 1, 30, 1));

        assert_eq!(ledger.committed("A", d(1), None), 90);
        assert_eq!(ledger.committed("A", d(1), Some("O1")), 30);
        assert_eq!(ledger.committed("B", d(1), None), 0);
        assert_eq!(ledger.next_order_index("A", d(1)), 2);
        assert_eq!(ledger.next_order_index("A", d(2)), 0);
    }

    #[test]
    fn test_ledger_remove_order_clears_cells() {
        let mut ledger = PlanLedger::new();
        ledger.insert(entry("E1", "O1", 1, 60, 0));
        ledger.insert(entry("E2", "O1", 2, 40, 0));
        ledger.insert(entry("E3", "O2", 2, 10, 1));

        let removed = ledger.remove_order("O1");
        assert_eq!(removed.len(), 2);
        assert!(ledger.cell_entries("A", d(1)).is_empty());
        assert_eq!(ledger.committed("A", d(2), None), 10);
        assert_eq!(ledger.occupied_cells().count(), 1);
    }

    #[test]
    fn test_entries_sorted_by_date() {
        let mut ledger = PlanLedger::new();
        ledger.insert(entry("E2", "O1", 3, 10, 0));
        ledger.insert(entry("E1", "O1", 1, 10, 0));

        let dates: Vec<NaiveDate> = ledger.entries_for("O1").iter().map(|e| e.plan_date).collect();
        assert_eq!(dates, vec![d(1), d(3)]);
    }

    #[test]
    fn test_missing_line_is_not_found() {
        let board = ScheduleBoard::new(HolidayCalendar::new());
        assert!(matches!(
            board.line("X"),
            Err(ScheduleError::NotFound { .. })
        ));
    }
}
