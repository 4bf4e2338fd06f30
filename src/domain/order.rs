// ==========================================
// 成衣排产系统 - 订单领域模型
// ==========================================
// 红线: 实际产量合计不得超过订单数量
// 红线: 拆单家族数量合计恒等于原始总量
// ==========================================

use crate::domain::types::OrderStatus;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// Assignment - 排产落位
// ==========================================
// 非 PENDING 订单必定携带: 产线 + 计划起止日期
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub line_id: String,       // 产线ID
    pub plan_start: NaiveDate, // 计划开始 (首个有分配量的日期)
    pub plan_end: NaiveDate,   // 计划结束 (最后一个有分配量的日期)
}

// ==========================================
// OrderSchedule - 订单排产状态
// ==========================================
// 状态与落位合并为一个封闭枚举,
// 已完成却没有计划日期的订单无法构造
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderSchedule {
    Pending,
    Scheduled(Assignment),
    InProgress(Assignment),
    Completed(Assignment),
}

impl OrderSchedule {
    pub fn status(&self) -> OrderStatus {
        match self {
            OrderSchedule::Pending => OrderStatus::Pending,
            OrderSchedule::Scheduled(_) => OrderStatus::Scheduled,
            OrderSchedule::InProgress(_) => OrderStatus::InProgress,
            OrderSchedule::Completed(_) => OrderStatus::Completed,
        }
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        match self {
            OrderSchedule::Pending => None,
            OrderSchedule::Scheduled(a)
            | OrderSchedule::InProgress(a)
            | OrderSchedule::Completed(a) => Some(a),
        }
    }

    /// 按状态重新包装落位信息
    ///
    /// 目标状态为 PENDING 时丢弃落位
    pub fn with_status(assignment: Assignment, status: OrderStatus) -> Self {
        match status {
            OrderStatus::Pending => OrderSchedule::Pending,
            OrderStatus::Scheduled => OrderSchedule::Scheduled(assignment),
            OrderStatus::InProgress => OrderSchedule::InProgress(assignment),
            OrderStatus::Completed => OrderSchedule::Completed(assignment),
        }
    }
}

// ==========================================
// SplitInfo - 拆单信息
// ==========================================
// 仅拆分出的子单携带; 原单通过 po_number == base_po_number 归入家族
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitInfo {
    pub base_po_number: String, // 原始PO号
    pub split_number: u32,      // 拆分序号 (从1开始)
}

// ==========================================
// Order - 生产订单
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    // ===== 主键 =====
    pub order_id: String,

    // ===== 订单信息 =====
    pub po_number: String,   // PO号
    pub style: String,       // 款号
    pub order_quantity: u32, // 订单数量
    pub cut_quantity: u32,   // 裁剪数量
    pub issue_quantity: u32, // 发料数量

    // ===== 排产状态 =====
    pub schedule: OrderSchedule,

    // ===== 实际产量 (日期 → 数量) =====
    // 真实记录,退回待排池时保留
    pub actual_production: BTreeMap<NaiveDate, u32>,

    // ===== 拆单 =====
    pub split: Option<SplitInfo>,
}

impl Order {
    /// 创建待排订单
    pub fn new(
        order_id: impl Into<String>,
        po_number: impl Into<String>,
        style: impl Into<String>,
        order_quantity: u32,
    ) -> Self {
        Self {
            order_id: order_id.into(),
            po_number: po_number.into(),
            style: style.into(),
            order_quantity,
            cut_quantity: 0,
            issue_quantity: 0,
            schedule: OrderSchedule::Pending,
            actual_production: BTreeMap::new(),
            split: None,
        }
    }

    pub fn status(&self) -> OrderStatus {
        self.schedule.status()
    }

    pub fn assignment(&self) -> Option<&Assignment> {
        self.schedule.assignment()
    }

    pub fn line_id(&self) -> Option<&str> {
        self.assignment().map(|a| a.line_id.as_str())
    }

    pub fn plan_start(&self) -> Option<NaiveDate> {
        self.assignment().map(|a| a.plan_start)
    }

    pub fn plan_end(&self) -> Option<NaiveDate> {
        self.assignment().map(|a| a.plan_end)
    }

    /// 已记录实际产量合计
    pub fn produced_total(&self) -> u64 {
        self.actual_production.values().map(|&q| u64::from(q)).sum()
    }

    /// 尚未生产的剩余数量
    pub fn remaining_quantity(&self) -> u32 {
        let produced = self.produced_total();
        u32::try_from(u64::from(self.order_quantity).saturating_sub(produced)).unwrap_or(0)
    }

    /// 拆单家族键: 子单取 base_po_number, 其余取自身 PO 号
    pub fn family_key(&self) -> &str {
        match &self.split {
            Some(info) => info.base_po_number.as_str(),
            None => self.po_number.as_str(),
        }
    }

    pub fn split_number(&self) -> Option<u32> {
        self.split.as_ref().map(|s| s.split_number)
    }

    pub fn is_fragment(&self) -> bool {
        self.split.is_some()
    }
}

// ==========================================
// SplitFamily - 拆单家族
// ==========================================
// 记录家族原始总量, 首次拆单时创建
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SplitFamily {
    pub base_po_number: String,
    pub original_total: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    #[test]
    fn test_remaining_quantity_subtracts_actual() {
        let mut order = Order::new("O1", "PO-1", "ST-1", 250);
        order.actual_production.insert(d(1, 1), 100);
        order.actual_production.insert(d(1, 2), 40);

        assert_eq!(order.produced_total(), 140);
        assert_eq!(order.remaining_quantity(), 110);
    }

    #[test]
    fn test_pending_has_no_plan_dates() {
        let order = Order::new("O1", "PO-1", "ST-1", 10);
        assert_eq!(order.status(), OrderStatus::Pending);
        assert!(order.plan_start().is_none());
        assert!(order.line_id().is_none());
    }

    #[test]
    fn test_family_key_uses_base_po_for_fragments() {
        let mut fragment = Order::new("O2", "PO-1-1", "ST-1", 10);
        assert_eq!(fragment.family_key(), "PO-1-1");

        fragment.split = Some(SplitInfo {
            base_po_number: "PO-1".to_string(),
            split_number: 1,
        });
        assert_eq!(fragment.family_key(), "PO-1");
        assert_eq!(fragment.split_number(), Some(1));
    }

    #[test]
    fn test_with_status_pending_drops_assignment() {
        let a = Assignment {
            line_id: "L1".to_string(),
            plan_start: d(1, 1),
            plan_end: d(1, 3),
        };
        assert_eq!(
            OrderSchedule::with_status(a.clone(), OrderStatus::Pending),
            OrderSchedule::Pending
        );
        assert_eq!(
            OrderSchedule::with_status(a.clone(), OrderStatus::InProgress).assignment(),
            Some(&a)
        );
    }
}
