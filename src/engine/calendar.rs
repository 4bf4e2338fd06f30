// ==========================================
// 成衣排产系统 - 假期日历
// ==========================================
// 职责: 判断 (产线, 日期) 是否停产
// 输入: 调用方预先加载的假期 + 假期产线关联
// 红线: 纯查找, 不访问数据库, 不会失败
// ==========================================

use crate::domain::holiday::{Holiday, HolidayLineAssignment};
use chrono::NaiveDate;
use std::collections::{BTreeMap, HashMap, HashSet};

// ==========================================
// HolidayCalendar - 假期日历
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct HolidayCalendar {
    // 日期 → 当天的假期记录
    by_date: BTreeMap<NaiveDate, Vec<Holiday>>,
    // holiday_id → 关联产线 (仅非全局假期有意义)
    assignments: HashMap<String, HashSet<String>>,
}

impl HolidayCalendar {
    /// 空日历 (无假期)
    pub fn new() -> Self {
        Self::default()
    }

    /// 由假期记录与关联记录构建
    ///
    /// 指向不存在假期的关联记录被忽略
    pub fn from_records(holidays: Vec<Holiday>, assignments: &[HolidayLineAssignment]) -> Self {
        let mut calendar = Self::new();
        for holiday in holidays {
            calendar.add_holiday(holiday);
        }
        for assignment in assignments {
            calendar.assign(&assignment.holiday_id, &assignment.line_id);
        }
        calendar
    }

    /// 添加假期; 同一日期同名假期视为同一条 (date, name 唯一)
    pub fn add_holiday(&mut self, holiday: Holiday) {
        let day = self.by_date.entry(holiday.date).or_default();
        if let Some(existing) = day.iter_mut().find(|h| h.name == holiday.name) {
            *existing = holiday;
        } else {
            day.push(holiday);
        }
    }

    /// 建立假期与产线的关联, 假期不存在时返回 false
    pub fn assign(&mut self, holiday_id: &str, line_id: &str) -> bool {
        let known = self
            .by_date
            .values()
            .flatten()
            .any(|h| h.holiday_id == holiday_id);
        if !known {
            return false;
        }
        self.assignments
            .entry(holiday_id.to_string())
            .or_default()
            .insert(line_id.to_string());
        true
    }

    /// 判断某产线某日是否为假期
    ///
    /// 规则:
    /// 1) 当天存在全局假期 → 是 (短路, 不再查关联)
    /// 2) 当天存在关联了该产线的非全局假期 → 是
    /// 3) 其他 → 否
    pub fn is_holiday(&self, line_id: &str, date: NaiveDate) -> bool {
        let Some(holidays) = self.by_date.get(&date) else {
            return false;
        };

        if holidays.iter().any(|h| h.is_global) {
            return true;
        }

        holidays.iter().any(|h| {
            self.assignments
                .get(&h.holiday_id)
                .map(|lines| lines.contains(line_id))
                .unwrap_or(false)
        })
    }

    /// 某日的假期记录
    pub fn holidays_on(&self, date: NaiveDate) -> &[Holiday] {
        self.by_date.get(&date).map(Vec::as_slice).unwrap_or(&[])
    }

    /// 假期关联的产线
    pub fn lines_for(&self, holiday_id: &str) -> Vec<&str> {
        let mut lines: Vec<&str> = self
            .assignments
            .get(holiday_id)
            .map(|set| set.iter().map(String::as_str).collect())
            .unwrap_or_default();
        lines.sort_unstable();
        lines
    }

    pub fn len(&self) -> usize {
        self.by_date.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_date.is_empty()
    }
}
