// ==========================================
// 成衣排产系统 - 产线领域模型
// ==========================================
// 红线: 产线日产能必须 > 0
// ==========================================

use crate::domain::types::LineStatus;
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionLine - 生产线
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionLine {
    pub line_id: String,          // 产线ID
    pub name: String,             // 产线名称
    pub capacity: u32,            // 名义日产能 (件/天)
    pub group_id: Option<String>, // 所属分组
    pub status: LineStatus,       // 产线状态
    pub sort_order: i32,          // 显示顺序
}

impl ProductionLine {
    pub fn new(line_id: impl Into<String>, name: impl Into<String>, capacity: u32) -> Self {
        Self {
            line_id: line_id.into(),
            name: name.into(),
            capacity,
            group_id: None,
            status: LineStatus::Active,
            sort_order: 0,
        }
    }

    /// 是否接受新排产
    pub fn is_schedulable(&self) -> bool {
        self.status == LineStatus::Active && self.capacity > 0
    }
}

// ==========================================
// LineGroup - 产线分组
// ==========================================
// 纯组织容器, 不参与排产计算
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineGroup {
    pub group_id: String,
    pub name: String,
    pub is_expanded: bool, // 展开状态
    pub sort_order: i32,
}
