// ==========================================
// 测试辅助函数
// ==========================================
// 职责: 提供测试所需的数据库初始化、看板构造、测试数据生成等功能
// ==========================================
#![allow(dead_code)]

use chrono::NaiveDate;
use garment_aps::app::AppState;
use garment_aps::domain::{Holiday, HolidayLineAssignment, Order, ProductionLine};
use garment_aps::engine::{HolidayCalendar, ScheduleBoard};
use rusqlite::Connection;
use std::error::Error;
use tempfile::NamedTempFile;

/// 创建临时测试数据库并初始化 schema
///
/// # 返回
/// - NamedTempFile: 临时数据库文件（需要保持存活）
/// - String: 数据库文件路径
pub fn create_test_db() -> Result<(NamedTempFile, String), Box<dyn Error>> {
    let temp_file = NamedTempFile::new()?;
    let db_path = temp_file.path().to_string_lossy().to_string();

    let conn = garment_aps::db::open_sqlite_connection(&db_path)?;
    garment_aps::db::init_schema(&conn)?;

    Ok((temp_file, db_path))
}

/// 创建基于临时数据库的 AppState
pub fn create_test_state() -> (NamedTempFile, AppState) {
    let (temp_file, db_path) = create_test_db().expect("创建测试数据库失败");
    let state = AppState::new(db_path).expect("初始化AppState失败");
    (temp_file, state)
}

/// 直接打开测试数据库 (用于核对落库结果)
pub fn open_raw(db_path: &str) -> Connection {
    garment_aps::db::open_sqlite_connection(db_path).expect("打开测试数据库失败")
}

/// 2024 年日期
pub fn d(month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, month, day).unwrap()
}

pub fn global_holiday(id: &str, date: NaiveDate) -> Holiday {
    Holiday {
        holiday_id: id.to_string(),
        date,
        name: format!("假期{}", id),
        is_global: true,
    }
}

pub fn line_holiday(id: &str, date: NaiveDate) -> Holiday {
    Holiday {
        holiday_id: id.to_string(),
        date,
        name: format!("产线停工{}", id),
        is_global: false,
    }
}

pub fn assignment(holiday_id: &str, line_id: &str) -> HolidayLineAssignment {
    HolidayLineAssignment {
        holiday_id: holiday_id.to_string(),
        line_id: line_id.to_string(),
    }
}

/// 构造内存看板: 产线 (id, 产能) + 节假日
pub fn board_with(
    lines: &[(&str, u32)],
    holidays: Vec<Holiday>,
    assignments: &[HolidayLineAssignment],
) -> ScheduleBoard {
    let mut board = ScheduleBoard::new(HolidayCalendar::from_records(holidays, assignments));
    for (line_id, capacity) in lines {
        board.insert_line(ProductionLine::new(*line_id, format!("产线{}", line_id), *capacity));
    }
    board
}

pub fn pending_order(order_id: &str, po_number: &str, quantity: u32) -> Order {
    Order::new(order_id, po_number, "ST-001", quantity)
}
