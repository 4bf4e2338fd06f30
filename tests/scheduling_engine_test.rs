// ==========================================
// SchedulingEngine 引擎集成测试
// ==========================================
// 测试目标: 验证落位 / 退回 / 移动 / 冲突检测 / 实际产量
// 覆盖范围: 产能约束、节假日跳过、原子性、爬坡效率
// ==========================================

mod test_helpers;

use garment_aps::domain::{OrderStatus, PlacementMode, RampUpPlan, RampUpPoint};
use garment_aps::engine::{
    CapacityAccountant, PlaceOptions, ScheduleBoard, ScheduleError, SchedulingEngine,
};
use std::collections::BTreeMap;
use test_helpers::*;

fn plan_of(board: &ScheduleBoard, order_id: &str) -> BTreeMap<chrono::NaiveDate, u32> {
    board
        .ledger()
        .entries_for(order_id)
        .iter()
        .map(|e| (e.plan_date, e.planned_quantity))
        .collect()
}

fn options(horizon_days: u32) -> PlaceOptions {
    PlaceOptions {
        horizon_days,
        ..PlaceOptions::default()
    }
}

#[test]
fn test_place_250_on_capacity_100() {
    println!("\n=== 测试：250 件落位到产能 100 的产线 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 250));
    let engine = SchedulingEngine::new();

    let change = engine
        .place(&mut board, "O1", "A", d(1, 1), &PlaceOptions::default())
        .unwrap();

    let plan = plan_of(&board, "O1");
    assert_eq!(
        plan,
        BTreeMap::from([(d(1, 1), 100), (d(1, 2), 100), (d(1, 3), 50)])
    );
    let order = board.order("O1").unwrap();
    assert_eq!(order.status(), OrderStatus::Scheduled);
    assert_eq!(order.plan_start(), Some(d(1, 1)));
    assert_eq!(order.plan_end(), Some(d(1, 3)));
    assert_eq!(order.line_id(), Some("A"));
    assert_eq!(change.plan_for("O1").map(|p| p.len()), Some(3));

    println!("✓ 计划: {:?}", plan);
}

#[test]
fn test_place_skips_global_holiday() {
    println!("\n=== 测试：跳过全局假期 ===");

    let mut board = board_with(&[("A", 100)], vec![global_holiday("H1", d(1, 2))], &[]);
    board.insert_order(pending_order("O1", "PO-1", 250));

    SchedulingEngine::new()
        .place(&mut board, "O1", "A", d(1, 1), &PlaceOptions::default())
        .unwrap();

    assert_eq!(
        plan_of(&board, "O1"),
        BTreeMap::from([(d(1, 1), 100), (d(1, 3), 100), (d(1, 4), 50)])
    );
    assert_eq!(board.order("O1").unwrap().plan_end(), Some(d(1, 4)));
    println!("✓ 01-02 未分配");
}

#[test]
fn test_line_specific_holiday_only_blocks_assigned_line() {
    println!("\n=== 测试：产线专属假期 ===");

    let mut board = board_with(
        &[("A", 100), ("B", 100)],
        vec![line_holiday("H1", d(1, 1))],
        &[assignment("H1", "A")],
    );
    board.insert_order(pending_order("O1", "PO-1", 100));
    board.insert_order(pending_order("O2", "PO-2", 100));
    let engine = SchedulingEngine::new();

    engine
        .place(&mut board, "O1", "A", d(1, 1), &PlaceOptions::default())
        .unwrap();
    engine
        .place(&mut board, "O2", "B", d(1, 1), &PlaceOptions::default())
        .unwrap();

    assert_eq!(board.order("O1").unwrap().plan_start(), Some(d(1, 2)));
    assert_eq!(board.order("O2").unwrap().plan_start(), Some(d(1, 1)));
    println!("✓ A 顺延一天, B 不受影响");
}

#[test]
fn test_allocates_ceil_q_over_c_days() {
    println!("\n=== 测试：ceil(Q/C) 天 ===");

    let engine = SchedulingEngine::new();
    for (quantity, capacity) in [(250u32, 100u32), (300, 100), (1, 100), (99, 33), (1000, 7)] {
        let mut board = board_with(&[("A", capacity)], vec![], &[]);
        board.insert_order(pending_order("O1", "PO-1", quantity));
        engine
            .place(&mut board, "O1", "A", d(3, 1), &options(365))
            .unwrap();

        let entries = board.ledger().entries_for("O1");
        let days = quantity.div_ceil(capacity) as usize;
        assert_eq!(entries.len(), days, "Q={} C={}", quantity, capacity);

        let (last, full) = entries.split_last().unwrap();
        assert!(full.iter().all(|e| e.planned_quantity == capacity));
        let expected_last = match quantity % capacity {
            0 => capacity,
            rem => rem,
        };
        assert_eq!(last.planned_quantity, expected_last);

        // 连续日期
        for pair in entries.windows(2) {
            assert_eq!(pair[1].plan_date, pair[0].plan_date.succ_opt().unwrap());
        }
    }
    println!("✓ 全部组合通过");
}

#[test]
fn test_holiday_only_leaves_order_pending() {
    println!("\n=== 测试：窗口内全部为假期 ===");

    let holidays = (1..=3).map(|day| global_holiday(&format!("H{}", day), d(1, day))).collect();
    let mut board = board_with(&[("A", 100)], holidays, &[]);
    board.insert_order(pending_order("O1", "PO-1", 50));

    let err = SchedulingEngine::new()
        .place(&mut board, "O1", "A", d(1, 1), &options(3))
        .unwrap_err();

    assert!(matches!(err, ScheduleError::HolidayOnly { horizon_days: 3, .. }));
    assert_eq!(board.order("O1").unwrap().status(), OrderStatus::Pending);
    assert_eq!(board.ledger().entry_count(), 0);
    println!("✓ {}", err);
}

#[test]
fn test_capacity_exceeded_is_atomic() {
    println!("\n=== 测试：产能不足时不产生部分计划 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 250));

    let err = SchedulingEngine::new()
        .place(&mut board, "O1", "A", d(1, 1), &options(2))
        .unwrap_err();

    match err {
        ScheduleError::CapacityExceeded { shortfall, .. } => assert_eq!(shortfall, 50),
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(board.order("O1").unwrap().status(), OrderStatus::Pending);
    assert!(board.ledger().entries_for("O1").is_empty());
    println!("✓ 缺口 50, 看板未变");
}

#[test]
fn test_drop_restores_available_capacity() {
    println!("\n=== 测试：退回后可用产能恢复 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 60));
    board.insert_order(pending_order("O2", "PO-2", 250));
    let engine = SchedulingEngine::new();
    engine
        .place(&mut board, "O1", "A", d(1, 1), &PlaceOptions::default())
        .unwrap();

    let days: Vec<_> = (1..=5).map(|day| d(1, day)).collect();
    let snapshot = |board: &ScheduleBoard| -> Vec<u32> {
        let accountant = CapacityAccountant::new(board);
        let line = board.line("A").unwrap();
        days.iter().map(|&date| accountant.available_capacity(line, date)).collect()
    };
    let before = snapshot(&board);

    engine
        .place(&mut board, "O2", "A", d(1, 1), &PlaceOptions::default())
        .unwrap();
    assert_ne!(snapshot(&board), before);

    let mut order = board.order("O2").unwrap().clone();
    order.actual_production.insert(d(1, 1), 10);
    board.insert_order(order);

    engine.drop_order(&mut board, "O2").unwrap();
    assert_eq!(snapshot(&board), before);

    let dropped = board.order("O2").unwrap();
    assert_eq!(dropped.status(), OrderStatus::Pending);
    assert!(dropped.line_id().is_none());
    assert_eq!(dropped.actual_production.get(&d(1, 1)), Some(&10));
    println!("✓ 可用产能: {:?}", before);
}

#[test]
fn test_move_failure_keeps_original_plan() {
    println!("\n=== 测试：移动失败时原计划保持不变 ===");

    let mut board = board_with(&[("A", 100), ("B", 10)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 250));
    let engine = SchedulingEngine::new();
    engine
        .place(&mut board, "O1", "A", d(1, 1), &options(30))
        .unwrap();
    let original = plan_of(&board, "O1");

    let err = engine
        .move_order(&mut board, "O1", "B", d(1, 1), &options(5))
        .unwrap_err();
    assert!(matches!(err, ScheduleError::CapacityExceeded { .. }));

    assert_eq!(plan_of(&board, "O1"), original);
    assert_eq!(board.order("O1").unwrap().line_id(), Some("A"));
    println!("✓ 原计划保留");
}

#[test]
fn test_move_reuses_own_capacity() {
    println!("\n=== 测试：同产线后移可复用自身占用 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 200));
    let engine = SchedulingEngine::new();
    engine
        .place(&mut board, "O1", "A", d(1, 1), &PlaceOptions::default())
        .unwrap();

    engine
        .move_order(&mut board, "O1", "A", d(1, 2), &PlaceOptions::default())
        .unwrap();

    assert_eq!(
        plan_of(&board, "O1"),
        BTreeMap::from([(d(1, 2), 100), (d(1, 3), 100)])
    );
    let accountant = CapacityAccountant::new(&board);
    assert_eq!(accountant.available_capacity(board.line("A").unwrap(), d(1, 1)), 100);
    println!("✓ 01-01 已释放");
}

#[test]
fn test_detect_overlap_reports_collisions() {
    println!("\n=== 测试：冲突检测 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 150));
    board.insert_order(pending_order("O2", "PO-2", 150));
    let engine = SchedulingEngine::new();
    engine
        .place(&mut board, "O1", "A", d(1, 1), &PlaceOptions::default())
        .unwrap();

    let report = engine
        .detect_overlap(&board, "O2", "A", d(1, 1), &PlaceOptions::default())
        .unwrap();
    assert!(report.has_overlap());
    // 01-01 已满, 01-02 剩余 50 恰好容纳
    assert_eq!(report.collisions.len(), 1);
    assert_eq!(report.collisions[0].date, d(1, 1));
    assert_eq!(report.collisions[0].available, 0);
    assert_eq!(report.collisions[0].shortfall(), 100);

    let clear = engine
        .detect_overlap(&board, "O2", "A", d(1, 3), &PlaceOptions::default())
        .unwrap();
    assert!(!clear.has_overlap());
    println!("✓ 冲突日: {:?}", report.collisions);
}

#[test]
fn test_override_mode_overbooks_and_is_reported() {
    println!("\n=== 测试：人工超排 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 100));
    board.insert_order(pending_order("O2", "PO-2", 100));
    let engine = SchedulingEngine::new();
    engine
        .place(&mut board, "O1", "A", d(1, 1), &PlaceOptions::default())
        .unwrap();

    let override_opts = PlaceOptions {
        mode: PlacementMode::Override,
        ..PlaceOptions::default()
    };
    engine
        .place(&mut board, "O2", "A", d(1, 1), &override_opts)
        .unwrap();

    let accountant = CapacityAccountant::new(&board);
    let line = board.line("A").unwrap();
    assert_eq!(accountant.available_capacity(line, d(1, 1)), 0);
    assert!((accountant.utilization(line, d(1, 1)) - 200.0).abs() < f64::EPSILON);
    assert_eq!(accountant.overbooked_cells().len(), 1);
    println!("✓ 利用率 200%");
}

#[test]
fn test_ramp_up_plan_spreads_quantity() {
    println!("\n=== 测试：爬坡效率 ===");

    let mut board = board_with(&[("A", 100)], vec![global_holiday("H1", d(1, 2))], &[]);
    board.insert_order(pending_order("O1", "PO-1", 250));
    let ramp_up = RampUpPlan::new(
        "R1",
        "新款",
        vec![
            RampUpPoint { day_offset: 0, efficiency_pct: 50 },
            RampUpPoint { day_offset: 1, efficiency_pct: 80 },
        ],
        100,
    );
    let opts = PlaceOptions {
        ramp_up: Some(ramp_up),
        ..PlaceOptions::default()
    };

    SchedulingEngine::new()
        .place(&mut board, "O1", "A", d(1, 1), &opts)
        .unwrap();

    // 假期不推进爬坡天数
    assert_eq!(
        plan_of(&board, "O1"),
        BTreeMap::from([(d(1, 1), 50), (d(1, 3), 80), (d(1, 4), 100), (d(1, 5), 20)])
    );
    println!("✓ 50 → 80 → 100 → 20");
}

#[test]
fn test_actual_production_lifecycle() {
    println!("\n=== 测试：实际产量驱动状态 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 150));
    let engine = SchedulingEngine::new();
    engine
        .place(&mut board, "O1", "A", d(1, 1), &PlaceOptions::default())
        .unwrap();

    engine.record_actual(&mut board, "O1", d(1, 1), 100).unwrap();
    assert_eq!(board.order("O1").unwrap().status(), OrderStatus::InProgress);

    let err = engine.record_actual(&mut board, "O1", d(1, 2), 60).unwrap_err();
    assert!(matches!(err, ScheduleError::OverProduction { recorded: 160, .. }));

    engine.record_actual(&mut board, "O1", d(1, 2), 50).unwrap();
    let order = board.order("O1").unwrap();
    assert_eq!(order.status(), OrderStatus::Completed);
    assert!(order.produced_total() <= u64::from(order.order_quantity));
    assert!(board
        .ledger()
        .entries_for("O1")
        .iter()
        .all(|e| e.status == OrderStatus::Completed));

    let err = engine.record_actual(&mut board, "O1", d(1, 3), 1).unwrap_err();
    assert!(matches!(err, ScheduleError::OverProduction { recorded: 151, .. }));
    assert_eq!(board.order("O1").unwrap().status(), OrderStatus::Completed);

    // 已完成订单允许修正
    engine.record_actual(&mut board, "O1", d(1, 2), 30).unwrap();
    assert_eq!(board.order("O1").unwrap().status(), OrderStatus::InProgress);
    assert!(board
        .ledger()
        .entries_for("O1")
        .iter()
        .all(|e| e.status == OrderStatus::InProgress));

    engine.record_actual(&mut board, "O1", d(1, 1), 0).unwrap();
    engine.record_actual(&mut board, "O1", d(1, 2), 0).unwrap();
    assert_eq!(board.order("O1").unwrap().status(), OrderStatus::Scheduled);
    println!("✓ SCHEDULED → IN_PROGRESS → COMPLETED → IN_PROGRESS → SCHEDULED");
}

#[test]
fn test_holiday_cells_have_no_capacity() {
    println!("\n=== 测试：假期单元格可用产能为 0 ===");

    let board = board_with(
        &[("A", 100), ("B", 80)],
        vec![global_holiday("H1", d(1, 1)), line_holiday("H2", d(1, 2))],
        &[assignment("H2", "B")],
    );
    let accountant = CapacityAccountant::new(&board);

    for line in board.lines() {
        for day in 1..=3 {
            let date = d(1, day);
            if accountant.is_holiday(line, date) {
                assert_eq!(accountant.available_capacity(line, date), 0);
                assert_eq!(accountant.utilization(line, date), 0.0);
            } else {
                assert_eq!(accountant.available_capacity(line, date), line.capacity);
            }
        }
    }
    assert!(accountant.is_holiday(board.line("B").unwrap(), d(1, 2)));
    assert!(!accountant.is_holiday(board.line("A").unwrap(), d(1, 2)));
    println!("✓ 通过");
}
