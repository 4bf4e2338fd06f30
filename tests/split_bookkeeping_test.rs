// ==========================================
// SplitBookkeeper 拆单/合单集成测试
// ==========================================
// 测试目标: 拆单编号、家族数量守恒、合单规则、数量修改
// ==========================================

mod test_helpers;

use garment_aps::domain::{OrderStatus, SplitFamily, SplitInfo};
use garment_aps::engine::{PlaceOptions, ScheduleError, SchedulingEngine, SplitBookkeeper};
use test_helpers::*;

#[test]
fn test_split_300_by_120() {
    println!("\n=== 测试：300 件拆出 120 件 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 300));
    let bookkeeper = SplitBookkeeper::new();

    let outcome = bookkeeper.split(&mut board, "O1", 120).unwrap();

    let original = board.order("O1").unwrap();
    let fragment = board.order(&outcome.fragment_id).unwrap();
    assert_eq!(original.order_quantity, 180);
    assert_eq!(fragment.order_quantity, 120);
    assert_eq!(fragment.split_number(), Some(1));
    assert_eq!(fragment.family_key(), "PO-1");
    assert_eq!(fragment.po_number, "PO-1-1");
    assert_eq!(fragment.status(), OrderStatus::Pending);

    let view = bookkeeper.family(&board, "PO-1");
    assert_eq!(view.original_total, 300);
    assert_eq!(view.current_total, 300);
    assert!(view.is_balanced());
    assert_eq!(
        board.family_record("PO-1"),
        Some(&SplitFamily {
            base_po_number: "PO-1".to_string(),
            original_total: 300,
        })
    );
    assert_eq!(outcome.change.upserted_families.len(), 1);
    println!("✓ 180 + 120 = 300");
}

#[test]
fn test_second_split_gets_next_number() {
    println!("\n=== 测试：再次拆分序号递增 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 300));
    let bookkeeper = SplitBookkeeper::new();

    bookkeeper.split(&mut board, "O1", 120).unwrap();
    let second = bookkeeper.split(&mut board, "O1", 30).unwrap();

    let fragment = board.order(&second.fragment_id).unwrap();
    assert_eq!(fragment.split_number(), Some(2));
    assert_eq!(board.order("O1").unwrap().order_quantity, 150);
    assert_eq!(board.family_members("PO-1").len(), 3);
    assert!(bookkeeper.verify_all(&board).is_empty());
    println!("✓ split_number = 2");
}

#[test]
fn test_invalid_split_quantities_are_rejected() {
    println!("\n=== 测试：无效拆分数量 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 200));
    let engine = SchedulingEngine::new();
    let bookkeeper = SplitBookkeeper::new();
    engine
        .place(&mut board, "O1", "A", d(1, 1), &PlaceOptions::default())
        .unwrap();
    engine.record_actual(&mut board, "O1", d(1, 1), 150).unwrap();

    // 0 / 等于总量 / 超过总量 / 超过未生产数量
    for qty in [0, 200, 250, 60] {
        let err = bookkeeper.split(&mut board, "O1", qty).unwrap_err();
        match err {
            ScheduleError::InvalidSplitQuantity { remaining, .. } => assert_eq!(remaining, 50),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    let order = board.order("O1").unwrap();
    assert_eq!(order.order_quantity, 200);
    assert_eq!(order.status(), OrderStatus::InProgress);
    assert!(board.family_record("PO-1").is_none());
    println!("✓ 订单保持不变");
}

#[test]
fn test_split_of_scheduled_order_returns_it_to_pool() {
    println!("\n=== 测试：已排产订单拆分后需重新落位 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 250));
    let engine = SchedulingEngine::new();
    engine
        .place(&mut board, "O1", "A", d(1, 1), &PlaceOptions::default())
        .unwrap();

    let outcome = SplitBookkeeper::new().split(&mut board, "O1", 50).unwrap();

    let original = board.order("O1").unwrap();
    assert_eq!(original.status(), OrderStatus::Pending);
    assert!(board.ledger().entries_for("O1").is_empty());
    assert_eq!(outcome.change.plan_for("O1").map(|p| p.len()), Some(0));

    engine
        .place(&mut board, "O1", "A", d(1, 1), &PlaceOptions::default())
        .unwrap();
    assert_eq!(board.order("O1").unwrap().plan_end(), Some(d(1, 2)));
    println!("✓ 重新落位结束于 01-02");
}

#[test]
fn test_merge_fragment_back() {
    println!("\n=== 测试：合单 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 300));
    let bookkeeper = SplitBookkeeper::new();
    let outcome = bookkeeper.split(&mut board, "O1", 120).unwrap();

    let change = bookkeeper
        .merge(&mut board, &outcome.fragment_id, "O1")
        .unwrap();

    assert_eq!(board.order("O1").unwrap().order_quantity, 300);
    assert!(board.order(&outcome.fragment_id).is_err());
    assert_eq!(change.deleted_orders, vec![outcome.fragment_id.clone()]);
    assert!(bookkeeper.verify_family(&board, "PO-1").is_ok());
    println!("✓ 子单已删除");
}

#[test]
fn test_merge_rejections() {
    println!("\n=== 测试：合单拒绝场景 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 300));
    board.insert_order(pending_order("O2", "PO-2", 100));
    let engine = SchedulingEngine::new();
    let bookkeeper = SplitBookkeeper::new();
    let fragment_id = bookkeeper.split(&mut board, "O1", 100).unwrap().fragment_id;

    // 非子单
    let err = bookkeeper.merge(&mut board, "O1", &fragment_id).unwrap_err();
    assert!(matches!(err, ScheduleError::MergeRejected { .. }));

    // 跨家族
    let err = bookkeeper.merge(&mut board, &fragment_id, "O2").unwrap_err();
    assert!(matches!(err, ScheduleError::MergeRejected { .. }));

    // 与自身
    let err = bookkeeper.merge(&mut board, &fragment_id, &fragment_id).unwrap_err();
    assert!(matches!(err, ScheduleError::MergeRejected { .. }));

    // 子单已排产
    engine
        .place(&mut board, &fragment_id, "A", d(1, 1), &PlaceOptions::default())
        .unwrap();
    let err = bookkeeper.merge(&mut board, &fragment_id, "O1").unwrap_err();
    assert!(matches!(err, ScheduleError::MergeRejected { .. }));

    assert_eq!(board.order("O1").unwrap().order_quantity, 200);
    assert!(bookkeeper.verify_all(&board).is_empty());
    println!("✓ 全部拒绝, 家族守恒");
}

#[test]
fn test_update_quantity_moves_family_total() {
    println!("\n=== 测试：修改数量同步家族总量 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 300));
    let bookkeeper = SplitBookkeeper::new();
    let fragment_id = bookkeeper.split(&mut board, "O1", 100).unwrap().fragment_id;

    bookkeeper.update_quantity(&mut board, &fragment_id, 140).unwrap();

    let view = bookkeeper.family(&board, "PO-1");
    assert_eq!(view.original_total, 340);
    assert_eq!(view.current_total, 340);
    assert!(bookkeeper.verify_all(&board).is_empty());

    let err = bookkeeper.update_quantity(&mut board, "O1", 0).unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidQuantity { .. }));
    println!("✓ 家族总量 340");
}

#[test]
fn test_update_quantity_below_produced_is_rejected() {
    println!("\n=== 测试：数量不得低于实际产量 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 200));
    let engine = SchedulingEngine::new();
    engine
        .place(&mut board, "O1", "A", d(1, 1), &PlaceOptions::default())
        .unwrap();
    engine.record_actual(&mut board, "O1", d(1, 1), 80).unwrap();

    let err = SplitBookkeeper::new()
        .update_quantity(&mut board, "O1", 50)
        .unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidQuantity { quantity: 50, .. }));
    assert_eq!(board.order("O1").unwrap().order_quantity, 200);
    println!("✓ 拒绝 50 < 80");
}

#[test]
fn test_verify_all_reports_broken_family() {
    println!("\n=== 测试：家族不守恒被检出 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 300));
    let bookkeeper = SplitBookkeeper::new();
    bookkeeper.split(&mut board, "O1", 100).unwrap();

    // 绕过引擎直接篡改数量
    let mut tampered = board.order("O1").unwrap().clone();
    tampered.order_quantity = 150;
    board.insert_order(tampered);

    let errors = bookkeeper.verify_all(&board);
    assert_eq!(errors.len(), 1);
    assert!(errors[0].is_defect());
    assert!(matches!(
        &errors[0],
        ScheduleError::InvariantViolation { expected: 300, actual: 250, .. }
    ));
    println!("✓ {}", errors[0]);
}

#[test]
fn test_quantity_overflow_is_rejected() {
    println!("\n=== 测试：数量溢出被拒绝 ===");

    // 修改数量使家族总量超过 u32 上限
    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 300));
    let bookkeeper = SplitBookkeeper::new();
    let fragment_id = bookkeeper.split(&mut board, "O1", 100).unwrap().fragment_id;

    let err = bookkeeper
        .update_quantity(&mut board, &fragment_id, u32::MAX - 10)
        .unwrap_err();
    assert!(matches!(err, ScheduleError::InvalidQuantity { .. }));
    assert_eq!(board.order(&fragment_id).unwrap().order_quantity, 100);
    assert_eq!(bookkeeper.family(&board, "PO-1").original_total, 300);

    // 合单后数量超过 u32 上限
    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", u32::MAX - 5));
    let mut fragment = pending_order("O1-1", "PO-1-1", 10);
    fragment.split = Some(SplitInfo {
        base_po_number: "PO-1".to_string(),
        split_number: 1,
    });
    board.insert_order(fragment);

    let err = bookkeeper.merge(&mut board, "O1-1", "O1").unwrap_err();
    assert!(matches!(err, ScheduleError::MergeRejected { .. }));
    assert!(board.order("O1-1").is_ok());
    assert_eq!(board.order("O1").unwrap().order_quantity, u32::MAX - 5);
    println!("✓ 溢出被拒绝, 看板不变");
}

#[test]
fn test_new_order_with_family_po_is_rejected() {
    println!("\n=== 测试：新订单 PO 号与拆单家族冲突 ===");

    let mut board = board_with(&[("A", 100)], vec![], &[]);
    board.insert_order(pending_order("O1", "PO-1", 300));
    let bookkeeper = SplitBookkeeper::new();
    let fragment_id = bookkeeper.split(&mut board, "O1", 120).unwrap().fragment_id;

    // 与家族键重复
    let err = bookkeeper
        .check_new_order(&board, &pending_order("N1", "PO-1", 50))
        .unwrap_err();
    assert!(matches!(
        &err,
        ScheduleError::DuplicatePoNumber { existing_order_id, .. } if existing_order_id == "O1"
    ));

    // 与子单 PO 号重复
    let err = bookkeeper
        .check_new_order(&board, &pending_order("N2", "PO-1-1", 50))
        .unwrap_err();
    assert!(matches!(
        &err,
        ScheduleError::DuplicatePoNumber { existing_order_id, .. } if *existing_order_id == fragment_id
    ));

    // 未拆分订单的 PO 号同样不可重复
    board.insert_order(pending_order("O2", "PO-2", 80));
    let err = bookkeeper
        .check_new_order(&board, &pending_order("N3", "PO-2", 10))
        .unwrap_err();
    assert!(matches!(err, ScheduleError::DuplicatePoNumber { .. }));

    assert!(bookkeeper
        .check_new_order(&board, &pending_order("N4", "PO-3", 10))
        .is_ok());
    assert!(bookkeeper.verify_all(&board).is_empty());
    println!("✓ 冲突被拒绝, 家族守恒");
}
