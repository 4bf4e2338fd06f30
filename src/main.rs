// ==========================================
// 成衣排产系统 - 命令行入口
// ==========================================
// 打开默认数据库 (不存在则建表), 输出排产概况
// ==========================================

use anyhow::Context;
use garment_aps::app::{get_default_db_path, AppState};
use garment_aps::OrderStatus;

fn main() -> anyhow::Result<()> {
    // 初始化日志系统
    garment_aps::logging::init();

    tracing::info!("==================================================");
    tracing::info!("{}", garment_aps::APP_NAME);
    tracing::info!("系统版本: {}", garment_aps::VERSION);
    tracing::info!("==================================================");

    let db_path = get_default_db_path();
    tracing::info!("使用数据库: {}", db_path);

    let state = AppState::new(db_path).map_err(anyhow::Error::msg)?;

    let snapshot = state
        .config_manager
        .get_config_snapshot()
        .context("读取配置快照失败")?;
    tracing::info!(config = %snapshot, "当前配置");

    let lines = state.line_repo.list_lines().context("读取产线失败")?;
    tracing::info!(count = lines.len(), "产线");

    for status in [
        OrderStatus::Pending,
        OrderStatus::Scheduled,
        OrderStatus::InProgress,
        OrderStatus::Completed,
    ] {
        let orders = state
            .report_api
            .orders_by_status(status)
            .with_context(|| format!("读取{}订单失败", status))?;
        tracing::info!(status = %status, count = orders.len(), "订单");
    }

    let conflicts = state.report_api.holiday_conflicts().context("读取假期冲突失败")?;
    if !conflicts.is_empty() {
        tracing::warn!(count = conflicts.len(), "存在假期日仍有计划量的单元格");
    }

    for log in state.report_api.recent_actions(5).context("读取操作日志失败")? {
        tracing::info!(
            action = %log.action_type,
            actor = %log.actor,
            order_id = log.order_id.as_deref().unwrap_or("-"),
            at = %log.action_ts,
            "最近操作"
        );
    }

    let broken = state.schedule_api.verify_families().context("校验拆单家族失败")?;
    for err in &broken {
        tracing::error!(error = %err, "拆单家族数量不守恒");
    }

    Ok(())
}
