// ==========================================
// 成衣排产系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接、仓储与API实例
// ==========================================

use crate::api::{ReportApi, ScheduleApi};
use crate::config::ConfigManager;
use crate::db::{init_schema, open_sqlite_connection};
use crate::repository::{
    ActionLogRepository, ChangeSetRepository, HolidayRepository, LineRepository,
    OrderRepository, PlannedProductionRepository, PurchaseRepository, RampUpRepository,
};
use rusqlite::Connection;
use std::sync::{Arc, Mutex};

/// 应用状态
///
/// 所有仓储共享同一个连接
pub struct AppState {
    /// 数据库路径
    pub db_path: String,
    /// 排产API (唯一写入入口)
    pub schedule_api: Arc<ScheduleApi>,
    /// 报表API
    pub report_api: Arc<ReportApi>,
    /// 主数据仓储
    pub line_repo: Arc<LineRepository>,
    pub holiday_repo: Arc<HolidayRepository>,
    pub ramp_up_repo: Arc<RampUpRepository>,
    pub purchase_repo: Arc<PurchaseRepository>,
    pub order_repo: Arc<OrderRepository>,
    /// 操作日志仓储（用于审计追踪）
    pub action_log_repo: Arc<ActionLogRepository>,
    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// # 说明
    /// 该方法会：
    /// 1. 打开数据库并应用统一 PRAGMA
    /// 2. 幂等建表
    /// 3. 初始化所有Repository与API
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path).map_err(|e| format!("无法打开数据库: {}", e))?;
        init_schema(&conn).map_err(|e| format!("数据库建表失败: {}", e))?;

        let mut state = Self::from_connection(Arc::new(Mutex::new(conn)))?;
        state.db_path = db_path;
        Ok(state)
    }

    /// 基于已初始化的共享连接装配
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, String> {
        // ==========================================
        // Repository层
        // ==========================================
        let line_repo = Arc::new(LineRepository::new(conn.clone()));
        let holiday_repo = Arc::new(HolidayRepository::new(conn.clone()));
        let ramp_up_repo = Arc::new(RampUpRepository::new(conn.clone()));
        let order_repo = Arc::new(OrderRepository::new(conn.clone()));
        let plan_repo = Arc::new(PlannedProductionRepository::new(conn.clone()));
        let purchase_repo = Arc::new(PurchaseRepository::new(conn.clone()));
        let change_set_repo = Arc::new(ChangeSetRepository::new(conn.clone()));
        let action_log_repo = Arc::new(ActionLogRepository::new(conn.clone()));

        let config_manager = Arc::new(
            ConfigManager::from_connection(conn)
                .map_err(|e| format!("无法创建ConfigManager: {}", e))?,
        );

        // ==========================================
        // API层
        // ==========================================
        let schedule_api = Arc::new(ScheduleApi::new(
            line_repo.clone(),
            holiday_repo.clone(),
            ramp_up_repo.clone(),
            order_repo.clone(),
            plan_repo,
            purchase_repo.clone(),
            change_set_repo,
            config_manager.clone(),
        ));
        let report_api = Arc::new(ReportApi::new(
            schedule_api.clone(),
            order_repo.clone(),
            action_log_repo.clone(),
        ));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path: String::new(),
            schedule_api,
            report_api,
            line_repo,
            holiday_repo,
            ramp_up_repo,
            purchase_repo,
            order_repo,
            action_log_repo,
            config_manager,
        })
    }
}

/// 获取默认数据库路径
///
/// 优先级: 环境变量 GARMENT_APS_DB_PATH > 用户数据目录 > 当前目录
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    // 允许通过环境变量显式指定 DB 路径（便于调试/测试/CI）
    if let Ok(path) = std::env::var("GARMENT_APS_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./garment_aps.db");

    if let Some(data_dir) = dirs::data_dir() {
        // 开发环境使用独立目录，避免污染生产数据
        #[cfg(debug_assertions)]
        {
            path = data_dir.join("garment-aps-dev");
        }

        #[cfg(not(debug_assertions))]
        {
            path = data_dir.join("garment-aps");
        }

        // 确保目录存在; 失败时退回当前目录
        if std::fs::create_dir_all(&path).is_ok() {
            path = path.join("garment_aps.db");
        } else {
            path = PathBuf::from("./garment_aps.db");
        }
    }

    path.to_string_lossy().to_string()
}
