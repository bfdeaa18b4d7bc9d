// ==========================================
// 仓储计件库存系统 - 应用状态
// ==========================================
// 职责: 管理应用级别的共享连接、配置快照和API实例
// ==========================================

use std::sync::{Arc, Mutex};

use crate::api::{AssemblyApi, InventoryApi, ProductionApi, RuleApi};
use crate::config::{ConfigManager, EngineConfig};
use crate::db::{ensure_schema, open_sqlite_connection};
use crate::repository::{
    AssemblyRepository, InventoryRepository, LedgerRepository, ProductionRecordRepository,
    RoutingRuleRepository,
};

/// 应用状态
///
/// 所有 API 共享同一个 `Arc<Mutex<Connection>>`，写操作因此在进程内串行
pub struct AppState {
    /// 数据库路径
    pub db_path: String,

    /// 启动时加载的引擎参数
    pub engine_config: EngineConfig,

    /// 配置管理器
    pub config_manager: Arc<ConfigManager>,

    /// 计件记录API
    pub production_api: Arc<ProductionApi>,

    /// 入库规则API
    pub rule_api: Arc<RuleApi>,

    /// 库存API
    pub inventory_api: Arc<InventoryApi>,

    /// 装配API
    pub assembly_api: Arc<AssemblyApi>,
}

impl AppState {
    /// 创建新的AppState实例
    ///
    /// 1. 打开数据库并建表
    /// 2. 读取配置快照
    /// 3. 初始化 Repository 与 API
    ///
    /// 配置变更需重新创建 AppState 才会生效
    pub fn new(db_path: String) -> Result<Self, String> {
        tracing::info!("初始化AppState，数据库路径: {}", db_path);

        let conn = open_sqlite_connection(&db_path)
            .map_err(|e| format!("无法打开数据库: {}", e))?;
        ensure_schema(&conn).map_err(|e| format!("建表失败: {}", e))?;
        let conn = Arc::new(Mutex::new(conn));

        // ==========================================
        // 配置
        // ==========================================
        let config_manager = ConfigManager::from_connection(conn.clone())
            .map_err(|e| format!("无法初始化配置管理器: {}", e))?;
        let engine_config = config_manager
            .load_engine_config()
            .map_err(|e| format!("无法加载引擎配置: {}", e))?;
        tracing::debug!(?engine_config, "引擎配置已加载");

        // ==========================================
        // Repository层
        // ==========================================
        let inventory_repo = Arc::new(InventoryRepository::new(conn.clone()));
        let ledger_repo = Arc::new(LedgerRepository::new(conn.clone()));
        let rule_repo = Arc::new(RoutingRuleRepository::new(conn.clone()));
        let production_repo = Arc::new(ProductionRecordRepository::new(conn.clone()));
        let assembly_repo = Arc::new(AssemblyRepository::new(conn.clone()));

        // ==========================================
        // API层
        // ==========================================
        let production_api = Arc::new(ProductionApi::new(
            conn.clone(),
            production_repo,
            ledger_repo.clone(),
            engine_config.clone(),
        ));
        let rule_api = Arc::new(RuleApi::new(
            conn.clone(),
            rule_repo,
            ledger_repo.clone(),
            engine_config.clone(),
        ));
        let inventory_api = Arc::new(InventoryApi::new(
            conn.clone(),
            inventory_repo,
            ledger_repo,
            engine_config.clone(),
        ));
        let assembly_api = Arc::new(AssemblyApi::new(conn, assembly_repo, engine_config.clone()));

        tracing::info!("AppState初始化完成");

        Ok(Self {
            db_path,
            engine_config,
            config_manager: Arc::new(config_manager),
            production_api,
            rule_api,
            inventory_api,
            assembly_api,
        })
    }
}

/// 默认数据库路径
///
/// 优先使用环境变量 WMS_LEDGER_DB_PATH，否则放在用户数据目录下
pub fn get_default_db_path() -> String {
    use std::path::PathBuf;

    if let Ok(path) = std::env::var("WMS_LEDGER_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./wms_ledger.db");

    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("wms-ledger");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("wms_ledger.db");
        }
    }

    path.to_string_lossy().to_string()
}
