// ==========================================
// 仓储计件库存系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 计件登记驱动的库存账本（零件/毛坯/成品三个库存池）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 入库、冲销、装配
pub mod engine;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA/建表）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// 应用层 - 组装
pub mod app;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{AssemblyStatus, OperatorRole, PoolKind};

// 领域实体
pub use domain::{
    AssemblyRecord, AssemblyRule, BlankInventory, FinishedProduct, InventoryItem, LedgerEntry,
    NewAssemblyRecord, NewAssemblyRule, NewProductionRecord, PoolKey, ProductionRecord,
    RoutingRule, RoutingRuleDraft, StorageRatio,
};

// 引擎
pub use engine::{AssemblyEngine, RollbackEngine, RuleMatcher, StockMovementEngine};

// API
pub use api::{ApiError, ApiResult, AssemblyApi, InventoryApi, ProductionApi, RuleApi};

// 应用
pub use app::AppState;

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "仓储计件库存账本";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
        assert!(!APP_NAME.is_empty());
    }
}
