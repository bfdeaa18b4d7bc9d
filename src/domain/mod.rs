// ==========================================
// 仓储计件库存系统 - 领域模型层
// ==========================================
// 职责: 定义库存池、账本、入库规则、计件记录、装配实体
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod assembly;
pub mod inventory;
pub mod ledger;
pub mod production;
pub mod rule;
pub mod types;

// 重导出核心类型
pub use assembly::{
    AssemblyCheckRequest, AssemblyCheckResult, AssemblyDefect, AssemblyRecord, AssemblyRule,
    AssemblyRuleItem, NewAssemblyDefect, NewAssemblyRecord, NewAssemblyRule, NewAssemblyRuleItem,
    PartStatus,
};
pub use inventory::{
    BlankInventory, FinishedProduct, InventoryAdjustResult, InventoryItem, InventoryStats,
    NewInventoryItem, PoolKey,
};
pub use ledger::{LedgerEntry, NewLedgerEntry};
pub use production::{NewProductionRecord, ProductionRecord, ProductionRecordPatch};
pub use rule::{RatioError, RoutingRule, RoutingRuleDraft, StorageRatio};
pub use types::{AssemblyStatus, OperatorRole, PoolKind};
