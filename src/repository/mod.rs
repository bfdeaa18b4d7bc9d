// ==========================================
// 仓储计件库存系统 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// 约定: 带 `_tx` 后缀的关联函数在调用方事务内执行
// ==========================================

pub mod assembly_repo;
pub mod error;
pub mod inventory_repo;
pub mod ledger_repo;
pub mod production_repo;
pub mod rule_repo;

// 重导出核心仓储
pub use assembly_repo::AssemblyRepository;
pub use error::{RepositoryError, RepositoryResult};
pub use inventory_repo::InventoryRepository;
pub use ledger_repo::{LedgerRepository, HISTORY_LIMIT};
pub use production_repo::ProductionRecordRepository;
pub use rule_repo::RoutingRuleRepository;
