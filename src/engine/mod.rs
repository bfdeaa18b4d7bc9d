// ==========================================
// 仓储计件库存系统 - 引擎层
// ==========================================
// 职责: 实现库存业务规则（规则匹配、库存变动、回滚重算、装配）
// 红线: Engine 不拼 SQL，数据访问统一走 Repository
// 红线: 写操作只在调用方打开的事务内执行
// ==========================================

pub mod assembly;
pub mod error;
pub mod rollback;
pub mod rule_matcher;
pub mod stock_movement;

// 重导出核心引擎
pub use assembly::{AssemblyEngine, MatchCriteria};
pub use error::{EngineError, EngineResult};
pub use rollback::{RollbackEngine, RollbackReport, RuleRecalcReport};
pub use rule_matcher::{pattern_matches, RuleMatcher};
pub use stock_movement::{resolve_storage_ratio, StockMovementEngine};
