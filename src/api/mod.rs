// ==========================================
// 仓储计件库存系统 - API 层
// ==========================================
// 职责: 提供业务 API 接口（计件、入库规则、库存浏览、装配）
// 约定: 每个写操作对应一个 IMMEDIATE 事务，成功提交、失败回滚
// ==========================================

pub mod assembly_api;
pub mod error;
pub mod inventory_api;
pub mod production_api;
pub mod rule_api;

// 重导出核心类型
pub use assembly_api::AssemblyApi;
pub use error::{ApiError, ApiResult};
pub use inventory_api::{BlankReceipt, InventoryApi};
pub use production_api::{ProductionApi, ProductionCreateResult};
pub use rule_api::{ReapplyReport, RuleApi};

use crate::db::begin_write;
use rusqlite::{Connection, Transaction};
use std::sync::{Arc, Mutex};

/// 在写事务内执行操作
///
/// 闭包返回 Err 时事务随 Transaction drop 回滚
pub(crate) fn with_write_tx<T, F>(conn: &Arc<Mutex<Connection>>, f: F) -> ApiResult<T>
where
    F: FnOnce(&Transaction) -> ApiResult<T>,
{
    let mut guard = conn
        .lock()
        .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))?;
    let tx = begin_write(&mut guard)
        .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;

    let value = f(&tx)?;

    tx.commit()
        .map_err(|e| ApiError::DatabaseTransactionError(e.to_string()))?;
    Ok(value)
}

/// 必填文本校验
pub(crate) fn require_text(value: &str, field: &str) -> ApiResult<()> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidInput(format!("{}不能为空", field)));
    }
    Ok(())
}
