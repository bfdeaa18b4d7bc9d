// ==========================================
// 仓储计件库存系统 - 引擎层错误类型
// ==========================================
// 职责: 业务失败（库存不足、规则缺失等）与存储失败分开表达
// ==========================================

use crate::repository::error::RepositoryError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),

    // ===== 入库规则 =====
    #[error("入库规则不存在: rule_id={0}")]
    RuleNotFound(i64),

    // ===== 装配 =====
    #[error("缺少装配规则ID")]
    AssemblyRuleMissingId,

    #[error("装配规则不存在: rule_id={0}")]
    AssemblyRuleNotFound(i64),

    #[error("装配规则已禁用: rule_id={0}")]
    AssemblyRuleDisabled(i64),

    #[error("零件 {component} 无匹配库存")]
    ComponentStockMissing { component: String },

    #[error("零件 {component} 库存不足: 需要 {required}, 现有 {available}")]
    InsufficientComponentStock {
        component: String,
        required: i64,
        available: i64,
    },

    // ===== 通用 =====
    #[error("无效输入: {0}")]
    InvalidInput(String),
}

impl EngineError {
    /// 库存不足时的缺口数量
    pub fn shortfall(&self) -> Option<i64> {
        match self {
            EngineError::InsufficientComponentStock {
                required,
                available,
                ..
            } => Some(required - available),
            _ => None,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
