// ==========================================
// 仓储计件库存系统 - API层错误类型
// ==========================================
// 职责: 定义API层错误类型，把仓储/引擎错误转换为面向调用方的错误消息
// ==========================================

use crate::engine::error::EngineError;
use crate::repository::error::RepositoryError;
use thiserror::Error;

/// API层错误类型
#[derive(Error, Debug)]
pub enum ApiError {
    // ==========================================
    // 业务规则错误
    // ==========================================
    #[error("无效输入: {0}")]
    InvalidInput(String),

    #[error("资源未找到: {0}")]
    NotFound(String),

    #[error("业务规则违反: {0}")]
    BusinessRuleViolation(String),

    // ==========================================
    // 库存错误
    // ==========================================
    #[error("零件库存不存在: {0}")]
    ComponentStockMissing(String),

    #[error("零件库存不足: {component} (需要: {required}, 库存: {available})")]
    InsufficientStock {
        component: String,
        required: i64,
        available: i64,
    },

    // ==========================================
    // 数据访问错误
    // ==========================================
    #[error("数据库错误: {0}")]
    DatabaseError(String),

    #[error("数据库连接失败: {0}")]
    DatabaseConnectionError(String),

    #[error("数据库事务失败: {0}")]
    DatabaseTransactionError(String),

    // ==========================================
    // 通用错误
    // ==========================================
    #[error("内部错误: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

// ==========================================
// 从 RepositoryError 转换
// ==========================================
impl From<RepositoryError> for ApiError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound { entity, id } => {
                ApiError::NotFound(format!("{}(id={})不存在", entity, id))
            }
            RepositoryError::DatabaseConnectionError(msg) => ApiError::DatabaseConnectionError(msg),
            RepositoryError::DatabaseTransactionError(msg) => {
                ApiError::DatabaseTransactionError(msg)
            }
            RepositoryError::LockError(msg) => {
                ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", msg))
            }
            RepositoryError::DatabaseQueryError(msg) => ApiError::DatabaseError(msg),
            RepositoryError::ForeignKeyViolation(msg) => {
                ApiError::BusinessRuleViolation(format!("外键约束违反: {}", msg))
            }
            RepositoryError::InternalError(msg) => ApiError::InternalError(msg),
            RepositoryError::Other(err) => ApiError::Other(err),
        }
    }
}

// ==========================================
// 从 EngineError 转换
// ==========================================
impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::Repository(e) => e.into(),
            EngineError::RuleNotFound(id) => ApiError::NotFound(format!("入库规则(id={})不存在", id)),
            EngineError::AssemblyRuleMissingId => {
                ApiError::InvalidInput("组装规则ID不能为空".to_string())
            }
            EngineError::AssemblyRuleNotFound(id) => {
                ApiError::NotFound(format!("组装规则(id={})不存在", id))
            }
            EngineError::AssemblyRuleDisabled(id) => {
                ApiError::BusinessRuleViolation(format!("组装规则(id={})已禁用", id))
            }
            EngineError::ComponentStockMissing { component } => {
                ApiError::ComponentStockMissing(component)
            }
            EngineError::InsufficientComponentStock {
                component,
                required,
                available,
            } => ApiError::InsufficientStock {
                component,
                required,
                available,
            },
            EngineError::InvalidInput(msg) => ApiError::InvalidInput(msg),
        }
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        RepositoryError::from(err).into()
    }
}

/// Result 类型别名
pub type ApiResult<T> = Result<T, ApiError>;
