// ==========================================
// 仓储计件库存系统 - 装配 API
// ==========================================
// 职责: 装配规则维护、装配预检、执行装配、装配记录查询
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::{require_text, with_write_tx};
use crate::config::EngineConfig;
use crate::db::now;
use crate::domain::assembly::{
    AssemblyCheckRequest, AssemblyCheckResult, AssemblyDefect, AssemblyRecord, AssemblyRule,
    NewAssemblyRecord, NewAssemblyRule,
};
use crate::engine::AssemblyEngine;
use crate::repository::{AssemblyRepository, RepositoryError};

// ==========================================
// AssemblyApi - 装配 API
// ==========================================
pub struct AssemblyApi {
    conn: Arc<Mutex<Connection>>,
    assembly_repo: Arc<AssemblyRepository>,
    engine: AssemblyEngine,
}

impl AssemblyApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        assembly_repo: Arc<AssemblyRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            conn,
            assembly_repo,
            engine: AssemblyEngine::new(config),
        }
    }

    /// 新建装配规则（明细顺序即装配扣减顺序）
    pub fn create_rule(&self, rule: NewAssemblyRule) -> ApiResult<AssemblyRule> {
        require_text(&rule.rule_name, "规则名称")?;
        require_text(&rule.product_name, "成品名称")?;
        if rule.items.is_empty() {
            return Err(ApiError::InvalidInput("装配规则至少需要一个零件".to_string()));
        }
        for item in &rule.items {
            require_text(&item.component_name, "零件名称")?;
            if item.quantity <= 0 {
                return Err(ApiError::InvalidInput(format!(
                    "零件 {} 的单件用量必须大于0",
                    item.component_name
                )));
            }
        }

        let ts = now();
        with_write_tx(&self.conn, |tx| {
            let id = AssemblyRepository::insert_rule_tx(tx, &rule, ts)?;
            let saved = AssemblyRepository::find_rule(tx, id)?
                .ok_or_else(|| RepositoryError::not_found("assembly_rule", id))?;
            info!(rule_id = id, product_name = %saved.product_name, items = saved.items.len(), "装配规则已创建");
            Ok(saved)
        })
    }

    pub fn get_rule(&self, id: i64) -> ApiResult<Option<AssemblyRule>> {
        Ok(self.assembly_repo.get_rule(id)?)
    }

    pub fn list_rules(&self) -> ApiResult<Vec<AssemblyRule>> {
        Ok(self.assembly_repo.list_rules()?)
    }

    /// 装配预检
    pub fn check(&self, request: &AssemblyCheckRequest) -> ApiResult<AssemblyCheckResult> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))?;
        Ok(self.engine.check_assembly(&conn, request)?)
    }

    /// 执行装配（整单成功或整单不变）
    pub fn execute(&self, request: NewAssemblyRecord) -> ApiResult<AssemblyRecord> {
        let ts = now();
        with_write_tx(&self.conn, |tx| {
            Ok(self.engine.execute_assembly(tx, &request, ts)?)
        })
    }

    /// 装配记录（最新在前）
    pub fn list_records(&self) -> ApiResult<Vec<AssemblyRecord>> {
        Ok(self.assembly_repo.list_records()?)
    }

    pub fn get_record(&self, id: i64) -> ApiResult<Option<AssemblyRecord>> {
        Ok(self.assembly_repo.get_record(id)?)
    }

    pub fn list_defects(&self, assembly_record_id: i64) -> ApiResult<Vec<AssemblyDefect>> {
        Ok(self.assembly_repo.list_defects(assembly_record_id)?)
    }
}
