// ==========================================
// 仓储计件库存系统 - 计件记录 API
// ==========================================
// 职责: 计件记录新建（含自动入库）、修改、删除（含库存回滚）、查询
// 门控: 管理员录入 / 非半成品记录只保存，不触发库存变动
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::Serialize;
use tracing::{info, instrument};

use crate::api::error::{ApiError, ApiResult};
use crate::api::{require_text, with_write_tx};
use crate::config::EngineConfig;
use crate::db::now;
use crate::domain::ledger::LedgerEntry;
use crate::domain::production::{NewProductionRecord, ProductionRecord, ProductionRecordPatch};
use crate::domain::types::OperatorRole;
use crate::engine::{RollbackEngine, RollbackReport, RuleMatcher, StockMovementEngine};
use crate::repository::{LedgerRepository, ProductionRecordRepository, RoutingRuleRepository};

/// 新建计件记录的结果
#[derive(Debug, Clone, Serialize)]
pub struct ProductionCreateResult {
    pub record: ProductionRecord,
    pub rule_id: Option<i64>, // 命中的入库规则（未触发入库为 None）
    pub ledger_entries: Vec<LedgerEntry>,
}

// ==========================================
// ProductionApi - 计件记录 API
// ==========================================
pub struct ProductionApi {
    conn: Arc<Mutex<Connection>>,
    production_repo: Arc<ProductionRecordRepository>,
    ledger_repo: Arc<LedgerRepository>,
    movement_engine: StockMovementEngine,
    rollback_engine: RollbackEngine,
    config: EngineConfig,
}

impl ProductionApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        production_repo: Arc<ProductionRecordRepository>,
        ledger_repo: Arc<LedgerRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            conn,
            production_repo,
            ledger_repo,
            movement_engine: StockMovementEngine::new(config.clone()),
            rollback_engine: RollbackEngine::new(config.clone()),
            config,
        }
    }

    fn validate_new(record: &NewProductionRecord) -> ApiResult<()> {
        require_text(&record.worker_name, "工人姓名")?;
        require_text(&record.product_name, "产品名称")?;
        if record.quantity < 0 {
            return Err(ApiError::InvalidInput("数量不能为负数".to_string()));
        }
        if record.defect_quantity.unwrap_or(0) < 0 {
            return Err(ApiError::InvalidInput("废品数量不能为负数".to_string()));
        }
        Ok(())
    }

    /// 新建计件记录
    ///
    /// 非管理员且为半成品时，在同一事务内匹配入库规则并执行库存变动
    #[instrument(skip(self, record), fields(product_name = %record.product_name))]
    pub fn create(
        &self,
        record: NewProductionRecord,
        role: &str,
    ) -> ApiResult<ProductionCreateResult> {
        Self::validate_new(&record)?;

        let role = OperatorRole::parse(role, &self.config.admin_role);
        let ts = now();

        with_write_tx(&self.conn, |tx| {
            let saved = ProductionRecordRepository::insert_tx(tx, &record, ts)?;

            if role == OperatorRole::Admin {
                info!(record_id = saved.id, "管理员录入，不触发自动入库");
                return Ok(ProductionCreateResult {
                    record: saved,
                    rule_id: None,
                    ledger_entries: Vec::new(),
                });
            }
            if !saved.is_semi_finished(&self.config.semi_finished_flag) {
                info!(record_id = saved.id, "非半成品，不触发自动入库");
                return Ok(ProductionCreateResult {
                    record: saved,
                    rule_id: None,
                    ledger_entries: Vec::new(),
                });
            }

            let rules = RoutingRuleRepository::load_all(tx)?;
            let Some(rule) = RuleMatcher::find_matching_rule(&rules, &saved.product_name) else {
                info!(
                    record_id = saved.id,
                    product_name = %saved.product_name,
                    "未找到匹配的入库规则，跳过自动入库"
                );
                return Ok(ProductionCreateResult {
                    record: saved,
                    rule_id: None,
                    ledger_entries: Vec::new(),
                });
            };

            let entries = self.movement_engine.apply_movement(tx, &saved, rule, ts)?;
            Ok(ProductionCreateResult {
                rule_id: Some(rule.id),
                record: saved,
                ledger_entries: entries,
            })
        })
    }

    /// 修改计件记录（只改描述字段与金额，不动库存）
    pub fn update(&self, id: i64, patch: ProductionRecordPatch) -> ApiResult<ProductionRecord> {
        if let Some(name) = &patch.product_name {
            require_text(name, "产品名称")?;
        }
        if let Some(name) = &patch.worker_name {
            require_text(name, "工人姓名")?;
        }
        if patch.quantity.map_or(false, |q| q < 0) {
            return Err(ApiError::InvalidInput("数量不能为负数".to_string()));
        }
        if patch.defect_quantity.map_or(false, |d| d < 0) {
            return Err(ApiError::InvalidInput("废品数量不能为负数".to_string()));
        }

        with_write_tx(&self.conn, |tx| {
            let mut record = ProductionRecordRepository::find_by_id(tx, id)?
                .ok_or_else(|| ApiError::NotFound(format!("计件记录(id={})不存在", id)))?;
            patch.apply_to(&mut record, now());
            ProductionRecordRepository::update_tx(tx, &record)?;
            Ok(record)
        })
    }

    /// 删除计件记录并回滚其库存变动
    ///
    /// 记录不存在时什么也不做，返回 None
    #[instrument(skip(self))]
    pub fn delete_with_rollback(&self, id: i64) -> ApiResult<Option<RollbackReport>> {
        with_write_tx(&self.conn, |tx| {
            if ProductionRecordRepository::find_by_id(tx, id)?.is_none() {
                info!(record_id = id, "计件记录不存在，忽略删除");
                return Ok(None);
            }

            let report = self.rollback_engine.reverse_by_record(tx, id, now())?;
            ProductionRecordRepository::delete_tx(tx, id)?;
            info!(record_id = id, reversed = report.reversed, "计件记录已删除");
            Ok(Some(report))
        })
    }

    pub fn get(&self, id: i64) -> ApiResult<Option<ProductionRecord>> {
        Ok(self.production_repo.get(id)?)
    }

    pub fn list(&self) -> ApiResult<Vec<ProductionRecord>> {
        Ok(self.production_repo.list_all()?)
    }

    pub fn list_by_worker(&self, worker_name: &str) -> ApiResult<Vec<ProductionRecord>> {
        Ok(self.production_repo.list_by_worker(worker_name)?)
    }

    /// 某条计件记录产生的账本
    pub fn ledger_of(&self, id: i64) -> ApiResult<Vec<LedgerEntry>> {
        Ok(self.ledger_repo.list_by_record(id)?)
    }
}
