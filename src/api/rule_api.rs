// ==========================================
// 仓储计件库存系统 - 入库规则 API
// ==========================================
// 职责: 规则新建、修改并重算、删除、启停、查询、按规则批量改名
// 红线: 修改规则必须走重算（冲销旧账本 + 新规则重放），同一事务完成
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::api::{require_text, with_write_tx};
use crate::config::EngineConfig;
use crate::db::now;
use crate::domain::inventory::PoolKey;
use crate::domain::rule::{RoutingRule, RoutingRuleDraft, StorageRatio};
use crate::engine::{RollbackEngine, RuleMatcher, RuleRecalcReport};
use crate::repository::{
    InventoryRepository, LedgerRepository, RepositoryError, RoutingRuleRepository,
};

/// 按规则批量改名的结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReapplyReport {
    pub processed: usize, // 检查的零件库存行数
    pub updated: usize,   // 改名（含合并）的行数
}

// ==========================================
// RuleApi - 入库规则 API
// ==========================================
pub struct RuleApi {
    conn: Arc<Mutex<Connection>>,
    rule_repo: Arc<RoutingRuleRepository>,
    ledger_repo: Arc<LedgerRepository>,
    rollback_engine: RollbackEngine,
}

impl RuleApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        rule_repo: Arc<RoutingRuleRepository>,
        ledger_repo: Arc<LedgerRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            conn,
            rule_repo,
            ledger_repo,
            rollback_engine: RollbackEngine::new(config),
        }
    }

    fn validate_draft(draft: &RoutingRuleDraft) -> ApiResult<()> {
        require_text(&draft.rule_name, "规则名称")?;
        require_text(&draft.product_pattern, "产品匹配模式")?;
        require_text(&draft.target_location, "入库目标位置")?;
        if draft.is_finished_product && draft.blank_quantity_per_unit < 1 {
            return Err(ApiError::InvalidInput(
                "单件毛坯数量必须大于0".to_string(),
            ));
        }

        // 比例格式错误不拒绝，执行时按 1:1 处理
        if let Some(raw) = draft.storage_ratio.as_deref().filter(|s| !s.trim().is_empty()) {
            if let Err(e) = StorageRatio::parse(raw) {
                warn!(rule_name = %draft.rule_name, storage_ratio = raw, error = %e, "入库比例格式错误，执行时将按 1:1 处理");
            }
        }
        Ok(())
    }

    /// 新建规则（不处理历史记录）
    pub fn create_rule(&self, draft: RoutingRuleDraft) -> ApiResult<RoutingRule> {
        Self::validate_draft(&draft)?;
        let ts = now();

        with_write_tx(&self.conn, |tx| {
            let id = RoutingRuleRepository::insert_tx(tx, &draft, ts)?;
            let rule = RoutingRuleRepository::find_by_id(tx, id)?
                .ok_or_else(|| RepositoryError::not_found("auto_storage_rule", id))?;
            info!(rule_id = id, pattern = %rule.product_pattern, "入库规则已创建");
            Ok(rule)
        })
    }

    /// 修改规则并重算其全部历史入库
    #[instrument(skip(self, draft))]
    pub fn update_and_recalculate(
        &self,
        id: i64,
        draft: RoutingRuleDraft,
    ) -> ApiResult<RuleRecalcReport> {
        Self::validate_draft(&draft)?;

        with_write_tx(&self.conn, |tx| {
            let report = self
                .rollback_engine
                .reverse_and_replay_by_rule(tx, id, &draft, now())?;
            Ok(report)
        })
    }

    /// 删除规则
    ///
    /// 不冲销历史账本；返回仍归属该规则的账本条数
    pub fn delete_rule(&self, id: i64) -> ApiResult<i64> {
        let remaining = with_write_tx(&self.conn, |tx| {
            if RoutingRuleRepository::find_by_id(tx, id)?.is_none() {
                return Err(ApiError::NotFound(format!("入库规则(id={})不存在", id)));
            }
            let remaining: i64 = LedgerRepository::find_by_rule(tx, id)?.len() as i64;
            RoutingRuleRepository::delete_tx(tx, id)?;
            Ok(remaining)
        })?;

        if remaining > 0 {
            warn!(
                rule_id = id,
                ledger_entries = remaining,
                "入库规则已删除，历史账本仍保留其规则ID，库存未回滚"
            );
        } else {
            info!(rule_id = id, "入库规则已删除");
        }
        Ok(remaining)
    }

    /// 切换启用状态（不处理历史记录）
    pub fn toggle_enabled(&self, id: i64) -> ApiResult<RoutingRule> {
        with_write_tx(&self.conn, |tx| {
            let mut rule = RoutingRuleRepository::find_by_id(tx, id)?
                .ok_or_else(|| ApiError::NotFound(format!("入库规则(id={})不存在", id)))?;
            rule.is_enabled = !rule.is_enabled;
            rule.updated_at = now();
            RoutingRuleRepository::update_tx(tx, &rule)?;
            info!(rule_id = id, enabled = rule.is_enabled, "入库规则启停状态已切换");
            Ok(rule)
        })
    }

    pub fn list_rules(&self) -> ApiResult<Vec<RoutingRule>> {
        Ok(self.rule_repo.list_all()?)
    }

    pub fn get_rule(&self, id: i64) -> ApiResult<Option<RoutingRule>> {
        Ok(self.rule_repo.get(id)?)
    }

    /// 仍归属某规则的账本条数
    pub fn ledger_count(&self, id: i64) -> ApiResult<i64> {
        Ok(self.ledger_repo.count_by_rule(id)?)
    }

    /// 按当前规则把零件库存行改名为规则目标位置
    ///
    /// 目标键已有库存行时数量合并到该行；不写账本
    #[instrument(skip(self))]
    pub fn reapply_all_rules(&self) -> ApiResult<ReapplyReport> {
        let ts = now();

        let report = with_write_tx(&self.conn, |tx| {
            let rules = RoutingRuleRepository::load_all(tx)?;
            let snapshot = InventoryRepository::load_parts(tx)?;
            let mut report = ReapplyReport::default();

            for original in snapshot {
                // 合并可能改变了后续行的数量，逐行重新读取
                let Some(item) = InventoryRepository::find_part_by_id(tx, original.id)? else {
                    continue;
                };
                report.processed += 1;

                let Some(rule) = RuleMatcher::find_matching_rule(&rules, &item.product_name) else {
                    continue;
                };
                if rule.target_location == item.product_name {
                    continue;
                }

                let target_key = PoolKey::new(
                    rule.target_location.clone(),
                    item.specification.as_deref(),
                    item.material.as_deref(),
                );
                match InventoryRepository::find_part_by_key(tx, &target_key)? {
                    Some(existing) if existing.id != item.id => {
                        InventoryRepository::set_part_quantity_tx(
                            tx,
                            existing.id,
                            existing.quantity + item.quantity,
                            ts,
                        )?;
                        InventoryRepository::delete_part_tx(tx, item.id)?;
                    }
                    _ => {
                        InventoryRepository::rename_part_tx(tx, item.id, &rule.target_location, ts)?;
                    }
                }
                report.updated += 1;
            }

            Ok(report)
        })?;

        info!(
            processed = report.processed,
            updated = report.updated,
            "按规则批量改名完成"
        );
        Ok(report)
    }
}
