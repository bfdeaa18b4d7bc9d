// ==========================================
// 仓储计件库存系统 - 回滚 / 重算引擎
// ==========================================
// 职责:
// - 按计件记录回滚: 依账本逐笔冲销库存后删除账本
// - 按规则重算: 冲销该规则全部账本 -> 保存新规则 -> 用新规则重放相关计件记录
// 红线: 回滚只依据账本，不从库存现状推断
// 容错: 库存行已被外部删除时告警并跳过该笔冲销; 其余存储错误中止整个事务
// ==========================================

use crate::config::EngineConfig;
use crate::domain::inventory::PoolKey;
use crate::domain::ledger::LedgerEntry;
use crate::domain::rule::{RoutingRule, RoutingRuleDraft};
use crate::domain::types::PoolKind;
use crate::engine::error::{EngineError, EngineResult};
use crate::engine::stock_movement::StockMovementEngine;
use crate::repository::inventory_repo::InventoryRepository;
use crate::repository::ledger_repo::LedgerRepository;
use crate::repository::production_repo::ProductionRecordRepository;
use crate::repository::rule_repo::RoutingRuleRepository;
use chrono::NaiveDateTime;
use rusqlite::Transaction;
use serde::Serialize;
use std::collections::HashSet;
use std::time::Instant;
use tracing::{info, instrument, warn};
use uuid::Uuid;

// ==========================================
// RollbackReport - 冲销结果
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RollbackReport {
    pub reversed: usize,     // 已冲销的账本笔数
    pub orphaned: usize,     // 库存行缺失而跳过的笔数
    pub removed_rows: usize, // 冲销后归零删除的零件库存行数
}

impl RollbackReport {
    fn merge(&mut self, other: &RollbackReport) {
        self.reversed += other.reversed;
        self.orphaned += other.orphaned;
        self.removed_rows += other.removed_rows;
    }
}

// ==========================================
// RuleRecalcReport - 规则重算结果
// ==========================================
#[derive(Debug, Clone, Serialize)]
pub struct RuleRecalcReport {
    pub run_id: String,
    pub rule: RoutingRule, // 保存后的规则
    pub rollback: RollbackReport,
    pub replayed_records: usize,
    pub skipped_records: usize, // 计件记录已不存在
    pub new_entries: usize,
    pub elapsed_ms: i64,
}

// ==========================================
// RollbackEngine - 回滚 / 重算引擎
// ==========================================
pub struct RollbackEngine {
    movement: StockMovementEngine,
}

impl RollbackEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            movement: StockMovementEngine::new(config),
        }
    }

    /// 冲销一组账本记录，并删除这些账本
    ///
    /// 不去重: 同一笔账本只能冲销一次由调用方保证
    pub fn reverse_entries(
        &self,
        tx: &Transaction,
        entries: &[LedgerEntry],
        now: NaiveDateTime,
    ) -> EngineResult<RollbackReport> {
        let mut report = RollbackReport::default();

        for entry in entries {
            let key = PoolKey::new(
                entry.product_name.clone(),
                entry.specification.as_deref(),
                entry.material.as_deref(),
            );

            match entry.pool_kind {
                PoolKind::Parts => match InventoryRepository::find_part_by_key(tx, &key)? {
                    Some(item) => {
                        let new_quantity = item.quantity - entry.quantity_change;
                        if new_quantity <= 0 {
                            InventoryRepository::delete_part_tx(tx, item.id)?;
                            report.removed_rows += 1;
                            info!(item_id = item.id, product_name = %item.product_name, "零件库存归零，删除库存行");
                        } else {
                            InventoryRepository::set_part_quantity_tx(tx, item.id, new_quantity, now)?;
                        }
                        report.reversed += 1;
                    }
                    None => {
                        warn!(
                            ledger_id = entry.id,
                            product_name = %entry.product_name,
                            "零件库存行不存在，跳过冲销"
                        );
                        report.orphaned += 1;
                    }
                },
                PoolKind::Blank => match InventoryRepository::find_blank_by_key(tx, &key)? {
                    Some(blank) => {
                        let new_quantity = blank.quantity - entry.quantity_change;
                        InventoryRepository::set_blank_quantity_tx(tx, blank.id, new_quantity, now)?;
                        report.reversed += 1;
                    }
                    None => {
                        warn!(
                            ledger_id = entry.id,
                            product_name = %entry.product_name,
                            "毛坯库存行不存在，跳过冲销"
                        );
                        report.orphaned += 1;
                    }
                },
            }
        }

        let ids: Vec<i64> = entries.iter().map(|e| e.id).collect();
        LedgerRepository::delete_ids_tx(tx, &ids)?;

        Ok(report)
    }

    /// 按计件记录回滚
    #[instrument(skip(self, tx))]
    pub fn reverse_by_record(
        &self,
        tx: &Transaction,
        production_record_id: i64,
        now: NaiveDateTime,
    ) -> EngineResult<RollbackReport> {
        let entries = LedgerRepository::find_by_record(tx, production_record_id)?;
        if entries.is_empty() {
            return Ok(RollbackReport::default());
        }

        let report = self.reverse_entries(tx, &entries, now)?;
        info!(
            production_record_id,
            reversed = report.reversed,
            orphaned = report.orphaned,
            "计件记录库存已回滚"
        );
        Ok(report)
    }

    /// 规则修改后重算
    ///
    /// 1. 冲销并删除该规则的全部账本
    /// 2. 保存新规则字段
    /// 3. 按账本中零件记录首次出现的顺序重放计件记录
    ///
    /// 规则被禁用时同样重放，禁用只影响之后的匹配
    #[instrument(skip(self, tx, update), fields(run_id = tracing::field::Empty))]
    pub fn reverse_and_replay_by_rule(
        &self,
        tx: &Transaction,
        rule_id: i64,
        update: &RoutingRuleDraft,
        now: NaiveDateTime,
    ) -> EngineResult<RuleRecalcReport> {
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();
        tracing::Span::current().record("run_id", run_id.as_str());

        let mut rule = RoutingRuleRepository::find_by_id(tx, rule_id)?
            .ok_or(EngineError::RuleNotFound(rule_id))?;

        // ===== 1. 冲销 =====
        let entries = LedgerRepository::find_by_rule(tx, rule_id)?;
        let record_ids = affected_record_ids(&entries);

        let mut rollback = RollbackReport::default();
        if !entries.is_empty() {
            rollback.merge(&self.reverse_entries(tx, &entries, now)?);
        }

        // ===== 2. 保存新规则 =====
        rule.apply_draft(update, now);
        RoutingRuleRepository::update_tx(tx, &rule)?;

        // ===== 3. 重放 =====
        let mut replayed_records = 0;
        let mut skipped_records = 0;
        let mut new_entries = 0;

        for record_id in record_ids {
            match ProductionRecordRepository::find_by_id(tx, record_id)? {
                Some(record) => {
                    let written = self.movement.apply_movement(tx, &record, &rule, now)?;
                    new_entries += written.len();
                    replayed_records += 1;
                }
                None => {
                    warn!(production_record_id = record_id, "计件记录已不存在，跳过重放");
                    skipped_records += 1;
                }
            }
        }

        let report = RuleRecalcReport {
            run_id,
            rule,
            rollback,
            replayed_records,
            skipped_records,
            new_entries,
            elapsed_ms: started.elapsed().as_millis() as i64,
        };

        info!(
            rule_id,
            reversed = report.rollback.reversed,
            orphaned = report.rollback.orphaned,
            replayed = report.replayed_records,
            skipped = report.skipped_records,
            "规则重算完成"
        );
        Ok(report)
    }
}

/// 账本中零件记录涉及的计件记录（去重，保持首次出现顺序）
fn affected_record_ids(entries: &[LedgerEntry]) -> Vec<i64> {
    let mut seen = HashSet::new();
    entries
        .iter()
        .filter(|e| e.pool_kind == PoolKind::Parts)
        .filter_map(|e| e.production_record_id)
        .filter(|id| seen.insert(*id))
        .collect()
}
