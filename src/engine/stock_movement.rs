// ==========================================
// 仓储计件库存系统 - 库存变动引擎
// ==========================================
// 职责: 按入库规则把一条计件记录落到库存池，并逐笔写入账本
// 顺序: 先扣毛坯（成品规则），再入零件库存
// 红线: 只在调用方事务内执行; 每次库存变动必须有对应账本记录
// 门控: 管理员 / 非半成品的判断由调用方负责
// ==========================================

use crate::config::EngineConfig;
use crate::domain::inventory::{NewInventoryItem, PoolKey};
use crate::domain::ledger::{LedgerEntry, NewLedgerEntry};
use crate::domain::production::ProductionRecord;
use crate::domain::rule::{RoutingRule, StorageRatio};
use crate::domain::types::PoolKind;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::inventory_repo::InventoryRepository;
use crate::repository::ledger_repo::LedgerRepository;
use chrono::NaiveDateTime;
use rusqlite::Transaction;
use tracing::{info, instrument, warn};

const AUTO_BLANK_REMARKS: &str = "计件扣料自动创建";

/// 解析规则的入库比例
///
/// 空值按 1:1; 格式错误记录告警后按 1:1
pub fn resolve_storage_ratio(rule: &RoutingRule) -> StorageRatio {
    let raw = match rule.storage_ratio.as_deref().map(str::trim) {
        Some(s) if !s.is_empty() => s,
        _ => return StorageRatio::ONE_TO_ONE,
    };

    match StorageRatio::parse(raw) {
        Ok(ratio) => ratio,
        Err(e) => {
            warn!(
                rule_id = rule.id,
                storage_ratio = raw,
                error = %e,
                "入库比例无法解析，按 1:1 处理"
            );
            StorageRatio::ONE_TO_ONE
        }
    }
}

// ==========================================
// StockMovementEngine - 库存变动引擎
// ==========================================
pub struct StockMovementEngine {
    config: EngineConfig,
}

impl StockMovementEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// 执行一次入库变动
    ///
    /// # 返回
    /// 本次写入的账本记录（毛坯在前，零件在后）
    #[instrument(skip(self, tx, record, rule), fields(
        record_id = record.id,
        rule_id = rule.id,
        product_name = %record.product_name
    ))]
    pub fn apply_movement(
        &self,
        tx: &Transaction,
        record: &ProductionRecord,
        rule: &RoutingRule,
        now: NaiveDateTime,
    ) -> EngineResult<Vec<LedgerEntry>> {
        let mut entries = Vec::with_capacity(2);

        if let Some(blank_name) = rule.blank_name().filter(|_| rule.is_finished_product) {
            entries.push(self.consume_blank(tx, record, rule, blank_name, now)?);
        }

        entries.push(self.store_parts(tx, record, rule, now)?);
        Ok(entries)
    }

    /// 扣减毛坯: (良品 + 废品) × 单件毛坯数，允许扣成负数
    fn consume_blank(
        &self,
        tx: &Transaction,
        record: &ProductionRecord,
        rule: &RoutingRule,
        blank_name: &str,
        now: NaiveDateTime,
    ) -> EngineResult<LedgerEntry> {
        let produced = record
            .quantity
            .checked_add(record.defect_quantity_or_zero())
            .ok_or_else(|| EngineError::InvalidInput("产出数量超出范围".to_string()))?;
        let consumed = produced
            .checked_mul(rule.blank_quantity_per_unit)
            .ok_or_else(|| EngineError::InvalidInput("毛坯扣减数量超出范围".to_string()))?;

        let key = PoolKey::new(
            blank_name,
            record.specification.as_deref(),
            record.material.as_deref(),
        );

        let blank = match InventoryRepository::find_blank_by_key(tx, &key)? {
            Some(blank) => blank,
            None => {
                info!(blank_product = blank_name, "毛坯库存行不存在，自动创建");
                InventoryRepository::insert_blank_tx(
                    tx,
                    &key,
                    0,
                    &self.config.default_unit,
                    None,
                    Some(AUTO_BLANK_REMARKS),
                    now,
                )?
            }
        };

        let new_quantity = blank.quantity - consumed;
        InventoryRepository::set_blank_quantity_tx(tx, blank.id, new_quantity, now)?;

        if new_quantity < 0 {
            warn!(
                blank_product = blank_name,
                owed = -new_quantity,
                "毛坯库存不足，已记为欠料"
            );
        } else {
            info!(blank_product = blank_name, consumed, remaining = new_quantity, "毛坯已扣减");
        }

        let entry = LedgerRepository::append_tx(
            tx,
            &NewLedgerEntry {
                production_record_id: Some(record.id),
                rule_id: Some(rule.id),
                pool_kind: PoolKind::Blank,
                product_name: blank_name.to_string(),
                specification: record.specification.clone(),
                material: record.material.clone(),
                original_quantity: produced,
                quantity_change: -consumed,
                calculation_factor: 1.0,
            },
            now,
        )?;
        Ok(entry)
    }

    /// 按比例换算后入零件库存（目标位置作为库存行产品名）
    fn store_parts(
        &self,
        tx: &Transaction,
        record: &ProductionRecord,
        rule: &RoutingRule,
        now: NaiveDateTime,
    ) -> EngineResult<LedgerEntry> {
        let ratio = resolve_storage_ratio(rule);
        let inventory_qty = ratio.apply(record.quantity).ok_or_else(|| {
            EngineError::InvalidInput(format!("入库数量超出范围: {} @ {}", record.quantity, ratio))
        })?;

        let key = PoolKey::new(
            rule.target_location.clone(),
            record.specification.as_deref(),
            record.material.as_deref(),
        );

        match InventoryRepository::find_part_by_key(tx, &key)? {
            Some(item) => {
                let new_quantity = item.quantity + inventory_qty;
                InventoryRepository::set_part_quantity_tx(tx, item.id, new_quantity, now)?;
                info!(
                    location = %rule.target_location,
                    added = inventory_qty,
                    quantity = new_quantity,
                    "零件库存已增加"
                );
            }
            None => {
                let unit = record
                    .unit
                    .as_deref()
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .unwrap_or(self.config.default_unit.as_str())
                    .to_string();
                InventoryRepository::insert_part_tx(
                    tx,
                    &NewInventoryItem {
                        key,
                        connection_type: record.connection_type.clone(),
                        quantity: inventory_qty,
                        unit,
                        unit_price: record.unit_price,
                        remarks: None,
                    },
                    now,
                )?;
                info!(
                    location = %rule.target_location,
                    quantity = inventory_qty,
                    "零件库存行已创建"
                );
            }
        }

        let entry = LedgerRepository::append_tx(
            tx,
            &NewLedgerEntry {
                production_record_id: Some(record.id),
                rule_id: Some(rule.id),
                pool_kind: PoolKind::Parts,
                product_name: rule.target_location.clone(),
                specification: record.specification.clone(),
                material: record.material.clone(),
                original_quantity: record.quantity,
                quantity_change: inventory_qty,
                calculation_factor: ratio.factor(),
            },
            now,
        )?;
        Ok(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rule::RoutingRuleDraft;
    use chrono::Utc;

    fn rule_with_ratio(ratio: Option<&str>) -> RoutingRule {
        let now = Utc::now().naive_utc();
        let draft = RoutingRuleDraft::new("球阀", "球阀%", "球阀库");
        RoutingRule {
            id: 7,
            rule_name: draft.rule_name,
            product_pattern: draft.product_pattern,
            target_location: draft.target_location,
            storage_ratio: ratio.map(str::to_string),
            priority: draft.priority,
            is_enabled: true,
            description: None,
            is_finished_product: false,
            blank_product_name: None,
            blank_quantity_per_unit: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_resolve_ratio_defaults() {
        assert_eq!(resolve_storage_ratio(&rule_with_ratio(None)), StorageRatio::ONE_TO_ONE);
        assert_eq!(resolve_storage_ratio(&rule_with_ratio(Some(" "))), StorageRatio::ONE_TO_ONE);
        assert_eq!(
            resolve_storage_ratio(&rule_with_ratio(Some("2:x"))),
            StorageRatio::ONE_TO_ONE
        );
        assert_eq!(
            resolve_storage_ratio(&rule_with_ratio(Some("-1:2"))),
            StorageRatio::ONE_TO_ONE
        );
    }

    #[test]
    fn test_resolve_ratio_valid() {
        let ratio = resolve_storage_ratio(&rule_with_ratio(Some("2:1")));
        assert_eq!(ratio.factor(), 0.5);
    }
}
