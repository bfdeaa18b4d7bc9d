// ==========================================
// 仓储计件库存系统 - 库存 API
// ==========================================
// 职责: 库存池浏览、账本查询、库存概况、手工调整、毛坯入库
// 红线: 手工调整同样写账本（无计件记录、无规则）
// ==========================================

use std::sync::{Arc, Mutex};

use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::error::{ApiError, ApiResult};
use crate::api::{require_text, with_write_tx};
use crate::config::EngineConfig;
use crate::db::now;
use crate::domain::inventory::{
    BlankInventory, FinishedProduct, InventoryAdjustResult, InventoryItem, InventoryStats, PoolKey,
};
use crate::domain::ledger::{LedgerEntry, NewLedgerEntry};
use crate::domain::types::PoolKind;
use crate::repository::{InventoryRepository, LedgerRepository};

/// 毛坯入库入参
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BlankReceipt {
    pub product_name: String,
    pub specification: Option<String>,
    pub material: Option<String>,
    pub quantity: i64,
    pub unit: Option<String>,
    pub worker_name: Option<String>,
    pub remarks: Option<String>,
}

impl BlankReceipt {
    pub fn new(product_name: &str, quantity: i64) -> Self {
        Self {
            product_name: product_name.to_string(),
            quantity,
            ..Default::default()
        }
    }

    pub fn with_spec(mut self, specification: Option<&str>, material: Option<&str>) -> Self {
        self.specification = specification.map(str::to_string);
        self.material = material.map(str::to_string);
        self
    }

    fn key(&self) -> PoolKey {
        PoolKey::new(
            self.product_name.clone(),
            self.specification.as_deref(),
            self.material.as_deref(),
        )
    }
}

// ==========================================
// InventoryApi - 库存 API
// ==========================================
pub struct InventoryApi {
    conn: Arc<Mutex<Connection>>,
    inventory_repo: Arc<InventoryRepository>,
    ledger_repo: Arc<LedgerRepository>,
    config: EngineConfig,
}

impl InventoryApi {
    pub fn new(
        conn: Arc<Mutex<Connection>>,
        inventory_repo: Arc<InventoryRepository>,
        ledger_repo: Arc<LedgerRepository>,
        config: EngineConfig,
    ) -> Self {
        Self {
            conn,
            inventory_repo,
            ledger_repo,
            config,
        }
    }

    // ==========================================
    // 库存池浏览
    // ==========================================

    pub fn list_parts(&self) -> ApiResult<Vec<InventoryItem>> {
        Ok(self.inventory_repo.list_parts()?)
    }

    pub fn get_part(&self, id: i64) -> ApiResult<Option<InventoryItem>> {
        Ok(self.inventory_repo.get_part(id)?)
    }

    pub fn list_blanks(&self) -> ApiResult<Vec<BlankInventory>> {
        Ok(self.inventory_repo.list_blanks()?)
    }

    pub fn list_finished(&self) -> ApiResult<Vec<FinishedProduct>> {
        Ok(self.inventory_repo.list_finished()?)
    }

    pub fn stats(&self) -> ApiResult<InventoryStats> {
        Ok(self.inventory_repo.stats()?)
    }

    // ==========================================
    // 账本查询
    // ==========================================

    pub fn ledger_by_record(&self, production_record_id: i64) -> ApiResult<Vec<LedgerEntry>> {
        Ok(self.ledger_repo.list_by_record(production_record_id)?)
    }

    pub fn ledger_by_rule(&self, rule_id: i64) -> ApiResult<Vec<LedgerEntry>> {
        Ok(self.ledger_repo.list_by_rule(rule_id)?)
    }

    /// 零件库存行的变动历史（最新在前）
    pub fn parts_history(&self, id: i64) -> ApiResult<Vec<LedgerEntry>> {
        let item = self
            .inventory_repo
            .get_part(id)?
            .ok_or_else(|| ApiError::NotFound(format!("库存行(id={})不存在", id)))?;

        Ok(self
            .ledger_repo
            .history_for_part(&item.product_name, item.specification.as_deref())?)
    }

    // ==========================================
    // 手工操作
    // ==========================================

    /// 手工调整零件库存
    ///
    /// 调整后数量不得为负；增量为 0 时不写库
    pub fn adjust_parts(&self, id: i64, delta: i64) -> ApiResult<InventoryAdjustResult> {
        let ts = now();

        with_write_tx(&self.conn, |tx| {
            let item = InventoryRepository::find_part_by_id(tx, id)?
                .ok_or_else(|| ApiError::NotFound(format!("库存行(id={})不存在", id)))?;

            let new_quantity = item.quantity + delta;
            if new_quantity < 0 {
                return Err(ApiError::InvalidInput(format!(
                    "调整后库存为负: 当前 {}, 调整 {}",
                    item.quantity, delta
                )));
            }

            if delta != 0 {
                InventoryRepository::set_part_quantity_tx(tx, id, new_quantity, ts)?;
                LedgerRepository::append_tx(
                    tx,
                    &NewLedgerEntry::manual(
                        PoolKind::Parts,
                        &item.product_name,
                        item.specification.as_deref(),
                        item.material.as_deref(),
                        item.quantity,
                        delta,
                    ),
                    ts,
                )?;
                info!(item_id = id, old = item.quantity, new = new_quantity, "零件库存手工调整");
            }

            Ok(InventoryAdjustResult {
                id,
                old_quantity: item.quantity,
                new_quantity,
            })
        })
    }

    /// 毛坯入库（按键合并到已有行，没有则新建）
    pub fn receive_blank(&self, receipt: BlankReceipt) -> ApiResult<BlankInventory> {
        require_text(&receipt.product_name, "毛坯名称")?;
        if receipt.quantity <= 0 {
            return Err(ApiError::InvalidInput("入库数量必须大于0".to_string()));
        }

        let ts = now();
        let key = receipt.key();
        let unit = receipt
            .unit
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(self.config.default_unit.as_str())
            .to_string();

        with_write_tx(&self.conn, |tx| {
            let (mut blank, original) = match InventoryRepository::find_blank_by_key(tx, &key)? {
                Some(blank) => {
                    let original = blank.quantity;
                    InventoryRepository::set_blank_quantity_tx(
                        tx,
                        blank.id,
                        original + receipt.quantity,
                        ts,
                    )?;
                    (blank, original)
                }
                None => {
                    let blank = InventoryRepository::insert_blank_tx(
                        tx,
                        &key,
                        receipt.quantity,
                        &unit,
                        receipt.worker_name.as_deref(),
                        receipt.remarks.as_deref(),
                        ts,
                    )?;
                    (blank, 0)
                }
            };

            LedgerRepository::append_tx(
                tx,
                &NewLedgerEntry::manual(
                    PoolKind::Blank,
                    &key.product_name,
                    key.specification.as_deref(),
                    key.material.as_deref(),
                    original,
                    receipt.quantity,
                ),
                ts,
            )?;

            blank.quantity = original + receipt.quantity;
            blank.updated_at = ts;
            info!(
                blank_id = blank.id,
                product_name = %blank.product_name,
                quantity = blank.quantity,
                "毛坯入库"
            );
            Ok(blank)
        })
    }
}
