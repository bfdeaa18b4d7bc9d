// ==========================================
// 仓储计件库存系统 - 库存账本仓储
// ==========================================
// 红线: 账本只追加; 除回滚外不修改、不删除
// 对齐: inventory_log 表
// ==========================================

use crate::db::{format_ts, ts_column};
use crate::domain::ledger::{LedgerEntry, NewLedgerEntry};
use crate::domain::types::PoolKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};

const LEDGER_COLUMNS: &str = "id, production_record_id, rule_id, inventory_type, product_name, \
     specification, material, original_quantity, quantity_change, calculation_factor, created_at";

/// 单个库存行历史的最大返回条数
pub const HISTORY_LIMIT: i64 = 50;

// ==========================================
// LedgerRepository - 库存账本仓储
// ==========================================
pub struct LedgerRepository {
    conn: Arc<Mutex<Connection>>,
}

impl LedgerRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 浏览查询
    // ==========================================

    pub fn list_all(&self) -> RepositoryResult<Vec<LedgerEntry>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM inventory_log ORDER BY id ASC",
            LEDGER_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], map_entry)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_by_record(&self, production_record_id: i64) -> RepositoryResult<Vec<LedgerEntry>> {
        let conn = self.get_conn()?;
        Self::find_by_record(&conn, production_record_id)
    }

    pub fn list_by_rule(&self, rule_id: i64) -> RepositoryResult<Vec<LedgerEntry>> {
        let conn = self.get_conn()?;
        Self::find_by_rule(&conn, rule_id)
    }

    /// 零件库存行的变动历史（最新在前）
    ///
    /// 规格为空的行同时匹配账本中规格为 NULL 或 '' 的记录
    pub fn history_for_part(
        &self,
        product_name: &str,
        specification: Option<&str>,
    ) -> RepositoryResult<Vec<LedgerEntry>> {
        let conn = self.get_conn()?;
        let spec = specification.map(str::trim).filter(|s| !s.is_empty());

        let rows = match spec {
            Some(spec) => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM inventory_log \
                     WHERE inventory_type = 'parts' AND product_name = ?1 AND specification = ?2 \
                     ORDER BY created_at DESC, id DESC LIMIT ?3",
                    LEDGER_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![product_name, spec, HISTORY_LIMIT], map_entry)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
            None => {
                let mut stmt = conn.prepare(&format!(
                    "SELECT {} FROM inventory_log \
                     WHERE inventory_type = 'parts' AND product_name = ?1 \
                       AND (specification IS NULL OR specification = '') \
                     ORDER BY created_at DESC, id DESC LIMIT ?2",
                    LEDGER_COLUMNS
                ))?;
                let rows = stmt
                    .query_map(params![product_name, HISTORY_LIMIT], map_entry)?
                    .collect::<SqliteResult<Vec<_>>>()?;
                rows
            }
        };

        Ok(rows)
    }

    /// 仍归属于某规则的账本条数
    pub fn count_by_rule(&self, rule_id: i64) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row(
            "SELECT COUNT(*) FROM inventory_log WHERE rule_id = ?1",
            params![rule_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn find_by_record(
        conn: &Connection,
        production_record_id: i64,
    ) -> RepositoryResult<Vec<LedgerEntry>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM inventory_log WHERE production_record_id = ?1 ORDER BY id ASC",
            LEDGER_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![production_record_id], map_entry)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn find_by_rule(conn: &Connection, rule_id: i64) -> RepositoryResult<Vec<LedgerEntry>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM inventory_log WHERE rule_id = ?1 ORDER BY id ASC",
            LEDGER_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![rule_id], map_entry)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 追加一条账本记录
    pub fn append_tx(
        tx: &Transaction,
        entry: &NewLedgerEntry,
        now: NaiveDateTime,
    ) -> RepositoryResult<LedgerEntry> {
        tx.execute(
            r#"
            INSERT INTO inventory_log (
                production_record_id, rule_id, inventory_type, product_name,
                specification, material, original_quantity, quantity_change,
                calculation_factor, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                entry.production_record_id,
                entry.rule_id,
                entry.pool_kind.to_db_str(),
                entry.product_name,
                entry.specification,
                entry.material,
                entry.original_quantity,
                entry.quantity_change,
                entry.calculation_factor,
                format_ts(&now),
            ],
        )?;

        Ok(LedgerEntry {
            id: tx.last_insert_rowid(),
            production_record_id: entry.production_record_id,
            rule_id: entry.rule_id,
            pool_kind: entry.pool_kind,
            product_name: entry.product_name.clone(),
            specification: entry.specification.clone(),
            material: entry.material.clone(),
            original_quantity: entry.original_quantity,
            quantity_change: entry.quantity_change,
            calculation_factor: entry.calculation_factor,
            created_at: now,
        })
    }

    /// 删除已回滚的账本记录
    pub fn delete_ids_tx(tx: &Transaction, ids: &[i64]) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare("DELETE FROM inventory_log WHERE id = ?1")?;
        let mut count = 0;
        for id in ids {
            count += stmt.execute(params![id])?;
        }
        Ok(count)
    }
}

fn map_entry(row: &Row) -> SqliteResult<LedgerEntry> {
    let raw_kind: String = row.get(3)?;
    let pool_kind = PoolKind::from_db_str(&raw_kind).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            3,
            Type::Text,
            format!("未知的库存类型: {}", raw_kind).into(),
        )
    })?;

    Ok(LedgerEntry {
        id: row.get(0)?,
        production_record_id: row.get(1)?,
        rule_id: row.get(2)?,
        pool_kind,
        product_name: row.get(4)?,
        specification: row.get(5)?,
        material: row.get(6)?,
        original_quantity: row.get(7)?,
        quantity_change: row.get(8)?,
        calculation_factor: row.get(9)?,
        created_at: ts_column(row.get(10)?),
    })
}
