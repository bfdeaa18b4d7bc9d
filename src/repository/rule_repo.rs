// ==========================================
// 仓储计件库存系统 - 自动入库规则仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 对齐: auto_storage_rule 表
// ==========================================

use crate::db::{format_ts, ts_column};
use crate::domain::rule::{RoutingRule, RoutingRuleDraft};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};

const RULE_COLUMNS: &str = "id, rule_name, product_pattern, target_location, storage_ratio, \
     priority, is_enabled, description, is_finished_product, blank_product_name, \
     blank_quantity_per_unit, created_at, updated_at";

// ==========================================
// RoutingRuleRepository - 入库规则仓储
// ==========================================
pub struct RoutingRuleRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RoutingRuleRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<RoutingRule>> {
        let conn = self.get_conn()?;
        Self::load_all(&conn)
    }

    pub fn get(&self, id: i64) -> RepositoryResult<Option<RoutingRule>> {
        let conn = self.get_conn()?;
        Self::find_by_id(&conn, id)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    /// 全部规则（按 id 升序，作为同优先级时的稳定顺序）
    pub fn load_all(conn: &Connection) -> RepositoryResult<Vec<RoutingRule>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM auto_storage_rule ORDER BY id ASC",
            RULE_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], map_rule)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 已启用规则（按 id 升序，优先级排序由匹配器负责）
    pub fn load_enabled(conn: &Connection) -> RepositoryResult<Vec<RoutingRule>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM auto_storage_rule WHERE is_enabled = 1 ORDER BY id ASC",
            RULE_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], map_rule)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn find_by_id(conn: &Connection, id: i64) -> RepositoryResult<Option<RoutingRule>> {
        let row = conn
            .query_row(
                &format!("SELECT {} FROM auto_storage_rule WHERE id = ?1", RULE_COLUMNS),
                params![id],
                map_rule,
            )
            .optional()?;
        Ok(row)
    }

    pub fn insert_tx(
        tx: &Transaction,
        draft: &RoutingRuleDraft,
        now: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        tx.execute(
            r#"
            INSERT INTO auto_storage_rule (
                rule_name, product_pattern, target_location, storage_ratio, priority,
                is_enabled, description, is_finished_product, blank_product_name,
                blank_quantity_per_unit, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
            "#,
            params![
                draft.rule_name,
                draft.product_pattern,
                draft.target_location,
                draft.storage_ratio,
                draft.priority,
                draft.is_enabled,
                draft.description,
                draft.is_finished_product,
                draft.blank_product_name,
                draft.blank_quantity_per_unit,
                format_ts(&now),
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }

    /// 保存规则全部可编辑字段
    pub fn update_tx(tx: &Transaction, rule: &RoutingRule) -> RepositoryResult<()> {
        let rows = tx.execute(
            r#"
            UPDATE auto_storage_rule SET
                rule_name = ?1, product_pattern = ?2, target_location = ?3,
                storage_ratio = ?4, priority = ?5, is_enabled = ?6, description = ?7,
                is_finished_product = ?8, blank_product_name = ?9,
                blank_quantity_per_unit = ?10, updated_at = ?11
            WHERE id = ?12
            "#,
            params![
                rule.rule_name,
                rule.product_pattern,
                rule.target_location,
                rule.storage_ratio,
                rule.priority,
                rule.is_enabled,
                rule.description,
                rule.is_finished_product,
                rule.blank_product_name,
                rule.blank_quantity_per_unit,
                format_ts(&rule.updated_at),
                rule.id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("auto_storage_rule", rule.id));
        }
        Ok(())
    }

    pub fn delete_tx(tx: &Transaction, id: i64) -> RepositoryResult<usize> {
        let rows = tx.execute("DELETE FROM auto_storage_rule WHERE id = ?1", params![id])?;
        Ok(rows)
    }
}

fn map_rule(row: &Row) -> SqliteResult<RoutingRule> {
    Ok(RoutingRule {
        id: row.get(0)?,
        rule_name: row.get(1)?,
        product_pattern: row.get(2)?,
        target_location: row.get(3)?,
        storage_ratio: row.get(4)?,
        priority: row.get(5)?,
        is_enabled: row.get(6)?,
        description: row.get(7)?,
        is_finished_product: row.get(8)?,
        blank_product_name: row.get(9)?,
        blank_quantity_per_unit: row.get(10)?,
        created_at: ts_column(row.get(11)?),
        updated_at: ts_column(row.get(12)?),
    })
}
