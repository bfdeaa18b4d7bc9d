// ==========================================
// 仓储计件库存系统 - 装配仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 对齐: assembly_rule / assembly_rule_item / assembly_record / assembly_defect
// ==========================================

use crate::db::{format_ts, ts_column};
use crate::domain::assembly::{
    AssemblyDefect, AssemblyRecord, AssemblyRule, AssemblyRuleItem, NewAssemblyDefect,
    NewAssemblyRecord, NewAssemblyRule,
};
use crate::domain::types::AssemblyStatus;
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};

const RULE_COLUMNS: &str = "id, rule_name, product_name, is_enabled, description, created_at";

const ITEM_COLUMNS: &str =
    "id, assembly_rule_id, component_name, quantity, is_required, sort_order";

const RECORD_COLUMNS: &str = "id, assembly_rule_id, product_name, specification, material, \
     connection_type, quantity, operator, status, remarks, created_at";

const DEFECT_COLUMNS: &str = "id, assembly_record_id, product_name, specification, material, \
     connection_type, quantity, unit, defect_reason, created_at";

// ==========================================
// AssemblyRepository - 装配仓储
// ==========================================
pub struct AssemblyRepository {
    conn: Arc<Mutex<Connection>>,
}

impl AssemblyRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 装配规则
    // ==========================================

    pub fn get_rule(&self, id: i64) -> RepositoryResult<Option<AssemblyRule>> {
        let conn = self.get_conn()?;
        Self::find_rule(&conn, id)
    }

    /// 全部装配规则（含明细）
    pub fn list_rules(&self) -> RepositoryResult<Vec<AssemblyRule>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM assembly_rule ORDER BY id ASC",
            RULE_COLUMNS
        ))?;
        let mut rules = stmt
            .query_map([], map_rule)?
            .collect::<SqliteResult<Vec<_>>>()?;

        for rule in rules.iter_mut() {
            rule.items = Self::load_items(&conn, rule.id)?;
        }
        Ok(rules)
    }

    /// 规则及其明细（明细按 sort_order 排序）
    pub fn find_rule(conn: &Connection, id: i64) -> RepositoryResult<Option<AssemblyRule>> {
        let rule = conn
            .query_row(
                &format!("SELECT {} FROM assembly_rule WHERE id = ?1", RULE_COLUMNS),
                params![id],
                map_rule,
            )
            .optional()?;

        match rule {
            Some(mut rule) => {
                rule.items = Self::load_items(conn, rule.id)?;
                Ok(Some(rule))
            }
            None => Ok(None),
        }
    }

    fn load_items(conn: &Connection, rule_id: i64) -> RepositoryResult<Vec<AssemblyRuleItem>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM assembly_rule_item WHERE assembly_rule_id = ?1 \
             ORDER BY sort_order ASC, id ASC",
            ITEM_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![rule_id], map_item)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 插入规则及明细，sort_order 取明细在入参中的顺序
    pub fn insert_rule_tx(
        tx: &Transaction,
        rule: &NewAssemblyRule,
        now: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        tx.execute(
            r#"
            INSERT INTO assembly_rule (rule_name, product_name, is_enabled, description, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                rule.rule_name,
                rule.product_name,
                rule.is_enabled,
                rule.description,
                format_ts(&now),
            ],
        )?;
        let rule_id = tx.last_insert_rowid();

        let mut stmt = tx.prepare(
            r#"
            INSERT INTO assembly_rule_item (
                assembly_rule_id, component_name, quantity, is_required, sort_order
            ) VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )?;
        for (idx, item) in rule.items.iter().enumerate() {
            stmt.execute(params![
                rule_id,
                item.component_name,
                item.quantity,
                item.is_required,
                idx as i64,
            ])?;
        }

        Ok(rule_id)
    }

    // ==========================================
    // 装配记录
    // ==========================================

    pub fn get_record(&self, id: i64) -> RepositoryResult<Option<AssemblyRecord>> {
        let conn = self.get_conn()?;
        let row = conn
            .query_row(
                &format!("SELECT {} FROM assembly_record WHERE id = ?1", RECORD_COLUMNS),
                params![id],
                map_record,
            )
            .optional()?;
        Ok(row)
    }

    /// 装配记录（最新在前）
    pub fn list_records(&self) -> RepositoryResult<Vec<AssemblyRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM assembly_record ORDER BY id DESC",
            RECORD_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], map_record)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_defects(&self, assembly_record_id: i64) -> RepositoryResult<Vec<AssemblyDefect>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM assembly_defect WHERE assembly_record_id = ?1 ORDER BY id ASC",
            DEFECT_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![assembly_record_id], map_defect)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn insert_record_tx(
        tx: &Transaction,
        assembly_rule_id: i64,
        record: &NewAssemblyRecord,
        now: NaiveDateTime,
    ) -> RepositoryResult<AssemblyRecord> {
        let status = AssemblyStatus::Completed;
        tx.execute(
            r#"
            INSERT INTO assembly_record (
                assembly_rule_id, product_name, specification, material, connection_type,
                quantity, operator, status, remarks, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                assembly_rule_id,
                record.product_name,
                record.specification,
                record.material,
                record.connection_type,
                record.quantity,
                record.operator,
                status.to_db_str(),
                record.remarks,
                format_ts(&now),
            ],
        )?;

        Ok(AssemblyRecord {
            id: tx.last_insert_rowid(),
            assembly_rule_id,
            product_name: record.product_name.clone(),
            specification: record.specification.clone(),
            material: record.material.clone(),
            connection_type: record.connection_type.clone(),
            quantity: record.quantity,
            operator: record.operator.clone(),
            status,
            remarks: record.remarks.clone(),
            created_at: now,
        })
    }

    /// 写入废品明细（未填单位时使用默认单位）
    pub fn insert_defect_tx(
        tx: &Transaction,
        assembly_record_id: i64,
        defect: &NewAssemblyDefect,
        default_unit: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        let unit = defect
            .unit
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(default_unit);

        tx.execute(
            r#"
            INSERT INTO assembly_defect (
                assembly_record_id, product_name, specification, material,
                connection_type, quantity, unit, defect_reason, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                assembly_record_id,
                defect.product_name,
                defect.specification,
                defect.material,
                defect.connection_type,
                defect.quantity,
                unit,
                defect.defect_reason,
                format_ts(&now),
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }
}

// ==========================================
// 行映射
// ==========================================

fn map_rule(row: &Row) -> SqliteResult<AssemblyRule> {
    Ok(AssemblyRule {
        id: row.get(0)?,
        rule_name: row.get(1)?,
        product_name: row.get(2)?,
        is_enabled: row.get(3)?,
        description: row.get(4)?,
        items: Vec::new(),
        created_at: ts_column(row.get(5)?),
    })
}

fn map_item(row: &Row) -> SqliteResult<AssemblyRuleItem> {
    Ok(AssemblyRuleItem {
        id: row.get(0)?,
        assembly_rule_id: row.get(1)?,
        component_name: row.get(2)?,
        quantity: row.get(3)?,
        is_required: row.get(4)?,
        sort_order: row.get(5)?,
    })
}

fn map_record(row: &Row) -> SqliteResult<AssemblyRecord> {
    let raw_status: String = row.get(8)?;
    let status = AssemblyStatus::from_db_str(&raw_status).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            8,
            Type::Text,
            format!("未知的装配状态: {}", raw_status).into(),
        )
    })?;

    Ok(AssemblyRecord {
        id: row.get(0)?,
        assembly_rule_id: row.get(1)?,
        product_name: row.get(2)?,
        specification: row.get(3)?,
        material: row.get(4)?,
        connection_type: row.get(5)?,
        quantity: row.get(6)?,
        operator: row.get(7)?,
        status,
        remarks: row.get(9)?,
        created_at: ts_column(row.get(10)?),
    })
}

fn map_defect(row: &Row) -> SqliteResult<AssemblyDefect> {
    Ok(AssemblyDefect {
        id: row.get(0)?,
        assembly_record_id: row.get(1)?,
        product_name: row.get(2)?,
        specification: row.get(3)?,
        material: row.get(4)?,
        connection_type: row.get(5)?,
        quantity: row.get(6)?,
        unit: row.get(7)?,
        defect_reason: row.get(8)?,
        created_at: ts_column(row.get(9)?),
    })
}
