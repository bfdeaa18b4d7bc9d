// ==========================================
// 仓储计件库存系统 - 计件记录仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 对齐: piece_work 表
// ==========================================

use crate::db::{decimal_column, decimal_param, format_ts, parse_ts, ts_column};
use crate::domain::production::{compute_total_amount, NewProductionRecord, ProductionRecord};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};

const RECORD_COLUMNS: &str = "id, worker_name, product_name, specification, material, \
     connection_type, quantity, defect_quantity, defective_reason, semi_finished, unit, \
     unit_price, total_amount, remarks, work_date, created_by, created_at, updated_at";

// ==========================================
// ProductionRecordRepository - 计件记录仓储
// ==========================================
pub struct ProductionRecordRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ProductionRecordRepository {
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    pub fn get(&self, id: i64) -> RepositoryResult<Option<ProductionRecord>> {
        let conn = self.get_conn()?;
        Self::find_by_id(&conn, id)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<ProductionRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM piece_work ORDER BY id ASC",
            RECORD_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], map_record)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_by_worker(&self, worker_name: &str) -> RepositoryResult<Vec<ProductionRecord>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM piece_work WHERE worker_name = ?1 ORDER BY id ASC",
            RECORD_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![worker_name], map_record)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    // ==========================================
    // 事务内操作
    // ==========================================

    pub fn find_by_id(conn: &Connection, id: i64) -> RepositoryResult<Option<ProductionRecord>> {
        let row = conn
            .query_row(
                &format!("SELECT {} FROM piece_work WHERE id = ?1", RECORD_COLUMNS),
                params![id],
                map_record,
            )
            .optional()?;
        Ok(row)
    }

    /// 插入计件记录，金额由数量 × 单价得出
    pub fn insert_tx(
        tx: &Transaction,
        record: &NewProductionRecord,
        now: NaiveDateTime,
    ) -> RepositoryResult<ProductionRecord> {
        let total_amount = compute_total_amount(record.quantity, record.unit_price);
        tx.execute(
            r#"
            INSERT INTO piece_work (
                worker_name, product_name, specification, material, connection_type,
                quantity, defect_quantity, defective_reason, semi_finished, unit,
                unit_price, total_amount, remarks, work_date, created_by,
                created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)
            "#,
            params![
                record.worker_name,
                record.product_name,
                record.specification,
                record.material,
                record.connection_type,
                record.quantity,
                record.defect_quantity,
                record.defective_reason,
                record.semi_finished,
                record.unit,
                decimal_param(record.unit_price),
                decimal_param(total_amount),
                record.remarks,
                record.work_date.map(|d| format_ts(&d)),
                record.created_by,
                format_ts(&now),
            ],
        )?;

        Ok(ProductionRecord {
            id: tx.last_insert_rowid(),
            worker_name: record.worker_name.clone(),
            product_name: record.product_name.clone(),
            specification: record.specification.clone(),
            material: record.material.clone(),
            connection_type: record.connection_type.clone(),
            quantity: record.quantity,
            defect_quantity: record.defect_quantity,
            defective_reason: record.defective_reason.clone(),
            semi_finished: record.semi_finished.clone(),
            unit: record.unit.clone(),
            unit_price: record.unit_price,
            total_amount,
            remarks: record.remarks.clone(),
            work_date: record.work_date,
            created_by: record.created_by.clone(),
            created_at: now,
            updated_at: now,
        })
    }

    /// 原地更新描述性字段（不触发库存变动）
    pub fn update_tx(tx: &Transaction, record: &ProductionRecord) -> RepositoryResult<()> {
        let rows = tx.execute(
            r#"
            UPDATE piece_work SET
                worker_name = ?1, product_name = ?2, specification = ?3, material = ?4,
                connection_type = ?5, quantity = ?6, defect_quantity = ?7,
                defective_reason = ?8, semi_finished = ?9, unit = ?10, unit_price = ?11,
                total_amount = ?12, remarks = ?13, updated_at = ?14
            WHERE id = ?15
            "#,
            params![
                record.worker_name,
                record.product_name,
                record.specification,
                record.material,
                record.connection_type,
                record.quantity,
                record.defect_quantity,
                record.defective_reason,
                record.semi_finished,
                record.unit,
                decimal_param(record.unit_price),
                decimal_param(record.total_amount),
                record.remarks,
                format_ts(&record.updated_at),
                record.id,
            ],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("piece_work", record.id));
        }
        Ok(())
    }

    pub fn delete_tx(tx: &Transaction, id: i64) -> RepositoryResult<usize> {
        let rows = tx.execute("DELETE FROM piece_work WHERE id = ?1", params![id])?;
        Ok(rows)
    }
}

fn map_record(row: &Row) -> SqliteResult<ProductionRecord> {
    Ok(ProductionRecord {
        id: row.get(0)?,
        worker_name: row.get(1)?,
        product_name: row.get(2)?,
        specification: row.get(3)?,
        material: row.get(4)?,
        connection_type: row.get(5)?,
        quantity: row.get(6)?,
        defect_quantity: row.get(7)?,
        defective_reason: row.get(8)?,
        semi_finished: row.get(9)?,
        unit: row.get(10)?,
        unit_price: decimal_column(row.get(11)?),
        total_amount: decimal_column(row.get(12)?),
        remarks: row.get(13)?,
        work_date: row
            .get::<_, Option<String>>(14)?
            .and_then(|s| parse_ts(&s)),
        created_by: row.get(15)?,
        created_at: ts_column(row.get(16)?),
        updated_at: ts_column(row.get(17)?),
    })
}
