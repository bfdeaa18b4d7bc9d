// ==========================================
// 仓储计件库存系统 - 库存池仓储
// ==========================================
// 红线: Repository 不含业务逻辑
// 职责: inventory_item / blank_inventory / finished_product 三张表的读写
// 约束: 库存键比较为空值安全比较（SQLite `IS`）
// ==========================================

use crate::db::{decimal_column, decimal_param, format_ts, ts_column};
use crate::domain::inventory::{
    BlankInventory, FinishedProduct, InventoryItem, InventoryStats, NewInventoryItem, PoolKey,
};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveDateTime;
use rusqlite::{params, Connection, OptionalExtension, Result as SqliteResult, Row, Transaction};
use std::sync::{Arc, Mutex};

const PART_COLUMNS: &str = "id, product_name, specification, material, connection_type, \
     quantity, unit, unit_price, remarks, created_at, updated_at";

const BLANK_COLUMNS: &str = "id, product_name, specification, material, quantity, unit, \
     worker_name, remarks, created_at, updated_at";

const FINISHED_COLUMNS: &str = "id, product_name, specification, material, connection_type, \
     quantity, assembly_record_id, remarks, created_at, updated_at";

// ==========================================
// InventoryRepository - 库存池仓储
// ==========================================
pub struct InventoryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl InventoryRepository {
    /// 从已有连接创建仓储实例
    pub fn new(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 浏览查询（自行加锁）
    // ==========================================

    /// 零件库存全部行（按 id 升序）
    pub fn list_parts(&self) -> RepositoryResult<Vec<InventoryItem>> {
        let conn = self.get_conn()?;
        Self::load_parts(&conn)
    }

    pub fn get_part(&self, id: i64) -> RepositoryResult<Option<InventoryItem>> {
        let conn = self.get_conn()?;
        Self::find_part_by_id(&conn, id)
    }

    pub fn list_blanks(&self) -> RepositoryResult<Vec<BlankInventory>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM blank_inventory ORDER BY id ASC",
            BLANK_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], map_blank)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn list_finished(&self) -> RepositoryResult<Vec<FinishedProduct>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM finished_product ORDER BY id ASC",
            FINISHED_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], map_finished)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 库存概况
    pub fn stats(&self) -> RepositoryResult<InventoryStats> {
        let conn = self.get_conn()?;
        let (total_items, total_quantity): (i64, i64) = conn.query_row(
            "SELECT COUNT(*), COALESCE(SUM(quantity), 0) FROM inventory_item",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        let owed_blank_rows: i64 = conn.query_row(
            "SELECT COUNT(*) FROM blank_inventory WHERE quantity < 0",
            [],
            |row| row.get(0),
        )?;
        Ok(InventoryStats {
            total_items,
            total_quantity,
            owed_blank_rows,
        })
    }

    // ==========================================
    // 零件库存（可在事务内调用）
    // ==========================================

    pub fn load_parts(conn: &Connection) -> RepositoryResult<Vec<InventoryItem>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM inventory_item ORDER BY id ASC",
            PART_COLUMNS
        ))?;
        let rows = stmt
            .query_map([], map_part)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 按产品名取候选行（装配匹配用，名称列有索引）
    pub fn load_parts_by_name(
        conn: &Connection,
        product_name: &str,
    ) -> RepositoryResult<Vec<InventoryItem>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM inventory_item WHERE product_name = ?1 ORDER BY id ASC",
            PART_COLUMNS
        ))?;
        let rows = stmt
            .query_map(params![product_name], map_part)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    pub fn find_part_by_id(conn: &Connection, id: i64) -> RepositoryResult<Option<InventoryItem>> {
        let row = conn
            .query_row(
                &format!("SELECT {} FROM inventory_item WHERE id = ?1", PART_COLUMNS),
                params![id],
                map_part,
            )
            .optional()?;
        Ok(row)
    }

    /// 按 (产品名, 规格, 材质) 定位，同键多行时取 id 最小的一行
    pub fn find_part_by_key(
        conn: &Connection,
        key: &PoolKey,
    ) -> RepositoryResult<Option<InventoryItem>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM inventory_item \
                     WHERE product_name = ?1 AND specification IS ?2 AND material IS ?3 \
                     ORDER BY id ASC LIMIT 1",
                    PART_COLUMNS
                ),
                params![key.product_name, key.specification, key.material],
                map_part,
            )
            .optional()?;
        Ok(row)
    }

    pub fn insert_part_tx(
        tx: &Transaction,
        item: &NewInventoryItem,
        now: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        tx.execute(
            r#"
            INSERT INTO inventory_item (
                product_name, specification, material, connection_type,
                quantity, unit, unit_price, remarks, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
            params![
                item.key.product_name,
                item.key.specification,
                item.key.material,
                item.connection_type,
                item.quantity,
                item.unit,
                decimal_param(item.unit_price),
                item.remarks,
                format_ts(&now),
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }

    pub fn set_part_quantity_tx(
        tx: &Transaction,
        id: i64,
        quantity: i64,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let rows = tx.execute(
            "UPDATE inventory_item SET quantity = ?1, updated_at = ?2 WHERE id = ?3",
            params![quantity, format_ts(&now), id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("inventory_item", id));
        }
        Ok(())
    }

    pub fn rename_part_tx(
        tx: &Transaction,
        id: i64,
        product_name: &str,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        tx.execute(
            "UPDATE inventory_item SET product_name = ?1, updated_at = ?2 WHERE id = ?3",
            params![product_name, format_ts(&now), id],
        )?;
        Ok(())
    }

    pub fn delete_part_tx(tx: &Transaction, id: i64) -> RepositoryResult<()> {
        tx.execute("DELETE FROM inventory_item WHERE id = ?1", params![id])?;
        Ok(())
    }

    // ==========================================
    // 毛坯库存
    // ==========================================

    pub fn find_blank_by_key(
        conn: &Connection,
        key: &PoolKey,
    ) -> RepositoryResult<Option<BlankInventory>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM blank_inventory \
                     WHERE product_name = ?1 AND specification IS ?2 AND material IS ?3 \
                     ORDER BY id ASC LIMIT 1",
                    BLANK_COLUMNS
                ),
                params![key.product_name, key.specification, key.material],
                map_blank,
            )
            .optional()?;
        Ok(row)
    }

    pub fn insert_blank_tx(
        tx: &Transaction,
        key: &PoolKey,
        quantity: i64,
        unit: &str,
        worker_name: Option<&str>,
        remarks: Option<&str>,
        now: NaiveDateTime,
    ) -> RepositoryResult<BlankInventory> {
        tx.execute(
            r#"
            INSERT INTO blank_inventory (
                product_name, specification, material, quantity, unit,
                worker_name, remarks, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
            "#,
            params![
                key.product_name,
                key.specification,
                key.material,
                quantity,
                unit,
                worker_name,
                remarks,
                format_ts(&now),
            ],
        )?;
        Ok(BlankInventory {
            id: tx.last_insert_rowid(),
            product_name: key.product_name.clone(),
            specification: key.specification.clone(),
            material: key.material.clone(),
            quantity,
            unit: unit.to_string(),
            worker_name: worker_name.map(str::to_string),
            remarks: remarks.map(str::to_string),
            created_at: now,
            updated_at: now,
        })
    }

    pub fn set_blank_quantity_tx(
        tx: &Transaction,
        id: i64,
        quantity: i64,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        let rows = tx.execute(
            "UPDATE blank_inventory SET quantity = ?1, updated_at = ?2 WHERE id = ?3",
            params![quantity, format_ts(&now), id],
        )?;
        if rows == 0 {
            return Err(RepositoryError::not_found("blank_inventory", id));
        }
        Ok(())
    }

    // ==========================================
    // 成品库存
    // ==========================================

    pub fn find_finished_by_key(
        conn: &Connection,
        key: &PoolKey,
        connection_type: Option<&str>,
    ) -> RepositoryResult<Option<FinishedProduct>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {} FROM finished_product \
                     WHERE product_name = ?1 AND specification IS ?2 AND material IS ?3 \
                       AND connection_type IS ?4 \
                     ORDER BY id ASC LIMIT 1",
                    FINISHED_COLUMNS
                ),
                params![key.product_name, key.specification, key.material, connection_type],
                map_finished,
            )
            .optional()?;
        Ok(row)
    }

    pub fn insert_finished_tx(
        tx: &Transaction,
        key: &PoolKey,
        connection_type: Option<&str>,
        quantity: i64,
        assembly_record_id: i64,
        now: NaiveDateTime,
    ) -> RepositoryResult<i64> {
        tx.execute(
            r#"
            INSERT INTO finished_product (
                product_name, specification, material, connection_type,
                quantity, assembly_record_id, remarks, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, '装配入库', ?7, ?7)
            "#,
            params![
                key.product_name,
                key.specification,
                key.material,
                connection_type,
                quantity,
                assembly_record_id,
                format_ts(&now),
            ],
        )?;
        Ok(tx.last_insert_rowid())
    }

    pub fn update_finished_tx(
        tx: &Transaction,
        id: i64,
        quantity: i64,
        assembly_record_id: i64,
        now: NaiveDateTime,
    ) -> RepositoryResult<()> {
        tx.execute(
            "UPDATE finished_product SET quantity = ?1, assembly_record_id = ?2, updated_at = ?3 \
             WHERE id = ?4",
            params![quantity, assembly_record_id, format_ts(&now), id],
        )?;
        Ok(())
    }
}

// ==========================================
// 行映射
// ==========================================

fn map_part(row: &Row) -> SqliteResult<InventoryItem> {
    Ok(InventoryItem {
        id: row.get(0)?,
        product_name: row.get(1)?,
        specification: row.get(2)?,
        material: row.get(3)?,
        connection_type: row.get(4)?,
        quantity: row.get(5)?,
        unit: row.get(6)?,
        unit_price: decimal_column(row.get(7)?),
        remarks: row.get(8)?,
        created_at: ts_column(row.get(9)?),
        updated_at: ts_column(row.get(10)?),
    })
}

fn map_blank(row: &Row) -> SqliteResult<BlankInventory> {
    Ok(BlankInventory {
        id: row.get(0)?,
        product_name: row.get(1)?,
        specification: row.get(2)?,
        material: row.get(3)?,
        quantity: row.get(4)?,
        unit: row.get(5)?,
        worker_name: row.get(6)?,
        remarks: row.get(7)?,
        created_at: ts_column(row.get(8)?),
        updated_at: ts_column(row.get(9)?),
    })
}

fn map_finished(row: &Row) -> SqliteResult<FinishedProduct> {
    Ok(FinishedProduct {
        id: row.get(0)?,
        product_name: row.get(1)?,
        specification: row.get(2)?,
        material: row.get(3)?,
        connection_type: row.get(4)?,
        quantity: row.get(5)?,
        assembly_record_id: row.get(6)?,
        remarks: row.get(7)?,
        created_at: ts_column(row.get(8)?),
        updated_at: ts_column(row.get(9)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{begin_write, ensure_schema, now};

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        conn
    }

    #[test]
    fn test_find_part_by_key_null_safe() {
        let mut conn = setup();
        let ts = now();
        let tx = begin_write(&mut conn).unwrap();
        InventoryRepository::insert_part_tx(
            &tx,
            &NewInventoryItem {
                key: PoolKey::new("阀盖库", None, Some("304")),
                connection_type: None,
                quantity: 5,
                unit: "个".to_string(),
                unit_price: None,
                remarks: None,
            },
            ts,
        )
        .unwrap();
        tx.commit().unwrap();

        let hit = InventoryRepository::find_part_by_key(&conn, &PoolKey::new("阀盖库", None, Some("304")))
            .unwrap();
        assert_eq!(hit.map(|i| i.quantity), Some(5));

        let miss = InventoryRepository::find_part_by_key(
            &conn,
            &PoolKey::new("阀盖库", Some("DN50"), Some("304")),
        )
        .unwrap();
        assert!(miss.is_none());
    }

    #[test]
    fn test_blank_quantity_may_go_negative() {
        let mut conn = setup();
        let ts = now();
        let tx = begin_write(&mut conn).unwrap();
        let blank = InventoryRepository::insert_blank_tx(
            &tx,
            &PoolKey::new("阀体毛坯", Some("DN50"), None),
            0,
            "个",
            None,
            None,
            ts,
        )
        .unwrap();
        InventoryRepository::set_blank_quantity_tx(&tx, blank.id, -12, ts).unwrap();
        tx.commit().unwrap();

        let row = InventoryRepository::find_blank_by_key(&conn, &blank.key()).unwrap().unwrap();
        assert_eq!(row.quantity, -12);
        assert!(row.is_owed());
    }
}
