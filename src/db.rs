// ==========================================
// 仓储计件库存系统 - SQLite 连接与建表
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为（外键、busy_timeout）
// - 建表幂等，所有库存/账本/规则/装配表集中定义
// ==========================================

use chrono::{NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, TransactionBehavior};
use rust_decimal::Decimal;
use std::str::FromStr;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前 schema 版本
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 时间戳存储格式
pub const TS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 开启写事务
///
/// 使用 IMMEDIATE：事务开始即持有写锁，跨进程写入同样串行，
/// 避免两个写事务读到同一库存数量后互相覆盖。
pub fn begin_write(conn: &mut Connection) -> rusqlite::Result<Transaction<'_>> {
    conn.transaction_with_behavior(TransactionBehavior::Immediate)
}

const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

CREATE TABLE IF NOT EXISTS config_kv (
    scope_id TEXT NOT NULL DEFAULT 'global',
    key TEXT NOT NULL,
    value TEXT NOT NULL,
    updated_at TEXT NOT NULL DEFAULT (datetime('now')),
    PRIMARY KEY (scope_id, key)
);

CREATE TABLE IF NOT EXISTS inventory_item (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_name TEXT NOT NULL,
    specification TEXT,
    material TEXT,
    connection_type TEXT,
    quantity INTEGER NOT NULL DEFAULT 0,
    unit TEXT NOT NULL DEFAULT '个',
    unit_price TEXT,
    remarks TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_inventory_item_name ON inventory_item(product_name);

CREATE TABLE IF NOT EXISTS blank_inventory (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_name TEXT NOT NULL,
    specification TEXT,
    material TEXT,
    quantity INTEGER NOT NULL DEFAULT 0,
    unit TEXT NOT NULL DEFAULT '个',
    worker_name TEXT,
    remarks TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_blank_inventory_name ON blank_inventory(product_name);

CREATE TABLE IF NOT EXISTS finished_product (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    product_name TEXT NOT NULL,
    specification TEXT,
    material TEXT,
    connection_type TEXT,
    quantity INTEGER NOT NULL DEFAULT 0,
    assembly_record_id INTEGER,
    remarks TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS inventory_log (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    production_record_id INTEGER,
    rule_id INTEGER,
    inventory_type TEXT NOT NULL CHECK (inventory_type IN ('parts', 'blank')),
    product_name TEXT NOT NULL,
    specification TEXT,
    material TEXT,
    original_quantity INTEGER NOT NULL,
    quantity_change INTEGER NOT NULL,
    calculation_factor REAL NOT NULL DEFAULT 1.0,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_inventory_log_record ON inventory_log(production_record_id);
CREATE INDEX IF NOT EXISTS idx_inventory_log_rule ON inventory_log(rule_id);

CREATE TABLE IF NOT EXISTS auto_storage_rule (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rule_name TEXT NOT NULL,
    product_pattern TEXT NOT NULL,
    target_location TEXT NOT NULL,
    storage_ratio TEXT DEFAULT '1:1',
    priority INTEGER NOT NULL DEFAULT 200,
    is_enabled INTEGER NOT NULL DEFAULT 1,
    description TEXT,
    is_finished_product INTEGER NOT NULL DEFAULT 0,
    blank_product_name TEXT,
    blank_quantity_per_unit INTEGER NOT NULL DEFAULT 1,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS piece_work (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    worker_name TEXT NOT NULL,
    product_name TEXT NOT NULL,
    specification TEXT,
    material TEXT,
    connection_type TEXT,
    quantity INTEGER NOT NULL,
    defect_quantity INTEGER,
    defective_reason TEXT,
    semi_finished TEXT,
    unit TEXT,
    unit_price TEXT,
    total_amount TEXT,
    remarks TEXT,
    work_date TEXT,
    created_by TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS assembly_rule (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    rule_name TEXT NOT NULL,
    product_name TEXT NOT NULL,
    is_enabled INTEGER NOT NULL DEFAULT 1,
    description TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS assembly_rule_item (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    assembly_rule_id INTEGER NOT NULL REFERENCES assembly_rule(id) ON DELETE CASCADE,
    component_name TEXT NOT NULL,
    quantity INTEGER DEFAULT 1,
    is_required INTEGER NOT NULL DEFAULT 1,
    sort_order INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS assembly_record (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    assembly_rule_id INTEGER NOT NULL,
    product_name TEXT NOT NULL,
    specification TEXT,
    material TEXT,
    connection_type TEXT,
    quantity INTEGER NOT NULL,
    operator TEXT,
    status TEXT NOT NULL DEFAULT 'completed',
    remarks TEXT,
    created_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS assembly_defect (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    assembly_record_id INTEGER NOT NULL REFERENCES assembly_record(id) ON DELETE CASCADE,
    product_name TEXT NOT NULL,
    specification TEXT,
    material TEXT,
    connection_type TEXT,
    quantity INTEGER NOT NULL DEFAULT 0,
    unit TEXT NOT NULL DEFAULT '个',
    defect_reason TEXT,
    created_at TEXT NOT NULL
);
"#;

/// 建表（幂等）并写入 schema_version
pub fn ensure_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> =
        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}

// ==========================================
// 字段编解码
// ==========================================

/// 当前时间（UTC，秒级精度）
pub fn now() -> NaiveDateTime {
    let ts = Utc::now().naive_utc();
    parse_ts(&format_ts(&ts)).unwrap_or(ts)
}

pub fn format_ts(ts: &NaiveDateTime) -> String {
    ts.format(TS_FORMAT).to_string()
}

pub fn parse_ts(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TS_FORMAT).ok()
}

/// 读取时间戳列（解析失败回落到 UNIX 纪元）
pub fn ts_column(raw: String) -> NaiveDateTime {
    parse_ts(&raw).unwrap_or_default()
}

/// 金额以字符串存储，避免浮点误差
pub fn decimal_column(raw: Option<String>) -> Option<Decimal> {
    raw.and_then(|s| Decimal::from_str(s.trim()).ok())
}

pub fn decimal_param(value: Option<Decimal>) -> Option<String> {
    value.map(|d| d.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_schema_is_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        ensure_schema(&conn).unwrap();
        ensure_schema(&conn).unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), Some(CURRENT_SCHEMA_VERSION));
    }

    #[test]
    fn test_read_schema_version_without_table() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(read_schema_version(&conn).unwrap(), None);
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let ts = now();
        assert_eq!(parse_ts(&format_ts(&ts)), Some(ts));
    }
}
