// ==========================================
// 仓储计件库存系统 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// 约定: 引擎不直接读配置表，统一通过 EngineConfig 快照传入
// ==========================================

use crate::db::open_sqlite_connection;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// EngineConfig - 引擎参数快照
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// 允许匹配空接口类型库存的零件名称标记
    pub legacy_blank_connection_marker: String,
    /// 装配评分中库存数量加分的上限
    pub score_quantity_cap: i64,
    /// 新建库存行的默认单位
    pub default_unit: String,
    /// 计件记录半成品标记值
    pub semi_finished_flag: String,
    /// 不触发自动入库的管理员角色名
    pub admin_role: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            legacy_blank_connection_marker: defaults::LEGACY_BLANK_CONNECTION_MARKER.to_string(),
            score_quantity_cap: defaults::SCORE_QUANTITY_CAP,
            default_unit: defaults::DEFAULT_UNIT.to_string(),
            semi_finished_flag: defaults::SEMI_FINISHED_FLAG.to_string(),
            admin_role: defaults::ADMIN_ROLE.to_string(),
        }
    }
}

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> Result<Self, Box<dyn Error>> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    fn get_config_or_default(&self, key: &str, default: &str) -> Result<String, Box<dyn Error>> {
        Ok(self
            .get_config_value(key)?
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string()))
    }

    /// 读取 global scope 的配置值
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at)
             VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        tracing::info!(config_key = key, value = value, "配置已更新");
        Ok(())
    }

    /// 获取所有 global 配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: HashMap<String, String> = HashMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 装配配置 =====

    pub fn get_legacy_blank_connection_marker(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(
            config_keys::LEGACY_BLANK_CONNECTION_MARKER,
            defaults::LEGACY_BLANK_CONNECTION_MARKER,
        )
    }

    pub fn get_score_quantity_cap(&self) -> Result<i64, Box<dyn Error>> {
        let value = self.get_config_or_default(config_keys::SCORE_QUANTITY_CAP, "1000")?;
        match value.parse::<i64>() {
            Ok(cap) if cap >= 0 => Ok(cap),
            _ => {
                tracing::warn!(
                    config_key = config_keys::SCORE_QUANTITY_CAP,
                    raw_value = %value,
                    "评分数量上限配置格式错误，使用默认值"
                );
                Ok(defaults::SCORE_QUANTITY_CAP)
            }
        }
    }

    // ===== 库存 / 计件配置 =====

    pub fn get_default_unit(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::DEFAULT_UNIT, defaults::DEFAULT_UNIT)
    }

    pub fn get_semi_finished_flag(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::SEMI_FINISHED_FLAG, defaults::SEMI_FINISHED_FLAG)
    }

    pub fn get_admin_role(&self) -> Result<String, Box<dyn Error>> {
        self.get_config_or_default(config_keys::ADMIN_ROLE, defaults::ADMIN_ROLE)
    }

    /// 组装引擎参数快照
    pub fn load_engine_config(&self) -> Result<EngineConfig, Box<dyn Error>> {
        Ok(EngineConfig {
            legacy_blank_connection_marker: self.get_legacy_blank_connection_marker()?,
            score_quantity_cap: self.get_score_quantity_cap()?,
            default_unit: self.get_default_unit()?,
            semi_finished_flag: self.get_semi_finished_flag()?,
            admin_role: self.get_admin_role()?,
        })
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 装配
    pub const LEGACY_BLANK_CONNECTION_MARKER: &str = "assembly.legacy_blank_connection_marker";
    pub const SCORE_QUANTITY_CAP: &str = "assembly.score_quantity_cap";

    // 库存
    pub const DEFAULT_UNIT: &str = "inventory.default_unit";

    // 计件
    pub const SEMI_FINISHED_FLAG: &str = "production.semi_finished_flag";
    pub const ADMIN_ROLE: &str = "production.admin_role";
}

mod defaults {
    pub const LEGACY_BLANK_CONNECTION_MARKER: &str = "中头盖";
    pub const SCORE_QUANTITY_CAP: i64 = 1000;
    pub const DEFAULT_UNIT: &str = "个";
    pub const SEMI_FINISHED_FLAG: &str = "是";
    pub const ADMIN_ROLE: &str = "ADMIN";
}
