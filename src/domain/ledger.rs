// ==========================================
// 仓储计件库存系统 - 库存账本领域模型
// ==========================================
// 红线: 账本只追加, 每次库存变动对应一条记录
// 红线: 回滚只依据账本中记录的 quantity_change, 不按当前规则重算
// ==========================================

use crate::domain::types::PoolKind;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// LedgerEntry - 账本记录（对齐 inventory_log 表）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: i64,
    pub production_record_id: Option<i64>, // 来源计件记录（手工调整为 None）
    pub rule_id: Option<i64>,              // 产生该变动的入库规则
    pub pool_kind: PoolKind,
    pub product_name: String,
    pub specification: Option<String>,
    pub material: Option<String>,
    pub original_quantity: i64, // 换算前数量（审计用）
    pub quantity_change: i64,   // 实际施加到库存池的增量
    pub calculation_factor: f64,
    pub created_at: NaiveDateTime,
}

/// 待写入的账本记录
#[derive(Debug, Clone, PartialEq)]
pub struct NewLedgerEntry {
    pub production_record_id: Option<i64>,
    pub rule_id: Option<i64>,
    pub pool_kind: PoolKind,
    pub product_name: String,
    pub specification: Option<String>,
    pub material: Option<String>,
    pub original_quantity: i64,
    pub quantity_change: i64,
    pub calculation_factor: f64,
}

impl NewLedgerEntry {
    /// 手工调整记录（无计件记录、无规则、系数 1.0）
    pub fn manual(
        pool_kind: PoolKind,
        product_name: &str,
        specification: Option<&str>,
        material: Option<&str>,
        original_quantity: i64,
        quantity_change: i64,
    ) -> Self {
        Self {
            production_record_id: None,
            rule_id: None,
            pool_kind,
            product_name: product_name.to_string(),
            specification: specification.map(str::to_string),
            material: material.map(str::to_string),
            original_quantity,
            quantity_change,
            calculation_factor: 1.0,
        }
    }
}
