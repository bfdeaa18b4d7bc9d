// ==========================================
// 仓储计件库存系统 - 库存池领域模型
// ==========================================
// 三个库存池:
// - inventory_item   零件库存（自动入库目标位置）, 数量<=0 时回滚删除行
// - blank_inventory  毛坯库存, 允许负数（欠料），不自动删除
// - finished_product 成品库存（装配产出）
// ==========================================

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// PoolKey - 库存行定位键
// ==========================================
// 比较语义: 空值等于空值, 空值不等于任何非空值
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolKey {
    pub product_name: String,
    pub specification: Option<String>,
    pub material: Option<String>,
}

impl PoolKey {
    pub fn new(
        product_name: impl Into<String>,
        specification: Option<&str>,
        material: Option<&str>,
    ) -> Self {
        Self {
            product_name: product_name.into(),
            specification: specification.map(str::to_string),
            material: material.map(str::to_string),
        }
    }
}

// ==========================================
// InventoryItem - 零件库存行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub id: i64,
    pub product_name: String,
    pub specification: Option<String>,
    pub material: Option<String>,
    pub connection_type: Option<String>,
    pub quantity: i64,
    pub unit: String,
    pub unit_price: Option<Decimal>,
    pub remarks: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl InventoryItem {
    pub fn key(&self) -> PoolKey {
        PoolKey::new(
            self.product_name.clone(),
            self.specification.as_deref(),
            self.material.as_deref(),
        )
    }
}

/// 新建零件库存行（找不到匹配行时由入库流程创建）
#[derive(Debug, Clone)]
pub struct NewInventoryItem {
    pub key: PoolKey,
    pub connection_type: Option<String>,
    pub quantity: i64,
    pub unit: String,
    pub unit_price: Option<Decimal>,
    pub remarks: Option<String>,
}

// ==========================================
// BlankInventory - 毛坯库存行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlankInventory {
    pub id: i64,
    pub product_name: String,
    pub specification: Option<String>,
    pub material: Option<String>,
    pub quantity: i64,
    pub unit: String,
    pub worker_name: Option<String>,
    pub remarks: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl BlankInventory {
    pub fn key(&self) -> PoolKey {
        PoolKey::new(
            self.product_name.clone(),
            self.specification.as_deref(),
            self.material.as_deref(),
        )
    }

    /// 欠料: 毛坯消耗超过库存后的负数状态，报表中必须可见
    pub fn is_owed(&self) -> bool {
        self.quantity < 0
    }
}

// ==========================================
// FinishedProduct - 成品库存行
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinishedProduct {
    pub id: i64,
    pub product_name: String,
    pub specification: Option<String>,
    pub material: Option<String>,
    pub connection_type: Option<String>,
    pub quantity: i64,
    pub assembly_record_id: Option<i64>,
    pub remarks: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

// ==========================================
// 手工调整/统计
// ==========================================

/// 零件库存手工调整结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryAdjustResult {
    pub id: i64,
    pub old_quantity: i64,
    pub new_quantity: i64,
}

/// 库存概况
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryStats {
    pub total_items: i64,
    pub total_quantity: i64,
    pub owed_blank_rows: i64,
}
