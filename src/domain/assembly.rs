// ==========================================
// 仓储计件库存系统 - 装配领域模型
// ==========================================
// 装配规则: 一个成品 = 多个零件 × 单件用量
// 装配记录自带审计（记录 + 废品明细），不写库存账本
// ==========================================

use crate::domain::types::AssemblyStatus;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

// ==========================================
// AssemblyRule / AssemblyRuleItem - 装配规则
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyRule {
    pub id: i64,
    pub rule_name: String,
    pub product_name: String,
    pub is_enabled: bool,
    pub description: Option<String>,
    pub items: Vec<AssemblyRuleItem>, // 按 sort_order 排序
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyRuleItem {
    pub id: i64,
    pub assembly_rule_id: i64,
    pub component_name: String,
    pub quantity: Option<i64>, // 单件用量，空值按 1
    pub is_required: bool,
    pub sort_order: i32,
}

impl AssemblyRuleItem {
    pub fn quantity_per_unit(&self) -> i64 {
        self.quantity.unwrap_or(1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAssemblyRule {
    pub rule_name: String,
    pub product_name: String,
    pub is_enabled: bool,
    pub description: Option<String>,
    pub items: Vec<NewAssemblyRuleItem>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAssemblyRuleItem {
    pub component_name: String,
    pub quantity: i64,
    pub is_required: bool,
}

impl NewAssemblyRule {
    pub fn new(rule_name: &str, product_name: &str) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            product_name: product_name.to_string(),
            is_enabled: true,
            description: None,
            items: Vec::new(),
        }
    }

    pub fn component(mut self, component_name: &str, quantity: i64) -> Self {
        self.items.push(NewAssemblyRuleItem {
            component_name: component_name.to_string(),
            quantity,
            is_required: true,
        });
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }
}

// ==========================================
// AssemblyRecord - 装配记录
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyRecord {
    pub id: i64,
    pub assembly_rule_id: i64,
    pub product_name: String,
    pub specification: Option<String>,
    pub material: Option<String>,
    pub connection_type: Option<String>,
    pub quantity: i64,
    pub operator: Option<String>,
    pub status: AssemblyStatus,
    pub remarks: Option<String>,
    pub created_at: NaiveDateTime,
}

/// 装配请求
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAssemblyRecord {
    pub assembly_rule_id: Option<i64>,
    pub product_name: String,
    pub specification: Option<String>,
    pub material: Option<String>,
    pub connection_type: Option<String>,
    pub quantity: i64,
    pub operator: Option<String>,
    pub remarks: Option<String>,
    #[serde(default)]
    pub defects: Vec<NewAssemblyDefect>,
}

impl NewAssemblyRecord {
    pub fn new(assembly_rule_id: i64, product_name: &str, quantity: i64) -> Self {
        Self {
            assembly_rule_id: Some(assembly_rule_id),
            product_name: product_name.to_string(),
            quantity,
            ..Default::default()
        }
    }

    pub fn with_spec(
        mut self,
        specification: Option<&str>,
        material: Option<&str>,
        connection_type: Option<&str>,
    ) -> Self {
        self.specification = specification.map(str::to_string);
        self.material = material.map(str::to_string);
        self.connection_type = connection_type.map(str::to_string);
        self
    }

    pub fn check_request(&self) -> AssemblyCheckRequest {
        AssemblyCheckRequest {
            assembly_rule_id: self.assembly_rule_id,
            specification: self.specification.clone(),
            material: self.material.clone(),
            connection_type: self.connection_type.clone(),
            quantity: Some(self.quantity),
        }
    }
}

// ==========================================
// AssemblyDefect - 装配废品
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblyDefect {
    pub id: i64,
    pub assembly_record_id: i64,
    pub product_name: String,
    pub specification: Option<String>,
    pub material: Option<String>,
    pub connection_type: Option<String>,
    pub quantity: i64,
    pub unit: String,
    pub defect_reason: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewAssemblyDefect {
    pub product_name: String,
    pub specification: Option<String>,
    pub material: Option<String>,
    pub connection_type: Option<String>,
    pub quantity: i64,
    pub unit: Option<String>,
    pub defect_reason: Option<String>,
}

// ==========================================
// 装配预检
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssemblyCheckRequest {
    pub assembly_rule_id: Option<i64>,
    pub specification: Option<String>,
    pub material: Option<String>,
    pub connection_type: Option<String>,
    pub quantity: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartStatus {
    pub component_name: String,
    pub required: i64,
    pub available: i64,
    pub sufficient: bool,
    pub matched_item_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssemblyCheckResult {
    pub can_assemble: bool,
    pub parts: Vec<PartStatus>,
    pub insufficient_parts: Vec<String>,
}
