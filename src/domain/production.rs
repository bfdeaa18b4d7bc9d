// ==========================================
// 仓储计件库存系统 - 计件记录领域模型
// ==========================================
// 金额 = 良品数量 × 单价（废品不计入金额）
// ==========================================

use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// ==========================================
// ProductionRecord - 计件记录（对齐 piece_work 表）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecord {
    pub id: i64,
    pub worker_name: String,
    pub product_name: String,
    pub specification: Option<String>,
    pub material: Option<String>,
    pub connection_type: Option<String>,
    pub quantity: i64,
    pub defect_quantity: Option<i64>,
    pub defective_reason: Option<String>,
    pub semi_finished: Option<String>, // "是" / "否"
    pub unit: Option<String>,
    pub unit_price: Option<Decimal>,
    pub total_amount: Option<Decimal>,
    pub remarks: Option<String>,
    pub work_date: Option<NaiveDateTime>,
    pub created_by: Option<String>,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl ProductionRecord {
    pub fn defect_quantity_or_zero(&self) -> i64 {
        self.defect_quantity.unwrap_or(0)
    }

    /// 是否为半成品（只有半成品才会自动入库）
    pub fn is_semi_finished(&self, flag: &str) -> bool {
        self.semi_finished.as_deref().map(str::trim) == Some(flag)
    }
}

/// 计算金额: 数量 × 单价
pub fn compute_total_amount(quantity: i64, unit_price: Option<Decimal>) -> Option<Decimal> {
    unit_price.map(|price| price * Decimal::from(quantity))
}

// ==========================================
// NewProductionRecord - 新建计件记录入参
// ==========================================
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewProductionRecord {
    pub worker_name: String,
    pub product_name: String,
    pub specification: Option<String>,
    pub material: Option<String>,
    pub connection_type: Option<String>,
    pub quantity: i64,
    pub defect_quantity: Option<i64>,
    pub defective_reason: Option<String>,
    pub semi_finished: Option<String>,
    pub unit: Option<String>,
    pub unit_price: Option<Decimal>,
    pub remarks: Option<String>,
    pub work_date: Option<NaiveDateTime>,
    pub created_by: Option<String>,
}

impl NewProductionRecord {
    pub fn new(worker_name: &str, product_name: &str, quantity: i64) -> Self {
        Self {
            worker_name: worker_name.to_string(),
            product_name: product_name.to_string(),
            quantity,
            ..Default::default()
        }
    }

    pub fn with_spec(mut self, specification: &str, material: &str) -> Self {
        self.specification = Some(specification.to_string());
        self.material = Some(material.to_string());
        self
    }

    pub fn with_defects(mut self, defect_quantity: i64) -> Self {
        self.defect_quantity = Some(defect_quantity);
        self
    }

    pub fn semi_finished(mut self, flag: &str) -> Self {
        self.semi_finished = Some(flag.to_string());
        self
    }

    pub fn with_unit_price(mut self, unit_price: Decimal) -> Self {
        self.unit_price = Some(unit_price);
        self
    }
}

// ==========================================
// ProductionRecordPatch - 计件记录修改入参
// ==========================================
// 只覆盖提交的字段；修改不会触发库存变动
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProductionRecordPatch {
    pub worker_name: Option<String>,
    pub product_name: Option<String>,
    pub specification: Option<String>,
    pub material: Option<String>,
    pub connection_type: Option<String>,
    pub quantity: Option<i64>,
    pub defect_quantity: Option<i64>,
    pub defective_reason: Option<String>,
    pub semi_finished: Option<String>,
    pub unit: Option<String>,
    pub unit_price: Option<Decimal>,
    pub remarks: Option<String>,
}

impl ProductionRecordPatch {
    /// 合并到已有记录，并重新计算金额
    pub fn apply_to(&self, record: &mut ProductionRecord, now: NaiveDateTime) {
        if let Some(v) = &self.worker_name {
            record.worker_name = v.clone();
        }
        if let Some(v) = &self.product_name {
            record.product_name = v.clone();
        }
        if let Some(v) = &self.specification {
            record.specification = Some(v.clone());
        }
        if let Some(v) = &self.material {
            record.material = Some(v.clone());
        }
        if let Some(v) = &self.connection_type {
            record.connection_type = Some(v.clone());
        }
        if let Some(v) = self.quantity {
            record.quantity = v;
        }
        if let Some(v) = self.defect_quantity {
            record.defect_quantity = Some(v);
        }
        if let Some(v) = &self.defective_reason {
            record.defective_reason = Some(v.clone());
        }
        if let Some(v) = &self.semi_finished {
            record.semi_finished = Some(v.clone());
        }
        if let Some(v) = &self.unit {
            record.unit = Some(v.clone());
        }
        if let Some(v) = self.unit_price {
            record.unit_price = Some(v);
        }
        if let Some(v) = &self.remarks {
            record.remarks = Some(v.clone());
        }

        if record.unit_price.is_some() {
            record.total_amount = compute_total_amount(record.quantity, record.unit_price);
        }
        record.updated_at = now;
    }
}
