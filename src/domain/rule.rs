// ==========================================
// 仓储计件库存系统 - 自动入库规则领域模型
// ==========================================
// 规则: 产品名模式（% 通配）-> 入库目标位置 + 入库比例
// 成品规则额外扣减毛坯: (良品 + 废品) × 单件毛坯数
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

pub const DEFAULT_STORAGE_RATIO: &str = "1:1";
pub const DEFAULT_RULE_PRIORITY: i32 = 200;

// ==========================================
// RoutingRule - 自动入库规则（对齐 auto_storage_rule 表）
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRule {
    pub id: i64,
    pub rule_name: String,
    pub product_pattern: String,
    pub target_location: String,
    pub storage_ratio: Option<String>, // "N:M"，空值按 1:1
    pub priority: i32,                 // 越大越优先
    pub is_enabled: bool,
    pub description: Option<String>,
    pub is_finished_product: bool, // 成品规则: 入库同时扣减毛坯
    pub blank_product_name: Option<String>,
    pub blank_quantity_per_unit: i64,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl RoutingRule {
    /// 是否需要扣减毛坯
    pub fn consumes_blank(&self) -> bool {
        self.is_finished_product && self.blank_name().is_some()
    }

    /// 非空白的毛坯名称
    pub fn blank_name(&self) -> Option<&str> {
        self.blank_product_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    /// 用新字段覆盖规则（id/created_at 保持不变）
    pub fn apply_draft(&mut self, draft: &RoutingRuleDraft, now: NaiveDateTime) {
        self.rule_name = draft.rule_name.clone();
        self.product_pattern = draft.product_pattern.clone();
        self.target_location = draft.target_location.clone();
        self.storage_ratio = draft.storage_ratio.clone();
        self.priority = draft.priority;
        self.is_enabled = draft.is_enabled;
        self.description = draft.description.clone();
        self.is_finished_product = draft.is_finished_product;
        self.blank_product_name = draft.blank_product_name.clone();
        self.blank_quantity_per_unit = draft.blank_quantity_per_unit;
        self.updated_at = now;
    }
}

// ==========================================
// RoutingRuleDraft - 规则新建/修改入参
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoutingRuleDraft {
    pub rule_name: String,
    pub product_pattern: String,
    pub target_location: String,
    #[serde(default)]
    pub storage_ratio: Option<String>,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default = "default_enabled")]
    pub is_enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub is_finished_product: bool,
    #[serde(default)]
    pub blank_product_name: Option<String>,
    #[serde(default = "default_blank_per_unit")]
    pub blank_quantity_per_unit: i64,
}

fn default_priority() -> i32 {
    DEFAULT_RULE_PRIORITY
}

fn default_enabled() -> bool {
    true
}

fn default_blank_per_unit() -> i64 {
    1
}

impl RoutingRuleDraft {
    /// 普通零件规则（1:1，不扣毛坯）
    pub fn new(
        rule_name: impl Into<String>,
        product_pattern: impl Into<String>,
        target_location: impl Into<String>,
    ) -> Self {
        Self {
            rule_name: rule_name.into(),
            product_pattern: product_pattern.into(),
            target_location: target_location.into(),
            storage_ratio: Some(DEFAULT_STORAGE_RATIO.to_string()),
            priority: DEFAULT_RULE_PRIORITY,
            is_enabled: true,
            description: None,
            is_finished_product: false,
            blank_product_name: None,
            blank_quantity_per_unit: 1,
        }
    }

    pub fn with_ratio(mut self, ratio: &str) -> Self {
        self.storage_ratio = Some(ratio.to_string());
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_blank(mut self, blank_product_name: &str, per_unit: i64) -> Self {
        self.is_finished_product = true;
        self.blank_product_name = Some(blank_product_name.to_string());
        self.blank_quantity_per_unit = per_unit;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.is_enabled = false;
        self
    }
}

impl From<&RoutingRule> for RoutingRuleDraft {
    fn from(rule: &RoutingRule) -> Self {
        Self {
            rule_name: rule.rule_name.clone(),
            product_pattern: rule.product_pattern.clone(),
            target_location: rule.target_location.clone(),
            storage_ratio: rule.storage_ratio.clone(),
            priority: rule.priority,
            is_enabled: rule.is_enabled,
            description: rule.description.clone(),
            is_finished_product: rule.is_finished_product,
            blank_product_name: rule.blank_product_name.clone(),
            blank_quantity_per_unit: rule.blank_quantity_per_unit,
        }
    }
}

// ==========================================
// StorageRatio - 入库比例 "N:M"
// ==========================================
// N 件产出 -> M 件库存，系数 = M / N
// 例: "2:1" 两件产出折一件库存 (0.5)，"1:2" 一件产出折两件库存 (2.0)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageRatio {
    pub produced: i64,
    pub stored: i64,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RatioError {
    #[error("入库比例格式错误（应为 N:M）: {0}")]
    Format(String),

    #[error("入库比例必须为正整数: {0}")]
    NonPositive(String),
}

impl StorageRatio {
    pub const ONE_TO_ONE: StorageRatio = StorageRatio {
        produced: 1,
        stored: 1,
    };

    /// 解析 "N:M"
    pub fn parse(raw: &str) -> Result<Self, RatioError> {
        let parts: Vec<&str> = raw.split(':').collect();
        if parts.len() != 2 {
            return Err(RatioError::Format(raw.to_string()));
        }

        let produced = parts[0]
            .trim()
            .parse::<i64>()
            .map_err(|_| RatioError::Format(raw.to_string()))?;
        let stored = parts[1]
            .trim()
            .parse::<i64>()
            .map_err(|_| RatioError::Format(raw.to_string()))?;

        if produced <= 0 || stored <= 0 {
            return Err(RatioError::NonPositive(raw.to_string()));
        }

        Ok(Self { produced, stored })
    }

    /// 换算系数 M / N
    pub fn factor(&self) -> f64 {
        self.stored as f64 / self.produced as f64
    }

    /// 产出数量换算为库存数量（向零截断），溢出时返回 None
    pub fn apply(&self, quantity: i64) -> Option<i64> {
        quantity
            .checked_mul(self.stored)
            .map(|scaled| scaled / self.produced)
    }
}

impl Default for StorageRatio {
    fn default() -> Self {
        Self::ONE_TO_ONE
    }
}

impl fmt::Display for StorageRatio {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.produced, self.stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_two_to_one() {
        let ratio = StorageRatio::parse("2:1").unwrap();
        assert_eq!(ratio.factor(), 0.5);
        assert_eq!(ratio.apply(5), Some(2));
        assert_eq!(ratio.apply(4), Some(2));
    }

    #[test]
    fn test_parse_one_to_two_with_spaces() {
        let ratio = StorageRatio::parse(" 1 : 2 ").unwrap();
        assert_eq!(ratio.factor(), 2.0);
        assert_eq!(ratio.apply(7), Some(14));
    }

    #[test]
    fn test_apply_overflow_is_none() {
        let ratio = StorageRatio::parse("1:2").unwrap();
        assert_eq!(ratio.apply(i64::MAX), None);
        assert_eq!(StorageRatio::ONE_TO_ONE.apply(i64::MAX), Some(i64::MAX));
    }

    #[test]
    fn test_parse_three_to_one_truncates() {
        let ratio = StorageRatio::parse("3:1").unwrap();
        assert_eq!(ratio.apply(3), Some(1));
        assert_eq!(ratio.apply(8), Some(2));
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(matches!(StorageRatio::parse("abc"), Err(RatioError::Format(_))));
        assert!(matches!(StorageRatio::parse("1:2:3"), Err(RatioError::Format(_))));
        assert!(matches!(StorageRatio::parse("x:1"), Err(RatioError::Format(_))));
        assert!(matches!(StorageRatio::parse("0:1"), Err(RatioError::NonPositive(_))));
        assert!(matches!(StorageRatio::parse("2:0"), Err(RatioError::NonPositive(_))));
    }

    #[test]
    fn test_consumes_blank_requires_name() {
        let now = chrono::Utc::now().naive_utc();
        let draft = RoutingRuleDraft::new("阀体", "阀体%", "阀体库").with_blank("  ", 2);
        let rule = RoutingRule {
            id: 1,
            rule_name: draft.rule_name.clone(),
            product_pattern: draft.product_pattern.clone(),
            target_location: draft.target_location.clone(),
            storage_ratio: draft.storage_ratio.clone(),
            priority: draft.priority,
            is_enabled: true,
            description: None,
            is_finished_product: true,
            blank_product_name: draft.blank_product_name.clone(),
            blank_quantity_per_unit: 2,
            created_at: now,
            updated_at: now,
        };
        assert!(!rule.consumes_blank());
    }
}
