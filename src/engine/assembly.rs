// ==========================================
// 仓储计件库存系统 - 装配引擎
// ==========================================
// 职责: 按装配规则匹配零件库存、预检、扣减零件并入成品库
// 匹配: 名称精确 + 规格/材质相等(或均为空) + 接口类型兼容，按评分取最优行
// 红线: 所有零件先在工作快照上规划扣减，任一不足则整单不写
// ==========================================

use crate::config::EngineConfig;
use crate::domain::assembly::{
    AssemblyCheckRequest, AssemblyCheckResult, AssemblyRecord, AssemblyRule, NewAssemblyRecord,
    PartStatus,
};
use crate::domain::inventory::{InventoryItem, PoolKey};
use crate::domain::types::is_blank;
use crate::engine::error::{EngineError, EngineResult};
use crate::repository::assembly_repo::AssemblyRepository;
use crate::repository::error::RepositoryError;
use crate::repository::inventory_repo::InventoryRepository;
use chrono::NaiveDateTime;
use rusqlite::{Connection, Transaction};
use std::collections::HashMap;
use tracing::{debug, info, instrument};

/// 需求侧的匹配条件
#[derive(Debug, Clone, Copy, Default)]
pub struct MatchCriteria<'a> {
    pub specification: Option<&'a str>,
    pub material: Option<&'a str>,
    pub connection_type: Option<&'a str>,
}

/// 单个零件的规划结果
#[derive(Debug, Clone)]
struct ComponentPlan {
    component_name: String,
    required: i64,
    matched: Option<(i64, i64)>, // (库存行 id, 快照可用量)
}

impl ComponentPlan {
    fn available(&self) -> i64 {
        self.matched.map(|(_, qty)| qty).unwrap_or(0)
    }

    fn sufficient(&self) -> bool {
        self.matched.is_some() && self.available() >= self.required
    }
}

/// 相等，或两者均为空白
fn equals_or_both_blank(a: Option<&str>, b: Option<&str>) -> bool {
    if is_blank(a) && is_blank(b) {
        return true;
    }
    match (a, b) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

// ==========================================
// AssemblyEngine - 装配引擎
// ==========================================
pub struct AssemblyEngine {
    config: EngineConfig,
}

impl AssemblyEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// 历史库存不填接口类型的零件（名称含配置标记）
    fn allows_blank_connection(&self, component_name: &str) -> bool {
        let marker = self.config.legacy_blank_connection_marker.as_str();
        !marker.is_empty() && !component_name.trim().is_empty() && component_name.contains(marker)
    }

    fn connection_type_matches(
        &self,
        row_connection: Option<&str>,
        requested: Option<&str>,
        component_name: &str,
    ) -> bool {
        if is_blank(requested) {
            return true;
        }
        if is_blank(row_connection) {
            return self.allows_blank_connection(component_name);
        }
        row_connection == requested
    }

    /// 候选库存行评分（不匹配返回 None）
    pub fn score_candidate(
        &self,
        component_name: &str,
        item: &InventoryItem,
        available: i64,
        criteria: &MatchCriteria,
    ) -> Option<i64> {
        if is_blank(Some(component_name)) || item.product_name != component_name {
            return None;
        }
        if !equals_or_both_blank(item.specification.as_deref(), criteria.specification) {
            return None;
        }
        if !equals_or_both_blank(item.material.as_deref(), criteria.material) {
            return None;
        }
        let row_connection = item.connection_type.as_deref();
        if !self.connection_type_matches(row_connection, criteria.connection_type, component_name) {
            return None;
        }

        let mut score = 10;
        if equals_or_both_blank(row_connection, criteria.connection_type) {
            score += 2;
        } else if is_blank(row_connection) && self.allows_blank_connection(component_name) {
            score += 1;
        }
        score += available.min(self.config.score_quantity_cap);
        Some(score)
    }

    /// 在候选行中选出最优匹配
    ///
    /// `planned` 为已规划的扣减量（库存行 id -> 数量），评分使用扣减后的快照数量。
    /// 同分时保留先扫描到的行。
    pub fn find_best_match<'a>(
        &self,
        component_name: &str,
        candidates: &'a [InventoryItem],
        criteria: &MatchCriteria,
        planned: &HashMap<i64, i64>,
    ) -> Option<(&'a InventoryItem, i64)> {
        let mut best: Option<(&InventoryItem, i64, i64)> = None;

        for item in candidates {
            let available = item.quantity - planned.get(&item.id).copied().unwrap_or(0);
            let Some(score) = self.score_candidate(component_name, item, available, criteria)
            else {
                continue;
            };
            let better = match best {
                Some((_, best_score, _)) => score > best_score,
                None => true,
            };
            if better {
                best = Some((item, score, available));
            }
        }

        best.map(|(item, _, available)| (item, available))
    }

    /// 在工作快照上逐个零件规划（按明细顺序）
    fn plan_components(
        &self,
        conn: &Connection,
        rule: &AssemblyRule,
        criteria: &MatchCriteria,
        build_quantity: i64,
    ) -> EngineResult<Vec<ComponentPlan>> {
        let mut candidates_by_name: HashMap<String, Vec<InventoryItem>> = HashMap::new();
        let mut planned: HashMap<i64, i64> = HashMap::new();
        let mut plans = Vec::with_capacity(rule.items.len());

        for item in &rule.items {
            let required = item
                .quantity_per_unit()
                .checked_mul(build_quantity)
                .ok_or_else(|| {
                    EngineError::InvalidInput(format!("零件需求数量超出范围: {}", item.component_name))
                })?;

            if !candidates_by_name.contains_key(&item.component_name) {
                let rows = InventoryRepository::load_parts_by_name(conn, &item.component_name)?;
                candidates_by_name.insert(item.component_name.clone(), rows);
            }
            let candidates = candidates_by_name
                .get(&item.component_name)
                .map(Vec::as_slice)
                .unwrap_or(&[]);

            let matched = self
                .find_best_match(&item.component_name, candidates, criteria, &planned)
                .map(|(row, available)| (row.id, available));

            let plan = ComponentPlan {
                component_name: item.component_name.clone(),
                required,
                matched,
            };
            if let (true, Some((row_id, _))) = (plan.sufficient(), plan.matched) {
                *planned.entry(row_id).or_insert(0) += required;
            }

            debug!(
                component = %plan.component_name,
                required,
                available = plan.available(),
                matched_item_id = ?plan.matched.map(|(id, _)| id),
                "零件匹配"
            );
            plans.push(plan);
        }

        Ok(plans)
    }

    /// 校验规则: id 必填、存在、已启用
    fn load_rule(&self, conn: &Connection, rule_id: Option<i64>) -> EngineResult<AssemblyRule> {
        let rule_id = rule_id.ok_or(EngineError::AssemblyRuleMissingId)?;
        let rule = AssemblyRepository::find_rule(conn, rule_id)?
            .ok_or(EngineError::AssemblyRuleNotFound(rule_id))?;
        if !rule.is_enabled {
            return Err(EngineError::AssemblyRuleDisabled(rule_id));
        }
        Ok(rule)
    }

    fn validate_quantity(quantity: Option<i64>) -> EngineResult<i64> {
        match quantity {
            Some(q) if q > 0 => Ok(q),
            _ => Err(EngineError::InvalidInput("装配数量必须大于0".to_string())),
        }
    }

    /// 装配预检（不写库）
    #[instrument(skip(self, conn, request), fields(rule_id = ?request.assembly_rule_id))]
    pub fn check_assembly(
        &self,
        conn: &Connection,
        request: &AssemblyCheckRequest,
    ) -> EngineResult<AssemblyCheckResult> {
        let quantity = Self::validate_quantity(request.quantity)?;
        let rule = self.load_rule(conn, request.assembly_rule_id)?;

        let criteria = MatchCriteria {
            specification: request.specification.as_deref(),
            material: request.material.as_deref(),
            connection_type: request.connection_type.as_deref(),
        };
        let plans = self.plan_components(conn, &rule, &criteria, quantity)?;

        let parts: Vec<PartStatus> = plans
            .iter()
            .map(|p| PartStatus {
                component_name: p.component_name.clone(),
                required: p.required,
                available: p.available(),
                sufficient: p.sufficient(),
                matched_item_id: p.matched.map(|(id, _)| id),
            })
            .collect();
        let insufficient_parts: Vec<String> = parts
            .iter()
            .filter(|p| !p.sufficient)
            .map(|p| p.component_name.clone())
            .collect();

        Ok(AssemblyCheckResult {
            can_assemble: insufficient_parts.is_empty(),
            parts,
            insufficient_parts,
        })
    }

    /// 执行装配
    ///
    /// 1. 校验规则与数量
    /// 2. 规划全部零件扣减（任一缺失/不足即返回错误，不写库）
    /// 3. 扣减零件 -> 写装配记录 -> 写废品明细 -> 成品入库
    #[instrument(skip(self, tx, request), fields(
        rule_id = ?request.assembly_rule_id,
        quantity = request.quantity
    ))]
    pub fn execute_assembly(
        &self,
        tx: &Transaction,
        request: &NewAssemblyRecord,
        now: NaiveDateTime,
    ) -> EngineResult<AssemblyRecord> {
        let rule = self.load_rule(tx, request.assembly_rule_id)?;
        let quantity = Self::validate_quantity(Some(request.quantity))?;

        let criteria = MatchCriteria {
            specification: request.specification.as_deref(),
            material: request.material.as_deref(),
            connection_type: request.connection_type.as_deref(),
        };
        let plans = self.plan_components(tx, &rule, &criteria, quantity)?;

        // ===== 规划校验 =====
        let mut deductions: Vec<(i64, i64)> = Vec::with_capacity(plans.len());
        for plan in &plans {
            let (row_id, available) =
                plan.matched
                    .ok_or_else(|| EngineError::ComponentStockMissing {
                        component: plan.component_name.clone(),
                    })?;
            if available < plan.required {
                return Err(EngineError::InsufficientComponentStock {
                    component: plan.component_name.clone(),
                    required: plan.required,
                    available,
                });
            }
            deductions.push((row_id, plan.required));
        }

        // ===== 扣减零件 =====
        for (row_id, required) in deductions {
            let row = InventoryRepository::find_part_by_id(tx, row_id)?
                .ok_or_else(|| RepositoryError::not_found("inventory_item", row_id))?;
            InventoryRepository::set_part_quantity_tx(tx, row_id, row.quantity - required, now)?;
        }

        // ===== 装配记录 / 废品 =====
        let mut record = request.clone();
        if record.product_name.trim().is_empty() {
            record.product_name = rule.product_name.clone();
        }
        let saved = AssemblyRepository::insert_record_tx(tx, rule.id, &record, now)?;

        for defect in &record.defects {
            AssemblyRepository::insert_defect_tx(
                tx,
                saved.id,
                defect,
                &self.config.default_unit,
                now,
            )?;
        }

        // ===== 成品入库 =====
        let key = PoolKey::new(
            saved.product_name.clone(),
            saved.specification.as_deref(),
            saved.material.as_deref(),
        );
        let connection_type = saved.connection_type.as_deref();
        match InventoryRepository::find_finished_by_key(tx, &key, connection_type)? {
            Some(existing) => InventoryRepository::update_finished_tx(
                tx,
                existing.id,
                existing.quantity + quantity,
                saved.id,
                now,
            )?,
            None => {
                InventoryRepository::insert_finished_tx(
                    tx,
                    &key,
                    connection_type,
                    quantity,
                    saved.id,
                    now,
                )?;
            }
        }

        info!(
            assembly_record_id = saved.id,
            product_name = %saved.product_name,
            quantity,
            components = plans.len(),
            "装配完成，成品已入库"
        );
        Ok(saved)
    }
}
