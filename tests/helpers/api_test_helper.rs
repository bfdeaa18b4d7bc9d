// ==========================================
// API集成测试辅助工具
// ==========================================
// 职责: 提供API层集成测试的通用环境与断言
// ==========================================
#![allow(dead_code)]

use std::sync::Arc;
use tempfile::NamedTempFile;

use wms_inventory_ledger::api::{
    ApiError, AssemblyApi, InventoryApi, ProductionApi, ProductionCreateResult, RuleApi,
};
use wms_inventory_ledger::app::AppState;
use wms_inventory_ledger::config::ConfigManager;
use wms_inventory_ledger::domain::inventory::{BlankInventory, InventoryItem};
use wms_inventory_ledger::domain::production::NewProductionRecord;
use wms_inventory_ledger::domain::rule::{RoutingRule, RoutingRuleDraft};

use crate::test_helpers::create_test_db;

/// 非管理员录入角色
pub const WORKER: &str = "WORKER";

/// 管理员录入角色（与默认配置一致）
pub const ADMIN: &str = "ADMIN";

// ==========================================
// API测试环境
// ==========================================

/// API测试环境
///
/// 通过 AppState 组装，与生产路径一致
pub struct ApiTestEnv {
    pub db_path: String,
    pub production_api: Arc<ProductionApi>,
    pub rule_api: Arc<RuleApi>,
    pub inventory_api: Arc<InventoryApi>,
    pub assembly_api: Arc<AssemblyApi>,
    pub config_manager: Arc<ConfigManager>,

    // 临时文件（确保生命周期）
    _temp_file: NamedTempFile,
}

impl ApiTestEnv {
    /// 默认配置的测试环境
    pub fn new() -> Result<Self, String> {
        Self::with_config(&[])
    }

    /// 先写入配置项，再组装 AppState（配置在组装时加载）
    pub fn with_config(entries: &[(&str, &str)]) -> Result<Self, String> {
        let (temp_file, db_path) = create_test_db().map_err(|e| e.to_string())?;

        if !entries.is_empty() {
            let manager = ConfigManager::new(&db_path).map_err(|e| e.to_string())?;
            for (key, value) in entries {
                manager
                    .set_global_config_value(key, value)
                    .map_err(|e| e.to_string())?;
            }
        }

        let state = AppState::new(db_path.clone())?;

        Ok(Self {
            db_path,
            production_api: state.production_api,
            rule_api: state.rule_api,
            inventory_api: state.inventory_api,
            assembly_api: state.assembly_api,
            config_manager: state.config_manager,
            _temp_file: temp_file,
        })
    }

    // ==========================================
    // 数据准备
    // ==========================================

    pub fn create_rule(&self, draft: RoutingRuleDraft) -> RoutingRule {
        self.rule_api.create_rule(draft).expect("创建入库规则失败")
    }

    /// 以普通工人身份录入半成品计件记录
    pub fn record_semi_finished(
        &self,
        product_name: &str,
        spec: &str,
        material: &str,
        quantity: i64,
    ) -> ProductionCreateResult {
        self.production_api
            .create(
                NewProductionRecord::new("张三", product_name, quantity)
                    .with_spec(spec, material)
                    .semi_finished("是"),
                WORKER,
            )
            .expect("录入计件记录失败")
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按名称/规格/材质查找零件库存行
    pub fn find_part(&self, name: &str, spec: Option<&str>, material: Option<&str>) -> Option<InventoryItem> {
        self.inventory_api
            .list_parts()
            .expect("查询零件库存失败")
            .into_iter()
            .find(|item| {
                item.product_name == name
                    && item.specification.as_deref() == spec
                    && item.material.as_deref() == material
            })
    }

    pub fn part_quantity(&self, name: &str, spec: Option<&str>, material: Option<&str>) -> Option<i64> {
        self.find_part(name, spec, material).map(|item| item.quantity)
    }

    pub fn find_blank(&self, name: &str, spec: Option<&str>, material: Option<&str>) -> Option<BlankInventory> {
        self.inventory_api
            .list_blanks()
            .expect("查询毛坯库存失败")
            .into_iter()
            .find(|blank| {
                blank.product_name == name
                    && blank.specification.as_deref() == spec
                    && blank.material.as_deref() == material
            })
    }

    pub fn blank_quantity(&self, name: &str, spec: Option<&str>, material: Option<&str>) -> Option<i64> {
        self.find_blank(name, spec, material).map(|blank| blank.quantity)
    }
}

// ==========================================
// 断言辅助函数
// ==========================================

/// 验证是否为无效输入错误
pub fn assert_invalid_input(result: Result<impl std::fmt::Debug, ApiError>) {
    match result {
        Err(ApiError::InvalidInput(_)) => {}
        Ok(val) => panic!("预期InvalidInput错误，但操作成功: {:?}", val),
        Err(e) => panic!("预期InvalidInput错误，但得到: {:?}", e),
    }
}

/// 验证是否为资源未找到错误
pub fn assert_not_found(result: Result<impl std::fmt::Debug, ApiError>) {
    match result {
        Err(ApiError::NotFound(_)) => {}
        Ok(val) => panic!("预期NotFound错误，但操作成功: {:?}", val),
        Err(e) => panic!("预期NotFound错误，但得到: {:?}", e),
    }
}
