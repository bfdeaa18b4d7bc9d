// ==========================================
// 配置集成测试
// ==========================================
// 测试范围:
// 1. 配置读写与快照
// 2. 配置项对录入门控、默认单位、装配评分的影响
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use test_helpers::seed_part;
use wms_inventory_ledger::config::{config_keys, ConfigManager, EngineConfig};
use wms_inventory_ledger::domain::assembly::{NewAssemblyRecord, NewAssemblyRule};
use wms_inventory_ledger::domain::production::NewProductionRecord;
use wms_inventory_ledger::domain::rule::RoutingRuleDraft;

// ==========================================
// 读写 / 快照
// ==========================================

#[test]
fn test_defaults_when_unset() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let config = env.config_manager.load_engine_config().unwrap();
    assert_eq!(config, EngineConfig::default());
    assert_eq!(config.legacy_blank_connection_marker, "中头盖");
    assert_eq!(config.score_quantity_cap, 1000);
    assert_eq!(config.default_unit, "个");
    assert_eq!(config.semi_finished_flag, "是");
    assert_eq!(config.admin_role, "ADMIN");
}

#[test]
fn test_set_overwrites_and_snapshot_lists_values() {
    let (_file, db_path) = test_helpers::create_test_db().unwrap();
    let manager = ConfigManager::new(&db_path).unwrap();

    manager.set_global_config_value(config_keys::DEFAULT_UNIT, "件").unwrap();
    manager.set_global_config_value(config_keys::DEFAULT_UNIT, "套").unwrap();
    assert_eq!(
        manager.get_global_config_value(config_keys::DEFAULT_UNIT).unwrap().as_deref(),
        Some("套")
    );
    assert_eq!(manager.get_default_unit().unwrap(), "套");

    let snapshot: serde_json::Value =
        serde_json::from_str(&manager.get_config_snapshot().unwrap()).unwrap();
    assert_eq!(snapshot[config_keys::DEFAULT_UNIT], "套");
}

#[test]
fn test_malformed_cap_falls_back() {
    let env = ApiTestEnv::with_config(&[(config_keys::SCORE_QUANTITY_CAP, "很多")])
        .expect("无法创建测试环境");
    assert_eq!(env.config_manager.get_score_quantity_cap().unwrap(), 1000);
}

// ==========================================
// 配置生效
// ==========================================

#[test]
fn test_custom_admin_role_and_semi_finished_flag() {
    let env = ApiTestEnv::with_config(&[
        (config_keys::ADMIN_ROLE, "主管"),
        (config_keys::SEMI_FINISHED_FLAG, "Y"),
    ])
    .expect("无法创建测试环境");
    env.create_rule(RoutingRuleDraft::new("球阀", "球阀%", "球阀库"));

    let record = || {
        NewProductionRecord::new("张三", "球阀DN50", 2)
            .with_spec("DN50", "304")
            .semi_finished("Y")
    };

    // "ADMIN" 不再是管理员
    let result = env.production_api.create(record(), "ADMIN").unwrap();
    assert!(result.rule_id.is_some());

    let result = env.production_api.create(record(), "主管").unwrap();
    assert!(result.rule_id.is_none());

    // 旧标记不再视为半成品
    let result = env
        .production_api
        .create(record().semi_finished("是"), WORKER)
        .unwrap();
    assert!(result.rule_id.is_none());

    assert_eq!(env.part_quantity("球阀库", Some("DN50"), Some("304")), Some(2));
}

#[test]
fn test_default_unit_applies_to_new_rows() {
    let env = ApiTestEnv::with_config(&[(config_keys::DEFAULT_UNIT, "件")])
        .expect("无法创建测试环境");
    env.create_rule(RoutingRuleDraft::new("阀体", "阀体%", "阀体库").with_blank("阀体毛坯", 1));

    env.record_semi_finished("阀体DN50", "DN50", "304", 1);

    assert_eq!(env.find_part("阀体库", Some("DN50"), Some("304")).unwrap().unit, "件");
    assert_eq!(env.find_blank("阀体毛坯", Some("DN50"), Some("304")).unwrap().unit, "件");
}

#[test]
fn test_score_cap_controls_quantity_preference() {
    let setup = |env: &ApiTestEnv| -> (i64, i64, i64) {
        let rule_id = env
            .assembly_api
            .create_rule(NewAssemblyRule::new("阀体组件", "阀体组件").component("阀体", 1))
            .unwrap()
            .id;
        let small = seed_part(&env.db_path, "阀体", Some("DN50"), Some("304"), None, 2);
        let large = seed_part(&env.db_path, "阀体", Some("DN50"), Some("304"), None, 50);
        (rule_id, small, large)
    };
    let check_request = |rule_id: i64| {
        NewAssemblyRecord::new(rule_id, "阀体组件", 1)
            .with_spec(Some("DN50"), Some("304"), None)
            .check_request()
    };

    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let (rule_id, _, large) = setup(&env);
    let check = env.assembly_api.check(&check_request(rule_id)).unwrap();
    assert_eq!(check.parts[0].matched_item_id, Some(large));

    // 上限为 0 时数量不参与评分，同分取先扫描到的行
    let capped = ApiTestEnv::with_config(&[(config_keys::SCORE_QUANTITY_CAP, "0")])
        .expect("无法创建测试环境");
    let (rule_id, small, _) = setup(&capped);
    let check = capped.assembly_api.check(&check_request(rule_id)).unwrap();
    assert_eq!(check.parts[0].matched_item_id, Some(small));
}

#[test]
fn test_custom_legacy_marker() {
    let env = ApiTestEnv::with_config(&[(config_keys::LEGACY_BLANK_CONNECTION_MARKER, "阀盖")])
        .expect("无法创建测试环境");
    let rule_id = env
        .assembly_api
        .create_rule(NewAssemblyRule::new("阀盖组件", "阀盖组件").component("阀盖", 1))
        .unwrap()
        .id;
    seed_part(&env.db_path, "阀盖", Some("DN50"), Some("304"), None, 1);

    let check = env
        .assembly_api
        .check(
            &NewAssemblyRecord::new(rule_id, "阀盖组件", 1)
                .with_spec(Some("DN50"), Some("304"), Some("螺纹"))
                .check_request(),
        )
        .unwrap();
    assert!(check.can_assemble);
}
