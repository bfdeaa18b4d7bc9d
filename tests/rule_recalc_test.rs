// ==========================================
// 入库规则维护与重算集成测试
// ==========================================
// 测试范围:
// 1. 修改规则后历史记录按新规则重放
// 2. 删除规则不回滚历史
// 3. 启停、批量改名
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use test_helpers::seed_part;
use wms_inventory_ledger::domain::rule::RoutingRuleDraft;

// ==========================================
// 规则修改重算
// ==========================================

#[test]
fn test_ratio_change_matches_fresh_creation() {
    let quantities = [5, 7, 3];

    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let rule = env.create_rule(RoutingRuleDraft::new("球阀", "球阀%", "球阀库").with_ratio("1:1"));
    for qty in quantities {
        env.record_semi_finished("球阀DN50", "DN50", "304", qty);
    }
    assert_eq!(env.part_quantity("球阀库", Some("DN50"), Some("304")), Some(15));

    let report = env
        .rule_api
        .update_and_recalculate(rule.id, RoutingRuleDraft::from(&rule).with_ratio("2:1"))
        .unwrap();

    assert_eq!(report.rollback.reversed, 3);
    assert_eq!(report.rollback.removed_rows, 1);
    assert_eq!(report.replayed_records, 3);
    assert_eq!(report.skipped_records, 0);
    assert_eq!(report.new_entries, 3);
    assert_eq!(report.rule.storage_ratio.as_deref(), Some("2:1"));
    assert!(!report.run_id.is_empty());

    // 对照: 一开始就用 2:1
    let fresh = ApiTestEnv::new().expect("无法创建测试环境");
    fresh.create_rule(RoutingRuleDraft::new("球阀", "球阀%", "球阀库").with_ratio("2:1"));
    for qty in quantities {
        fresh.record_semi_finished("球阀DN50", "DN50", "304", qty);
    }

    let expected = fresh.part_quantity("球阀库", Some("DN50"), Some("304"));
    assert_eq!(expected, Some(2 + 3 + 1));
    assert_eq!(env.part_quantity("球阀库", Some("DN50"), Some("304")), expected);

    let ledger = env.inventory_api.ledger_by_rule(rule.id).unwrap();
    assert_eq!(ledger.len(), 3);
    assert!(ledger.iter().all(|e| e.calculation_factor == 0.5));
}

#[test]
fn test_target_change_moves_stock() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let rule = env.create_rule(RoutingRuleDraft::new("闸阀", "闸阀%", "闸阀库"));
    env.record_semi_finished("闸阀DN80", "DN80", "WCB", 6);
    env.record_semi_finished("闸阀DN80", "DN80", "WCB", 4);

    let mut draft = RoutingRuleDraft::from(&rule);
    draft.target_location = "闸阀二号库".to_string();
    env.rule_api.update_and_recalculate(rule.id, draft).unwrap();

    assert!(env.find_part("闸阀库", Some("DN80"), Some("WCB")).is_none());
    assert_eq!(env.part_quantity("闸阀二号库", Some("DN80"), Some("WCB")), Some(10));
}

#[test]
fn test_blank_parameters_change_is_replayed() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let rule = env.create_rule(RoutingRuleDraft::new("阀体", "阀体%", "阀体库").with_blank("阀体毛坯", 2));
    env.record_semi_finished("阀体DN50", "DN50", "304", 4);
    assert_eq!(env.blank_quantity("阀体毛坯", Some("DN50"), Some("304")), Some(-8));

    let report = env
        .rule_api
        .update_and_recalculate(rule.id, RoutingRuleDraft::from(&rule).with_blank("阀体毛坯", 3))
        .unwrap();

    // 毛坯 + 零件各一笔，只重放一次记录
    assert_eq!(report.rollback.reversed, 2);
    assert_eq!(report.replayed_records, 1);
    assert_eq!(report.new_entries, 2);
    assert_eq!(env.blank_quantity("阀体毛坯", Some("DN50"), Some("304")), Some(-12));
    assert_eq!(env.part_quantity("阀体库", Some("DN50"), Some("304")), Some(4));
}

#[test]
fn test_disabled_rule_is_still_replayed() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let rule = env.create_rule(RoutingRuleDraft::new("球阀", "球阀%", "球阀库"));
    env.record_semi_finished("球阀DN50", "DN50", "304", 3);

    let report = env
        .rule_api
        .update_and_recalculate(rule.id, RoutingRuleDraft::from(&rule).disabled())
        .unwrap();

    assert!(!report.rule.is_enabled);
    assert_eq!(report.replayed_records, 1);
    assert_eq!(env.part_quantity("球阀库", Some("DN50"), Some("304")), Some(3));

    // 禁用只影响之后的匹配
    let later = env.record_semi_finished("球阀DN50", "DN50", "304", 3);
    assert!(later.rule_id.is_none());
    assert_eq!(env.part_quantity("球阀库", Some("DN50"), Some("304")), Some(3));
}

#[test]
fn test_deleted_record_is_not_replayed() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let rule = env.create_rule(RoutingRuleDraft::new("球阀", "球阀%", "球阀库"));
    let kept = env.record_semi_finished("球阀DN50", "DN50", "304", 3);
    let removed = env.record_semi_finished("球阀DN50", "DN50", "304", 5);
    env.production_api
        .delete_with_rollback(removed.record.id)
        .unwrap();

    let report = env
        .rule_api
        .update_and_recalculate(rule.id, RoutingRuleDraft::from(&rule).with_ratio("1:2"))
        .unwrap();

    assert_eq!(report.replayed_records, 1);
    assert_eq!(env.part_quantity("球阀库", Some("DN50"), Some("304")), Some(6));
    assert_eq!(env.production_api.ledger_of(kept.record.id).unwrap().len(), 1);
}

#[test]
fn test_update_unknown_rule_is_not_found() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    assert_not_found(
        env.rule_api
            .update_and_recalculate(77, RoutingRuleDraft::new("x", "x%", "x库")),
    );
}

#[test]
fn test_invalid_draft_is_rejected() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    assert_invalid_input(env.rule_api.create_rule(RoutingRuleDraft::new("", "球阀%", "球阀库")));
    assert_invalid_input(env.rule_api.create_rule(RoutingRuleDraft::new("球阀", " ", "球阀库")));
    assert_invalid_input(env.rule_api.create_rule(RoutingRuleDraft::new("球阀", "球阀%", "")));
    assert_invalid_input(
        env.rule_api
            .create_rule(RoutingRuleDraft::new("阀体", "阀体%", "阀体库").with_blank("阀体毛坯", 0)),
    );
    assert!(env.rule_api.list_rules().unwrap().is_empty());
}

// ==========================================
// 删除 / 启停
// ==========================================

#[test]
fn test_delete_rule_keeps_history() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let rule = env.create_rule(RoutingRuleDraft::new("球阀", "球阀%", "球阀库"));
    env.record_semi_finished("球阀DN50", "DN50", "304", 3);
    env.record_semi_finished("球阀DN50", "DN50", "304", 2);

    let remaining = env.rule_api.delete_rule(rule.id).unwrap();

    assert_eq!(remaining, 2);
    assert!(env.rule_api.get_rule(rule.id).unwrap().is_none());
    assert_eq!(env.rule_api.ledger_count(rule.id).unwrap(), 2);
    assert_eq!(env.part_quantity("球阀库", Some("DN50"), Some("304")), Some(5));

    assert_not_found(env.rule_api.delete_rule(rule.id));
}

#[test]
fn test_toggle_does_not_reprocess() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let rule = env.create_rule(RoutingRuleDraft::new("球阀", "球阀%", "球阀库"));
    env.record_semi_finished("球阀DN50", "DN50", "304", 3);

    let toggled = env.rule_api.toggle_enabled(rule.id).unwrap();
    assert!(!toggled.is_enabled);
    assert_eq!(env.part_quantity("球阀库", Some("DN50"), Some("304")), Some(3));
    assert_eq!(env.rule_api.ledger_count(rule.id).unwrap(), 1);

    let toggled = env.rule_api.toggle_enabled(rule.id).unwrap();
    assert!(toggled.is_enabled);
    assert!(env.rule_api.get_rule(rule.id).unwrap().unwrap().is_enabled);

    assert_not_found(env.rule_api.toggle_enabled(999));
}

// ==========================================
// 批量改名
// ==========================================

#[test]
fn test_reapply_all_rules_renames_and_merges() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_rule(RoutingRuleDraft::new("球阀", "球阀%", "球阀库"));
    env.record_semi_finished("球阀", "DN50", "304", 6);

    seed_part(&env.db_path, "球阀DN50", Some("DN50"), Some("304"), None, 4);
    seed_part(&env.db_path, "球阀DN80", Some("DN80"), Some("304"), None, 9);
    seed_part(&env.db_path, "闸阀", Some("DN50"), Some("304"), None, 1);

    let report = env.rule_api.reapply_all_rules().unwrap();

    assert_eq!(report.processed, 4);
    assert_eq!(report.updated, 2);
    assert_eq!(env.part_quantity("球阀库", Some("DN50"), Some("304")), Some(10));
    assert_eq!(env.part_quantity("球阀库", Some("DN80"), Some("304")), Some(9));
    assert!(env.find_part("球阀DN50", Some("DN50"), Some("304")).is_none());
    assert_eq!(env.part_quantity("闸阀", Some("DN50"), Some("304")), Some(1));
    assert_eq!(env.inventory_api.list_parts().unwrap().len(), 3);

    // 再执行一次没有变化
    let again = env.rule_api.reapply_all_rules().unwrap();
    assert_eq!(again.updated, 0);
}
