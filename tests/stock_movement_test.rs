// ==========================================
// 自动入库集成测试
// ==========================================
// 测试范围:
// 1. 入库比例换算与截断
// 2. 成品规则扣毛坯（含自动建行、欠料）
// 3. 录入门控: 管理员 / 非半成品 / 无匹配规则
// 4. 规则优先级
// ==========================================

mod helpers;

use helpers::api_test_helper::*;
use rust_decimal::Decimal;
use wms_inventory_ledger::domain::production::NewProductionRecord;
use wms_inventory_ledger::domain::rule::RoutingRuleDraft;
use wms_inventory_ledger::domain::types::PoolKind;

// ==========================================
// 比例换算
// ==========================================

#[test]
fn test_ratio_overflow_rejects_whole_record() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_rule(RoutingRuleDraft::new("球阀", "球阀%", "球阀库").with_ratio("1:2"));

    assert_invalid_input(env.production_api.create(
        NewProductionRecord::new("张三", "球阀DN50", i64::MAX)
            .with_spec("DN50", "304")
            .semi_finished("是"),
        WORKER,
    ));

    // 同一事务内的记录也不落库
    assert!(env.production_api.list().unwrap().is_empty());
    assert!(env.find_part("球阀库", Some("DN50"), Some("304")).is_none());
}

#[test]
fn test_blank_consumption_overflow_is_rejected() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_rule(RoutingRuleDraft::new("阀体", "阀体%", "阀体库").with_blank("阀体毛坯", 3));

    assert_invalid_input(env.production_api.create(
        NewProductionRecord::new("张三", "阀体DN50", i64::MAX / 2)
            .with_spec("DN50", "304")
            .semi_finished("是"),
        WORKER,
    ));
    assert!(env.find_blank("阀体毛坯", Some("DN50"), Some("304")).is_none());
}

#[test]
fn test_ratio_truncates_toward_zero() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let rule = env.create_rule(RoutingRuleDraft::new("球阀", "球阀%", "球阀库").with_ratio("2:1"));

    let result = env.record_semi_finished("球阀DN50", "DN50", "304", 5);

    assert_eq!(result.rule_id, Some(rule.id));
    assert_eq!(env.part_quantity("球阀库", Some("DN50"), Some("304")), Some(2));

    assert_eq!(result.ledger_entries.len(), 1);
    let entry = &result.ledger_entries[0];
    assert_eq!(entry.pool_kind, PoolKind::Parts);
    assert_eq!(entry.product_name, "球阀库");
    assert_eq!(entry.original_quantity, 5);
    assert_eq!(entry.quantity_change, 2);
    assert_eq!(entry.calculation_factor, 0.5);
    assert_eq!(entry.production_record_id, Some(result.record.id));
    assert_eq!(entry.rule_id, Some(rule.id));
}

#[test]
fn test_ratio_multiplies_and_accumulates() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_rule(RoutingRuleDraft::new("闸阀", "闸阀%", "闸阀库").with_ratio("1:2"));

    env.record_semi_finished("闸阀DN80", "DN80", "304", 3);
    env.record_semi_finished("闸阀DN80", "DN80", "304", 4);

    assert_eq!(env.part_quantity("闸阀库", Some("DN80"), Some("304")), Some(14));
    // 同键只有一行
    let rows: Vec<_> = env
        .inventory_api
        .list_parts()
        .unwrap()
        .into_iter()
        .filter(|item| item.product_name == "闸阀库")
        .collect();
    assert_eq!(rows.len(), 1);
}

#[test]
fn test_malformed_ratio_falls_back_to_one_to_one() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    // 格式错误的比例允许保存，执行时按 1:1
    env.create_rule(RoutingRuleDraft::new("蝶阀", "蝶阀%", "蝶阀库").with_ratio("两比一"));

    let result = env.record_semi_finished("蝶阀DN100", "DN100", "WCB", 7);

    assert_eq!(env.part_quantity("蝶阀库", Some("DN100"), Some("WCB")), Some(7));
    assert_eq!(result.ledger_entries[0].calculation_factor, 1.0);
}

#[test]
fn test_new_parts_row_copies_record_attributes() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_rule(RoutingRuleDraft::new("球阀", "球阀%", "球阀库"));

    let mut record = NewProductionRecord::new("李四", "球阀DN25", 2)
        .with_spec("DN25", "316")
        .with_unit_price(Decimal::new(35, 1))
        .semi_finished("是");
    record.connection_type = Some("螺纹".to_string());
    env.production_api.create(record, WORKER).unwrap();

    let item = env.find_part("球阀库", Some("DN25"), Some("316")).unwrap();
    assert_eq!(item.connection_type.as_deref(), Some("螺纹"));
    assert_eq!(item.unit, "个");
    assert_eq!(item.unit_price, Some(Decimal::new(35, 1)));
}

// ==========================================
// 毛坯扣减
// ==========================================

#[test]
fn test_blank_consumption_counts_defects() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_rule(RoutingRuleDraft::new("阀体", "阀体%", "阀体库").with_blank("阀体毛坯", 3));

    let result = env
        .production_api
        .create(
            NewProductionRecord::new("张三", "阀体DN50", 10)
                .with_spec("DN50", "304")
                .with_defects(2)
                .semi_finished("是"),
            WORKER,
        )
        .unwrap();

    // 毛坯行不存在时自动创建（数量 0），扣减后为 -36
    let blank = env.find_blank("阀体毛坯", Some("DN50"), Some("304")).unwrap();
    assert_eq!(blank.quantity, -36);
    assert!(blank.is_owed());
    assert_eq!(blank.remarks.as_deref(), Some("计件扣料自动创建"));

    // 零件只按良品入库
    assert_eq!(env.part_quantity("阀体库", Some("DN50"), Some("304")), Some(10));

    // 毛坯账本在前
    assert_eq!(result.ledger_entries.len(), 2);
    let blank_entry = &result.ledger_entries[0];
    assert_eq!(blank_entry.pool_kind, PoolKind::Blank);
    assert_eq!(blank_entry.product_name, "阀体毛坯");
    assert_eq!(blank_entry.original_quantity, 12);
    assert_eq!(blank_entry.quantity_change, -36);
    assert_eq!(result.ledger_entries[1].pool_kind, PoolKind::Parts);

    let stats = env.inventory_api.stats().unwrap();
    assert_eq!(stats.owed_blank_rows, 1);
}

#[test]
fn test_blank_consumption_from_existing_stock() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_rule(RoutingRuleDraft::new("阀盖", "阀盖%", "阀盖库").with_blank("阀盖毛坯", 2));
    env.inventory_api
        .receive_blank(
            wms_inventory_ledger::api::BlankReceipt::new("阀盖毛坯", 50)
                .with_spec(Some("DN50"), Some("304")),
        )
        .unwrap();

    env.record_semi_finished("阀盖DN50", "DN50", "304", 8);

    assert_eq!(env.blank_quantity("阀盖毛坯", Some("DN50"), Some("304")), Some(34));
    // 不同规格是另一行毛坯
    env.record_semi_finished("阀盖DN80", "DN80", "304", 1);
    assert_eq!(env.blank_quantity("阀盖毛坯", Some("DN80"), Some("304")), Some(-2));
    assert_eq!(env.blank_quantity("阀盖毛坯", Some("DN50"), Some("304")), Some(34));
}

#[test]
fn test_non_finished_rule_does_not_touch_blanks() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let mut draft = RoutingRuleDraft::new("阀杆", "阀杆%", "阀杆库");
    draft.blank_product_name = Some("阀杆毛坯".to_string());
    env.create_rule(draft);

    let result = env.record_semi_finished("阀杆DN50", "DN50", "304", 4);

    assert_eq!(result.ledger_entries.len(), 1);
    assert!(env.inventory_api.list_blanks().unwrap().is_empty());
}

// ==========================================
// 录入门控
// ==========================================

#[test]
fn test_admin_record_is_saved_without_movement() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_rule(RoutingRuleDraft::new("球阀", "球阀%", "球阀库"));

    let result = env
        .production_api
        .create(
            NewProductionRecord::new("管理员", "球阀DN50", 5)
                .with_spec("DN50", "304")
                .semi_finished("是"),
            "admin",
        )
        .unwrap();

    assert!(result.rule_id.is_none());
    assert!(result.ledger_entries.is_empty());
    assert!(env.production_api.get(result.record.id).unwrap().is_some());
    assert!(env.inventory_api.list_parts().unwrap().is_empty());
}

#[test]
fn test_finished_record_is_saved_without_movement() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_rule(RoutingRuleDraft::new("球阀", "球阀%", "球阀库"));

    let result = env
        .production_api
        .create(
            NewProductionRecord::new("张三", "球阀DN50", 5)
                .with_spec("DN50", "304")
                .semi_finished("否"),
            WORKER,
        )
        .unwrap();

    assert!(result.ledger_entries.is_empty());
    assert!(env.inventory_api.list_parts().unwrap().is_empty());
}

#[test]
fn test_no_matching_rule_is_not_an_error() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_rule(RoutingRuleDraft::new("球阀", "球阀", "球阀库"));

    // 无通配符时必须完全相等
    let result = env.record_semi_finished("球阀DN50", "DN50", "304", 5);
    assert!(result.rule_id.is_none());
    assert!(env.inventory_api.list_parts().unwrap().is_empty());

    let result = env.record_semi_finished("球阀", "DN50", "304", 5);
    assert!(result.rule_id.is_some());
    assert_eq!(env.part_quantity("球阀库", Some("DN50"), Some("304")), Some(5));
}

#[test]
fn test_invalid_record_is_rejected() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");

    assert_invalid_input(
        env.production_api
            .create(NewProductionRecord::new(" ", "球阀", 1), WORKER),
    );
    assert_invalid_input(
        env.production_api
            .create(NewProductionRecord::new("张三", "球阀", -1), WORKER),
    );
    assert_invalid_input(env.production_api.create(
        NewProductionRecord::new("张三", "球阀", 1).with_defects(-2),
        WORKER,
    ));
    assert!(env.production_api.list().unwrap().is_empty());
}

// ==========================================
// 规则优先级
// ==========================================

#[test]
fn test_higher_priority_rule_wins() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_rule(RoutingRuleDraft::new("通用", "%", "杂件库").with_priority(1));
    let specific = env.create_rule(
        RoutingRuleDraft::new("球阀", "球阀%", "球阀库").with_priority(10),
    );

    let result = env.record_semi_finished("球阀DN50", "DN50", "304", 1);
    assert_eq!(result.rule_id, Some(specific.id));

    let result = env.record_semi_finished("闸阀DN50", "DN50", "304", 1);
    assert_eq!(env.part_quantity("杂件库", Some("DN50"), Some("304")), Some(1));
    assert_ne!(result.rule_id, Some(specific.id));
}

#[test]
fn test_equal_priority_first_created_wins() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    let first = env.create_rule(RoutingRuleDraft::new("甲", "球阀%", "甲库"));
    env.create_rule(RoutingRuleDraft::new("乙", "%DN50", "乙库"));

    let result = env.record_semi_finished("球阀DN50", "DN50", "304", 1);
    assert_eq!(result.rule_id, Some(first.id));
    assert!(env.find_part("乙库", Some("DN50"), Some("304")).is_none());
}

#[test]
fn test_disabled_rule_is_skipped() {
    let env = ApiTestEnv::new().expect("无法创建测试环境");
    env.create_rule(
        RoutingRuleDraft::new("禁用", "球阀%", "禁用库")
            .with_priority(99)
            .disabled(),
    );
    let enabled = env.create_rule(RoutingRuleDraft::new("启用", "球阀%", "球阀库"));

    let result = env.record_semi_finished("球阀DN50", "DN50", "304", 2);
    assert_eq!(result.rule_id, Some(enabled.id));
}
