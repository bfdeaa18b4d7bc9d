// ==========================================
// 仓储计件库存系统 - 入库规则匹配器
// ==========================================
// 规则: 仅已启用规则参与; 优先级高者先试; 同优先级保持列表顺序
// 模式: `%` 匹配任意字符序列（可为空），其余字符按字面匹配
// ==========================================

use crate::domain::rule::RoutingRule;
use tracing::debug;

/// 产品名是否匹配规则模式
///
/// 无通配符时为精确相等
pub fn pattern_matches(pattern: &str, product_name: &str) -> bool {
    if !pattern.contains('%') {
        return pattern == product_name;
    }

    let segments: Vec<&str> = pattern.split('%').collect();
    let last = segments.len() - 1;
    let mut rest = product_name;

    for (idx, segment) in segments.iter().enumerate() {
        if segment.is_empty() {
            continue;
        }
        if idx == 0 {
            match rest.strip_prefix(segment) {
                Some(tail) => rest = tail,
                None => return false,
            }
        } else if idx == last {
            return rest.ends_with(segment);
        } else {
            match rest.find(segment) {
                Some(pos) => rest = &rest[pos + segment.len()..],
                None => return false,
            }
        }
    }

    true
}

/// RuleMatcher - 入库规则匹配器
pub struct RuleMatcher;

impl RuleMatcher {
    /// 为产品名选出一条规则
    ///
    /// 入参规则应按 id 升序排列；未命中返回 None
    pub fn find_matching_rule<'a>(
        rules: &'a [RoutingRule],
        product_name: &str,
    ) -> Option<&'a RoutingRule> {
        let mut candidates: Vec<&RoutingRule> = rules.iter().filter(|r| r.is_enabled).collect();
        // sort_by 为稳定排序，同优先级保持原顺序
        candidates.sort_by(|a, b| b.priority.cmp(&a.priority));

        let hit = candidates
            .into_iter()
            .find(|r| pattern_matches(&r.product_pattern, product_name));

        match hit {
            Some(rule) => debug!(
                product_name = product_name,
                rule_id = rule.id,
                pattern = %rule.product_pattern,
                "入库规则命中"
            ),
            None => debug!(product_name = product_name, "无匹配入库规则"),
        }
        hit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn rule(id: i64, pattern: &str, priority: i32, enabled: bool) -> RoutingRule {
        let now = Utc::now().naive_utc();
        RoutingRule {
            id,
            rule_name: format!("规则{}", id),
            product_pattern: pattern.to_string(),
            target_location: format!("库位{}", id),
            storage_ratio: None,
            priority,
            is_enabled: enabled,
            description: None,
            is_finished_product: false,
            blank_product_name: None,
            blank_quantity_per_unit: 1,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_trailing_wildcard() {
        assert!(pattern_matches("球阀%", "球阀DN50"));
        assert!(pattern_matches("球阀%", "球阀"));
        assert!(!pattern_matches("球阀%", "闸阀DN50"));
    }

    #[test]
    fn test_no_wildcard_is_exact() {
        assert!(pattern_matches("球阀", "球阀"));
        assert!(!pattern_matches("球阀", "球阀DN50"));
        assert!(!pattern_matches("球阀", "大球阀"));
    }

    #[test]
    fn test_inner_and_leading_wildcards() {
        assert!(pattern_matches("%阀体", "球阀阀体"));
        assert!(pattern_matches("球%体", "球阀阀体"));
        assert!(pattern_matches("%", ""));
        assert!(pattern_matches("%DN%", "球阀DN50"));
        assert!(!pattern_matches("球%体", "球阀阀盖"));
        // 前后段不能重叠使用同一字符
        assert!(!pattern_matches("阀%阀", "阀"));
    }

    #[test]
    fn test_regex_metacharacters_are_literal() {
        assert!(pattern_matches("A.B%", "A.B-1"));
        assert!(!pattern_matches("A.B%", "AxB-1"));
        assert!(pattern_matches("阀_1", "阀_1"));
        assert!(!pattern_matches("阀_1", "阀x1"));
    }

    #[test]
    fn test_priority_and_tie_break() {
        let rules = vec![
            rule(1, "球阀%", 100, true),
            rule(2, "球阀%", 300, true),
            rule(3, "球阀%", 300, true),
        ];
        let hit = RuleMatcher::find_matching_rule(&rules, "球阀DN50").unwrap();
        assert_eq!(hit.id, 2);
    }

    #[test]
    fn test_disabled_rules_are_ignored() {
        let rules = vec![rule(1, "球阀%", 900, false), rule(2, "%", 1, true)];
        let hit = RuleMatcher::find_matching_rule(&rules, "球阀DN50").unwrap();
        assert_eq!(hit.id, 2);
        assert!(RuleMatcher::find_matching_rule(&rules[..1], "球阀DN50").is_none());
    }
}
