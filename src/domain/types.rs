// ==========================================
// 仓储计件库存系统 - 领域类型定义
// ==========================================
// 职责: 库存池类型、操作角色、装配状态等枚举
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 库存池类型 (Pool Kind)
// ==========================================
// 账本 inventory_type 字段取值: parts / blank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PoolKind {
    Parts, // 零件库存（入库目标位置）
    Blank, // 毛坯库存（原材料）
}

impl PoolKind {
    /// 数据库存储值
    pub fn to_db_str(&self) -> &'static str {
        match self {
            PoolKind::Parts => "parts",
            PoolKind::Blank => "blank",
        }
    }

    /// 从数据库值解析（未知值返回 None）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim() {
            "parts" => Some(PoolKind::Parts),
            "blank" => Some(PoolKind::Blank),
            _ => None,
        }
    }
}

impl fmt::Display for PoolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_str())
    }
}

// ==========================================
// 操作角色 (Operator Role)
// ==========================================
// 管理员录入的计件记录不触发自动入库
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperatorRole {
    Admin,
    Worker,
}

impl OperatorRole {
    /// 按配置的管理员角色名解析（大小写不敏感）
    pub fn parse(raw: &str, admin_role: &str) -> Self {
        if raw.trim().eq_ignore_ascii_case(admin_role.trim()) {
            OperatorRole::Admin
        } else {
            OperatorRole::Worker
        }
    }
}

impl fmt::Display for OperatorRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorRole::Admin => write!(f, "ADMIN"),
            OperatorRole::Worker => write!(f, "WORKER"),
        }
    }
}

// ==========================================
// 装配记录状态
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssemblyStatus {
    Completed,
}

impl AssemblyStatus {
    pub fn to_db_str(&self) -> &'static str {
        match self {
            AssemblyStatus::Completed => "completed",
        }
    }

    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim() {
            "completed" => Some(AssemblyStatus::Completed),
            _ => None,
        }
    }
}

/// 判断可选字符串是否为空白（None / 空串 / 全空白）
pub fn is_blank(value: Option<&str>) -> bool {
    value.map_or(true, |s| s.trim().is_empty())
}
