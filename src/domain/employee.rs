// ==========================================
// WorkWatch 报表导入 - 主数据领域模型
// ==========================================
// 员工 / BLE 标签 / 区域
// 用途: 对账器写入，导入流程只读（员工占位名除外）
// ==========================================

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// 员工首次出现且报表未给出姓名时使用的占位名
pub const PLACEHOLDER_NAME: &str = "Unknown";

// ==========================================
// Employee - 员工（身份维度）
// ==========================================
// 对齐: employees 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Employee {
    pub id: i64,                    // 内部ID（库分配）
    pub tn_number: i64,             // 工号（业务主键，唯一）
    pub name: String,               // 显示名
    pub department: Option<String>, // 部门
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

impl Employee {
    /// 是否仍为占位名（可被报表中的真实姓名覆盖）
    pub fn has_placeholder_name(&self) -> bool {
        is_placeholder_name(&self.name)
    }
}

/// 判断姓名是否为占位值（空白或 Unknown）
pub fn is_placeholder_name(name: &str) -> bool {
    let trimmed = name.trim();
    trimmed.is_empty() || trimmed.eq_ignore_ascii_case(PLACEHOLDER_NAME)
}

// ==========================================
// EmployeeUpsert - 对账器写入的员工行
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub struct EmployeeUpsert {
    pub tn_number: i64,
    /// 为空时: 新建取占位名，已存在则保留原姓名
    pub name: Option<String>,
    /// 为空时保留原部门
    pub department: Option<String>,
}

// ==========================================
// Tag - BLE 标签
// ==========================================
// 对齐: tags 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub tag_number: i64,
    pub description: Option<String>,
}

// ==========================================
// Zone - 区域
// ==========================================
// 对齐: zones 表（固定字典）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub zone_id: i64,
    pub name: String,
}
