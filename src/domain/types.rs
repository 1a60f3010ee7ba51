// ==========================================
// WorkWatch 报表导入 - 领域类型定义
// ==========================================
// 报表种类 / 类型提示 / 导入状态
// 序列化格式: snake_case (与数据库一致)
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// 报表种类 (Report Kind)
// ==========================================
// 对应设备导出的三种表格版式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Shift,    // 班次汇总（report 8）
    Downtime, // 停工事件（report 10）
    Presence, // 定位日志（report 11，BLE 标签）
}

impl ReportKind {
    /// 转换为数据库存储的字符串
    pub fn to_db_str(&self) -> &'static str {
        match self {
            ReportKind::Shift => "shift",
            ReportKind::Downtime => "downtime",
            ReportKind::Presence => "presence",
        }
    }

    /// 从数据库字符串解析（兼容 report8/report10/report11 旧写法）
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "shift" | "report8" | "report_8" => Some(ReportKind::Shift),
            "downtime" | "report10" | "report_10" => Some(ReportKind::Downtime),
            "presence" | "report11" | "report_11" => Some(ReportKind::Presence),
            _ => None,
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

// ==========================================
// 报表种类提示 (Kind Hint)
// ==========================================
// Auto: 按文件名识别; Explicit: 调用方指定，原样采信
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKindHint {
    #[default]
    Auto,
    Explicit(ReportKind),
}

impl ReportKindHint {
    /// 解析调用方传入的提示字符串
    ///
    /// # 返回
    /// - Some(hint): "auto" 或可识别的报表种类
    /// - None: 无法识别
    pub fn parse(s: &str) -> Option<Self> {
        let trimmed = s.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            return Some(ReportKindHint::Auto);
        }
        ReportKind::from_db_str(trimmed).map(ReportKindHint::Explicit)
    }
}

impl From<ReportKind> for ReportKindHint {
    fn from(kind: ReportKind) -> Self {
        ReportKindHint::Explicit(kind)
    }
}

// ==========================================
// 导入状态 (Ingest Status)
// ==========================================
// Duplicate 不是错误，而是一种成功结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestStatus {
    Processed,
    Duplicate,
}

impl fmt::Display for IngestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IngestStatus::Processed => write!(f, "processed"),
            IngestStatus::Duplicate => write!(f, "duplicate"),
        }
    }
}
