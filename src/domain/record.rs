// ==========================================
// WorkWatch 报表导入 - 明细记录领域模型
// ==========================================
// 班次 / 停工 / 定位日志
// 用途: 导入流程写入，每条记录归属一个员工与一个导入批次
// ==========================================

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;

// ==========================================
// ShiftRecord - 班次汇总
// ==========================================
// 对齐: shift_records 表
// 约束: period_start <= period_end; 百分比在 [0,100]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShiftRecord {
    pub employee_id: i64,
    pub date: NaiveDate,
    pub period_start: NaiveDateTime,
    pub period_end: NaiveDateTime,

    // ===== 三类互斥活动：占比 =====
    pub active_percent: Option<f64>,
    pub idle_percent: Option<f64>,
    pub transit_percent: Option<f64>,

    // ===== 三类互斥活动：秒数 =====
    pub active_seconds: Option<i64>,
    pub idle_seconds: Option<i64>,
    pub transit_seconds: Option<i64>,
}

// ==========================================
// DowntimeRecord - 停工事件
// ==========================================
// 对齐: downtime_records 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DowntimeRecord {
    pub employee_id: i64,
    pub interval_start: NaiveDateTime,
    pub interval_end: NaiveDateTime,
    pub duration_minutes: i64,     // >= 0
    pub tag_number: Option<i64>,   // 证明缺席的 BLE 标签
}

// ==========================================
// PresenceLogRecord - 定位日志（一行一个采样）
// ==========================================
// 对齐: presence_logs 表
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PresenceLogRecord {
    pub employee_id: i64,
    pub shift_day: NaiveDate,
    pub observed_at: NaiveDateTime, // shift_day + 时刻
    pub tag_number: i64,
    pub zone_id: i64,               // 缺失时取工作区
}

// ==========================================
// ReportRecords - 单个文件提取出的记录集合
// ==========================================
#[derive(Debug, Clone, PartialEq)]
pub enum ReportRecords {
    Shift(Vec<ShiftRecord>),
    Downtime(Vec<DowntimeRecord>),
    Presence(Vec<PresenceLogRecord>),
}

impl ReportRecords {
    pub fn len(&self) -> usize {
        match self {
            ReportRecords::Shift(v) => v.len(),
            ReportRecords::Downtime(v) => v.len(),
            ReportRecords::Presence(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ==========================================
// 行级结果
// ==========================================
// 行级错误不抛出，用显式结果记录跳过原因，便于审计
#[derive(Debug, Clone, PartialEq)]
pub enum RowOutcome<T> {
    Accepted(T),
    Skipped(SkipReason),
}

/// 行被丢弃的原因
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// 工号缺失或无法解析
    MissingBusinessKey,
    /// 必填字段缺失或无法解析
    MissingField(String),
    /// 字段有值但格式错误（如非数字的时长）
    MalformedField(String),
    /// 起止时间颠倒
    InvertedPeriod,
    /// 时长为负
    NegativeDuration,
}

impl SkipReason {
    pub fn missing(field: &str) -> Self {
        SkipReason::MissingField(field.to_string())
    }

    pub fn malformed(field: &str) -> Self {
        SkipReason::MalformedField(field.to_string())
    }
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SkipReason::MissingBusinessKey => write!(f, "missing_business_key"),
            SkipReason::MissingField(field) => write!(f, "missing:{}", field),
            SkipReason::MalformedField(field) => write!(f, "malformed:{}", field),
            SkipReason::InvertedPeriod => write!(f, "inverted_period"),
            SkipReason::NegativeDuration => write!(f, "negative_duration"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_skip_reason_display() {
        assert_eq!(SkipReason::missing("start").to_string(), "missing:start");
        assert_eq!(SkipReason::malformed("duration").to_string(), "malformed:duration");
        assert_eq!(SkipReason::InvertedPeriod.to_string(), "inverted_period");
    }

    #[test]
    fn test_report_records_len() {
        assert!(ReportRecords::Shift(Vec::new()).is_empty());
        assert_eq!(ReportRecords::Downtime(Vec::new()).len(), 0);
    }
}
