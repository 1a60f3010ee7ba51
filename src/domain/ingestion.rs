// ==========================================
// WorkWatch 报表导入 - 导入批次与结果模型
// ==========================================
// IngestionRun: 每个被接受的文件一条（按文件名唯一）
// IngestOutcome: ingest 调用的结构化结果
// ReconcileReport: 主数据对账结果
// ==========================================

use crate::domain::types::{IngestStatus, ReportKind};
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// ==========================================
// IngestionRun - 导入批次（已处理文件）
// ==========================================
// 对齐: ingestion_runs 表
// 删除批次时级联删除其名下全部明细记录
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestionRun {
    pub id: i64,
    pub run_token: String,       // 对外批次标识（uuid）
    pub filename: String,        // 去重主键
    pub content_hash: String,    // SHA-256（hex），去重次键
    pub report_kind: ReportKind,
    pub processed_at: NaiveDateTime,
    pub record_count: i64,
    pub rows_skipped: i64,
}

/// 新建批次所需字段（id 由库分配）
#[derive(Debug, Clone, PartialEq)]
pub struct NewIngestionRun {
    pub run_token: String,
    pub filename: String,
    pub content_hash: String,
    pub report_kind: ReportKind,
    pub processed_at: NaiveDateTime,
    pub rows_skipped: i64,
}

// ==========================================
// IngestOutcome - 单文件导入结果
// ==========================================
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestOutcome {
    pub filename: String,
    pub kind: ReportKind,
    pub status: IngestStatus,
    pub records_accepted: usize,
    pub rows_skipped: usize,
    /// 跳过原因 → 行数
    pub skip_reasons: BTreeMap<String, usize>,
    /// 本次生效的批次（Duplicate 时为已存在批次）
    pub run_id: Option<i64>,
}

impl IngestOutcome {
    /// 构造重复文件结果（零记录，不改动存储）
    pub fn duplicate(filename: &str, kind: ReportKind, run_id: i64) -> Self {
        Self {
            filename: filename.to_string(),
            kind,
            status: IngestStatus::Duplicate,
            records_accepted: 0,
            rows_skipped: 0,
            skip_reasons: BTreeMap::new(),
            run_id: Some(run_id),
        }
    }
}

// ==========================================
// 对账结果
// ==========================================

/// 单项对账问题（不抛出，收集后整体返回）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileProblem {
    pub action: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub zones_upserted: usize,
    pub employees_upserted: usize,
    pub tags_upserted: usize,
    /// 无法解析而跳过的主数据行
    pub rows_skipped: usize,
    /// 因未配置而跳过的数据源
    pub skipped_sources: Vec<String>,
    pub problems: Vec<ReconcileProblem>,
}

impl ReconcileReport {
    pub fn push_problem(&mut self, action: &str, error: impl ToString) {
        self.problems.push(ReconcileProblem {
            action: action.to_string(),
            error: error.to_string(),
        });
    }

    pub fn is_clean(&self) -> bool {
        self.problems.is_empty()
    }
}
