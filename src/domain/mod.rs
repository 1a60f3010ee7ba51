// ==========================================
// WorkWatch 报表导入 - 领域模型层
// ==========================================
// 职责: 定义领域实体、类型、行级结果
// 红线: 不含数据访问逻辑,不含导入逻辑
// ==========================================

pub mod employee;
pub mod ingestion;
pub mod record;
pub mod types;

// 重导出核心类型
pub use employee::{Employee, EmployeeUpsert, Tag, Zone, PLACEHOLDER_NAME};
pub use ingestion::{
    IngestOutcome, IngestionRun, NewIngestionRun, ReconcileProblem, ReconcileReport,
};
pub use record::{
    DowntimeRecord, PresenceLogRecord, ReportRecords, RowOutcome, ShiftRecord, SkipReason,
};
pub use types::{IngestStatus, ReportKind, ReportKindHint};
