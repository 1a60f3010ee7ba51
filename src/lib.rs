// ==========================================
// WorkWatch 报表导入 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 考勤/定位报表入库（班次汇总、停工事件、BLE 定位日志）
// ==========================================

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 导入层 - 报表解析与入库
pub mod importer;

// 主数据层 - 员工/标签/区域对账
pub mod reference;

// 配置层 - 系统配置
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一）
pub mod db;

// 日志系统
pub mod logging;

// API 层 - 业务接口
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{IngestStatus, ReportKind, ReportKindHint};

// 领域实体
pub use domain::{
    Employee, IngestOutcome, IngestionRun, ReconcileReport, ReportRecords, SkipReason, Tag, Zone,
};

// 导入与对账
pub use importer::{ReportIngestor, ReportIngestorImpl};
pub use reference::ReferenceReconciler;

// API
pub use api::{IngestApi, IngestResponse, IngestResponseStatus, SyncResponse};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "WorkWatch 报表导入";
