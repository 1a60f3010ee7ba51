// ==========================================
// WorkWatch 报表导入 - 配置层
// ==========================================
// 职责: 导入与对账参数管理
// 存储: config_kv 表
// ==========================================

pub mod config_manager;
pub mod ingest_config_trait;

// 重导出核心配置管理器
pub use config_manager::{config_keys, ConfigManager, DEFAULT_DATA_SHEET_INDEX, DEFAULT_WORK_ZONE_ID};
pub use ingest_config_trait::IngestConfigReader;
