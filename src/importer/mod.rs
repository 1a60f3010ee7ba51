// ==========================================
// WorkWatch 报表导入 - 导入层
// ==========================================
// 职责: 外部报表文件导入，生成规范化明细
// 支持: Excel (.xlsx/.xls), CSV
// 流程: 识别 → 解析 → 规范化 → 转换 → 身份解析 → 落库
// ==========================================

// 模块声明
pub mod coercion;
pub mod column_normalizer;
pub mod error;
pub mod file_parser;
pub mod identity_cache;
pub mod record_extractor;
pub mod report_classifier;
pub mod report_ingestor_impl;
pub mod report_ingestor_trait;

// 重导出核心类型
pub use column_normalizer::{canonical, normalize_header, normalize_headers, ColumnIndex};
pub use error::{ImportError, ImportResult};
pub use file_parser::{
    CellValue, CsvParser, ExcelParser, FileParser, SheetTable, UniversalFileParser, Workbook,
};
pub use identity_cache::{IdentityCache, IdentityStats};
pub use record_extractor::{DraftRecord, ExtractedRow, RecordExtractor};
pub use report_classifier::{classify, parse_hint};
pub use report_ingestor_impl::{content_hash, ReportIngestorImpl};

// 重导出 Trait 接口
pub use report_ingestor_trait::ReportIngestor;
