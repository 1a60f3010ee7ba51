// ==========================================
// WorkWatch 报表导入 - API 层
// ==========================================
// 职责: 对外业务接口（进程内门面）
// ==========================================

pub mod error;
pub mod ingest_api;

pub use error::{ApiError, ApiResult};
pub use ingest_api::{
    IngestApi, IngestResponse, IngestResponseStatus, SyncFile, SyncResponse,
    DEFAULT_RUN_LIST_LIMIT,
};
