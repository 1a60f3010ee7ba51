// ==========================================
// WorkWatch 报表导入 - 导入API
// ==========================================
// 职责: 封装单文件导入、批量同步、主数据对账与批次查询
// 约定: 导入接口永远返回 processed / duplicate / failed 之一
// ==========================================

use crate::api::error::{ApiError, ApiResult};
use crate::config::{config_keys, ConfigManager};
use crate::db::open_and_init;
use crate::domain::ingestion::{IngestOutcome, IngestionRun, ReconcileReport};
use crate::domain::types::{IngestStatus, ReportKind};
use crate::importer::{parse_hint, ReportIngestor, ReportIngestorImpl};
use crate::reference::{FileReferenceSource, ReferenceReconciler, ReferenceSource};
use crate::repository::{
    EmployeeRepositoryImpl, IngestionRepository, IngestionRepositoryImpl,
    ReferenceRepositoryImpl,
};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{error, info};

/// 批次列表默认条数
pub const DEFAULT_RUN_LIST_LIMIT: usize = 50;

/// 可通过 API 写入的配置键
const WRITABLE_CONFIG_KEYS: &[&str] = &[
    config_keys::EMPLOYEE_SOURCE,
    config_keys::TAG_SOURCE,
    config_keys::DEFAULT_ZONE_ID,
    config_keys::DATA_SHEET_INDEX,
    config_keys::PLACEHOLDER_NAME,
];

// ==========================================
// 响应类型
// ==========================================

/// 导入状态（API 视角）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IngestResponseStatus {
    Processed,
    Duplicate,
    Failed,
}

/// 单文件导入响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestResponse {
    pub filename: String,
    pub status: IngestResponseStatus,
    /// 报表种类（失败且未能识别时为空）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<ReportKind>,
    pub records_accepted: usize,
    pub rows_skipped: usize,
    #[serde(skip_serializing_if = "BTreeMap::is_empty", default)]
    pub skip_reasons: BTreeMap<String, usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub run_id: Option<i64>,
    /// 失败原因
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl IngestResponse {
    fn from_outcome(outcome: IngestOutcome) -> Self {
        let status = match outcome.status {
            IngestStatus::Processed => IngestResponseStatus::Processed,
            IngestStatus::Duplicate => IngestResponseStatus::Duplicate,
        };
        Self {
            filename: outcome.filename,
            status,
            kind: Some(outcome.kind),
            records_accepted: outcome.records_accepted,
            rows_skipped: outcome.rows_skipped,
            skip_reasons: outcome.skip_reasons,
            run_id: outcome.run_id,
            error: None,
        }
    }

    fn failed(filename: &str, error: &ApiError) -> Self {
        Self {
            filename: filename.to_string(),
            status: IngestResponseStatus::Failed,
            kind: None,
            records_accepted: 0,
            rows_skipped: 0,
            skip_reasons: BTreeMap::new(),
            run_id: None,
            error: Some(error.to_string()),
        }
    }
}

/// 批量同步的输入文件
#[derive(Debug, Clone)]
pub struct SyncFile {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// 批量同步响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncResponse {
    pub references: ReconcileReport,
    pub files: Vec<IngestResponse>,
    pub processed: usize,
    pub duplicates: usize,
    pub failed: usize,
}

type Ingestor = ReportIngestorImpl<IngestionRepositoryImpl, EmployeeRepositoryImpl, ConfigManager>;
type Reconciler = ReferenceReconciler<EmployeeRepositoryImpl, ReferenceRepositoryImpl, ConfigManager>;

// ==========================================
// IngestApi
// ==========================================
pub struct IngestApi {
    ingestor: Ingestor,
    reconciler: Reconciler,
    config: ConfigManager,
}

impl IngestApi {
    /// 打开（必要时创建）数据库并装配全部组件
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    /// - reference_base_dir: 主数据文件的相对路径基准（None 表示按原样解析）
    pub fn new(db_path: &str, reference_base_dir: Option<&Path>) -> ApiResult<Self> {
        let conn = open_and_init(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(format!("{}: {}", db_path, e)))?;
        let source: Box<dyn ReferenceSource> = match reference_base_dir {
            Some(dir) => Box::new(FileReferenceSource::with_base_dir(dir)),
            None => Box::new(FileReferenceSource::new()),
        };
        Self::from_connection(Arc::new(Mutex::new(conn)), source)
    }

    /// 从已有连接装配（schema 需已初始化）
    pub fn from_connection(
        conn: Arc<Mutex<Connection>>,
        source: Box<dyn ReferenceSource>,
    ) -> ApiResult<Self> {
        let ingestor = ReportIngestorImpl::new(
            IngestionRepositoryImpl::from_connection(conn.clone()),
            EmployeeRepositoryImpl::from_connection(conn.clone()),
            ConfigManager::from_connection(conn.clone())?,
        );
        let reconciler = ReferenceReconciler::new(
            EmployeeRepositoryImpl::from_connection(conn.clone()),
            ReferenceRepositoryImpl::from_connection(conn.clone()),
            ConfigManager::from_connection(conn.clone())?,
            source,
        );
        let config = ConfigManager::from_connection(conn)?;

        Ok(Self {
            ingestor,
            reconciler,
            config,
        })
    }

    /// 导入单个文件
    ///
    /// # 参数
    /// - bytes: 文件内容
    /// - filename: 原始文件名
    /// - kind: auto / shift / downtime / presence（兼容 report8/report10/report11）
    ///
    /// # 返回
    /// - IngestResponse（失败时 status = failed，error 给出原因）
    pub async fn ingest(&self, bytes: &[u8], filename: &str, kind: &str) -> IngestResponse {
        match self.try_ingest(bytes, filename, kind).await {
            Ok(outcome) => IngestResponse::from_outcome(outcome),
            Err(e) => {
                error!(filename = %filename, error = %e, "文件导入失败");
                IngestResponse::failed(filename, &e)
            }
        }
    }

    async fn try_ingest(&self, bytes: &[u8], filename: &str, kind: &str) -> ApiResult<IngestOutcome> {
        if filename.trim().is_empty() {
            return Err(ApiError::InvalidInput("文件名不能为空".to_string()));
        }
        let hint = parse_hint(kind)?;
        Ok(self.ingestor.ingest(bytes, filename, hint).await?)
    }

    /// 导入磁盘文件（文件名取路径末段）
    pub async fn ingest_path(&self, path: &Path, kind: &str) -> IngestResponse {
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let result = match parse_hint(kind) {
            Ok(hint) => self
                .ingestor
                .ingest_path(path, hint)
                .await
                .map_err(ApiError::from),
            Err(e) => Err(ApiError::from(e)),
        };

        match result {
            Ok(outcome) => IngestResponse::from_outcome(outcome),
            Err(e) => {
                error!(path = %path.display(), error = %e, "文件导入失败");
                IngestResponse::failed(&filename, &e)
            }
        }
    }

    /// 主数据对账（幂等）
    pub async fn reconcile_references(&self) -> ReconcileReport {
        self.reconciler.reconcile().await
    }

    /// 批量同步: 先对账主数据，再逐个导入文件
    ///
    /// # 说明
    /// - 每个文件独立处理，单个失败不影响其他文件
    /// - 文件按传入顺序串行处理
    pub async fn sync_files(&self, files: Vec<SyncFile>) -> SyncResponse {
        info!(count = files.len(), "开始批量同步");

        let references = self.reconcile_references().await;

        let mut responses = Vec::with_capacity(files.len());
        for file in files {
            let response = self.ingest(&file.bytes, &file.filename, "auto").await;
            responses.push(response);
        }

        let count = |status: IngestResponseStatus| {
            responses.iter().filter(|r| r.status == status).count()
        };
        let processed = count(IngestResponseStatus::Processed);
        let duplicates = count(IngestResponseStatus::Duplicate);
        let failed = count(IngestResponseStatus::Failed);

        info!(processed, duplicates, failed, "批量同步完成");

        SyncResponse {
            references,
            files: responses,
            processed,
            duplicates,
            failed,
        }
    }

    /// 最近处理的批次（按处理时间倒序）
    pub async fn list_runs(&self, limit: usize) -> ApiResult<Vec<IngestionRun>> {
        if limit == 0 {
            return Err(ApiError::InvalidInput("limit 必须大于 0".to_string()));
        }
        Ok(self.ingestor.ingestion_repo().list_recent_runs(limit).await?)
    }

    /// 写入配置（仅限已知键）
    pub fn set_config(&self, key: &str, value: &str) -> ApiResult<()> {
        if !WRITABLE_CONFIG_KEYS.contains(&key) {
            return Err(ApiError::InvalidInput(format!("未知配置键: {}", key)));
        }
        self.config.set_config_value(key, value.trim())?;
        info!(key, value, "配置已更新");
        Ok(())
    }

    /// 当前配置快照（JSON）
    pub fn config_snapshot(&self) -> ApiResult<String> {
        Ok(self.config.get_config_snapshot()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reference::InMemoryReferenceSource;

    fn test_api() -> IngestApi {
        let conn = open_and_init(":memory:").unwrap();
        IngestApi::from_connection(
            Arc::new(Mutex::new(conn)),
            Box::new(InMemoryReferenceSource::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_unknown_kind_is_failed_response() {
        let api = test_api();
        let response = api.ingest(b"tn\n1\n", "report_10.csv", "report99").await;
        assert_eq!(response.status, IngestResponseStatus::Failed);
        assert!(response.error.unwrap().contains("report99"));
    }

    #[tokio::test]
    async fn test_unsupported_format_is_failed_response() {
        let api = test_api();
        let response = api.ingest(b"whatever", "report_10.pdf", "auto").await;
        assert_eq!(response.status, IngestResponseStatus::Failed);
        assert_eq!(response.records_accepted, 0);
    }

    #[tokio::test]
    async fn test_list_runs_rejects_zero_limit() {
        let api = test_api();
        assert!(matches!(api.list_runs(0).await, Err(ApiError::InvalidInput(_))));
        assert!(api.list_runs(10).await.unwrap().is_empty());
    }

    #[test]
    fn test_set_config_validates_key() {
        let api = test_api();
        assert!(api.set_config(config_keys::TAG_SOURCE, "tags.csv").is_ok());
        assert!(matches!(
            api.set_config("ui.theme", "dark"),
            Err(ApiError::InvalidInput(_))
        ));
        assert!(api.config_snapshot().unwrap().contains("tags.csv"));
    }

    #[test]
    fn test_response_serialization() {
        let response = IngestResponse::failed(
            "a.xlsx",
            &ApiError::ImportError("broken".to_string()),
        );
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "failed");
        assert!(json.get("run_id").is_none());
    }
}
