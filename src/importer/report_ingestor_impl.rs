// ==========================================
// WorkWatch 报表导入 - 报表导入器实现
// ==========================================
// 职责: 编排单个文件的导入，从字节到数据库
// 流程: 哈希 → 识别 → 去重 → 解析 → 规范化/提取 → 身份解析 → 落库
// 状态: RECEIVED → CLASSIFIED → DEDUP_CHECKED → {SKIPPED | PERSISTING} → DONE
// ==========================================

use crate::config::IngestConfigReader;
use crate::domain::ingestion::{IngestOutcome, NewIngestionRun};
use crate::domain::record::RowOutcome;
use crate::domain::types::{IngestStatus, ReportKindHint};
use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::UniversalFileParser;
use crate::importer::identity_cache::IdentityCache;
use crate::importer::record_extractor::{collect_records, RecordExtractor};
use crate::importer::report_classifier::classify;
use crate::importer::report_ingestor_trait::ReportIngestor;
use crate::repository::{EmployeeRepository, IngestionRepository};
use async_trait::async_trait;
use chrono::Local;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// 内容哈希（SHA-256，小写 hex）
pub fn content_hash(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

// ==========================================
// ReportIngestorImpl - 报表导入器实现
// ==========================================
pub struct ReportIngestorImpl<I, E, C>
where
    I: IngestionRepository,
    E: EmployeeRepository,
    C: IngestConfigReader,
{
    // 数据访问层
    ingestion_repo: I,
    employee_repo: E,

    // 配置读取器
    config: C,

    // 导入组件
    file_parser: UniversalFileParser,

    // 同名文件串行化（文件名 → 锁）
    filename_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl<I, E, C> ReportIngestorImpl<I, E, C>
where
    I: IngestionRepository,
    E: EmployeeRepository,
    C: IngestConfigReader,
{
    /// 创建新的 ReportIngestor 实例
    ///
    /// # 参数
    /// - ingestion_repo: 批次与明细仓储
    /// - employee_repo: 员工仓储（身份缓存使用）
    /// - config: 配置读取器
    pub fn new(ingestion_repo: I, employee_repo: E, config: C) -> Self {
        Self {
            ingestion_repo,
            employee_repo,
            config,
            file_parser: UniversalFileParser,
            filename_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn ingestion_repo(&self) -> &I {
        &self.ingestion_repo
    }

    pub fn employee_repo(&self) -> &E {
        &self.employee_repo
    }

    /// 获取文件名对应的锁（不存在则创建）
    fn filename_lock(&self, filename: &str) -> ImportResult<Arc<tokio::sync::Mutex<()>>> {
        let mut locks = self
            .filename_locks
            .lock()
            .map_err(|e| ImportError::InternalError(format!("文件锁表不可用: {}", e)))?;

        // 清理无人持有的锁
        locks.retain(|_, lock| Arc::strong_count(lock) > 1);

        Ok(locks
            .entry(filename.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone())
    }
}

#[async_trait]
impl<I, E, C> ReportIngestor for ReportIngestorImpl<I, E, C>
where
    I: IngestionRepository + Send + Sync,
    E: EmployeeRepository + Send + Sync,
    C: IngestConfigReader + Send + Sync,
{
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    async fn ingest(
        &self,
        bytes: &[u8],
        filename: &str,
        hint: ReportKindHint,
    ) -> ImportResult<IngestOutcome> {
        use std::time::Instant;
        let start_time = Instant::now();

        // === 步骤 1: 内容哈希 ===
        let hash = content_hash(bytes);
        info!(filename = %filename, content_hash = %hash, "开始导入报表");

        // === 步骤 2: 识别报表种类 ===
        let kind = classify(filename, hint);
        debug!(kind = %kind, ?hint, "报表种类识别完成");

        // 同名文件串行处理，锁持有至落库完成
        let lock = self.filename_lock(filename)?;
        let _guard = lock.lock().await;

        // === 步骤 3: 去重检查 ===
        debug!("步骤 3: 去重检查");
        let existing = self.ingestion_repo.find_run_by_filename(filename).await?;
        let replaced_run_id = match existing {
            Some(run) if run.content_hash == hash => {
                info!(run_id = run.id, "文件内容未变化，跳过");
                return Ok(IngestOutcome::duplicate(filename, run.report_kind, run.id));
            }
            Some(run) => {
                info!(
                    old_run_id = run.id,
                    old_hash = %run.content_hash,
                    "文件内容已变化，将替换旧批次"
                );
                Some(run.id)
            }
            None => None,
        };

        // === 步骤 4: 解析工作簿 ===
        debug!("步骤 4: 解析工作簿");
        let workbook = self.file_parser.parse_bytes(bytes, filename)?;
        let sheet_index = self.config.get_data_sheet_index().await?;
        let sheet = workbook
            .select_data_sheet(sheet_index)
            .ok_or_else(|| ImportError::NoWorksheet(filename.to_string()))?;
        info!(
            sheet = %sheet.name,
            total_rows = sheet.row_count(),
            "工作簿解析完成"
        );

        // === 步骤 5: 规范化与逐行提取 ===
        debug!("步骤 5: 逐行提取");
        let default_zone_id = self.config.get_default_zone_id().await?;
        let extractor = RecordExtractor::new(kind, default_zone_id);
        let outcomes = extractor.extract(sheet);

        let mut accepted = Vec::with_capacity(outcomes.len());
        let mut skip_reasons: BTreeMap<String, usize> = BTreeMap::new();
        for (line, outcome) in outcomes {
            match outcome {
                RowOutcome::Accepted(row) => accepted.push(row),
                RowOutcome::Skipped(reason) => {
                    debug!(line, reason = %reason, "数据行被跳过");
                    *skip_reasons.entry(reason.to_string()).or_insert(0) += 1;
                }
            }
        }
        let rows_skipped: usize = skip_reasons.values().sum();
        if rows_skipped > 0 {
            warn!(rows_skipped, reasons = ?skip_reasons, "部分数据行未通过校验");
        }

        // === 步骤 6: 身份解析 ===
        debug!("步骤 6: 身份解析");
        let placeholder_name = self.config.get_placeholder_name().await?;
        let mut identities = IdentityCache::load(&self.employee_repo, &placeholder_name).await?;
        let mut drafts = Vec::with_capacity(accepted.len());
        for row in accepted {
            let employee_id = identities
                .resolve(row.tn_number, row.name.as_deref())
                .await?;
            drafts.push(row.bind(employee_id));
        }
        let stats = identities.stats();
        debug!(
            preloaded = stats.preloaded,
            created = stats.created,
            names_filled = stats.names_filled,
            "身份解析完成"
        );

        // === 步骤 7: 落库 ===
        debug!("步骤 7: 落库");
        let records = collect_records(kind, drafts);
        let new_run = NewIngestionRun {
            run_token: Uuid::new_v4().to_string(),
            filename: filename.to_string(),
            content_hash: hash,
            report_kind: kind,
            processed_at: Local::now().naive_local(),
            rows_skipped: rows_skipped as i64,
        };
        let run = self
            .ingestion_repo
            .commit_run(replaced_run_id, new_run, &records)
            .await?;

        let elapsed = start_time.elapsed();
        info!(
            run_id = run.id,
            run_token = %run.run_token,
            kind = %kind,
            records_accepted = run.record_count,
            rows_skipped,
            elapsed_ms = elapsed.as_millis() as u64,
            "报表导入完成"
        );

        Ok(IngestOutcome {
            filename: filename.to_string(),
            kind,
            status: IngestStatus::Processed,
            records_accepted: records.len(),
            rows_skipped,
            skip_reasons,
            run_id: Some(run.id),
        })
    }

    async fn ingest_path(&self, path: &Path, hint: ReportKindHint) -> ImportResult<IngestOutcome> {
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let bytes = tokio::fs::read(path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ImportError::FileReadError(path.display().to_string()))?;

        self.ingest(&bytes, &filename, hint).await
    }
}
