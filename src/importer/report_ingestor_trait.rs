// ==========================================
// WorkWatch 报表导入 - 报表导入 Trait
// ==========================================
// 职责: 定义单文件导入接口（不包含实现）
// ==========================================

use crate::domain::ingestion::IngestOutcome;
use crate::domain::types::ReportKindHint;
use crate::importer::error::ImportResult;
use async_trait::async_trait;
use std::path::Path;

// ==========================================
// ReportIngestor Trait
// ==========================================
// 用途: 报表导入主接口
// 实现者: ReportIngestorImpl
#[async_trait]
pub trait ReportIngestor: Send + Sync {
    /// 导入一个报表文件
    ///
    /// # 参数
    /// - bytes: 文件内容
    /// - filename: 原始文件名（去重主键，同时用于识别报表种类与格式）
    /// - hint: 报表种类提示（Auto 按文件名识别）
    ///
    /// # 返回
    /// - Ok(IngestOutcome): status = Processed / Duplicate
    /// - Err: 文件级错误（不支持的格式、无法读取的工作簿、无工作表、存储错误）
    ///
    /// # 导入流程
    /// 1. 计算内容哈希（SHA-256）
    /// 2. 识别报表种类
    /// 3. 去重检查（文件名 + 哈希）
    /// 4. 解析工作簿、选择数据工作表
    /// 5. 列名规范化 + 逐行提取
    /// 6. 身份解析
    /// 7. 落库（事务化，替换旧批次）
    async fn ingest(
        &self,
        bytes: &[u8],
        filename: &str,
        hint: ReportKindHint,
    ) -> ImportResult<IngestOutcome>;

    /// 从磁盘文件导入（文件名取路径末段）
    async fn ingest_path(&self, path: &Path, hint: ReportKindHint) -> ImportResult<IngestOutcome>;
}
