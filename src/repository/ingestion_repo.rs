// ==========================================
// WorkWatch 报表导入 - 导入批次 Repository Trait
// ==========================================
// 职责: 定义导入批次与明细记录的数据访问接口（不包含业务逻辑）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::domain::ingestion::{IngestionRun, NewIngestionRun};
use crate::domain::record::ReportRecords;
use crate::domain::types::ReportKind;
use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// IngestionRepository Trait
// ==========================================
// 用途: 导入批次去重、替换与明细落库
// 实现者: IngestionRepositoryImpl（使用 rusqlite）
#[async_trait]
pub trait IngestionRepository: Send + Sync {
    // ===== 去重查询 =====

    /// 按文件名查询有效批次
    ///
    /// # 返回
    /// - Ok(Some(run)): 该文件名已有批次
    /// - Ok(None): 首次出现
    async fn find_run_by_filename(&self, filename: &str) -> RepositoryResult<Option<IngestionRun>>;

    // ===== 批次落库（事务化）=====

    /// 提交一个导入批次
    ///
    /// # 参数
    /// - replaced_run_id: 需先删除的旧批次（级联删除其明细）
    /// - run: 新批次
    /// - records: 明细记录
    ///
    /// # 返回
    /// - Ok(IngestionRun): 新批次（record_count 已回填）
    /// - Err: 数据库错误（整个事务回滚，旧批次保持不变）
    ///
    /// # 顺序
    /// 删除旧批次 → 插入批次行(record_count=0) → 批量插入明细 → 回填 record_count
    async fn commit_run(
        &self,
        replaced_run_id: Option<i64>,
        run: NewIngestionRun,
        records: &ReportRecords,
    ) -> RepositoryResult<IngestionRun>;

    /// 删除批次（级联删除明细）
    async fn delete_run(&self, run_id: i64) -> RepositoryResult<bool>;

    // ===== 查询 =====

    /// 最近处理的批次（按处理时间倒序）
    async fn list_recent_runs(&self, limit: usize) -> RepositoryResult<Vec<IngestionRun>>;

    /// 指定种类的明细总数
    async fn count_records(&self, kind: ReportKind) -> RepositoryResult<i64>;

    /// 指定批次的明细数
    async fn count_records_for_run(&self, run_id: i64, kind: ReportKind) -> RepositoryResult<i64>;
}
