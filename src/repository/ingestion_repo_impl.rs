// ==========================================
// WorkWatch 报表导入 - 导入批次 Repository 实现
// ==========================================
// 职责: 实现批次去重查询与事务化落库（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::ingestion::{IngestionRun, NewIngestionRun};
use crate::domain::record::{DowntimeRecord, PresenceLogRecord, ReportRecords, ShiftRecord};
use crate::domain::types::ReportKind;
use crate::repository::error::{RepositoryError, RepositoryResult};
use crate::repository::ingestion_repo::IngestionRepository;
use async_trait::async_trait;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{params, Connection, OptionalExtension, Row, Transaction};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::debug;

// 报表种类以 to_db_str 形式落库
impl ToSql for ReportKind {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_db_str()))
    }
}

impl FromSql for ReportKind {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let raw = value.as_str()?;
        ReportKind::from_db_str(raw)
            .ok_or_else(|| FromSqlError::Other(format!("未知报表种类: {}", raw).into()))
    }
}

fn records_table(kind: ReportKind) -> &'static str {
    match kind {
        ReportKind::Shift => "shift_records",
        ReportKind::Downtime => "downtime_records",
        ReportKind::Presence => "presence_logs",
    }
}

const RUN_COLUMNS: &str =
    "id, run_token, filename, content_hash, report_kind, processed_at, record_count, rows_skipped";

// ==========================================
// IngestionRepositoryImpl
// ==========================================
pub struct IngestionRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl IngestionRepositoryImpl {
    /// 创建新的 Repository 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    fn map_run(row: &Row<'_>) -> rusqlite::Result<IngestionRun> {
        Ok(IngestionRun {
            id: row.get(0)?,
            run_token: row.get(1)?,
            filename: row.get(2)?,
            content_hash: row.get(3)?,
            report_kind: row.get(4)?,
            processed_at: row.get(5)?,
            record_count: row.get(6)?,
            rows_skipped: row.get(7)?,
        })
    }

    /// 在事务中批量插入班次记录
    fn insert_shift_tx(
        tx: &Transaction,
        run_id: i64,
        records: &[ShiftRecord],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO shift_records (
                employee_id, run_id, date, period_start, period_end,
                active_percent, idle_percent, transit_percent,
                active_seconds, idle_seconds, transit_seconds
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )?;

        let mut count = 0;
        for record in records {
            stmt.execute(params![
                record.employee_id,
                run_id,
                record.date,
                record.period_start,
                record.period_end,
                record.active_percent,
                record.idle_percent,
                record.transit_percent,
                record.active_seconds,
                record.idle_seconds,
                record.transit_seconds,
            ])?;
            count += 1;
        }
        Ok(count)
    }

    /// 在事务中批量插入停工记录
    fn insert_downtime_tx(
        tx: &Transaction,
        run_id: i64,
        records: &[DowntimeRecord],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO downtime_records (
                employee_id, run_id, interval_start, interval_end, duration_minutes, tag_number
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )?;

        let mut count = 0;
        for record in records {
            stmt.execute(params![
                record.employee_id,
                run_id,
                record.interval_start,
                record.interval_end,
                record.duration_minutes,
                record.tag_number,
            ])?;
            count += 1;
        }
        Ok(count)
    }

    /// 在事务中批量插入定位日志
    fn insert_presence_tx(
        tx: &Transaction,
        run_id: i64,
        records: &[PresenceLogRecord],
    ) -> RepositoryResult<usize> {
        let mut stmt = tx.prepare(
            r#"
            INSERT INTO presence_logs (
                employee_id, run_id, shift_day, observed_at, tag_number, zone_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )?;

        let mut count = 0;
        for record in records {
            stmt.execute(params![
                record.employee_id,
                run_id,
                record.shift_day,
                record.observed_at,
                record.tag_number,
                record.zone_id,
            ])?;
            count += 1;
        }
        Ok(count)
    }
}

#[async_trait]
impl IngestionRepository for IngestionRepositoryImpl {
    async fn find_run_by_filename(&self, filename: &str) -> RepositoryResult<Option<IngestionRun>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM ingestion_runs WHERE filename = ?1", RUN_COLUMNS);
        let run = conn
            .query_row(&sql, params![filename], Self::map_run)
            .optional()?;
        Ok(run)
    }

    async fn commit_run(
        &self,
        replaced_run_id: Option<i64>,
        run: NewIngestionRun,
        records: &ReportRecords,
    ) -> RepositoryResult<IngestionRun> {
        let conn = self.get_conn()?;
        let tx = conn.unchecked_transaction()?;

        // === 1. 删除旧批次（明细随 ON DELETE CASCADE 清除）===
        if let Some(old_id) = replaced_run_id {
            let deleted = tx.execute("DELETE FROM ingestion_runs WHERE id = ?1", params![old_id])?;
            debug!(old_run_id = old_id, deleted, "旧批次已删除");
        }

        // === 2. 插入批次行，先拿到 id 供明细外键引用 ===
        tx.execute(
            r#"
            INSERT INTO ingestion_runs (
                run_token, filename, content_hash, report_kind, processed_at, record_count, rows_skipped
            ) VALUES (?1, ?2, ?3, ?4, ?5, 0, ?6)
            "#,
            params![
                run.run_token,
                run.filename,
                run.content_hash,
                run.report_kind,
                run.processed_at,
                run.rows_skipped,
            ],
        )?;
        let run_id = tx.last_insert_rowid();

        // === 3. 批量插入明细 ===
        let count = match records {
            ReportRecords::Shift(items) => Self::insert_shift_tx(&tx, run_id, items)?,
            ReportRecords::Downtime(items) => Self::insert_downtime_tx(&tx, run_id, items)?,
            ReportRecords::Presence(items) => Self::insert_presence_tx(&tx, run_id, items)?,
        };

        // === 4. 回填 record_count ===
        tx.execute(
            "UPDATE ingestion_runs SET record_count = ?1 WHERE id = ?2",
            params![count as i64, run_id],
        )?;

        tx.commit()?;

        Ok(IngestionRun {
            id: run_id,
            run_token: run.run_token,
            filename: run.filename,
            content_hash: run.content_hash,
            report_kind: run.report_kind,
            processed_at: run.processed_at,
            record_count: count as i64,
            rows_skipped: run.rows_skipped,
        })
    }

    async fn delete_run(&self, run_id: i64) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let deleted = conn.execute("DELETE FROM ingestion_runs WHERE id = ?1", params![run_id])?;
        Ok(deleted > 0)
    }

    async fn list_recent_runs(&self, limit: usize) -> RepositoryResult<Vec<IngestionRun>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM ingestion_runs ORDER BY processed_at DESC, id DESC LIMIT ?1",
            RUN_COLUMNS
        );
        let mut stmt = conn.prepare(&sql)?;
        let runs = stmt
            .query_map(params![limit as i64], Self::map_run)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(runs)
    }

    async fn count_records(&self, kind: ReportKind) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT COUNT(*) FROM {}", records_table(kind));
        let count = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count)
    }

    async fn count_records_for_run(&self, run_id: i64, kind: ReportKind) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT COUNT(*) FROM {} WHERE run_id = ?1", records_table(kind));
        let count = conn.query_row(&sql, params![run_id], |row| row.get(0))?;
        Ok(count)
    }
}
