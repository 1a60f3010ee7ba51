// ==========================================
// WorkWatch 报表导入 - 主数据对账
// ==========================================
// 职责: 幂等 upsert 区域字典、员工映射表、标签台账
// 调用: 独立调用，或作为批量导入的前置步骤
// 规则: 各数据源互相隔离；未配置的数据源静默跳过；
//       单行失败只跳过该行；问题收集后整体返回，不抛出
// ==========================================

use crate::config::IngestConfigReader;
use crate::domain::employee::{EmployeeUpsert, Tag};
use crate::domain::ingestion::ReconcileReport;
use crate::importer::coercion::{to_int, to_text};
use crate::importer::column_normalizer::{canonical, header_key, normalize_header};
use crate::importer::file_parser::SheetTable;
use crate::reference::reference_source::ReferenceSource;
use crate::reference::zone_catalog::zone_catalog;
use crate::repository::{EmployeeRepository, ReferenceRepository};
use tracing::{debug, info, instrument, warn};

// 员工映射表表头片段（小写子串匹配，按顺序优先）
const EMPLOYEE_KEY_FRAGMENTS: &[&str] = &["табел", "personnel", "employee number"];
// 短缩写只按整词匹配（"тн" 也是 "работник" 的子串）
const EMPLOYEE_KEY_WORDS: &[&str] = &["тн", "tn", "таб"];
const EMPLOYEE_NAME_FRAGMENTS: &[&str] = &["фио", "name", "имя"];
const EMPLOYEE_DEPARTMENT_FRAGMENTS: &[&str] =
    &["подраздел", "отдел", "department", "цех", "участок"];

// 标签台账固定列位
const TAG_NUMBER_COLUMN: usize = 0;
const TAG_DESCRIPTION_COLUMN: usize = 2;
const TAG_DESCRIPTION_FALLBACK_COLUMN: usize = 1;

// 对账动作名（写入 ReconcileReport）
pub mod actions {
    pub const SEED_ZONES: &str = "seed_zones";
    pub const SYNC_EMPLOYEES: &str = "sync_employees";
    pub const SYNC_TAGS: &str = "sync_tags";
}

/// 在表头中按片段定位列（先按片段优先级，再按列序）
fn locate_column(headers: &[String], fragments: &[&str]) -> Option<usize> {
    let keys: Vec<String> = headers.iter().map(|h| header_key(h)).collect();
    fragments
        .iter()
        .find_map(|fragment| keys.iter().position(|key| key.contains(fragment)))
}

/// 在表头中按整词定位列（按非字母数字字符切词）
fn locate_word_column(headers: &[String], words: &[&str]) -> Option<usize> {
    let keys: Vec<String> = headers.iter().map(|h| header_key(h)).collect();
    words.iter().find_map(|word| {
        keys.iter().position(|key| {
            key.split(|c: char| !c.is_alphanumeric())
                .any(|token| token == *word)
        })
    })
}

/// 工号列: 同义词精确命中 → 长片段子串 → 短缩写整词
fn locate_key_column(headers: &[String]) -> Option<usize> {
    headers
        .iter()
        .position(|h| normalize_header(h) == canonical::TN)
        .or_else(|| locate_column(headers, EMPLOYEE_KEY_FRAGMENTS))
        .or_else(|| locate_word_column(headers, EMPLOYEE_KEY_WORDS))
}

// ==========================================
// ReferenceReconciler
// ==========================================
pub struct ReferenceReconciler<E, R, C>
where
    E: EmployeeRepository,
    R: ReferenceRepository,
    C: IngestConfigReader,
{
    employee_repo: E,
    reference_repo: R,
    config: C,
    source: Box<dyn ReferenceSource>,
}

impl<E, R, C> ReferenceReconciler<E, R, C>
where
    E: EmployeeRepository,
    R: ReferenceRepository,
    C: IngestConfigReader,
{
    /// 创建对账器
    ///
    /// # 参数
    /// - employee_repo: 员工仓储
    /// - reference_repo: 标签/区域仓储
    /// - config: 配置读取器（数据源标识）
    /// - source: 主数据来源
    pub fn new(
        employee_repo: E,
        reference_repo: R,
        config: C,
        source: Box<dyn ReferenceSource>,
    ) -> Self {
        Self {
            employee_repo,
            reference_repo,
            config,
            source,
        }
    }

    pub fn reference_repo(&self) -> &R {
        &self.reference_repo
    }

    /// 执行一次完整对账（幂等）
    ///
    /// # 顺序
    /// 1. 区域字典
    /// 2. 员工映射表（已配置时）
    /// 3. 标签台账（已配置时）
    #[instrument(skip(self))]
    pub async fn reconcile(&self) -> ReconcileReport {
        let mut report = ReconcileReport::default();
        info!("开始主数据对账");

        // === 步骤 1: 区域字典 ===
        self.seed_zones(&mut report).await;

        // === 步骤 2: 员工映射表 ===
        match self.config.get_employee_source().await {
            Ok(Some(source_id)) => self.sync_employees(&source_id, &mut report).await,
            Ok(None) => {
                debug!("未配置员工数据源，跳过");
                report.skipped_sources.push(actions::SYNC_EMPLOYEES.to_string());
            }
            Err(e) => report.push_problem(actions::SYNC_EMPLOYEES, e),
        }

        // === 步骤 3: 标签台账 ===
        match self.config.get_tag_source().await {
            Ok(Some(source_id)) => self.sync_tags(&source_id, &mut report).await,
            Ok(None) => {
                debug!("未配置标签数据源，跳过");
                report.skipped_sources.push(actions::SYNC_TAGS.to_string());
            }
            Err(e) => report.push_problem(actions::SYNC_TAGS, e),
        }

        if report.is_clean() {
            info!(
                zones = report.zones_upserted,
                employees = report.employees_upserted,
                tags = report.tags_upserted,
                rows_skipped = report.rows_skipped,
                "主数据对账完成"
            );
        } else {
            warn!(
                zones = report.zones_upserted,
                employees = report.employees_upserted,
                tags = report.tags_upserted,
                problems = report.problems.len(),
                "主数据对账完成（存在问题）"
            );
        }
        report
    }

    async fn seed_zones(&self, report: &mut ReconcileReport) {
        for zone in zone_catalog() {
            match self.reference_repo.upsert_zone(&zone).await {
                Ok(()) => report.zones_upserted += 1,
                Err(e) => {
                    warn!(zone_id = zone.zone_id, error = %e, "区域写入失败");
                    report.push_problem(
                        actions::SEED_ZONES,
                        format!("zone {}: {}", zone.zone_id, e),
                    );
                }
            }
        }
    }

    async fn fetch(
        &self,
        action: &str,
        source_id: &str,
        report: &mut ReconcileReport,
    ) -> Option<SheetTable> {
        match self.source.fetch_table(source_id).await {
            Ok(table) => Some(table),
            Err(e) => {
                warn!(action, source_id, error = %e, "主数据源读取失败");
                report.push_problem(action, e);
                None
            }
        }
    }

    async fn sync_employees(&self, source_id: &str, report: &mut ReconcileReport) {
        let Some(table) = self.fetch(actions::SYNC_EMPLOYEES, source_id, report).await else {
            return;
        };

        let Some(key_col) = locate_key_column(&table.headers) else {
            warn!(source_id, headers = ?table.headers, "员工表未找到工号列，跳过该数据源");
            report.push_problem(
                actions::SYNC_EMPLOYEES,
                format!("工号列缺失: {}", source_id),
            );
            return;
        };
        let name_col = locate_column(&table.headers, EMPLOYEE_NAME_FRAGMENTS);
        let department_col = locate_column(&table.headers, EMPLOYEE_DEPARTMENT_FRAGMENTS);

        for row in 0..table.row_count() {
            let Some(tn_number) = to_int(table.cell(row, key_col)) else {
                report.rows_skipped += 1;
                continue;
            };
            // 空姓名不覆盖已有姓名，新建时由仓储取占位名
            let name = name_col.and_then(|col| to_text(table.cell(row, col)));
            let department = department_col.and_then(|col| to_text(table.cell(row, col)));

            let upsert = EmployeeUpsert {
                tn_number,
                name,
                department,
            };
            match self.employee_repo.upsert(&upsert).await {
                Ok(_) => report.employees_upserted += 1,
                Err(e) => {
                    warn!(tn_number, error = %e, "员工写入失败");
                    report.push_problem(
                        actions::SYNC_EMPLOYEES,
                        format!("tn {}: {}", tn_number, e),
                    );
                }
            }
        }
        debug!(upserted = report.employees_upserted, "员工映射表同步完成");
    }

    async fn sync_tags(&self, source_id: &str, report: &mut ReconcileReport) {
        let Some(table) = self.fetch(actions::SYNC_TAGS, source_id, report).await else {
            return;
        };

        for row in 0..table.row_count() {
            let Some(tag_number) = to_int(table.cell(row, TAG_NUMBER_COLUMN)) else {
                report.rows_skipped += 1;
                continue;
            };
            let description = to_text(table.cell(row, TAG_DESCRIPTION_COLUMN))
                .or_else(|| to_text(table.cell(row, TAG_DESCRIPTION_FALLBACK_COLUMN)));

            let tag = Tag {
                tag_number,
                description,
            };
            match self.reference_repo.upsert_tag(&tag).await {
                Ok(()) => report.tags_upserted += 1,
                Err(e) => {
                    warn!(tag_number, error = %e, "标签写入失败");
                    report.push_problem(actions::SYNC_TAGS, format!("tag {}: {}", tag_number, e));
                }
            }
        }
        debug!(upserted = report.tags_upserted, "标签台账同步完成");
    }
}
