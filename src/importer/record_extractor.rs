// ==========================================
// WorkWatch 报表导入 - 行级记录提取
// ==========================================
// 输入: 规范化后的数据工作表
// 输出: 每行一个 RowOutcome（接受 / 跳过 + 原因）
// 约束: 行与行相互独立，单行失败不影响后续行
// 说明: 提取阶段不访问存储，employee_id 由身份缓存在落库前回填
// ==========================================

use crate::domain::record::{
    DowntimeRecord, PresenceLogRecord, ReportRecords, RowOutcome, ShiftRecord, SkipReason,
};
use crate::domain::types::ReportKind;
use crate::importer::coercion::{to_date, to_datetime, to_float, to_int, to_text, to_time};
use crate::importer::column_normalizer::{canonical, ColumnIndex};
use crate::importer::file_parser::{CellValue, SheetTable};
use chrono::NaiveDateTime;

// ==========================================
// 提取结果
// ==========================================

/// 尚未绑定员工的记录
#[derive(Debug, Clone, PartialEq)]
pub enum DraftRecord {
    Shift(ShiftRecord),
    Downtime(DowntimeRecord),
    Presence(PresenceLogRecord),
}

impl DraftRecord {
    fn assign_employee(&mut self, employee_id: i64) {
        match self {
            DraftRecord::Shift(r) => r.employee_id = employee_id,
            DraftRecord::Downtime(r) => r.employee_id = employee_id,
            DraftRecord::Presence(r) => r.employee_id = employee_id,
        }
    }
}

/// 已通过行级校验的数据行
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedRow {
    pub line: usize, // 工作表中的数据行号（从 1 开始，不含表头）
    pub tn_number: i64,
    pub name: Option<String>,
    pub record: DraftRecord,
}

impl ExtractedRow {
    /// 绑定员工内部ID
    pub fn bind(mut self, employee_id: i64) -> DraftRecord {
        self.record.assign_employee(employee_id);
        self.record
    }
}

/// 将已绑定员工的记录按种类收拢
pub fn collect_records(kind: ReportKind, drafts: Vec<DraftRecord>) -> ReportRecords {
    match kind {
        ReportKind::Shift => ReportRecords::Shift(
            drafts
                .into_iter()
                .filter_map(|d| match d {
                    DraftRecord::Shift(r) => Some(r),
                    _ => None,
                })
                .collect(),
        ),
        ReportKind::Downtime => ReportRecords::Downtime(
            drafts
                .into_iter()
                .filter_map(|d| match d {
                    DraftRecord::Downtime(r) => Some(r),
                    _ => None,
                })
                .collect(),
        ),
        ReportKind::Presence => ReportRecords::Presence(
            drafts
                .into_iter()
                .filter_map(|d| match d {
                    DraftRecord::Presence(r) => Some(r),
                    _ => None,
                })
                .collect(),
        ),
    }
}

// ==========================================
// 行视图
// ==========================================
struct RowView<'a> {
    columns: &'a ColumnIndex,
    cells: &'a [CellValue],
}

impl<'a> RowView<'a> {
    fn cell(&self, field: &str) -> &'a CellValue {
        static EMPTY: CellValue = CellValue::Empty;
        self.columns
            .get(field)
            .and_then(|idx| self.cells.get(idx))
            .unwrap_or(&EMPTY)
    }

    /// 必填字段: 空 → missing，有值但无法解析 → malformed
    fn required<T>(
        &self,
        field: &str,
        convert: impl Fn(&CellValue) -> Option<T>,
    ) -> Result<T, SkipReason> {
        let cell = self.cell(field);
        if cell.is_empty() {
            return Err(SkipReason::missing(field));
        }
        convert(cell).ok_or_else(|| SkipReason::malformed(field))
    }

    fn optional<T>(&self, field: &str, convert: impl Fn(&CellValue) -> Option<T>) -> Option<T> {
        convert(self.cell(field))
    }

    /// 工号: 必须为正整数
    fn business_key(&self) -> Result<i64, SkipReason> {
        to_int(self.cell(canonical::TN))
            .filter(|key| *key > 0)
            .ok_or(SkipReason::MissingBusinessKey)
    }

    fn name(&self) -> Option<String> {
        to_text(self.cell(canonical::NAME))
    }

    /// 百分比: 超出 [0,100] 视为缺失
    fn percent(&self, field: &str) -> Option<f64> {
        self.optional(field, to_float)
            .filter(|p| (0.0..=100.0).contains(p))
    }

    /// 秒数: 负数视为缺失
    fn seconds(&self, field: &str) -> Option<i64> {
        self.optional(field, to_int).filter(|s| *s >= 0)
    }

    fn period(&self) -> Result<(NaiveDateTime, NaiveDateTime), SkipReason> {
        let start = self.required(canonical::START, to_datetime)?;
        let end = self.required(canonical::END, to_datetime)?;
        if start > end {
            return Err(SkipReason::InvertedPeriod);
        }
        Ok((start, end))
    }
}

// ==========================================
// RecordExtractor
// ==========================================
pub struct RecordExtractor {
    kind: ReportKind,
    default_zone_id: i64,
}

impl RecordExtractor {
    /// # 参数
    /// - kind: 报表种类
    /// - default_zone_id: 定位日志缺少区域时使用的工作区
    pub fn new(kind: ReportKind, default_zone_id: i64) -> Self {
        Self {
            kind,
            default_zone_id,
        }
    }

    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    /// 逐行提取
    ///
    /// # 返回
    /// - (数据行号, 行级结果) 列表，与工作表行一一对应
    pub fn extract(&self, sheet: &SheetTable) -> Vec<(usize, RowOutcome<ExtractedRow>)> {
        let columns = ColumnIndex::from_raw_headers(&sheet.headers);

        sheet
            .rows
            .iter()
            .enumerate()
            .map(|(idx, cells)| {
                let line = idx + 1;
                let row = RowView {
                    columns: &columns,
                    cells,
                };
                let outcome = match self.extract_row(line, &row) {
                    Ok(extracted) => RowOutcome::Accepted(extracted),
                    Err(reason) => RowOutcome::Skipped(reason),
                };
                (line, outcome)
            })
            .collect()
    }

    fn extract_row(&self, line: usize, row: &RowView<'_>) -> Result<ExtractedRow, SkipReason> {
        let tn_number = row.business_key()?;
        let record = match self.kind {
            ReportKind::Shift => DraftRecord::Shift(Self::shift_record(row)?),
            ReportKind::Downtime => DraftRecord::Downtime(Self::downtime_record(row)?),
            ReportKind::Presence => {
                DraftRecord::Presence(Self::presence_record(row, self.default_zone_id)?)
            }
        };

        Ok(ExtractedRow {
            line,
            tn_number,
            name: row.name(),
            record,
        })
    }

    // ===== 班次汇总 =====
    fn shift_record(row: &RowView<'_>) -> Result<ShiftRecord, SkipReason> {
        let date = row.required(canonical::DATE, to_date)?;
        let (period_start, period_end) = row.period()?;

        Ok(ShiftRecord {
            employee_id: 0,
            date,
            period_start,
            period_end,
            active_percent: row.percent(canonical::ACTIVE_PERCENT),
            idle_percent: row.percent(canonical::IDLE_PERCENT),
            transit_percent: row.percent(canonical::TRANSIT_PERCENT),
            active_seconds: row.seconds(canonical::ACTIVE_SECONDS),
            idle_seconds: row.seconds(canonical::IDLE_SECONDS),
            transit_seconds: row.seconds(canonical::TRANSIT_SECONDS),
        })
    }

    // ===== 停工事件 =====
    fn downtime_record(row: &RowView<'_>) -> Result<DowntimeRecord, SkipReason> {
        let (interval_start, interval_end) = row.period()?;

        // 时长: 空白 → 0；非数字 → 丢弃该行
        let duration_cell = row.cell(canonical::DURATION);
        let duration_minutes = if duration_cell.is_empty() {
            0
        } else {
            to_int(duration_cell).ok_or_else(|| SkipReason::malformed(canonical::DURATION))?
        };
        if duration_minutes < 0 {
            return Err(SkipReason::NegativeDuration);
        }

        Ok(DowntimeRecord {
            employee_id: 0,
            interval_start,
            interval_end,
            duration_minutes,
            tag_number: row.optional(canonical::TAG, to_int),
        })
    }

    // ===== 定位日志 =====
    fn presence_record(
        row: &RowView<'_>,
        default_zone_id: i64,
    ) -> Result<PresenceLogRecord, SkipReason> {
        let shift_day = row.required(canonical::SHIFT_DAY, to_date)?;
        let time = row.required(canonical::TIME, to_time)?;
        let tag_number = row.required(canonical::TAG, to_int)?;
        let zone_id = row
            .optional(canonical::ZONE, to_int)
            .unwrap_or(default_zone_id);

        Ok(PresenceLogRecord {
            employee_id: 0,
            shift_day,
            observed_at: shift_day.and_time(time),
            tag_number,
            zone_id,
        })
    }
}
