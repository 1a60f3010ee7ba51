// ==========================================
// WorkWatch 报表导入 - 报表种类识别
// ==========================================
// 规则: 仅依据文件名（从不读取内容），大小写不敏感的子串匹配
// 优先级: 定位日志 > 班次汇总 > 停工事件；均未命中 → 停工事件
// ==========================================

use crate::domain::types::{ReportKind, ReportKindHint};
use crate::importer::error::{ImportError, ImportResult};

const PRESENCE_MARKERS: &[&str] = &["report_11", "report11", "aa_ble"];
const SHIFT_MARKERS: &[&str] = &["report_8", "report8"];

/// 识别报表种类（全函数，不会失败）
///
/// # 参数
/// - filename: 原始文件名
/// - hint: 调用方提示；非 Auto 时原样返回
pub fn classify(filename: &str, hint: ReportKindHint) -> ReportKind {
    if let ReportKindHint::Explicit(kind) = hint {
        return kind;
    }

    let lower = filename.to_lowercase();
    let matches = |markers: &[&str]| markers.iter().any(|m| lower.contains(m));

    if matches(PRESENCE_MARKERS) {
        ReportKind::Presence
    } else if matches(SHIFT_MARKERS) {
        ReportKind::Shift
    } else {
        // report_10 / report10 及未命中均为停工事件
        ReportKind::Downtime
    }
}

/// 解析调用方传入的提示字符串（无法识别 → 文件级错误）
pub fn parse_hint(raw: &str) -> ImportResult<ReportKindHint> {
    ReportKindHint::parse(raw).ok_or_else(|| ImportError::UnknownReportKind(raw.to_string()))
}
