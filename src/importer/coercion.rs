// ==========================================
// WorkWatch 报表导入 - 单元格值宽容转换
// ==========================================
// 约定: 所有函数对缺失/空白/格式错误返回 None，绝不报错
// 日期文本按"日在前"解析，ISO 作为兜底
// ==========================================

use crate::importer::file_parser::CellValue;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// 仅含时刻的文本所锚定的哨兵日期
pub const SENTINEL_DATE: (i32, u32, u32) = (1900, 1, 1);

/// Excel 1900 日期系统的零点（已抵消 1900-02-29 虚构日）
const EXCEL_EPOCH: (i32, u32, u32) = (1899, 12, 30);

/// Excel 可表示的最大序列号（9999-12-31）
const EXCEL_MAX_SERIAL: f64 = 2_958_466.0;

const DATETIME_FORMATS: &[&str] = &[
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d-%m-%Y %H:%M:%S",
    "%d-%m-%Y %H:%M",
    // ISO 兜底
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
];

const DATE_FORMATS: &[&str] = &["%d.%m.%Y", "%d/%m/%Y", "%d-%m-%Y", "%Y-%m-%d"];

const TIME_FORMATS: &[&str] = &["%H:%M:%S%.f", "%H:%M:%S", "%H:%M"];

/// 哨兵日期
pub fn sentinel_date() -> NaiveDate {
    let (y, m, d) = SENTINEL_DATE;
    NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN)
}

// ==========================================
// 数值
// ==========================================

/// 规范化数值文本：去空白（含不换行空格），小数逗号转点
fn normalize_numeric_text(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == ',' { '.' } else { c })
        .collect()
}

/// 浮点转换（接受小数逗号）
pub fn to_float(cell: &CellValue) -> Option<f64> {
    let value = match cell {
        CellValue::Int(i) => *i as f64,
        CellValue::Float(f) => *f,
        CellValue::Text(s) => normalize_numeric_text(s).parse::<f64>().ok()?,
        CellValue::Empty | CellValue::Bool(_) | CellValue::DateTime(_) => return None,
    };
    value.is_finite().then_some(value)
}

/// 整数转换（截断式："7.0" 与 7 均可）
pub fn to_int(cell: &CellValue) -> Option<i64> {
    match cell {
        CellValue::Int(i) => Some(*i),
        _ => {
            let value = to_float(cell)?.trunc();
            if value.abs() < i64::MAX as f64 {
                Some(value as i64)
            } else {
                None
            }
        }
    }
}

/// 文本转换（空白返回 None）
pub fn to_text(cell: &CellValue) -> Option<String> {
    cell.as_text()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

// ==========================================
// 日期与时间
// ==========================================

/// Excel 序列号转日期时间（1900 日期系统）
pub fn excel_serial_to_datetime(serial: f64) -> Option<NaiveDateTime> {
    if !serial.is_finite() || !(0.0..EXCEL_MAX_SERIAL).contains(&serial) {
        return None;
    }

    let (y, m, d) = EXCEL_EPOCH;
    let epoch = NaiveDate::from_ymd_opt(y, m, d)?.and_hms_opt(0, 0, 0)?;

    let days = serial.trunc() as i64;
    let mut seconds = ((serial - serial.trunc()) * 86_400.0).round() as i64;
    // 舍入到次日零点
    let days = if seconds >= 86_400 {
        seconds -= 86_400;
        days + 1
    } else {
        days
    };

    epoch.checked_add_signed(Duration::days(days) + Duration::seconds(seconds))
}

fn parse_datetime_text(raw: &str) -> Option<NaiveDateTime> {
    let text = raw.trim();

    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
    {
        return Some(dt);
    }

    if let Some(date) = parse_date_text(text) {
        return date.and_hms_opt(0, 0, 0);
    }

    // 仅时刻 → 锚定哨兵日期
    parse_time_text(text).map(|t| sentinel_date().and_time(t))
}

fn parse_date_text(raw: &str) -> Option<NaiveDate> {
    let text = raw.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
}

fn parse_time_text(raw: &str) -> Option<NaiveTime> {
    let text = raw.trim();
    TIME_FORMATS
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(text, fmt).ok())
}

/// 日期时间转换
///
/// # 规则
/// - 原生日期单元格原样通过
/// - 数值单元格按 Excel 序列号换算
/// - 文本按 日在前 → ISO → 仅日期(零点) → 仅时刻(哨兵日期) 顺序尝试
pub fn to_datetime(cell: &CellValue) -> Option<NaiveDateTime> {
    match cell {
        CellValue::DateTime(dt) => Some(*dt),
        CellValue::Float(f) => excel_serial_to_datetime(*f),
        CellValue::Int(i) => excel_serial_to_datetime(*i as f64),
        CellValue::Text(s) => parse_datetime_text(s),
        CellValue::Empty | CellValue::Bool(_) => None,
    }
}

/// 日期转换（带时刻的值取日期部分；仅时刻的文本不视为日期）
pub fn to_date(cell: &CellValue) -> Option<NaiveDate> {
    match cell {
        CellValue::Text(s) => parse_date_text(s).or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(s.trim(), fmt).ok())
                .map(|dt| dt.date())
        }),
        _ => to_datetime(cell).map(|dt| dt.date()),
    }
}

/// 时刻转换（日期时间取时刻部分；序列号取小数部分）
pub fn to_time(cell: &CellValue) -> Option<NaiveTime> {
    match cell {
        CellValue::Text(s) => parse_time_text(s).or_else(|| parse_datetime_text(s).map(|dt| dt.time())),
        _ => to_datetime(cell).map(|dt| dt.time()),
    }
}
