// ==========================================
// WorkWatch 报表导入 - 列名规范化
// ==========================================
// 职责: 将俄/英文、大小写与空白不一致的表头映射到规范字段名
// 规则: 静态同义词表，键为去空白 + 小写 + 折叠内部空白后的表头
//       未登记的表头原样透传（不丢弃）
// ==========================================

use std::collections::HashMap;
use std::sync::OnceLock;

// ==========================================
// 规范字段名
// ==========================================
pub mod canonical {
    pub const TN: &str = "tn";
    pub const NAME: &str = "name";
    pub const DEPARTMENT: &str = "department";
    pub const DATE: &str = "date";
    pub const START: &str = "start";
    pub const END: &str = "end";
    pub const DURATION: &str = "duration";
    pub const TAG: &str = "tag";
    pub const ZONE: &str = "zone";
    pub const SHIFT_DAY: &str = "shift_day";
    pub const TIME: &str = "time";
    pub const ACTIVE_PERCENT: &str = "active_percent";
    pub const IDLE_PERCENT: &str = "idle_percent";
    pub const TRANSIT_PERCENT: &str = "transit_percent";
    pub const ACTIVE_SECONDS: &str = "active_seconds";
    pub const IDLE_SECONDS: &str = "idle_seconds";
    pub const TRANSIT_SECONDS: &str = "transit_seconds";
}

// 同义词表: (规范名, [同义表头...])
const SYNONYMS: &[(&str, &[&str])] = &[
    (
        canonical::TN,
        &[
            "tn",
            "тн",
            "табельный номер",
            "табельный №",
            "таб. номер",
            "таб.номер",
            "таб. №",
            "employee number",
            "personnel number",
        ],
    ),
    (
        canonical::NAME,
        &["фио", "fio", "name", "full name", "сотрудник", "employee", "employee name"],
    ),
    (
        canonical::DEPARTMENT,
        &["department", "подразделение", "отдел", "цех", "участок"],
    ),
    (canonical::DATE, &["date", "дата", "дата смены", "shift date"]),
    (
        canonical::START,
        &[
            "date_begin",
            "dt_start",
            "начало",
            "начало смены",
            "начало простоя",
            "start",
            "begin",
            "start time",
        ],
    ),
    (
        canonical::END,
        &[
            "date_end",
            "dt_end",
            "конец",
            "окончание",
            "конец смены",
            "конец простоя",
            "end",
            "end time",
        ],
    ),
    (
        canonical::DURATION,
        &[
            "duration",
            "длительность",
            "длительность, мин",
            "длительность (мин)",
            "продолжительность",
            "duration, min",
        ],
    ),
    (
        canonical::TAG,
        &[
            "chosen_ble_tag_number",
            "ble_tag",
            "метка",
            "ble метка",
            "номер метки",
            "tag",
            "tag number",
        ],
    ),
    (canonical::ZONE, &["zone_id", "зона", "номер зоны", "zone"]),
    (canonical::SHIFT_DAY, &["shift_day", "день смены", "shift day"]),
    (canonical::TIME, &["time_only", "время", "time"]),
    (
        canonical::ACTIVE_PERCENT,
        &["full_work", "работа, %", "работа %", "active, %", "active_percent"],
    ),
    (
        canonical::IDLE_PERCENT,
        &["full_idle", "простой, %", "простой %", "idle, %", "idle_percent"],
    ),
    (
        canonical::TRANSIT_PERCENT,
        &["full_go", "перемещение, %", "перемещение %", "transit, %", "transit_percent"],
    ),
    (
        canonical::ACTIVE_SECONDS,
        &["full_work_seconds", "работа, сек", "работа, с", "active, s", "active_seconds"],
    ),
    (
        canonical::IDLE_SECONDS,
        &["full_idle_seconds", "простой, сек", "простой, с", "idle, s", "idle_seconds"],
    ),
    (
        canonical::TRANSIT_SECONDS,
        &[
            "full_go_seconds",
            "перемещение, сек",
            "перемещение, с",
            "transit, s",
            "transit_seconds",
        ],
    ),
];

fn synonym_index() -> &'static HashMap<&'static str, &'static str> {
    static INDEX: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();
    INDEX.get_or_init(|| {
        SYNONYMS
            .iter()
            .flat_map(|(target, aliases)| aliases.iter().map(move |alias| (*alias, *target)))
            .collect()
    })
}

/// 表头查找键: 去首尾空白、小写、折叠内部空白
pub fn header_key(raw: &str) -> String {
    raw.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// 单个表头规范化（未登记的原样透传，仅去首尾空白）
pub fn normalize_header(raw: &str) -> String {
    match synonym_index().get(header_key(raw).as_str()) {
        Some(target) => (*target).to_string(),
        None => raw.trim().to_string(),
    }
}

/// 整行表头规范化
pub fn normalize_headers(headers: &[String]) -> Vec<String> {
    headers.iter().map(|h| normalize_header(h)).collect()
}

// ==========================================
// ColumnIndex - 规范名 → 列序号
// ==========================================
// 同一规范名出现多次时取第一列
#[derive(Debug, Clone, Default)]
pub struct ColumnIndex {
    positions: HashMap<String, usize>,
}

impl ColumnIndex {
    /// 对原始表头做规范化并建立索引
    pub fn from_raw_headers(headers: &[String]) -> Self {
        let mut positions = HashMap::new();
        for (idx, name) in normalize_headers(headers).into_iter().enumerate() {
            positions.entry(name).or_insert(idx);
        }
        Self { positions }
    }

    pub fn get(&self, field: &str) -> Option<usize> {
        self.positions.get(field).copied()
    }

    pub fn contains(&self, field: &str) -> bool {
        self.positions.contains_key(field)
    }
}
