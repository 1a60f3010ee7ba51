// ==========================================
// WorkWatch 报表导入 - 工作簿解析器
// ==========================================
// 支持: Excel (.xlsx/.xlsm/.xls) / CSV (.csv)
// 输入: 内存字节 + 文件名（扩展名决定解析器）
// 输出: 多工作表的二维单元格表（首行为表头）
// ==========================================

use crate::importer::coercion::excel_serial_to_datetime;
use crate::importer::error::{ImportError, ImportResult};
use calamine::{open_workbook_auto_from_rs, Data, Reader};
use chrono::NaiveDateTime;
use csv::ReaderBuilder;
use std::io::Cursor;
use std::path::Path;

// ==========================================
// CellValue - 单元格原始值
// ==========================================
// 保留 Excel 原生类型，文本统一去除首尾空白
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    DateTime(NaiveDateTime),
}

impl CellValue {
    /// 从文本构造（空白视为 Empty）
    pub fn from_text(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(trimmed.to_string())
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, CellValue::Empty)
    }

    /// 文本表示（Empty 返回 None）
    pub fn as_text(&self) -> Option<String> {
        match self {
            CellValue::Empty => None,
            CellValue::Text(s) => Some(s.clone()),
            CellValue::Int(i) => Some(i.to_string()),
            CellValue::Float(f) => Some(f.to_string()),
            CellValue::Bool(b) => Some(b.to_string()),
            CellValue::DateTime(dt) => Some(dt.format("%Y-%m-%d %H:%M:%S").to_string()),
        }
    }
}

impl From<&Data> for CellValue {
    fn from(cell: &Data) -> Self {
        match cell {
            Data::Empty | Data::Error(_) => CellValue::Empty,
            Data::String(s) => CellValue::from_text(s),
            Data::Int(i) => CellValue::Int(*i),
            Data::Float(f) => CellValue::Float(*f),
            Data::Bool(b) => CellValue::Bool(*b),
            Data::DateTime(dt) => excel_serial_to_datetime(dt.as_f64())
                .map(CellValue::DateTime)
                .unwrap_or(CellValue::Empty),
            Data::DateTimeIso(s) | Data::DurationIso(s) => CellValue::from_text(s),
        }
    }
}

static EMPTY_CELL: CellValue = CellValue::Empty;

// ==========================================
// SheetTable - 单张工作表
// ==========================================
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SheetTable {
    pub name: String,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl SheetTable {
    /// 读取单元格（越界视为 Empty）
    pub fn cell(&self, row: usize, col: usize) -> &CellValue {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// 从二维单元格构造：首个非空行为表头，完全空白的数据行被跳过
    fn from_grid(name: &str, grid: Vec<Vec<CellValue>>) -> ImportResult<Self> {
        let mut iter = grid
            .into_iter()
            .filter(|row| row.iter().any(|c| !c.is_empty()));

        let header_row = iter
            .next()
            .ok_or_else(|| ImportError::EmptySheet(name.to_string()))?;

        let headers: Vec<String> = header_row
            .iter()
            .map(|cell| {
                cell.as_text()
                    .unwrap_or_default()
                    .trim_start_matches('\u{feff}')
                    .trim()
                    .to_string()
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            headers,
            rows: iter.collect(),
        })
    }
}

// ==========================================
// Workbook - 解析后的工作簿
// ==========================================
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Workbook {
    pub sheets: Vec<SheetTable>,
}

impl Workbook {
    /// 选择数据工作表: preferred 存在则用之，否则回退第 0 张
    pub fn select_data_sheet(&self, preferred: usize) -> Option<&SheetTable> {
        self.sheets.get(preferred).or_else(|| self.sheets.first())
    }
}

// ==========================================
// FileParser Trait
// ==========================================
pub trait FileParser: Send + Sync {
    /// 将文件字节解析为工作簿
    fn parse_bytes(&self, bytes: &[u8], filename: &str) -> ImportResult<Workbook>;
}

// ==========================================
// CSV Parser 实现
// ==========================================
// CSV 视为单工作表工作簿；分隔符按首行嗅探（; 或 ,）
pub struct CsvParser;

impl CsvParser {
    fn sniff_delimiter(bytes: &[u8]) -> u8 {
        let first_line = bytes.split(|b| *b == b'\n').next().unwrap_or(&[]);
        let semicolons = first_line.iter().filter(|b| **b == b';').count();
        let commas = first_line.iter().filter(|b| **b == b',').count();
        if semicolons > commas {
            b';'
        } else {
            b','
        }
    }
}

impl FileParser for CsvParser {
    fn parse_bytes(&self, bytes: &[u8], filename: &str) -> ImportResult<Workbook> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true) // 允许行长度不一致
            .delimiter(Self::sniff_delimiter(bytes))
            .from_reader(bytes);

        let mut grid = Vec::new();
        for result in reader.records() {
            let record = result?;
            grid.push(record.iter().map(CellValue::from_text).collect());
        }

        let sheet = SheetTable::from_grid(filename, grid)?;
        Ok(Workbook {
            sheets: vec![sheet],
        })
    }
}

// ==========================================
// Excel Parser 实现
// ==========================================
// 自动识别 xlsx/xls/xlsb/ods 容器
pub struct ExcelParser;

impl FileParser for ExcelParser {
    fn parse_bytes(&self, bytes: &[u8], filename: &str) -> ImportResult<Workbook> {
        let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))?;

        let sheet_names = workbook.sheet_names();
        if sheet_names.is_empty() {
            return Err(ImportError::NoWorksheet(filename.to_string()));
        }

        let mut sheets = Vec::with_capacity(sheet_names.len());
        for sheet_name in sheet_names {
            let range = workbook.worksheet_range(&sheet_name)?;
            let grid: Vec<Vec<CellValue>> = range
                .rows()
                .map(|row| row.iter().map(CellValue::from).collect())
                .collect();

            // 空白工作表保留占位，保证工作表序号不偏移
            let sheet = match SheetTable::from_grid(&sheet_name, grid) {
                Ok(sheet) => sheet,
                Err(ImportError::EmptySheet(_)) => SheetTable {
                    name: sheet_name.clone(),
                    ..SheetTable::default()
                },
                Err(e) => return Err(e),
            };
            sheets.push(sheet);
        }

        Ok(Workbook { sheets })
    }
}

// ==========================================
// 通用文件解析器（根据扩展名自动选择）
// ==========================================
pub struct UniversalFileParser;

impl UniversalFileParser {
    /// 解析内存中的文件
    pub fn parse_bytes(&self, bytes: &[u8], filename: &str) -> ImportResult<Workbook> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match ext.as_str() {
            "csv" => CsvParser.parse_bytes(bytes, filename),
            "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => ExcelParser.parse_bytes(bytes, filename),
            _ => Err(ImportError::UnsupportedFormat(filename.to_string())),
        }
    }

    /// 解析磁盘文件
    pub fn parse_path<P: AsRef<Path>>(&self, file_path: P) -> ImportResult<Workbook> {
        let path = file_path.as_ref();
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let bytes = std::fs::read(path)?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        self.parse_bytes(&bytes, &filename)
    }
}
