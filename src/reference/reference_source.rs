// ==========================================
// WorkWatch 报表导入 - 主数据来源
// ==========================================
// 职责: 按不透明标识取回一张二维表（首行为表头）
// 实现: FileReferenceSource（本地 CSV/XLSX 文件）
//       InMemoryReferenceSource（内存表，嵌入式调用与测试使用）
// ==========================================

use crate::importer::error::{ImportError, ImportResult};
use crate::importer::file_parser::{SheetTable, UniversalFileParser};
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::debug;

// ==========================================
// ReferenceSource Trait
// ==========================================
#[async_trait]
pub trait ReferenceSource: Send + Sync {
    /// 取回数据源的第一张表
    ///
    /// # 参数
    /// - source_id: 配置中的数据源标识
    async fn fetch_table(&self, source_id: &str) -> ImportResult<SheetTable>;
}

// ==========================================
// FileReferenceSource - 文件数据源
// ==========================================
// 标识即文件路径；相对路径基于 base_dir 解析
pub struct FileReferenceSource {
    base_dir: Option<PathBuf>,
    file_parser: UniversalFileParser,
}

impl FileReferenceSource {
    pub fn new() -> Self {
        Self {
            base_dir: None,
            file_parser: UniversalFileParser,
        }
    }

    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
            file_parser: UniversalFileParser,
        }
    }

    fn resolve_path(&self, source_id: &str) -> PathBuf {
        let path = Path::new(source_id.trim());
        match &self.base_dir {
            Some(base) if path.is_relative() => base.join(path),
            _ => path.to_path_buf(),
        }
    }
}

impl Default for FileReferenceSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReferenceSource for FileReferenceSource {
    async fn fetch_table(&self, source_id: &str) -> ImportResult<SheetTable> {
        let path = self.resolve_path(source_id);
        if !path.exists() {
            return Err(ImportError::FileNotFound(path.display().to_string()));
        }

        let bytes = tokio::fs::read(&path).await?;
        let filename = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| source_id.to_string());

        let mut workbook = self.file_parser.parse_bytes(&bytes, &filename)?;
        if workbook.sheets.is_empty() {
            return Err(ImportError::NoWorksheet(filename));
        }
        let table = workbook.sheets.swap_remove(0);
        debug!(source = %path.display(), rows = table.row_count(), "主数据表读取完成");
        Ok(table)
    }
}

// ==========================================
// InMemoryReferenceSource - 内存数据源
// ==========================================
#[derive(Default)]
pub struct InMemoryReferenceSource {
    tables: HashMap<String, SheetTable>,
}

impl InMemoryReferenceSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一张表（覆盖同名标识）
    pub fn insert(&mut self, source_id: &str, table: SheetTable) {
        self.tables.insert(source_id.to_string(), table);
    }
}

#[async_trait]
impl ReferenceSource for InMemoryReferenceSource {
    async fn fetch_table(&self, source_id: &str) -> ImportResult<SheetTable> {
        self.tables
            .get(source_id)
            .cloned()
            .ok_or_else(|| ImportError::FileNotFound(source_id.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[tokio::test]
    async fn test_file_source_relative_to_base_dir() {
        let dir = tempfile::tempdir().unwrap();
        let mut file = std::fs::File::create(dir.path().join("tags.csv")).unwrap();
        writeln!(file, "Номер,Тип,Описание").unwrap();
        writeln!(file, "501,BLE,Цех 1").unwrap();

        let source = FileReferenceSource::with_base_dir(dir.path());
        let table = source.fetch_table("tags.csv").await.unwrap();
        assert_eq!(table.headers.len(), 3);
        assert_eq!(table.row_count(), 1);
    }

    #[tokio::test]
    async fn test_file_source_missing_file() {
        let source = FileReferenceSource::new();
        let result = source.fetch_table("/nonexistent/employees.xlsx").await;
        assert!(matches!(result, Err(ImportError::FileNotFound(_))));
    }

    #[tokio::test]
    async fn test_in_memory_source() {
        let mut source = InMemoryReferenceSource::new();
        source.insert(
            "employees",
            SheetTable {
                name: "employees".to_string(),
                headers: vec!["ТН".to_string()],
                rows: Vec::new(),
            },
        );
        assert!(source.fetch_table("employees").await.is_ok());
        assert!(source.fetch_table("tags").await.is_err());
    }
}
