// ==========================================
// WorkWatch 报表导入 - 配置管理器
// ==========================================
// 职责: 配置加载、查询、覆写管理
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::config::ingest_config_trait::IngestConfigReader;
use crate::db::open_sqlite_connection;
use crate::domain::employee::PLACEHOLDER_NAME;
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// 工作区 zone_id 默认值
pub const DEFAULT_WORK_ZONE_ID: i64 = 1;

/// 数据工作表序号默认值
pub const DEFAULT_DATA_SHEET_INDEX: usize = 1;

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 创建新的 ConfigManager 实例
    ///
    /// # 参数
    /// - db_path: 数据库文件路径
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> RepositoryResult<Self> {
        {
            let conn_guard = conn
                .lock()
                .map_err(|e| RepositoryError::LockError(e.to_string()))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值（已去除首尾空白，空串视为未配置）
    /// - None: 配置不存在
    pub fn get_config_value(&self, key: &str) -> RepositoryResult<Option<String>> {
        let conn = self.get_conn()?;

        let value: Option<String> = conn
            .query_row(
                "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty()))
    }

    /// 从 config_kv 表读取配置值，带默认值
    fn get_config_or_default(&self, key: &str, default: &str) -> RepositoryResult<String> {
        Ok(self
            .get_config_value(key)?
            .unwrap_or_else(|| default.to_string()))
    }

    /// 写入 global scope 配置（UPSERT）
    pub fn set_config_value(&self, key: &str, value: &str) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value, updated_at) VALUES ('global', ?1, ?2, datetime('now'))
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 删除 global scope 配置
    pub fn remove_config_value(&self, key: &str) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let deleted = conn.execute(
            "DELETE FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
        )?;
        Ok(deleted > 0)
    }

    /// 获取所有配置的快照（JSON格式）
    pub fn get_config_snapshot(&self) -> RepositoryResult<String> {
        let conn = self.get_conn()?;

        let mut stmt =
            conn.prepare("SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key")?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        serde_json::to_string(&json!(config_map))
            .map_err(|e| RepositoryError::InternalError(e.to_string()))
    }
}

// ==========================================
// IngestConfigReader Trait 实现
// ==========================================
#[async_trait]
impl IngestConfigReader for ConfigManager {
    async fn get_employee_source(&self) -> RepositoryResult<Option<String>> {
        self.get_config_value(config_keys::EMPLOYEE_SOURCE)
    }

    async fn get_tag_source(&self) -> RepositoryResult<Option<String>> {
        self.get_config_value(config_keys::TAG_SOURCE)
    }

    async fn get_default_zone_id(&self) -> RepositoryResult<i64> {
        let value = self.get_config_or_default(
            config_keys::DEFAULT_ZONE_ID,
            &DEFAULT_WORK_ZONE_ID.to_string(),
        )?;
        Ok(value.parse::<i64>().unwrap_or_else(|_| {
            tracing::warn!(
                config_key = config_keys::DEFAULT_ZONE_ID,
                raw_value = %value,
                "工作区配置格式错误，使用默认值"
            );
            DEFAULT_WORK_ZONE_ID
        }))
    }

    async fn get_data_sheet_index(&self) -> RepositoryResult<usize> {
        let value = self.get_config_or_default(
            config_keys::DATA_SHEET_INDEX,
            &DEFAULT_DATA_SHEET_INDEX.to_string(),
        )?;
        Ok(value.parse::<usize>().unwrap_or(DEFAULT_DATA_SHEET_INDEX))
    }

    async fn get_placeholder_name(&self) -> RepositoryResult<String> {
        self.get_config_or_default(config_keys::PLACEHOLDER_NAME, PLACEHOLDER_NAME)
    }
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 主数据来源
    pub const EMPLOYEE_SOURCE: &str = "reference.employee_source";
    pub const TAG_SOURCE: &str = "reference.tag_source";

    // 导入参数
    pub const DEFAULT_ZONE_ID: &str = "ingest.default_zone_id";
    pub const DATA_SHEET_INDEX: &str = "ingest.data_sheet_index";
    pub const PLACEHOLDER_NAME: &str = "ingest.placeholder_name";
}
