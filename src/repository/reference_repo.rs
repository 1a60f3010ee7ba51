// ==========================================
// WorkWatch 报表导入 - 标签/区域字典仓储
// ==========================================
// 职责: tags / zones 表的 upsert 与查询
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::employee::{Tag, Zone};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension};
use std::sync::{Arc, Mutex, MutexGuard};

#[async_trait]
pub trait ReferenceRepository: Send + Sync {
    /// 按 zone_id upsert 区域
    async fn upsert_zone(&self, zone: &Zone) -> RepositoryResult<()>;

    /// 按 tag_number upsert 标签（描述以本次为准）
    async fn upsert_tag(&self, tag: &Tag) -> RepositoryResult<()>;

    async fn list_zones(&self) -> RepositoryResult<Vec<Zone>>;

    async fn find_tag(&self, tag_number: i64) -> RepositoryResult<Option<Tag>>;

    async fn count_tags(&self) -> RepositoryResult<i64>;
}

pub struct ReferenceRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

impl ReferenceRepositoryImpl {
    pub fn new(db_path: &str) -> RepositoryResult<Self> {
        let conn = open_sqlite_connection(db_path)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    fn get_conn(&self) -> RepositoryResult<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }
}

#[async_trait]
impl ReferenceRepository for ReferenceRepositoryImpl {
    async fn upsert_zone(&self, zone: &Zone) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO zones (zone_id, name) VALUES (?1, ?2)
            ON CONFLICT(zone_id) DO UPDATE SET name = excluded.name
            "#,
            params![zone.zone_id, zone.name],
        )?;
        Ok(())
    }

    async fn upsert_tag(&self, tag: &Tag) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO tags (tag_number, description, updated_at) VALUES (?1, ?2, ?3)
            ON CONFLICT(tag_number) DO UPDATE SET
                description = excluded.description,
                updated_at = excluded.updated_at
            "#,
            params![tag.tag_number, tag.description, Local::now().naive_local()],
        )?;
        Ok(())
    }

    async fn list_zones(&self) -> RepositoryResult<Vec<Zone>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare("SELECT zone_id, name FROM zones ORDER BY zone_id")?;
        let zones = stmt
            .query_map([], |row| {
                Ok(Zone {
                    zone_id: row.get(0)?,
                    name: row.get(1)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(zones)
    }

    async fn find_tag(&self, tag_number: i64) -> RepositoryResult<Option<Tag>> {
        let conn = self.get_conn()?;
        let tag = conn
            .query_row(
                "SELECT tag_number, description FROM tags WHERE tag_number = ?1",
                params![tag_number],
                |row| {
                    Ok(Tag {
                        tag_number: row.get(0)?,
                        description: row.get(1)?,
                    })
                },
            )
            .optional()?;
        Ok(tag)
    }

    async fn count_tags(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM tags", [], |row| row.get(0))?;
        Ok(count)
    }
}
