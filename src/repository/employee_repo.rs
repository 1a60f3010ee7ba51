// ==========================================
// WorkWatch 报表导入 - 员工仓储
// ==========================================
// 职责: employees 表的读取与写入（使用 rusqlite）
// 红线: Repository 不含业务规则，只做数据 CRUD
// ==========================================

use crate::db::open_sqlite_connection;
use crate::domain::employee::{Employee, EmployeeUpsert, PLACEHOLDER_NAME};
use crate::repository::error::{RepositoryError, RepositoryResult};
use async_trait::async_trait;
use chrono::Local;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::sync::{Arc, Mutex, MutexGuard};

// ==========================================
// EmployeeRepository Trait
// ==========================================
// 用途: 身份缓存与对账器共用的员工数据访问
#[async_trait]
pub trait EmployeeRepository: Send + Sync {
    /// 全量读取员工（身份缓存在批次开始时一次性预热）
    async fn list_all(&self) -> RepositoryResult<Vec<Employee>>;

    /// 按工号查询
    async fn find_by_number(&self, tn_number: i64) -> RepositoryResult<Option<Employee>>;

    /// 按工号创建员工；工号已存在时不做修改
    ///
    /// # 返回
    /// - Ok(Employee): 新建或已存在的员工
    async fn insert_if_absent(&self, tn_number: i64, name: &str) -> RepositoryResult<Employee>;

    /// 仅当当前姓名为占位值（空白、Unknown 或 placeholder）时写入真实姓名
    ///
    /// # 返回
    /// - Ok(true): 已更新
    /// - Ok(false): 当前姓名非占位值，未修改
    async fn fill_placeholder_name(
        &self,
        id: i64,
        name: &str,
        placeholder: &str,
    ) -> RepositoryResult<bool>;

    /// 按工号 upsert（姓名、部门非空时以本次数据为准，空值不覆盖已有值）
    async fn upsert(&self, employee: &EmployeeUpsert) -> RepositoryResult<i64>;

    /// 员工总数
    async fn count(&self) -> RepositoryResult<i64>;
}

// ==========================================
// EmployeeRepositoryImpl
// ==========================================
pub struct EmployeeRepositoryImpl {
    conn: Arc<Mutex<Connection>>,
}

const EMPLOYEE_COLUMNS: &str = "id, tn_number, name, department, created_at, updated_at";

impl EmployeeRepositoryImpl {
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

    fn map_row(row: &Row<'_>) -> rusqlite::Result<Employee> {
        Ok(Employee {
            id: row.get(0)?,
            tn_number: row.get(1)?,
            name: row.get(2)?,
            department: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    fn find_by_number_locked(
        conn: &Connection,
        tn_number: i64,
    ) -> RepositoryResult<Option<Employee>> {
        let sql = format!(
            "SELECT {} FROM employees WHERE tn_number = ?1",
            EMPLOYEE_COLUMNS
        );
        let employee = conn
            .query_row(&sql, params![tn_number], Self::map_row)
            .optional()?;
        Ok(employee)
    }
}

/// 去除首尾空白，空串视为无值
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait]
impl EmployeeRepository for EmployeeRepositoryImpl {
    async fn list_all(&self) -> RepositoryResult<Vec<Employee>> {
        let conn = self.get_conn()?;
        let sql = format!("SELECT {} FROM employees ORDER BY tn_number", EMPLOYEE_COLUMNS);
        let mut stmt = conn.prepare(&sql)?;
        let employees = stmt
            .query_map([], Self::map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(employees)
    }

    async fn find_by_number(&self, tn_number: i64) -> RepositoryResult<Option<Employee>> {
        let conn = self.get_conn()?;
        Self::find_by_number_locked(&conn, tn_number)
    }

    async fn insert_if_absent(&self, tn_number: i64, name: &str) -> RepositoryResult<Employee> {
        let conn = self.get_conn()?;
        let now = Local::now().naive_local();
        let name = if name.trim().is_empty() {
            PLACEHOLDER_NAME
        } else {
            name.trim()
        };

        // ON CONFLICT DO NOTHING: 并发对账已创建时沿用已有行
        conn.execute(
            r#"
            INSERT INTO employees (tn_number, name, department, created_at, updated_at)
            VALUES (?1, ?2, NULL, ?3, ?3)
            ON CONFLICT(tn_number) DO NOTHING
            "#,
            params![tn_number, name, now],
        )?;

        Self::find_by_number_locked(&conn, tn_number)?.ok_or_else(|| RepositoryError::NotFound {
            entity: "Employee".to_string(),
            id: tn_number.to_string(),
        })
    }

    async fn fill_placeholder_name(
        &self,
        id: i64,
        name: &str,
        placeholder: &str,
    ) -> RepositoryResult<bool> {
        let conn = self.get_conn()?;
        let now = Local::now().naive_local();
        let changed = conn.execute(
            r#"
            UPDATE employees SET name = ?1, updated_at = ?2
            WHERE id = ?3
              AND (TRIM(name) = '' OR LOWER(TRIM(name)) IN (LOWER(?4), LOWER(?5)))
            "#,
            params![name.trim(), now, id, PLACEHOLDER_NAME, placeholder.trim()],
        )?;
        Ok(changed > 0)
    }

    async fn upsert(&self, employee: &EmployeeUpsert) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let now = Local::now().naive_local();
        let name = non_blank(employee.name.as_deref());
        let department = non_blank(employee.department.as_deref());
        let id: i64 = conn.query_row(
            r#"
            INSERT INTO employees (tn_number, name, department, created_at, updated_at)
            VALUES (?1, COALESCE(?2, ?5), ?3, ?4, ?4)
            ON CONFLICT(tn_number) DO UPDATE SET
                name = COALESCE(?2, employees.name),
                department = COALESCE(?3, employees.department),
                updated_at = excluded.updated_at
            RETURNING id
            "#,
            params![employee.tn_number, name, department, now, PLACEHOLDER_NAME],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    async fn count(&self) -> RepositoryResult<i64> {
        let conn = self.get_conn()?;
        let count = conn.query_row("SELECT COUNT(*) FROM employees", [], |row| row.get(0))?;
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_schema;

    fn test_repo() -> EmployeeRepositoryImpl {
        let conn = open_sqlite_connection(":memory:").unwrap();
        init_schema(&conn).unwrap();
        EmployeeRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_insert_if_absent_keeps_existing() {
        let repo = test_repo();
        let first = repo.insert_if_absent(1001, "Иванов И.").await.unwrap();
        let second = repo.insert_if_absent(1001, "Другое имя").await.unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.name, "Иванов И.");
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_blank_name_becomes_placeholder() {
        let repo = test_repo();
        let employee = repo.insert_if_absent(7, "   ").await.unwrap();
        assert!(employee.has_placeholder_name());
    }

    #[tokio::test]
    async fn test_fill_placeholder_only_once() {
        let repo = test_repo();
        let employee = repo.insert_if_absent(42, PLACEHOLDER_NAME).await.unwrap();

        assert!(repo
            .fill_placeholder_name(employee.id, "Петров П.", PLACEHOLDER_NAME)
            .await
            .unwrap());
        assert!(!repo
            .fill_placeholder_name(employee.id, "Сидоров С.", PLACEHOLDER_NAME)
            .await
            .unwrap());

        let stored = repo.find_by_number(42).await.unwrap().unwrap();
        assert_eq!(stored.name, "Петров П.");
    }

    #[tokio::test]
    async fn test_fill_custom_placeholder() {
        let repo = test_repo();
        let employee = repo.insert_if_absent(43, "Без имени").await.unwrap();

        assert!(!repo
            .fill_placeholder_name(employee.id, "Орлов О.", PLACEHOLDER_NAME)
            .await
            .unwrap());
        assert!(repo
            .fill_placeholder_name(employee.id, "Орлов О.", "Без имени")
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn test_upsert_updates_name_and_department() {
        let repo = test_repo();
        let created = repo.insert_if_absent(5, PLACEHOLDER_NAME).await.unwrap();

        let id = repo
            .upsert(&EmployeeUpsert {
                tn_number: 5,
                name: Some("Смирнова А.".to_string()),
                department: Some("Цех #1".to_string()),
            })
            .await
            .unwrap();

        assert_eq!(id, created.id);
        let stored = repo.find_by_number(5).await.unwrap().unwrap();
        assert_eq!(stored.name, "Смирнова А.");
        assert_eq!(stored.department.as_deref(), Some("Цех #1"));
    }

    #[tokio::test]
    async fn test_upsert_blank_values_keep_existing() {
        let repo = test_repo();
        repo.upsert(&EmployeeUpsert {
            tn_number: 6,
            name: Some("Иванов".to_string()),
            department: Some("ОТК".to_string()),
        })
        .await
        .unwrap();

        repo.upsert(&EmployeeUpsert {
            tn_number: 6,
            name: Some("   ".to_string()),
            department: None,
        })
        .await
        .unwrap();

        let stored = repo.find_by_number(6).await.unwrap().unwrap();
        assert_eq!(stored.name, "Иванов");
        assert_eq!(stored.department.as_deref(), Some("ОТК"));
    }

    #[tokio::test]
    async fn test_upsert_without_name_creates_placeholder() {
        let repo = test_repo();
        repo.upsert(&EmployeeUpsert {
            tn_number: 8,
            name: None,
            department: None,
        })
        .await
        .unwrap();

        let stored = repo.find_by_number(8).await.unwrap().unwrap();
        assert!(stored.has_placeholder_name());
    }
}
