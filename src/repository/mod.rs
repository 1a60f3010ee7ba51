// ==========================================
// WorkWatch 报表导入 - 数据仓储层
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 提供数据访问接口,屏蔽数据库细节
// 约束: 所有查询使用参数化,防止 SQL 注入
// ==========================================

pub mod employee_repo;
pub mod error;
pub mod ingestion_repo;
pub mod ingestion_repo_impl;
pub mod reference_repo;

// 重导出核心仓储
pub use employee_repo::{EmployeeRepository, EmployeeRepositoryImpl};
pub use error::{RepositoryError, RepositoryResult};
pub use ingestion_repo::IngestionRepository;
pub use ingestion_repo_impl::IngestionRepositoryImpl;
pub use reference_repo::{ReferenceRepository, ReferenceRepositoryImpl};
