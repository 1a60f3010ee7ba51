// ==========================================
// WorkWatch 报表导入 - 员工身份缓存
// ==========================================
// 作用域: 单次导入调用（用完即弃）
// 流程: 开始时批量加载全部工号 → 命中直接返回
//       未命中 → 回查存储 → 仍无则以报表姓名（或占位名）新建
// ==========================================

use crate::domain::employee::is_placeholder_name;
use crate::repository::employee_repo::EmployeeRepository;
use crate::repository::error::RepositoryResult;
use std::collections::HashMap;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
struct CachedIdentity {
    id: i64,
    placeholder: bool, // 当前仍为占位名
}

/// 缓存统计
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IdentityStats {
    pub preloaded: usize,
    pub created: usize,
    pub names_filled: usize,
}

// ==========================================
// IdentityCache
// ==========================================
pub struct IdentityCache<'a> {
    repo: &'a dyn EmployeeRepository,
    placeholder_name: String,
    known: HashMap<i64, CachedIdentity>,
    stats: IdentityStats,
}

impl<'a> IdentityCache<'a> {
    /// 批量加载已知员工
    pub async fn load(
        repo: &'a dyn EmployeeRepository,
        placeholder_name: &str,
    ) -> RepositoryResult<IdentityCache<'a>> {
        let known: HashMap<i64, CachedIdentity> = repo
            .list_all()
            .await?
            .into_iter()
            .map(|e| {
                let placeholder = e.has_placeholder_name()
                    || e.name.trim().eq_ignore_ascii_case(placeholder_name.trim());
                (
                    e.tn_number,
                    CachedIdentity {
                        id: e.id,
                        placeholder,
                    },
                )
            })
            .collect();

        let stats = IdentityStats {
            preloaded: known.len(),
            ..IdentityStats::default()
        };

        Ok(Self {
            repo,
            placeholder_name: placeholder_name.to_string(),
            known,
            stats,
        })
    }

    /// 工号 → 内部ID
    ///
    /// # 参数
    /// - tn_number: 工号
    /// - name: 报表中的姓名（可缺失）；仅用于新建员工或替换占位名
    pub async fn resolve(&mut self, tn_number: i64, name: Option<&str>) -> RepositoryResult<i64> {
        let placeholder_name = self.placeholder_name.clone();
        let real_name = name
            .map(str::trim)
            .filter(|n| !is_placeholder_name(n) && !n.eq_ignore_ascii_case(&placeholder_name));

        let cached = match self.known.get(&tn_number) {
            Some(cached) => *cached,
            None => self.fetch_or_create(tn_number, real_name).await?,
        };

        if cached.placeholder {
            if let Some(real_name) = real_name {
                if self
                    .repo
                    .fill_placeholder_name(cached.id, real_name, &self.placeholder_name)
                    .await?
                {
                    self.stats.names_filled += 1;
                    debug!(tn_number, employee_id = cached.id, "占位名已替换为报表姓名");
                }
                self.known.insert(
                    tn_number,
                    CachedIdentity {
                        id: cached.id,
                        placeholder: false,
                    },
                );
            }
        }

        Ok(cached.id)
    }

    /// 缓存未命中: 回查存储，仍无则新建
    async fn fetch_or_create(
        &mut self,
        tn_number: i64,
        real_name: Option<&str>,
    ) -> RepositoryResult<CachedIdentity> {
        let employee = match self.repo.find_by_number(tn_number).await? {
            Some(existing) => existing,
            None => {
                let name = real_name.unwrap_or(self.placeholder_name.as_str());
                let created = self.repo.insert_if_absent(tn_number, name).await?;
                self.stats.created += 1;
                debug!(tn_number, employee_id = created.id, "新建员工身份");
                created
            }
        };

        let cached = CachedIdentity {
            id: employee.id,
            placeholder: employee.has_placeholder_name()
                || employee.name.trim().eq_ignore_ascii_case(self.placeholder_name.trim()),
        };
        self.known.insert(tn_number, cached);
        Ok(cached)
    }

    pub fn stats(&self) -> IdentityStats {
        self.stats
    }

    pub fn len(&self) -> usize {
        self.known.len()
    }

    pub fn is_empty(&self) -> bool {
        self.known.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::open_and_init;
    use crate::repository::employee_repo::EmployeeRepositoryImpl;
    use std::sync::{Arc, Mutex};

    fn test_repo() -> EmployeeRepositoryImpl {
        let conn = open_and_init(":memory:").unwrap();
        EmployeeRepositoryImpl::from_connection(Arc::new(Mutex::new(conn)))
    }

    #[tokio::test]
    async fn test_resolve_creates_once() {
        let repo = test_repo();
        let mut cache = IdentityCache::load(&repo, "Unknown").await.unwrap();

        let first = cache.resolve(1001, Some("Иванов")).await.unwrap();
        let second = cache.resolve(1001, None).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(repo.count().await.unwrap(), 1);
        assert_eq!(cache.stats().created, 1);
    }

    #[tokio::test]
    async fn test_preloaded_identity_is_reused() {
        let repo = test_repo();
        let existing = repo.insert_if_absent(2002, "Петров").await.unwrap();

        let mut cache = IdentityCache::load(&repo, "Unknown").await.unwrap();
        assert_eq!(cache.stats().preloaded, 1);
        assert_eq!(cache.resolve(2002, Some("Другое имя")).await.unwrap(), existing.id);

        // 已有真实姓名不被报表覆盖
        let stored = repo.find_by_number(2002).await.unwrap().unwrap();
        assert_eq!(stored.name, "Петров");
    }

    #[tokio::test]
    async fn test_placeholder_is_filled_by_later_name() {
        let repo = test_repo();
        let mut cache = IdentityCache::load(&repo, "Unknown").await.unwrap();

        let id = cache.resolve(3003, None).await.unwrap();
        assert_eq!(repo.find_by_number(3003).await.unwrap().unwrap().name, "Unknown");

        assert_eq!(cache.resolve(3003, Some("Сидоров")).await.unwrap(), id);
        assert_eq!(repo.find_by_number(3003).await.unwrap().unwrap().name, "Сидоров");
        assert_eq!(cache.stats().names_filled, 1);
    }

    #[tokio::test]
    async fn test_store_recheck_on_miss() {
        let repo = test_repo();
        let mut cache = IdentityCache::load(&repo, "Unknown").await.unwrap();
        assert!(cache.is_empty());

        // 加载后才出现在存储中的员工
        let late = repo.insert_if_absent(4004, "Кузнецов").await.unwrap();
        assert_eq!(cache.resolve(4004, None).await.unwrap(), late.id);
        assert_eq!(cache.stats().created, 0);
        assert_eq!(cache.len(), 1);
    }
}
