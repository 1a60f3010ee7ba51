// ==========================================
// WorkWatch 报表导入 - 主数据层
// ==========================================
// 职责: 员工 / 标签 / 区域三张主数据表的对账
// ==========================================

pub mod reconciler;
pub mod reference_source;
pub mod zone_catalog;

pub use reconciler::ReferenceReconciler;
pub use reference_source::{FileReferenceSource, InMemoryReferenceSource, ReferenceSource};
pub use zone_catalog::{zone_catalog, ZONE_CATALOG};
