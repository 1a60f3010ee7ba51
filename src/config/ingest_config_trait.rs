// ==========================================
// WorkWatch 报表导入 - 导入配置读取 Trait
// ==========================================
// 职责: 定义导入与对账所需的配置读取接口（不包含实现）
// 红线: 不包含配置写入、不包含业务逻辑
// ==========================================

use crate::repository::error::RepositoryResult;
use async_trait::async_trait;

// ==========================================
// IngestConfigReader Trait
// ==========================================
// 用途: 导入流程与对账器的配置读取
// 实现者: ConfigManager（从 config_kv 表读取）
#[async_trait]
pub trait IngestConfigReader: Send + Sync {
    // ===== 主数据来源 =====

    /// 员工映射表数据源标识
    ///
    /// # 返回
    /// - Some(id): 已配置
    /// - None: 未配置（对账时静默跳过该数据源）
    async fn get_employee_source(&self) -> RepositoryResult<Option<String>>;

    /// 标签台账数据源标识（None 表示未配置）
    async fn get_tag_source(&self) -> RepositoryResult<Option<String>>;

    // ===== 导入参数 =====

    /// 定位日志缺失区域时使用的工作区 zone_id
    ///
    /// # 默认值
    /// - 1
    async fn get_default_zone_id(&self) -> RepositoryResult<i64>;

    /// 数据所在工作表序号（不存在时回退到第 0 张）
    ///
    /// # 默认值
    /// - 1（报表第 0 张为表头/元信息）
    async fn get_data_sheet_index(&self) -> RepositoryResult<usize>;

    /// 员工首次出现且无姓名时使用的占位名
    ///
    /// # 默认值
    /// - "Unknown"
    async fn get_placeholder_name(&self) -> RepositoryResult<String>;
}
