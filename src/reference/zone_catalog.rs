// ==========================================
// WorkWatch 报表导入 - 区域字典
// ==========================================
// 固定 14 项，按 zone_id 幂等 upsert
// zone_id = 1 为工作区（定位日志缺失区域时的默认值）
// ==========================================

use crate::domain::employee::Zone;

pub const ZONE_CATALOG: [(i64, &str); 14] = [
    (1, "Рабочая зона"),
    (2, "Зона отдыха"),
    (3, "Столовая"),
    (4, "Раздевалка"),
    (5, "Санузел"),
    (6, "Проходная"),
    (7, "Склад"),
    (8, "Офис"),
    (9, "Медпункт"),
    (10, "Место для курения"),
    (11, "Ремонтная зона"),
    (12, "Погрузочная площадка"),
    (13, "Транспортный коридор"),
    (14, "Вне зоны покрытия"),
];

/// 区域字典（按 zone_id 升序）
pub fn zone_catalog() -> Vec<Zone> {
    ZONE_CATALOG
        .iter()
        .map(|(zone_id, name)| Zone {
            zone_id: *zone_id,
            name: (*name).to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_WORK_ZONE_ID;
    use std::collections::HashSet;

    #[test]
    fn test_catalog_ids_unique() {
        let ids: HashSet<i64> = zone_catalog().iter().map(|z| z.zone_id).collect();
        assert_eq!(ids.len(), 14);
    }

    #[test]
    fn test_default_zone_is_work_zone() {
        let work = zone_catalog()
            .into_iter()
            .find(|z| z.zone_id == DEFAULT_WORK_ZONE_ID)
            .unwrap();
        assert_eq!(work.name, "Рабочая зона");
    }
}
