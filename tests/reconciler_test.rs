// ==========================================
// 主数据对账集成测试
// ==========================================
// 测试目标: 验证区域/员工/标签对账的幂等性与问题收集
// ==========================================


use std::sync::{Arc, Mutex};
use rusqlite::Connection;
use workwatch_ingest::config::{config_keys, ConfigManager};
use workwatch_ingest::importer::{CellValue, SheetTable};
use workwatch_ingest::reference::reconciler::actions;
use workwatch_ingest::reference::{
    FileReferenceSource, InMemoryReferenceSource, ReferenceReconciler, ReferenceSource,
};
use workwatch_ingest::repository::{
    EmployeeRepository, EmployeeRepositoryImpl, ReferenceRepository, ReferenceRepositoryImpl,
};
use test_helpers::{create_test_db, insert_test_config, shared_connection};

type TestReconciler =
    ReferenceReconciler<EmployeeRepositoryImpl, ReferenceRepositoryImpl, ConfigManager>;

fn table(headers: &[&str], rows: &[&[&str]]) -> SheetTable {
    SheetTable {
        name: "Лист1".to_string(),
        headers: headers.iter().map(|h| h.to_string()).collect(),
        rows: rows
            .iter()
            .map(|r| r.iter().map(|c| CellValue::from_text(c)).collect())
            .collect(),
    }
}

fn create_reconciler(conn: Arc<Mutex<Connection>>, source: Box<dyn ReferenceSource>) -> TestReconciler {
    ReferenceReconciler::new(
        EmployeeRepositoryImpl::from_connection(conn.clone()),
        ReferenceRepositoryImpl::from_connection(conn.clone()),
        ConfigManager::from_connection(conn).expect("Failed to create ConfigManager"),
        source,
    )
}

#[tokio::test]
async fn test_unconfigured_sources_are_skipped() {
    let (_temp, db_path) = create_test_db().unwrap();
    let conn = shared_connection(&db_path);
    let reconciler = create_reconciler(conn, Box::new(InMemoryReferenceSource::new()));

    let report = reconciler.reconcile().await;

    assert_eq!(report.zones_upserted, 14);
    assert_eq!(report.employees_upserted, 0);
    assert_eq!(report.tags_upserted, 0);
    assert!(report.is_clean());
    assert!(report.skipped_sources.contains(&actions::SYNC_EMPLOYEES.to_string()));
    assert!(report.skipped_sources.contains(&actions::SYNC_TAGS.to_string()));
}

#[tokio::test]
async fn test_reconcile_is_idempotent() {
    let (_temp, db_path) = create_test_db().unwrap();
    insert_test_config(&db_path, config_keys::EMPLOYEE_SOURCE, "employees");
    insert_test_config(&db_path, config_keys::TAG_SOURCE, "tags");
    let conn = shared_connection(&db_path);

    let mut source = InMemoryReferenceSource::new();
    source.insert(
        "employees",
        table(
            &["Табельный номер", "ФИО", "Подразделение"],
            &[
                &["1001", "Иванов И.И.", "Цех 1"],
                &["1002", "Петров П.П.", ""],
                &["итого", "", ""],
            ],
        ),
    );
    source.insert(
        "tags",
        table(
            &["Номер", "Тип", "Описание"],
            &[&["77", "каска", "Каска №77"], &["78", "браслет", ""]],
        ),
    );
    let reconciler = create_reconciler(conn.clone(), Box::new(source));

    let first = reconciler.reconcile().await;
    let second = reconciler.reconcile().await;

    assert!(first.is_clean());
    assert_eq!(first.employees_upserted, 2);
    assert_eq!(first.tags_upserted, 2);
    assert_eq!(first.rows_skipped, 1);
    assert_eq!(second.employees_upserted, 2);

    let employees = EmployeeRepositoryImpl::from_connection(conn.clone());
    assert_eq!(employees.count().await.unwrap(), 2);
    let ivanov = employees.find_by_number(1001).await.unwrap().unwrap();
    assert_eq!(ivanov.department.as_deref(), Some("Цех 1"));

    let reference = reconciler.reference_repo();
    assert_eq!(reference.count_tags().await.unwrap(), 2);
    assert_eq!(reference.list_zones().await.unwrap().len(), 14);

    // 描述列为空时回退到第二列
    let tag = reference.find_tag(78).await.unwrap().unwrap();
    assert_eq!(tag.description.as_deref(), Some("браслет"));
}

#[tokio::test]
async fn test_latest_tag_description_wins() {
    let (_temp, db_path) = create_test_db().unwrap();
    insert_test_config(&db_path, config_keys::TAG_SOURCE, "tags");
    let conn = shared_connection(&db_path);

    let mut source = InMemoryReferenceSource::new();
    source.insert("tags", table(&["Номер", "Тип", "Описание"], &[&["77", "", "Старая"]]));
    create_reconciler(conn.clone(), Box::new(source)).reconcile().await;

    let mut source = InMemoryReferenceSource::new();
    source.insert("tags", table(&["Номер", "Тип", "Описание"], &[&["77", "", "Новая"]]));
    let reconciler = create_reconciler(conn.clone(), Box::new(source));
    reconciler.reconcile().await;

    let tag = reconciler.reference_repo().find_tag(77).await.unwrap().unwrap();
    assert_eq!(tag.description.as_deref(), Some("Новая"));
    assert_eq!(reconciler.reference_repo().count_tags().await.unwrap(), 1);
}

#[tokio::test]
async fn test_missing_key_column_is_reported() {
    let (_temp, db_path) = create_test_db().unwrap();
    insert_test_config(&db_path, config_keys::EMPLOYEE_SOURCE, "employees");
    insert_test_config(&db_path, config_keys::TAG_SOURCE, "tags");
    let conn = shared_connection(&db_path);

    let mut source = InMemoryReferenceSource::new();
    source.insert(
        "employees",
        table(&["Фамилия", "Должность"], &[&["Иванов", "мастер"]]),
    );
    source.insert("tags", table(&["Номер", "Тип", "Описание"], &[&["77", "", "Каска"]]));
    let reconciler = create_reconciler(conn.clone(), Box::new(source));

    let report = reconciler.reconcile().await;

    // 员工数据源失败不影响标签
    assert!(!report.is_clean());
    assert_eq!(report.problems.len(), 1);
    assert_eq!(report.problems[0].action, actions::SYNC_EMPLOYEES);
    assert_eq!(report.employees_upserted, 0);
    assert_eq!(report.tags_upserted, 1);
}

#[tokio::test]
async fn test_unreadable_source_is_reported() {
    let (_temp, db_path) = create_test_db().unwrap();
    insert_test_config(&db_path, config_keys::EMPLOYEE_SOURCE, "missing");
    let conn = shared_connection(&db_path);
    let reconciler = create_reconciler(conn, Box::new(InMemoryReferenceSource::new()));

    let report = reconciler.reconcile().await;

    assert_eq!(report.zones_upserted, 14);
    assert_eq!(report.problems.len(), 1);
    assert_eq!(report.problems[0].action, actions::SYNC_EMPLOYEES);
}

#[tokio::test]
async fn test_file_reference_source() {
    let (_temp, db_path) = create_test_db().unwrap();
    insert_test_config(&db_path, config_keys::EMPLOYEE_SOURCE, "people.csv");
    let conn = shared_connection(&db_path);

    let dir = tempfile::tempdir().unwrap();
    std::fs::write(
        dir.path().join("people.csv"),
        "ТН;ФИО;Отдел\n1001;Иванов;ОТК\n1002;;ОТК\n",
    )
    .unwrap();

    let reconciler = create_reconciler(
        conn.clone(),
        Box::new(FileReferenceSource::with_base_dir(dir.path())),
    );
    let report = reconciler.reconcile().await;
    assert!(report.is_clean());
    assert_eq!(report.employees_upserted, 2);

    let employees = EmployeeRepositoryImpl::from_connection(conn);
    let unnamed = employees.find_by_number(1002).await.unwrap().unwrap();
    assert!(unnamed.has_placeholder_name());
}

#[tokio::test]
async fn test_short_key_header_beside_name_header() {
    let (_temp, db_path) = create_test_db().unwrap();
    insert_test_config(&db_path, config_keys::EMPLOYEE_SOURCE, "employees");
    let conn = shared_connection(&db_path);

    let mut source = InMemoryReferenceSource::new();
    source.insert(
        "employees",
        table(&["ФИО работника", "ТН", "Отдел"], &[&["Иванов", "1001", "ОТК"]]),
    );
    let report = create_reconciler(conn.clone(), Box::new(source)).reconcile().await;

    assert!(report.is_clean());
    assert_eq!(report.employees_upserted, 1);
    assert_eq!(report.rows_skipped, 0);

    let employees = EmployeeRepositoryImpl::from_connection(conn);
    let ivanov = employees.find_by_number(1001).await.unwrap().unwrap();
    assert_eq!(ivanov.name, "Иванов");
    assert_eq!(ivanov.department.as_deref(), Some("ОТК"));
}

#[tokio::test]
async fn test_blank_name_keeps_known_name() {
    let (_temp, db_path) = create_test_db().unwrap();
    insert_test_config(&db_path, config_keys::EMPLOYEE_SOURCE, "employees");
    let conn = shared_connection(&db_path);
    let headers = ["ТН", "ФИО", "Отдел"];

    let mut source = InMemoryReferenceSource::new();
    source.insert("employees", table(&headers, &[&["1001", "Иванов", "ОТК"]]));
    create_reconciler(conn.clone(), Box::new(source)).reconcile().await;

    let mut source = InMemoryReferenceSource::new();
    source.insert("employees", table(&headers, &[&["1001", "", "Цех 2"]]));
    let report = create_reconciler(conn.clone(), Box::new(source)).reconcile().await;
    assert_eq!(report.employees_upserted, 1);

    let employees = EmployeeRepositoryImpl::from_connection(conn);
    let stored = employees.find_by_number(1001).await.unwrap().unwrap();
    assert_eq!(stored.name, "Иванов");
    assert_eq!(stored.department.as_deref(), Some("Цех 2"));
}
