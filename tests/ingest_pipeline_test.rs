// ==========================================
// 报表导入流水线集成测试
// ==========================================
// 测试目标: 验证去重、整批替换、行级跳过、身份解析的端到端行为
// ==========================================


use workwatch_ingest::config::config_keys;
use workwatch_ingest::domain::types::{IngestStatus, ReportKind, ReportKindHint};
use workwatch_ingest::importer::{parse_hint, ImportError, ReportIngestor};
use workwatch_ingest::logging;
use workwatch_ingest::repository::{EmployeeRepository, IngestionRepository};
use test_helpers::{
    count_rows, create_test_db, create_test_ingestor, downtime_csv, insert_test_config,
    presence_csv, shared_connection, shift_csv,
};

#[tokio::test]
async fn test_shift_report_drops_row_without_start() {
    logging::init_test();
    let (_temp, db_path) = create_test_db().unwrap();
    let conn = shared_connection(&db_path);
    let ingestor = create_test_ingestor(conn.clone());

    let bytes = shift_csv(&[
        ("1001", "Иванов И.И.", "01.04.2024", "01.04.2024 08:00", "01.04.2024 20:00", "85,5"),
        ("1002", "Петров П.П.", "01.04.2024", "", "01.04.2024 20:00", "70"),
    ]);

    let outcome = ingestor
        .ingest(&bytes, "report_8_2024-04-01.csv", ReportKindHint::Auto)
        .await
        .unwrap();

    assert_eq!(outcome.kind, ReportKind::Shift);
    assert_eq!(outcome.status, IngestStatus::Processed);
    assert_eq!(outcome.records_accepted, 1);
    assert_eq!(outcome.rows_skipped, 1);
    assert_eq!(outcome.skip_reasons.get("missing:start"), Some(&1));

    // 只有被接受的行会创建身份
    let employee = ingestor
        .employee_repo()
        .find_by_number(1001)
        .await
        .unwrap()
        .expect("employee 1001 should exist");
    assert_eq!(employee.name, "Иванов И.И.");
    assert!(ingestor.employee_repo().find_by_number(1002).await.unwrap().is_none());

    let stored: (i64, f64) = {
        let c = conn.lock().unwrap();
        c.query_row(
            "SELECT employee_id, active_percent FROM shift_records",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )
        .unwrap()
    };
    assert_eq!(stored.0, employee.id);
    assert!((stored.1 - 85.5).abs() < 1e-9);
}

#[tokio::test]
async fn test_identical_file_is_duplicate() {
    let (_temp, db_path) = create_test_db().unwrap();
    let conn = shared_connection(&db_path);
    let ingestor = create_test_ingestor(conn.clone());

    let bytes = downtime_csv(&[
        ("1001", "Иванов", "01.04.2024 10:00", "01.04.2024 10:30", "30"),
        ("1002", "Петров", "01.04.2024 11:00", "01.04.2024 11:15", "15"),
    ]);

    let first = ingestor
        .ingest(&bytes, "report_10.csv", ReportKindHint::Auto)
        .await
        .unwrap();
    let second = ingestor
        .ingest(&bytes, "report_10.csv", ReportKindHint::Auto)
        .await
        .unwrap();

    assert_eq!(first.status, IngestStatus::Processed);
    assert_eq!(second.status, IngestStatus::Duplicate);
    assert_eq!(second.run_id, first.run_id);
    assert_eq!(second.records_accepted, 0);
    assert_eq!(count_rows(&conn, "downtime_records"), 2);
    assert_eq!(count_rows(&conn, "ingestion_runs"), 1);
}

#[tokio::test]
async fn test_changed_content_replaces_previous_run() {
    let (_temp, db_path) = create_test_db().unwrap();
    let conn = shared_connection(&db_path);
    let ingestor = create_test_ingestor(conn.clone());

    let original = downtime_csv(&[
        ("1001", "Иванов", "01.04.2024 10:00", "01.04.2024 10:30", "30"),
        ("1002", "Петров", "01.04.2024 11:00", "01.04.2024 11:15", "15"),
        ("1003", "Сидоров", "01.04.2024 12:00", "01.04.2024 12:05", "5"),
    ]);
    let corrected = downtime_csv(&[(
        "1001",
        "Иванов",
        "01.04.2024 10:00",
        "01.04.2024 10:20",
        "20",
    )]);

    let first = ingestor
        .ingest(&original, "report_10.csv", ReportKindHint::Auto)
        .await
        .unwrap();
    let second = ingestor
        .ingest(&corrected, "report_10.csv", ReportKindHint::Auto)
        .await
        .unwrap();

    assert_eq!(second.status, IngestStatus::Processed);
    assert_ne!(second.run_id, first.run_id);
    assert_eq!(count_rows(&conn, "downtime_records"), 1);

    let runs = ingestor.ingestion_repo().list_recent_runs(10).await.unwrap();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].record_count, 1);
    assert_eq!(Some(runs[0].id), second.run_id);
}

#[tokio::test]
async fn test_downtime_duration_rules() {
    let (_temp, db_path) = create_test_db().unwrap();
    let conn = shared_connection(&db_path);
    let ingestor = create_test_ingestor(conn.clone());

    let bytes = downtime_csv(&[
        ("1001", "Иванов", "01.04.2024 10:00", "01.04.2024 10:30", "abc"),
        ("1002", "Петров", "01.04.2024 11:00", "01.04.2024 11:15", ""),
        ("1003", "Сидоров", "01.04.2024 12:00", "01.04.2024 12:05", "-5"),
        ("1004", "Кузнецов", "01.04.2024 13:00", "01.04.2024 12:00", "60"),
    ]);

    let outcome = ingestor
        .ingest(&bytes, "report10.csv", ReportKindHint::Auto)
        .await
        .unwrap();

    assert_eq!(outcome.kind, ReportKind::Downtime);
    assert_eq!(outcome.records_accepted, 1);
    assert_eq!(outcome.rows_skipped, 3);
    assert_eq!(outcome.skip_reasons.get("malformed:duration"), Some(&1));
    assert_eq!(outcome.skip_reasons.get("negative_duration"), Some(&1));
    assert_eq!(outcome.skip_reasons.get("inverted_period"), Some(&1));

    let duration: i64 = {
        let c = conn.lock().unwrap();
        c.query_row("SELECT duration_minutes FROM downtime_records", [], |row| {
            row.get(0)
        })
        .unwrap()
    };
    assert_eq!(duration, 0);
}

#[tokio::test]
async fn test_identity_is_stable_across_reports() {
    let (_temp, db_path) = create_test_db().unwrap();
    let conn = shared_connection(&db_path);
    let ingestor = create_test_ingestor(conn.clone());

    // 定位日志不带姓名 → 占位名
    let presence = presence_csv(&[("1001", "01.04.2024", "08:15", "77", "3")]);
    ingestor
        .ingest(&presence, "report_11.csv", ReportKindHint::Auto)
        .await
        .unwrap();
    let placeholder = ingestor.employee_repo().find_by_number(1001).await.unwrap().unwrap();
    assert!(placeholder.has_placeholder_name());

    // 后续带姓名的报表补全姓名，内部ID不变
    let downtime = downtime_csv(&[(
        "1001",
        "Иванов",
        "01.04.2024 10:00",
        "01.04.2024 10:30",
        "30",
    )]);
    ingestor
        .ingest(&downtime, "report_10.csv", ReportKindHint::Auto)
        .await
        .unwrap();

    let employee = ingestor.employee_repo().find_by_number(1001).await.unwrap().unwrap();
    assert_eq!(employee.id, placeholder.id);
    assert_eq!(employee.name, "Иванов");
    assert_eq!(ingestor.employee_repo().count().await.unwrap(), 1);
}

#[tokio::test]
async fn test_presence_zone_defaults_to_work_zone() {
    let (_temp, db_path) = create_test_db().unwrap();
    let conn = shared_connection(&db_path);
    let ingestor = create_test_ingestor(conn.clone());

    let bytes = presence_csv(&[
        ("1001", "01.04.2024", "08:15", "77", ""),
        ("1001", "01.04.2024", "08:20:30", "77", "4"),
        ("1001", "01.04.2024", "", "77", "4"),
    ]);

    let outcome = ingestor
        .ingest(&bytes, "aa_ble_positions.csv", ReportKindHint::Auto)
        .await
        .unwrap();
    assert_eq!(outcome.kind, ReportKind::Presence);
    assert_eq!(outcome.records_accepted, 2);
    assert_eq!(outcome.skip_reasons.get("missing:time"), Some(&1));

    let zones: Vec<i64> = {
        let c = conn.lock().unwrap();
        let mut stmt = c
            .prepare("SELECT zone_id FROM presence_logs ORDER BY observed_at")
            .unwrap();
        let rows = stmt.query_map([], |row| row.get(0)).unwrap();
        rows.collect::<Result<_, _>>().unwrap()
    };
    assert_eq!(zones, vec![1, 4]);
}

#[tokio::test]
async fn test_configured_default_zone() {
    let (_temp, db_path) = create_test_db().unwrap();
    insert_test_config(&db_path, config_keys::DEFAULT_ZONE_ID, "9");
    let conn = shared_connection(&db_path);
    let ingestor = create_test_ingestor(conn.clone());

    let bytes = presence_csv(&[("1001", "01.04.2024", "08:15", "77", "")]);
    ingestor
        .ingest(&bytes, "report_11.csv", ReportKindHint::Auto)
        .await
        .unwrap();

    let zone: i64 = {
        let c = conn.lock().unwrap();
        c.query_row("SELECT zone_id FROM presence_logs", [], |row| row.get(0))
            .unwrap()
    };
    assert_eq!(zone, 9);
}

#[tokio::test]
async fn test_explicit_hint_overrides_filename() {
    let (_temp, db_path) = create_test_db().unwrap();
    let conn = shared_connection(&db_path);
    let ingestor = create_test_ingestor(conn.clone());

    let bytes = shift_csv(&[(
        "1001",
        "Иванов",
        "2024-04-01",
        "2024-04-01 08:00:00",
        "2024-04-01 20:00:00",
        "90",
    )]);
    let hint = parse_hint("shift").unwrap();

    let outcome = ingestor.ingest(&bytes, "export.csv", hint).await.unwrap();
    assert_eq!(outcome.kind, ReportKind::Shift);
    assert_eq!(outcome.records_accepted, 1);
    assert_eq!(count_rows(&conn, "shift_records"), 1);
}

#[test]
fn test_unknown_hint_is_rejected() {
    let result = parse_hint("report99");
    assert!(matches!(result, Err(ImportError::UnknownReportKind(_))));
}

#[tokio::test]
async fn test_unparseable_file_changes_nothing() {
    let (_temp, db_path) = create_test_db().unwrap();
    let conn = shared_connection(&db_path);
    let ingestor = create_test_ingestor(conn.clone());

    let result = ingestor
        .ingest(b"PK\x03\x04 not really a workbook", "report_8.xlsx", ReportKindHint::Auto)
        .await;

    assert!(result.is_err());
    assert_eq!(count_rows(&conn, "ingestion_runs"), 0);
    assert_eq!(count_rows(&conn, "employees"), 0);
}

#[tokio::test]
async fn test_ingest_path_uses_file_name() {
    let (_temp, db_path) = create_test_db().unwrap();
    let conn = shared_connection(&db_path);
    let ingestor = create_test_ingestor(conn.clone());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report_10_april.csv");
    std::fs::write(
        &path,
        downtime_csv(&[("1001", "Иванов", "01.04.2024 10:00", "01.04.2024 10:30", "30")]),
    )
    .unwrap();

    let outcome = ingestor.ingest_path(&path, ReportKindHint::Auto).await.unwrap();
    assert_eq!(outcome.filename, "report_10_april.csv");
    assert!(ingestor
        .ingestion_repo()
        .find_run_by_filename("report_10_april.csv")
        .await
        .unwrap()
        .is_some());
}
