// ==========================================
// WorkWatch 报表导入 - 命令行入口
// ==========================================
// 用法:
//   workwatch-ingest ingest <file> [auto|shift|downtime|presence]
//   workwatch-ingest sync <dir|file>...
//   workwatch-ingest reconcile
//   workwatch-ingest runs [limit]
//   workwatch-ingest config show
//   workwatch-ingest config set <key> <value>
//
// 环境变量:
//   WORKWATCH_DB_PATH        数据库路径
//   WORKWATCH_REFERENCE_DIR  主数据文件相对路径基准
//   WORKWATCH_LOG_FORMAT     json 时输出结构化日志
// ==========================================

use anyhow::{anyhow, bail, Context};
use serde::Serialize;
use std::path::{Path, PathBuf};
use workwatch_ingest::api::{IngestApi, SyncFile, DEFAULT_RUN_LIST_LIMIT};
use workwatch_ingest::logging;

const DB_PATH_ENV: &str = "WORKWATCH_DB_PATH";
const REFERENCE_DIR_ENV: &str = "WORKWATCH_REFERENCE_DIR";

// 可被 sync 拾取的扩展名
const SYNC_EXTENSIONS: &[&str] = &["csv", "xlsx", "xlsm", "xls", "xlsb", "ods"];

const USAGE: &str = "用法: workwatch-ingest <ingest|sync|reconcile|runs|config> [参数...]";

/// 默认数据库路径
///
/// 优先级: 环境变量 > 用户数据目录 > 当前目录
fn get_default_db_path() -> String {
    if let Ok(path) = std::env::var(DB_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./workwatch.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("workwatch");
        if std::fs::create_dir_all(&dir).is_ok() {
            path = dir.join("workwatch.db");
        }
    }
    path.to_string_lossy().to_string()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// 展开 sync 参数: 目录取其中受支持的文件（按文件名排序），文件原样保留
fn collect_sync_paths(args: &[String]) -> anyhow::Result<Vec<PathBuf>> {
    let mut paths = Vec::new();
    for arg in args {
        let path = Path::new(arg);
        if path.is_dir() {
            let mut entries: Vec<PathBuf> = std::fs::read_dir(path)
                .with_context(|| format!("无法读取目录: {}", arg))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && has_sync_extension(p))
                .collect();
            entries.sort();
            paths.extend(entries);
        } else {
            paths.push(path.to_path_buf());
        }
    }
    Ok(paths)
}

fn has_sync_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| SYNC_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = args.first().ok_or_else(|| anyhow!(USAGE))?;

    let db_path = get_default_db_path();
    let reference_dir = std::env::var(REFERENCE_DIR_ENV).ok().map(PathBuf::from);
    tracing::info!(db_path = %db_path, version = workwatch_ingest::VERSION, "{}", workwatch_ingest::APP_NAME);

    let api = IngestApi::new(&db_path, reference_dir.as_deref())?;

    match command.as_str() {
        "ingest" => {
            let file = args.get(1).ok_or_else(|| anyhow!("缺少文件参数\n{}", USAGE))?;
            let kind = args.get(2).map(String::as_str).unwrap_or("auto");
            let response = api.ingest_path(Path::new(file), kind).await;
            print_json(&response)?;
        }
        "sync" => {
            let paths = collect_sync_paths(&args[1..])?;
            let mut files = Vec::with_capacity(paths.len());
            for path in paths {
                let bytes = tokio::fs::read(&path)
                    .await
                    .with_context(|| format!("无法读取文件: {}", path.display()))?;
                let filename = path
                    .file_name()
                    .map(|n| n.to_string_lossy().to_string())
                    .unwrap_or_else(|| path.display().to_string());
                files.push(SyncFile { filename, bytes });
            }
            let response = api.sync_files(files).await;
            print_json(&response)?;
        }
        "reconcile" => {
            let report = api.reconcile_references().await;
            print_json(&report)?;
        }
        "runs" => {
            let limit = match args.get(1) {
                Some(raw) => raw
                    .parse::<usize>()
                    .with_context(|| format!("limit 必须为正整数: {}", raw))?,
                None => DEFAULT_RUN_LIST_LIMIT,
            };
            let runs = api.list_runs(limit).await?;
            print_json(&runs)?;
        }
        "config" => match args.get(1).map(String::as_str) {
            Some("show") | None => println!("{}", api.config_snapshot()?),
            Some("set") => {
                let (Some(key), Some(value)) = (args.get(2), args.get(3)) else {
                    bail!("用法: workwatch-ingest config set <key> <value>");
                };
                api.set_config(key, value)?;
            }
            Some(other) => bail!("未知 config 子命令: {}", other),
        },
        other => bail!("未知命令: {}\n{}", other, USAGE),
    }

    Ok(())
}
