// ==========================================
// 学校课表排课系统 - SQLite 连接初始化
// ==========================================
// 目标:
// - 统一所有 Connection::open 的 PRAGMA 行为
// - 统一 busy_timeout，减少并发写入时的偶发 busy 错误
// - 幂等建表（花名册只读镜像 + 课表条目 + 配置）
// ==========================================

use rusqlite::Connection;
use rusqlite::OptionalExtension;
use std::path::PathBuf;
use std::time::Duration;

/// 默认 busy_timeout（毫秒）
pub const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// 当前代码所期望的 schema_version
pub const CURRENT_SCHEMA_VERSION: i64 = 1;

/// 配置 SQLite 连接的统一 PRAGMA
///
/// 说明：
/// - foreign_keys 需要“每个连接”单独开启
/// - busy_timeout 需要“每个连接”单独配置
pub fn configure_sqlite_connection(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch("PRAGMA foreign_keys = ON;")?;
    conn.busy_timeout(Duration::from_millis(DEFAULT_BUSY_TIMEOUT_MS))?;
    Ok(())
}

/// 打开 SQLite 连接并应用统一配置
pub fn open_sqlite_connection(db_path: &str) -> rusqlite::Result<Connection> {
    let conn = Connection::open(db_path)?;
    configure_sqlite_connection(&conn)?;
    Ok(conn)
}

/// 默认数据库路径
///
/// 优先取环境变量 SCHOOL_TIMETABLE_DB_PATH，其次为用户数据目录
/// `<data_dir>/school-timetable/timetable.db`，都拿不到时落在当前目录
pub fn default_db_path() -> String {
    if let Ok(path) = std::env::var("SCHOOL_TIMETABLE_DB_PATH") {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    let mut path = PathBuf::from("./timetable.db");
    if let Some(data_dir) = dirs::data_dir() {
        let dir = data_dir.join("school-timetable");
        // 目录创建失败时交给 Connection::open 报错
        std::fs::create_dir_all(&dir).ok();
        path = dir.join("timetable.db");
    }

    path.to_string_lossy().to_string()
}

/// 幂等建表
///
/// 时间以 "HH:MM:SS" 文本存储，教学日以 MONDAY..FRIDAY 存储，
/// 因此按 (day_order, start_time) 排序即为周内时间顺序
pub fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS class_group (
            class_group_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            grade INTEGER
        );

        CREATE TABLE IF NOT EXISTS subject (
            subject_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            hours_per_week INTEGER NOT NULL DEFAULT 0 CHECK (hours_per_week >= 0)
        );

        CREATE TABLE IF NOT EXISTS teacher (
            teacher_id INTEGER PRIMARY KEY,
            name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS teacher_subject (
            teacher_id INTEGER NOT NULL REFERENCES teacher(teacher_id) ON DELETE CASCADE,
            subject_id INTEGER NOT NULL REFERENCES subject(subject_id) ON DELETE CASCADE,
            PRIMARY KEY (teacher_id, subject_id)
        );

        CREATE TABLE IF NOT EXISTS schedule_entry (
            entry_id TEXT PRIMARY KEY,
            class_group_id INTEGER NOT NULL REFERENCES class_group(class_group_id),
            teacher_id INTEGER NOT NULL REFERENCES teacher(teacher_id),
            subject_id INTEGER NOT NULL REFERENCES subject(subject_id),
            day_of_week TEXT NOT NULL CHECK (day_of_week IN ('MONDAY','TUESDAY','WEDNESDAY','THURSDAY','FRIDAY')),
            day_order INTEGER NOT NULL,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            room TEXT,
            lesson_number INTEGER NOT NULL,
            created_at TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_schedule_entry_class_group
            ON schedule_entry(class_group_id, day_order, start_time);
        CREATE INDEX IF NOT EXISTS idx_schedule_entry_teacher
            ON schedule_entry(teacher_id, day_order, start_time);

        CREATE TABLE IF NOT EXISTS config_kv (
            scope_id TEXT NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            updated_at TEXT NOT NULL DEFAULT (datetime('now')),
            PRIMARY KEY (scope_id, key)
        );
        "#,
    )?;
    conn.execute(
        "INSERT OR IGNORE INTO schema_version (version) VALUES (?1)",
        [CURRENT_SCHEMA_VERSION],
    )?;
    Ok(())
}

/// 读取 schema_version（若表不存在则返回 None）
pub fn read_schema_version(conn: &Connection) -> rusqlite::Result<Option<i64>> {
    let has_table: bool = conn
        .query_row(
            "SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version' LIMIT 1",
            [],
            |_row| Ok(true),
        )
        .optional()?
        .unwrap_or(false);

    if !has_table {
        return Ok(None);
    }

    let v: Option<i64> = conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| row.get(0))?;
    Ok(v)
}
