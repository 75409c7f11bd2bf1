// ==========================================
// 学校课表排课系统 - 课表条目仓储
// ==========================================
// 红线: Repository 不含业务逻辑，冲突检测由引擎完成
// ==========================================
// 职责: 课表条目的 写入 / 批量写入 / 删除 / 按范围查询
// 排序: 教学日 → 开始时间 → 班级 → 条目标识
// ==========================================

use crate::domain::schedule::{EntryScope, ScheduleEntry, ScheduleEntryView};
use crate::domain::types::{ClassGroupId, EntryId, SchoolDay, TeacherId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use chrono::NaiveTime;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Result as SqliteResult};
use std::sync::{Arc, Mutex};

/// 时间列存储格式
const TIME_FORMAT: &str = "%H:%M:%S";

const ENTRY_COLUMNS: &str = "e.entry_id, e.class_group_id, e.teacher_id, e.subject_id, \
     e.day_of_week, e.start_time, e.end_time, e.room, e.lesson_number";

const ENTRY_ORDER: &str = "ORDER BY e.day_order ASC, e.start_time ASC, e.class_group_id ASC, e.entry_id ASC";

// ==========================================
// ScheduleEntryRepository - 课表条目仓储
// ==========================================
pub struct ScheduleEntryRepository {
    conn: Arc<Mutex<Connection>>,
}

impl ScheduleEntryRepository {
    /// 从已有连接创建仓储实例
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Self {
        Self { conn }
    }

    /// 获取数据库连接
    fn get_conn(&self) -> RepositoryResult<std::sync::MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|e| RepositoryError::LockError(e.to_string()))
    }

    // ==========================================
    // 写入
    // ==========================================

    /// 写入单条条目
    pub fn insert(&self, entry: &ScheduleEntry) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        insert_entry(&conn, entry)?;
        Ok(())
    }

    /// 批量写入（单事务，任一失败整体回滚）
    ///
    /// # 返回
    /// - `Ok(count)`: 写入条数
    pub fn insert_batch(&self, entries: &[ScheduleEntry]) -> RepositoryResult<usize> {
        if entries.is_empty() {
            return Ok(0);
        }

        // 保存点既可独立成事务，也可嵌套在外层 BEGIN IMMEDIATE 中
        let mut conn = self.get_conn()?;
        let sp = conn.savepoint()?;
        for entry in entries {
            insert_entry(&sp, entry)?;
        }
        sp.commit()?;

        Ok(entries.len())
    }

    /// 删除条目
    ///
    /// # 返回
    /// - `Err(NotFound)`: 条目不存在
    pub fn delete(&self, entry_id: &EntryId) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        let affected = conn.execute(
            "DELETE FROM schedule_entry WHERE entry_id = ?1",
            params![entry_id.as_str()],
        )?;
        if affected == 0 {
            return Err(RepositoryError::NotFound {
                entity: "ScheduleEntry".to_string(),
                id: entry_id.to_string(),
            });
        }
        Ok(())
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按标识查询
    pub fn find_by_id(&self, entry_id: &EntryId) -> RepositoryResult<Option<ScheduleEntry>> {
        let conn = self.get_conn()?;
        let sql = format!(
            "SELECT {} FROM schedule_entry e WHERE e.entry_id = ?1",
            ENTRY_COLUMNS
        );
        let entry = conn
            .query_row(&sql, params![entry_id.as_str()], map_entry)
            .optional()?;
        Ok(entry)
    }

    /// 按范围查询
    pub fn list(&self, scope: EntryScope) -> RepositoryResult<Vec<ScheduleEntry>> {
        let conn = self.get_conn()?;
        let (filter, args) = scope_filter(scope);
        let sql = format!(
            "SELECT {} FROM schedule_entry e {} {}",
            ENTRY_COLUMNS, filter, ENTRY_ORDER
        );
        let mut stmt = conn.prepare(&sql)?;
        let entries = stmt
            .query_map(params_from_iter(args.iter()), map_entry)?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(entries)
    }

    pub fn list_all(&self) -> RepositoryResult<Vec<ScheduleEntry>> {
        self.list(EntryScope::All)
    }

    pub fn list_by_class_group(&self, class_group_id: ClassGroupId) -> RepositoryResult<Vec<ScheduleEntry>> {
        self.list(EntryScope::ClassGroup(class_group_id))
    }

    pub fn list_by_teacher(&self, teacher_id: TeacherId) -> RepositoryResult<Vec<ScheduleEntry>> {
        self.list(EntryScope::Teacher(teacher_id))
    }

    /// 按范围查询（附带班级、教师、科目名称）
    pub fn list_views(&self, scope: EntryScope) -> RepositoryResult<Vec<ScheduleEntryView>> {
        let conn = self.get_conn()?;
        let (filter, args) = scope_filter(scope);
        let sql = format!(
            r#"
            SELECT {}, cg.name, t.name, s.name
            FROM schedule_entry e
            JOIN class_group cg ON cg.class_group_id = e.class_group_id
            JOIN teacher t ON t.teacher_id = e.teacher_id
            JOIN subject s ON s.subject_id = e.subject_id
            {} {}
            "#,
            ENTRY_COLUMNS, filter, ENTRY_ORDER
        );
        let mut stmt = conn.prepare(&sql)?;
        let views = stmt
            .query_map(params_from_iter(args.iter()), |row| {
                Ok(ScheduleEntryView {
                    entry: map_entry(row)?,
                    class_group_name: row.get(9)?,
                    teacher_name: row.get(10)?,
                    subject_name: row.get(11)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(views)
    }

    /// 条目总数
    pub fn count(&self) -> RepositoryResult<usize> {
        let conn = self.get_conn()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM schedule_entry", [], |row| row.get(0))?;
        Ok(count.max(0) as usize)
    }
}

// ==========================================
// 行映射
// ==========================================

fn insert_entry(conn: &Connection, entry: &ScheduleEntry) -> SqliteResult<usize> {
    conn.execute(
        r#"
        INSERT INTO schedule_entry (
            entry_id, class_group_id, teacher_id, subject_id,
            day_of_week, day_order, start_time, end_time, room, lesson_number
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            entry.id.as_str(),
            entry.class_group_id,
            entry.teacher_id,
            entry.subject_id,
            entry.day_of_week.to_db_str(),
            entry.day_of_week.ordinal(),
            entry.start_time.format(TIME_FORMAT).to_string(),
            entry.end_time.format(TIME_FORMAT).to_string(),
            entry.room,
            entry.lesson_number,
        ],
    )
}

fn map_entry(row: &rusqlite::Row) -> SqliteResult<ScheduleEntry> {
    let day_raw: String = row.get(4)?;
    let day_of_week = SchoolDay::from_db_str(&day_raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            Box::new(RepositoryError::FieldValueError {
                field: "day_of_week".to_string(),
                message: format!("非教学日: {}", day_raw),
            }),
        )
    })?;

    Ok(ScheduleEntry {
        id: EntryId::from(row.get::<_, String>(0)?),
        class_group_id: row.get(1)?,
        teacher_id: row.get(2)?,
        subject_id: row.get(3)?,
        day_of_week,
        start_time: parse_time(row, 5)?,
        end_time: parse_time(row, 6)?,
        room: row.get(7)?,
        lesson_number: row.get(8)?,
    })
}

fn parse_time(row: &rusqlite::Row, idx: usize) -> SqliteResult<NaiveTime> {
    NaiveTime::parse_from_str(&row.get::<_, String>(idx)?, TIME_FORMAT)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e)))
}

fn scope_filter(scope: EntryScope) -> (&'static str, Vec<Value>) {
    match scope {
        EntryScope::All => ("", Vec::new()),
        EntryScope::ClassGroup(id) => ("WHERE e.class_group_id = ?1", vec![Value::Integer(id)]),
        EntryScope::Teacher(id) => ("WHERE e.teacher_id = ?1", vec![Value::Integer(id)]),
        EntryScope::Day(day) => (
            "WHERE e.day_of_week = ?1",
            vec![Value::Text(day.to_db_str().to_string())],
        ),
    }
}
