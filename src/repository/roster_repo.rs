// ==========================================
// 学校课表排课系统 - 花名册仓储（只读镜像）
// ==========================================
// 红线: Repository 不含业务逻辑
// ==========================================
// 职责: 为排课核心提供 班级 / 教师(含资质) / 科目 列表
// 说明: 花名册的增删改属于外部系统，这里只保留
//       导入镜像所需的 upsert
// ==========================================

use crate::domain::roster::{ClassGroup, Subject, Teacher};
use crate::domain::types::{SubjectId, TeacherId};
use crate::repository::error::{RepositoryError, RepositoryResult};
use rusqlite::{params, Connection, Result as SqliteResult};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex};

// ==========================================
// RosterRepository - 花名册仓储
// ==========================================
pub struct RosterRepository {
    conn: Arc<Mutex<Connection>>,
}

impl RosterRepository {
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
    // 查询
    // ==========================================

    /// 全部班级（按 id 升序）
    pub fn list_class_groups(&self) -> RepositoryResult<Vec<ClassGroup>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT class_group_id, name, grade FROM class_group ORDER BY class_group_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(ClassGroup {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    grade: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 全部科目（按 id 升序）
    pub fn list_subjects(&self) -> RepositoryResult<Vec<Subject>> {
        let conn = self.get_conn()?;
        let mut stmt = conn.prepare(
            "SELECT subject_id, name, hours_per_week FROM subject ORDER BY subject_id ASC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok(Subject {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    hours_per_week: row.get(2)?,
                })
            })?
            .collect::<SqliteResult<Vec<_>>>()?;
        Ok(rows)
    }

    /// 全部教师及其任教资质（按 id 升序）
    pub fn list_teachers_with_qualifications(&self) -> RepositoryResult<Vec<Teacher>> {
        let conn = self.get_conn()?;

        let mut qualifications: BTreeMap<TeacherId, BTreeSet<SubjectId>> = BTreeMap::new();
        {
            let mut stmt = conn.prepare("SELECT teacher_id, subject_id FROM teacher_subject")?;
            let pairs = stmt
                .query_map([], |row| Ok((row.get::<_, TeacherId>(0)?, row.get::<_, SubjectId>(1)?)))?
                .collect::<SqliteResult<Vec<_>>>()?;
            for (teacher_id, subject_id) in pairs {
                qualifications.entry(teacher_id).or_default().insert(subject_id);
            }
        }

        let mut stmt = conn.prepare("SELECT teacher_id, name FROM teacher ORDER BY teacher_id ASC")?;
        let teachers = stmt
            .query_map([], |row| Ok((row.get::<_, TeacherId>(0)?, row.get::<_, String>(1)?)))?
            .collect::<SqliteResult<Vec<_>>>()?
            .into_iter()
            .map(|(id, name)| Teacher {
                id,
                name,
                subject_ids: qualifications.remove(&id).unwrap_or_default(),
            })
            .collect();
        Ok(teachers)
    }

    // ==========================================
    // 镜像导入
    // ==========================================

    /// 写入或更新班级
    pub fn upsert_class_group(&self, class_group: &ClassGroup) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO class_group (class_group_id, name, grade) VALUES (?1, ?2, ?3)
            ON CONFLICT(class_group_id) DO UPDATE SET name = excluded.name, grade = excluded.grade
            "#,
            params![class_group.id, class_group.name, class_group.grade],
        )?;
        Ok(())
    }

    /// 写入或更新科目
    pub fn upsert_subject(&self, subject: &Subject) -> RepositoryResult<()> {
        let conn = self.get_conn()?;
        conn.execute(
            r#"
            INSERT INTO subject (subject_id, name, hours_per_week) VALUES (?1, ?2, ?3)
            ON CONFLICT(subject_id) DO UPDATE SET name = excluded.name, hours_per_week = excluded.hours_per_week
            "#,
            params![subject.id, subject.name, subject.hours_per_week],
        )?;
        Ok(())
    }

    /// 写入或更新教师，资质整体替换
    pub fn upsert_teacher(&self, teacher: &Teacher) -> RepositoryResult<()> {
        let mut conn = self.get_conn()?;
        let tx = conn.transaction()?;
        tx.execute(
            r#"
            INSERT INTO teacher (teacher_id, name) VALUES (?1, ?2)
            ON CONFLICT(teacher_id) DO UPDATE SET name = excluded.name
            "#,
            params![teacher.id, teacher.name],
        )?;
        tx.execute("DELETE FROM teacher_subject WHERE teacher_id = ?1", params![teacher.id])?;
        for subject_id in &teacher.subject_ids {
            tx.execute(
                "INSERT INTO teacher_subject (teacher_id, subject_id) VALUES (?1, ?2)",
                params![teacher.id, subject_id],
            )?;
        }
        tx.commit()?;
        Ok(())
    }
}
