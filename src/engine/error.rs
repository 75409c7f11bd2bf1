// ==========================================
// 学校课表排课系统 - 排课核心错误类型
// ==========================================
// 工具: thiserror 派生宏
// 配置错误: 致命，整个操作中止
// 校验错误: 单条目拒绝，携带冲突条目标识
// ==========================================

use crate::domain::types::{ClassGroupId, EntryId, SchoolDay, SubjectId, TeacherId};
use chrono::NaiveTime;
use thiserror::Error;

/// 排课核心错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    // ===== 配置错误 =====
    #[error("作息配置错误: {reason}")]
    Configuration { reason: String },

    // ===== 校验错误 =====
    #[error("引用不存在: {entity} id={id}")]
    UnknownReference { entity: &'static str, id: i64 },

    #[error("教师无任教资质: teacher_id={teacher_id}, subject_id={subject_id}")]
    UnqualifiedTeacher {
        teacher_id: TeacherId,
        subject_id: SubjectId,
    },

    #[error("超出作息窗口: {day} {start}-{end}, 窗口={window_start}-{window_end}")]
    OutOfWindow {
        day: SchoolDay,
        start: NaiveTime,
        end: NaiveTime,
        window_start: NaiveTime,
        window_end: NaiveTime,
    },

    #[error("教师时间冲突: teacher_id={teacher_id}, {day} {start}-{end}, 已被条目 {blocking_entry_id} 占用")]
    TeacherConflict {
        teacher_id: TeacherId,
        day: SchoolDay,
        start: NaiveTime,
        end: NaiveTime,
        blocking_entry_id: EntryId,
    },

    #[error("班级时间冲突: class_group_id={class_group_id}, {day} {start}-{end}, 已被条目 {blocking_entry_id} 占用")]
    ClassGroupConflict {
        class_group_id: ClassGroupId,
        day: SchoolDay,
        start: NaiveTime,
        end: NaiveTime,
        blocking_entry_id: EntryId,
    },
}

impl ScheduleError {
    /// 构造配置错误
    pub fn configuration(reason: impl Into<String>) -> Self {
        ScheduleError::Configuration {
            reason: reason.into(),
        }
    }

    /// 冲突错误中的占用条目标识
    pub fn blocking_entry_id(&self) -> Option<&EntryId> {
        match self {
            ScheduleError::TeacherConflict {
                blocking_entry_id, ..
            }
            | ScheduleError::ClassGroupConflict {
                blocking_entry_id, ..
            } => Some(blocking_entry_id),
            _ => None,
        }
    }

    /// 是否为时间冲突（换一个时段可能通过）
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            ScheduleError::TeacherConflict { .. } | ScheduleError::ClassGroupConflict { .. }
        )
    }
}

/// Result 类型别名
pub type ScheduleResult<T> = Result<T, ScheduleError>;
