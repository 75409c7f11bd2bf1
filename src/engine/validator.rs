// ==========================================
// 学校课表排课系统 - 条目校验器
// ==========================================
// 职责: 人工录入与自动排课的唯一入口
// 顺序(快速失败):
//   a) 班级/教师/科目存在
//   b) 教师具备科目资质
//   c) 时间段落在作息窗口内
//   d) 教师与班级该时段空闲
// 通过后立即占用冲突索引，同一会话内的多次校验累积生效
// ==========================================

use crate::domain::generation::TimeWindow;
use crate::domain::schedule::{NewScheduleEntry, ScheduleEntry};
use crate::domain::snapshot::DomainSnapshot;
use crate::domain::types::EntryId;
use crate::engine::conflict_index::{ConflictError, ConflictIndex};
use crate::engine::error::{ScheduleError, ScheduleResult};
use crate::engine::time_grid::TimeGrid;
use tracing::{debug, instrument};

// ==========================================
// EntryValidator - 条目校验器
// ==========================================
pub struct EntryValidator<'a> {
    snapshot: &'a DomainSnapshot,
    grid: TimeGrid,
    index: ConflictIndex,
}

impl<'a> EntryValidator<'a> {
    /// 创建校验会话
    ///
    /// 以快照中的现有条目重建冲突索引
    ///
    /// # 错误
    /// 作息窗口无效时返回 Configuration，此时尚未占用任何单元格
    pub fn new(snapshot: &'a DomainSnapshot, window: &TimeWindow) -> ScheduleResult<Self> {
        let grid = TimeGrid::build(window)?;
        let index = ConflictIndex::from_entries(snapshot.entries());
        Ok(Self {
            snapshot,
            grid,
            index,
        })
    }

    pub fn snapshot(&self) -> &DomainSnapshot {
        self.snapshot
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn index(&self) -> &ConflictIndex {
        &self.index
    }

    /// 校验候选条目，通过则占用索引
    ///
    /// 节次号由时间网格推导，调用方给出的不一致节次号会被覆盖
    #[instrument(skip(self, candidate), fields(
        entry_id = %candidate.id,
        teacher_id = candidate.teacher_id,
        class_group_id = candidate.class_group_id,
        day = %candidate.day_of_week
    ))]
    pub fn validate(&mut self, mut candidate: ScheduleEntry) -> ScheduleResult<ScheduleEntry> {
        // a) 引用存在
        if self.snapshot.class_group(candidate.class_group_id).is_none() {
            return Err(ScheduleError::UnknownReference {
                entity: "class_group",
                id: candidate.class_group_id,
            });
        }
        let teacher = self
            .snapshot
            .teacher(candidate.teacher_id)
            .ok_or(ScheduleError::UnknownReference {
                entity: "teacher",
                id: candidate.teacher_id,
            })?;
        if self.snapshot.subject(candidate.subject_id).is_none() {
            return Err(ScheduleError::UnknownReference {
                entity: "subject",
                id: candidate.subject_id,
            });
        }

        // b) 任教资质
        if !teacher.is_qualified_for(candidate.subject_id) {
            return Err(ScheduleError::UnqualifiedTeacher {
                teacher_id: candidate.teacher_id,
                subject_id: candidate.subject_id,
            });
        }

        // c) 作息窗口
        let window = self.grid.window();
        if !window.contains(candidate.start_time, candidate.end_time) {
            return Err(ScheduleError::OutOfWindow {
                day: candidate.day_of_week,
                start: candidate.start_time,
                end: candidate.end_time,
                window_start: window.day_start_time,
                window_end: window.day_end_time,
            });
        }

        // d) 时间冲突
        let day = candidate.day_of_week;
        if let Some(blocking) =
            self.index
                .teacher_blocker(candidate.teacher_id, day, candidate.start_time, candidate.end_time)
        {
            return Err(ScheduleError::TeacherConflict {
                teacher_id: candidate.teacher_id,
                day,
                start: candidate.start_time,
                end: candidate.end_time,
                blocking_entry_id: blocking.clone(),
            });
        }
        if let Some(blocking) = self.index.class_group_blocker(
            candidate.class_group_id,
            day,
            candidate.start_time,
            candidate.end_time,
        ) {
            return Err(ScheduleError::ClassGroupConflict {
                class_group_id: candidate.class_group_id,
                day,
                start: candidate.start_time,
                end: candidate.end_time,
                blocking_entry_id: blocking.clone(),
            });
        }

        let lesson_number = self.grid.lesson_number_for(candidate.start_time);
        if candidate.lesson_number != lesson_number {
            debug!(
                given = candidate.lesson_number,
                derived = lesson_number,
                "节次号与时间网格不一致，按网格推导值修正"
            );
            candidate.lesson_number = lesson_number;
        }

        self.index.reserve(&candidate).map_err(|e| self.conflict_to_error(&candidate, e))?;
        Ok(candidate)
    }

    /// 释放已通过校验的条目（同一会话内撤销）
    pub fn release(&mut self, entry: &ScheduleEntry) -> bool {
        self.index.release(entry)
    }

    fn conflict_to_error(&self, candidate: &ScheduleEntry, err: ConflictError) -> ScheduleError {
        match err {
            ConflictError::Teacher {
                teacher_id,
                day,
                occupied_by,
            } => ScheduleError::TeacherConflict {
                teacher_id,
                day,
                start: candidate.start_time,
                end: candidate.end_time,
                blocking_entry_id: occupied_by,
            },
            ConflictError::ClassGroup {
                class_group_id,
                day,
                occupied_by,
            } => ScheduleError::ClassGroupConflict {
                class_group_id,
                day,
                start: candidate.start_time,
                end: candidate.end_time,
                blocking_entry_id: occupied_by,
            },
        }
    }
}

/// 人工录入单条校验
///
/// 赋予随机标识并推导节次号，返回可落库的条目
pub fn validate_and_prepare(
    candidate: NewScheduleEntry,
    snapshot: &DomainSnapshot,
    window: &TimeWindow,
) -> ScheduleResult<ScheduleEntry> {
    let mut validator = EntryValidator::new(snapshot, window)?;
    let given = candidate.lesson_number.unwrap_or(0);
    validator.validate(candidate.into_entry(EntryId::random(), given))
}
