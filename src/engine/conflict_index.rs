// ==========================================
// 学校课表排课系统 - 冲突索引
// ==========================================
// 职责: 记录 (教师, 日, 时段) 与 (班级, 日, 时段) 的占用条目
// 来源: 由领域快照中的条目重建，每次操作重建一次
// 红线: 内存投影，不是数据源
// ==========================================
// 占用以 [start, end) 区间存储，未对齐网格的条目
// 同样会阻塞与其重叠的所有节次
// ==========================================

use crate::domain::schedule::{ranges_overlap, ScheduleEntry};
use crate::domain::types::{ClassGroupId, EntryId, SchoolDay, TeacherId};
use crate::engine::time_grid::Slot;
use chrono::NaiveTime;
use std::collections::HashMap;
use thiserror::Error;

/// 占用冲突（reserve 失败）
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[error("教师 {teacher_id} 在 {day} 已被条目 {occupied_by} 占用")]
    Teacher {
        teacher_id: TeacherId,
        day: SchoolDay,
        occupied_by: EntryId,
    },

    #[error("班级 {class_group_id} 在 {day} 已被条目 {occupied_by} 占用")]
    ClassGroup {
        class_group_id: ClassGroupId,
        day: SchoolDay,
        occupied_by: EntryId,
    },
}

impl ConflictError {
    /// 占用者条目标识
    pub fn occupied_by(&self) -> &EntryId {
        match self {
            ConflictError::Teacher { occupied_by, .. }
            | ConflictError::ClassGroup { occupied_by, .. } => occupied_by,
        }
    }
}

#[derive(Debug, Clone)]
struct Occupancy {
    start: NaiveTime,
    end: NaiveTime,
    entry_id: EntryId,
}

/// 单元格占用列表中与 [start, end) 重叠的第一个条目
fn first_overlap(cell: Option<&Vec<Occupancy>>, start: NaiveTime, end: NaiveTime) -> Option<&EntryId> {
    cell?
        .iter()
        .find(|o| ranges_overlap(o.start, o.end, start, end))
        .map(|o| &o.entry_id)
}

// ==========================================
// ConflictIndex - 冲突索引
// ==========================================
#[derive(Debug, Clone, Default)]
pub struct ConflictIndex {
    teachers: HashMap<(TeacherId, SchoolDay), Vec<Occupancy>>,
    class_groups: HashMap<(ClassGroupId, SchoolDay), Vec<Occupancy>>,
    reserved: usize,
}

impl ConflictIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// 由现有条目重建索引
    ///
    /// 已落库数据中若存在重叠，记录告警并照常登记（不拒绝构建）
    pub fn from_entries<'a>(entries: impl IntoIterator<Item = &'a ScheduleEntry>) -> Self {
        let mut index = Self::new();
        for entry in entries {
            if let Err(e) = index.reserve(entry) {
                tracing::warn!(
                    entry_id = %entry.id,
                    occupied_by = %e.occupied_by(),
                    "现有课表条目存在重叠: {}",
                    e
                );
                index.occupy(entry);
            }
        }
        index
    }

    /// 已登记条目数
    pub fn len(&self) -> usize {
        self.reserved
    }

    pub fn is_empty(&self) -> bool {
        self.reserved == 0
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 教师在该时间段的第一个占用条目
    pub fn teacher_blocker(
        &self,
        teacher_id: TeacherId,
        day: SchoolDay,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Option<&EntryId> {
        first_overlap(self.teachers.get(&(teacher_id, day)), start, end)
    }

    /// 班级在该时间段的第一个占用条目
    pub fn class_group_blocker(
        &self,
        class_group_id: ClassGroupId,
        day: SchoolDay,
        start: NaiveTime,
        end: NaiveTime,
    ) -> Option<&EntryId> {
        first_overlap(self.class_groups.get(&(class_group_id, day)), start, end)
    }

    /// 教师该节次是否空闲
    pub fn is_teacher_free(&self, teacher_id: TeacherId, day: SchoolDay, slot: &Slot) -> bool {
        self.teacher_blocker(teacher_id, day, slot.start_time, slot.end_time)
            .is_none()
    }

    /// 班级该节次是否空闲
    pub fn is_class_group_free(&self, class_group_id: ClassGroupId, day: SchoolDay, slot: &Slot) -> bool {
        self.class_group_blocker(class_group_id, day, slot.start_time, slot.end_time)
            .is_none()
    }

    // ==========================================
    // 占用 / 释放
    // ==========================================

    /// 占用条目的教师与班级单元格
    ///
    /// 任一单元格已被占用时失败，索引保持不变
    pub fn reserve(&mut self, entry: &ScheduleEntry) -> Result<(), ConflictError> {
        let day = entry.day_of_week;
        if let Some(occupied_by) =
            self.teacher_blocker(entry.teacher_id, day, entry.start_time, entry.end_time)
        {
            return Err(ConflictError::Teacher {
                teacher_id: entry.teacher_id,
                day,
                occupied_by: occupied_by.clone(),
            });
        }
        if let Some(occupied_by) =
            self.class_group_blocker(entry.class_group_id, day, entry.start_time, entry.end_time)
        {
            return Err(ConflictError::ClassGroup {
                class_group_id: entry.class_group_id,
                day,
                occupied_by: occupied_by.clone(),
            });
        }
        self.occupy(entry);
        Ok(())
    }

    /// 释放条目占用
    ///
    /// # 返回
    /// 条目此前是否已登记
    pub fn release(&mut self, entry: &ScheduleEntry) -> bool {
        let day = entry.day_of_week;
        let mut found = false;
        if let Some(cell) = self.teachers.get_mut(&(entry.teacher_id, day)) {
            let before = cell.len();
            cell.retain(|o| o.entry_id != entry.id);
            found |= cell.len() != before;
        }
        if let Some(cell) = self.class_groups.get_mut(&(entry.class_group_id, day)) {
            let before = cell.len();
            cell.retain(|o| o.entry_id != entry.id);
            found |= cell.len() != before;
        }
        if found {
            self.reserved = self.reserved.saturating_sub(1);
        }
        found
    }

    fn occupy(&mut self, entry: &ScheduleEntry) {
        let occupancy = Occupancy {
            start: entry.start_time,
            end: entry.end_time,
            entry_id: entry.id.clone(),
        };
        self.teachers
            .entry((entry.teacher_id, entry.day_of_week))
            .or_default()
            .push(occupancy.clone());
        self.class_groups
            .entry((entry.class_group_id, entry.day_of_week))
            .or_default()
            .push(occupancy);
        self.reserved += 1;
    }
}
