// ==========================================
// 学校课表排课系统 - 课表条目领域模型
// ==========================================
// 条目只创建或删除，不原地修改（修改 = 删除 + 新建）
// ==========================================

use crate::domain::types::{ClassGroupId, EntryId, SchoolDay, SubjectId, TeacherId};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

// ==========================================
// ScheduleEntry - 课表条目
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntry {
    pub id: EntryId,
    pub class_group_id: ClassGroupId,
    pub teacher_id: TeacherId,
    pub subject_id: SubjectId,
    pub day_of_week: SchoolDay,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub room: Option<String>,  // 教室不参与冲突检测
    pub lesson_number: u32,    // 当日第几节（从 1 开始）
}

impl ScheduleEntry {
    /// 与给定时间段是否重叠（半开区间 [start, end)）
    pub fn overlaps(&self, start: NaiveTime, end: NaiveTime) -> bool {
        ranges_overlap(self.start_time, self.end_time, start, end)
    }

    /// 与另一条目是否同日且时间重叠
    pub fn overlaps_entry(&self, other: &ScheduleEntry) -> bool {
        self.day_of_week == other.day_of_week && self.overlaps(other.start_time, other.end_time)
    }
}

/// 半开区间重叠判定
pub fn ranges_overlap(a_start: NaiveTime, a_end: NaiveTime, b_start: NaiveTime, b_end: NaiveTime) -> bool {
    a_start < b_end && b_start < a_end
}

// ==========================================
// NewScheduleEntry - 人工录入候选条目
// ==========================================
// 尚无标识；节次可不填，由时间网格推导
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewScheduleEntry {
    pub class_group_id: ClassGroupId,
    pub teacher_id: TeacherId,
    pub subject_id: SubjectId,
    pub day_of_week: SchoolDay,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    #[serde(default)]
    pub room: Option<String>,
    #[serde(default)]
    pub lesson_number: Option<u32>,
}

impl NewScheduleEntry {
    /// 赋予标识与节次，得到正式条目
    pub fn into_entry(self, id: EntryId, lesson_number: u32) -> ScheduleEntry {
        ScheduleEntry {
            id,
            class_group_id: self.class_group_id,
            teacher_id: self.teacher_id,
            subject_id: self.subject_id,
            day_of_week: self.day_of_week,
            start_time: self.start_time,
            end_time: self.end_time,
            room: self.room,
            lesson_number,
        }
    }
}

// ==========================================
// ScheduleEntryView - 查询视图（附带名称）
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleEntryView {
    #[serde(flatten)]
    pub entry: ScheduleEntry,
    pub class_group_name: String,
    pub teacher_name: String,
    pub subject_name: String,
}

// ==========================================
// EntryScope - 条目查询范围
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryScope {
    All,
    ClassGroup(ClassGroupId),
    Teacher(TeacherId),
    Day(SchoolDay),
}

impl EntryScope {
    /// 条目是否落在该范围内
    pub fn contains(&self, entry: &ScheduleEntry) -> bool {
        match self {
            EntryScope::All => true,
            EntryScope::ClassGroup(id) => entry.class_group_id == *id,
            EntryScope::Teacher(id) => entry.teacher_id == *id,
            EntryScope::Day(day) => entry.day_of_week == *day,
        }
    }
}
