// ==========================================
// 学校课表排课系统 - 领域快照
// ==========================================
// 一次操作开始时捕获，操作期间只读
// 排课核心不直接修改快照
// ==========================================

use crate::domain::roster::{ClassGroup, Subject, Teacher};
use crate::domain::schedule::ScheduleEntry;
use crate::domain::types::{ClassGroupId, SubjectId, TeacherId};
use std::collections::BTreeMap;

/// 领域快照：班级、教师（含资质）、科目、现有课表条目
#[derive(Debug, Clone, Default)]
pub struct DomainSnapshot {
    class_groups: BTreeMap<ClassGroupId, ClassGroup>,
    teachers: BTreeMap<TeacherId, Teacher>,
    subjects: BTreeMap<SubjectId, Subject>,
    entries: Vec<ScheduleEntry>,
}

impl DomainSnapshot {
    /// 由外部协作方提供的列表构造快照
    ///
    /// 标识重复时后出现的记录覆盖先出现的记录
    pub fn new(
        class_groups: Vec<ClassGroup>,
        teachers: Vec<Teacher>,
        subjects: Vec<Subject>,
        entries: Vec<ScheduleEntry>,
    ) -> Self {
        Self {
            class_groups: class_groups.into_iter().map(|c| (c.id, c)).collect(),
            teachers: teachers.into_iter().map(|t| (t.id, t)).collect(),
            subjects: subjects.into_iter().map(|s| (s.id, s)).collect(),
            entries,
        }
    }

    /// 替换现有条目，花名册保持不变
    pub fn with_entries(&self, entries: Vec<ScheduleEntry>) -> Self {
        Self {
            class_groups: self.class_groups.clone(),
            teachers: self.teachers.clone(),
            subjects: self.subjects.clone(),
            entries,
        }
    }

    pub fn class_group(&self, id: ClassGroupId) -> Option<&ClassGroup> {
        self.class_groups.get(&id)
    }

    pub fn teacher(&self, id: TeacherId) -> Option<&Teacher> {
        self.teachers.get(&id)
    }

    pub fn subject(&self, id: SubjectId) -> Option<&Subject> {
        self.subjects.get(&id)
    }

    pub fn class_groups(&self) -> impl Iterator<Item = &ClassGroup> {
        self.class_groups.values()
    }

    pub fn teachers(&self) -> impl Iterator<Item = &Teacher> {
        self.teachers.values()
    }

    pub fn subjects(&self) -> impl Iterator<Item = &Subject> {
        self.subjects.values()
    }

    /// 快照捕获时的现有课表条目
    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }
}
