// ==========================================
// 学校课表排课系统 - 花名册领域模型
// ==========================================
// 班级 / 教师 / 科目，由外部花名册系统维护
// 排课核心只读，不做增删改
// ==========================================

use crate::domain::types::{ClassGroupId, SubjectId, TeacherId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// ==========================================
// ClassGroup - 班级
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassGroup {
    pub id: ClassGroupId,
    pub name: String,         // 例如 "10A"
    pub grade: Option<i32>,   // 年级，例如 10
}

// ==========================================
// Teacher - 教师
// ==========================================
// 资质为科目标识集合（不是科目名称）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Teacher {
    pub id: TeacherId,
    pub name: String,
    pub subject_ids: BTreeSet<SubjectId>, // 可任教科目
}

impl Teacher {
    /// 是否具备某科目的任教资质
    ///
    /// 资质集合为空的教师不能任教任何科目
    pub fn is_qualified_for(&self, subject_id: SubjectId) -> bool {
        self.subject_ids.contains(&subject_id)
    }
}

// ==========================================
// Subject - 科目
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    pub name: String,
    pub hours_per_week: u32, // 每周课时目标（每个修读班级）
}
