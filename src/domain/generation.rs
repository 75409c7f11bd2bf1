// ==========================================
// 学校课表排课系统 - 自动排课输入模型
// ==========================================
// TimeWindow / TeacherSubjectMapping 只作为排课输入，不落库
// ==========================================

use crate::domain::types::{ClassGroupId, SubjectId, TeacherId};
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};

/// 默认上课开始时间 08:00
pub const DEFAULT_DAY_START: (u32, u32) = (8, 0);

/// 默认放学时间 15:00
pub const DEFAULT_DAY_END: (u32, u32) = (15, 0);

/// 默认每节课时长（分钟）
pub const DEFAULT_LESSON_MINUTES: i64 = 45;

/// 默认课间时长（分钟）
pub const DEFAULT_BREAK_MINUTES: i64 = 15;

// ==========================================
// TimeWindow - 每日作息窗口
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub day_start_time: NaiveTime,
    pub day_end_time: NaiveTime,
    pub lesson_duration_minutes: i64,
    pub break_duration_minutes: i64,
}

impl TimeWindow {
    pub fn new(
        day_start_time: NaiveTime,
        day_end_time: NaiveTime,
        lesson_duration_minutes: i64,
        break_duration_minutes: i64,
    ) -> Self {
        Self {
            day_start_time,
            day_end_time,
            lesson_duration_minutes,
            break_duration_minutes,
        }
    }

    /// 时间段是否完整落在窗口内（半开区间）
    pub fn contains(&self, start: NaiveTime, end: NaiveTime) -> bool {
        start < end && start >= self.day_start_time && end <= self.day_end_time
    }
}

impl Default for TimeWindow {
    fn default() -> Self {
        let (sh, sm) = DEFAULT_DAY_START;
        let (eh, em) = DEFAULT_DAY_END;
        Self {
            day_start_time: NaiveTime::from_hms_opt(sh, sm, 0).unwrap_or_default(),
            day_end_time: NaiveTime::from_hms_opt(eh, em, 0).unwrap_or_default(),
            lesson_duration_minutes: DEFAULT_LESSON_MINUTES,
            break_duration_minutes: DEFAULT_BREAK_MINUTES,
        }
    }
}

// ==========================================
// TeacherSubjectMapping - 教师-科目-班级映射
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeacherSubjectMapping {
    pub teacher_id: TeacherId,
    pub subject_id: SubjectId,
    pub class_group_ids: Vec<ClassGroupId>,
}

// ==========================================
// GenerateRequest - 自动排课请求
// ==========================================
// 作息字段可缺省，缺省时取系统配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub class_group_ids: Vec<ClassGroupId>,
    pub teacher_subject_mappings: Vec<TeacherSubjectMapping>,
    #[serde(default)]
    pub day_start_time: Option<NaiveTime>,
    #[serde(default)]
    pub day_end_time: Option<NaiveTime>,
    #[serde(default)]
    pub lesson_duration_minutes: Option<i64>,
    #[serde(default)]
    pub break_duration_minutes: Option<i64>,
}

impl GenerateRequest {
    /// 以 base 为底，用请求中给出的字段覆盖
    pub fn resolve_window(&self, base: TimeWindow) -> TimeWindow {
        TimeWindow {
            day_start_time: self.day_start_time.unwrap_or(base.day_start_time),
            day_end_time: self.day_end_time.unwrap_or(base.day_end_time),
            lesson_duration_minutes: self
                .lesson_duration_minutes
                .unwrap_or(base.lesson_duration_minutes),
            break_duration_minutes: self
                .break_duration_minutes
                .unwrap_or(base.break_duration_minutes),
        }
    }
}
