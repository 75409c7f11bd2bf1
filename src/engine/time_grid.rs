// ==========================================
// 学校课表排课系统 - 时间网格
// ==========================================
// 职责: 由作息窗口推导每日节次
// 输入: day_start / day_end / 课时 / 课间
// 输出: 有序节次列表（五个教学日共用）
// 纯函数，无状态
// ==========================================

use crate::domain::generation::TimeWindow;
use crate::engine::error::{ScheduleError, ScheduleResult};
use chrono::{Duration, NaiveTime};
use serde::{Deserialize, Serialize};

const MINUTES_PER_DAY: i64 = 24 * 60;

// ==========================================
// Slot - 节次
// ==========================================
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Slot {
    pub lesson_number: u32, // 从 1 开始
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

// ==========================================
// TimeGrid - 时间网格
// ==========================================
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeGrid {
    window: TimeWindow,
    slots: Vec<Slot>,
}

impl TimeGrid {
    /// 构建时间网格
    ///
    /// 第 k 节: start = day_start + (k-1) × (课时 + 课间), end = start + 课时
    /// 第一个 end 超过 day_end 的节次及其后续全部排除
    ///
    /// # 错误
    /// - 课时 ≤ 0、课间 < 0、day_end ≤ day_start
    /// - 窗口内一节课都放不下
    pub fn build(window: &TimeWindow) -> ScheduleResult<Self> {
        if window.lesson_duration_minutes <= 0 {
            return Err(ScheduleError::configuration(format!(
                "课时必须为正数: lesson_duration_minutes={}",
                window.lesson_duration_minutes
            )));
        }
        if window.break_duration_minutes < 0 {
            return Err(ScheduleError::configuration(format!(
                "课间不能为负数: break_duration_minutes={}",
                window.break_duration_minutes
            )));
        }
        if window.day_end_time <= window.day_start_time {
            return Err(ScheduleError::configuration(format!(
                "放学时间必须晚于上课时间: {}-{}",
                window.day_start_time, window.day_end_time
            )));
        }
        if window.lesson_duration_minutes > MINUTES_PER_DAY
            || window.break_duration_minutes > MINUTES_PER_DAY
        {
            return Err(ScheduleError::configuration(format!(
                "课时或课间超过一天: lesson={}, break={}",
                window.lesson_duration_minutes, window.break_duration_minutes
            )));
        }

        let lesson = Duration::minutes(window.lesson_duration_minutes);
        let stride = Duration::minutes(window.lesson_duration_minutes + window.break_duration_minutes);

        let mut slots = Vec::new();
        let mut start = window.day_start_time;
        let mut lesson_number: u32 = 1;
        loop {
            // 跨过午夜即视为超出当天
            let (end, wrapped) = start.overflowing_add_signed(lesson);
            if wrapped != 0 || end > window.day_end_time {
                break;
            }
            slots.push(Slot {
                lesson_number,
                start_time: start,
                end_time: end,
            });

            let (next, wrapped) = start.overflowing_add_signed(stride);
            if wrapped != 0 {
                break;
            }
            start = next;
            lesson_number += 1;
        }

        if slots.is_empty() {
            return Err(ScheduleError::configuration(format!(
                "作息窗口 {}-{} 放不下一节 {} 分钟的课",
                window.day_start_time, window.day_end_time, window.lesson_duration_minutes
            )));
        }

        Ok(Self {
            window: *window,
            slots,
        })
    }

    /// 网格对应的作息窗口
    pub fn window(&self) -> &TimeWindow {
        &self.window
    }

    /// 全部节次（可重复遍历）
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// 按节次号取节次
    pub fn slot(&self, lesson_number: u32) -> Option<&Slot> {
        lesson_number
            .checked_sub(1)
            .and_then(|idx| self.slots.get(idx as usize))
    }

    /// 给定开始时间对应的节次号
    ///
    /// 等于 1 + 开始时间早于 start 的节次数；对齐网格时即该节次号，
    /// 未对齐时给出用于显示排序的位置
    pub fn lesson_number_for(&self, start: NaiveTime) -> u32 {
        let before = self.slots.iter().filter(|s| s.start_time < start).count();
        before as u32 + 1
    }
}

/// 构建时间网格并返回节次列表（供界面渲染可用节次）
pub fn build_time_grid(window: &TimeWindow) -> ScheduleResult<Vec<Slot>> {
    Ok(TimeGrid::build(window)?.slots)
}
