// ==========================================
// 学校课表排课系统 - 课表变更事件
// ==========================================
// 职责: 定义课表变更事件发布 trait
// 说明: 排课核心定义 trait，外部协作方（公告、通知等）实现
// ==========================================

use crate::domain::schedule::ScheduleEntry;
use crate::domain::types::{ClassGroupId, EntryId, TeacherId};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::sync::Arc;

// ==========================================
// 事件类型
// ==========================================

/// 课表变更类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TimetableEventType {
    /// 人工新增条目
    EntryCreated,
    /// 自动排课新增条目
    EntriesGenerated,
    /// 删除条目
    EntryDeleted,
}

impl TimetableEventType {
    pub fn as_str(&self) -> &str {
        match self {
            TimetableEventType::EntryCreated => "EntryCreated",
            TimetableEventType::EntriesGenerated => "EntriesGenerated",
            TimetableEventType::EntryDeleted => "EntryDeleted",
        }
    }
}

/// 课表变更事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimetableEvent {
    pub event_type: TimetableEventType,
    /// 受影响条目
    pub entry_ids: Vec<EntryId>,
    /// 受影响班级（去重、升序）
    pub class_group_ids: Vec<ClassGroupId>,
    /// 受影响教师（去重、升序）
    pub teacher_ids: Vec<TeacherId>,
}

impl TimetableEvent {
    /// 由条目列表汇总受影响范围
    pub fn from_entries<'a>(
        event_type: TimetableEventType,
        entries: impl IntoIterator<Item = &'a ScheduleEntry>,
    ) -> Self {
        let mut entry_ids = Vec::new();
        let mut class_group_ids = Vec::new();
        let mut teacher_ids = Vec::new();
        for entry in entries {
            entry_ids.push(entry.id.clone());
            class_group_ids.push(entry.class_group_id);
            teacher_ids.push(entry.teacher_id);
        }
        class_group_ids.sort_unstable();
        class_group_ids.dedup();
        teacher_ids.sort_unstable();
        teacher_ids.dedup();
        Self {
            event_type,
            entry_ids,
            class_group_ids,
            teacher_ids,
        }
    }
}

// ==========================================
// 事件发布 Trait
// ==========================================

/// 课表事件发布者
pub trait TimetableEventPublisher: Send + Sync {
    /// 发布事件
    ///
    /// # 返回
    /// - `Ok(task_id)`: 下游任务 ID（如果支持）或空字符串
    /// - `Err`: 发布失败
    fn publish(&self, event: TimetableEvent) -> Result<String, Box<dyn Error + Send + Sync>>;
}

/// 空操作事件发布者（单元测试或无下游时使用）
#[derive(Debug, Clone, Default)]
pub struct NoOpEventPublisher;

impl TimetableEventPublisher for NoOpEventPublisher {
    fn publish(&self, event: TimetableEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        tracing::debug!(
            "NoOpEventPublisher: 跳过事件发布 - event_type={}, entries={}",
            event.event_type.as_str(),
            event.entry_ids.len()
        );
        Ok(String::new())
    }
}

/// 可选的事件发布者包装
pub struct OptionalEventPublisher {
    inner: Option<Arc<dyn TimetableEventPublisher>>,
}

impl OptionalEventPublisher {
    pub fn with_publisher(publisher: Arc<dyn TimetableEventPublisher>) -> Self {
        Self {
            inner: Some(publisher),
        }
    }

    pub fn none() -> Self {
        Self { inner: None }
    }

    /// 发布事件（如果有发布者）
    pub fn publish(&self, event: TimetableEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        match &self.inner {
            Some(publisher) => publisher.publish(event),
            None => {
                tracing::debug!(
                    "OptionalEventPublisher: 未配置发布者，跳过事件 - event_type={}",
                    event.event_type.as_str()
                );
                Ok(String::new())
            }
        }
    }
}

impl Default for OptionalEventPublisher {
    fn default() -> Self {
        Self::none()
    }
}
