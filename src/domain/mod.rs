// ==========================================
// 学校课表排课系统 - 领域模型层
// ==========================================
// 职责: 定义领域实体与类型
// 红线: 不含数据访问逻辑,不含引擎逻辑
// ==========================================

pub mod generation;
pub mod roster;
pub mod schedule;
pub mod snapshot;
pub mod types;

// 重导出核心类型
pub use generation::{GenerateRequest, TeacherSubjectMapping, TimeWindow};
pub use roster::{ClassGroup, Subject, Teacher};
pub use schedule::{EntryScope, NewScheduleEntry, ScheduleEntry, ScheduleEntryView};
pub use snapshot::DomainSnapshot;
pub use types::{ClassGroupId, EntryId, SchoolDay, SubjectId, TeacherId};
