// ==========================================
// 学校课表排课系统 - 引擎层
// ==========================================
// 职责: 时间网格 → 冲突索引 → 条目校验 → 自动排课
// 红线: Engine 不拼 SQL, 不做 I/O
// ==========================================

pub mod assignment;
pub mod conflict_index;
pub mod error;
pub mod events;
pub mod time_grid;
pub mod validator;

// 重导出核心引擎
pub use assignment::{AssignmentEngine, GenerationOutcome, Shortfall, ShortfallReason, WorkItem};
pub use conflict_index::{ConflictError, ConflictIndex};
pub use error::{ScheduleError, ScheduleResult};
pub use events::{
    NoOpEventPublisher, OptionalEventPublisher, TimetableEvent, TimetableEventPublisher,
    TimetableEventType,
};
pub use time_grid::{build_time_grid, Slot, TimeGrid};
pub use validator::{validate_and_prepare, EntryValidator};
