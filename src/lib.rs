// ==========================================
// 学校课表排课系统 - 核心库
// ==========================================
// 技术栈: Rust + SQLite
// 系统定位: 周课表排课核心（校验 + 自动排课 + 存储门面）
// ==========================================

// 初始化国际化系统
rust_i18n::i18n!("locales", fallback = "zh-CN");

// ==========================================
// 模块声明
// ==========================================

// 领域层 - 实体与类型
pub mod domain;

// 数据仓储层 - 数据访问
pub mod repository;

// 引擎层 - 排课规则
pub mod engine;

// 配置层 - 作息窗口
pub mod config;

// 数据库基础设施（连接初始化/PRAGMA 统一/建表）
pub mod db;

// 日志系统
pub mod logging;

// 国际化
pub mod i18n;

// API 层 - 门面
pub mod api;

// ==========================================
// 重导出核心类型
// ==========================================

// 领域类型
pub use domain::types::{ClassGroupId, EntryId, SchoolDay, SubjectId, TeacherId};

// 领域实体
pub use domain::{
    ClassGroup, DomainSnapshot, EntryScope, GenerateRequest, NewScheduleEntry, ScheduleEntry,
    ScheduleEntryView, Subject, Teacher, TeacherSubjectMapping, TimeWindow,
};

// 引擎
pub use engine::{
    build_time_grid, validate_and_prepare, AssignmentEngine, GenerationOutcome, ScheduleError,
    Shortfall, ShortfallReason, Slot, TimeGrid,
};

// API
pub use api::{ApiError, ApiResult, TimetableApi};

// ==========================================
// 常量定义
// ==========================================

// 系统版本
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

// 系统名称
pub const APP_NAME: &str = "学校课表排课系统";
