// ==========================================
// 学校课表排课系统 - API 层
// ==========================================
// 职责: 面向调用方的门面，组合 仓储 + 配置 + 引擎
// ==========================================

pub mod error;
pub mod timetable_api;

pub use error::{ApiError, ApiResult};
pub use timetable_api::TimetableApi;
