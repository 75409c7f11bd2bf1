// ==========================================
// 日志系统初始化
// ==========================================
// 使用 tracing 和 tracing-subscriber
// - 日志写 stderr，stdout 只留给命令行的 JSON 输出
// - 输出格式: text（默认）或 json，由 SCHOOL_TIMETABLE_LOG_FORMAT 选择
// - 过滤规则: RUST_LOG，未设置时本 crate 记 info、依赖库记 warn
// ==========================================

use std::io;
use tracing_subscriber::{fmt, EnvFilter};

/// 日志格式环境变量
pub const LOG_FORMAT_ENV: &str = "SCHOOL_TIMETABLE_LOG_FORMAT";

/// 未设置 RUST_LOG 时的过滤规则
pub const DEFAULT_FILTER: &str = "warn,school_timetable=info";

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Text,
    Json, // 每个事件一行 JSON，便于日志采集
}

impl LogFormat {
    /// 解析格式名（大小写不敏感，空串视为 text）
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "" | "text" => Some(Self::Text),
            "json" => Some(Self::Json),
            _ => None,
        }
    }
}

/// 初始化日志系统
///
/// # 环境变量
/// - RUST_LOG: 日志级别过滤器（默认: `warn,school_timetable=info`）
/// - SCHOOL_TIMETABLE_LOG_FORMAT: `text` / `json`，无法识别时回退为 text
///
/// # 示例
/// ```no_run
/// use school_timetable::logging;
/// logging::init();
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let raw_format = std::env::var(LOG_FORMAT_ENV).ok();
    let format = match raw_format.as_deref() {
        Some(raw) => LogFormat::parse(raw),
        None => Some(LogFormat::Text),
    };

    let builder = fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .with_line_number(true);
    match format.unwrap_or(LogFormat::Text) {
        LogFormat::Text => builder.init(),
        LogFormat::Json => builder.json().flatten_event(true).init(),
    }

    if format.is_none() {
        tracing::warn!(value = ?raw_format, "{} 无法识别，日志格式回退为 text", LOG_FORMAT_ENV);
    }
}

/// 初始化测试环境的日志系统
///
/// 使用更详细的日志级别，便于调试
pub fn init_test() {
    let _ = fmt()
        .with_env_filter(EnvFilter::new("debug"))
        .with_test_writer()
        .try_init();
}
