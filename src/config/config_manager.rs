// ==========================================
// 学校课表排课系统 - 配置管理器
// ==========================================
// 职责: 作息窗口配置的加载、查询、覆写
// 存储: config_kv 表 (key-value + scope)
// ==========================================

use crate::domain::generation::{
    TimeWindow, DEFAULT_BREAK_MINUTES, DEFAULT_LESSON_MINUTES,
};
use chrono::NaiveTime;
use rusqlite::{params, Connection};
use serde_json::json;
use std::collections::BTreeMap;
use std::error::Error;
use std::sync::{Arc, Mutex};

// ==========================================
// ConfigManager - 配置管理器
// ==========================================
pub struct ConfigManager {
    conn: Arc<Mutex<Connection>>,
}

impl ConfigManager {
    /// 从已有连接创建 ConfigManager
    ///
    /// 说明：为保证连接行为一致，会对传入连接再次应用统一 PRAGMA（幂等）。
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> Result<Self, Box<dyn Error>> {
        {
            let conn_guard = conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
            crate::db::configure_sqlite_connection(&conn_guard)?;
        }

        Ok(Self { conn })
    }

    /// 从 config_kv 表读取配置值（scope_id='global'）
    ///
    /// # 返回
    /// - Some(String): 配置值
    /// - None: 配置不存在
    fn get_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let result = conn.query_row(
            "SELECT value FROM config_kv WHERE scope_id = 'global' AND key = ?1",
            params![key],
            |row| row.get::<_, String>(0),
        );

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(Box::new(e)),
        }
    }

    /// 读取 global scope 的配置值（公开方法，供其他模块复用）
    pub fn get_global_config_value(&self, key: &str) -> Result<Option<String>, Box<dyn Error>> {
        self.get_config_value(key)
    }

    /// 写入 global scope 的配置值（存在则覆盖）
    pub fn set_global_config_value(&self, key: &str, value: &str) -> Result<(), Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;
        conn.execute(
            "INSERT INTO config_kv (scope_id, key, value) VALUES ('global', ?1, ?2)
             ON CONFLICT(scope_id, key) DO UPDATE SET value = ?2, updated_at = datetime('now')",
            params![key, value],
        )?;
        Ok(())
    }

    /// 获取所有配置的快照（JSON格式，键有序）
    pub fn get_config_snapshot(&self) -> Result<String, Box<dyn Error>> {
        let conn = self.conn.lock().map_err(|e| format!("锁获取失败: {}", e))?;

        let mut stmt = conn.prepare(
            "SELECT key, value FROM config_kv WHERE scope_id = 'global' ORDER BY key",
        )?;

        let mut config_map: BTreeMap<String, String> = BTreeMap::new();
        let rows = stmt.query_map([], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        for row in rows {
            let (key, value) = row?;
            config_map.insert(key, value);
        }

        Ok(serde_json::to_string(&json!(config_map))?)
    }

    // ===== 作息窗口配置 =====

    /// 当前生效的作息窗口
    ///
    /// 缺失或无法解析的键回落到默认值 (08:00-15:00, 45/15)
    pub fn get_time_window(&self) -> Result<TimeWindow, Box<dyn Error>> {
        let defaults = TimeWindow::default();

        let day_start_time = self
            .get_time(config_keys::DAY_START_TIME)?
            .unwrap_or(defaults.day_start_time);
        let day_end_time = self
            .get_time(config_keys::DAY_END_TIME)?
            .unwrap_or(defaults.day_end_time);
        let lesson_duration_minutes = self
            .get_minutes(config_keys::LESSON_DURATION_MINUTES)?
            .unwrap_or(DEFAULT_LESSON_MINUTES);
        let break_duration_minutes = self
            .get_minutes(config_keys::BREAK_DURATION_MINUTES)?
            .unwrap_or(DEFAULT_BREAK_MINUTES);

        Ok(TimeWindow::new(
            day_start_time,
            day_end_time,
            lesson_duration_minutes,
            break_duration_minutes,
        ))
    }

    /// 覆写作息窗口（四个键一起写入）
    pub fn set_time_window(&self, window: &TimeWindow) -> Result<(), Box<dyn Error>> {
        self.set_global_config_value(
            config_keys::DAY_START_TIME,
            &window.day_start_time.format("%H:%M").to_string(),
        )?;
        self.set_global_config_value(
            config_keys::DAY_END_TIME,
            &window.day_end_time.format("%H:%M").to_string(),
        )?;
        self.set_global_config_value(
            config_keys::LESSON_DURATION_MINUTES,
            &window.lesson_duration_minutes.to_string(),
        )?;
        self.set_global_config_value(
            config_keys::BREAK_DURATION_MINUTES,
            &window.break_duration_minutes.to_string(),
        )?;
        Ok(())
    }

    fn get_time(&self, key: &str) -> Result<Option<NaiveTime>, Box<dyn Error>> {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(None);
        };
        let parsed = parse_clock_time(&raw);
        if parsed.is_none() {
            tracing::warn!(key, value = %raw, "配置值不是合法时间(HH:MM)，使用默认值");
        }
        Ok(parsed)
    }

    fn get_minutes(&self, key: &str) -> Result<Option<i64>, Box<dyn Error>> {
        let Some(raw) = self.get_config_value(key)? else {
            return Ok(None);
        };
        let parsed = raw.trim().parse::<i64>().ok();
        if parsed.is_none() {
            tracing::warn!(key, value = %raw, "配置值不是整数分钟，使用默认值");
        }
        Ok(parsed)
    }
}

/// 解析 "HH:MM" 或 "HH:MM:SS"
fn parse_clock_time(raw: &str) -> Option<NaiveTime> {
    let raw = raw.trim();
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .ok()
}

// ==========================================
// 配置键常量
// ==========================================
pub mod config_keys {
    // 作息窗口
    pub const DAY_START_TIME: &str = "timetable/day_start_time";
    pub const DAY_END_TIME: &str = "timetable/day_end_time";
    pub const LESSON_DURATION_MINUTES: &str = "timetable/lesson_duration_minutes";
    pub const BREAK_DURATION_MINUTES: &str = "timetable/break_duration_minutes";
}
