// ==========================================
// 学校课表排课系统 - 领域类型定义
// ==========================================
// 职责: 标识类型、教学日、条目标识
// ==========================================

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// 班级标识
pub type ClassGroupId = i64;

/// 教师标识
pub type TeacherId = i64;

/// 科目标识
pub type SubjectId = i64;

// ==========================================
// 教学日 (School Day)
// ==========================================
// 一周五个教学日，顺序即排课遍历顺序
// 序列化格式: SCREAMING_SNAKE_CASE (与数据库一致)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SchoolDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl SchoolDay {
    /// 固定顺序的五个教学日（周一..周五）
    pub const ALL: [SchoolDay; 5] = [
        SchoolDay::Monday,
        SchoolDay::Tuesday,
        SchoolDay::Wednesday,
        SchoolDay::Thursday,
        SchoolDay::Friday,
    ];

    /// 数据库存储值
    pub fn to_db_str(&self) -> &'static str {
        match self {
            SchoolDay::Monday => "MONDAY",
            SchoolDay::Tuesday => "TUESDAY",
            SchoolDay::Wednesday => "WEDNESDAY",
            SchoolDay::Thursday => "THURSDAY",
            SchoolDay::Friday => "FRIDAY",
        }
    }

    /// 从数据库存储值解析（大小写不敏感）
    ///
    /// 周末或未知值返回 None
    pub fn from_db_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "MONDAY" => Some(SchoolDay::Monday),
            "TUESDAY" => Some(SchoolDay::Tuesday),
            "WEDNESDAY" => Some(SchoolDay::Wednesday),
            "THURSDAY" => Some(SchoolDay::Thursday),
            "FRIDAY" => Some(SchoolDay::Friday),
            _ => None,
        }
    }

    /// 周内序号（周一 = 1）
    pub fn ordinal(&self) -> u8 {
        match self {
            SchoolDay::Monday => 1,
            SchoolDay::Tuesday => 2,
            SchoolDay::Wednesday => 3,
            SchoolDay::Thursday => 4,
            SchoolDay::Friday => 5,
        }
    }
}

impl fmt::Display for SchoolDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_db_str())
    }
}

impl TryFrom<chrono::Weekday> for SchoolDay {
    type Error = chrono::Weekday;

    fn try_from(day: chrono::Weekday) -> Result<Self, Self::Error> {
        match day {
            chrono::Weekday::Mon => Ok(SchoolDay::Monday),
            chrono::Weekday::Tue => Ok(SchoolDay::Tuesday),
            chrono::Weekday::Wed => Ok(SchoolDay::Wednesday),
            chrono::Weekday::Thu => Ok(SchoolDay::Thursday),
            chrono::Weekday::Fri => Ok(SchoolDay::Friday),
            other => Err(other),
        }
    }
}

// ==========================================
// 课表条目标识 (Entry Id)
// ==========================================
// 人工录入: 随机 UUID (v4)
// 自动生成: 基于内容的 UUID (v5)，保证相同输入得到相同输出
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(String);

impl EntryId {
    /// 生成随机标识
    pub fn random() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// 由名称派生确定性标识
    pub fn derived(name: &str) -> Self {
        Self(Uuid::new_v5(&Uuid::NAMESPACE_OID, name.as_bytes()).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for EntryId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl From<&str> for EntryId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
