// ==========================================
// 学校课表排课系统 - 命令行入口
// ==========================================
// 用法:
//   school-timetable [--db <path>] week
//   school-timetable [--db <path>] class <class_group_id>
//   school-timetable [--db <path>] teacher <teacher_id>
//   school-timetable [--db <path>] grid
//   school-timetable [--db <path>] generate <request.json>
//   school-timetable [--db <path>] delete <entry_id>
// 输出: JSON（stdout），日志走 tracing（stderr）
// ==========================================

use anyhow::{bail, Context, Result};
use school_timetable::{db, logging, EntryId, GenerateRequest, TimetableApi};
use serde::Serialize;

fn main() -> Result<()> {
    logging::init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();
    let db_path = take_db_arg(&mut args)?.unwrap_or_else(db::default_db_path);

    tracing::info!("==================================================");
    tracing::info!("{} v{}", school_timetable::APP_NAME, school_timetable::VERSION);
    tracing::info!("使用数据库: {}", db_path);
    tracing::info!("==================================================");

    let api = TimetableApi::open(&db_path).with_context(|| format!("无法打开数据库: {}", db_path))?;

    let mut rest = args.into_iter();
    let command = rest.next().unwrap_or_else(|| "week".to_string());
    match command.as_str() {
        "week" => print_json(&api.all_entries()?),
        "class" => {
            let id = parse_id(rest.next(), "class_group_id")?;
            print_json(&api.weekly_for_class_group(id)?)
        }
        "teacher" => {
            let id = parse_id(rest.next(), "teacher_id")?;
            print_json(&api.weekly_for_teacher(id)?)
        }
        "grid" => print_json(&api.time_grid(None)?),
        "generate" => {
            let path = rest.next().context("缺少参数: <request.json>")?;
            let raw = std::fs::read_to_string(&path)
                .with_context(|| format!("无法读取排课请求: {}", path))?;
            let request: GenerateRequest =
                serde_json::from_str(&raw).with_context(|| format!("排课请求格式错误: {}", path))?;
            print_json(&api.generate(request)?)
        }
        "delete" => {
            let id = rest.next().context("缺少参数: <entry_id>")?;
            print_json(&api.delete_entry(&EntryId::from(id))?)
        }
        other => bail!("未知命令: {} (可用: week / class / teacher / grid / generate / delete)", other),
    }
}

/// 取出 `--db <path>`（可出现在任意位置）
fn take_db_arg(args: &mut Vec<String>) -> Result<Option<String>> {
    let Some(pos) = args.iter().position(|a| a == "--db") else {
        return Ok(None);
    };
    if pos + 1 >= args.len() {
        bail!("--db 需要一个路径参数");
    }
    let path = args.remove(pos + 1);
    args.remove(pos);
    Ok(Some(path))
}

fn parse_id(raw: Option<String>, name: &str) -> Result<i64> {
    let raw = raw.with_context(|| format!("缺少参数: <{}>", name))?;
    raw.trim()
        .parse::<i64>()
        .with_context(|| format!("{} 不是整数: {}", name, raw))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
