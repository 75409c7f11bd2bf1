// ==========================================
// TimetableApi 集成测试
// ==========================================
// 测试范围:
// 1. 人工录入: create_entry（资质 / 作息窗口 / 教师冲突 / 班级冲突）
// 2. 自动排课: generate（落库、范围过滤、确定性、作息覆盖、重复排课追加）
// 3. 写事务: 多个连接（模拟多个进程）写入同一数据库时串行化
// 4. 删除与查询: delete_entry, weekly_for_class_group, weekly_for_teacher
// 5. 作息网格: time_grid, set_time_window
// 6. 变更事件发布
// ==========================================


use school_timetable::domain::{GenerateRequest, ScheduleEntry, TeacherSubjectMapping, TimeWindow};
use school_timetable::engine::{
    ScheduleError, ShortfallReason, TimetableEvent, TimetableEventPublisher, TimetableEventType,
};
use school_timetable::repository::ScheduleEntryRepository;
use school_timetable::{db, logging, ApiError, EntryId, SchoolDay, TimetableApi};
use std::collections::BTreeSet;
use std::error::Error;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;
use test_helpers::*;

// ==========================================
// 测试辅助
// ==========================================

#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<TimetableEvent>>,
}

impl TimetableEventPublisher for RecordingPublisher {
    fn publish(&self, event: TimetableEvent) -> Result<String, Box<dyn Error + Send + Sync>> {
        self.events.lock().unwrap().push(event);
        Ok(String::new())
    }
}

fn mapping(teacher_id: i64, subject_id: i64, class_group_ids: Vec<i64>) -> TeacherSubjectMapping {
    TeacherSubjectMapping {
        teacher_id,
        subject_id,
        class_group_ids,
    }
}

fn request(class_group_ids: Vec<i64>, mappings: Vec<TeacherSubjectMapping>) -> GenerateRequest {
    GenerateRequest {
        class_group_ids,
        teacher_subject_mappings: mappings,
        day_start_time: None,
        day_end_time: None,
        lesson_duration_minutes: None,
        break_duration_minutes: None,
    }
}

fn standard_request() -> GenerateRequest {
    request(
        vec![CLASS_1A, CLASS_1B],
        vec![
            mapping(TEACHER_ZHANG, MATH, vec![CLASS_1A, CLASS_1B]),
            mapping(TEACHER_LI, ART, vec![CLASS_1A, CLASS_1B, CLASS_2A]),
        ],
    )
}

// ==========================================
// 人工录入
// ==========================================

#[test]
fn test_create_entry_persists_with_derived_lesson_number() {
    logging::init_test();
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();

    let entry = api
        .create_entry(new_entry(CLASS_1A, TEACHER_ZHANG, MATH, SchoolDay::Monday, t(9, 0), t(9, 45)))
        .expect("录入失败");
    assert_eq!(entry.lesson_number, 2);

    let week = api.weekly_for_class_group(CLASS_1A).unwrap();
    assert_eq!(week.len(), 1);
    assert_eq!(week[0].entry, entry);
    assert_eq!(week[0].class_group_name, "1A");
    assert_eq!(week[0].teacher_name, "Zhang");
    assert_eq!(week[0].subject_name, "MATH");

    assert_eq!(api.weekly_for_teacher(TEACHER_ZHANG).unwrap().len(), 1);
    assert!(api.weekly_for_teacher(TEACHER_WANG).unwrap().is_empty());
}

#[test]
fn test_create_entry_teacher_conflict_names_existing_entry() {
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();

    let e1 = api
        .create_entry(new_entry(CLASS_1A, TEACHER_ZHANG, MATH, SchoolDay::Monday, t(8, 0), t(8, 45)))
        .unwrap();

    let err = api
        .create_entry(new_entry(CLASS_1B, TEACHER_ZHANG, PHYSICS, SchoolDay::Monday, t(8, 30), t(9, 15)))
        .unwrap_err();
    match err {
        ApiError::Schedule(ScheduleError::TeacherConflict {
            teacher_id,
            blocking_entry_id,
            ..
        }) => {
            assert_eq!(teacher_id, TEACHER_ZHANG);
            assert_eq!(blocking_entry_id, e1.id);
        }
        other => panic!("Expected TeacherConflict, got {:?}", other),
    }
    assert_eq!(api.all_entries().unwrap().len(), 1, "被拒绝的条目不应落库");
}

#[test]
fn test_create_entry_class_group_conflict() {
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();

    let e1 = api
        .create_entry(new_entry(CLASS_1A, TEACHER_ZHANG, MATH, SchoolDay::Tuesday, t(10, 0), t(10, 45)))
        .unwrap();
    let err = api
        .create_entry(new_entry(CLASS_1A, TEACHER_WANG, MATH, SchoolDay::Tuesday, t(10, 0), t(10, 45)))
        .unwrap_err();

    assert!(matches!(err, ApiError::Schedule(ScheduleError::ClassGroupConflict { .. })));
    assert_eq!(err.blocking_entry_id(), Some(&e1.id));

    // 首尾相接不冲突
    api.create_entry(new_entry(CLASS_1A, TEACHER_WANG, MATH, SchoolDay::Tuesday, t(10, 45), t(11, 30)))
        .expect("首尾相接应允许");
}

#[test]
fn test_create_entry_rejects_unqualified_and_out_of_window() {
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();

    let err = api
        .create_entry(new_entry(CLASS_1A, TEACHER_LI, MATH, SchoolDay::Monday, t(8, 0), t(8, 45)))
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Schedule(ScheduleError::UnqualifiedTeacher { teacher_id: TEACHER_LI, subject_id: MATH })
    ));

    let err = api
        .create_entry(new_entry(CLASS_1A, TEACHER_ZHANG, MATH, SchoolDay::Monday, t(14, 30), t(15, 15)))
        .unwrap_err();
    assert!(matches!(err, ApiError::Schedule(ScheduleError::OutOfWindow { .. })));

    let err = api
        .create_entry(new_entry(99, TEACHER_ZHANG, MATH, SchoolDay::Monday, t(8, 0), t(8, 45)))
        .unwrap_err();
    assert!(matches!(
        err,
        ApiError::Schedule(ScheduleError::UnknownReference { entity: "class_group", id: 99 })
    ));

    assert!(api.all_entries().unwrap().is_empty());
}

#[test]
fn test_create_entry_uses_configured_window() {
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();

    api.set_time_window(&TimeWindow::new(t(7, 0), t(12, 0), 40, 10)).unwrap();
    let entry = api
        .create_entry(new_entry(CLASS_2A, TEACHER_WANG, MATH, SchoolDay::Friday, t(7, 50), t(8, 30)))
        .unwrap();
    assert_eq!(entry.lesson_number, 2);
}

// ==========================================
// 自动排课
// ==========================================

#[test]
fn test_generate_persists_and_respects_scope() {
    logging::init_test();
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let recorder = Arc::new(RecordingPublisher::default());
    let api = TimetableApi::open(&db_path)
        .unwrap()
        .with_event_publisher(recorder.clone());

    let outcome = api.generate(standard_request()).expect("排课失败");

    // MATH 4 节 × 2 个班 + ART 1 节 × 2 个班；2A 不在范围内
    assert_eq!(outcome.placed.len(), 10);
    assert!(outcome.is_fully_satisfied());
    assert_eq!(outcome.placed_for(TEACHER_ZHANG, MATH, CLASS_1A), 4);
    assert_eq!(outcome.placed_for(TEACHER_LI, ART, CLASS_2A), 0);

    let stored: Vec<_> = api.all_entries().unwrap().into_iter().map(|v| v.entry).collect();
    assert_eq!(stored.len(), 10);
    assert!(api.weekly_for_class_group(CLASS_2A).unwrap().is_empty());
    assert_no_overlaps(&stored);

    let events = recorder.events.lock().unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event_type, TimetableEventType::EntriesGenerated);
    assert_eq!(events[0].entry_ids.len(), 10);
    assert_eq!(events[0].class_group_ids, vec![CLASS_1A, CLASS_1B]);
}

#[test]
fn test_generate_avoids_manual_entries() {
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();

    // 张老师周一上午被人工占满
    for (start, end) in [(t(8, 0), t(8, 45)), (t(9, 0), t(9, 45)), (t(10, 0), t(10, 45))] {
        api.create_entry(new_entry(CLASS_2A, TEACHER_ZHANG, PHYSICS, SchoolDay::Monday, start, end))
            .unwrap();
    }

    let outcome = api
        .generate(request(vec![CLASS_1A], vec![mapping(TEACHER_ZHANG, MATH, vec![CLASS_1A])]))
        .unwrap();
    assert_eq!(outcome.placed.len(), 4);
    assert!(outcome
        .placed
        .iter()
        .all(|e| !(e.day_of_week == SchoolDay::Monday && e.start_time < t(11, 0))));

    let stored: Vec<_> = api.all_entries().unwrap().into_iter().map(|v| v.entry).collect();
    assert_eq!(stored.len(), 7);
    assert_no_overlaps(&stored);
}

#[test]
fn test_generate_is_deterministic_across_databases() {
    let run = || {
        let (_tmp, db_path) = create_seeded_db().unwrap();
        let api = TimetableApi::open(&db_path).unwrap();
        let outcome = api.generate(standard_request()).unwrap();
        serde_json::to_string(&outcome).unwrap()
    };
    assert_eq!(run(), run());
}

#[test]
fn test_generate_reports_unqualified_shortfall() {
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();

    let outcome = api
        .generate(request(vec![CLASS_1A], vec![mapping(TEACHER_LI, PHYSICS, vec![CLASS_1A])]))
        .unwrap();
    assert!(outcome.placed.is_empty());
    assert_eq!(outcome.shortfalls.len(), 1);
    assert_eq!(outcome.shortfalls[0].achieved, 0);
    assert_eq!(outcome.shortfalls[0].target, 2);
    assert_eq!(outcome.shortfalls[0].reason, ShortfallReason::UnqualifiedTeacher);
    assert!(api.all_entries().unwrap().is_empty());
}

#[test]
fn test_generate_request_window_overrides_config() {
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();

    // 每天只有一节 08:00-08:45
    let mut req = request(vec![CLASS_1A], vec![mapping(TEACHER_ZHANG, MATH, vec![CLASS_1A])]);
    req.day_end_time = Some(t(8, 45));

    let outcome = api.generate(req).unwrap();
    assert_eq!(outcome.placed.len(), 4);
    assert!(outcome.placed.iter().all(|e| e.start_time == t(8, 0) && e.lesson_number == 1));
    let days: Vec<SchoolDay> = outcome.placed.iter().map(|e| e.day_of_week).collect();
    assert_eq!(
        days,
        vec![SchoolDay::Monday, SchoolDay::Tuesday, SchoolDay::Wednesday, SchoolDay::Thursday]
    );
}

#[test]
fn test_generate_invalid_window_persists_nothing() {
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();

    let mut req = standard_request();
    req.lesson_duration_minutes = Some(0);

    let err = api.generate(req).unwrap_err();
    assert!(matches!(err, ApiError::Schedule(ScheduleError::Configuration { .. })));
    assert!(api.all_entries().unwrap().is_empty());
}

#[test]
fn test_generate_twice_with_same_window_is_additive() {
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();

    let first = api.generate(standard_request()).expect("第一次排课失败");
    let second = api.generate(standard_request()).expect("第二次排课失败");
    assert_eq!(first.placed.len(), 10);
    assert_eq!(second.placed.len(), 10, "现有条目只占用时段，不计入新一轮目标");

    let first_ids: BTreeSet<_> = first.placed.iter().map(|e| e.id.clone()).collect();
    assert!(second.placed.iter().all(|e| !first_ids.contains(&e.id)));

    let stored: Vec<_> = api.all_entries().unwrap().into_iter().map(|v| v.entry).collect();
    assert_eq!(stored.len(), 20);
    assert_no_overlaps(&stored);
}

#[test]
fn test_generate_twice_with_shifted_window_does_not_collide() {
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();
    let req = || request(vec![CLASS_1A], vec![mapping(TEACHER_ZHANG, MATH, vec![CLASS_1A])]);

    let first = api.generate(req()).expect("默认窗口排课失败");
    assert_eq!(first.placed.len(), 4);

    // 12:00 起的窗口中第一节与默认窗口第一节节次相同、时刻不同
    let mut shifted = req();
    shifted.day_start_time = Some(t(12, 0));
    let second = api.generate(shifted).expect("平移窗口排课失败");

    assert_eq!(second.placed.len(), 4);
    assert!(second.placed.iter().all(|e| e.start_time >= t(12, 0)));
    assert_eq!(second.placed[0].day_of_week, SchoolDay::Monday);
    assert_eq!(second.placed[0].lesson_number, 1);

    let stored: Vec<_> = api.all_entries().unwrap().into_iter().map(|v| v.entry).collect();
    assert_eq!(stored.len(), 8);
    assert_no_overlaps(&stored);
}

// ==========================================
// 写事务串行化
// ==========================================

#[test]
fn test_generate_waits_for_write_held_by_other_connection() {
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();

    // 另一连接持有写事务，期间占用张老师周一 08:00
    let other = Arc::new(Mutex::new(db::open_sqlite_connection(&db_path).unwrap()));
    other.lock().unwrap().execute_batch("BEGIN IMMEDIATE").unwrap();
    let held = ScheduleEntry {
        id: EntryId::from("held-by-other-connection"),
        class_group_id: CLASS_2A,
        teacher_id: TEACHER_ZHANG,
        subject_id: PHYSICS,
        day_of_week: SchoolDay::Monday,
        start_time: t(8, 0),
        end_time: t(8, 45),
        room: None,
        lesson_number: 1,
    };
    ScheduleEntryRepository::from_connection(other.clone())
        .insert(&held)
        .unwrap();

    let committer = {
        let other = other.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            other.lock().unwrap().execute_batch("COMMIT").unwrap();
        })
    };

    let outcome = api
        .generate(request(vec![CLASS_1A], vec![mapping(TEACHER_ZHANG, MATH, vec![CLASS_1A])]))
        .expect("等待写锁后应排课成功");
    committer.join().unwrap();

    assert_eq!(outcome.placed.len(), 4);
    assert!(outcome
        .placed
        .iter()
        .all(|e| !(e.day_of_week == SchoolDay::Monday && e.start_time == t(8, 0))));

    let stored: Vec<_> = api.all_entries().unwrap().into_iter().map(|v| v.entry).collect();
    assert_eq!(stored.len(), 5);
    assert_no_overlaps(&stored);
}

#[test]
fn test_write_fails_when_other_connection_never_releases() {
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();

    let other = db::open_sqlite_connection(&db_path).unwrap();
    other.execute_batch("BEGIN IMMEDIATE").unwrap();

    // 超过 busy_timeout 仍拿不到写锁
    let err = api
        .create_entry(new_entry(CLASS_1A, TEACHER_ZHANG, MATH, SchoolDay::Monday, t(8, 0), t(8, 45)))
        .unwrap_err();
    assert!(matches!(err, ApiError::DatabaseTransactionError(_)), "got {:?}", err);

    other.execute_batch("ROLLBACK").unwrap();
    api.create_entry(new_entry(CLASS_1A, TEACHER_ZHANG, MATH, SchoolDay::Monday, t(8, 0), t(8, 45)))
        .expect("写锁释放后应可录入");
    assert_eq!(api.all_entries().unwrap().len(), 1);
}

#[test]
fn test_concurrent_generate_from_separate_connections() {
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let apis = vec![
        TimetableApi::open(&db_path).unwrap(),
        TimetableApi::open(&db_path).unwrap(),
    ];

    let handles: Vec<_> = apis
        .into_iter()
        .map(|api| thread::spawn(move || api.generate(standard_request())))
        .collect();
    let mut total = 0;
    for handle in handles {
        let outcome = handle.join().unwrap().expect("并发排课失败");
        assert_eq!(outcome.placed.len(), 10);
        total += outcome.placed.len();
    }

    let api = TimetableApi::open(&db_path).unwrap();
    let stored: Vec<_> = api.all_entries().unwrap().into_iter().map(|v| v.entry).collect();
    assert_eq!(stored.len(), total);
    assert_no_overlaps(&stored);

    // 事务结束后连接仍可写
    api.create_entry(new_entry(CLASS_2A, TEACHER_WANG, MATH, SchoolDay::Friday, t(14, 0), t(14, 45)))
        .expect("排课后应可继续录入");
}

// ==========================================
// 删除
// ==========================================

#[test]
fn test_delete_entry_then_not_found() {
    let (_tmp, db_path) = create_seeded_db().unwrap();
    let recorder = Arc::new(RecordingPublisher::default());
    let api = TimetableApi::open(&db_path)
        .unwrap()
        .with_event_publisher(recorder.clone());

    let entry = api
        .create_entry(new_entry(CLASS_1A, TEACHER_ZHANG, MATH, SchoolDay::Monday, t(8, 0), t(8, 45)))
        .unwrap();

    let deleted = api.delete_entry(&entry.id).unwrap();
    assert_eq!(deleted, entry);
    assert!(api.all_entries().unwrap().is_empty());

    assert!(matches!(api.delete_entry(&entry.id), Err(ApiError::NotFound(_))));
    assert!(matches!(
        api.delete_entry(&EntryId::from("no-such-entry")),
        Err(ApiError::NotFound(_))
    ));

    let events = recorder.events.lock().unwrap();
    let kinds: Vec<_> = events.iter().map(|e| e.event_type).collect();
    assert_eq!(kinds, vec![TimetableEventType::EntryCreated, TimetableEventType::EntryDeleted]);

    // 删除后该时段可再次录入
    drop(events);
    api.create_entry(new_entry(CLASS_1B, TEACHER_ZHANG, MATH, SchoolDay::Monday, t(8, 0), t(8, 45)))
        .expect("删除后应可复用时段");
}

// ==========================================
// 作息网格
// ==========================================

#[test]
fn test_time_grid_defaults_and_override() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();

    let grid = api.time_grid(None).unwrap();
    assert_eq!(grid.len(), 7);
    assert_eq!(grid[6].start_time, t(14, 0));
    assert_eq!(grid[6].end_time, t(14, 45));

    let grid = api
        .time_grid(Some(TimeWindow::new(t(8, 0), t(9, 30), 45, 0)))
        .unwrap();
    let ranges: Vec<_> = grid.iter().map(|s| (s.start_time, s.end_time)).collect();
    assert_eq!(ranges, vec![(t(8, 0), t(8, 45)), (t(8, 45), t(9, 30))]);
}

#[test]
fn test_set_time_window_rejects_empty_grid() {
    let (_tmp, db_path) = create_test_db().unwrap();
    let api = TimetableApi::open(&db_path).unwrap();

    let err = api
        .set_time_window(&TimeWindow::new(t(8, 0), t(8, 30), 45, 15))
        .unwrap_err();
    assert!(matches!(err, ApiError::Schedule(ScheduleError::Configuration { .. })));
    assert_eq!(api.time_window().unwrap(), TimeWindow::default());
}
