// ==========================================
// 排课核心性质测试（纯内存，无数据库）
// ==========================================
// 测试范围:
// 1. 全校规模自动排课后两两无冲突
// 2. 排入条目均在作息窗口内且教师具备资质
// 3. 排入 + 缺口 = 目标
// 4. 现有条目越多，同一工作项排入越少（不增）
// 5. 人工校验与自动排课共享同一套规则
// ==========================================


use school_timetable::domain::{
    ClassGroup, DomainSnapshot, ScheduleEntry, Subject, Teacher, TeacherSubjectMapping, TimeWindow,
};
use school_timetable::engine::{build_time_grid, validate_and_prepare, AssignmentEngine, ScheduleError};
use school_timetable::{EntryId, SchoolDay};
use test_helpers::{assert_no_overlaps, new_entry, t};

// ==========================================
// 测试数据构建
// ==========================================

/// 8 个班级、6 位教师、4 门科目
fn school() -> (DomainSnapshot, Vec<i64>, Vec<TeacherSubjectMapping>) {
    let class_groups: Vec<ClassGroup> = (1..=8)
        .map(|id| ClassGroup {
            id,
            name: format!("C{}", id),
            grade: Some(((id - 1) / 4 + 1) as i32),
        })
        .collect();

    let subjects = vec![
        Subject { id: 10, name: "MATH".to_string(), hours_per_week: 5 },
        Subject { id: 20, name: "LANG".to_string(), hours_per_week: 5 },
        Subject { id: 30, name: "SCIENCE".to_string(), hours_per_week: 3 },
        Subject { id: 40, name: "PE".to_string(), hours_per_week: 2 },
    ];

    let teacher = |id: i64, subjects: &[i64]| Teacher {
        id,
        name: format!("T{}", id),
        subject_ids: subjects.iter().copied().collect(),
    };
    let teachers = vec![
        teacher(1, &[10]),
        teacher(2, &[10, 30]),
        teacher(3, &[20]),
        teacher(4, &[20]),
        teacher(5, &[30]),
        teacher(6, &[40]),
    ];

    let mappings = vec![
        TeacherSubjectMapping { teacher_id: 1, subject_id: 10, class_group_ids: vec![1, 2, 3, 4] },
        TeacherSubjectMapping { teacher_id: 2, subject_id: 10, class_group_ids: vec![5, 6, 7, 8] },
        TeacherSubjectMapping { teacher_id: 3, subject_id: 20, class_group_ids: vec![1, 2, 3, 4] },
        TeacherSubjectMapping { teacher_id: 4, subject_id: 20, class_group_ids: vec![5, 6, 7, 8] },
        TeacherSubjectMapping { teacher_id: 5, subject_id: 30, class_group_ids: vec![1, 2, 3, 4, 5, 6, 7, 8] },
        TeacherSubjectMapping { teacher_id: 6, subject_id: 40, class_group_ids: vec![1, 2, 3, 4, 5, 6, 7, 8] },
    ];

    let snapshot = DomainSnapshot::new(class_groups, teachers, subjects, Vec::new());
    (snapshot, (1..=8).collect(), mappings)
}

// ==========================================
// 全校规模
// ==========================================

#[test]
fn test_school_wide_generation_has_no_overlaps() {
    println!("\n=== 测试：全校规模自动排课 ===");
    let (snapshot, class_group_ids, mappings) = school();
    let window = TimeWindow::default();

    let outcome = AssignmentEngine::new()
        .generate(&snapshot, &class_group_ids, &mappings, &window)
        .unwrap();
    println!("排入 {} 节，缺口 {} 项", outcome.placed.len(), outcome.shortfalls.len());

    assert_no_overlaps(&outcome.placed);

    for entry in &outcome.placed {
        assert!(window.contains(entry.start_time, entry.end_time));
        let teacher = snapshot.teacher(entry.teacher_id).unwrap();
        assert!(teacher.is_qualified_for(entry.subject_id));
    }

    // 排入 + 缺口 = 目标
    let work = AssignmentEngine::new().build_work_list(&snapshot, &class_group_ids, &mappings);
    for item in &work {
        let placed = outcome.placed_for(item.teacher_id, item.subject_id, item.class_group_id) as u32;
        let missing = outcome
            .shortfalls
            .iter()
            .find(|s| {
                s.teacher_id == item.teacher_id
                    && s.subject_id == item.subject_id
                    && s.class_group_id == item.class_group_id
            })
            .map(|s| s.missing())
            .unwrap_or(0);
        assert_eq!(placed + missing, item.target, "工作项 {:?}", item);
    }

    // 科学老师 8 个班 × 3 节 = 24 节，容量 35，应当全部排入
    assert_eq!(
        outcome.placed.iter().filter(|e| e.teacher_id == 5).count(),
        24
    );
}

#[test]
fn test_generation_respects_tight_window() {
    println!("\n=== 测试：紧凑作息窗口（每天 3 节）===");
    let (snapshot, class_group_ids, mappings) = school();
    let window = TimeWindow::new(t(8, 0), t(10, 15), 45, 0);
    assert_eq!(build_time_grid(&window).unwrap().len(), 3);

    let outcome = AssignmentEngine::new()
        .generate(&snapshot, &class_group_ids, &mappings, &window)
        .unwrap();

    assert_no_overlaps(&outcome.placed);
    // 每个班每周最多 15 节
    for class_group_id in class_group_ids {
        let count = outcome
            .placed
            .iter()
            .filter(|e| e.class_group_id == class_group_id)
            .count();
        assert!(count <= 15, "班级 {} 排入 {} 节", class_group_id, count);
    }
    assert!(!outcome.is_fully_satisfied());
}

// ==========================================
// 单调性
// ==========================================

#[test]
fn test_more_existing_entries_never_increase_placements() {
    println!("\n=== 测试：现有条目单调性 ===");
    let (base, _, _) = school();
    let window = TimeWindow::default();
    let grid = build_time_grid(&window).unwrap();
    let mapping = vec![TeacherSubjectMapping {
        teacher_id: 1,
        subject_id: 10,
        class_group_ids: vec![1],
    }];

    // 逐步用班级 2 的课占满教师 1 的时间
    let mut blockers: Vec<ScheduleEntry> = Vec::new();
    for day in SchoolDay::ALL {
        for slot in &grid {
            blockers.push(ScheduleEntry {
                id: EntryId::from(format!("block-{}-{}", day, slot.lesson_number)),
                class_group_id: 2,
                teacher_id: 1,
                subject_id: 10,
                day_of_week: day,
                start_time: slot.start_time,
                end_time: slot.end_time,
                room: None,
                lesson_number: slot.lesson_number,
            });
        }
    }

    let mut previous = u32::MAX;
    for k in 0..=blockers.len() {
        let snapshot = base.with_entries(blockers[..k].to_vec());
        let outcome = AssignmentEngine::new()
            .generate(&snapshot, &[1], &mapping, &window)
            .unwrap();
        let placed = outcome.placed_for(1, 10, 1) as u32;
        assert!(placed <= previous, "k={} 时排入 {} > {}", k, placed, previous);
        previous = placed;
    }
    assert_eq!(previous, 0);
}

// ==========================================
// 人工校验与自动排课一致
// ==========================================

#[test]
fn test_manual_validation_agrees_with_generated_schedule() {
    println!("\n=== 测试：人工录入与自动排课规则一致 ===");
    let (snapshot, class_group_ids, mappings) = school();
    let window = TimeWindow::default();

    let outcome = AssignmentEngine::new()
        .generate(&snapshot, &class_group_ids, &mappings, &window)
        .unwrap();
    let with_generated = snapshot.with_entries(outcome.placed.clone());

    // 与已排条目完全重合的人工录入必被拒绝
    let taken = &outcome.placed[0];
    let err = validate_and_prepare(
        new_entry(
            taken.class_group_id,
            taken.teacher_id,
            taken.subject_id,
            taken.day_of_week,
            taken.start_time,
            taken.end_time,
        ),
        &with_generated,
        &window,
    )
    .unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.blocking_entry_id(), Some(&taken.id));

    // 体育老师任何时段都不能教数学
    let err = validate_and_prepare(
        new_entry(1, 6, 10, SchoolDay::Friday, t(14, 0), t(14, 45)),
        &snapshot,
        &window,
    )
    .unwrap_err();
    assert_eq!(err, ScheduleError::UnqualifiedTeacher { teacher_id: 6, subject_id: 10 });
}
