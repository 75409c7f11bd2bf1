// ==========================================
// 学校课表排课系统 - 自动排课引擎
// ==========================================
// 职责: 按优先级贪心填充每周课表
// 输入: 领域快照 + 班级范围 + 教师-科目映射 + 作息窗口
// 输出: 新增条目 + 未达标清单
// ==========================================
// 规则:
// 1) 工作项 = 映射 × 班级，按 周课时降序 → 教师升序 → 班级升序 排序
// 2) 周一..周五、第 1 节..第 N 节 顺序寻找首个教师与班级均空闲的节次
// 3) 每个候选条目都经过 EntryValidator
// 4) 达不到周课时目标只记入未达标清单，不报错
// 5) 无随机性，相同输入得到相同输出
// ==========================================

use crate::domain::generation::{TeacherSubjectMapping, TimeWindow};
use crate::domain::schedule::ScheduleEntry;
use crate::domain::snapshot::DomainSnapshot;
use crate::domain::types::{ClassGroupId, EntryId, SchoolDay, SubjectId, TeacherId};
use crate::engine::error::{ScheduleError, ScheduleResult};
use crate::engine::time_grid::Slot;
use crate::engine::validator::EntryValidator;
use crate::i18n::t_with_args;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use tracing::{debug, info, instrument};

// ==========================================
// 工作项与结果
// ==========================================

/// 排课工作项（教师, 科目, 班级）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkItem {
    pub teacher_id: TeacherId,
    pub subject_id: SubjectId,
    pub class_group_id: ClassGroupId,
    pub target: u32, // 科目周课时目标
}

/// 未达标原因
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ShortfallReason {
    /// 整周找不到更多空闲节次
    NoFreeSlot,
    /// 教师不具备该科目资质
    UnqualifiedTeacher,
    /// 映射引用了快照中不存在的记录
    UnknownReference { entity: String, id: i64 },
}

/// 未达标记录
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Shortfall {
    pub teacher_id: TeacherId,
    pub subject_id: SubjectId,
    pub class_group_id: ClassGroupId,
    pub achieved: u32,
    pub target: u32,
    pub reason: ShortfallReason,
}

impl Shortfall {
    /// 缺口节数
    pub fn missing(&self) -> u32 {
        self.target.saturating_sub(self.achieved)
    }

    /// 面向用户的说明（按当前语言）
    pub fn describe(&self) -> String {
        let teacher = self.teacher_id.to_string();
        let subject = self.subject_id.to_string();
        let class_group = self.class_group_id.to_string();
        let achieved = self.achieved.to_string();
        let target = self.target.to_string();
        let mut args = vec![
            ("teacher", teacher.as_str()),
            ("subject", subject.as_str()),
            ("class_group", class_group.as_str()),
            ("achieved", achieved.as_str()),
            ("target", target.as_str()),
        ];
        let key = match &self.reason {
            ShortfallReason::NoFreeSlot => "shortfall.no_free_slot",
            ShortfallReason::UnqualifiedTeacher => "shortfall.unqualified_teacher",
            ShortfallReason::UnknownReference { entity, .. } => {
                args.push(("entity", entity.as_str()));
                "shortfall.unknown_reference"
            }
        };
        t_with_args(key, &args)
    }
}

/// 自动排课结果
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationOutcome {
    pub placed: Vec<ScheduleEntry>,
    pub shortfalls: Vec<Shortfall>,
}

impl GenerationOutcome {
    /// 是否全部达标
    pub fn is_fully_satisfied(&self) -> bool {
        self.shortfalls.is_empty()
    }

    /// 某工作项实际排入节数
    pub fn placed_for(&self, teacher_id: TeacherId, subject_id: SubjectId, class_group_id: ClassGroupId) -> usize {
        self.placed
            .iter()
            .filter(|e| {
                e.teacher_id == teacher_id
                    && e.subject_id == subject_id
                    && e.class_group_id == class_group_id
            })
            .count()
    }
}

// ==========================================
// AssignmentEngine - 自动排课引擎
// ==========================================
pub struct AssignmentEngine {
    // 无状态引擎，不需要注入依赖
}

impl Default for AssignmentEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl AssignmentEngine {
    pub fn new() -> Self {
        Self {}
    }

    /// 展开并排序工作项
    ///
    /// 不在 class_group_ids 范围内的班级被跳过；
    /// 快照中不存在的科目目标记为 0
    pub fn build_work_list(
        &self,
        snapshot: &DomainSnapshot,
        class_group_ids: &[ClassGroupId],
        mappings: &[TeacherSubjectMapping],
    ) -> Vec<WorkItem> {
        let in_scope: BTreeSet<ClassGroupId> = class_group_ids.iter().copied().collect();

        let mut work = Vec::new();
        for mapping in mappings {
            let target = snapshot
                .subject(mapping.subject_id)
                .map(|s| s.hours_per_week)
                .unwrap_or(0);
            for &class_group_id in &mapping.class_group_ids {
                if !in_scope.contains(&class_group_id) {
                    debug!(
                        teacher_id = mapping.teacher_id,
                        subject_id = mapping.subject_id,
                        class_group_id,
                        "班级不在本次排课范围内，跳过"
                    );
                    continue;
                }
                work.push(WorkItem {
                    teacher_id: mapping.teacher_id,
                    subject_id: mapping.subject_id,
                    class_group_id,
                    target,
                });
            }
        }

        // 稳定排序: 周课时降序 → 教师升序 → 班级升序
        work.sort_by(|a, b| {
            b.target
                .cmp(&a.target)
                .then(a.teacher_id.cmp(&b.teacher_id))
                .then(a.class_group_id.cmp(&b.class_group_id))
        });
        work
    }

    /// 自动排课
    ///
    /// # 参数
    /// - `snapshot`: 领域快照，其中条目即现有课表（不会被修改）
    /// - `class_group_ids`: 本次排课的班级范围
    /// - `mappings`: 教师-科目-班级映射
    /// - `window`: 作息窗口
    ///
    /// # 返回
    /// 新增条目（均已通过校验）与未达标清单
    ///
    /// # 错误
    /// 仅在作息窗口无效时返回 Configuration
    #[instrument(skip(self, snapshot, class_group_ids, mappings), fields(
        class_groups = class_group_ids.len(),
        mappings = mappings.len(),
        existing = snapshot.entries().len()
    ))]
    pub fn generate(
        &self,
        snapshot: &DomainSnapshot,
        class_group_ids: &[ClassGroupId],
        mappings: &[TeacherSubjectMapping],
        window: &TimeWindow,
    ) -> ScheduleResult<GenerationOutcome> {
        // 1. 时间网格 + 以现有条目为底的冲突索引
        let mut validator = EntryValidator::new(snapshot, window)?;
        let slots: Vec<Slot> = validator.grid().slots().to_vec();

        // 2-3. 工作项
        let work = self.build_work_list(snapshot, class_group_ids, mappings);

        let mut outcome = GenerationOutcome::default();
        for item in &work {
            if snapshot.subject(item.subject_id).is_none() {
                outcome.shortfalls.push(Shortfall {
                    teacher_id: item.teacher_id,
                    subject_id: item.subject_id,
                    class_group_id: item.class_group_id,
                    achieved: 0,
                    target: 0,
                    reason: ShortfallReason::UnknownReference {
                        entity: "subject".to_string(),
                        id: item.subject_id,
                    },
                });
                continue;
            }

            // 4. 逐项填充
            let (placed, stop_reason) = self.fill_work_item(&mut validator, item, &slots);
            let achieved = placed.len() as u32;
            outcome.placed.extend(placed);

            // 5. 未达标只记录
            if achieved < item.target {
                debug!(
                    teacher_id = item.teacher_id,
                    subject_id = item.subject_id,
                    class_group_id = item.class_group_id,
                    achieved,
                    target = item.target,
                    "工作项未达到周课时目标"
                );
                outcome.shortfalls.push(Shortfall {
                    teacher_id: item.teacher_id,
                    subject_id: item.subject_id,
                    class_group_id: item.class_group_id,
                    achieved,
                    target: item.target,
                    reason: stop_reason,
                });
            }
        }

        info!(
            work_items = work.len(),
            placed = outcome.placed.len(),
            shortfalls = outcome.shortfalls.len(),
            "自动排课完成"
        );
        Ok(outcome)
    }

    /// 填充单个工作项
    ///
    /// # 返回
    /// (排入的条目, 未达标时的原因)
    fn fill_work_item(
        &self,
        validator: &mut EntryValidator<'_>,
        item: &WorkItem,
        slots: &[Slot],
    ) -> (Vec<ScheduleEntry>, ShortfallReason) {
        let mut placed = Vec::new();
        if item.target == 0 {
            return (placed, ShortfallReason::NoFreeSlot);
        }

        for day in SchoolDay::ALL {
            for slot in slots {
                let index = validator.index();
                if !index.is_teacher_free(item.teacher_id, day, slot)
                    || !index.is_class_group_free(item.class_group_id, day, slot)
                {
                    continue;
                }

                let candidate = build_candidate(item, day, slot);
                match validator.validate(candidate) {
                    Ok(entry) => {
                        placed.push(entry);
                        if placed.len() as u32 >= item.target {
                            return (placed, ShortfallReason::NoFreeSlot);
                        }
                    }
                    Err(e) if e.is_conflict() => continue,
                    // 与时段无关的拒绝，换节次也不会通过
                    Err(e) => return (placed, stop_reason_for(&e)),
                }
            }
        }
        (placed, ShortfallReason::NoFreeSlot)
    }
}

/// 构造候选条目（确定性标识）
///
/// 标识取自起止时刻而非节次：节次随作息窗口变化，起止时刻不会
fn build_candidate(item: &WorkItem, day: SchoolDay, slot: &Slot) -> ScheduleEntry {
    let name = format!(
        "timetable-entry|class_group={}|day={}|start={}|end={}|teacher={}|subject={}",
        item.class_group_id,
        day,
        slot.start_time.format("%H:%M:%S"),
        slot.end_time.format("%H:%M:%S"),
        item.teacher_id,
        item.subject_id
    );
    ScheduleEntry {
        id: EntryId::derived(&name),
        class_group_id: item.class_group_id,
        teacher_id: item.teacher_id,
        subject_id: item.subject_id,
        day_of_week: day,
        start_time: slot.start_time,
        end_time: slot.end_time,
        room: None,
        lesson_number: slot.lesson_number,
    }
}

fn stop_reason_for(err: &ScheduleError) -> ShortfallReason {
    match err {
        ScheduleError::UnqualifiedTeacher { .. } => ShortfallReason::UnqualifiedTeacher,
        ScheduleError::UnknownReference { entity, id } => ShortfallReason::UnknownReference {
            entity: entity.to_string(),
            id: *id,
        },
        _ => ShortfallReason::NoFreeSlot,
    }
}
