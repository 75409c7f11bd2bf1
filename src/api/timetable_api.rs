// ==========================================
// 学校课表排课系统 - 课表 API（仓储门面）
// ==========================================
// 职责: 周课表查询、人工录入、自动排课、删除、作息网格
// 红线: 写操作串行化（快照读取 + 校验 + 落库在同一个 BEGIN IMMEDIATE 事务内完成）
// ==========================================

use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;
use tracing::{info, instrument, warn};

use crate::api::error::{ApiError, ApiResult};
use crate::config::ConfigManager;
use crate::domain::generation::{GenerateRequest, TimeWindow};
use crate::domain::schedule::{EntryScope, NewScheduleEntry, ScheduleEntry, ScheduleEntryView};
use crate::domain::snapshot::DomainSnapshot;
use crate::domain::types::{ClassGroupId, EntryId, TeacherId};
use crate::engine::{
    build_time_grid, validate_and_prepare, AssignmentEngine, GenerationOutcome,
    OptionalEventPublisher, Slot, TimetableEvent, TimetableEventPublisher, TimetableEventType,
};
use crate::repository::{RosterRepository, ScheduleEntryRepository};

// ==========================================
// TimetableApi - 课表 API
// ==========================================

/// 课表API
///
/// 职责：
/// 1. 周课表查询（按班级、按教师、全部）
/// 2. 人工录入条目（校验后落库）
/// 3. 自动排课（快照读取与整批落库在同一写事务内）
/// 4. 删除条目
/// 5. 变更事件发布
pub struct TimetableApi {
    conn: Arc<Mutex<Connection>>,
    roster_repo: Arc<RosterRepository>,
    schedule_repo: Arc<ScheduleEntryRepository>,
    config_manager: Arc<ConfigManager>,
    engine: AssignmentEngine,
    event_publisher: OptionalEventPublisher,
    write_lock: Mutex<()>,
}

impl TimetableApi {
    /// 打开数据库（幂等建表），各仓储共享同一连接
    pub fn open(db_path: &str) -> ApiResult<Self> {
        let conn = crate::db::open_sqlite_connection(db_path)
            .map_err(|e| ApiError::DatabaseConnectionError(e.to_string()))?;
        crate::db::init_schema(&conn).map_err(|e| ApiError::DatabaseError(e.to_string()))?;
        Self::from_connection(Arc::new(Mutex::new(conn)))
    }

    /// 从已有连接创建（连接需已建表）
    pub fn from_connection(conn: Arc<Mutex<Connection>>) -> ApiResult<Self> {
        let config_manager = ConfigManager::from_connection(conn.clone())
            .map_err(|e| ApiError::ConfigError(e.to_string()))?;
        Ok(Self {
            roster_repo: Arc::new(RosterRepository::from_connection(conn.clone())),
            schedule_repo: Arc::new(ScheduleEntryRepository::from_connection(conn.clone())),
            config_manager: Arc::new(config_manager),
            conn,
            engine: AssignmentEngine::new(),
            event_publisher: OptionalEventPublisher::none(),
            write_lock: Mutex::new(()),
        })
    }

    /// 挂接变更事件发布者
    pub fn with_event_publisher(mut self, publisher: Arc<dyn TimetableEventPublisher>) -> Self {
        self.event_publisher = OptionalEventPublisher::with_publisher(publisher);
        self
    }

    fn lock_writes(&self) -> ApiResult<MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|e| ApiError::InternalError(format!("写锁获取失败: {}", e)))
    }

    /// 在写事务内执行操作
    ///
    /// 同一进程内由写锁串行化；不同进程（各自打开的连接）由
    /// `BEGIN IMMEDIATE` 取得的 RESERVED 锁串行化，等待上限为 busy_timeout。
    /// 操作返回错误时整体回滚。
    fn write_transaction<T>(&self, op: impl FnOnce() -> ApiResult<T>) -> ApiResult<T> {
        let _guard = self.lock_writes()?;

        self.execute_control("BEGIN IMMEDIATE")?;
        let result = op().and_then(|value| {
            self.execute_control("COMMIT")?;
            Ok(value)
        });

        if result.is_err() {
            if let Err(e) = self.execute_control("ROLLBACK") {
                warn!(error = %e, "写事务回滚失败");
            }
        }
        result
    }

    /// 事务控制语句（BEGIN / COMMIT / ROLLBACK）
    fn execute_control(&self, sql: &str) -> ApiResult<()> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| ApiError::DatabaseConnectionError(format!("数据库锁获取失败: {}", e)))?;
        conn.execute_batch(sql)
            .map_err(|e| ApiError::DatabaseTransactionError(format!("{}: {}", sql, e)))
    }

    // ==========================================
    // 快照 / 配置
    // ==========================================

    /// 读取花名册与现有条目，构造排课快照
    pub fn load_snapshot(&self) -> ApiResult<DomainSnapshot> {
        Ok(DomainSnapshot::new(
            self.roster_repo.list_class_groups()?,
            self.roster_repo.list_teachers_with_qualifications()?,
            self.roster_repo.list_subjects()?,
            self.schedule_repo.list_all()?,
        ))
    }

    /// 当前生效的作息窗口
    pub fn time_window(&self) -> ApiResult<TimeWindow> {
        self.config_manager
            .get_time_window()
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    /// 覆写作息窗口（排不下任何一节课的窗口拒绝写入）
    pub fn set_time_window(&self, window: &TimeWindow) -> ApiResult<()> {
        build_time_grid(window)?;
        self.config_manager
            .set_time_window(window)
            .map_err(|e| ApiError::ConfigError(e.to_string()))
    }

    /// 作息网格（未给出窗口时使用配置）
    pub fn time_grid(&self, window: Option<TimeWindow>) -> ApiResult<Vec<Slot>> {
        let window = match window {
            Some(w) => w,
            None => self.time_window()?,
        };
        Ok(build_time_grid(&window)?)
    }

    // ==========================================
    // 查询
    // ==========================================

    /// 按范围查询（教学日 → 开始时间排序）
    pub fn entries(&self, scope: EntryScope) -> ApiResult<Vec<ScheduleEntryView>> {
        Ok(self.schedule_repo.list_views(scope)?)
    }

    /// 班级周课表
    pub fn weekly_for_class_group(&self, class_group_id: ClassGroupId) -> ApiResult<Vec<ScheduleEntryView>> {
        self.entries(EntryScope::ClassGroup(class_group_id))
    }

    /// 教师周课表
    pub fn weekly_for_teacher(&self, teacher_id: TeacherId) -> ApiResult<Vec<ScheduleEntryView>> {
        self.entries(EntryScope::Teacher(teacher_id))
    }

    /// 全校周课表
    pub fn all_entries(&self) -> ApiResult<Vec<ScheduleEntryView>> {
        self.entries(EntryScope::All)
    }

    // ==========================================
    // 写操作
    // ==========================================

    /// 人工录入条目
    ///
    /// # 返回
    /// - Ok(ScheduleEntry): 已落库条目（含标识与节次）
    /// - Err(ApiError::Schedule): 资质 / 作息窗口 / 冲突 / 引用缺失
    #[instrument(skip(self, candidate), fields(
        class_group_id = candidate.class_group_id,
        teacher_id = candidate.teacher_id,
        day = %candidate.day_of_week
    ))]
    pub fn create_entry(&self, candidate: NewScheduleEntry) -> ApiResult<ScheduleEntry> {
        let entry = self.write_transaction(|| {
            let snapshot = self.load_snapshot()?;
            let window = self.time_window()?;
            let entry = validate_and_prepare(candidate, &snapshot, &window)?;
            self.schedule_repo.insert(&entry)?;
            Ok(entry)
        })?;

        info!(entry_id = %entry.id, lesson_number = entry.lesson_number, "人工录入条目已保存");
        self.publish(TimetableEvent::from_entries(
            TimetableEventType::EntryCreated,
            std::iter::once(&entry),
        ));
        Ok(entry)
    }

    /// 自动排课
    ///
    /// 请求未给出的作息字段取配置值；快照读取与新增条目落库在同一写事务内
    #[instrument(skip(self, request), fields(
        class_groups = request.class_group_ids.len(),
        mappings = request.teacher_subject_mappings.len()
    ))]
    pub fn generate(&self, request: GenerateRequest) -> ApiResult<GenerationOutcome> {
        let (outcome, saved) = self.write_transaction(|| {
            let snapshot = self.load_snapshot()?;
            let window = request.resolve_window(self.time_window()?);
            let outcome = self.engine.generate(
                &snapshot,
                &request.class_group_ids,
                &request.teacher_subject_mappings,
                &window,
            )?;
            let saved = self.schedule_repo.insert_batch(&outcome.placed)?;
            Ok((outcome, saved))
        })?;

        let placed = saved.to_string();
        let shortfalls = outcome.shortfalls.len().to_string();
        info!(
            "{}",
            crate::i18n::t_with_args(
                "generate.summary",
                &[("placed", placed.as_str()), ("shortfalls", shortfalls.as_str())],
            )
        );
        for shortfall in &outcome.shortfalls {
            info!("{}", shortfall.describe());
        }

        if !outcome.placed.is_empty() {
            self.publish(TimetableEvent::from_entries(
                TimetableEventType::EntriesGenerated,
                &outcome.placed,
            ));
        }
        Ok(outcome)
    }

    /// 删除条目
    ///
    /// # 返回
    /// - Ok(ScheduleEntry): 被删除的条目
    /// - Err(ApiError::NotFound): 条目不存在
    #[instrument(skip(self, entry_id), fields(entry_id = %entry_id))]
    pub fn delete_entry(&self, entry_id: &EntryId) -> ApiResult<ScheduleEntry> {
        if entry_id.as_str().trim().is_empty() {
            return Err(ApiError::InvalidInput("条目ID不能为空".to_string()));
        }

        let entry = self.write_transaction(|| {
            let entry = self
                .schedule_repo
                .find_by_id(entry_id)?
                .ok_or_else(|| ApiError::NotFound(format!("ScheduleEntry(id={})不存在", entry_id)))?;
            self.schedule_repo.delete(entry_id)?;
            Ok(entry)
        })?;

        info!("条目已删除");
        self.publish(TimetableEvent::from_entries(
            TimetableEventType::EntryDeleted,
            std::iter::once(&entry),
        ));
        Ok(entry)
    }

    /// 发布事件；发布失败只记录，不回滚已提交的写入
    fn publish(&self, event: TimetableEvent) {
        let event_type = event.event_type;
        if let Err(e) = self.event_publisher.publish(event) {
            warn!(event_type = event_type.as_str(), error = %e, "课表变更事件发布失败");
        }
    }
}
