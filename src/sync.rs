//! Binlog sync 루프
//!
//! 이벤트 소스에서 이벤트를 읽어 분류하고, 핸들러를 호출한 뒤 위치를 저장합니다.
//! 1. 이벤트 대기 (시간 초과 시 대기 시간을 두 배로 늘려 재시도)
//! 2. 이벤트 분류 (rotate / rows / xid / query)
//! 3. 위치 갱신 및 저장 (rotate, DDL은 즉시 저장)
//!
//! 재시작 지점은 트랜잭션 경계(XID, rotate, DDL)에서만 기록합니다. rows 이벤트는
//! 메모리 위치만 앞으로 옮기므로, 중간에 죽으면 트랜잭션 전체를 다시 받습니다.
//!
//! 소스 에러와 핸들러 에러는 모두 치명적이며 루프를 종료합니다.

use crate::ddl::{AlterTableDetector, TableFilter};
use crate::error::Result;
use crate::events::{EventPayload, RawEvent};
use crate::handler::{Dispatcher, EventBuilder};
use crate::position::{BinlogPosition, PositionHandle, PositionTracker};
use crate::schema::TableProvider;
use crate::source::{EventSource, EventStream};
use serde::Deserialize;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const MIN_WAIT_MS: u64 = 1;

/// sync 루프 설정
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// 이벤트 대기 시간 초기값 (ms)
    pub base_wait_ms: u64,
    /// 이벤트 대기 시간 상한 (ms)
    pub max_wait_ms: u64,
    /// forced가 아닌 위치 저장 최소 간격 (ms)
    pub save_interval_ms: u64,
    pub filter: TableFilter,
}

impl Default for SyncConfig {
    fn default() -> Self {
        SyncConfig {
            base_wait_ms: 1_000,
            max_wait_ms: 64_000,
            save_interval_ms: 1_000,
            filter: TableFilter::default(),
        }
    }
}

impl SyncConfig {
    /// JSON 파일에서 설정 읽기
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// 최소 1ms (0이면 시간 초과가 즉시 반복됨)
    pub fn base_wait(&self) -> Duration {
        Duration::from_millis(self.base_wait_ms.max(MIN_WAIT_MS))
    }

    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms).max(self.base_wait())
    }

    pub fn save_interval(&self) -> Duration {
        Duration::from_millis(self.save_interval_ms)
    }
}

/// 이벤트 대기 시간 (연속 시간 초과마다 두 배)
#[derive(Debug, Clone)]
pub struct Backoff {
    base: Duration,
    max: Duration,
    current: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        let base = base.max(Duration::from_millis(MIN_WAIT_MS));
        Backoff {
            base,
            max: max.max(base),
            current: base,
        }
    }

    pub fn current(&self) -> Duration {
        self.current
    }

    pub fn on_timeout(&mut self) {
        self.current = self.current.saturating_mul(2).min(self.max);
    }

    pub fn reset(&mut self) {
        self.current = self.base;
    }
}

/// 이벤트 하나를 처리한 결과
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    /// 위치 변경 없음
    Skip,
    /// 트랜잭션 중간: 메모리 위치만 갱신
    Advance { position: BinlogPosition },
    /// 재시작 가능한 경계
    Commit {
        position: BinlogPosition,
        forced: bool,
    },
}

/// Binlog sync 루프
pub struct BinlogSyncer<S, T> {
    source: S,
    builder: EventBuilder<T>,
    dispatcher: Dispatcher,
    tracker: PositionTracker,
    detector: AlterTableDetector,
    filter: TableFilter,
    backoff: Backoff,
    server_flag: i64,
}

impl<S, T> BinlogSyncer<S, T>
where
    S: EventSource,
    T: TableProvider,
{
    pub fn new(
        config: SyncConfig,
        source: S,
        tables: Arc<T>,
        dispatcher: Dispatcher,
        tracker: PositionTracker,
    ) -> Result<Self> {
        let server_flag = tracker.state().server_flag;
        Ok(BinlogSyncer {
            server_flag,
            source,
            builder: EventBuilder::new(tables),
            dispatcher,
            tracker,
            detector: AlterTableDetector::new()?,
            backoff: Backoff::new(config.base_wait(), config.max_wait()),
            filter: config.filter,
        })
    }

    /// 체크포인트에 함께 기록할 서버 ID
    pub fn with_server_id(mut self, server_id: u32) -> Self {
        self.server_flag = i64::from(server_id);
        self
    }

    /// 대기자용 위치 핸들
    pub fn position_handle(&self) -> PositionHandle {
        self.tracker.handle()
    }

    /// 마지막 체크포인트 위치에서 시작
    pub async fn start(&mut self) -> Result<()> {
        let start = self.tracker.current();
        self.run(start).await
    }

    /// 치명적 에러가 날 때까지 실행 (정상 종료 없음)
    pub async fn run(&mut self, start: BinlogPosition) -> Result<()> {
        info!("Start sync binlog at {}", start);

        let mut stream = self.source.start_sync(&start).await?;
        let mut position = start;

        loop {
            let event = match stream.next_event(self.backoff.current()).await {
                Ok(event) => event,
                Err(e) if e.is_timeout() => {
                    // 유휴 구간: 간격 때문에 미뤄진 commit 위치 저장
                    self.tracker.flush().await?;
                    self.backoff.on_timeout();
                    debug!("No binlog event, waiting up to {:?}", self.backoff.current());
                    continue;
                }
                Err(e) => {
                    error!("Binlog stream error at {}: {}", position, e);
                    return Err(e);
                }
            };
            self.backoff.reset();

            match self.handle_event(&position, event).await? {
                Step::Skip => continue,
                Step::Advance { position: next } => {
                    self.advance(next.clone())?;
                    // 이전 commit 위치가 간격 때문에 밀려 있으면 여기서 저장
                    self.tracker.persist(false).await?;
                    position = next;
                }
                Step::Commit {
                    position: next,
                    forced,
                } => {
                    self.advance(next.clone())?;
                    self.tracker.commit();
                    self.tracker.persist(forced).await?;
                    position = next;
                }
            }
        }
    }

    fn advance(&mut self, next: BinlogPosition) -> Result<()> {
        let extra = self.tracker.state().extra;
        if let Err(e) = self.tracker.update(next, extra, self.server_flag) {
            error!("Refusing to move position backwards: {}", e);
            return Err(e);
        }
        Ok(())
    }

    async fn handle_event(&self, position: &BinlogPosition, event: RawEvent) -> Result<Step> {
        let log_pos = event.header.log_pos;

        match event.payload {
            EventPayload::Rotate {
                next_binlog_name,
                position: next_pos,
            } => {
                let next = BinlogPosition::new(next_binlog_name, next_pos);
                debug!("Rotate binlog to {}", next);
                Ok(Step::Commit {
                    position: next,
                    forced: true,
                })
            }
            EventPayload::Rows(data) => {
                let rows_event = self
                    .builder
                    .build_rows(event.header.event_type, data)
                    .await?;
                if let Err(e) = self.dispatcher.dispatch_rows(&rows_event).await {
                    error!("Handle rows event error at {}: {}", position, e);
                    return Err(e);
                }
                Ok(Step::Advance {
                    position: position.with_position(log_pos),
                })
            }
            EventPayload::Xid { .. } => Ok(Step::Commit {
                position: position.with_position(log_pos),
                forced: false,
            }),
            EventPayload::Query { schema, query } => {
                self.handle_query(position.with_position(log_pos), &schema, &query)
                    .await
            }
            EventPayload::Other => Ok(Step::Skip),
        }
    }

    async fn handle_query(&self, position: BinlogPosition, schema: &str, query: &str) -> Result<Step> {
        let Some(target) = self.detector.detect(query, schema) else {
            return Ok(Step::Skip);
        };

        if self.filter.is_filtered(&target.table) {
            warn!(
                "Table structure changed, but ignored by filter: {}.{}",
                target.schema, target.table
            );
            return Ok(Step::Commit {
                position,
                forced: true,
            });
        }

        self.builder
            .tables()
            .invalidate(&target.schema, &target.table);

        let query_event = self
            .builder
            .build_alter(&target.schema, &target.table, query)
            .await?;
        if let Err(e) = self.dispatcher.dispatch_query(&query_event).await {
            error!("Handle query event error at {}: {}", position, e);
            return Err(e);
        }

        info!(
            "Table structure changed, cleared table cache: {}.{}",
            target.schema, target.table
        );
        Ok(Step::Commit {
            position,
            forced: true,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CdcError, HandlerError};
    use crate::events::{CellValue, EventType, QueryEvent, RowsEvent};
    use crate::handler::{QueryHandler, RowsHandler};
    use crate::position::{Checkpoint, MemoryStore, PositionStore};
    use crate::schema::{ColumnDef, TableMetadata};
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};

    struct ScriptedSource {
        events: Option<VecDeque<Result<RawEvent>>>,
        deadlines: Arc<Mutex<Vec<Duration>>>,
    }

    struct ScriptedStream {
        events: VecDeque<Result<RawEvent>>,
        deadlines: Arc<Mutex<Vec<Duration>>>,
    }

    #[async_trait]
    impl EventSource for ScriptedSource {
        type Stream = ScriptedStream;

        async fn start_sync(&mut self, _position: &BinlogPosition) -> Result<ScriptedStream> {
            Ok(ScriptedStream {
                events: self.events.take().unwrap_or_default(),
                deadlines: self.deadlines.clone(),
            })
        }
    }

    #[async_trait]
    impl EventStream for ScriptedStream {
        async fn next_event(&mut self, deadline: Duration) -> Result<RawEvent> {
            self.deadlines.lock().push(deadline);
            self.events
                .pop_front()
                .unwrap_or_else(|| Err(CdcError::SourceError("end of script".to_string())))
        }
    }

    /// 무효화 횟수를 컬럼 이름에 드러내는 테이블 목록
    #[derive(Default)]
    struct VersionedTables {
        versions: Mutex<HashMap<(String, String), usize>>,
        invalidations: Mutex<Vec<(String, String)>>,
    }

    #[async_trait]
    impl TableProvider for VersionedTables {
        async fn get_table(&self, schema: &str, table: &str) -> Result<Arc<TableMetadata>> {
            let version = self
                .versions
                .lock()
                .get(&(schema.to_string(), table.to_string()))
                .copied()
                .unwrap_or(0);
            Ok(Arc::new(TableMetadata::new(
                schema,
                table,
                vec![ColumnDef {
                    name: format!("v{}", version),
                    column_type: "int".to_string(),
                    nullable: false,
                    is_key: true,
                }],
            )))
        }

        fn invalidate(&self, schema: &str, table: &str) {
            let key = (schema.to_string(), table.to_string());
            *self.versions.lock().entry(key.clone()).or_insert(0) += 1;
            self.invalidations.lock().push(key);
        }
    }

    struct Recorder {
        calls: Arc<Mutex<Vec<String>>>,
        fail_rows: bool,
    }

    #[async_trait]
    impl RowsHandler for Recorder {
        async fn on_rows(&self, event: &RowsEvent) -> std::result::Result<(), HandlerError> {
            self.calls.lock().push(format!(
                "{}:{}:{}:{}",
                event.action.as_str(),
                event.table.name,
                event.table.column_names().join(","),
                event.rows.len()
            ));
            if self.fail_rows {
                return Err("sink rejected rows".into());
            }
            Ok(())
        }
    }

    #[async_trait]
    impl QueryHandler for Recorder {
        async fn on_query(&self, event: &QueryEvent) -> std::result::Result<(), HandlerError> {
            self.calls
                .lock()
                .push(format!("{}:{}", event.action.as_str(), event.table.name));
            Ok(())
        }
    }

    struct Outcome {
        err: CdcError,
        deadlines: Vec<Duration>,
        saves: Vec<(BinlogPosition, bool)>,
        calls: Vec<String>,
        invalidations: Vec<(String, String)>,
        position: BinlogPosition,
        checkpoint: Option<Checkpoint>,
    }

    async fn run_script(events: Vec<Result<RawEvent>>, filter: TableFilter, fail_rows: bool) -> Outcome {
        let config = SyncConfig {
            save_interval_ms: 0,
            filter,
            ..SyncConfig::default()
        };
        run_with(config, BinlogPosition::new("bin.000001", 4), events, fail_rows, None).await
    }

    async fn run_with(
        config: SyncConfig,
        start: BinlogPosition,
        events: Vec<Result<RawEvent>>,
        fail_rows: bool,
        server_id: Option<u32>,
    ) -> Outcome {
        let deadlines = Arc::new(Mutex::new(Vec::new()));
        let source = ScriptedSource {
            events: Some(events.into_iter().collect()),
            deadlines: deadlines.clone(),
        };
        let tables = Arc::new(VersionedTables::default());
        let store = Arc::new(MemoryStore::new());
        let calls = Arc::new(Mutex::new(Vec::new()));

        let recorder = Arc::new(Recorder {
            calls: calls.clone(),
            fail_rows,
        });
        let mut dispatcher = Dispatcher::new();
        dispatcher.add_rows_handler(recorder.clone());
        dispatcher.add_query_handler(recorder);

        let tracker = PositionTracker::new(start.clone(), store.clone(), config.save_interval());
        let mut syncer =
            BinlogSyncer::new(config, source, tables.clone(), dispatcher, tracker).unwrap();
        if let Some(id) = server_id {
            syncer = syncer.with_server_id(id);
        }
        let handle = syncer.position_handle();

        let err = syncer.run(start).await.unwrap_err();

        let deadlines = deadlines.lock().clone();
        let calls = calls.lock().clone();
        let invalidations = tables.invalidations.lock().clone();
        Outcome {
            err,
            deadlines,
            saves: store.history(),
            calls,
            invalidations,
            position: handle.current(),
            checkpoint: store.load().await.unwrap(),
        }
    }

    fn query_event(log_pos: u32, sql: &str) -> Result<RawEvent> {
        Ok(RawEvent::query(log_pos, "shop", sql))
    }

    #[test]
    fn test_backoff_doubles_caps_and_resets() {
        let mut backoff = Backoff::new(Duration::from_secs(1), Duration::from_secs(8));
        let mut seen = vec![backoff.current()];
        for _ in 0..5 {
            backoff.on_timeout();
            seen.push(backoff.current());
        }
        assert_eq!(
            seen,
            [1, 2, 4, 8, 8, 8].map(Duration::from_secs).to_vec()
        );

        backoff.reset();
        assert_eq!(backoff.current(), Duration::from_secs(1));
    }

    #[test]
    fn test_sync_config_from_json() {
        let config: SyncConfig = serde_json::from_str(
            r#"{"max_wait_ms": 30000, "filter": {"ignored": ["audit_log"]}}"#,
        )
        .unwrap();

        assert_eq!(config.base_wait(), Duration::from_secs(1));
        assert_eq!(config.max_wait(), Duration::from_secs(30));
        assert!(config.filter.is_filtered("audit_log"));
        assert!(!config.filter.is_filtered("orders"));
    }

    #[tokio::test]
    async fn test_timeouts_then_rotate() {
        let outcome = run_script(
            vec![
                Err(CdcError::Timeout),
                Err(CdcError::Timeout),
                Err(CdcError::Timeout),
                Ok(RawEvent::rotate("bin.000002", 4)),
            ],
            TableFilter::new(),
            false,
        )
        .await;

        assert_eq!(
            outcome.deadlines,
            [1, 2, 4, 8, 1].map(Duration::from_secs).to_vec()
        );
        assert_eq!(outcome.position, BinlogPosition::new("bin.000002", 4));
        assert_eq!(
            outcome.saves,
            vec![(BinlogPosition::new("bin.000002", 4), true)]
        );
        assert!(matches!(outcome.err, CdcError::SourceError(_)));
    }

    #[tokio::test]
    async fn test_transaction_dispatch_order() {
        let row = vec![vec![CellValue::Int(1)]];
        let update = vec![vec![CellValue::Int(1)], vec![CellValue::Int(2)]];
        let outcome = run_script(
            vec![
                Ok(RawEvent::rows(EventType::WriteRowsEventV2, 300, "shop", "orders", row.clone())),
                Ok(RawEvent::rows(EventType::UpdateRowsEventV1, 420, "shop", "orders", update)),
                Ok(RawEvent::rows(EventType::DeleteRowsEventV2, 510, "shop", "items", row)),
                Ok(RawEvent::xid(541, 9)),
            ],
            TableFilter::new(),
            false,
        )
        .await;

        assert_eq!(
            outcome.calls,
            vec![
                "insert:orders:v0:1",
                "update:orders:v0:2",
                "delete:items:v0:1"
            ]
        );
        // rows 위치는 저장하지 않고 XID 위치만 저장
        assert_eq!(
            outcome.saves,
            vec![(BinlogPosition::new("bin.000001", 541), false)]
        );
        assert_eq!(outcome.position, BinlogPosition::new("bin.000001", 541));
    }

    #[tokio::test(start_paused = true)]
    async fn test_default_interval_saves_transaction_end() {
        let rows = |log_pos: u32| -> Result<RawEvent> {
            Ok(RawEvent::rows(EventType::WriteRowsEventV2, log_pos, "shop", "orders", Vec::new()))
        };

        let outcome = run_with(
            SyncConfig::default(),
            BinlogPosition::new("bin.000001", 4),
            vec![rows(300), rows(420), Ok(RawEvent::xid(541, 9))],
            false,
            None,
        )
        .await;
        assert_eq!(
            outcome.saves,
            vec![(BinlogPosition::new("bin.000001", 541), false)]
        );

        // 간격 안의 두 번째 트랜잭션은 유휴 구간에 저장
        let outcome = run_with(
            SyncConfig::default(),
            BinlogPosition::new("bin.000001", 4),
            vec![
                Ok(RawEvent::xid(100, 8)),
                rows(300),
                rows(420),
                Ok(RawEvent::xid(541, 9)),
                Err(CdcError::Timeout),
            ],
            false,
            None,
        )
        .await;
        assert_eq!(
            outcome.saves,
            vec![
                (BinlogPosition::new("bin.000001", 100), false),
                (BinlogPosition::new("bin.000001", 541), false),
            ]
        );
        assert_eq!(
            outcome.checkpoint.map(|c| c.binlog_position()),
            Some(BinlogPosition::new("bin.000001", 541))
        );
    }

    #[tokio::test]
    async fn test_rotate_past_six_digit_sequence() {
        let config = SyncConfig {
            save_interval_ms: 0,
            ..SyncConfig::default()
        };
        let outcome = run_with(
            config,
            BinlogPosition::new("mysql-bin.999999", 4),
            vec![
                Ok(RawEvent::xid(8000, 1)),
                Ok(RawEvent::rotate("mysql-bin.1000000", 4)),
                Ok(RawEvent::xid(120, 2)),
            ],
            false,
            None,
        )
        .await;

        assert!(matches!(outcome.err, CdcError::SourceError(_)));
        assert_eq!(
            outcome.saves,
            vec![
                (BinlogPosition::new("mysql-bin.999999", 8000), false),
                (BinlogPosition::new("mysql-bin.1000000", 4), true),
                (BinlogPosition::new("mysql-bin.1000000", 120), false),
            ]
        );
        assert_eq!(outcome.position, BinlogPosition::new("mysql-bin.1000000", 120));
    }

    #[tokio::test]
    async fn test_backward_rotate_is_fatal() {
        let config = SyncConfig {
            save_interval_ms: 0,
            ..SyncConfig::default()
        };
        let outcome = run_with(
            config,
            BinlogPosition::new("bin.000005", 4),
            vec![
                Ok(RawEvent::xid(200, 1)),
                Ok(RawEvent::rotate("bin.000003", 4)),
                Ok(RawEvent::xid(300, 2)),
            ],
            false,
            None,
        )
        .await;

        assert!(matches!(outcome.err, CdcError::PositionRegression { .. }));
        assert_eq!(
            outcome.saves,
            vec![(BinlogPosition::new("bin.000005", 200), false)]
        );
        assert_eq!(outcome.position, BinlogPosition::new("bin.000005", 200));
        assert_eq!(outcome.deadlines.len(), 2);
    }

    #[tokio::test]
    async fn test_server_id_written_to_checkpoint() {
        let outcome = run_with(
            SyncConfig::default(),
            BinlogPosition::new("bin.000001", 4),
            vec![Ok(RawEvent::xid(200, 1))],
            false,
            Some(42),
        )
        .await;

        let checkpoint = outcome.checkpoint.unwrap();
        assert_eq!(checkpoint.binlog_position(), BinlogPosition::new("bin.000001", 200));
        assert_eq!(checkpoint.server_flag, 42);
    }

    #[tokio::test]
    async fn test_zero_base_wait_still_backs_off() {
        let config: SyncConfig =
            serde_json::from_str(r#"{"base_wait_ms": 0, "max_wait_ms": 4}"#).unwrap();
        assert_eq!(config.base_wait(), Duration::from_millis(1));

        let outcome = run_with(
            config,
            BinlogPosition::new("bin.000001", 4),
            vec![
                Err(CdcError::Timeout),
                Err(CdcError::Timeout),
                Err(CdcError::Timeout),
                Ok(RawEvent::rotate("bin.000002", 4)),
            ],
            false,
            None,
        )
        .await;

        assert_eq!(
            outcome.deadlines,
            [1, 2, 4, 4, 1].map(Duration::from_millis).to_vec()
        );
    }

    #[tokio::test]
    async fn test_alter_invalidates_and_forces_save() {
        let outcome = run_script(
            vec![
                Ok(RawEvent::rows(EventType::WriteRowsEventV2, 200, "shop", "orders", Vec::new())),
                query_event(350, "ALTER TABLE `shop`.`orders` ADD COLUMN note TEXT"),
                Ok(RawEvent::rows(EventType::WriteRowsEventV2, 480, "shop", "orders", Vec::new())),
            ],
            TableFilter::new(),
            false,
        )
        .await;

        assert_eq!(
            outcome.invalidations,
            vec![("shop".to_string(), "orders".to_string())]
        );
        // ALTER 이후 rows 이벤트는 새 메타데이터로 분류
        assert_eq!(
            outcome.calls,
            vec!["insert:orders:v0:0", "alter:orders", "insert:orders:v1:0"]
        );
        assert!(outcome
            .saves
            .contains(&(BinlogPosition::new("bin.000001", 350), true)));
    }

    #[tokio::test]
    async fn test_alter_without_schema_uses_event_schema() {
        let outcome = run_script(
            vec![query_event(350, "alter table orders drop column note")],
            TableFilter::new(),
            false,
        )
        .await;

        assert_eq!(
            outcome.invalidations,
            vec![("shop".to_string(), "orders".to_string())]
        );
        assert_eq!(outcome.calls, vec!["alter:orders"]);
    }

    #[tokio::test]
    async fn test_filtered_alter_saves_without_dispatch() {
        for filter in [
            TableFilter::new().with_column_filtered("orders"),
            TableFilter::new().with_ignored("orders"),
        ] {
            let outcome = run_script(
                vec![query_event(350, "ALTER TABLE `shop`.`orders` ADD COLUMN note TEXT")],
                filter,
                false,
            )
            .await;

            assert!(outcome.invalidations.is_empty());
            assert!(outcome.calls.is_empty());
            assert_eq!(
                outcome.saves,
                vec![(BinlogPosition::new("bin.000001", 350), true)]
            );
        }
    }

    #[tokio::test]
    async fn test_unrecognized_events_are_skipped() {
        let outcome = run_script(
            vec![
                query_event(150, "BEGIN"),
                Ok(RawEvent {
                    header: crate::events::EventHeader {
                        timestamp: 0,
                        event_type: EventType::TableMapEvent,
                        log_pos: 180,
                    },
                    payload: EventPayload::Other,
                }),
            ],
            TableFilter::new(),
            false,
        )
        .await;

        assert!(outcome.saves.is_empty());
        assert!(outcome.calls.is_empty());
        assert_eq!(outcome.position, BinlogPosition::new("bin.000001", 4));
    }

    #[tokio::test]
    async fn test_handler_error_is_fatal() {
        let outcome = run_script(
            vec![
                Ok(RawEvent::rows(EventType::WriteRowsEventV2, 300, "shop", "orders", Vec::new())),
                Ok(RawEvent::xid(330, 1)),
            ],
            TableFilter::new(),
            true,
        )
        .await;

        assert!(matches!(outcome.err, CdcError::Handler { .. }));
        assert!(outcome.saves.is_empty());
        // 에러 이후 이벤트는 읽지 않음
        assert_eq!(outcome.deadlines.len(), 1);
    }

    #[tokio::test]
    async fn test_unsupported_rows_kind_is_fatal() {
        let outcome = run_script(
            vec![Ok(RawEvent::rows(EventType::GtidEvent, 300, "shop", "orders", Vec::new()))],
            TableFilter::new(),
            false,
        )
        .await;

        assert!(matches!(outcome.err, CdcError::UnsupportedRowsEvent(_)));
        assert!(outcome.calls.is_empty());
    }
}
