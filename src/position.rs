//! Binlog 처리 위치 추적 및 저장
//!
//! Binlog 파일명 + 위치로 정확한 재시작 지점을 추적합니다.
//! 예: "mysql-bin.000003" 파일의 4097 바이트 위치
//!
//! 위치는 sync 루프만 갱신하고, 대기자(waiter)는 `PositionHandle`로 읽기만 합니다.

use crate::error::{CdcError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::time::Instant;
use tracing::{debug, info, warn};

/// Binlog 파일 위치 정보
///
/// 파일명 다음 오프셋 순서로 비교합니다. 접두사가 같고 확장자가 숫자인 파일은
/// 시퀀스 번호로 비교하므로 `mysql-bin.999999` 다음 `mysql-bin.1000000`도 앞으로 갑니다.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct BinlogPosition {
    /// 바이너리 로그 파일명 (e.g., "mysql-bin.000001")
    pub filename: String,
    /// 바이트 위치
    pub position: u32,
}

impl BinlogPosition {
    pub fn new(filename: impl Into<String>, position: u32) -> Self {
        BinlogPosition {
            filename: filename.into(),
            position,
        }
    }

    /// 같은 파일 안에서 위치만 바꾼 새 좌표
    pub fn with_position(&self, position: u32) -> Self {
        BinlogPosition {
            filename: self.filename.clone(),
            position,
        }
    }

    /// 파일명에서 시퀀스 번호 추출
    pub fn file_sequence(&self) -> Option<u64> {
        self.filename
            .rsplit_once('.')
            .and_then(|(_, seq)| seq.parse().ok())
    }

    fn file_prefix(&self) -> Option<&str> {
        self.filename.rsplit_once('.').map(|(prefix, _)| prefix)
    }

    fn cmp_file(&self, other: &Self) -> Ordering {
        if self.file_prefix().is_some() && self.file_prefix() == other.file_prefix() {
            if let (Some(a), Some(b)) = (self.file_sequence(), other.file_sequence()) {
                return a.cmp(&b).then_with(|| self.filename.cmp(&other.filename));
            }
        }
        self.filename.cmp(&other.filename)
    }
}

impl Ord for BinlogPosition {
    fn cmp(&self, other: &Self) -> Ordering {
        self.cmp_file(other)
            .then_with(|| self.position.cmp(&other.position))
    }
}

impl PartialOrd for BinlogPosition {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for BinlogPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.filename, self.position)
    }
}

/// 두 좌표 비교
pub fn compare(a: &BinlogPosition, b: &BinlogPosition) -> Ordering {
    a.cmp(b)
}

/// 마스터 위치 상태
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterState {
    pub position: BinlogPosition,
    /// GTID 등 부가 정보 (해석하지 않음)
    pub extra: String,
    pub server_flag: i64,
}

impl MasterState {
    pub fn new(position: BinlogPosition) -> Self {
        MasterState {
            position,
            extra: String::new(),
            server_flag: -1,
        }
    }
}

/// 영속 저장되는 체크포인트
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub filename: String,
    pub position: u32,
    #[serde(default)]
    pub extra: String,
    #[serde(default)]
    pub server_flag: i64,
    pub saved_at: DateTime<Utc>,
}

impl Checkpoint {
    fn from_state(state: &MasterState) -> Self {
        Checkpoint {
            filename: state.position.filename.clone(),
            position: state.position.position,
            extra: state.extra.clone(),
            server_flag: state.server_flag,
            saved_at: Utc::now(),
        }
    }

    pub fn binlog_position(&self) -> BinlogPosition {
        BinlogPosition::new(self.filename.clone(), self.position)
    }
}

/// 체크포인트 저장소
///
/// 단일 체크포인트 레코드를 덮어쓰는 방식입니다.
#[async_trait]
pub trait PositionStore: Send + Sync {
    async fn load(&self) -> Result<Option<Checkpoint>>;

    async fn save(&self, checkpoint: &Checkpoint, forced: bool) -> Result<()>;
}

/// JSON 파일 기반 저장소
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl PositionStore for FileStore {
    async fn load(&self) -> Result<Option<Checkpoint>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, checkpoint: &Checkpoint, _forced: bool) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(checkpoint)?;

        // 임시 파일을 디스크까지 내린 뒤 rename
        let tmp = self.path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(&bytes).await?;
        file.sync_all().await?;
        drop(file);

        tokio::fs::rename(&tmp, &self.path).await?;
        sync_parent_dir(&self.path).await;
        Ok(())
    }
}

/// rename 결과를 디렉터리 엔트리까지 반영 (실패해도 저장은 유효)
#[cfg(unix)]
async fn sync_parent_dir(path: &Path) {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    let result = match tokio::fs::File::open(dir).await {
        Ok(dir) => dir.sync_all().await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        warn!("Failed to sync checkpoint directory {}: {}", dir.display(), e);
    }
}

#[cfg(not(unix))]
async fn sync_parent_dir(_path: &Path) {}

/// 메모리 저장소 (저장 이력 포함)
#[derive(Debug, Default)]
pub struct MemoryStore {
    current: Mutex<Option<Checkpoint>>,
    history: Mutex<Vec<(BinlogPosition, bool)>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_checkpoint(checkpoint: Checkpoint) -> Self {
        MemoryStore {
            current: Mutex::new(Some(checkpoint)),
            history: Mutex::new(Vec::new()),
        }
    }

    /// 저장된 (위치, forced) 목록
    pub fn history(&self) -> Vec<(BinlogPosition, bool)> {
        self.history.lock().clone()
    }
}

#[async_trait]
impl PositionStore for MemoryStore {
    async fn load(&self) -> Result<Option<Checkpoint>> {
        Ok(self.current.lock().clone())
    }

    async fn save(&self, checkpoint: &Checkpoint, forced: bool) -> Result<()> {
        self.history
            .lock()
            .push((checkpoint.binlog_position(), forced));
        *self.current.lock() = Some(checkpoint.clone());
        Ok(())
    }
}

/// 현재 위치 읽기 전용 핸들
#[derive(Debug, Clone)]
pub struct PositionHandle {
    state: Arc<RwLock<MasterState>>,
}

impl PositionHandle {
    pub fn current(&self) -> BinlogPosition {
        self.state.read().position.clone()
    }

    pub fn state(&self) -> MasterState {
        self.state.read().clone()
    }
}

/// 위치 추적기
///
/// 메모리 위치(`state`)는 이벤트마다 앞으로 가지만, 저장소에는 `commit`된 위치만 기록합니다.
/// 트랜잭션 중간 위치는 재시작 지점이 될 수 없습니다.
pub struct PositionTracker {
    state: Arc<RwLock<MasterState>>,
    store: Arc<dyn PositionStore>,
    save_interval: Duration,
    last_save: Option<Instant>,
    /// 아직 저장하지 않은 재시작 가능 위치
    pending: Option<MasterState>,
}

impl PositionTracker {
    pub fn new(start: BinlogPosition, store: Arc<dyn PositionStore>, save_interval: Duration) -> Self {
        PositionTracker {
            state: Arc::new(RwLock::new(MasterState::new(start))),
            store,
            save_interval,
            last_save: None,
            pending: None,
        }
    }

    /// 마지막 체크포인트에서 복원 (없으면 `default` 사용)
    pub async fn load(
        store: Arc<dyn PositionStore>,
        default: BinlogPosition,
        save_interval: Duration,
    ) -> Result<Self> {
        let state = match store.load().await? {
            Some(checkpoint) => {
                info!("Restored checkpoint {}", checkpoint.binlog_position());
                MasterState {
                    position: checkpoint.binlog_position(),
                    extra: checkpoint.extra,
                    server_flag: checkpoint.server_flag,
                }
            }
            None => {
                info!("No checkpoint found, starting at {}", default);
                MasterState::new(default)
            }
        };

        Ok(PositionTracker {
            state: Arc::new(RwLock::new(state)),
            store,
            save_interval,
            last_save: None,
            pending: None,
        })
    }

    pub fn handle(&self) -> PositionHandle {
        PositionHandle {
            state: Arc::clone(&self.state),
        }
    }

    pub fn current(&self) -> BinlogPosition {
        self.state.read().position.clone()
    }

    pub fn state(&self) -> MasterState {
        self.state.read().clone()
    }

    /// 메모리 상의 위치 갱신
    ///
    /// 현재보다 뒤로 가는 좌표는 `PositionRegression` 에러입니다.
    pub fn update(&mut self, position: BinlogPosition, extra: impl Into<String>, server_flag: i64) -> Result<()> {
        let mut state = self.state.write();
        if position < state.position {
            return Err(CdcError::PositionRegression {
                current: state.position.clone(),
                next: position,
            });
        }

        state.position = position;
        state.extra = extra.into();
        state.server_flag = server_flag;
        Ok(())
    }

    /// 현재 위치를 재시작 가능 지점으로 표시 (트랜잭션 경계)
    pub fn commit(&mut self) {
        self.pending = Some(self.state.read().clone());
    }

    /// 위치 저장
    ///
    /// forced 저장은 현재 위치를 commit하고 반환 전에 저장소 쓰기가 끝납니다.
    /// 그 외에는 commit된 미저장 위치가 있을 때 `save_interval`마다 한 번 저장합니다.
    pub async fn persist(&mut self, forced: bool) -> Result<()> {
        if forced {
            self.commit();
        } else if let Some(last) = self.last_save {
            if last.elapsed() < self.save_interval {
                return Ok(());
            }
        }
        self.save_pending(forced).await
    }

    /// 간격과 무관하게 commit된 미저장 위치 저장 (유휴 구간용)
    pub async fn flush(&mut self) -> Result<()> {
        self.save_pending(false).await
    }

    async fn save_pending(&mut self, forced: bool) -> Result<()> {
        let Some(state) = self.pending.take() else {
            return Ok(());
        };

        let checkpoint = Checkpoint::from_state(&state);
        if let Err(e) = self.store.save(&checkpoint, forced).await {
            self.pending = Some(state);
            return Err(e);
        }
        debug!(
            "Saved position {}:{} (forced: {})",
            checkpoint.filename, checkpoint.position, forced
        );

        self.last_save = Some(Instant::now());
        Ok(())
    }
}
