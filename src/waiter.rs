//! 위치 따라잡기 대기
//!
//! sync 루프와 독립적으로, 추적 중인 위치가 목표 위치에 도달할 때까지 폴링합니다.

use crate::error::{CdcError, Result};
use crate::position::{BinlogPosition, PositionHandle};
use async_trait::async_trait;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// 타임아웃이 0 이하일 때 사용하는 기본값 (초)
pub const DEFAULT_WAIT_TIMEOUT_SECS: u64 = 60;

const POLL_INTERVAL: Duration = Duration::from_millis(100);

/// 마스터의 현재 binlog 위치 조회
#[async_trait]
pub trait StatusQuery: Send + Sync {
    async fn master_position(&self) -> Result<BinlogPosition>;
}

/// 현재 위치가 `target` 이상이 될 때까지 대기
///
/// 타임아웃이 너무 커서 시각을 표현할 수 없으면 기한 없이 기다립니다.
pub async fn wait_until(
    handle: &PositionHandle,
    target: &BinlogPosition,
    timeout_secs: i64,
) -> Result<()> {
    let timeout_secs = if timeout_secs <= 0 {
        DEFAULT_WAIT_TIMEOUT_SECS
    } else {
        timeout_secs as u64
    };
    let deadline = Instant::now().checked_add(Duration::from_secs(timeout_secs));

    loop {
        let current = handle.current();
        if current >= *target {
            return Ok(());
        }
        if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            debug!("Gave up waiting for {} (current {})", target, current);
            return Err(CdcError::CatchUpTimeout {
                target: target.clone(),
            });
        }
        tokio::time::sleep(POLL_INTERVAL).await;
    }
}

/// 마스터의 현재 위치 조회
pub async fn get_master_pos<Q: StatusQuery + ?Sized>(client: &Q) -> Result<BinlogPosition> {
    client.master_position().await
}

/// 마스터의 현재 위치까지 따라잡을 때까지 대기
pub async fn catch_master_pos<Q: StatusQuery + ?Sized>(
    client: &Q,
    handle: &PositionHandle,
    timeout_secs: i64,
) -> Result<()> {
    let target = client.master_position().await?;
    debug!("Catching up to master position {}", target);
    wait_until(handle, &target, timeout_secs).await
}
