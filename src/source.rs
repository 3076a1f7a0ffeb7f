//! 이벤트 소스
//!
//! binlog 디코더가 만든 `RawEvent`를 받아오는 계약입니다.
//! 대기 시간 초과는 `CdcError::Timeout`으로, 그 외는 치명적 에러로 구분합니다.

use crate::error::{CdcError, Result};
use crate::events::RawEvent;
use crate::position::BinlogPosition;
use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::info;

/// 시작 위치에서 스트림을 여는 이벤트 소스
#[async_trait]
pub trait EventSource: Send {
    type Stream: EventStream;

    async fn start_sync(&mut self, position: &BinlogPosition) -> Result<Self::Stream>;
}

/// 이벤트 스트림
#[async_trait]
pub trait EventStream: Send {
    /// `deadline` 안에 이벤트가 없으면 `CdcError::Timeout`
    async fn next_event(&mut self, deadline: Duration) -> Result<RawEvent>;
}

/// mpsc 채널 기반 이벤트 소스
///
/// 디코더 태스크가 송신 측을 가지고 이벤트를 밀어 넣습니다.
#[derive(Debug)]
pub struct ChannelSource {
    rx: Option<mpsc::UnboundedReceiver<RawEvent>>,
}

impl ChannelSource {
    pub fn new(rx: mpsc::UnboundedReceiver<RawEvent>) -> Self {
        ChannelSource { rx: Some(rx) }
    }

    /// 소스와 송신 측을 함께 생성
    pub fn channel() -> (mpsc::UnboundedSender<RawEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, ChannelSource::new(rx))
    }
}

#[async_trait]
impl EventSource for ChannelSource {
    type Stream = ChannelStream;

    async fn start_sync(&mut self, position: &BinlogPosition) -> Result<ChannelStream> {
        let rx = self
            .rx
            .take()
            .ok_or_else(|| CdcError::SourceError("channel source already started".to_string()))?;

        info!("Channel source streaming from {}", position);
        Ok(ChannelStream { rx })
    }
}

#[derive(Debug)]
pub struct ChannelStream {
    rx: mpsc::UnboundedReceiver<RawEvent>,
}

#[async_trait]
impl EventStream for ChannelStream {
    async fn next_event(&mut self, deadline: Duration) -> Result<RawEvent> {
        match tokio::time::timeout(deadline, self.rx.recv()).await {
            Ok(Some(event)) => Ok(event),
            Ok(None) => Err(CdcError::ChannelClosed),
            Err(_) => Err(CdcError::Timeout),
        }
    }
}
