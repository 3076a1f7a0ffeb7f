//! CDC 관련 에러 타입

use crate::position::BinlogPosition;
use std::io;
use thiserror::Error;

/// 핸들러가 반환하는 에러
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum CdcError {
    #[error("MySQL 연결 에러: {0}")]
    ConnectionError(String),

    #[error("쿼리 실행 에러: {0}")]
    QueryError(String),

    #[error("이벤트 소스 에러: {0}")]
    SourceError(String),

    #[error("지원하지 않는 rows 이벤트: {0}")]
    UnsupportedRowsEvent(String),

    #[error("테이블을 찾을 수 없음: {schema}.{table}")]
    TableNotFound { schema: String, table: String },

    #[error("핸들러 {handler} 에러: {source}")]
    Handler {
        handler: String,
        #[source]
        source: HandlerError,
    },

    #[error("{target} 위치까지 대기 시간 초과")]
    CatchUpTimeout { target: BinlogPosition },

    /// 추적 위치가 뒤로 가는 갱신
    #[error("위치 역행: {current} -> {next}")]
    PositionRegression {
        current: BinlogPosition,
        next: BinlogPosition,
    },

    #[error("설정 에러: {0}")]
    ConfigError(String),

    #[error("I/O 에러: {0}")]
    IoError(String),

    #[error("직렬화 에러: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// 이벤트 대기 시간 초과 (재시도 대상)
    #[error("Timeout 에러")]
    Timeout,

    #[error("채널이 닫혔습니다")]
    ChannelClosed,
}

impl CdcError {
    /// 대기 시간 초과로 인한 에러인지 여부
    pub fn is_timeout(&self) -> bool {
        matches!(self, CdcError::Timeout)
    }
}

impl From<io::Error> for CdcError {
    fn from(err: io::Error) -> Self {
        CdcError::IoError(err.to_string())
    }
}

impl From<mysql_async::Error> for CdcError {
    fn from(err: mysql_async::Error) -> Self {
        CdcError::QueryError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, CdcError>;
