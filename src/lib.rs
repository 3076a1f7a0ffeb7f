//! MySQL Binlog sync 엔진
//!
//! 복제 로그를 읽어 행 변경 / 스키마 변경 이벤트로 바꿔 핸들러에 전달합니다.
//! 주요 기능:
//! - Binlog 이벤트 분류 및 핸들러 디스패치
//! - 위치 추적 및 체크포인트 저장
//! - `ALTER TABLE` 감지 및 테이블 메타데이터 캐시 무효화
//! - 특정 위치까지 따라잡기 대기

pub mod connection;
pub mod ddl;
pub mod error;
pub mod events;
pub mod handler;
pub mod position;
pub mod schema;
pub mod source;
pub mod sync;
pub mod waiter;

pub use connection::{ConnectionConfig, MySqlConnection};
pub use ddl::{AlterTableDetector, TableFilter, TableRef};
pub use error::{CdcError, HandlerError, Result};
pub use events::{CellValue, EventPayload, EventType, QueryEvent, RawEvent, RowAction, RowsEvent};
pub use handler::{Dispatcher, QueryHandler, RowsHandler};
pub use position::{BinlogPosition, FileStore, MemoryStore, PositionHandle, PositionStore, PositionTracker};
pub use schema::{ColumnDef, MetadataSource, TableCache, TableMetadata, TableProvider};
pub use source::{ChannelSource, EventSource, EventStream};
pub use sync::{BinlogSyncer, SyncConfig};
pub use waiter::{catch_master_pos, get_master_pos, wait_until, StatusQuery};
