//! Binlog 이벤트 타입 및 도메인 이벤트 정의

use crate::schema::TableMetadata;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// MySQL Binlog 이벤트 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum EventType {
    /// 알 수 없는 이벤트
    Unknown = 0,
    /// 쿼리 이벤트 (DDL, BEGIN)
    QueryEvent = 2,
    /// 로테이션 이벤트 (새 binlog 파일)
    RotateEvent = 4,
    /// XID 이벤트 (트랜잭션 커밋)
    XidEvent = 16,
    /// 테이블 맵 이벤트 (스키마 정보)
    TableMapEvent = 19,
    WriteRowsEventV0 = 20,
    UpdateRowsEventV0 = 21,
    DeleteRowsEventV0 = 22,
    WriteRowsEventV1 = 23,
    UpdateRowsEventV1 = 24,
    DeleteRowsEventV1 = 25,
    /// GTID 이벤트 (Global Transaction ID)
    GtidEvent = 33,
    /// WRITE_ROWS 이벤트 (INSERT)
    WriteRowsEventV2 = 30,
    /// UPDATE_ROWS 이벤트 (UPDATE)
    UpdateRowsEventV2 = 31,
    /// DELETE_ROWS 이벤트 (DELETE)
    DeleteRowsEventV2 = 32,
}

/// Binlog 이벤트 헤더
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventHeader {
    /// 이벤트 타임스탬프 (초 단위)
    #[serde(default)]
    pub timestamp: u32,
    /// 이벤트 타입
    pub event_type: EventType,
    /// 다음 이벤트 위치
    pub log_pos: u32,
}

/// 셀 값
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CellValue {
    Null,
    Int(i64),
    UInt(u64),
    Double(f64),
    String(String),
    Bytes(Vec<u8>),
}

/// 행 단위 변경 데이터
///
/// UPDATE의 경우 변경 전, 변경 후 행이 번갈아 들어옵니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RowsEventData {
    pub schema: String,
    pub table: String,
    pub rows: Vec<Vec<CellValue>>,
}

/// 이벤트 페이로드
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    Rotate {
        next_binlog_name: String,
        position: u32,
    },
    Rows(RowsEventData),
    Xid {
        #[serde(default)]
        xid: u64,
    },
    Query {
        schema: String,
        query: String,
    },
    /// 관심 없는 이벤트
    Other,
}

/// 이벤트 소스가 넘겨주는 원본 이벤트
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    pub header: EventHeader,
    pub payload: EventPayload,
}

impl RawEvent {
    pub fn rotate(next_binlog_name: impl Into<String>, position: u32) -> Self {
        RawEvent {
            header: EventHeader {
                timestamp: 0,
                event_type: EventType::RotateEvent,
                log_pos: 0,
            },
            payload: EventPayload::Rotate {
                next_binlog_name: next_binlog_name.into(),
                position,
            },
        }
    }

    pub fn rows(
        event_type: EventType,
        log_pos: u32,
        schema: impl Into<String>,
        table: impl Into<String>,
        rows: Vec<Vec<CellValue>>,
    ) -> Self {
        RawEvent {
            header: EventHeader {
                timestamp: 0,
                event_type,
                log_pos,
            },
            payload: EventPayload::Rows(RowsEventData {
                schema: schema.into(),
                table: table.into(),
                rows,
            }),
        }
    }

    pub fn xid(log_pos: u32, xid: u64) -> Self {
        RawEvent {
            header: EventHeader {
                timestamp: 0,
                event_type: EventType::XidEvent,
                log_pos,
            },
            payload: EventPayload::Xid { xid },
        }
    }

    pub fn query(log_pos: u32, schema: impl Into<String>, query: impl Into<String>) -> Self {
        RawEvent {
            header: EventHeader {
                timestamp: 0,
                event_type: EventType::QueryEvent,
                log_pos,
            },
            payload: EventPayload::Query {
                schema: schema.into(),
                query: query.into(),
            },
        }
    }
}

/// 변경 연산 타입
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowAction {
    Insert,
    Update,
    Delete,
    Alter,
}

impl RowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            RowAction::Insert => "insert",
            RowAction::Update => "update",
            RowAction::Delete => "delete",
            RowAction::Alter => "alter",
        }
    }
}

/// 핸들러로 전달되는 행 변경 이벤트
#[derive(Debug, Clone, Serialize)]
pub struct RowsEvent {
    pub table: Arc<TableMetadata>,
    pub action: RowAction,
    pub rows: Vec<Vec<CellValue>>,
}

/// 핸들러로 전달되는 DDL 이벤트
#[derive(Debug, Clone, Serialize)]
pub struct QueryEvent {
    pub table: Arc<TableMetadata>,
    pub action: RowAction,
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_event_from_json() {
        let json = r#"{
            "header": {"event_type": "WriteRowsEventV2", "log_pos": 1200},
            "payload": {"kind": "rows", "schema": "shop", "table": "orders", "rows": [[1, "pen", null]]}
        }"#;
        let event: RawEvent = serde_json::from_str(json).unwrap();

        assert_eq!(event.header.event_type, EventType::WriteRowsEventV2);
        match event.payload {
            EventPayload::Rows(data) => {
                assert_eq!(data.table, "orders");
                assert_eq!(
                    data.rows[0],
                    vec![
                        CellValue::Int(1),
                        CellValue::String("pen".to_string()),
                        CellValue::Null
                    ]
                );
            }
            other => panic!("unexpected payload {:?}", other),
        }
    }
}
