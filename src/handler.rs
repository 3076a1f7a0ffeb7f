//! 이벤트 분류 및 핸들러 디스패치
//!
//! rows 이벤트를 `RowsEvent`로, DDL 쿼리를 `QueryEvent`로 만들고
//! 등록 순서대로 핸들러를 호출합니다. 첫 에러에서 중단합니다.

use crate::error::{CdcError, HandlerError, Result};
use crate::events::{EventType, QueryEvent, RowAction, RowsEvent, RowsEventData};
use crate::schema::TableProvider;
use async_trait::async_trait;
use std::sync::Arc;

/// rows 이벤트 핸들러
#[async_trait]
pub trait RowsHandler: Send + Sync {
    fn name(&self) -> &str {
        "rows_handler"
    }

    async fn on_rows(&self, event: &RowsEvent) -> std::result::Result<(), HandlerError>;
}

/// DDL 이벤트 핸들러
#[async_trait]
pub trait QueryHandler: Send + Sync {
    fn name(&self) -> &str {
        "query_handler"
    }

    async fn on_query(&self, event: &QueryEvent) -> std::result::Result<(), HandlerError>;
}

/// 이벤트 타입을 행 연산으로 변환
pub fn row_action(event_type: EventType) -> Result<RowAction> {
    match event_type {
        EventType::WriteRowsEventV0 | EventType::WriteRowsEventV1 | EventType::WriteRowsEventV2 => {
            Ok(RowAction::Insert)
        }
        EventType::UpdateRowsEventV0
        | EventType::UpdateRowsEventV1
        | EventType::UpdateRowsEventV2 => Ok(RowAction::Update),
        EventType::DeleteRowsEventV0
        | EventType::DeleteRowsEventV1
        | EventType::DeleteRowsEventV2 => Ok(RowAction::Delete),
        other => Err(CdcError::UnsupportedRowsEvent(format!("{:?}", other))),
    }
}

/// 테이블 메타데이터를 붙여 도메인 이벤트 생성
pub struct EventBuilder<T> {
    tables: Arc<T>,
}

impl<T: TableProvider> EventBuilder<T> {
    pub fn new(tables: Arc<T>) -> Self {
        EventBuilder { tables }
    }

    pub fn tables(&self) -> &Arc<T> {
        &self.tables
    }

    pub async fn build_rows(&self, event_type: EventType, data: RowsEventData) -> Result<RowsEvent> {
        // 테이블 구조는 실행 중에 바뀔 수 있음
        let table = self.tables.get_table(&data.schema, &data.table).await?;
        let action = row_action(event_type)?;

        Ok(RowsEvent {
            table,
            action,
            rows: data.rows,
        })
    }

    pub async fn build_alter(&self, schema: &str, table: &str, query: &str) -> Result<QueryEvent> {
        let table = self.tables.get_table(schema, table).await?;

        Ok(QueryEvent {
            table,
            action: RowAction::Alter,
            query: query.to_string(),
        })
    }
}

/// 핸들러 목록
#[derive(Default)]
pub struct Dispatcher {
    rows_handlers: Vec<Arc<dyn RowsHandler>>,
    query_handlers: Vec<Arc<dyn QueryHandler>>,
}

impl Dispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_rows_handler(&mut self, handler: Arc<dyn RowsHandler>) {
        self.rows_handlers.push(handler);
    }

    pub fn add_query_handler(&mut self, handler: Arc<dyn QueryHandler>) {
        self.query_handlers.push(handler);
    }

    pub async fn dispatch_rows(&self, event: &RowsEvent) -> Result<()> {
        for handler in &self.rows_handlers {
            handler
                .on_rows(event)
                .await
                .map_err(|source| CdcError::Handler {
                    handler: handler.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }

    pub async fn dispatch_query(&self, event: &QueryEvent) -> Result<()> {
        for handler in &self.query_handlers {
            handler
                .on_query(event)
                .await
                .map_err(|source| CdcError::Handler {
                    handler: handler.name().to_string(),
                    source,
                })?;
        }
        Ok(())
    }
}
