//! 테이블 메타데이터 캐시
//!
//! `(schema, table)` 단위로 컬럼 정보를 캐시합니다.
//! 구조 변경이 감지되면 항목을 제거하고, 다음 조회 때 다시 읽어옵니다.

use crate::error::{CdcError, Result};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// 테이블 컬럼 정보
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: String,
    pub nullable: bool,
    pub is_key: bool,
}

/// 테이블 메타데이터
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableMetadata {
    pub schema: String,
    pub name: String,
    pub columns: Vec<ColumnDef>,
}

impl TableMetadata {
    pub fn new(schema: impl Into<String>, name: impl Into<String>, columns: Vec<ColumnDef>) -> Self {
        TableMetadata {
            schema: schema.into(),
            name: name.into(),
            columns,
        }
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn primary_key(&self) -> Vec<&str> {
        self.columns
            .iter()
            .filter(|c| c.is_key)
            .map(|c| c.name.as_str())
            .collect()
    }
}

/// sync 루프가 사용하는 테이블 메타데이터 조회 계약
#[async_trait]
pub trait TableProvider: Send + Sync {
    /// 캐시에 없으면 읽어와서 캐시
    async fn get_table(&self, schema: &str, table: &str) -> Result<Arc<TableMetadata>>;

    /// 캐시 항목 제거 (없으면 아무 일도 하지 않음)
    fn invalidate(&self, schema: &str, table: &str);
}

/// 메타데이터 원본 (예: INFORMATION_SCHEMA)
#[async_trait]
pub trait MetadataSource: Send + Sync {
    async fn fetch_columns(&self, schema: &str, table: &str) -> Result<Vec<ColumnDef>>;
}

/// 메타데이터 캐시
pub struct TableCache<S> {
    source: S,
    tables: RwLock<HashMap<(String, String), Arc<TableMetadata>>>,
}

impl<S: MetadataSource> TableCache<S> {
    pub fn new(source: S) -> Self {
        TableCache {
            source,
            tables: RwLock::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.tables.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tables.read().is_empty()
    }

    pub fn clear(&self) {
        self.tables.write().clear();
    }
}

#[async_trait]
impl<S: MetadataSource> TableProvider for TableCache<S> {
    async fn get_table(&self, schema: &str, table: &str) -> Result<Arc<TableMetadata>> {
        let key = (schema.to_string(), table.to_string());
        let cached = self.tables.read().get(&key).cloned();
        if let Some(cached) = cached {
            return Ok(cached);
        }

        let columns = self.source.fetch_columns(schema, table).await?;
        if columns.is_empty() {
            return Err(CdcError::TableNotFound {
                schema: schema.to_string(),
                table: table.to_string(),
            });
        }

        debug!("Loaded metadata for {}.{}", schema, table);
        let metadata = Arc::new(TableMetadata::new(schema, table, columns));
        self.tables.write().insert(key, Arc::clone(&metadata));
        Ok(metadata)
    }

    fn invalidate(&self, schema: &str, table: &str) {
        let key = (schema.to_string(), table.to_string());
        if self.tables.write().remove(&key).is_some() {
            debug!("Invalidated metadata for {}.{}", schema, table);
        }
    }
}
