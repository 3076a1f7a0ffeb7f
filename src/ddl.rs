//! DDL 감지
//!
//! `ALTER TABLE` 문에서 대상 스키마/테이블을 추출합니다.
//! 필터링 여부는 호출하는 쪽에서 `TableFilter`로 판단합니다.

use crate::error::{CdcError, Result};
use regex::Regex;
use serde::Deserialize;
use std::collections::HashSet;

// 식별자: 백틱으로 감싼 이름(공백, 점 허용) 또는 맨 이름
const ALTER_TABLE_PATTERN: &str = concat!(
    r"(?i)^\s*ALTER\s+TABLE\s+",
    r"(?:(?:`([^`]+)`|([^`.\s]+))\.)?",
    r"(?:`([^`]+)`|([^`.\s]+))(?:\s|$)",
);

/// 스키마가 변경된 테이블
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub schema: String,
    pub table: String,
}

/// `ALTER TABLE` 감지기
#[derive(Debug, Clone)]
pub struct AlterTableDetector {
    pattern: Regex,
}

impl AlterTableDetector {
    pub fn new() -> Result<Self> {
        let pattern = Regex::new(ALTER_TABLE_PATTERN)
            .map_err(|e| CdcError::ConfigError(format!("Invalid ALTER TABLE pattern: {}", e)))?;
        Ok(AlterTableDetector { pattern })
    }

    /// 쿼리에 스키마가 없으면 `default_schema`를 사용합니다.
    /// `ALTER TABLE`이 아니면 `None`.
    pub fn detect(&self, sql: &str, default_schema: &str) -> Option<TableRef> {
        let caps = self.pattern.captures(sql)?;
        let table = caps.get(3).or_else(|| caps.get(4))?.as_str().to_string();
        let schema = caps
            .get(1)
            .or_else(|| caps.get(2))
            .map(|m| m.as_str())
            .filter(|s| !s.is_empty())
            .unwrap_or(default_schema)
            .to_string();

        Some(TableRef { schema, table })
    }
}

/// 구조 변경을 무시할 테이블 목록
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct TableFilter {
    /// 컬럼 필터링 대상이라 구조 변경을 무시하는 테이블
    pub column_filtered: HashSet<String>,
    /// 설정으로 무시하는 테이블
    pub ignored: HashSet<String>,
}

impl TableFilter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_column_filtered(mut self, table: impl Into<String>) -> Self {
        self.column_filtered.insert(table.into());
        self
    }

    pub fn with_ignored(mut self, table: impl Into<String>) -> Self {
        self.ignored.insert(table.into());
        self
    }

    pub fn is_filtered(&self, table: &str) -> bool {
        self.column_filtered.contains(table) || self.ignored.contains(table)
    }
}
