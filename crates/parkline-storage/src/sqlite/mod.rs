//! SQLite 키/값 저장소.
//!
//! 값은 `{"data": ..., "timestamp": <ms>[, "expiration": <ms>]}` 봉투 JSON으로 저장된다.
//!
//! # 모듈 구조
//! - `maintenance`: 접두사 기반 오래된 항목 정리 (차트 캐시)

mod maintenance;

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::StorageError;
use crate::migration;

/// 저장 봉투
#[derive(Debug, Serialize, Deserialize)]
struct Envelope<T> {
    data: T,
    /// 저장 시각 (epoch ms)
    timestamp: i64,
    /// 만료 시각 (epoch ms)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    expiration: Option<i64>,
}

/// SQLite 키/값 저장소
pub struct KeyValueStore {
    pub(super) conn: Mutex<Connection>,
}

impl KeyValueStore {
    /// 파일 기반 저장소 생성
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(|e| StorageError::Backend(format!("데이터 디렉토리 생성 실패: {e}")))?;
            }
        }

        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode=WAL;
            PRAGMA synchronous=NORMAL;
            PRAGMA temp_store=MEMORY;
            ",
        )?;

        migration::run_migrations(&conn)?;

        info!("SQLite 저장소 초기화: {}", path.display());

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 인메모리 저장소 생성 (테스트/일회성 명령용)
    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        migration::run_migrations(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// 값을 저장 시각과 함께 저장
    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        self.write(key, value, None)
    }

    /// 값을 만료 시각과 함께 저장
    pub fn put_with_expiry<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Duration,
    ) -> Result<(), StorageError> {
        let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
        let expiration = Utc::now().timestamp_millis().saturating_add(ttl_ms);
        self.write(key, value, Some(expiration))
    }

    fn write<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        expiration: Option<i64>,
    ) -> Result<(), StorageError> {
        let envelope = Envelope {
            data: value,
            timestamp: Utc::now().timestamp_millis(),
            expiration,
        };
        let json = serde_json::to_string(&envelope)
            .map_err(|e| StorageError::Backend(format!("직렬화 실패 '{key}': {e}")))?;

        let conn = self.conn.lock();
        conn.execute(
            "INSERT OR REPLACE INTO kv_store (key, envelope, updated_at)
             VALUES (?1, ?2, datetime('now'))",
            rusqlite::params![key, json],
        )?;

        debug!("저장: {key} ({} bytes)", json.len());
        Ok(())
    }

    /// 값 읽기
    ///
    /// 만료된 항목은 삭제하고 `Expired`를 돌려준다.
    pub fn read<T: DeserializeOwned>(&self, key: &str) -> Result<T, StorageError> {
        let envelope = self.read_envelope(key)?;

        if let Some(expiration) = envelope.expiration {
            if Utc::now().timestamp_millis() >= expiration {
                self.remove(key)?;
                debug!("만료 항목 삭제: {key}");
                return Err(StorageError::Expired(key.to_string()));
            }
        }

        serde_json::from_value(envelope.data).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }

    /// 값 읽기: 실패는 로그만 남기고 `None`
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        match self.read(key) {
            Ok(value) => Some(value),
            Err(e) if e.is_missing() => None,
            Err(e) => {
                warn!("저장소 읽기 실패: {e}");
                None
            }
        }
    }

    /// 항목의 저장 시각
    pub fn get_timestamp(&self, key: &str) -> Option<DateTime<Utc>> {
        match self.read_envelope(key) {
            Ok(envelope) => Utc.timestamp_millis_opt(envelope.timestamp).single(),
            Err(e) if e.is_missing() => None,
            Err(e) => {
                warn!("저장 시각 읽기 실패: {e}");
                None
            }
        }
    }

    /// 항목 삭제 (없으면 아무 일도 하지 않음)
    pub fn remove(&self, key: &str) -> Result<(), StorageError> {
        let conn = self.conn.lock();
        conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(())
    }

    /// 저장된 키 수
    pub fn len(&self) -> Result<usize, StorageError> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM kv_store", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    pub fn is_empty(&self) -> Result<bool, StorageError> {
        Ok(self.len()? == 0)
    }

    fn read_envelope(&self, key: &str) -> Result<Envelope<serde_json::Value>, StorageError> {
        let raw: Option<String> = {
            let conn = self.conn.lock();
            conn.query_row(
                "SELECT envelope FROM kv_store WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()?
        };

        let raw = raw.ok_or_else(|| StorageError::Absent(key.to_string()))?;
        serde_json::from_str(&raw).map_err(|e| StorageError::Corrupt {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}
