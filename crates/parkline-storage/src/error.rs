//! 저장소 에러.

use parkline_core::error::CoreError;
use thiserror::Error;

/// 키/값 읽기·쓰기 실패 유형
///
/// `Absent`와 `Expired`는 정상 흐름이다. 호출자 대부분은 `KeyValueStore::get`으로 전부 `None`으로 접는다.
#[derive(Debug, Error)]
pub enum StorageError {
    /// 키 없음
    #[error("키 없음: {0}")]
    Absent(String),

    /// 만료되어 삭제됨
    #[error("만료된 항목: {0}")]
    Expired(String),

    /// 봉투 또는 값 파싱 실패
    #[error("손상된 항목 '{key}': {reason}")]
    Corrupt { key: String, reason: String },

    /// SQLite 또는 직렬화 실패
    #[error("저장소 백엔드 오류: {0}")]
    Backend(String),
}

impl StorageError {
    /// 키가 없거나 만료된 경우 (데이터 문제가 아님)
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Absent(_) | Self::Expired(_))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(e: rusqlite::Error) -> Self {
        Self::Backend(e.to_string())
    }
}

impl From<StorageError> for CoreError {
    fn from(e: StorageError) -> Self {
        CoreError::Storage(e.to_string())
    }
}
