use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::{Envelope, KeyValueStore};
use crate::error::StorageError;
use crate::keys::CHART_CACHE_PREFIX;

impl KeyValueStore {
    /// `prefix`로 시작하고 저장된 지 `max_age`가 지난 항목 삭제
    ///
    /// 봉투를 읽을 수 없는 항목도 함께 지운다. 반환값은 삭제된 키 수.
    pub fn sweep_prefix(
        &self,
        prefix: &str,
        max_age: chrono::Duration,
        now: DateTime<Utc>,
    ) -> Result<usize, StorageError> {
        let cutoff = (now - max_age).timestamp_millis();
        let conn = self.conn.lock();

        // LIKE는 '_'를 와일드카드로 취급하므로 substr로 비교
        let candidates: Vec<(String, String)> = {
            let mut stmt = conn.prepare(
                "SELECT key, envelope FROM kv_store WHERE substr(key, 1, ?2) = ?1",
            )?;
            let rows = stmt.query_map(
                rusqlite::params![prefix, prefix.chars().count() as i64],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )?;
            rows.collect::<Result<_, _>>()?
        };

        let mut deleted = 0;
        for (key, raw) in candidates {
            let stale = match serde_json::from_str::<Envelope<serde_json::Value>>(&raw) {
                Ok(envelope) => envelope.timestamp < cutoff,
                Err(e) => {
                    warn!("손상된 캐시 항목 삭제 '{key}': {e}");
                    true
                }
            };
            if stale {
                deleted += conn.execute("DELETE FROM kv_store WHERE key = ?1", [&key])?;
                debug!("오래된 항목 삭제: {key}");
            }
        }

        Ok(deleted)
    }

    /// 차트 캐시 정리: 스케줄러가 주기적으로 호출
    ///
    /// 실패는 로그만 남긴다.
    pub fn cleanup_chart_cache(&self, retention: std::time::Duration) -> usize {
        let max_age = chrono::Duration::from_std(retention).unwrap_or(chrono::Duration::hours(24));
        match self.sweep_prefix(CHART_CACHE_PREFIX, max_age, Utc::now()) {
            Ok(0) => 0,
            Ok(n) => {
                info!("차트 캐시 정리: {n}개 삭제");
                n
            }
            Err(e) => {
                warn!("차트 캐시 정리 실패: {e}");
                0
            }
        }
    }
}
