//! # parkline-storage
//!
//! 로컬 저장소 어댑터.
//! SQLite 기반 키/값 캐시. 모든 값은 저장 시각(ms)을 담은 봉투로 감싸 저장하고,
//! 만료 시각이 있는 항목은 읽을 때 지워진다.
//!
//! ## 모듈
//! - `sqlite`: 키/값 저장소 (`KeyValueStore`)
//! - `error`: 저장소 에러 (`StorageError`)
//! - `migration`: 스키마 마이그레이션
//! - [`keys`]: 영속 키 이름

pub mod error;
pub mod migration;
pub mod sqlite;

pub use error::StorageError;
pub use sqlite::KeyValueStore;

/// 영속 키
pub mod keys {
    use parkline_core::models::chart::ChartType;

    /// 마지막으로 수락된 점유 스냅샷
    pub const CURRENT_STATUS: &str = "CURRENT_STATUS";
    /// 이력 로그 (최신순)
    pub const HISTORY: &str = "HISTORY";
    /// 마지막으로 본 차트 종류
    pub const LAST_CHART_TYPE: &str = "LAST_CHART_TYPE";
    /// 인증 토큰 묶음
    pub const AUTH_TOKENS: &str = "AUTH_TOKENS";
    /// 차트 캐시 키 접두사: 정리 작업이 이 접두사로 대상 키를 고른다
    pub const CHART_CACHE_PREFIX: &str = "chart_cache_";

    /// 차트 종류별 캐시 키 (`chart_cache_daily` 등)
    pub fn chart_cache(chart_type: ChartType) -> String {
        format!("{CHART_CACHE_PREFIX}{}", chart_type.as_str())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn chart_cache_keys_share_prefix() {
            assert_eq!(chart_cache(ChartType::Daily), "chart_cache_daily");
            assert_eq!(chart_cache(ChartType::Weekly), "chart_cache_weekly");
            assert!(chart_cache(ChartType::Weekly).starts_with(CHART_CACHE_PREFIX));
        }
    }
}
