//! 점유 현황 조정기.
//!
//! 실시간 푸시와 로컬 캐시를 하나의 "현재 점유 현황"으로 합친다.
//!
//! 안티 플리커 규칙: 이미지 분석 마커가 없는 스냅샷이 `occupiedSpaces == 0`을 보고하면
//! 마지막으로 수락된 이미지 분석 점유값으로 덮어쓰고, 그런 값이 없으면 업데이트를 버린다.

use chrono::Utc;
use parking_lot::Mutex;
use parkline_core::error::CoreError;
use parkline_core::models::occupancy::{HistoryEntry, Occupancy, OccupancySnapshot};
use parkline_core::ports::api_client::ApiClient;
use parkline_core::ports::presenter::StatusPresenter;
use parkline_storage::{keys, KeyValueStore};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::history::OccupancyHistory;

/// 점유 현황 조정기
pub struct StatusReconciler {
    store: Arc<KeyValueStore>,
    presenter: Arc<dyn StatusPresenter>,
    /// 마지막으로 수락된 이미지 분석 점유값
    last_good: Mutex<Option<Occupancy>>,
    history: Mutex<OccupancyHistory>,
}

impl StatusReconciler {
    pub fn new(
        store: Arc<KeyValueStore>,
        presenter: Arc<dyn StatusPresenter>,
        max_history: usize,
    ) -> Self {
        Self {
            store,
            presenter,
            last_good: Mutex::new(None),
            history: Mutex::new(OccupancyHistory::new(max_history)),
        }
    }

    /// 저장된 현황/이력 복원 후 렌더링
    ///
    /// 채널이 다시 연결되기 전에도 마지막 상태를 보여줄 수 있다.
    pub fn restore(&self) -> Option<OccupancySnapshot> {
        let stored_history: Vec<HistoryEntry> = self.store.get(keys::HISTORY).unwrap_or_default();
        let history = {
            let mut history = self.history.lock();
            let max_size = history.max_size();
            *history = OccupancyHistory::from_entries(stored_history, max_size);
            history.to_vec()
        };

        let current: Option<OccupancySnapshot> = self.store.get(keys::CURRENT_STATUS);

        // 메모는 이미지 분석값에서만 채운다. 현재값이 하트비트면 이력의 최신 항목을 쓴다.
        let memo = match &current {
            Some(snapshot) if snapshot.is_image_derived() => Some(snapshot.occupancy()),
            _ => history.first().map(|entry| Occupancy {
                available_spaces: entry.available_spaces,
                occupied_spaces: entry.occupied_spaces,
                occupancy_rate: entry.occupancy_rate,
            }),
        };
        *self.last_good.lock() = memo;

        if let Some(snapshot) = &current {
            self.presenter.render_status(snapshot);
        }
        if !history.is_empty() {
            self.presenter.render_history(&history);
        }

        info!(
            "저장된 상태 복원: 현황={}, 이력={}건",
            current.is_some(),
            history.len()
        );
        current
    }

    /// 저장된 현황이 없으면 초기 스냅샷(전 면 비어 있음)을 적용
    pub fn seed_initial(&self, lot_id: &str, total_spaces: u32) -> Option<OccupancySnapshot> {
        if self.store.get::<OccupancySnapshot>(keys::CURRENT_STATUS).is_some() {
            debug!("저장된 현황이 있어 초기 시드 생략");
            return None;
        }
        let initial = OccupancySnapshot::initial(lot_id, total_spaces, Utc::now());
        self.apply_update(initial, "initial_load")
    }

    /// 스냅샷 적용
    ///
    /// 버려진 경우 `None`. 수락되면 저장소에서 다시 읽은 값을 렌더러에 넘기고 돌려준다.
    pub fn apply_update(
        &self,
        snapshot: OccupancySnapshot,
        source: &str,
    ) -> Option<OccupancySnapshot> {
        let image_derived = snapshot.is_image_derived();

        let accepted = if !image_derived && snapshot.occupied_spaces == 0 {
            let memo = *self.last_good.lock();
            match memo {
                Some(good) => {
                    debug!(
                        "[{source}] 0 점유 하트비트, 마지막 분석값({}/{}) 유지",
                        good.occupied_spaces,
                        good.available_spaces + good.occupied_spaces
                    );
                    snapshot.with_occupancy(good)
                }
                None => {
                    debug!("[{source}] 0 점유 하트비트, 이전 분석값 없음, 무시");
                    return None;
                }
            }
        } else {
            snapshot
        };

        if image_derived {
            *self.last_good.lock() = Some(accepted.occupancy());
        }

        if let Err(e) = self.store.put(keys::CURRENT_STATUS, &accepted) {
            warn!("[{source}] 현황 저장 실패: {e}");
        }
        let current = self
            .store
            .get::<OccupancySnapshot>(keys::CURRENT_STATUS)
            .unwrap_or(accepted);

        if image_derived {
            self.add_to_history(&current);
        }

        debug!(
            "[{source}] 현황 갱신: 빈 면 {}, 점유 {}, {:.1}%",
            current.available_spaces, current.occupied_spaces, current.occupancy_rate
        );
        self.presenter.render_status(&current);
        Some(current)
    }

    /// 이력 추가: 검증 실패 시 로그만 남기고 무시
    pub fn add_to_history(&self, snapshot: &OccupancySnapshot) -> bool {
        let entry = match HistoryEntry::from_snapshot(snapshot) {
            Ok(entry) => entry,
            Err(e) => {
                debug!("이력 추가 생략: {e}");
                return false;
            }
        };

        let entries = {
            let mut history = self.history.lock();
            history.push(entry);
            history.to_vec()
        };

        if let Err(e) = self.store.put(keys::HISTORY, &entries) {
            warn!("이력 저장 실패: {e}");
        }
        self.presenter.render_history(&entries);
        true
    }

    /// `GET /status`로 현황 새로고침
    pub async fn refresh_from(
        &self,
        api: &dyn ApiClient,
    ) -> Result<Option<OccupancySnapshot>, CoreError> {
        let snapshot = api.fetch_status().await?;
        Ok(self.apply_update(snapshot, "refresh"))
    }

    /// 저장된 현재 현황
    pub fn current(&self) -> Option<OccupancySnapshot> {
        self.store.get(keys::CURRENT_STATUS)
    }

    /// 최신순 이력
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.history.lock().to_vec()
    }
}
