//! 실시간 프레임 디스패처.
//!
//! 연결 관리자가 넘겨준 원문 프레임을 도착 순서대로 분류해
//! `status_update`는 조정기로, `reservation_update`는 예약 디렉토리로 보낸다.

use parkline_core::models::frame::{LiveFrame, ReservationAction, ReservationChange};
use parkline_core::ports::api_client::ApiClient;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::directory::{ReloadTrigger, ReservationDirectory};
use crate::reconciler::StatusReconciler;

/// 프레임 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatched {
    /// 점유 현황: 수락 여부
    Status { accepted: bool },
    /// 예약 변경: 재조회 요청함
    Reservation,
    /// 알 수 없는 타입
    Unknown,
    /// 파싱 실패
    Malformed,
}

/// 프레임 디스패처
pub struct FrameDispatcher {
    reconciler: Arc<StatusReconciler>,
    directory: Arc<ReservationDirectory>,
    api: Arc<dyn ApiClient>,
}

impl FrameDispatcher {
    pub fn new(
        reconciler: Arc<StatusReconciler>,
        directory: Arc<ReservationDirectory>,
        api: Arc<dyn ApiClient>,
    ) -> Self {
        Self {
            reconciler,
            directory,
            api,
        }
    }

    /// 프레임 1건 처리
    ///
    /// 잘못된 프레임은 원문과 함께 로그만 남긴다.
    pub async fn dispatch(&self, raw: &str) -> Dispatched {
        let frame = match LiveFrame::parse(raw) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("잘못된 프레임 무시: {e}, 원문: {raw}");
                return Dispatched::Malformed;
            }
        };

        match frame {
            LiveFrame::StatusUpdate(snapshot) => {
                let accepted = self.reconciler.apply_update(snapshot, "websocket").is_some();
                Dispatched::Status { accepted }
            }
            LiveFrame::ReservationUpdate(change) => {
                self.handle_reservation_change(change).await;
                Dispatched::Reservation
            }
            LiveFrame::Unknown(frame_type) => {
                debug!("알 수 없는 프레임 타입 무시: {frame_type}");
                Dispatched::Unknown
            }
        }
    }

    async fn handle_reservation_change(&self, change: ReservationChange) {
        debug!(
            "예약 변경 알림: {:?} ({})",
            change.action,
            change.reservation_id.as_deref().unwrap_or("-")
        );

        if change.action == ReservationAction::Cancelled {
            if let Some(id) = &change.reservation_id {
                self.directory.forget(id);
            }
        }
        self.directory.reloads().request(ReloadTrigger::PushFrame);

        if change.action.affects_occupancy() {
            if let Err(e) = self.reconciler.refresh_from(self.api.as_ref()).await {
                warn!("점유 현황 새로고침 실패: {e}");
            }
        }
    }

    /// 디스패치 루프
    pub async fn run(&self, mut frames: mpsc::Receiver<String>, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                raw = frames.recv() => {
                    let Some(raw) = raw else { break };
                    self.dispatch(&raw).await;
                }
                _ = shutdown_rx.changed() => {
                    break;
                }
            }
        }
        info!("프레임 디스패처 종료");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::ReloadWorker;
    use crate::testing::{
        image_snapshot, reservation, signed_in, FakeApi, RecordingNotifier, RecordingPresenter,
    };
    use parkline_core::models::reservation::ReservationStatus;
    use parkline_storage::KeyValueStore;

    struct Fixture {
        dispatcher: FrameDispatcher,
        reconciler: Arc<StatusReconciler>,
        directory: Arc<ReservationDirectory>,
        worker: ReloadWorker,
        api: Arc<FakeApi>,
    }

    fn fixture() -> Fixture {
        let api = Arc::new(FakeApi::default());
        let presenter = Arc::new(RecordingPresenter::default());
        let store = Arc::new(KeyValueStore::open_in_memory().unwrap());
        let reconciler = Arc::new(StatusReconciler::new(store, presenter.clone(), 10));
        let (directory, worker) = ReservationDirectory::new(
            api.clone(),
            Arc::new(signed_in()),
            Arc::new(RecordingNotifier::default()),
            presenter,
            false,
        );
        let dispatcher = FrameDispatcher::new(reconciler.clone(), directory.clone(), api.clone());
        Fixture {
            dispatcher,
            reconciler,
            directory,
            worker,
            api,
        }
    }

    #[tokio::test]
    async fn status_frames_follow_anti_flicker() {
        let f = fixture();

        let heartbeat = r#"{"type":"status_update","data":{"availableSpaces":6,"occupiedSpaces":0,"occupancyRate":0}}"#;
        assert_eq!(
            f.dispatcher.dispatch(heartbeat).await,
            Dispatched::Status { accepted: false }
        );

        let image = serde_json::json!({
            "type": "status_update",
            "data": image_snapshot(2, 4),
        })
        .to_string();
        assert_eq!(
            f.dispatcher.dispatch(&image).await,
            Dispatched::Status { accepted: true }
        );
        assert_eq!(
            f.dispatcher.dispatch(heartbeat).await,
            Dispatched::Status { accepted: true }
        );
        assert_eq!(f.reconciler.current().unwrap().occupied_spaces, 4);
    }

    #[tokio::test]
    async fn malformed_and_unknown_frames_are_ignored() {
        let f = fixture();
        assert_eq!(f.dispatcher.dispatch("not json").await, Dispatched::Malformed);
        assert_eq!(
            f.dispatcher.dispatch(r#"{"data":{}}"#).await,
            Dispatched::Malformed
        );
        assert_eq!(
            f.dispatcher
                .dispatch(r#"{"type":"status_update","data":{"availableSpaces":"x"}}"#)
                .await,
            Dispatched::Malformed
        );
        assert_eq!(
            f.dispatcher.dispatch(r#"{"type":"chat","text":"hi"}"#).await,
            Dispatched::Unknown
        );
        assert!(f.reconciler.current().is_none());
    }

    #[tokio::test]
    async fn reservation_created_reloads_and_refreshes_status() {
        let mut f = fixture();
        *f.api.reservations.lock() = Some(vec![]);
        *f.api.status.lock() = Some(image_snapshot(1, 5));

        let raw = r#"{"type":"reservation_update","action":"created","reservationId":"r-9"}"#;
        assert_eq!(f.dispatcher.dispatch(raw).await, Dispatched::Reservation);

        assert_eq!(FakeApi::calls(&f.api.status_calls), 1);
        assert_eq!(f.reconciler.current().unwrap().occupied_spaces, 5);
        assert_eq!(f.worker.process_pending().await, Some(1));
        assert_eq!(FakeApi::calls(&f.api.list_calls), 1);
    }

    #[tokio::test]
    async fn reservation_cancelled_forgets_entry() {
        let mut f = fixture();
        *f.api.reservations.lock() = Some(vec![reservation(
            "r-1",
            10,
            12,
            ReservationStatus::Confirmed,
        )]);
        f.directory.load_all().await;

        let raw = r#"{"type":"reservation_update","data":{"action":"cancelled","reservationId":"r-1"}}"#;
        f.dispatcher.dispatch(raw).await;
        assert!(f.directory.cached().is_empty());
        assert_eq!(f.worker.process_pending().await, Some(1));
    }

    #[tokio::test]
    async fn reservation_updated_skips_status_refresh() {
        let f = fixture();
        let raw = r#"{"type":"reservation_update","action":"updated"}"#;
        assert_eq!(f.dispatcher.dispatch(raw).await, Dispatched::Reservation);
        assert_eq!(FakeApi::calls(&f.api.status_calls), 0);
    }

    #[tokio::test]
    async fn run_processes_frames_in_order_until_closed() {
        let f = fixture();
        let (tx, rx) = mpsc::channel(8);
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        for occupied in [1, 2, 3] {
            let raw = serde_json::json!({
                "type": "status_update",
                "data": image_snapshot(6 - occupied, occupied),
            })
            .to_string();
            tx.send(raw).await.unwrap();
        }
        drop(tx);

        f.dispatcher.run(rx, shutdown_rx).await;

        let occupied: Vec<u32> = f
            .reconciler
            .history()
            .iter()
            .map(|e| e.occupied_spaces)
            .collect();
        assert_eq!(occupied, vec![3, 2, 1]);
    }
}
