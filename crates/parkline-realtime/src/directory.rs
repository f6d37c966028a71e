//! 예약 디렉토리.
//!
//! 현재 사용자 예약의 클라이언트 캐시. 전체 재조회 시 통째로 교체하고,
//! 새 예약 시간대의 겹침을 사전 검사한다 (서버가 최종 판단).
//!
//! 재조회 요청(주기 타이머, 푸시 프레임, 취소 후)은 모두 `ReloadQueue`로 들어가고,
//! `ReloadWorker`가 쌓인 요청을 한 번의 조회로 합쳐 처리한다.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use parkline_core::error::CoreError;
use parkline_core::models::reservation::{
    ConfirmationRequest, CreateReservationRequest, Reservation,
};
use parkline_core::ports::api_client::ApiClient;
use parkline_core::ports::identity::IdentityProvider;
use parkline_core::ports::notifier::Notifier;
use parkline_core::ports::presenter::StatusPresenter;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

/// 대기 중인 재조회 요청 상한 (넘치면 어차피 합쳐지므로 버림)
const RELOAD_QUEUE_SIZE: usize = 32;

/// 재조회 요청 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadTrigger {
    /// 주기 타이머
    Timer,
    /// `reservation_update` 푸시
    PushFrame,
    /// 취소 성공 후
    PostCancel,
}

/// 재조회 요청 송신 측
#[derive(Clone)]
pub struct ReloadQueue {
    tx: mpsc::Sender<ReloadTrigger>,
}

impl ReloadQueue {
    /// 재조회 요청 (대기열이 가득 차 있으면 이미 조회가 예정된 것이므로 버림)
    pub fn request(&self, trigger: ReloadTrigger) {
        match self.tx.try_send(trigger) {
            Ok(()) => debug!("예약 재조회 요청: {trigger:?}"),
            Err(mpsc::error::TrySendError::Full(_)) => {
                debug!("예약 재조회 대기열 가득 참, {trigger:?} 합침")
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                debug!("예약 재조회 작업 종료됨, {trigger:?} 무시")
            }
        }
    }
}

/// 재조회 요청 소비 측
pub struct ReloadWorker {
    rx: mpsc::Receiver<ReloadTrigger>,
    directory: Arc<ReservationDirectory>,
}

impl ReloadWorker {
    /// 대기 중인 요청을 모두 비우고 한 번 조회
    ///
    /// 요청이 하나도 없었으면 `None`, 있었으면 합쳐진 요청 수.
    pub async fn process_pending(&mut self) -> Option<usize> {
        let first = self.rx.try_recv().ok()?;
        Some(self.reload_after(first).await)
    }

    async fn reload_after(&mut self, first: ReloadTrigger) -> usize {
        let mut coalesced = 1;
        while self.rx.try_recv().is_ok() {
            coalesced += 1;
        }
        debug!("예약 재조회 ({first:?} 외 {}건 합침)", coalesced - 1);
        self.directory.load_all().await;
        coalesced
    }

    /// 재조회 루프
    pub async fn run(mut self, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            tokio::select! {
                trigger = self.rx.recv() => {
                    let Some(trigger) = trigger else { break };
                    self.reload_after(trigger).await;
                }
                _ = shutdown_rx.changed() => {
                    info!("예약 재조회 루프 종료");
                    break;
                }
            }
        }
    }
}

/// 예약 디렉토리
pub struct ReservationDirectory {
    api: Arc<dyn ApiClient>,
    identity: Arc<dyn IdentityProvider>,
    notifier: Arc<dyn Notifier>,
    presenter: Arc<dyn StatusPresenter>,
    cache: Mutex<HashMap<String, Reservation>>,
    reloads: ReloadQueue,
    send_confirmation: bool,
}

impl ReservationDirectory {
    /// 디렉토리 + 재조회 작업 생성
    pub fn new(
        api: Arc<dyn ApiClient>,
        identity: Arc<dyn IdentityProvider>,
        notifier: Arc<dyn Notifier>,
        presenter: Arc<dyn StatusPresenter>,
        send_confirmation: bool,
    ) -> (Arc<Self>, ReloadWorker) {
        let (tx, rx) = mpsc::channel(RELOAD_QUEUE_SIZE);
        let directory = Arc::new(Self {
            api,
            identity,
            notifier,
            presenter,
            cache: Mutex::new(HashMap::new()),
            reloads: ReloadQueue { tx },
            send_confirmation,
        });
        let worker = ReloadWorker {
            rx,
            directory: directory.clone(),
        };
        (directory, worker)
    }

    /// 재조회 요청 핸들
    pub fn reloads(&self) -> ReloadQueue {
        self.reloads.clone()
    }

    /// 전체 예약 조회
    ///
    /// 성공하면 캐시를 통째로 교체하고 받은 목록을 돌려준다.
    /// 실패하면 에러를 표시하고 현재 캐시 내용을 돌려준다.
    pub async fn load_all(&self) -> Vec<Reservation> {
        match self.api.list_reservations().await {
            Ok(list) => {
                {
                    let mut cache = self.cache.lock();
                    cache.clear();
                    for reservation in &list {
                        cache.insert(reservation.reservation_id.clone(), reservation.clone());
                    }
                }
                debug!("예약 캐시 교체: {}건", list.len());
                self.presenter.render_reservations(&list);
                list
            }
            Err(e) => {
                warn!("예약 목록 조회 실패: {e}");
                self.report_error(&format!("예약 목록을 불러오지 못했습니다: {e}"))
                    .await;
                self.cached()
            }
        }
    }

    /// 예약 생성
    ///
    /// 검증과 겹침 검사를 통과해야 전송한다. 캐시는 서버 응답으로만 갱신한다.
    pub async fn create(&self, request: &CreateReservationRequest) -> Result<Reservation, CoreError> {
        if let Err(e) = request.validate(Utc::now()) {
            self.report_error(&e.to_string()).await;
            return Err(e);
        }

        if self.check_conflict(request.start_time, request.end_time) {
            let e = CoreError::Conflict("같은 시간대에 이미 예약이 있습니다".to_string());
            self.report_error(&e.to_string()).await;
            return Err(e);
        }

        let reservation = match self.api.create_reservation(request).await {
            Ok(reservation) => reservation,
            Err(e) => {
                warn!("예약 생성 실패: {e}");
                self.report_error(&format!("예약을 만들지 못했습니다: {e}"))
                    .await;
                return Err(e);
            }
        };

        self.cache
            .lock()
            .insert(reservation.reservation_id.clone(), reservation.clone());
        info!("예약 생성: {}", reservation.reservation_id);
        self.presenter.render_reservations(&self.cached());

        if self.send_confirmation {
            self.confirm(&reservation).await;
        }

        let body = format!(
            "{} ~ {}",
            reservation.start_time.format("%Y-%m-%d %H:%M"),
            reservation.end_time.format("%H:%M")
        );
        if let Err(e) = self.notifier.show_notification("예약 완료", &body).await {
            warn!("알림 표시 실패: {e}");
        }

        Ok(reservation)
    }

    /// 확인 메일 요청 (실패해도 로그만)
    async fn confirm(&self, reservation: &Reservation) {
        let Some(user) = self.identity.current_user().await else {
            debug!("세션 없음, 확인 메일 생략");
            return;
        };
        if user.email.is_empty() {
            debug!("이메일 없음, 확인 메일 생략");
            return;
        }

        let request = ConfirmationRequest::for_reservation(reservation, &user.email);
        if let Err(e) = self.api.send_confirmation(&request).await {
            warn!("확인 메일 요청 실패: {e}");
        }
    }

    /// 예약 취소
    ///
    /// 실패하면 캐시는 그대로 두고 에러를 표시한다.
    pub async fn cancel(&self, reservation_id: &str) -> Result<(), CoreError> {
        if let Err(e) = self.api.cancel_reservation(reservation_id).await {
            warn!("예약 취소 실패 ({reservation_id}): {e}");
            self.report_error(&format!("예약을 취소하지 못했습니다: {e}"))
                .await;
            return Err(e);
        }

        self.forget(reservation_id);
        info!("예약 취소: {reservation_id}");
        self.reloads.request(ReloadTrigger::PostCancel);

        if let Err(e) = self
            .notifier
            .show_notification("예약 취소", reservation_id)
            .await
        {
            warn!("알림 표시 실패: {e}");
        }
        Ok(())
    }

    /// 캐시에서 제거 (서버 측 취소 알림)
    pub fn forget(&self, reservation_id: &str) -> bool {
        self.cache.lock().remove(reservation_id).is_some()
    }

    /// `[start, end)`가 활성 예약(PENDING/CONFIRMED)과 겹치는지
    pub fn check_conflict(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> bool {
        self.cache
            .lock()
            .values()
            .any(|r| r.status.is_active() && r.overlaps(start, end))
    }

    /// 캐시 내용 (시작 시각순)
    pub fn cached(&self) -> Vec<Reservation> {
        let mut list: Vec<Reservation> = self.cache.lock().values().cloned().collect();
        list.sort_by(|a, b| {
            a.start_time
                .cmp(&b.start_time)
                .then_with(|| a.reservation_id.cmp(&b.reservation_id))
        });
        list
    }

    async fn report_error(&self, message: &str) {
        if let Err(e) = self.notifier.show_error(message).await {
            warn!("알림 표시 실패: {e}");
        }
    }
}
