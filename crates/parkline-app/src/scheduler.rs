//! 3-루프 스케줄러.
//!
//! 차트 캐시 정리(1시간), 세션 만료 검사(1분), 예약 재조회(30초) 오케스트레이션.
//! 각 루프는 작업을 끝낸 뒤 다음 틱을 기다리므로 자기 자신과 겹치지 않는다.

use parkline_core::config::AppConfig;
use parkline_core::ports::notifier::Notifier;
use parkline_network::auth::TokenManager;
use parkline_realtime::directory::{ReloadQueue, ReloadTrigger};
use parkline_storage::KeyValueStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::session;

/// 스케줄러 설정
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// 차트 캐시 정리 간격
    pub cleanup_interval: Duration,
    /// 차트 캐시 보존 기간
    pub chart_retention: Duration,
    /// 세션 만료 검사 간격
    pub session_check_interval: Duration,
    /// 예약 재조회 간격
    pub reload_interval: Duration,
}

impl SchedulerConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            cleanup_interval: config.cleanup_interval(),
            chart_retention: config.chart_retention(),
            session_check_interval: config.session_check_interval(),
            reload_interval: config.reload_interval(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self::from_app(&AppConfig::default_config())
    }
}

/// 세션 검사 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCheck {
    /// 로그인한 적 없음
    Absent,
    /// 유효
    Valid,
    /// 만료되어 갱신함
    Refreshed,
    /// 만료 + 갱신 실패 → 세션 폐기
    Expired,
}

/// 세션 만료 검사
///
/// 만료된 세션은 갱신을 시도하고, 실패하면 세션을 지우고 재로그인을 안내한다.
/// 폐기 후에는 `Absent`가 되므로 안내는 한 번만 나간다.
pub async fn check_session(
    store: &KeyValueStore,
    tokens: &TokenManager,
    notifier: &dyn Notifier,
) -> SessionCheck {
    if tokens.token_set().await.is_none() {
        return SessionCheck::Absent;
    }
    if tokens.is_authenticated().await {
        return SessionCheck::Valid;
    }

    match tokens.refresh().await {
        Ok(_) => {
            session::persist(store, tokens).await;
            info!("만료된 세션 갱신");
            SessionCheck::Refreshed
        }
        Err(e) => {
            warn!("세션 갱신 실패: {e}");
            tokens.clear().await;
            session::forget(store);
            let message = format!("세션이 만료되었습니다. {}", session::LOGIN_HINT);
            if let Err(e) = notifier.show_error(&message).await {
                warn!("알림 표시 실패: {e}");
            }
            SessionCheck::Expired
        }
    }
}

/// 주기 작업 스케줄러
pub struct Scheduler {
    config: SchedulerConfig,
    store: Arc<KeyValueStore>,
    tokens: Arc<TokenManager>,
    notifier: Arc<dyn Notifier>,
    reloads: ReloadQueue,
}

impl Scheduler {
    pub fn new(
        config: SchedulerConfig,
        store: Arc<KeyValueStore>,
        tokens: Arc<TokenManager>,
        notifier: Arc<dyn Notifier>,
        reloads: ReloadQueue,
    ) -> Self {
        Self {
            config,
            store,
            tokens,
            notifier,
            reloads,
        }
    }

    /// 모든 루프 시작, 종료 신호까지 대기
    pub async fn run(&self, mut shutdown_rx: watch::Receiver<bool>) {
        info!(
            "스케줄러 시작: 정리={}s, 세션={}s, 재조회={}s",
            self.config.cleanup_interval.as_secs(),
            self.config.session_check_interval.as_secs(),
            self.config.reload_interval.as_secs(),
        );

        // ============================================================
        // 1. 차트 캐시 정리 루프
        // ============================================================
        let store1 = self.store.clone();
        let retention = self.config.chart_retention;
        let cleanup_every = self.config.cleanup_interval;
        let mut shutdown1 = shutdown_rx.clone();

        let cleanup_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(cleanup_every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = store1.cleanup_chart_cache(retention);
                        debug!("차트 캐시 정리 틱: {removed}개 삭제");
                    }
                    _ = shutdown1.changed() => {
                        info!("차트 캐시 정리 루프 종료");
                        break;
                    }
                }
            }
        });

        // ============================================================
        // 2. 세션 만료 검사 루프
        // ============================================================
        let store2 = self.store.clone();
        let tokens2 = self.tokens.clone();
        let notifier2 = self.notifier.clone();
        let session_every = self.config.session_check_interval;
        let mut shutdown2 = shutdown_rx.clone();

        let session_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(session_every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let outcome = check_session(&store2, &tokens2, notifier2.as_ref()).await;
                        debug!("세션 검사: {outcome:?}");
                    }
                    _ = shutdown2.changed() => {
                        info!("세션 검사 루프 종료");
                        break;
                    }
                }
            }
        });

        // ============================================================
        // 3. 예약 재조회 루프 (시작 시 조회는 호출자가 이미 했으므로 첫 틱 건너뜀)
        // ============================================================
        let reloads = self.reloads.clone();
        let reload_every = self.config.reload_interval;
        let mut shutdown3 = shutdown_rx.clone();

        let reload_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(reload_every);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            interval.tick().await;

            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        reloads.request(ReloadTrigger::Timer);
                    }
                    _ = shutdown3.changed() => {
                        info!("예약 재조회 타이머 종료");
                        break;
                    }
                }
            }
        });

        let _ = shutdown_rx.changed().await;
        info!("스케줄러 종료 신호 수신");

        cleanup_task.abort();
        session_task.abort();
        reload_task.abort();
    }
}
