//! 앱 조립 (DI) 및 명령 실행.
//!
//! 설정에서 어댑터를 만들고 코어 컴포넌트에 주입한다.
//! 단발 명령(예약/차트/현황)과 상주 모드(`run`)가 같은 조립 결과를 쓴다.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration as ChronoDuration, Local, NaiveDateTime, TimeZone, Utc};
use parkline_core::config::AppConfig;
use parkline_core::config_manager::ConfigManager;
use parkline_core::models::chart::ChartType;
use parkline_core::models::reservation::CreateReservationRequest;
use parkline_core::models::session::ConnectionState;
use parkline_core::ports::api_client::ApiClient;
use parkline_core::ports::identity::IdentityProvider;
use parkline_core::ports::notifier::Notifier;
use parkline_core::ports::presenter::StatusPresenter;
use parkline_network::auth::TokenManager;
use parkline_network::connection::ConnectionManager;
use parkline_network::http_client::HttpApiClient;
use parkline_network::ws_client::WsClient;
use parkline_realtime::charts::ChartLoader;
use parkline_realtime::directory::{ReloadWorker, ReservationDirectory};
use parkline_realtime::dispatcher::FrameDispatcher;
use parkline_realtime::reconciler::StatusReconciler;
use parkline_storage::KeyValueStore;
use std::io::BufRead;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};

use crate::lifecycle::LifecycleManager;
use crate::scheduler::{Scheduler, SchedulerConfig};
use crate::session;

/// 종료 시 채널 정리를 기다리는 최대 시간
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// DB 파일 이름
const DB_FILE_NAME: &str = "parkline.db";

/// DB 경로 결정 (설정값 → 플랫폼 데이터 디렉토리 → 현재 디렉토리)
///
/// - macOS: `~/Library/Application Support/com.parkline.client/parkline.db`
/// - Linux: `~/.local/share/client/parkline.db`
pub fn resolve_db_path(config: &AppConfig) -> PathBuf {
    if let Some(path) = &config.storage.db_path {
        return path.clone();
    }
    match ConfigManager::data_dir() {
        Ok(dir) => dir.join(DB_FILE_NAME),
        Err(e) => {
            warn!("데이터 디렉토리 확인 실패, 현재 디렉토리 사용: {e}");
            PathBuf::from(DB_FILE_NAME)
        }
    }
}

/// 시각 인자 파싱
///
/// RFC 3339(`2026-03-01T10:00:00+09:00`) 또는 로컬 시각(`2026-03-01T10:00`, `2026-03-01 10:00`).
pub fn parse_time(input: &str) -> Result<DateTime<Utc>, String> {
    if let Ok(t) = DateTime::parse_from_rfc3339(input) {
        return Ok(t.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M", "%Y-%m-%d %H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, format) {
            return Local
                .from_local_datetime(&naive)
                .earliest()
                .map(|t| t.with_timezone(&Utc))
                .ok_or_else(|| format!("존재하지 않는 로컬 시각: {input}"));
        }
    }
    Err(format!("시각 형식 오류: {input} (예: 2026-03-01T10:00)"))
}

/// 상주 모드 콘솔 입력
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsoleCommand {
    Reconnect,
    Status,
    History,
    Reservations,
    Help,
    Quit,
}

impl ConsoleCommand {
    pub fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "r" | "reconnect" => Some(Self::Reconnect),
            "s" | "status" => Some(Self::Status),
            "h" | "history" => Some(Self::History),
            "l" | "list" => Some(Self::Reservations),
            "?" | "help" => Some(Self::Help),
            "q" | "quit" | "exit" => Some(Self::Quit),
            _ => None,
        }
    }
}

const CONSOLE_HELP: &str = "명령: r(재연결) s(현황) h(이력) l(예약) q(종료)";

/// 조립된 앱
pub struct App {
    config: AppConfig,
    store: Arc<KeyValueStore>,
    tokens: Arc<TokenManager>,
    api: Arc<dyn ApiClient>,
    presenter: Arc<dyn StatusPresenter>,
    notifier: Arc<dyn Notifier>,
    reconciler: Arc<StatusReconciler>,
    directory: Arc<ReservationDirectory>,
    reload_worker: ReloadWorker,
    charts: ChartLoader,
}

impl App {
    /// 어댑터 생성 + 주입
    pub async fn build(
        config: AppConfig,
        presenter: Arc<dyn StatusPresenter>,
        notifier: Arc<dyn Notifier>,
    ) -> Result<Self> {
        let db_path = resolve_db_path(&config);
        let store = Arc::new(
            KeyValueStore::open(&db_path)
                .with_context(|| format!("저장소 열기 실패: {}", db_path.display()))?,
        );
        info!("저장소: {}", db_path.display());

        let tokens = Arc::new(TokenManager::new(&config.auth));
        if session::restore(&store, &tokens).await {
            debug!("저장된 세션 사용");
        }

        let api: Arc<dyn ApiClient> = Arc::new(
            HttpApiClient::new(&config.server.base_url, tokens.clone(), config.request_timeout())?
                .with_max_retries(config.server.max_retries),
        );
        info!("서버: {}", config.server.base_url);

        let reconciler = Arc::new(StatusReconciler::new(
            store.clone(),
            presenter.clone(),
            config.realtime.max_history,
        ));
        let (directory, reload_worker) = ReservationDirectory::new(
            api.clone(),
            tokens.clone(),
            notifier.clone(),
            presenter.clone(),
            config.reservations.send_confirmation,
        );
        let charts = ChartLoader::new(
            api.clone(),
            store.clone(),
            presenter.clone(),
            config.chart_ttl(),
        );

        Ok(Self {
            config,
            store,
            tokens,
            api,
            presenter,
            notifier,
            reconciler,
            directory,
            reload_worker,
            charts,
        })
    }

    /// `login --code`
    pub async fn login(&self, code: &str) -> Result<()> {
        session::login(&self.store, &self.tokens, code).await?;
        if let Some(user) = self.tokens.current_user().await {
            println!("✅ 로그인: {} ({})", user.email, user.sub);
        }
        Ok(())
    }

    /// `reservations list`
    pub async fn list_reservations(&self) -> Result<()> {
        session::require(&self.store, &self.tokens).await?;
        self.directory.load_all().await;
        Ok(())
    }

    /// `reservations create`
    pub async fn create_reservation(
        &self,
        start: DateTime<Utc>,
        end: Option<DateTime<Utc>>,
        hours: i64,
    ) -> Result<()> {
        session::require(&self.store, &self.tokens).await?;
        let end = end.unwrap_or(start + ChronoDuration::hours(hours));

        // 겹침 검사는 캐시 기준이므로 먼저 채운다
        self.directory.load_all().await;
        let reservation = self
            .directory
            .create(&CreateReservationRequest::new(start, end))
            .await?;
        println!("✅ 예약 생성: {}", reservation.reservation_id);
        Ok(())
    }

    /// `reservations cancel`
    pub async fn cancel_reservation(&mut self, reservation_id: &str) -> Result<()> {
        session::require(&self.store, &self.tokens).await?;
        self.directory.cancel(reservation_id).await?;
        // 취소 후 재조회 요청을 바로 처리
        self.reload_worker.process_pending().await;
        Ok(())
    }

    /// `chart`
    pub async fn chart(&self, chart_type: Option<ChartType>) -> Result<()> {
        session::require(&self.store, &self.tokens).await?;
        let chart_type = chart_type.unwrap_or_else(|| self.charts.last_chart_type());
        self.charts.load(chart_type).await?;
        Ok(())
    }

    /// `status`: 저장된 현황을 보여주고, 세션이 있으면 서버에서 새로 받는다
    pub async fn status(&self) -> Result<()> {
        if self.reconciler.restore().is_none() {
            println!("저장된 현황 없음");
        }
        if session::require(&self.store, &self.tokens).await.is_ok() {
            if let Err(e) = self.reconciler.refresh_from(self.api.as_ref()).await {
                warn!("현황 새로고침 실패: {e}");
            }
        }
        Ok(())
    }

    /// 상주 모드: 복원 → 시드 → 연결 → 주기 작업 → 종료 신호 대기
    pub async fn run(self) -> Result<()> {
        let App {
            config,
            store,
            tokens,
            api,
            presenter,
            notifier,
            reconciler,
            directory,
            reload_worker,
            charts,
        } = self;

        // 채널 연결 전에 마지막 상태부터 보여준다
        reconciler.restore();
        reconciler.seed_initial(&config.realtime.lot_id, config.realtime.total_spaces);

        session::require(&store, &tokens).await?;

        let lifecycle = Arc::new(LifecycleManager::new());

        directory.load_all().await;
        let worker_task = tokio::spawn(reload_worker.run(lifecycle.subscribe()));

        let transport = Arc::new(WsClient::new(&config.realtime.ws_url, tokens.clone()));
        let (connection, frames) =
            ConnectionManager::new(&config.realtime, transport, notifier.clone());

        let state_task = tokio::spawn(render_connection(
            connection.subscribe(),
            presenter.clone(),
            lifecycle.subscribe(),
        ));

        let dispatcher = FrameDispatcher::new(reconciler.clone(), directory.clone(), api.clone());
        let dispatch_shutdown = lifecycle.subscribe();
        let dispatch_task =
            tokio::spawn(async move { dispatcher.run(frames, dispatch_shutdown).await });

        let connection_task = tokio::spawn(connection.clone().run(lifecycle.subscribe()));

        if let Err(e) = charts.load(charts.last_chart_type()).await {
            warn!("차트 로드 실패: {e}");
        }

        let scheduler = Scheduler::new(
            SchedulerConfig::from_app(&config),
            store.clone(),
            tokens.clone(),
            notifier.clone(),
            directory.reloads(),
        );
        let sched_shutdown = lifecycle.subscribe();
        let sched_task = tokio::spawn(async move { scheduler.run(sched_shutdown).await });

        let console = ConsoleContext {
            connection: connection.clone(),
            reconciler: reconciler.clone(),
            directory: directory.clone(),
            presenter: presenter.clone(),
            lifecycle: lifecycle.clone(),
        };
        let console_task = tokio::spawn(console.run(spawn_stdin_reader()));

        info!("PARKLINE 실행 중 (Ctrl+C로 종료)");
        println!("{CONSOLE_HELP}");

        let mut shutdown_rx = lifecycle.subscribe();
        tokio::select! {
            _ = lifecycle.wait_for_signal() => {}
            _ = shutdown_rx.changed() => {}
        }

        if tokio::time::timeout(SHUTDOWN_GRACE, connection_task)
            .await
            .is_err()
        {
            warn!("채널 종료 대기 시간 초과");
        }
        for task in [worker_task, state_task, dispatch_task, sched_task, console_task] {
            task.abort();
        }

        session::persist(&store, &tokens).await;
        info!("PARKLINE 종료");
        Ok(())
    }
}

/// 연결 상태 변경을 렌더러로 전달
async fn render_connection(
    mut state_rx: watch::Receiver<ConnectionState>,
    presenter: Arc<dyn StatusPresenter>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let initial = *state_rx.borrow_and_update();
    presenter.render_connection(initial);

    loop {
        tokio::select! {
            changed = state_rx.changed() => {
                if changed.is_err() {
                    break;
                }
                let state = *state_rx.borrow_and_update();
                presenter.render_connection(state);
            }
            _ = shutdown_rx.changed() => break,
        }
    }
}

/// 표준 입력 줄 읽기 스레드
///
/// 블로킹 읽기가 런타임 종료를 막지 않도록 전용 스레드에서 읽는다.
fn spawn_stdin_reader() -> mpsc::UnboundedReceiver<String> {
    let (tx, rx) = mpsc::unbounded_channel();
    let spawned = std::thread::Builder::new()
        .name("console-input".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            for line in stdin.lock().lines() {
                let Ok(line) = line else { break };
                if tx.send(line).is_err() {
                    break;
                }
            }
        });
    if let Err(e) = spawned {
        warn!("콘솔 입력 스레드 시작 실패: {e}");
    }
    rx
}

/// 상주 모드 콘솔 명령 처리기
struct ConsoleContext {
    connection: Arc<ConnectionManager>,
    reconciler: Arc<StatusReconciler>,
    directory: Arc<ReservationDirectory>,
    presenter: Arc<dyn StatusPresenter>,
    lifecycle: Arc<LifecycleManager>,
}

impl ConsoleContext {
    async fn run(self, mut lines: mpsc::UnboundedReceiver<String>) {
        while let Some(line) = lines.recv().await {
            let Some(command) = ConsoleCommand::parse(&line) else {
                if !line.trim().is_empty() {
                    println!("{CONSOLE_HELP}");
                }
                continue;
            };
            debug!("콘솔 명령: {command:?}");

            match command {
                ConsoleCommand::Reconnect => self.connection.reconnect().await,
                ConsoleCommand::Status => match self.reconciler.current() {
                    Some(snapshot) => self.presenter.render_status(&snapshot),
                    None => println!("저장된 현황 없음"),
                },
                ConsoleCommand::History => {
                    self.presenter.render_history(&self.reconciler.history());
                }
                ConsoleCommand::Reservations => {
                    self.presenter.render_reservations(&self.directory.cached());
                }
                ConsoleCommand::Help => println!("{CONSOLE_HELP}"),
                ConsoleCommand::Quit => {
                    self.lifecycle.shutdown();
                    break;
                }
            }
        }
    }
}
