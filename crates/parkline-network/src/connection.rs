//! 실시간 채널 연결 관리.
//!
//! `ConnectionStateMachine`은 타이머/전송 계층 없이 상태 전이만 다루고,
//! `ConnectionManager`가 이를 `ChannelTransport`와 주기 타이머(하트비트, watchdog)에 묶어 구동한다.
//!
//! ```text
//! CLOSED ─connect→ CONNECTING ─open→ OPEN ─close/error→ CLOSED ─(지연 후)→ CONNECTING ...
//!                                     └─disconnect→ CLOSING → CLOSED (자동 재연결 없음)
//! ```

use parking_lot::Mutex;
use parkline_core::config::RealtimeConfig;
use parkline_core::error::CoreError;
use parkline_core::models::frame::OutboundFrame;
use parkline_core::models::session::ConnectionState;
use parkline_core::ports::channel::{ChannelMessage, ChannelSender, ChannelTransport};
use parkline_core::ports::notifier::Notifier;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// 디스패처로 넘기는 수신 프레임 버퍼 크기
const FRAME_BUFFER: usize = 256;

/// 채널 종료 처리 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseOutcome {
    /// 이미 대체된 연결의 종료: 무시
    Ignored,
    /// 사용자 종료: 재연결 없음
    Stopped,
    /// 지연 후 재연결
    Reconnect(Duration),
    /// 최대 재연결 횟수 도달: 수동 재연결만 가능
    Exhausted,
}

/// 연결 상태 머신
///
/// 연결 시도마다 세대(generation) 번호를 발급한다. 수동 재연결이나 종료 이후
/// 늦게 도착한 이전 세대의 open/close 이벤트는 무시된다.
#[derive(Debug)]
pub struct ConnectionStateMachine {
    state: ConnectionState,
    generation: u64,
    attempts: u32,
    max_attempts: u32,
    reconnect_delay: Duration,
    exhausted: bool,
    stopped: bool,
}

impl ConnectionStateMachine {
    pub fn new(max_attempts: u32, reconnect_delay: Duration) -> Self {
        Self {
            state: ConnectionState::Closed,
            generation: 0,
            attempts: 0,
            max_attempts,
            reconnect_delay,
            exhausted: false,
            stopped: false,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// 마지막 OPEN 이후 연속 종료 횟수
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    /// CLOSED → CONNECTING. 이미 연결 중/연결됨/종료 중이면 `None`
    pub fn begin_connect(&mut self) -> Option<u64> {
        if self.state != ConnectionState::Closed {
            return None;
        }
        self.state = ConnectionState::Connecting;
        self.stopped = false;
        self.generation += 1;
        Some(self.generation)
    }

    /// CONNECTING → OPEN. 카운터 리셋. 대체된 세대면 `false`
    pub fn on_open(&mut self, generation: u64) -> bool {
        if generation != self.generation || self.state != ConnectionState::Connecting {
            return false;
        }
        self.state = ConnectionState::Open;
        self.attempts = 0;
        self.exhausted = false;
        true
    }

    /// 연결 실패 또는 끊김
    pub fn on_close(&mut self, generation: u64) -> CloseOutcome {
        if generation != self.generation || self.state == ConnectionState::Closed {
            return CloseOutcome::Ignored;
        }
        self.state = ConnectionState::Closed;
        if self.stopped {
            return CloseOutcome::Stopped;
        }

        self.attempts += 1;
        if self.attempts < self.max_attempts {
            CloseOutcome::Reconnect(self.reconnect_delay)
        } else {
            self.exhausted = true;
            CloseOutcome::Exhausted
        }
    }

    /// OPEN/CONNECTING → CLOSING. 이후 자동 연결 중지
    pub fn begin_disconnect(&mut self) -> bool {
        self.stopped = true;
        match self.state {
            ConnectionState::Closed | ConnectionState::Closing => false,
            _ => {
                self.state = ConnectionState::Closing;
                true
            }
        }
    }

    /// CLOSING → CLOSED
    pub fn finish_disconnect(&mut self) {
        self.state = ConnectionState::Closed;
        self.generation += 1;
    }

    /// 수동 재연결 준비: 현재 연결을 버리고 카운터 리셋
    pub fn manual_reset(&mut self) {
        self.state = ConnectionState::Closed;
        self.generation += 1;
        self.attempts = 0;
        self.exhausted = false;
        self.stopped = false;
    }

    /// watchdog/예약 재연결이 연결을 시도해도 되는지
    pub fn should_auto_connect(&self) -> bool {
        self.state == ConnectionState::Closed && !self.exhausted && !self.stopped
    }
}

/// 연결 관리자
///
/// 수신 텍스트 프레임은 도착 순서대로 하나의 `mpsc` 채널로 전달된다.
/// 연결 상태 변경은 `watch` 채널로 구독한다.
pub struct ConnectionManager {
    transport: Arc<dyn ChannelTransport>,
    notifier: Arc<dyn Notifier>,
    machine: Mutex<ConnectionStateMachine>,
    sender: Mutex<Option<Arc<dyn ChannelSender>>>,
    state_tx: watch::Sender<ConnectionState>,
    frames_tx: mpsc::Sender<String>,
    reconnect_tx: mpsc::UnboundedSender<()>,
    reconnect_rx: Mutex<Option<mpsc::UnboundedReceiver<()>>>,
    max_attempts: u32,
    heartbeat_interval: Duration,
    watchdog_interval: Duration,
}

impl ConnectionManager {
    /// 새 연결 관리자 + 수신 프레임 스트림
    pub fn new(
        config: &RealtimeConfig,
        transport: Arc<dyn ChannelTransport>,
        notifier: Arc<dyn Notifier>,
    ) -> (Arc<Self>, mpsc::Receiver<String>) {
        let (frames_tx, frames_rx) = mpsc::channel(FRAME_BUFFER);
        let (reconnect_tx, reconnect_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Closed);

        let manager = Arc::new(Self {
            transport,
            notifier,
            machine: Mutex::new(ConnectionStateMachine::new(
                config.max_reconnect_attempts,
                config.reconnect_delay(),
            )),
            sender: Mutex::new(None),
            state_tx,
            frames_tx,
            reconnect_tx,
            reconnect_rx: Mutex::new(Some(reconnect_rx)),
            max_attempts: config.max_reconnect_attempts,
            heartbeat_interval: config.heartbeat_interval(),
            watchdog_interval: config.watchdog_interval(),
        });

        (manager, frames_rx)
    }

    /// 현재 연결 상태
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// 연결 상태 변경 구독
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    pub fn attempts(&self) -> u32 {
        self.machine.lock().attempts()
    }

    pub fn is_exhausted(&self) -> bool {
        self.machine.lock().is_exhausted()
    }

    fn publish(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("연결 상태: {previous} → {state}");
        }
    }

    /// 연결 시도
    ///
    /// 이미 연결 중이거나 연결되어 있으면 아무 일도 하지 않는다.
    pub async fn connect(self: &Arc<Self>) {
        let begun = self.machine.lock().begin_connect();
        let Some(generation) = begun else {
            debug!("연결 시도 건너뜀 (상태: {})", self.state());
            return;
        };
        self.publish(ConnectionState::Connecting);

        match self.transport.open().await {
            Ok(channel) => {
                let accepted = self.machine.lock().on_open(generation);
                if !accepted {
                    debug!("대체된 연결 폐기 (세대 {generation})");
                    let _ = channel.sender.close().await;
                    return;
                }

                *self.sender.lock() = Some(channel.sender);
                self.publish(ConnectionState::Open);
                info!("실시간 채널 연결됨");

                tokio::spawn(Self::pump(Arc::clone(self), generation, channel.inbound));
            }
            Err(e) => {
                warn!("실시간 채널 연결 실패: {e}");
                self.on_channel_closed(generation).await;
            }
        }
    }

    /// 수동 재연결: 기존 채널을 닫고 카운터를 0으로 되돌린 뒤 연결
    pub async fn reconnect(self: &Arc<Self>) {
        info!("수동 재연결");
        let previous = self.sender.lock().take();
        self.machine.lock().manual_reset();

        if let Some(sender) = previous {
            if let Err(e) = sender.close().await {
                debug!("기존 채널 종료 실패: {e}");
            }
        }
        self.publish(ConnectionState::Closed);

        self.connect().await;
    }

    /// 연결 종료 (재연결 예약 없음)
    pub async fn disconnect(&self) {
        let closing = self.machine.lock().begin_disconnect();
        if !closing {
            return;
        }
        self.publish(ConnectionState::Closing);

        let sender = self.sender.lock().take();
        if let Some(sender) = sender {
            if let Err(e) = sender.close().await {
                warn!("채널 종료 실패: {e}");
            }
        }

        self.machine.lock().finish_disconnect();
        self.publish(ConnectionState::Closed);
        info!("실시간 채널 종료");
    }

    /// 프레임 전송 (OPEN 상태에서만)
    pub async fn send(&self, frame: &OutboundFrame) -> Result<(), CoreError> {
        let sender = self.sender.lock().clone();
        let sender = match sender {
            Some(sender) if self.state() == ConnectionState::Open => sender,
            _ => return Err(CoreError::Channel("채널이 열려 있지 않음".to_string())),
        };

        let text = serde_json::to_string(frame)?;
        sender.send_text(&text).await
    }

    async fn send_heartbeat(&self) {
        if self.state() != ConnectionState::Open {
            return;
        }
        match self.send(&OutboundFrame::Heartbeat).await {
            Ok(()) => debug!("하트비트 전송"),
            Err(e) => warn!("하트비트 전송 실패: {e}"),
        }
    }

    /// 채널 수신 → 디스패처 전달. 스트림이 끝나면 종료 처리
    async fn pump(
        self: Arc<Self>,
        generation: u64,
        mut inbound: mpsc::Receiver<ChannelMessage>,
    ) {
        while let Some(message) = inbound.recv().await {
            match message {
                ChannelMessage::Text(text) => {
                    if self.frames_tx.send(text).await.is_err() {
                        debug!("프레임 수신자 없음, 수신 중단");
                        break;
                    }
                }
                ChannelMessage::Binary(data) => {
                    debug!("바이너리 프레임 무시: {} bytes", data.len());
                }
                ChannelMessage::Close => break,
            }
        }

        self.on_channel_closed(generation).await;
    }

    async fn on_channel_closed(&self, generation: u64) {
        let outcome = self.machine.lock().on_close(generation);
        if outcome == CloseOutcome::Ignored {
            return;
        }

        self.sender.lock().take();
        self.publish(ConnectionState::Closed);

        match outcome {
            CloseOutcome::Ignored | CloseOutcome::Stopped => {
                info!("실시간 채널 닫힘");
            }
            CloseOutcome::Reconnect(delay) => {
                warn!(
                    "실시간 채널 끊김, {delay:?} 후 재연결 ({}/{})",
                    self.attempts(),
                    self.max_attempts
                );
                let tx = self.reconnect_tx.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    let _ = tx.send(());
                });
            }
            CloseOutcome::Exhausted => {
                error!("재연결 {}회 실패, 자동 재연결 중단", self.max_attempts);
                if let Err(e) = self
                    .notifier
                    .show_error("실시간 연결이 끊겼습니다. 다시 연결하려면 재연결을 실행하세요.")
                    .await
                {
                    warn!("알림 표시 실패: {e}");
                }
            }
        }
    }

    /// 연결 관리 루프: 최초 연결, 예약 재연결, 하트비트, watchdog
    ///
    /// 종료 신호를 받으면 채널을 닫고 반환한다.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        let taken = self.reconnect_rx.lock().take();
        let Some(mut reconnect_rx) = taken else {
            warn!("연결 관리 루프가 이미 실행 중");
            return;
        };

        self.connect().await;

        let mut heartbeat = tokio::time::interval(self.heartbeat_interval);
        heartbeat.set_missed_tick_behavior(MissedTickBehavior::Skip);
        heartbeat.tick().await;

        let mut watchdog = tokio::time::interval(self.watchdog_interval);
        watchdog.set_missed_tick_behavior(MissedTickBehavior::Skip);
        watchdog.tick().await;

        loop {
            tokio::select! {
                _ = heartbeat.tick() => {
                    self.send_heartbeat().await;
                }
                _ = watchdog.tick() => {
                    let due = self.machine.lock().should_auto_connect();
                    if due {
                        debug!("watchdog: 연결 복구 시도");
                        self.connect().await;
                    }
                }
                Some(()) = reconnect_rx.recv() => {
                    let due = self.machine.lock().should_auto_connect();
                    if due {
                        self.connect().await;
                    }
                }
                _ = shutdown_rx.changed() => {
                    info!("연결 관리 루프 종료");
                    break;
                }
            }
        }

        self.disconnect().await;
    }
}
