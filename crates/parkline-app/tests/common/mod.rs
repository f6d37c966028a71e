//! 통합 테스트 공용 헬퍼.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use parking_lot::Mutex;
use parkline_core::config::AuthConfig;
use parkline_core::error::CoreError;
use parkline_core::models::chart::{ChartSeries, ChartType};
use parkline_core::models::occupancy::{HistoryEntry, OccupancySnapshot};
use parkline_core::models::reservation::Reservation;
use parkline_core::models::session::{ConnectionState, TokenSet};
use parkline_core::ports::channel::{ChannelMessage, ChannelSender, ChannelTransport, OpenChannel};
use parkline_core::ports::notifier::Notifier;
use parkline_core::ports::presenter::StatusPresenter;
use parkline_network::auth::TokenManager;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Default)]
pub struct RecordingPresenter {
    pub statuses: Mutex<Vec<OccupancySnapshot>>,
    pub histories: Mutex<Vec<Vec<HistoryEntry>>>,
    pub connections: Mutex<Vec<ConnectionState>>,
    pub reservations: Mutex<Vec<Vec<Reservation>>>,
    pub charts: Mutex<Vec<(ChartType, ChartSeries)>>,
    pub peaks: Mutex<Vec<(ChartType, ChartSeries)>>,
}

impl StatusPresenter for RecordingPresenter {
    fn render_status(&self, snapshot: &OccupancySnapshot) {
        self.statuses.lock().push(snapshot.clone());
    }

    fn render_history(&self, history: &[HistoryEntry]) {
        self.histories.lock().push(history.to_vec());
    }

    fn render_connection(&self, state: ConnectionState) {
        self.connections.lock().push(state);
    }

    fn render_reservations(&self, reservations: &[Reservation]) {
        self.reservations.lock().push(reservations.to_vec());
    }

    fn render_chart(&self, chart_type: ChartType, series: &ChartSeries) {
        self.charts.lock().push((chart_type, series.clone()));
    }

    fn render_peak_split(&self, chart_type: ChartType, split: &ChartSeries) {
        self.peaks.lock().push((chart_type, split.clone()));
    }
}

#[derive(Default)]
pub struct RecordingNotifier {
    pub notifications: Mutex<Vec<String>>,
    pub errors: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn show_notification(&self, title: &str, body: &str) -> Result<(), CoreError> {
        self.notifications.lock().push(format!("{title}: {body}"));
        Ok(())
    }

    async fn show_error(&self, message: &str) -> Result<(), CoreError> {
        self.errors.lock().push(message.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingSender {
    pub sent: Mutex<Vec<String>>,
}

#[async_trait]
impl ChannelSender for RecordingSender {
    async fn send_text(&self, text: &str) -> Result<(), CoreError> {
        self.sent.lock().push(text.to_string());
        Ok(())
    }

    async fn close(&self) -> Result<(), CoreError> {
        Ok(())
    }
}

/// 미리 준비한 채널을 순서대로 내주는 전송 계층. 다 쓰면 연결 실패.
#[derive(Default)]
pub struct ScriptedTransport {
    channels: Mutex<VecDeque<mpsc::Receiver<ChannelMessage>>>,
    pub sender: Arc<RecordingSender>,
}

impl ScriptedTransport {
    /// 열릴 채널 하나 추가, 서버 쪽 송신 핸들 반환
    pub fn push_channel(&self) -> mpsc::Sender<ChannelMessage> {
        let (tx, rx) = mpsc::channel(16);
        self.channels.lock().push_back(rx);
        tx
    }
}

#[async_trait]
impl ChannelTransport for ScriptedTransport {
    async fn open(&self) -> Result<OpenChannel, CoreError> {
        let next = self.channels.lock().pop_front();
        match next {
            Some(inbound) => Ok(OpenChannel {
                sender: self.sender.clone(),
                inbound,
            }),
            None => Err(CoreError::Channel("연결 거부".to_string())),
        }
    }
}

pub fn id_token(sub: &str, email: &str, exp: i64) -> String {
    let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD
        .encode(serde_json::json!({"sub": sub, "email": email, "exp": exp}).to_string());
    format!("{header}.{payload}.sig")
}

/// 1시간 유효한 세션이 복원된 토큰 관리자
pub async fn signed_in_tokens(auth_url: &str) -> Arc<TokenManager> {
    let tokens = Arc::new(TokenManager::new(&AuthConfig {
        auth_url: auth_url.to_string(),
        client_id: "client-abc".to_string(),
        ..AuthConfig::default()
    }));
    let exp = chrono::Utc::now().timestamp() + 3600;
    tokens
        .restore(TokenSet {
            access_token: "access-1".to_string(),
            id_token: id_token("user-1", "driver@example.com", exp),
            refresh_token: Some("refresh-1".to_string()),
            expires_at: None,
        })
        .await
        .unwrap();
    tokens
}

/// 조건이 참이 될 때까지 대기 (최대 5초)
pub async fn wait_until<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let waited = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "조건 대기 시간 초과");
}

pub fn reservation_json(id: &str, start: &str, end: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "reservationId": id,
        "userId": "user-1",
        "startTime": start,
        "endTime": end,
        "status": status,
    })
}
