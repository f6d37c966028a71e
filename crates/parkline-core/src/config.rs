//! 애플리케이션 설정 구조체.
//!
//! 서버/인증 URL, 실시간 채널 주기, 예약 재조회 주기, 저장소 경로 등
//! 런타임 설정을 정의한다. `ConfigManager`가 파일/환경변수에서 로드.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// 최상위 애플리케이션 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// REST 서버 연결 설정
    pub server: ServerConfig,
    /// 인증(OAuth) 설정
    #[serde(default)]
    pub auth: AuthConfig,
    /// 실시간 채널 설정
    #[serde(default)]
    pub realtime: RealtimeConfig,
    /// 예약 캐시 설정
    #[serde(default)]
    pub reservations: ReservationConfig,
    /// 로컬 저장소 설정
    #[serde(default)]
    pub storage: StorageConfig,
}

// ============================================================
// 서버/인증 설정
// ============================================================

/// REST 서버 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// API 서버 기본 URL (예: "https://api.example.com/prod")
    pub base_url: String,
    /// 요청 타임아웃 (밀리초)
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
    /// 재시도 가능한 에러의 최대 재시도 횟수
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

/// OAuth 인가 코드 교환 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// 인증 서버 도메인 (예: "https://auth.example.com")
    #[serde(default = "default_auth_url")]
    pub auth_url: String,
    /// OAuth 클라이언트 ID
    #[serde(default)]
    pub client_id: String,
    /// 리다이렉트 URI (인가 코드 발급 시 사용한 값과 동일해야 함)
    #[serde(default = "default_redirect_uri")]
    pub redirect_uri: String,
    /// 세션 만료 검사 주기 (초)
    #[serde(default = "default_expiry_check_secs")]
    pub expiry_check_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            auth_url: default_auth_url(),
            client_id: String::new(),
            redirect_uri: default_redirect_uri(),
            expiry_check_secs: default_expiry_check_secs(),
        }
    }
}

// ============================================================
// 실시간 채널 설정
// ============================================================

/// 실시간 채널(WebSocket) 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// WebSocket 엔드포인트 (예: "wss://ws.example.com/prod")
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// 재연결 지연 (밀리초)
    #[serde(default = "default_reconnect_delay_ms")]
    pub reconnect_delay_ms: u64,
    /// 최대 자동 재연결 횟수
    #[serde(default = "default_max_reconnect_attempts")]
    pub max_reconnect_attempts: u32,
    /// 하트비트 주기 (밀리초)
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// 연결 감시(watchdog) 주기 (밀리초)
    #[serde(default = "default_watchdog_interval_ms")]
    pub watchdog_interval_ms: u64,
    /// 주차장 식별자
    #[serde(default = "default_lot_id")]
    pub lot_id: String,
    /// 주차장 전체 면수 (초기 상태 시드용)
    #[serde(default = "default_total_spaces")]
    pub total_spaces: u32,
    /// 이력 테이블 최대 길이
    #[serde(default = "default_max_history")]
    pub max_history: usize,
}

/// 타이머 주기 하한 (`tokio::time::interval`은 0을 받지 않는다)
const MIN_PERIOD: Duration = Duration::from_millis(1);

fn period(value: Duration) -> Duration {
    value.max(MIN_PERIOD)
}

impl RealtimeConfig {
    /// 재연결 지연
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    /// 하트비트 주기 (최소 1ms)
    pub fn heartbeat_interval(&self) -> Duration {
        period(Duration::from_millis(self.heartbeat_interval_ms))
    }

    /// watchdog 주기 (최소 1ms)
    pub fn watchdog_interval(&self) -> Duration {
        period(Duration::from_millis(self.watchdog_interval_ms))
    }
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            ws_url: default_ws_url(),
            reconnect_delay_ms: default_reconnect_delay_ms(),
            max_reconnect_attempts: default_max_reconnect_attempts(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            watchdog_interval_ms: default_watchdog_interval_ms(),
            lot_id: default_lot_id(),
            total_spaces: default_total_spaces(),
            max_history: default_max_history(),
        }
    }
}

/// 예약 캐시 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationConfig {
    /// 주기적 전체 재조회 간격 (밀리초)
    #[serde(default = "default_reload_interval_ms")]
    pub reload_interval_ms: u64,
    /// 예약 확인 메일 요청 여부
    #[serde(default = "default_true")]
    pub send_confirmation: bool,
}

impl Default for ReservationConfig {
    fn default() -> Self {
        Self {
            reload_interval_ms: default_reload_interval_ms(),
            send_confirmation: true,
        }
    }
}

/// 로컬 저장소 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// SQLite DB 파일 경로 (None이면 플랫폼 기본 경로)
    #[serde(default)]
    pub db_path: Option<PathBuf>,
    /// 차트 캐시 보존 시간 (시간)
    #[serde(default = "default_chart_retention_hours")]
    pub chart_retention_hours: u32,
    /// 차트 캐시 TTL (분)
    #[serde(default = "default_chart_ttl_mins")]
    pub chart_ttl_mins: u32,
    /// 보존 정책 정리 주기 (초)
    #[serde(default = "default_cleanup_interval_secs")]
    pub cleanup_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            chart_retention_hours: default_chart_retention_hours(),
            chart_ttl_mins: default_chart_ttl_mins(),
            cleanup_interval_secs: default_cleanup_interval_secs(),
        }
    }
}

// ============================================================
// AppConfig impl
// ============================================================

impl AppConfig {
    /// 기본 설정값 반환
    pub fn default_config() -> Self {
        Self {
            server: ServerConfig {
                base_url: "http://localhost:8000".to_string(),
                request_timeout_ms: default_request_timeout_ms(),
                max_retries: default_max_retries(),
            },
            auth: AuthConfig::default(),
            realtime: RealtimeConfig::default(),
            reservations: ReservationConfig::default(),
            storage: StorageConfig::default(),
        }
    }

    /// 서버 요청 타임아웃을 Duration으로 반환
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.server.request_timeout_ms)
    }

    /// 재연결 지연
    pub fn reconnect_delay(&self) -> Duration {
        self.realtime.reconnect_delay()
    }

    /// 하트비트 주기
    pub fn heartbeat_interval(&self) -> Duration {
        self.realtime.heartbeat_interval()
    }

    /// watchdog 주기
    pub fn watchdog_interval(&self) -> Duration {
        self.realtime.watchdog_interval()
    }

    /// 예약 재조회 주기
    pub fn reload_interval(&self) -> Duration {
        period(Duration::from_millis(self.reservations.reload_interval_ms))
    }

    /// 차트 캐시 정리 주기
    pub fn cleanup_interval(&self) -> Duration {
        period(Duration::from_secs(self.storage.cleanup_interval_secs))
    }

    /// 세션 만료 검사 주기
    pub fn session_check_interval(&self) -> Duration {
        period(Duration::from_secs(self.auth.expiry_check_secs))
    }

    /// 차트 캐시 보존 기간
    pub fn chart_retention(&self) -> Duration {
        Duration::from_secs(u64::from(self.storage.chart_retention_hours) * 3600)
    }

    /// 차트 캐시 TTL
    pub fn chart_ttl(&self) -> Duration {
        Duration::from_secs(u64::from(self.storage.chart_ttl_mins) * 60)
    }
}

// ============================================================
// 기본값 함수
// ============================================================

fn default_true() -> bool {
    true
}

fn default_request_timeout_ms() -> u64 {
    30_000
}
fn default_max_retries() -> u32 {
    2
}
fn default_auth_url() -> String {
    "http://localhost:8000/auth".to_string()
}
fn default_redirect_uri() -> String {
    "http://localhost:3000/callback".to_string()
}
fn default_expiry_check_secs() -> u64 {
    60
}
fn default_ws_url() -> String {
    "ws://localhost:8001".to_string()
}
fn default_reconnect_delay_ms() -> u64 {
    2_000
}
fn default_max_reconnect_attempts() -> u32 {
    5
}
fn default_heartbeat_interval_ms() -> u64 {
    30_000
}
fn default_watchdog_interval_ms() -> u64 {
    5_000
}
fn default_lot_id() -> String {
    "main".to_string()
}
fn default_total_spaces() -> u32 {
    6
}
fn default_max_history() -> usize {
    10
}
fn default_reload_interval_ms() -> u64 {
    30_000
}
fn default_chart_retention_hours() -> u32 {
    24
}
fn default_chart_ttl_mins() -> u32 {
    60
}
fn default_cleanup_interval_secs() -> u64 {
    3_600 // 1시간
}
