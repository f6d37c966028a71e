//! 세션 모델.
//!
//! 실시간 채널 연결 상태와 인증 토큰/사용자 클레임.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

/// 실시간 채널 연결 상태 (프로세스 내 단일 인스턴스)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    /// 연결 없음
    Closed,
    /// 연결 시도 중
    Connecting,
    /// 연결됨
    Open,
    /// 종료 중
    Closing,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnectionState::Closed => write!(f, "CLOSED"),
            ConnectionState::Connecting => write!(f, "CONNECTING"),
            ConnectionState::Open => write!(f, "OPEN"),
            ConnectionState::Closing => write!(f, "CLOSING"),
        }
    }
}

/// id 토큰에서 꺼낸 사용자 정보
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserClaims {
    /// 사용자 고유 ID
    pub sub: String,
    /// 이메일 (확인 메일 수신 주소)
    #[serde(default)]
    pub email: String,
    /// 만료 시각 (Unix 초)
    pub exp: i64,
}

impl UserClaims {
    /// 만료 시각
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        Utc.timestamp_opt(self.exp, 0).single()
    }

    /// 주어진 시각 기준 만료 여부
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at().map_or(true, |exp| now >= exp)
    }
}

/// 인가 코드 교환으로 받은 토큰 묶음
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenSet {
    pub access_token: String,
    pub id_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// access 토큰 만료 시각 (교환/갱신 응답의 `expires_in` 기준)
    ///
    /// 없으면 id 토큰의 `exp`를 쓴다.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
}
