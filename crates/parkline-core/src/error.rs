//! PARKLINE 핵심 에러 타입.
//!
//! 모든 어댑터 crate는 자체 에러 타입을 `CoreError`로 변환해 올린다.

use thiserror::Error;

/// 코어 레이어 에러.
/// 직렬화, 설정, 유효성 검증, 네트워크 등 도메인 공통 에러를 정의한다.
#[derive(Debug, Error)]
pub enum CoreError {
    /// JSON 직렬화/역직렬화 실패
    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 설정값 오류
    #[error("설정 에러: {0}")]
    Config(String),

    /// 필드 유효성 검증 실패
    #[error("유효성 검증 실패 ({field}): {message}")]
    Validation {
        /// 검증 실패한 필드명
        field: String,
        /// 실패 사유
        message: String,
    },

    /// 예약 시간대 충돌 (클라이언트 사전 검사 또는 서버 409)
    #[error("예약 충돌: {0}")]
    Conflict(String),

    /// 인증 실패 (토큰 만료, 세션 없음 등)
    #[error("인증 에러: {0}")]
    Auth(String),

    /// 리소스를 찾을 수 없음
    #[error("{resource_type} 미발견: {id}")]
    NotFound {
        /// 리소스 종류 (예: "Reservation")
        resource_type: String,
        /// 리소스 식별자
        id: String,
    },

    /// 로컬 저장소 에러
    #[error("저장소 에러: {0}")]
    Storage(String),

    /// 내부 에러 (예상치 못한 상황)
    #[error("내부 에러: {0}")]
    Internal(String),

    /// 네트워크 에러 (연결 실패, 타임아웃)
    #[error("네트워크 에러: {0}")]
    Network(String),

    /// Rate Limit 초과 (429)
    #[error("요청 한도 초과, {retry_after_secs}초 후 재시도")]
    RateLimit {
        /// 재시도 대기 시간 (초)
        retry_after_secs: u64,
    },

    /// 서비스 일시 불가 (503)
    #[error("서비스 일시 불가: {0}")]
    ServiceUnavailable(String),

    /// 실시간 채널 에러 (연결 없음, 전송 실패)
    #[error("채널 에러: {0}")]
    Channel(String),

    /// I/O 에러
    #[error("I/O 에러: {0}")]
    Io(#[from] std::io::Error),
}

impl CoreError {
    /// 유효성 검증 에러 생성 헬퍼
    pub fn validation(field: &str, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.to_string(),
            message: message.into(),
        }
    }

    /// 세션 만료/부재로 재로그인이 필요한 에러인지
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Auth(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_helper_formats_field() {
        let err = CoreError::validation("end_time", "시작 시각 이후여야 합니다");
        let msg = err.to_string();
        assert!(msg.contains("end_time"));
        assert!(msg.contains("시작 시각"));
    }

    #[test]
    fn only_auth_requires_login() {
        assert!(CoreError::Auth("만료".to_string()).requires_login());
        assert!(!CoreError::Network("timeout".to_string()).requires_login());
    }
}
