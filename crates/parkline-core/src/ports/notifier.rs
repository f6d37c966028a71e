//! 사용자 알림 포트.
//!
//! 구현: `parkline-app` crate (콘솔 알림)

use async_trait::async_trait;

use crate::error::CoreError;

/// 사용자에게 보이는 메시지 출력
///
/// 요청한 동작을 막는 실패(예약 생성/취소, 초기 로드, 재연결 포기)만 여기로 올린다.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// 일반 알림 표시 (제목 + 본문)
    async fn show_notification(&self, title: &str, body: &str) -> Result<(), CoreError>;

    /// 에러 알림 표시
    async fn show_error(&self, message: &str) -> Result<(), CoreError>;
}
