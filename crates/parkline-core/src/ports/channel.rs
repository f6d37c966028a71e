//! 실시간 채널 전송 포트.
//!
//! 구현: `parkline-network` crate (tokio-tungstenite)
//! 연결 관리자(상태 머신)는 이 포트만 보고 동작하므로 테스트에서 가짜 전송으로 교체할 수 있다.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::CoreError;

/// 채널에서 수신한 메시지
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelMessage {
    /// 텍스트 메시지 (JSON)
    Text(String),
    /// 바이너리 메시지
    Binary(Vec<u8>),
    /// 연결 종료
    Close,
}

/// 채널 송신기
#[async_trait]
pub trait ChannelSender: Send + Sync {
    /// 텍스트 메시지 전송
    async fn send_text(&self, text: &str) -> Result<(), CoreError>;

    /// 연결 종료
    async fn close(&self) -> Result<(), CoreError>;
}

/// 열린 채널: 송신기 + 순서가 보장된 수신 스트림
///
/// 수신 스트림이 끝나면(`None`) 연결이 끊긴 것이다.
pub struct OpenChannel {
    pub sender: Arc<dyn ChannelSender>,
    pub inbound: mpsc::Receiver<ChannelMessage>,
}

/// 양방향 채널 전송 계층
#[async_trait]
pub trait ChannelTransport: Send + Sync {
    /// 새 채널 연결 수립
    async fn open(&self) -> Result<OpenChannel, CoreError>;
}
